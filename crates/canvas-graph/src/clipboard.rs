//! Copy/paste of node subsets
//!
//! A copy captures the chosen nodes plus the induced subgraph (edges with
//! both endpoints inside the selection). Pasting re-instantiates them with
//! freshly allocated ids, so the same clipboard can be pasted any number
//! of times without collisions. Links to nodes outside the selection are
//! not carried.

use std::collections::{HashMap, HashSet};

use crate::ids::IdAllocator;
use crate::types::{CanvasGraph, Edge, Node, NodeId, Position};

/// Snapshot of copied nodes and their internal links
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Clipboard {
    /// Capture the given nodes and their induced edges.
    ///
    /// Nodes are deep-copied in the order given; unknown ids are skipped.
    pub fn capture(graph: &CanvasGraph, node_ids: &[NodeId]) -> Self {
        let mut seen = HashSet::new();
        let nodes: Vec<Node> = node_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| graph.find_node(id))
            .cloned()
            .collect();

        let members: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let edges = graph
            .edges
            .iter()
            .filter(|e| {
                members.contains(e.source_id.as_str()) && members.contains(e.target_id.as_str())
            })
            .cloned()
            .collect();

        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Build fresh copies positioned relative to `target`.
    ///
    /// The first copied node lands on `target`; the rest keep their
    /// offsets from it. Copies are deselected and get new ids from
    /// `ids`; edges are rewired through the old → new id map.
    pub fn instantiate(&self, target: Position, ids: &mut IdAllocator) -> (Vec<Node>, Vec<Edge>) {
        let Some(anchor) = self.nodes.first() else {
            return (Vec::new(), Vec::new());
        };
        let delta = anchor.position.delta_to(target);

        let mut remap: HashMap<&str, NodeId> = HashMap::with_capacity(self.nodes.len());
        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .map(|original| {
                let id = ids.next(original.kind);
                remap.insert(original.id.as_str(), id.clone());
                Node {
                    id,
                    kind: original.kind,
                    position: original.position.offset_by(delta),
                    attributes: original.attributes.clone(),
                    selected: false,
                }
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .filter_map(|edge| {
                let source = remap.get(edge.source_id.as_str())?;
                let target = remap.get(edge.target_id.as_str())?;
                Some(Edge::between(source.clone(), target.clone()))
            })
            .collect();

        (nodes, edges)
    }
}
