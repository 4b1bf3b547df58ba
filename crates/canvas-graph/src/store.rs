//! The authoritative canvas graph and its mutation operations.
//!
//! All changes to nodes, edges, viewport and clipboard go through
//! [`GraphStore`]. Every operation is synchronous and leaves the graph
//! consistent: removing a node removes its links in the same call, links
//! are deduplicated by their endpoints, and pasted nodes always get fresh
//! ids.
//!
//! # Example
//!
//! ```
//! use canvas_graph::{GraphStore, NodeKind, Position};
//!
//! let mut store = GraphStore::new();
//! let ctx = store.add_node(NodeKind::Context, Position::new(0.0, 0.0), Default::default());
//! let chat = store.add_node(NodeKind::Chat, Position::new(100.0, 0.0), Default::default());
//! let edge = store.connect(&ctx.id, &chat.id).unwrap();
//! assert_eq!(edge.id, "edge-context-node-1-chat-node-1");
//!
//! store.delete_node(&ctx.id);
//! assert_eq!(store.nodes().len(), 1);
//! assert!(store.edges().is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::clipboard::Clipboard;
use crate::connection::{is_valid_connection, validate_connection, ConnectionRejected};
use crate::error::{GraphError, Result};
use crate::events::{EventSink, GraphEvent};
use crate::ids::IdAllocator;
use crate::persistence::{EdgeRecord, GraphSnapshot, NodeRecord};
use crate::types::{
    Attributes, CanvasGraph, Edge, EdgeId, Node, NodeId, NodeKind, Position, Viewport,
};

/// Handle returned by [`GraphStore::subscribe`]
pub type SubscriptionId = u64;

/// Outcome of replacing the graph from external storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrateReport {
    /// Nodes kept
    pub node_count: usize,
    /// Edges kept
    pub edge_count: usize,
    /// Nodes discarded because their id was already taken
    pub dropped_nodes: Vec<NodeId>,
    /// Edges discarded (dangling, invalid kinds, self-loop, duplicate or id clash)
    pub dropped_edges: Vec<EdgeId>,
}

/// Owner of the canvas graph, the id allocator and the clipboard
pub struct GraphStore {
    graph: CanvasGraph,
    ids: IdAllocator,
    clipboard: Clipboard,
    subscribers: Vec<(SubscriptionId, Arc<dyn EventSink>)>,
    next_subscription: SubscriptionId,
}

impl GraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            graph: CanvasGraph::new(),
            ids: IdAllocator::new(),
            clipboard: Clipboard::default(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    pub fn graph(&self) -> &CanvasGraph {
        &self.graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.find_node(id)
    }

    pub fn viewport(&self) -> Viewport {
        self.graph.viewport
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Ids of nodes linked into a chat, in link insertion order.
    ///
    /// This is the context list a chat sends with its next message.
    pub fn connected_context_ids(&self, chat_id: &str) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.graph
            .incoming_edges(chat_id)
            .filter(|e| seen.insert(e.source_id.as_str()))
            .map(|e| e.source_id.clone())
            .collect()
    }

    /// Ids of currently selected nodes
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.graph
            .nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id.clone())
            .collect()
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Register a sink that receives every subsequent [`GraphEvent`]
    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        self.next_subscription += 1;
        let id = self.next_subscription;
        self.subscribers.push((id, sink));
        id
    }

    /// Remove a sink. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn emit(&self, event: GraphEvent) {
        for (id, sink) in &self.subscribers {
            if let Err(e) = sink.send(event.clone()) {
                log::warn!("Graph subscriber {} dropped event: {}", id, e);
            }
        }
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    /// Add a node of `kind` with a freshly allocated id
    pub fn add_node(&mut self, kind: NodeKind, position: Position, initial: Attributes) -> Node {
        let mut attributes = kind.default_attributes();
        attributes.extend(initial);

        let node = Node {
            id: self.ids.next(kind),
            kind,
            position,
            attributes,
            selected: false,
        };
        log::debug!("Added node '{}'", node.id);
        self.graph.nodes.push(node.clone());
        self.emit(GraphEvent::NodeAdded {
            node_id: node.id.clone(),
        });
        node
    }

    /// Shallow-merge attributes into an existing node
    pub fn update_node(&mut self, id: &str, partial: Attributes) -> Result<()> {
        let node = self
            .graph
            .find_node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.attributes.extend(partial);
        self.emit(GraphEvent::NodeUpdated {
            node_id: id.to_string(),
        });
        Ok(())
    }

    /// Move a node to a new position
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .graph
            .find_node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
        node.position = position;
        self.emit(GraphEvent::NodeMoved {
            node_id: id.to_string(),
            position,
        });
        Ok(())
    }

    /// Remove a node together with every edge touching it.
    ///
    /// Returns the removed edges. Deleting an absent node is a no-op.
    pub fn delete_node(&mut self, id: &str) -> Vec<Edge> {
        let Some(pos) = self.graph.nodes.iter().position(|n| n.id == id) else {
            return Vec::new();
        };
        self.graph.nodes.remove(pos);

        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.graph.edges)
            .into_iter()
            .partition(|e| e.touches(id));
        self.graph.edges = kept;

        log::debug!("Deleted node '{}' and {} edge(s)", id, removed.len());
        self.emit(GraphEvent::NodeRemoved {
            node_id: id.to_string(),
            removed_edges: removed.iter().map(|e| e.id.clone()).collect(),
        });
        removed
    }

    /// Remove several nodes. Returns how many existed.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter()
            .filter(|id| {
                let existed = self.graph.contains_node(id);
                self.delete_node(id);
                existed
            })
            .count()
    }

    /// Remove every selected node
    pub fn delete_selected(&mut self) -> usize {
        let selected = self.selected_ids();
        self.delete_nodes(&selected)
    }

    // =========================================================================
    // Edge operations
    // =========================================================================

    /// Link `source_id` into `target_id`.
    ///
    /// Linking an already linked pair returns the existing edge. A pair
    /// whose derived id already names a link between other nodes is
    /// rejected: hyphenated ids can derive one link id for two pairs.
    pub fn connect(
        &mut self,
        source_id: &str,
        target_id: &str,
    ) -> std::result::Result<Edge, ConnectionRejected> {
        if let Err(rejected) = validate_connection(&self.graph, source_id, target_id) {
            log::debug!("Connection rejected: {}", rejected);
            return Err(rejected);
        }

        if let Some(existing) = self.graph.find_link(source_id, target_id) {
            return Ok(existing.clone());
        }
        let edge = Edge::between(source_id, target_id);
        if self.graph.find_edge(&edge.id).is_some() {
            log::warn!("Link id '{}' is taken by another link", edge.id);
            return Err(ConnectionRejected::IdCollision { edge_id: edge.id });
        }

        log::debug!("Connected '{}' -> '{}'", source_id, target_id);
        self.graph.edges.push(edge.clone());
        self.emit(GraphEvent::EdgeAdded { edge: edge.clone() });
        Ok(edge)
    }

    /// Remove an edge if present
    pub fn delete_edge(&mut self, id: &str) -> Option<Edge> {
        let pos = self.graph.edges.iter().position(|e| e.id == id)?;
        let edge = self.graph.edges.remove(pos);
        self.emit(GraphEvent::EdgeRemoved {
            edge_id: edge.id.clone(),
        });
        Some(edge)
    }

    // =========================================================================
    // Selection and viewport
    // =========================================================================

    /// Replace the selection. Unknown ids are ignored.
    pub fn select(&mut self, ids: &[NodeId]) {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for node in &mut self.graph.nodes {
            node.selected = wanted.contains(node.id.as_str());
        }
        self.emit(GraphEvent::SelectionChanged {
            selected: self.selected_ids(),
        });
    }

    pub fn clear_selection(&mut self) {
        self.select(&[]);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.graph.viewport = viewport;
        self.emit(GraphEvent::ViewportChanged { viewport });
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Copy nodes (and the links among them) into the clipboard.
    ///
    /// Overwrites any previous clipboard. Returns the number of nodes copied.
    pub fn copy(&mut self, ids: &[NodeId]) -> usize {
        self.clipboard = Clipboard::capture(&self.graph, ids);
        let node_count = self.clipboard.nodes().len();
        let edge_count = self.clipboard.edges().len();
        log::info!("Copied {} node(s), {} edge(s)", node_count, edge_count);
        self.emit(GraphEvent::Copied {
            node_count,
            edge_count,
        });
        node_count
    }

    pub fn copy_selection(&mut self) -> usize {
        let selected = self.selected_ids();
        self.copy(&selected)
    }

    /// Paste the clipboard so its first node lands on `target`.
    ///
    /// Returns the new node ids; an empty clipboard pastes nothing.
    pub fn paste(&mut self, target: Position) -> Vec<NodeId> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }

        let (nodes, edges) = self.clipboard.instantiate(target, &mut self.ids);
        let node_ids: Vec<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
        let mut edge_ids = Vec::with_capacity(edges.len());

        self.graph.nodes.extend(nodes);
        for edge in edges {
            if self.graph.find_link(&edge.source_id, &edge.target_id).is_some() {
                continue;
            }
            if self.graph.find_edge(&edge.id).is_some() {
                log::warn!("Paste: skipping link '{}', its id is taken", edge.id);
                continue;
            }
            edge_ids.push(edge.id.clone());
            self.graph.edges.push(edge);
        }

        log::info!("Pasted {} node(s), {} edge(s)", node_ids.len(), edge_ids.len());
        self.emit(GraphEvent::Pasted {
            node_ids: node_ids.clone(),
            edge_ids,
        });
        node_ids
    }

    // =========================================================================
    // Bulk operations
    // =========================================================================

    /// Clear nodes and edges, reset viewport and id counters.
    ///
    /// The clipboard survives so a copy can be pasted into a fresh canvas.
    pub fn reset_all(&mut self) {
        self.graph = CanvasGraph::new();
        self.ids.reset();
        log::debug!("Graph reset");
        self.emit(GraphEvent::Reset);
    }

    /// Replace the whole graph with externally loaded state.
    ///
    /// Duplicate node ids keep their first occurrence. Edges are kept only
    /// if both endpoints exist and the kinds form a valid link; surviving
    /// edges are re-keyed to their derived id and deduplicated by their
    /// endpoints. An edge whose derived id is already taken by a link
    /// between other nodes is dropped. Id counters are re-derived from the
    /// kept nodes.
    pub fn hydrate(
        &mut self,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        viewport: Viewport,
    ) -> HydrateReport {
        let mut report = HydrateReport::default();
        let mut graph = CanvasGraph {
            nodes: Vec::with_capacity(nodes.len()),
            edges: Vec::with_capacity(edges.len()),
            viewport,
        };

        let mut node_ids = HashSet::new();
        for mut node in nodes {
            if !node_ids.insert(node.id.clone()) {
                log::warn!("Hydrate: dropping duplicate node '{}'", node.id);
                report.dropped_nodes.push(node.id);
                continue;
            }
            node.selected = false;
            graph.nodes.push(node);
        }

        for edge in edges {
            if let Err(rejected) = validate_connection(&graph, &edge.source_id, &edge.target_id) {
                log::warn!("Hydrate: dropping edge '{}': {}", edge.id, rejected);
                report.dropped_edges.push(edge.id);
                continue;
            }
            if graph.find_link(&edge.source_id, &edge.target_id).is_some() {
                report.dropped_edges.push(edge.id);
                continue;
            }
            let derived = Edge::between(edge.source_id, edge.target_id);
            if graph.find_edge(&derived.id).is_some() {
                log::warn!("Hydrate: dropping edge '{}': id '{}' is taken", edge.id, derived.id);
                report.dropped_edges.push(edge.id);
                continue;
            }
            if derived.id != edge.id {
                log::debug!("Hydrate: re-keyed edge '{}' as '{}'", edge.id, derived.id);
            }
            graph.edges.push(derived);
        }

        report.node_count = graph.nodes.len();
        report.edge_count = graph.edges.len();

        self.ids.rederive(&graph.nodes);
        self.graph = graph;

        log::info!(
            "Hydrated graph: {} node(s), {} edge(s), {} edge(s) dropped",
            report.node_count,
            report.edge_count,
            report.dropped_edges.len()
        );
        self.emit(GraphEvent::Hydrated {
            node_count: report.node_count,
            edge_count: report.edge_count,
            dropped_edges: report.dropped_edges.len(),
        });
        report
    }

    /// Hydrate from persistence records
    pub fn hydrate_snapshot(&mut self, snapshot: GraphSnapshot) -> Result<HydrateReport> {
        let (nodes, edges, viewport) = snapshot.into_parts()?;
        Ok(self.hydrate(nodes, edges, viewport))
    }

    /// Export the graph as persistence records
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.graph.nodes.iter().map(NodeRecord::from).collect(),
            edges: self.graph.edges.iter().map(EdgeRecord::from).collect(),
            viewport: self.graph.viewport,
        }
    }

    /// Verify the graph invariants: unique node ids, and edges that are
    /// unique, not dangling, not self-loops and link a content kind into
    /// a chat.
    pub fn check_integrity(&self) -> Result<()> {
        let mut kinds = HashMap::new();
        for node in &self.graph.nodes {
            if kinds.insert(node.id.as_str(), node.kind).is_some() {
                return Err(GraphError::integrity(format!("duplicate node id '{}'", node.id)));
            }
        }

        let mut edge_ids = HashSet::new();
        let mut links = HashSet::new();
        for edge in &self.graph.edges {
            let (Some(&source), Some(&target)) = (
                kinds.get(edge.source_id.as_str()),
                kinds.get(edge.target_id.as_str()),
            ) else {
                return Err(GraphError::integrity(format!("edge '{}' is dangling", edge.id)));
            };
            if edge.source_id == edge.target_id {
                return Err(GraphError::integrity(format!("edge '{}' is a self-loop", edge.id)));
            }
            if !is_valid_connection(source, target) {
                return Err(GraphError::integrity(format!(
                    "edge '{}' links {} -> {}",
                    edge.id, source, target
                )));
            }
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(GraphError::integrity(format!("duplicate edge id '{}'", edge.id)));
            }
            if !links.insert((edge.source_id.as_str(), edge.target_id.as_str())) {
                return Err(GraphError::integrity(format!(
                    "'{}' is linked into '{}' twice",
                    edge.source_id, edge.target_id
                )));
            }
        }
        Ok(())
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
