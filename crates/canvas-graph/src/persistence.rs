//! Persistence records for canvas graphs.
//!
//! These are the shapes exchanged with external storage. Layout fields
//! (`width`, `height`, `isMinimized`, `zIndex`) travel inside the node's
//! attribute map; edges carry presentation hints the graph itself ignores.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::types::{Attributes, Edge, EdgeId, Node, NodeId, NodeKind, Position, Viewport};

/// Edge type written for every context link
pub const EDGE_KIND: &str = "smoothstep";

/// Stored form of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: String,
    pub position: Position,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Stored form of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    #[serde(default = "default_edge_kind")]
    pub kind: String,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub style: Value,
}

fn default_edge_kind() -> String {
    EDGE_KIND.to_string()
}

/// A complete stored canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub viewport: Viewport,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind.as_str().to_string(),
            position: node.position,
            attributes: node.attributes.clone(),
        }
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = GraphError;

    fn try_from(record: NodeRecord) -> Result<Self> {
        let kind = NodeKind::parse(&record.kind).ok_or_else(|| GraphError::UnknownNodeKind {
            node_id: record.id.clone(),
            kind: record.kind.clone(),
        })?;
        Ok(Node {
            id: record.id,
            kind,
            position: record.position,
            attributes: record.attributes,
            selected: false,
        })
    }
}

impl From<&Edge> for EdgeRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            id: edge.id.clone(),
            source_id: edge.source_id.clone(),
            target_id: edge.target_id.clone(),
            kind: EDGE_KIND.to_string(),
            animated: true,
            style: serde_json::json!({ "strokeWidth": 2 }),
        }
    }
}

impl From<EdgeRecord> for Edge {
    fn from(record: EdgeRecord) -> Self {
        Edge {
            id: record.id,
            source_id: record.source_id,
            target_id: record.target_id,
        }
    }
}

impl GraphSnapshot {
    /// Convert stored records into graph types.
    ///
    /// Fails on the first node with an unknown kind.
    pub fn into_parts(self) -> Result<(Vec<Node>, Vec<Edge>, Viewport)> {
        let nodes = self
            .nodes
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>>>()?;
        let edges = self.edges.into_iter().map(Edge::from).collect();
        Ok((nodes, edges, self.viewport))
    }
}

/// Load a snapshot from a JSON file.
///
/// A missing file is treated as an empty canvas.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<GraphSnapshot> {
    let path = path.as_ref();
    if !path.exists() {
        log::debug!("No snapshot at {:?}, starting empty", path);
        return Ok(GraphSnapshot::default());
    }
    let content = std::fs::read_to_string(path)?;
    let snapshot: GraphSnapshot = serde_json::from_str(&content)?;
    log::info!(
        "Loaded snapshot from {:?} ({} nodes, {} edges)",
        path,
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(snapshot)
}

/// Save a snapshot as pretty JSON, creating parent directories
pub fn save_snapshot(path: impl AsRef<Path>, snapshot: &GraphSnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, content)?;
    log::debug!("Saved snapshot to {:?}", path);
    Ok(())
}
