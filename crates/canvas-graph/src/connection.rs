//! Connection validation for context links
//!
//! Pure checks shared by the interactive linking gesture (live feedback
//! while dragging) and by [`GraphStore::connect`](crate::GraphStore::connect).

use crate::types::{CanvasGraph, NodeKind};

/// Why a proposed link was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionRejected {
    /// Source and target are the same node
    #[error("Node '{node_id}' cannot link to itself")]
    SelfLoop { node_id: String },
    /// The source node does not exist
    #[error("Source node '{node_id}' does not exist")]
    UnknownSource { node_id: String },
    /// The target node does not exist
    #[error("Target node '{node_id}' does not exist")]
    UnknownTarget { node_id: String },
    /// Kinds don't form a content → chat pair
    #[error("Cannot link {source} -> {target}")]
    IncompatibleKinds { r#source: NodeKind, target: NodeKind },
    /// The derived link id already names a link between other nodes
    #[error("Link id '{edge_id}' is already used by another link")]
    IdCollision { edge_id: String },
}

/// Kind rule: content-producing kinds may only feed a chat
pub fn is_valid_connection(source: NodeKind, target: NodeKind) -> bool {
    source.produces_context() && target.consumes_context()
}

/// Validate a proposed link between two nodes of a graph
pub fn validate_connection(
    graph: &CanvasGraph,
    source_id: &str,
    target_id: &str,
) -> Result<(), ConnectionRejected> {
    if source_id == target_id {
        return Err(ConnectionRejected::SelfLoop {
            node_id: source_id.to_string(),
        });
    }

    let source = graph
        .find_node(source_id)
        .ok_or_else(|| ConnectionRejected::UnknownSource {
            node_id: source_id.to_string(),
        })?;
    let target = graph
        .find_node(target_id)
        .ok_or_else(|| ConnectionRejected::UnknownTarget {
            node_id: target_id.to_string(),
        })?;

    if !is_valid_connection(source.kind, target.kind) {
        return Err(ConnectionRejected::IncompatibleKinds {
            source: source.kind,
            target: target.kind,
        });
    }

    Ok(())
}
