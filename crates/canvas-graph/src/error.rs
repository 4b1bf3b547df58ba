//! Error types for the canvas graph

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while mutating or loading a canvas graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// The referenced node does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// A persisted record names a kind this build does not know
    #[error("Unknown node kind '{kind}' for node '{node_id}'")]
    UnknownNodeKind { node_id: NodeId, kind: String },

    /// Internal invariant broken (dangling edge, duplicate id).
    ///
    /// Mutations prevent this by construction; reaching it is a bug.
    #[error("Graph integrity violation: {0}")]
    IntegrityViolation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GraphError {
    /// Create an integrity violation with a message
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityViolation(msg.into())
    }
}
