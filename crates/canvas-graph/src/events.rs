//! Change notifications for graph observers
//!
//! The store publishes a [`GraphEvent`] after every mutation so renderers,
//! persistence and toasts can react without polling the graph.

use serde::{Deserialize, Serialize};

use crate::types::{Edge, EdgeId, NodeId, Position, Viewport};

/// Trait for receiving graph events
///
/// This abstracts over the delivery mechanism (callback, channel, bus)
/// so the store does not depend on any UI framework.
pub trait EventSink: Send + Sync {
    /// Deliver an event
    ///
    /// Returns an error if the event could not be delivered (e.g., receiver gone)
    fn send(&self, event: GraphEvent) -> Result<(), EventError>;
}

/// Error when delivering events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted by the graph store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphEvent {
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId },

    #[serde(rename_all = "camelCase")]
    NodeUpdated { node_id: NodeId },

    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId, position: Position },

    /// A node and every link touching it were removed together
    #[serde(rename_all = "camelCase")]
    NodeRemoved {
        node_id: NodeId,
        removed_edges: Vec<EdgeId>,
    },

    #[serde(rename_all = "camelCase")]
    EdgeAdded { edge: Edge },

    #[serde(rename_all = "camelCase")]
    EdgeRemoved { edge_id: EdgeId },

    #[serde(rename_all = "camelCase")]
    SelectionChanged { selected: Vec<NodeId> },

    #[serde(rename_all = "camelCase")]
    ViewportChanged { viewport: Viewport },

    /// Nodes were captured into the clipboard
    #[serde(rename_all = "camelCase")]
    Copied { node_count: usize, edge_count: usize },

    /// Clipboard contents were instantiated into the graph
    #[serde(rename_all = "camelCase")]
    Pasted {
        node_ids: Vec<NodeId>,
        edge_ids: Vec<EdgeId>,
    },

    /// Graph was cleared
    Reset,

    /// Graph was replaced from external storage
    #[serde(rename_all = "camelCase")]
    Hydrated {
        node_count: usize,
        edge_count: usize,
        dropped_edges: usize,
    },
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<GraphEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        let mut events = self.events.lock().map_err(|_| EventError {
            message: "Event buffer poisoned".to_string(),
        })?;
        events.push(event);
        Ok(())
    }
}

/// Forwards events into a standard channel
impl EventSink for std::sync::mpsc::Sender<GraphEvent> {
    fn send(&self, event: GraphEvent) -> Result<(), EventError> {
        std::sync::mpsc::Sender::send(self, event).map_err(|_| EventError::channel_closed())
    }
}
