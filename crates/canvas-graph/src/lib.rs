//! Canvas Graph - card and context-link state for the chat canvas
//!
//! This crate owns the mutable graph behind the canvas: cards (nodes) of
//! different kinds, the directed links that feed content cards into chat
//! cards, and a clipboard for duplicating parts of the graph. It provides:
//!
//! - Per-kind id allocation that survives reloads without collisions
//! - Link validation shared by drag gestures and programmatic calls
//! - Cascading deletion (no dangling links) and deduplicated links
//! - Copy/paste of induced subgraphs with fresh ids
//! - Change notifications through [`EventSink`] subscribers
//! - Persistence records for external storage
//!
//! Rendering, input handling and remote persistence live elsewhere; they
//! read the graph and call the store's operations.

pub mod clipboard;
pub mod connection;
pub mod error;
pub mod events;
pub mod ids;
pub mod persistence;
pub mod store;
pub mod types;

// Re-export key types
pub use clipboard::Clipboard;
pub use connection::{is_valid_connection, validate_connection, ConnectionRejected};
pub use error::{GraphError, Result};
pub use events::{EventError, EventSink, GraphEvent, VecEventSink};
pub use ids::{parse_node_id, IdAllocator};
pub use persistence::{load_snapshot, save_snapshot, EdgeRecord, GraphSnapshot, NodeRecord};
pub use store::{GraphStore, HydrateReport, SubscriptionId};
pub use types::{Attributes, CanvasGraph, Edge, EdgeId, Node, NodeId, NodeKind, Position, Viewport};
