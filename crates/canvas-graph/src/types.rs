//! Core types for canvas graphs
//!
//! These types define the cards placed on the canvas, the context links
//! between them, and the viewport carried along for persistence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a node (e.g. `"chat-node-7"`)
pub type NodeId = String;

/// Unique identifier for an edge, derived from its endpoints
pub type EdgeId = String;

/// Free-form, kind-specific payload owned by a node
pub type Attributes = Map<String, Value>;

/// The kind of card a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Hosts a conversation and consumes context
    Chat,
    /// Uploaded or fetched content (media, files)
    Context,
    /// Free text written on the canvas
    TextBlock,
    /// Reference to a document living outside the canvas
    ExternalDocument,
}

impl NodeKind {
    /// All kinds, in allocator order
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Chat,
        NodeKind::Context,
        NodeKind::TextBlock,
        NodeKind::ExternalDocument,
    ];

    /// Prefix used when allocating ids for this kind
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeKind::Chat => "chat-node",
            NodeKind::Context => "context-node",
            NodeKind::TextBlock => "text-block-node",
            NodeKind::ExternalDocument => "external-document-node",
        }
    }

    /// Name used in persistence records
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Chat => "chat",
            NodeKind::Context => "context",
            NodeKind::TextBlock => "text-block",
            NodeKind::ExternalDocument => "external-document",
        }
    }

    /// Parse a persisted kind name
    pub fn parse(name: &str) -> Option<NodeKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Whether this kind can feed context into a chat
    pub fn produces_context(&self) -> bool {
        matches!(
            self,
            NodeKind::Context | NodeKind::TextBlock | NodeKind::ExternalDocument
        )
    }

    /// Whether this kind consumes context
    pub fn consumes_context(&self) -> bool {
        matches!(self, NodeKind::Chat)
    }

    /// Attributes every new node of this kind starts with
    pub fn default_attributes(&self) -> Attributes {
        let (width, height) = match self {
            NodeKind::Chat => (480.0, 640.0),
            NodeKind::Context => (320.0, 240.0),
            NodeKind::TextBlock => (280.0, 160.0),
            NodeKind::ExternalDocument => (320.0, 200.0),
        };
        let mut attrs = Map::new();
        attrs.insert("width".into(), Value::from(width));
        attrs.insert("height".into(), Value::from(height));
        attrs.insert("isMinimized".into(), Value::Bool(false));
        attrs.insert("zIndex".into(), Value::from(0));
        attrs
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Position on the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Vector from `self` to `other`
    pub fn delta_to(&self, other: Position) -> (f64, f64) {
        (other.x - self.x, other.y - self.y)
    }

    /// Translate by a vector
    pub fn offset_by(&self, (dx, dy): (f64, f64)) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

/// A card instance on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique, immutable identifier
    pub id: NodeId,
    /// Kind of card
    pub kind: NodeKind,
    /// Position on the canvas
    pub position: Position,
    /// Kind-specific payload
    #[serde(default)]
    pub attributes: Attributes,
    /// Whether the node is part of the current selection
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    /// Get an attribute value
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// A directed context link (content → chat)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Identifier derived from the endpoints
    pub id: EdgeId,
    /// Node supplying context
    pub source_id: NodeId,
    /// Chat node consuming it
    pub target_id: NodeId,
}

impl Edge {
    /// Create an edge with its derived id
    pub fn between(source_id: impl Into<NodeId>, target_id: impl Into<NodeId>) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        Self {
            id: Self::derive_id(&source_id, &target_id),
            source_id,
            target_id,
        }
    }

    /// Deterministic id for an ordered endpoint pair
    pub fn derive_id(source_id: &str, target_id: &str) -> EdgeId {
        format!("edge-{}-{}", source_id, target_id)
    }

    /// Whether this edge touches the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// Presentation-only view state, carried for persistence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// The nodes, edges and viewport of one canvas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasGraph {
    /// Nodes in insertion order
    pub nodes: Vec<Node>,
    /// Edges in insertion order
    pub edges: Vec<Edge>,
    /// Current viewport
    #[serde(default)]
    pub viewport: Viewport,
}

impl CanvasGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Check whether a node exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Find an edge by ID
    pub fn find_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Find the edge linking `source_id` into `target_id`
    pub fn find_link(&self, source_id: &str, target_id: &str) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source_id == source_id && e.target_id == target_id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target_id == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source_id == node_id)
    }

    /// Get every edge that touches a node
    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Edges whose source or target is missing from the node set
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| !self.contains_node(&e.source_id) || !self.contains_node(&e.target_id))
            .collect()
    }
}
