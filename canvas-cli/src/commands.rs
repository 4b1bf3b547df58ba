//! Graph commands over a snapshot file
//!
//! Each command loads the snapshot into a [`GraphStore`], applies one
//! operation through the store and writes the snapshot back.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use canvas_graph::{
    load_snapshot, save_snapshot, Attributes, Edge, GraphStore, Node, NodeId, NodeKind, Position,
};
use serde_json::Value;

use crate::error::{CliError, Result};

/// A graph store bound to the snapshot file it came from
pub struct Canvas {
    store: GraphStore,
    path: PathBuf,
}

impl Canvas {
    /// Load the snapshot at `path`; a missing file opens an empty canvas
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = load_snapshot(&path)?;
        let mut store = GraphStore::new();
        let report = store.hydrate_snapshot(snapshot)?;
        if !report.dropped_nodes.is_empty() || !report.dropped_edges.is_empty() {
            log::warn!(
                "Repaired snapshot {:?}: dropped {} node(s) and {} link(s)",
                path,
                report.dropped_nodes.len(),
                report.dropped_edges.len()
            );
        }
        Ok(Self { store, path })
    }

    pub fn save(&self) -> Result<()> {
        save_snapshot(&self.path, &self.store.snapshot())?;
        Ok(())
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_parts(self) -> (GraphStore, PathBuf) {
        (self.store, self.path)
    }
}

/// Human-readable listing of the graph
pub fn show(store: &GraphStore) -> String {
    let mut out = String::new();
    if store.nodes().is_empty() {
        out.push_str("Canvas is empty\n");
        return out;
    }

    let _ = writeln!(out, "Cards ({}):", store.nodes().len());
    for node in store.nodes() {
        let _ = writeln!(
            out,
            "  {:<28} {:<18} ({}, {})",
            node.id, node.kind, node.position.x, node.position.y
        );
    }

    let _ = writeln!(out, "Links ({}):", store.edges().len());
    for edge in store.edges() {
        let _ = writeln!(out, "  {} -> {}", edge.source_id, edge.target_id);
    }

    let chats: Vec<&Node> = store.nodes().iter().filter(|n| n.kind == NodeKind::Chat).collect();
    if !chats.is_empty() {
        out.push_str("Chat context:\n");
        for chat in chats {
            let context = store.connected_context_ids(&chat.id);
            let listed = if context.is_empty() {
                "(none)".to_string()
            } else {
                context.join(", ")
            };
            let _ = writeln!(out, "  {}: {}", chat.id, listed);
        }
    }
    out
}

pub fn add(
    store: &mut GraphStore,
    kind: NodeKind,
    position: Position,
    attributes: Vec<(String, Value)>,
) -> Node {
    let initial: Attributes = attributes.into_iter().collect();
    store.add_node(kind, position, initial)
}

pub fn connect(store: &mut GraphStore, source: &str, target: &str) -> Result<Edge> {
    Ok(store.connect(source, target)?)
}

/// Delete a card or a link by id
pub fn delete(store: &mut GraphStore, id: &str) -> Result<String> {
    if store.node(id).is_some() {
        let removed = store.delete_node(id);
        return Ok(format!("Deleted {} and {} link(s)", id, removed.len()));
    }
    match store.delete_edge(id) {
        Some(edge) => Ok(format!("Deleted link {} -> {}", edge.source_id, edge.target_id)),
        None => Err(CliError::NotFound(id.to_string())),
    }
}

/// Copy the given cards and paste them with the first at `target`
pub fn duplicate(store: &mut GraphStore, ids: &[NodeId], target: Position) -> Result<Vec<NodeId>> {
    if let Some(missing) = ids.iter().find(|id| store.node(id).is_none()) {
        return Err(CliError::NotFound(missing.clone()));
    }
    store.copy(ids);
    Ok(store.paste(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_commands_persist_through_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canvas.json");

        let mut canvas = Canvas::open(&path).unwrap();
        let chat = add(canvas.store_mut(), NodeKind::Chat, Position::new(0.0, 0.0), vec![]);
        let ctx = add(
            canvas.store_mut(),
            NodeKind::Context,
            Position::new(-200.0, 0.0),
            vec![("title".into(), json!("Notes"))],
        );
        connect(canvas.store_mut(), &ctx.id, &chat.id).unwrap();
        canvas.save().unwrap();

        let reopened = Canvas::open(&path).unwrap();
        assert_eq!(reopened.store().nodes().len(), 2);
        assert_eq!(reopened.store().connected_context_ids(&chat.id), vec![ctx.id.clone()]);
        assert_eq!(
            reopened.store().node(&ctx.id).and_then(|n| n.attribute("title")),
            Some(&json!("Notes"))
        );
        assert!(show(reopened.store()).contains(&format!("{}: {}", chat.id, ctx.id)));
    }

    #[test]
    fn test_connect_rejection_is_reported() {
        let mut store = GraphStore::new();
        let a = add(&mut store, NodeKind::Chat, Position::new(0.0, 0.0), vec![]);
        let b = add(&mut store, NodeKind::Chat, Position::new(10.0, 0.0), vec![]);
        assert!(matches!(connect(&mut store, &a.id, &b.id), Err(CliError::Rejected(_))));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_delete_node_or_edge() {
        let mut store = GraphStore::new();
        let chat = add(&mut store, NodeKind::Chat, Position::new(0.0, 0.0), vec![]);
        let a = add(&mut store, NodeKind::TextBlock, Position::new(0.0, 0.0), vec![]);
        let b = add(&mut store, NodeKind::Context, Position::new(0.0, 0.0), vec![]);
        let edge = connect(&mut store, &a.id, &chat.id).unwrap();
        connect(&mut store, &b.id, &chat.id).unwrap();

        let msg = delete(&mut store, &edge.id).unwrap();
        assert!(msg.starts_with("Deleted link"));
        assert_eq!(store.edges().len(), 1);

        let msg = delete(&mut store, &chat.id).unwrap();
        assert_eq!(msg, format!("Deleted {} and 1 link(s)", chat.id));
        assert!(store.edges().is_empty());

        assert!(matches!(delete(&mut store, "nope"), Err(CliError::NotFound(_))));
    }

    #[test]
    fn test_duplicate() {
        let mut store = GraphStore::new();
        let chat = add(&mut store, NodeKind::Chat, Position::new(0.0, 0.0), vec![]);
        let ctx = add(&mut store, NodeKind::Context, Position::new(100.0, 0.0), vec![]);
        connect(&mut store, &ctx.id, &chat.id).unwrap();

        let pasted = duplicate(
            &mut store,
            &[chat.id.clone(), ctx.id.clone()],
            Position::new(500.0, 500.0),
        )
        .unwrap();
        assert_eq!(pasted.len(), 2);
        assert_eq!(store.nodes().len(), 4);
        assert_eq!(store.edges().len(), 2);
        assert_eq!(store.connected_context_ids(&pasted[0]), vec![pasted[1].clone()]);

        assert!(matches!(
            duplicate(&mut store, &["missing".to_string()], Position::new(0.0, 0.0)),
            Err(CliError::NotFound(_))
        ));
    }

    #[test]
    fn test_show_empty() {
        assert_eq!(show(&GraphStore::new()), "Canvas is empty\n");
    }
}
