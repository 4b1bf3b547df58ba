//! Per-kind node identifier allocation
//!
//! Ids are `"{prefix}-{n}"` where `n` is a counter kept per [`NodeKind`].
//! Counters are not persisted: after loading a graph they are re-derived
//! from the highest suffix already in use. A counter restored at the top
//! of the suffix range falls back to the lowest suffixes not taken by the
//! restored graph.

use std::collections::{HashMap, HashSet};

use crate::types::{Node, NodeId, NodeKind};

/// Bump allocator for node ids, one counter per kind
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: HashMap<NodeKind, u64>,
    /// Suffixes present at the last `rederive`
    restored: HashMap<NodeKind, HashSet<u64>>,
    /// Last suffix handed out once a counter could not advance
    reclaimed: HashMap<NodeKind, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id for a kind
    pub fn next(&mut self, kind: NodeKind) -> NodeId {
        let n = match self.current(kind).checked_add(1) {
            Some(n) => {
                self.counters.insert(kind, n);
                n
            }
            None => self.reclaim(kind),
        };
        format!("{}-{}", kind.id_prefix(), n)
    }

    /// Lowest suffix above the last reclaimed one that no restored node uses
    fn reclaim(&mut self, kind: NodeKind) -> u64 {
        let taken = self.restored.get(&kind);
        let cursor = self.reclaimed.entry(kind).or_insert(0);
        if *cursor == 0 {
            log::warn!("Id counter for {} is exhausted; reusing free suffixes", kind);
        }
        loop {
            *cursor += 1;
            let n = *cursor;
            if !taken.is_some_and(|set| set.contains(&n)) {
                return n;
            }
        }
    }

    /// Current counter value for a kind (the last suffix handed out)
    pub fn current(&self, kind: NodeKind) -> u64 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    /// Reset every counter to zero
    pub fn reset(&mut self) {
        self.counters.clear();
        self.restored.clear();
        self.reclaimed.clear();
    }

    /// Re-derive counters from a restored node set.
    ///
    /// Each counter becomes the max numeric suffix among ids of that kind.
    /// Ids that don't follow the allocator's format are ignored.
    pub fn rederive<'a>(&mut self, nodes: impl IntoIterator<Item = &'a Node>) {
        self.reset();
        for node in nodes {
            let Some((kind, n)) = parse_node_id(&node.id) else {
                continue;
            };
            if kind != node.kind {
                log::debug!(
                    "Node '{}' has kind {} but an id prefix for {}",
                    node.id,
                    node.kind,
                    kind
                );
            }
            let counter = self.counters.entry(kind).or_insert(0);
            *counter = (*counter).max(n);
            self.restored.entry(kind).or_default().insert(n);
        }
    }
}

/// Split an allocator-formatted id into its kind and numeric suffix
pub fn parse_node_id(id: &str) -> Option<(NodeKind, u64)> {
    let (prefix, suffix) = id.rsplit_once('-')?;
    let kind = NodeKind::ALL.into_iter().find(|k| k.id_prefix() == prefix)?;
    let n = suffix.parse::<u64>().ok()?;
    Some((kind, n))
}
