// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registry of wrapped nodes.
//!
//! The [`Registry`] owns every overlay node through a [`PathTable`] of
//! [`Entry`] handles. Two kinds of mutation happen here:
//!
//! - **Structural**: inserting or erasing entries. These take the
//!   table-wide write lock and are the only operations that do.
//! - **Per-entry**: swapping an entry's wrapped node or clearing its cached
//!   transform. These go through [`AtomicSlot`]s and never touch the table
//!   lock beyond the read needed to find the entry.
//!
//! Entries are reference counted, so a reader clones the handle, releases
//! the table lock, and only then does any computation.

pub mod invalidate;
pub mod slot;
pub mod table;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::{ContainerHandle, Node, Token};
use crate::overlay::OverlayNode;
use crate::path::Path;

pub use invalidate::dirty_hierarchy;
pub use slot::AtomicSlot;
pub use table::{PathTable, Subtree};

/// A node as presented by the overlay.
#[derive(Clone, Debug)]
pub struct WrappedPrim {
    /// The upstream type tag.
    pub type_tag: Token,
    /// The overlay container, usually a [`Container::Overlay`].
    ///
    /// [`Container::Overlay`]: crate::data::Container::Overlay
    pub container: Option<ContainerHandle>,
}

impl WrappedPrim {
    /// Returns whether this describes a real node rather than a placeholder.
    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        !self.type_tag.is_empty() || self.container.is_some()
    }

    /// Returns the overlay node, if the container is one.
    #[must_use]
    pub fn overlay(&self) -> Option<&OverlayNode> {
        self.container.as_deref()?.as_overlay()
    }

    /// Returns the node as seen by consumers.
    #[must_use]
    pub fn to_node(&self) -> Node {
        Node::new(self.type_tag.clone(), self.container.clone())
    }
}

/// One registry entry; a placeholder while its slot is empty.
#[derive(Debug, Default)]
pub struct Entry {
    prim: AtomicSlot<WrappedPrim>,
}

impl Entry {
    /// Returns the wrapped node, if this is not a placeholder.
    #[must_use]
    pub fn prim(&self) -> Option<Arc<WrappedPrim>> {
        self.prim.load().filter(|p| p.is_wrapped())
    }

    /// Returns whether this entry holds a real wrapped node.
    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        self.prim().is_some()
    }

    /// Installs `prim`, returning the previous one.
    pub fn set_prim(&self, prim: WrappedPrim) -> Option<Arc<WrappedPrim>> {
        self.prim.store(Some(Arc::new(prim)))
    }

    /// Installs `prim` unless a node is already wrapped here; returns the
    /// node the entry holds afterwards.
    pub fn publish(&self, prim: WrappedPrim) -> Arc<WrappedPrim> {
        self.prim.get_or_publish(Arc::new(prim))
    }

    /// Turns this entry back into a placeholder.
    pub fn clear_prim(&self) -> Option<Arc<WrappedPrim>> {
        self.prim.take()
    }

    /// Returns whether the wrapped node has a cached transform.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.prim
            .load()
            .is_some_and(|p| p.overlay().is_some_and(OverlayNode::is_cached))
    }

    /// Clears the cached transform; returns whether one was present.
    pub fn invalidate(&self) -> bool {
        self.prim
            .load()
            .is_some_and(|p| p.overlay().is_some_and(OverlayNode::invalidate))
    }
}

/// Path-indexed registry of overlay nodes.
#[derive(Debug, Default)]
pub struct Registry {
    table: RwLock<PathTable<Arc<Entry>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PathTable<Arc<Entry>>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PathTable<Arc<Entry>>> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry at `path`, if present (real or placeholder).
    #[must_use]
    pub fn entry(&self, path: &Path) -> Option<Arc<Entry>> {
        self.read().get(path).cloned()
    }

    /// Looks up `path`: the wrapped node if any, and whether it is real.
    ///
    /// A placeholder yields `(None, false)`, as does a missing entry.
    #[must_use]
    pub fn lookup(&self, path: &Path) -> (Option<Arc<WrappedPrim>>, bool) {
        let prim = self.entry(path).and_then(|e| e.prim());
        let found = prim.is_some();
        (prim, found)
    }

    /// Returns the entry at `path`, creating it (and placeholder ancestors)
    /// if missing.
    pub fn entry_or_insert(&self, path: &Path) -> Arc<Entry> {
        if let Some(entry) = self.entry(path) {
            return entry;
        }
        self.write().entry_or_default(path).clone()
    }

    /// Installs or replaces the wrapped node at `path`.
    pub fn insert_or_update(&self, path: &Path, prim: WrappedPrim) -> Option<Arc<WrappedPrim>> {
        self.entry_or_insert(path).set_prim(prim)
    }

    /// Removes `path` and its descendants, returning the released entries.
    ///
    /// The caller drops the returned entries after the table lock has been
    /// released.
    #[must_use = "released entries should be dropped outside the table lock"]
    pub fn erase_subtree(&self, path: &Path) -> Vec<(Path, Arc<Entry>)> {
        self.write().erase_subtree(path)
    }

    /// Returns `path` and its descendants that have entries, in path order.
    #[must_use]
    pub fn subtree_entries(&self, path: &Path) -> Vec<(Path, Arc<Entry>)> {
        self.read()
            .subtree(path)
            .map(|(p, e)| (p.clone(), e.clone()))
            .collect()
    }

    /// Number of entries, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of real wrapped nodes.
    #[must_use]
    pub fn wrapped_count(&self) -> usize {
        self.read().iter().filter(|(_, e)| e.is_wrapped()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn typed(tag: &str) -> WrappedPrim {
        WrappedPrim {
            type_tag: Token::new(tag),
            container: None,
        }
    }

    #[test]
    fn placeholders_are_not_found() {
        let r = Registry::new();
        r.insert_or_update(&p("/a/b"), typed("Xform"));
        let (prim, found) = r.lookup(&p("/a"));
        assert!(prim.is_none() && !found, "ancestor is a placeholder");
        let (prim, found) = r.lookup(&p("/a/b"));
        assert!(found);
        assert_eq!(prim.unwrap().type_tag.as_str(), "Xform");
        assert_eq!(r.len(), 3);
        assert_eq!(r.wrapped_count(), 1);
    }

    #[test]
    fn empty_prim_counts_as_placeholder() {
        let r = Registry::new();
        r.insert_or_update(&p("/a"), typed(""));
        assert!(!r.lookup(&p("/a")).1);
    }

    #[test]
    fn publish_keeps_first() {
        let r = Registry::new();
        let entry = r.entry_or_insert(&p("/a"));
        let first = entry.publish(typed("A"));
        let second = entry.publish(typed("B"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.type_tag.as_str(), "A");
    }

    #[test]
    fn erase_returns_released_entries() {
        let r = Registry::new();
        r.insert_or_update(&p("/a/b"), typed("X"));
        r.insert_or_update(&p("/c"), typed("X"));
        let released = r.erase_subtree(&p("/a"));
        assert_eq!(released.len(), 2);
        assert!(r.entry(&p("/c")).is_some());
        assert!(r.entry(&p("/a/b")).is_none());
    }

    #[test]
    fn clear_prim_restores_placeholder() {
        let r = Registry::new();
        r.insert_or_update(&p("/a"), typed("X"));
        let entry = r.entry(&p("/a")).unwrap();
        assert!(entry.clear_prim().is_some());
        assert!(!entry.is_wrapped());
        assert!(r.entry(&p("/a")).is_some(), "entry itself is kept");
    }
}
