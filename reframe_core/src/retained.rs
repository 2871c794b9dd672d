// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory scene graph.
//!
//! [`MemoryScene`] stores nodes in a [`PathTable`] and turns each edit into
//! the [`Notice`] that a live scene would announce. It is the upstream used
//! by tests and fixtures, and a convenient source for chaining experiments.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::{ContainerHandle, Node};
use crate::locator::LocatorSet;
use crate::path::Path;
use crate::registry::PathTable;
use crate::source::{AddedEntry, DirtiedEntry, Notice, RemovedEntry, SceneGraphSource};

/// A retained scene graph with interior mutability.
///
/// Edits take `&self` so that a scene shared with an engine through an
/// [`Arc`](std::sync::Arc) can still be changed. Missing ancestors of an
/// inserted node exist implicitly as empty nodes and are not announced.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: RwLock<PathTable<Node>>,
}

impl MemoryScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PathTable<Node>> {
        self.nodes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PathTable<Node>> {
        self.nodes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces the node at `path`.
    pub fn insert(&self, path: Path, node: Node) -> Notice {
        self.insert_all([(path, node)])
    }

    /// Adds or replaces several nodes, announced as one batch.
    pub fn insert_all(&self, nodes: impl IntoIterator<Item = (Path, Node)>) -> Notice {
        let mut table = self.write();
        let entries = nodes
            .into_iter()
            .map(|(path, node)| {
                let entry = AddedEntry {
                    path: path.clone(),
                    type_tag: node.type_tag.clone(),
                };
                table.insert(path, node);
                entry
            })
            .collect();
        Notice::Added(entries)
    }

    /// Removes `path` and everything below it.
    pub fn remove(&self, path: &Path) -> Notice {
        let released = self.write().erase_subtree(path);
        drop(released);
        Notice::Removed(vec![RemovedEntry { path: path.clone() }])
    }

    /// Replaces the attributes of an existing node and reports `locators` as
    /// changed.
    ///
    /// Returns `None` if there is no node at `path`.
    pub fn update(
        &self,
        path: &Path,
        container: ContainerHandle,
        locators: LocatorSet,
    ) -> Option<Notice> {
        let mut table = self.write();
        let node = table.get_mut(path).filter(|n| !n.is_empty())?;
        node.container = Some(container);
        Some(Notice::Dirtied(vec![DirtiedEntry {
            path: path.clone(),
            locators,
        }]))
    }

    /// Number of stored paths, implicit ancestors included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns whether the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl SceneGraphSource for MemoryScene {
    fn node(&self, path: &Path) -> Node {
        self.read().get(path).cloned().unwrap_or_default()
    }

    fn child_paths(&self, path: &Path) -> Vec<Path> {
        let depth = path.depth() + 1;
        self.read()
            .subtree(path)
            .filter(|(p, _)| p.depth() == depth)
            .map(|(p, _)| p.clone())
            .collect()
    }
}
