// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path-keyed sorted table with placeholder ancestors.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::Bound;

use crate::path::Path;

/// A sorted map from [`Path`] to `T` in which every entry's ancestors are
/// also present.
///
/// Inserting a path creates `T::default()` placeholders for any missing
/// ancestors, so the table always describes a connected tree rooted at `/`.
/// Because paths sort segment-wise, a path and all of its descendants occupy
/// one contiguous range; [`subtree`](Self::subtree) and
/// [`erase_subtree`](Self::erase_subtree) walk only that range.
#[derive(Clone, Debug)]
pub struct PathTable<T> {
    entries: BTreeMap<Path, T>,
}

impl<T> Default for PathTable<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: Default> PathTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry at `path`, if present.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&T> {
        self.entries.get(path)
    }

    /// Returns the entry at `path` mutably, if present.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut T> {
        self.entries.get_mut(path)
    }

    /// Inserts or replaces the entry at `path`, creating placeholder
    /// ancestors as needed. Returns the previous entry.
    pub fn insert(&mut self, path: Path, value: T) -> Option<T> {
        self.fill_ancestors(&path);
        self.entries.insert(path, value)
    }

    /// Returns the entry at `path`, inserting a placeholder (and placeholder
    /// ancestors) if it is missing.
    pub fn entry_or_default(&mut self, path: &Path) -> &mut T {
        if !self.entries.contains_key(path) {
            self.fill_ancestors(path);
        }
        self.entries.entry(path.clone()).or_default()
    }

    fn fill_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if self.entries.contains_key(&ancestor) {
                // Ancestors of an existing entry are already present.
                break;
            }
            self.entries.insert(ancestor, T::default());
        }
    }

    /// Iterates `path` and its descendants in path order.
    pub fn subtree<'a>(&'a self, path: &'a Path) -> Subtree<'a, T> {
        Subtree {
            prefix: path,
            inner: self
                .entries
                .range((Bound::Included(path), Bound::Unbounded)),
        }
    }

    /// Removes `path` and all of its descendants, returning them in path
    /// order.
    ///
    /// Erasing the root clears the table. Ancestors of `path` are kept.
    pub fn erase_subtree(&mut self, path: &Path) -> Vec<(Path, T)> {
        if path.is_root() {
            return core::mem::take(&mut self.entries).into_iter().collect();
        }
        let doomed: Vec<Path> = self.subtree(path).map(|(p, _)| p.clone()).collect();
        doomed
            .into_iter()
            .filter_map(|p| self.entries.remove_entry(&p))
            .collect()
    }

    /// Number of entries, placeholders included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all entries in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, Path, T> {
        self.entries.iter()
    }
}

/// Iterator over a path's subtree.
///
/// Created by [`PathTable::subtree`].
#[derive(Debug)]
pub struct Subtree<'a, T> {
    prefix: &'a Path,
    inner: btree_map::Range<'a, Path, T>,
}

impl<'a, T> Iterator for Subtree<'a, T> {
    type Item = (&'a Path, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, value) = self.inner.next()?;
        path.has_prefix(self.prefix).then_some((path, value))
    }
}
