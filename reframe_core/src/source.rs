// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract between the overlay and the scene graph it filters.
//!
//! The overlay sits between two parties:
//!
//! - **Upstream**: an externally owned scene graph implementing
//!   [`SceneGraphSource`]. It answers node and child queries and announces
//!   its own edits as change batches ([`AddedEntry`], [`RemovedEntry`],
//!   [`DirtiedEntry`]).
//!
//! - **Downstream**: whoever consumes the overlay. It queries the overlay
//!   through the same [`SceneGraphSource`] trait and receives change
//!   batches through a [`ChangeObserver`]. The overlay forwards every
//!   upstream batch unchanged and may follow it with a batch of its own.
//!
//! Because the overlay implements [`SceneGraphSource`] too, overlays chain:
//! one engine can be the upstream of another.
//!
//! # Notification loop
//!
//! Upstream batches are delivered to the engine one at a time, never
//! concurrently with each other, while lookups may continue on other
//! threads:
//!
//! ```rust,ignore
//! let mut log = ChangeLog::new();
//! let notice = scene.insert(path, node);
//! engine.apply(&notice, &mut log);
//!
//! // Downstream replays what the overlay reported.
//! for notice in log.drain() {
//!     consumer.apply(&notice);
//! }
//! ```

use std::sync::Arc;

use crate::data::{Node, Token};
use crate::locator::{self, LocatorSet};
use crate::path::Path;

/// Read access to a hierarchical scene graph.
///
/// Queries take `&self` and may be issued from several threads at once.
pub trait SceneGraphSource: Send + Sync {
    /// Returns the node at `path`.
    ///
    /// A path with no node yields an empty [`Node`].
    fn node(&self, path: &Path) -> Node;

    /// Returns the children of `path` in a stable order.
    fn child_paths(&self, path: &Path) -> Vec<Path>;
}

impl<S: SceneGraphSource + ?Sized> SceneGraphSource for Arc<S> {
    fn node(&self, path: &Path) -> Node {
        (**self).node(path)
    }

    fn child_paths(&self, path: &Path) -> Vec<Path> {
        (**self).child_paths(path)
    }
}

/// A node that appeared, or was replaced, upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddedEntry {
    /// The added node.
    pub path: Path,
    /// Its type tag.
    pub type_tag: Token,
}

/// A subtree that disappeared upstream.
///
/// The absolute root means the whole scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemovedEntry {
    /// Root of the removed subtree.
    pub path: Path,
}

/// Attributes of a node that changed upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirtiedEntry {
    /// The changed node.
    pub path: Path,
    /// What changed.
    pub locators: LocatorSet,
}

impl DirtiedEntry {
    /// A notice that the transform of `path` changed.
    #[must_use]
    pub fn xform(path: Path) -> Self {
        Self {
            path,
            locators: LocatorSet::from(locator::xform()),
        }
    }
}

/// Receives change batches.
pub trait ChangeObserver {
    /// Nodes were added or replaced.
    fn added(&mut self, entries: &[AddedEntry]);

    /// Subtrees were removed.
    fn removed(&mut self, entries: &[RemovedEntry]);

    /// Attributes changed.
    fn dirtied(&mut self, entries: &[DirtiedEntry]);
}

/// One change batch of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// See [`ChangeObserver::added`].
    Added(Vec<AddedEntry>),
    /// See [`ChangeObserver::removed`].
    Removed(Vec<RemovedEntry>),
    /// See [`ChangeObserver::dirtied`].
    Dirtied(Vec<DirtiedEntry>),
}

impl Notice {
    /// Hands this batch to `observer`.
    pub fn deliver(&self, observer: &mut dyn ChangeObserver) {
        match self {
            Self::Added(entries) => observer.added(entries),
            Self::Removed(entries) => observer.removed(entries),
            Self::Dirtied(entries) => observer.dirtied(entries),
        }
    }

    /// Returns whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Added(entries) => entries.is_empty(),
            Self::Removed(entries) => entries.is_empty(),
            Self::Dirtied(entries) => entries.is_empty(),
        }
    }
}

/// A [`ChangeObserver`] that records batches in arrival order.
#[derive(Clone, Debug, Default)]
pub struct ChangeLog {
    notices: Vec<Notice>,
}

impl ChangeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded batches, oldest first.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Removes and returns every recorded batch.
    pub fn drain(&mut self) -> Vec<Notice> {
        core::mem::take(&mut self.notices)
    }

    /// Clears the log.
    pub fn clear(&mut self) {
        self.notices.clear();
    }

    /// Every path reported dirty with a transform-affecting locator, in
    /// arrival order.
    #[must_use]
    pub fn xform_dirtied(&self) -> Vec<Path> {
        let xform = locator::xform();
        self.notices
            .iter()
            .filter_map(|n| match n {
                Notice::Dirtied(entries) => Some(entries),
                _ => None,
            })
            .flatten()
            .filter(|e| e.locators.intersects(&xform))
            .map(|e| e.path.clone())
            .collect()
    }
}

impl ChangeObserver for ChangeLog {
    fn added(&mut self, entries: &[AddedEntry]) {
        self.notices.push(Notice::Added(entries.to_vec()));
    }

    fn removed(&mut self, entries: &[RemovedEntry]) {
        self.notices.push(Notice::Removed(entries.to_vec()));
    }

    fn dirtied(&mut self, entries: &[DirtiedEntry]) {
        self.notices.push(Notice::Dirtied(entries.to_vec()));
    }
}
