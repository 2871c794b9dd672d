// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical cache invalidation.
//!
//! A corrected transform depends on the transforms of every ancestor, so a
//! transform change at a path invalidates cached transforms in its whole
//! subtree. Only entries that have been materialized are visited, and only
//! entries that actually held a cache are reported: a descendant that was
//! never read has nothing stale to announce.

use crate::diagnostics::Diagnostics;
use crate::locator::{self, LocatorSet};
use crate::path::Path;

use super::Registry;

/// Clears cached transforms under `path` after a change to `locators`.
///
/// Does nothing unless `locators` intersects the transform locator.
/// Otherwise every entry in the subtree of `path` with a cached transform is
/// cleared, and its path is returned in path order. `path` itself is cleared
/// too, but only reported when `include_self` is set.
pub fn dirty_hierarchy(
    registry: &Registry,
    path: &Path,
    locators: &LocatorSet,
    include_self: bool,
    diagnostics: &Diagnostics,
) -> Vec<Path> {
    if !locators.intersects(&locator::xform()) {
        return Vec::new();
    }
    let mut cleared = Vec::new();
    for (entry_path, entry) in registry.subtree_entries(path) {
        if entry.invalidate() && (include_self || entry_path != *path) {
            cleared.push(entry_path);
        }
    }
    diagnostics.invalidated(path, &cleared);
    cleared
}
