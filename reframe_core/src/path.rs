// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical node identifiers.
//!
//! A [`Path`] is an absolute, segment-based address such as `/world/city/tower`.
//! Paths are compared segment by segment, so in any sorted container a path is
//! immediately followed by all of its descendants. The
//! [`PathTable`](crate::registry::PathTable) relies on this to expose a
//! subtree as one contiguous range.

use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Reasons a string cannot be parsed as a [`Path`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The string did not begin with `/`.
    #[error("path `{0}` is not absolute")]
    NotAbsolute(String),
    /// The string contained an empty segment (`//` or a trailing `/`).
    #[error("path `{0}` contains an empty segment")]
    EmptySegment(String),
}

/// An absolute hierarchical path.
///
/// Cloning is cheap: segments are shared behind an [`Arc`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Arc<[Box<str>]>,
}

impl Path {
    /// The absolute root path, `/`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            segments: Arc::from(Vec::<Box<str>>::new()),
        }
    }

    /// Parses an absolute path such as `/a/b`.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let Some(rest) = s.strip_prefix('/') else {
            return Err(PathError::NotAbsolute(s.to_owned()));
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in rest.split('/') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(s.to_owned()));
            }
            segments.push(Box::from(segment));
        }
        Ok(Self {
            segments: Arc::from(segments),
        })
    }

    /// Returns the path of a direct child named `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or contains `/`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        assert!(
            !name.is_empty() && !name.contains('/'),
            "invalid path segment {name:?}"
        );
        let mut segments: Vec<Box<str>> = self.segments.to_vec();
        segments.push(Box::from(name));
        Self {
            segments: Arc::from(segments),
        }
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: Arc::from(init),
        })
    }

    /// Number of segments; the root has depth 0.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether this is the absolute root.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns whether `prefix` is this path or one of its ancestors.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Iterates the proper ancestors of this path, nearest first, ending with
    /// the root.
    #[must_use]
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.parent(),
        }
    }
}

impl Ord for Path {
    fn cmp(&self, other: &Self) -> Ordering {
        // Slice ordering is lexicographic by segment, and a proper prefix
        // sorts first, which keeps every subtree contiguous.
        self.segments.cmp(&other.segments)
    }
}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in self.segments.iter() {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl core::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Iterator over the ancestors of a [`Path`].
///
/// Created by [`Path::ancestors`].
#[derive(Debug)]
pub struct Ancestors {
    next: Option<Path>,
}

impl Iterator for Ancestors {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
