// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Warnings and structural events emitted by the overlay.
//!
//! This module provides a [`DiagnosticSink`] trait with one method per event.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine. Sinks are shared between reader threads, so every
//! method takes `&self`.
//!
//! [`Diagnostics`] wraps an optional shared sink. Warnings are always
//! delivered: to the sink when one is attached, otherwise to `log::warn!`. Structural events ([`Diagnostics::wrapped`] and friends) are
//! gated by the `trace` feature: when it is **off**, those methods compile to
//! nothing.
//!
//! [`LogSink`] forwards everything to the [`log`] facade.
//!
//! # Crate features
//!
//! - `trace`: enables the structural event bodies (one branch per call).

use core::fmt;
use std::sync::Arc;

use crate::data::{Token, ValueKind};
use crate::locator::Locator;
use crate::path::Path;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A recoverable problem encountered while computing a transform.
///
/// Each warning is paired with a fallback: the offending value is treated as
/// absent, or the upstream transform is passed through unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// An attribute was present but held the wrong kind of value.
    TypeMismatch {
        /// Node carrying the attribute.
        path: Path,
        /// Attribute address within the node.
        locator: Locator,
        /// Kind the reader expected.
        expected: ValueKind,
        /// Kind actually found.
        found: ValueKind,
    },
    /// The parent transform could not be inverted, so the local transform
    /// could not be recovered.
    SingularParent {
        /// Node whose transform was being corrected.
        path: Path,
    },
    /// The corrected transform contained NaN or infinite entries.
    NonFinite {
        /// Node whose transform was being corrected.
        path: Path,
    },
    /// The stage up axis was neither `y` nor `z`.
    UnknownUpAxis {
        /// Node whose transform was being corrected.
        path: Path,
        /// The declared axis.
        axis: Token,
    },
    /// An overlay parent did not expose its preserved transform.
    MissingPreservedXform {
        /// The parent node.
        path: Path,
    },
}

impl Warning {
    /// Returns the node the warning concerns.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::SingularParent { path }
            | Self::NonFinite { path }
            | Self::UnknownUpAxis { path, .. }
            | Self::MissingPreservedXform { path } => path,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                path,
                locator,
                expected,
                found,
            } => write!(f, "{path}: `{locator}` holds {found}, expected {expected}"),
            Self::SingularParent { path } => {
                write!(f, "{path}: parent transform is not invertible")
            }
            Self::NonFinite { path } => write!(f, "{path}: corrected transform is not finite"),
            Self::UnknownUpAxis { path, axis } => {
                write!(f, "{path}: unknown stage up axis `{axis}`")
            }
            Self::MissingPreservedXform { path } => {
                write!(f, "{path}: overlay node has no preserved transform")
            }
        }
    }
}

/// Why a node's wrapper was installed or replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapCause {
    /// Pre-pass at construction.
    Eager,
    /// First lookup.
    Lookup,
    /// Upstream reported the node as added.
    Added,
}

/// Emitted when cached transforms are cleared by a dirty notice.
#[derive(Clone, Debug)]
pub struct InvalidationEvent<'a> {
    /// The node named in the triggering notice.
    pub origin: &'a Path,
    /// Nodes whose cached transform was cleared, in path order.
    pub cleared: &'a [Path],
}

// ---------------------------------------------------------------------------
// DiagnosticSink trait
// ---------------------------------------------------------------------------

/// Receives diagnostics from the overlay.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait DiagnosticSink: Send + Sync {
    /// Called when a recoverable problem is encountered.
    fn on_warning(&self, warning: &Warning) {
        _ = warning;
    }

    /// Called when a node is wrapped in an overlay node.
    fn on_wrapped(&self, path: &Path, cause: WrapCause) {
        _ = (path, cause);
    }

    /// Called when a wrapped node is replaced by a placeholder.
    fn on_unwrapped(&self, path: &Path) {
        _ = path;
    }

    /// Called after a dirty notice cleared cached transforms.
    fn on_invalidated(&self, e: &InvalidationEvent<'_>) {
        _ = e;
    }

    /// Called after a subtree of entries was released.
    fn on_erased(&self, path: &Path, count: usize) {
        _ = (path, count);
    }
}

// ---------------------------------------------------------------------------
// Stock sinks
// ---------------------------------------------------------------------------

/// A [`DiagnosticSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {}

/// A [`DiagnosticSink`] that forwards to the [`log`] facade.
///
/// Warnings are logged at `warn`, structural events at `trace`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn on_warning(&self, warning: &Warning) {
        log::warn!("{warning}");
    }

    fn on_wrapped(&self, path: &Path, cause: WrapCause) {
        log::trace!("wrapped {path} ({cause:?})");
    }

    fn on_unwrapped(&self, path: &Path) {
        log::trace!("unwrapped {path}");
    }

    fn on_invalidated(&self, e: &InvalidationEvent<'_>) {
        log::trace!(
            "dirty {} cleared {} cached transforms",
            e.origin,
            e.cleared.len()
        );
    }

    fn on_erased(&self, path: &Path, count: usize) {
        log::trace!("erased {count} entries under {path}");
    }
}

// ---------------------------------------------------------------------------
// Diagnostics handle
// ---------------------------------------------------------------------------

/// Cheaply clonable handle to an optional shared [`DiagnosticSink`].
#[derive(Clone, Default)]
pub struct Diagnostics {
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("attached", &self.sink.is_some())
            .finish()
    }
}

impl Diagnostics {
    /// Creates a handle that dispatches to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Creates a handle without a sink.
    ///
    /// Warnings still go to the [`log`] facade; structural events are
    /// dropped. Attach [`NoopSink`] to silence warnings too.
    #[must_use]
    pub fn none() -> Self {
        Self { sink: None }
    }

    /// Reports a warning.
    #[inline]
    pub fn warning(&self, warning: &Warning) {
        match &self.sink {
            Some(s) => s.on_warning(warning),
            None => log::warn!("{warning}"),
        }
    }

    /// Reports a wrapped node.
    #[inline]
    pub fn wrapped(&self, path: &Path, cause: WrapCause) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.on_wrapped(path, cause);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (path, cause);
        }
    }

    /// Reports an unwrapped node.
    #[inline]
    pub fn unwrapped(&self, path: &Path) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.on_unwrapped(path);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = path;
        }
    }

    /// Reports cleared cache entries; empty batches are not reported.
    #[inline]
    pub fn invalidated(&self, origin: &Path, cleared: &[Path]) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink
            && !cleared.is_empty()
        {
            s.on_invalidated(&InvalidationEvent { origin, cleared });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (origin, cleared);
        }
    }

    /// Reports a released subtree.
    #[inline]
    pub fn erased(&self, path: &Path, count: usize) {
        #[cfg(feature = "trace")]
        if let Some(s) = &self.sink {
            s.on_erased(path, count);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (path, count);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        warnings: Mutex<Vec<Warning>>,
        wrapped: Mutex<Vec<Path>>,
    }

    impl DiagnosticSink for Recording {
        fn on_warning(&self, warning: &Warning) {
            self.warnings.lock().unwrap().push(warning.clone());
        }

        fn on_wrapped(&self, path: &Path, _cause: WrapCause) {
            self.wrapped.lock().unwrap().push(path.clone());
        }
    }

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn none_does_nothing() {
        let d = Diagnostics::none();
        d.warning(&Warning::NonFinite { path: p("/a") });
        d.wrapped(&p("/a"), WrapCause::Lookup);
        d.invalidated(&p("/a"), &[p("/a/b")]);
    }

    #[test]
    fn warnings_always_dispatch() {
        let sink = Arc::new(Recording::default());
        let d = Diagnostics::new(sink.clone());
        d.warning(&Warning::SingularParent { path: p("/a/b") });
        let warnings = sink.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].path(), &p("/a/b"));
    }

    #[test]
    fn structural_events_follow_feature() {
        let sink = Arc::new(Recording::default());
        let d = Diagnostics::new(sink.clone());
        d.wrapped(&p("/a"), WrapCause::Eager);
        let expected = usize::from(cfg!(feature = "trace"));
        assert_eq!(sink.wrapped.lock().unwrap().len(), expected);
    }

    #[test]
    fn warning_display() {
        let w = Warning::TypeMismatch {
            path: p("/geo"),
            locator: Locator::new(["xform", "matrix"]),
            expected: ValueKind::Matrix,
            found: ValueKind::Double,
        };
        assert_eq!(
            w.to_string(),
            "/geo: `xform/matrix` holds double, expected matrix"
        );
    }

    #[test]
    fn noop_and_log_sinks_accept_events() {
        let path = p("/a");
        for sink in [&NoopSink as &dyn DiagnosticSink, &LogSink] {
            sink.on_warning(&Warning::NonFinite { path: path.clone() });
            sink.on_wrapped(&path, WrapCause::Added);
            sink.on_unwrapped(&path);
            sink.on_invalidated(&InvalidationEvent {
                origin: &path,
                cleared: &[],
            });
            sink.on_erased(&path, 0);
        }
    }
}
