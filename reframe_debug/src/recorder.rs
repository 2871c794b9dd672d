// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event capture.
//!
//! [`RecorderSink`] implements [`DiagnosticSink`] and stores every event as
//! an owned [`RecordedEvent`], in arrival order. Sinks are shared between
//! threads, so the buffer sits behind a mutex; events from concurrent
//! lookups interleave in the order they took the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reframe_core::diagnostics::{DiagnosticSink, InvalidationEvent, Warning, WrapCause};
use reframe_core::path::Path;

/// One recorded diagnostic event.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// See [`DiagnosticSink::on_warning`].
    Warning(Warning),
    /// See [`DiagnosticSink::on_wrapped`].
    Wrapped {
        /// The wrapped node.
        path: Path,
        /// Why it was wrapped.
        cause: WrapCause,
    },
    /// See [`DiagnosticSink::on_unwrapped`].
    Unwrapped {
        /// The node reverted to a placeholder.
        path: Path,
    },
    /// See [`DiagnosticSink::on_invalidated`].
    Invalidated {
        /// The node named in the dirty notice.
        origin: Path,
        /// Nodes whose cached transform was cleared.
        cleared: Vec<Path>,
    },
    /// See [`DiagnosticSink::on_erased`].
    Erased {
        /// Root of the released subtree.
        path: Path,
        /// Number of released entries.
        count: usize,
    },
}

/// A [`DiagnosticSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn buf(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: RecordedEvent) {
        self.buf().push(event);
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.buf().clone()
    }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<RecordedEvent> {
        core::mem::take(&mut *self.buf())
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf().len()
    }

    /// Returns whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf().is_empty()
    }

    /// The recorded warnings, in order.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.buf()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Warning(w) => Some(w.clone()),
                _ => None,
            })
            .collect()
    }

    /// Paths wrapped for the given reason, in order.
    #[must_use]
    pub fn wrapped(&self, cause: WrapCause) -> Vec<Path> {
        self.buf()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::Wrapped { path, cause: c } if *c == cause => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for RecorderSink {
    fn on_warning(&self, warning: &Warning) {
        self.push(RecordedEvent::Warning(warning.clone()));
    }

    fn on_wrapped(&self, path: &Path, cause: WrapCause) {
        self.push(RecordedEvent::Wrapped {
            path: path.clone(),
            cause,
        });
    }

    fn on_unwrapped(&self, path: &Path) {
        self.push(RecordedEvent::Unwrapped { path: path.clone() });
    }

    fn on_invalidated(&self, e: &InvalidationEvent<'_>) {
        self.push(RecordedEvent::Invalidated {
            origin: e.origin.clone(),
            cleared: e.cleared.to_vec(),
        });
    }

    fn on_erased(&self, path: &Path, count: usize) {
        self.push(RecordedEvent::Erased {
            path: path.clone(),
            count,
        });
    }
}
