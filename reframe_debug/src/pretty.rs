// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable diagnostic output.
//!
//! [`PrettyPrintSink`] implements [`DiagnosticSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use reframe_core::diagnostics::{DiagnosticSink, InvalidationEvent, Warning, WrapCause};
use reframe_core::path::Path;

/// Writes human-readable diagnostic lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write + Send = Box<dyn Write + Send>> {
    writer: Mutex<W>,
}

impl<W: Write + Send> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn line(&self, args: std::fmt::Arguments<'_>) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.write_fmt(args);
        let _ = writer.write_all(b"\n");
    }
}

pub(crate) fn cause_name(cause: WrapCause) -> &'static str {
    match cause {
        WrapCause::Eager => "eager",
        WrapCause::Lookup => "lookup",
        WrapCause::Added => "added",
    }
}

impl<W: Write + Send> DiagnosticSink for PrettyPrintSink<W> {
    fn on_warning(&self, warning: &Warning) {
        self.line(format_args!("[warn] {warning}"));
    }

    fn on_wrapped(&self, path: &Path, cause: WrapCause) {
        self.line(format_args!("[wrap] {path} cause={}", cause_name(cause)));
    }

    fn on_unwrapped(&self, path: &Path) {
        self.line(format_args!("[unwrap] {path}"));
    }

    fn on_invalidated(&self, e: &InvalidationEvent<'_>) {
        self.line(format_args!(
            "[dirty] {} cleared={}",
            e.origin,
            e.cleared.len()
        ));
    }

    fn on_erased(&self, path: &Path, count: usize) {
        self.line(format_args!("[erase] {path} entries={count}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_wrap_and_warning() {
        let sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let path = Path::parse("/world/a").unwrap();
        sink.on_wrapped(&path, WrapCause::Lookup);
        sink.on_warning(&Warning::SingularParent { path: path.clone() });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2, "got: {output}");
        assert_eq!(lines[0], "[wrap] /world/a cause=lookup");
        assert!(lines[1].starts_with("[warn] /world/a"), "got: {output}");
    }
}
