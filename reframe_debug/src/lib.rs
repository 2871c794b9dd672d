// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and JSON export for reframe diagnostics.
//!
//! This crate provides [`DiagnosticSink`](reframe_core::diagnostics::DiagnosticSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: in-memory capture of every event as an
//!   owned [`recorder::RecordedEvent`].
//! - [`json::export`]: writes recorded events as a JSON array.
//!
//! It enables the `trace` feature of `reframe_core`, so structural events
//! (wrap, unwrap, invalidate, erase) are delivered alongside warnings.

pub mod json;
pub mod pretty;
pub mod recorder;
