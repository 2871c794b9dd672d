// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter.
//!
//! [`export`] writes events captured by a
//! [`RecorderSink`](super::recorder::RecorderSink) as a JSON array, one
//! object per event, in recorded order. Every object has an `event` field
//! naming its kind and a `path` field naming the node it concerns.

use std::io::{self, Write};

use serde_json::{Value, json};

use reframe_core::diagnostics::Warning;

use crate::pretty::cause_name;
use crate::recorder::RecordedEvent;

/// Exports recorded events as a pretty-printed JSON array.
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let values: Vec<Value> = events.iter().map(to_value).collect();
    serde_json::to_writer_pretty(writer, &values)?;
    Ok(())
}

/// Converts one event to its JSON object.
#[must_use]
pub fn to_value(event: &RecordedEvent) -> Value {
    match event {
        RecordedEvent::Warning(w) => json!({
            "event": "warning",
            "kind": warning_kind(w),
            "path": w.path().to_string(),
            "message": w.to_string(),
        }),
        RecordedEvent::Wrapped { path, cause } => json!({
            "event": "wrapped",
            "path": path.to_string(),
            "cause": cause_name(*cause),
        }),
        RecordedEvent::Unwrapped { path } => json!({
            "event": "unwrapped",
            "path": path.to_string(),
        }),
        RecordedEvent::Invalidated { origin, cleared } => json!({
            "event": "invalidated",
            "path": origin.to_string(),
            "cleared": cleared.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }),
        RecordedEvent::Erased { path, count } => json!({
            "event": "erased",
            "path": path.to_string(),
            "count": count,
        }),
    }
}

fn warning_kind(warning: &Warning) -> &'static str {
    match warning {
        Warning::TypeMismatch { .. } => "type_mismatch",
        Warning::SingularParent { .. } => "singular_parent",
        Warning::NonFinite { .. } => "non_finite",
        Warning::UnknownUpAxis { .. } => "unknown_up_axis",
        Warning::MissingPreservedXform { .. } => "missing_preserved_xform",
    }
}
