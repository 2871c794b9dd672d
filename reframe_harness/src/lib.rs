// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene fixtures and stress drivers for reframe overlays.
//!
//! - [`fixtures`] builds upstream nodes carrying transforms and override
//!   parameters, and reads corrected matrices back out of any
//!   [`SceneGraphSource`](reframe_core::source::SceneGraphSource).
//! - [`driver`] runs many concurrent lookups against an engine, optionally
//!   while a writer thread delivers change batches, and reports any lookup
//!   whose result disagreed with a single-threaded baseline.

pub mod driver;
pub mod fixtures;

pub use driver::{LookupStress, StressReport};
pub use fixtures::{PrimBuilder, matrix_at, p, scene};
