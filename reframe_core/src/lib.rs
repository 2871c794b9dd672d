// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical transform overrides for observable scene graphs.
//!
//! `reframe_core` provides a read-only filtering layer between an upstream
//! scene graph and its consumers. It intercepts one attribute, the
//! flattened 4×4 transform, replaces it for nodes carrying override
//! parameters, and keeps every descendant consistent as upstream changes.
//!
//! # Architecture
//!
//! ```text
//!   upstream SceneGraphSource
//!       │  node / child_paths            Added / Removed / Dirtied
//!       ▼                                        │
//!   OverlayEngine::node() ◄── Registry ◄── OverlayEngine::apply()
//!       │                        │                │
//!       ▼                        ▼                ▼
//!   OverlayNode ──► ComputedXform ──► CorrectedMatrix (evaluated per read)
//!       │                                         │
//!       ▼                                         ▼
//!   downstream consumer  ◄──────────────  ChangeObserver (forwarded +
//!                                          synthesized dirtied batches)
//! ```
//!
//! **[`engine`]**: The [`OverlayEngine`](engine::OverlayEngine) facade:
//! lookups, wrapping policy, and the Added/Removed/Dirtied lifecycle.
//!
//! **[`registry`]**: Path-sorted table of wrapped nodes with per-entry
//! atomic slots, and hierarchical invalidation.
//!
//! **[`overlay`]**: Pass-through overlay nodes and the computed transform
//! containers they cache.
//!
//! **[`recovery`]** and **[`geodetic`]**: Pure math: local-transform
//! recovery and re-flattening, unit rescaling, WGS84 to tangent-plane
//! conversion.
//!
//! **[`data`]**, **[`sample`]**, **[`locator`]**, **[`schema`]**: The
//! attribute model: containers, time-sampled leaves, attribute addresses,
//! and typed readers for the transform and override parameters.
//!
//! **[`source`]**: The [`SceneGraphSource`](source::SceneGraphSource) and
//! [`ChangeObserver`](source::ChangeObserver) contracts;
//! **[`retained`]** offers an in-memory implementation.
//!
//! **[`diagnostics`]**: [`DiagnosticSink`](diagnostics::DiagnosticSink)
//! trait for warnings and structural events, with a [`log`] forwarding sink.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables structural diagnostic events
//!   (wrap, unwrap, invalidate, erase). Warnings are always delivered.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod engine;
pub mod geodetic;
pub mod locator;
pub mod overlay;
pub mod path;
pub mod recovery;
pub mod registry;
pub mod retained;
pub mod sample;
pub mod schema;
pub mod source;
pub mod transform;
