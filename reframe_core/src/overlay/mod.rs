// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlay nodes and their computed transforms.
//!
//! An [`OverlayNode`] forwards every attribute of its upstream node except
//! `xform`, which it answers with a cached container. The container is
//! either the upstream one (no override applies) or a [`ComputedXform`]
//! whose matrix is a [`CorrectedMatrix`]:
//!
//! - **Direct**: the node carries override parameters. Its local transform
//!   is recovered against the parent's upstream transform, corrected, and
//!   re-flattened against the parent's corrected transform.
//! - **Dependent**: an ancestor carries parameters. The node keeps its local
//!   transform and follows its parent's correction.

pub mod computed;
pub mod node;

pub use computed::{ComputedXform, CorrectedMatrix, Recipe};
pub use node::{NodeLookup, OverlayContext, OverlayNode};
