// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Local-transform recovery and re-flattening.
//!
//! Upstream nodes only expose flattened transforms. With `FT` a node's
//! flattened transform and `P` its parent's, the local transform satisfies
//! `FT = P · LT`, hence `LT = P⁻¹ · FT`. Every correction in the overlay is
//! built from that identity:
//!
//! - [`rebase`]: a node without parameters follows its parent's correction,
//!   `FT' = P_new · P_orig⁻¹ · FT`.
//! - [`reposition`]: a node with a new local translation keeps its recovered
//!   scale and rotation, `FT' = P_new · T(t) · R · S`.
//! - [`rescale`]: a node authored in other units is scaled uniformly after
//!   its local transform, `FT' = P_new · S(k) · LT`.

use thiserror::Error;

use crate::transform::{Decomposed, Transform3d};

/// Reasons a local transform cannot be recovered.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum RecoveryError {
    /// The parent transform has no inverse.
    #[error("parent transform is singular (determinant {determinant})")]
    Singular {
        /// Determinant of the parent transform.
        determinant: f64,
    },
}

/// Recovers `LT = P⁻¹ · FT`.
pub fn recover_local(
    flattened: &Transform3d,
    parent: &Transform3d,
) -> Result<Transform3d, RecoveryError> {
    let inverse = parent.inverse().ok_or_else(|| RecoveryError::Singular {
        determinant: parent.determinant(),
    })?;
    Ok(inverse * *flattened)
}

/// Re-flattens a local transform, `P · LT`.
#[inline]
#[must_use]
pub fn reflatten(local: &Transform3d, parent: &Transform3d) -> Transform3d {
    *parent * *local
}

/// Moves a flattened transform from one parent to another, keeping its local
/// part.
pub fn rebase(
    flattened: &Transform3d,
    original_parent: &Transform3d,
    new_parent: &Transform3d,
) -> Result<Transform3d, RecoveryError> {
    if original_parent == new_parent {
        return Ok(*flattened);
    }
    let local = recover_local(flattened, original_parent)?;
    Ok(reflatten(&local, new_parent))
}

/// Replaces the translation of a local transform, keeping the scale and
/// rotation recovered by polar decomposition.
#[must_use]
pub fn replace_translation(local: &Transform3d, translation: [f64; 3]) -> Transform3d {
    let parts = local.decompose();
    Transform3d::from_parts(&Decomposed {
        translation,
        ..parts
    })
}

/// Applies a uniform scale after a local transform, `S(k) · LT`.
#[must_use]
pub fn apply_uniform_scale(local: &Transform3d, factor: f64) -> Transform3d {
    Transform3d::from_uniform_scale(factor) * *local
}

/// Recomputes a flattened transform whose local translation is replaced by
/// `translation`.
pub fn reposition(
    flattened: &Transform3d,
    original_parent: &Transform3d,
    new_parent: &Transform3d,
    translation: [f64; 3],
) -> Result<Transform3d, RecoveryError> {
    let local = recover_local(flattened, original_parent)?;
    Ok(reflatten(&replace_translation(&local, translation), new_parent))
}

/// Recomputes a flattened transform whose local transform is scaled by
/// `factor`.
pub fn rescale(
    flattened: &Transform3d,
    original_parent: &Transform3d,
    new_parent: &Transform3d,
    factor: f64,
) -> Result<Transform3d, RecoveryError> {
    let local = recover_local(flattened, original_parent)?;
    Ok(reflatten(&apply_uniform_scale(&local, factor), new_parent))
}
