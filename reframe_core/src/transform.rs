// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 affine transform.
//!
//! Transforms act on column vectors: a point `p` is mapped to `M · p`, and a
//! child's flattened transform is `parent · local`. This covers the subset of
//! linear algebra the overlay needs (multiply, inverse, translation access and
//! a scale/rotation/translation factorization) without pulling in a full
//! linear-algebra crate.

use core::ops::Mul;

/// A column-major 4×4 affine transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

/// The result of factoring a transform into scale, rotation, and translation.
///
/// Recombining with [`Transform3d::from_parts`] yields `T · R · S`. Shear and
/// scale orientation are not represented and are dropped by the
/// factorization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    /// Per-axis scale. Negative on every axis when the transform mirrors.
    pub scale: [f64; 3],
    /// Proper rotation as three column vectors.
    pub rotation: [[f64; 3]; 3],
    /// Translation column.
    pub translation: [f64; 3],
}

/// Determinants below this magnitude are treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

const POLAR_MAX_ITERATIONS: usize = 32;
const POLAR_TOLERANCE: f64 = 1e-12;

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_uniform_scale(s: f64) -> Self {
        Self::from_scale(s, s, s)
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Builds `T · R · S` from factored parts.
    #[must_use]
    pub fn from_parts(parts: &Decomposed) -> Self {
        let mut out = Self::IDENTITY;
        for (j, axis) in parts.rotation.iter().enumerate() {
            for (i, v) in axis.iter().enumerate() {
                out.cols[j][i] = v * parts.scale[j];
            }
        }
        let [x, y, z] = parts.translation;
        out.cols[3] = [x, y, z, 1.0];
        out
    }

    /// Returns the translation column.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> [f64; 3] {
        let t = self.cols[3];
        [t[0], t[1], t[2]]
    }

    /// Returns a copy with the translation column replaced.
    #[inline]
    #[must_use]
    pub const fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.cols[3] = [translation[0], translation[1], translation[2], 1.0];
        self
    }


    /// Returns the determinant of the full 4×4 matrix.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        let m = &self.cols;
        let s0 = m[0][0] * m[1][1] - m[1][0] * m[0][1];
        let s1 = m[0][0] * m[1][2] - m[1][0] * m[0][2];
        let s2 = m[0][0] * m[1][3] - m[1][0] * m[0][3];
        let s3 = m[0][1] * m[1][2] - m[1][1] * m[0][2];
        let s4 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let s5 = m[0][2] * m[1][3] - m[1][2] * m[0][3];
        let c5 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let c4 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let c3 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let c2 = m[2][0] * m[3][3] - m[3][0] * m[2][3];
        let c1 = m[2][0] * m[3][2] - m[3][0] * m[2][2];
        let c0 = m[2][0] * m[3][1] - m[3][0] * m[2][1];
        s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0
    }

    /// Returns the inverse, or `None` if the matrix is singular or the
    /// result would not be finite.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let m = &self.cols;
        let s0 = m[0][0] * m[1][1] - m[1][0] * m[0][1];
        let s1 = m[0][0] * m[1][2] - m[1][0] * m[0][2];
        let s2 = m[0][0] * m[1][3] - m[1][0] * m[0][3];
        let s3 = m[0][1] * m[1][2] - m[1][1] * m[0][2];
        let s4 = m[0][1] * m[1][3] - m[1][1] * m[0][3];
        let s5 = m[0][2] * m[1][3] - m[1][2] * m[0][3];
        let c5 = m[2][2] * m[3][3] - m[3][2] * m[2][3];
        let c4 = m[2][1] * m[3][3] - m[3][1] * m[2][3];
        let c3 = m[2][1] * m[3][2] - m[3][1] * m[2][2];
        let c2 = m[2][0] * m[3][3] - m[3][0] * m[2][3];
        let c1 = m[2][0] * m[3][2] - m[3][0] * m[2][2];
        let c0 = m[2][0] * m[3][1] - m[3][0] * m[2][1];

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        let out = Self {
            cols: [
                [
                    (m[1][1] * c5 - m[1][2] * c4 + m[1][3] * c3) * inv,
                    (-m[0][1] * c5 + m[0][2] * c4 - m[0][3] * c3) * inv,
                    (m[3][1] * s5 - m[3][2] * s4 + m[3][3] * s3) * inv,
                    (-m[2][1] * s5 + m[2][2] * s4 - m[2][3] * s3) * inv,
                ],
                [
                    (-m[1][0] * c5 + m[1][2] * c2 - m[1][3] * c1) * inv,
                    (m[0][0] * c5 - m[0][2] * c2 + m[0][3] * c1) * inv,
                    (-m[3][0] * s5 + m[3][2] * s2 - m[3][3] * s1) * inv,
                    (m[2][0] * s5 - m[2][2] * s2 + m[2][3] * s1) * inv,
                ],
                [
                    (m[1][0] * c4 - m[1][1] * c2 + m[1][3] * c0) * inv,
                    (-m[0][0] * c4 + m[0][1] * c2 - m[0][3] * c0) * inv,
                    (m[3][0] * s4 - m[3][1] * s2 + m[3][3] * s0) * inv,
                    (-m[2][0] * s4 + m[2][1] * s2 - m[2][3] * s0) * inv,
                ],
                [
                    (-m[1][0] * c3 + m[1][1] * c1 - m[1][2] * c0) * inv,
                    (m[0][0] * c3 - m[0][1] * c1 + m[0][2] * c0) * inv,
                    (-m[3][0] * s3 + m[3][1] * s1 - m[3][2] * s0) * inv,
                    (m[2][0] * s3 - m[2][1] * s1 + m[2][2] * s0) * inv,
                ],
            ],
        };
        out.is_finite().then_some(out)
    }

    /// Factors the upper 3×3 block into rotation and scale by polar
    /// decomposition and reads the translation column directly.
    #[must_use]
    pub fn decompose(&self) -> Decomposed {
        let mut a = [[0.0_f64; 3]; 3];
        for (j, col) in a.iter_mut().enumerate() {
            col.copy_from_slice(&self.cols[j][..3]);
        }

        // Mirroring transforms factor as a proper rotation and a negative scale.
        let sign = if det3(&a) < 0.0 { -1.0 } else { 1.0 };
        for col in &mut a {
            for v in col.iter_mut() {
                *v *= sign;
            }
        }

        let rotation = polar_rotation(&a).unwrap_or(IDENTITY3);
        // S = Rᵀ · A; only the diagonal is kept.
        let mut scale = [0.0_f64; 3];
        for (k, s) in scale.iter_mut().enumerate() {
            *s = sign * dot3(&rotation[k], &a[k]);
        }

        Decomposed {
            scale,
            rotation,
            translation: self.translation(),
        }
    }

    /// Returns whether every element is within `eps` of `other`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

// -- 3×3 helpers (column-major) --

type Mat3 = [[f64; 3]; 3];

const IDENTITY3: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

fn dot3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn det3(m: &Mat3) -> f64 {
    dot3(&m[0], &cross3(&m[1], &m[2]))
}

/// Inverse transpose via the cofactor matrix: `(M⁻¹)ᵀ = cof(M) / det(M)`.
fn inverse_transpose3(m: &Mat3) -> Option<Mat3> {
    let det = det3(m);
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return None;
    }
    // Columns of the cofactor matrix are cross products of the other columns.
    let c0 = cross3(&m[1], &m[2]);
    let c1 = cross3(&m[2], &m[0]);
    let c2 = cross3(&m[0], &m[1]);
    let inv = 1.0 / det;
    Some([
        [c0[0] * inv, c0[1] * inv, c0[2] * inv],
        [c1[0] * inv, c1[1] * inv, c1[2] * inv],
        [c2[0] * inv, c2[1] * inv, c2[2] * inv],
    ])
}

/// Rotation factor of `a = R · S` by Newton iteration `R ← (R + R⁻ᵀ) / 2`.
fn polar_rotation(a: &Mat3) -> Option<Mat3> {
    let mut r = *a;
    for _ in 0..POLAR_MAX_ITERATIONS {
        let it = inverse_transpose3(&r)?;
        let mut next = [[0.0_f64; 3]; 3];
        let mut delta = 0.0_f64;
        for j in 0..3 {
            for i in 0..3 {
                next[j][i] = 0.5 * (r[j][i] + it[j][i]);
                delta = delta.max((next[j][i] - r[j][i]).abs());
            }
        }
        r = next;
        if delta <= POLAR_TOLERANCE {
            break;
        }
    }
    Some(r)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 3.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn scale_then_translate() {
        let s = Transform3d::from_scale(2.0, 2.0, 2.0);
        let t = Transform3d::from_translation(3.0, 4.0, 0.0);
        let combined = t * s;
        assert_eq!(combined.col(0), [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(combined.col(3), [3.0, 4.0, 0.0, 1.0]);
    }

    #[test]
    fn inverse_undoes_multiply() {
        let m = Transform3d::from_translation(3.0, -2.0, 7.0)
            * Transform3d::from_rotation_z(0.7)
            * Transform3d::from_scale(2.0, 0.5, 3.0);
        let inv = m.inverse().expect("matrix is invertible");
        assert!((m * inv).approx_eq(&Transform3d::IDENTITY, EPS));
        assert!((inv * m).approx_eq(&Transform3d::IDENTITY, EPS));
    }

    #[test]
    fn singular_has_no_inverse() {
        let flat = Transform3d::from_scale(1.0, 0.0, 1.0);
        assert!(flat.inverse().is_none(), "zero scale axis is singular");
        assert!(flat.determinant().abs() < SINGULAR_EPSILON);
    }

    #[test]
    fn determinant_of_scale() {
        let s = Transform3d::from_scale(2.0, 3.0, 4.0);
        assert!((s.determinant() - 24.0).abs() < EPS);
    }

    #[test]
    fn decompose_round_trips_rotation_scale_translation() {
        let m = Transform3d::from_translation(5.0, 6.0, 7.0)
            * Transform3d::from_rotation_x(0.3)
            * Transform3d::from_rotation_z(1.1)
            * Transform3d::from_scale(2.0, 3.0, 4.0);
        let parts = m.decompose();
        assert!((parts.scale[0] - 2.0).abs() < 1e-6, "scale {:?}", parts.scale);
        assert!((parts.scale[1] - 3.0).abs() < 1e-6, "scale {:?}", parts.scale);
        assert!((parts.scale[2] - 4.0).abs() < 1e-6, "scale {:?}", parts.scale);
        assert_eq!(parts.translation, [5.0, 6.0, 7.0]);
        assert!(Transform3d::from_parts(&parts).approx_eq(&m, 1e-6));
    }

    #[test]
    fn decompose_mirrored() {
        let m = Transform3d::from_scale(-1.0, -1.0, -1.0);
        let parts = m.decompose();
        assert_eq!(parts.scale, [-1.0, -1.0, -1.0]);
        assert!(Transform3d::from_parts(&parts).approx_eq(&m, EPS));
    }

    #[test]
    fn with_translation_keeps_linear_part() {
        let m = Transform3d::from_scale(2.0, 2.0, 2.0).with_translation([1.0, 2.0, 3.0]);
        assert_eq!(m.col(0), [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(m.translation(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn nan_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[2][1] = f64::NAN;
        assert!(!t.is_finite());
        assert!(t.is_nan());
    }

    #[test]
    fn infinity_detected() {
        let mut t = Transform3d::IDENTITY;
        t.cols[0][3] = f64::INFINITY;
        assert!(!t.is_finite());
        assert!(!t.is_nan());
    }
}
