// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WGS84 geodetic conversions.
//!
//! Positions are `(lat, lon, alt)` with angles in degrees and altitude in
//! meters. The pipeline is geodetic → ECEF → ENU (relative to a reference
//! position) → stage cartesian.

use crate::config::UpAxis;

/// WGS84 semi-major axis, in meters.
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// First eccentricity squared, `f(2 − f)`.
pub const ECCENTRICITY_SQUARED: f64 = FLATTENING * (2.0 - FLATTENING);

/// Sines and cosines of a geodetic position, plus its ECEF coordinates.
struct Frame {
    sin_lat: f64,
    cos_lat: f64,
    sin_lon: f64,
    cos_lon: f64,
    ecef: [f64; 3],
}

impl Frame {
    fn new(llh: [f64; 3]) -> Self {
        let (sin_lat, cos_lat) = llh[0].to_radians().sin_cos();
        let (sin_lon, cos_lon) = llh[1].to_radians().sin_cos();
        let n = SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
        let h = llh[2];
        Self {
            sin_lat,
            cos_lat,
            sin_lon,
            cos_lon,
            ecef: [
                (h + n) * cos_lat * cos_lon,
                (h + n) * cos_lat * sin_lon,
                (h + (1.0 - ECCENTRICITY_SQUARED) * n) * sin_lat,
            ],
        }
    }
}

/// Converts `(lat, lon, alt)` to earth-centered, earth-fixed coordinates.
#[must_use]
pub fn geodetic_to_ecef(llh: [f64; 3]) -> [f64; 3] {
    Frame::new(llh).ecef
}

/// Expresses an ECEF point as an east-north-up offset from `reference`.
#[must_use]
pub fn ecef_to_enu(ecef: [f64; 3], reference: [f64; 3]) -> [f64; 3] {
    let r = Frame::new(reference);
    let d = [
        ecef[0] - r.ecef[0],
        ecef[1] - r.ecef[1],
        ecef[2] - r.ecef[2],
    ];
    [
        -r.sin_lon * d[0] + r.cos_lon * d[1],
        -r.cos_lon * r.sin_lat * d[0] - r.sin_lat * r.sin_lon * d[1] + r.cos_lat * d[2],
        r.cos_lat * r.cos_lon * d[0] + r.cos_lat * r.sin_lon * d[1] + r.sin_lat * d[2],
    ]
}

/// Maps an ENU offset onto stage axes, in stage units.
///
/// The east component is mirrored when the reference longitude is negative.
#[must_use]
pub fn enu_to_cartesian(
    enu: [f64; 3],
    up_axis: UpAxis,
    meters_per_unit: f64,
    reference: [f64; 3],
) -> [f64; 3] {
    let [e, n, u] = enu;
    let east = if reference[1] < 0.0 { -e } else { e };
    let c = match up_axis {
        UpAxis::Y => [east, u, n],
        UpAxis::Z => [east, n, u],
    };
    c.map(|v| v / meters_per_unit)
}

/// Computes the stage-space translation of `position` relative to
/// `reference`.
#[must_use]
pub fn local_translation(
    position: [f64; 3],
    reference: [f64; 3],
    up_axis: UpAxis,
    meters_per_unit: f64,
) -> [f64; 3] {
    let enu = ecef_to_enu(geodetic_to_ecef(position), reference);
    enu_to_cartesian(enu, up_axis, meters_per_unit, reference)
}
