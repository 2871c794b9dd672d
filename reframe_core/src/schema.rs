// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute names and typed readers for the transform and override
//! parameters.
//!
//! Layout of the attributes the overlay reads:
//!
//! ```text
//! xform/                     transform (every node)
//!   matrix                   flattened 4×4, sampled
//!   resetXformStack          bool
//! overlayPreservedXform/     upstream transform (overlay nodes only)
//! localPosition/             geodetic override on the node
//!   position                 (lat, lon, alt), sampled
//! referencePosition/         geodetic frame on the node or an ancestor
//!   tangentPlane             token
//!   referencePosition        (lat, lon, alt)
//!   orientation              vec3
//!   stageUpAxis              token (`y` or `z`)
//!   stageMetersPerUnit       double
//! metrics/                   unit-scale override on the node
//!   layerMetersPerUnit       double
//!   stageMetersPerUnit       double
//! ```
//!
//! Readers treat a value of the wrong kind as absent and report a
//! [`Warning::TypeMismatch`].

use crate::config::{OverlayDefaults, UpAxis};
use crate::data::{Container, SampledHandle, Token, Value, ValueKind};
use crate::diagnostics::{Diagnostics, Warning};
use crate::locator::Locator;
use crate::path::Path;
use crate::sample::Time;
use crate::transform::Transform3d;

/// Transform container.
pub const XFORM: &str = "xform";
/// Flattened matrix within [`XFORM`].
pub const MATRIX: &str = "matrix";
/// Reset-stack flag within [`XFORM`].
pub const RESET_XFORM_STACK: &str = "resetXformStack";
/// Upstream transform exposed by overlay nodes.
pub const OVERLAY_PRESERVED_XFORM: &str = "overlayPreservedXform";

/// Geodetic override on the node.
pub const LOCAL_POSITION: &str = "localPosition";
/// Geodetic position within [`LOCAL_POSITION`].
pub const POSITION: &str = "position";

/// Geodetic reference frame.
pub const REFERENCE_POSITION: &str = "referencePosition";
/// Tangent plane name within [`REFERENCE_POSITION`].
pub const TANGENT_PLANE: &str = "tangentPlane";
/// Frame orientation within [`REFERENCE_POSITION`].
pub const ORIENTATION: &str = "orientation";
/// Stage up axis within [`REFERENCE_POSITION`].
pub const STAGE_UP_AXIS: &str = "stageUpAxis";
/// Stage meters per unit, within [`REFERENCE_POSITION`] and [`METRICS`].
pub const STAGE_METERS_PER_UNIT: &str = "stageMetersPerUnit";

/// Unit-scale override on the node.
pub const METRICS: &str = "metrics";
/// Meters per unit of the layer the node was authored in.
pub const LAYER_METERS_PER_UNIT: &str = "layerMetersPerUnit";

/// Returns the leaf at `container/group/name`.
#[must_use]
pub fn leaf(container: &Container, group: &str, name: &str) -> Option<SampledHandle> {
    container.get_container(group)?.get_sampled(name)
}

/// Returns the flattened matrix leaf.
#[must_use]
pub fn matrix_source(container: &Container) -> Option<SampledHandle> {
    leaf(container, XFORM, MATRIX)
}

/// Returns the preserved upstream matrix leaf of an overlay node.
#[must_use]
pub fn preserved_matrix_source(container: &Container) -> Option<SampledHandle> {
    leaf(container, OVERLAY_PRESERVED_XFORM, MATRIX)
}

/// Returns the reset-stack leaf.
#[must_use]
pub fn reset_source(container: &Container) -> Option<SampledHandle> {
    leaf(container, XFORM, RESET_XFORM_STACK)
}

/// Returns the geodetic local position leaf.
#[must_use]
pub fn local_position_source(container: &Container) -> Option<SampledHandle> {
    leaf(container, LOCAL_POSITION, POSITION)
}

/// Returns whether the node carries a transform.
#[must_use]
pub fn has_xform(container: &Container) -> bool {
    container.get_container(XFORM).is_some()
}

/// Typed access to a node's attributes, reporting mismatches against `path`.
#[derive(Clone, Copy, Debug)]
pub struct Reader<'a> {
    path: &'a Path,
    diagnostics: &'a Diagnostics,
}

impl<'a> Reader<'a> {
    /// Creates a reader for the node at `path`.
    #[must_use]
    pub fn new(path: &'a Path, diagnostics: &'a Diagnostics) -> Self {
        Self { path, diagnostics }
    }

    fn typed<T>(
        &self,
        source: Option<&SampledHandle>,
        time: Time,
        locator: [&str; 2],
        expected: ValueKind,
        extract: impl FnOnce(&Value) -> Option<T>,
    ) -> Option<T> {
        let value = source?.value(time);
        let typed = extract(&value);
        if typed.is_none() {
            self.diagnostics.warning(&Warning::TypeMismatch {
                path: self.path.clone(),
                locator: Locator::new(locator),
                expected,
                found: value.kind(),
            });
        }
        typed
    }

    /// Reads a matrix leaf.
    #[must_use]
    pub fn matrix(
        &self,
        source: Option<&SampledHandle>,
        time: Time,
        locator: [&str; 2],
    ) -> Option<Transform3d> {
        self.typed(source, time, locator, ValueKind::Matrix, Value::as_matrix)
    }

    /// Reads the flattened matrix, defaulting to identity.
    #[must_use]
    pub fn xform_matrix(&self, container: &Container, time: Time) -> Transform3d {
        self.matrix(matrix_source(container).as_ref(), time, [XFORM, MATRIX])
            .unwrap_or(Transform3d::IDENTITY)
    }

    /// Reads the reset-stack flag, defaulting to `false`.
    #[must_use]
    pub fn reset_xform_stack(&self, container: &Container, time: Time) -> bool {
        self.typed(
            reset_source(container).as_ref(),
            time,
            [XFORM, RESET_XFORM_STACK],
            ValueKind::Bool,
            Value::as_bool,
        )
        .unwrap_or(false)
    }

    /// Reads the geodetic local position, if present.
    #[must_use]
    pub fn local_position(&self, container: &Container, time: Time) -> Option<[f64; 3]> {
        self.typed(
            local_position_source(container).as_ref(),
            time,
            [LOCAL_POSITION, POSITION],
            ValueKind::Vec3,
            Value::as_vec3,
        )
    }

    fn double(&self, container: &Container, group: &str, name: &str) -> Option<f64> {
        self.typed(
            leaf(container, group, name).as_ref(),
            0.0,
            [group, name],
            ValueKind::Double,
            Value::as_double,
        )
    }

    fn vec3(&self, container: &Container, group: &str, name: &str) -> Option<[f64; 3]> {
        self.typed(
            leaf(container, group, name).as_ref(),
            0.0,
            [group, name],
            ValueKind::Vec3,
            Value::as_vec3,
        )
    }

    fn token(&self, container: &Container, group: &str, name: &str) -> Option<Token> {
        self.typed(
            leaf(container, group, name).as_ref(),
            0.0,
            [group, name],
            ValueKind::Token,
            |v| v.as_token().cloned(),
        )
    }

    /// Reads the geodetic reference frame carried by `container`.
    ///
    /// Reference parameters are not time-varying; they are read at time zero.
    #[must_use]
    pub fn reference_frame(
        &self,
        container: &Container,
        defaults: &OverlayDefaults,
    ) -> ReferenceFrame {
        let g = REFERENCE_POSITION;
        let up_axis = match self.token(container, g, STAGE_UP_AXIS) {
            None => defaults.up_axis,
            Some(axis) => UpAxis::from_name(axis.as_str()).unwrap_or_else(|| {
                self.diagnostics.warning(&Warning::UnknownUpAxis {
                    path: self.path.clone(),
                    axis,
                });
                defaults.up_axis
            }),
        };
        ReferenceFrame {
            tangent_plane: self.token(container, g, TANGENT_PLANE).unwrap_or_default(),
            position: self
                .vec3(container, g, REFERENCE_POSITION)
                .unwrap_or(defaults.position),
            orientation: self.vec3(container, g, ORIENTATION).unwrap_or([0.0; 3]),
            up_axis,
            meters_per_unit: self
                .double(container, g, STAGE_METERS_PER_UNIT)
                .unwrap_or(defaults.meters_per_unit),
        }
    }

    /// Reads the unit-scale parameters carried by `container`.
    ///
    /// Missing values take the default. Returns `None` if either value is
    /// present with the wrong kind, in which case no correction applies.
    #[must_use]
    pub fn metrics(&self, container: &Container, defaults: &OverlayDefaults) -> Option<Metrics> {
        let read = |name| match leaf(container, METRICS, name) {
            None => Some(defaults.meters_per_unit),
            Some(source) => self.typed(
                Some(&source),
                0.0,
                [METRICS, name],
                ValueKind::Double,
                Value::as_double,
            ),
        };
        Some(Metrics {
            layer_meters_per_unit: read(LAYER_METERS_PER_UNIT)?,
            stage_meters_per_unit: read(STAGE_METERS_PER_UNIT)?,
        })
    }
}

/// A geodetic tangent-plane frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceFrame {
    /// Name of the tangent plane convention; informational.
    pub tangent_plane: Token,
    /// Frame origin as `(lat, lon, alt)`.
    pub position: [f64; 3],
    /// Frame orientation; informational.
    pub orientation: [f64; 3],
    /// Stage vertical axis.
    pub up_axis: UpAxis,
    /// Meters per stage unit.
    pub meters_per_unit: f64,
}

impl ReferenceFrame {
    /// The frame used when no node declares one.
    #[must_use]
    pub fn from_defaults(defaults: &OverlayDefaults) -> Self {
        Self {
            tangent_plane: Token::default(),
            position: defaults.position,
            orientation: [0.0; 3],
            up_axis: defaults.up_axis,
            meters_per_unit: defaults.meters_per_unit,
        }
    }
}

/// Meters-per-unit of a node's layer and of the stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// Meters per unit of the authoring layer.
    pub layer_meters_per_unit: f64,
    /// Meters per unit of the stage.
    pub stage_meters_per_unit: f64,
}

impl Metrics {
    /// The uniform scale that converts layer units into stage units.
    #[must_use]
    pub fn corrective_factor(&self) -> f64 {
        self.layer_meters_per_unit / self.stage_meters_per_unit
    }
}
