// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.
//!
//! An [`EngineConfig`] selects which override parameters the engine reacts
//! to ([`OverrideKind`]), when nodes are wrapped ([`WrapPolicy`]), and the
//! fallback values used when optional attributes are missing
//! ([`OverlayDefaults`]).

use core::fmt;

/// Controls when upstream nodes are wrapped in overlay nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WrapPolicy {
    /// Wrap the whole upstream tree at construction, and every added node
    /// as it is reported. Any node with a type or attributes is wrapped.
    Eager,
    /// Wrap a node the first time it is looked up or reported added.
    ///
    /// Only nodes with a transform whose reset-stack flag is unset are
    /// wrapped; the rest are passed through.
    Lazy,
}

/// Which override parameters drive the corrected transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverrideKind {
    /// A geodetic position on the node, resolved against a reference frame on
    /// the node or its nearest ancestor.
    Geodetic,
    /// A meters-per-unit divergence between the node's layer and the stage.
    Metrics,
}

impl fmt::Display for OverrideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Geodetic => "geodetic",
            Self::Metrics => "metrics",
        })
    }
}

/// The stage's vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpAxis {
    /// `+Y` is up; north maps to `Z`.
    #[default]
    Y,
    /// `+Z` is up; north maps to `Y`.
    Z,
}

impl UpAxis {
    /// Parses an axis name (`y` / `Y` / `z` / `Z`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "y" | "Y" => Some(Self::Y),
            "z" | "Z" => Some(Self::Z),
            _ => None,
        }
    }
}

/// Values substituted for missing optional attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayDefaults {
    /// Stage up axis when the reference frame does not declare one.
    pub up_axis: UpAxis,
    /// Meters per stage unit when not declared.
    pub meters_per_unit: f64,
    /// Geodetic `(lat, lon, alt)` used for a missing local or reference
    /// position.
    pub position: [f64; 3],
}

impl OverlayDefaults {
    /// The stock defaults: `y` up, centimeter units, and a unit
    /// `(1, 1, 1)` position.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            up_axis: UpAxis::Y,
            meters_per_unit: 0.01,
            position: [1.0, 1.0, 1.0],
        }
    }
}

impl Default for OverlayDefaults {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for an [`OverlayEngine`](crate::engine::OverlayEngine).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// When nodes are wrapped.
    pub wrap_policy: WrapPolicy,
    /// Which override parameters are honored.
    pub kind: OverrideKind,
    /// Fallbacks for missing attributes.
    pub defaults: OverlayDefaults,
}

impl EngineConfig {
    /// Geodetic positioning, wrapped lazily.
    #[must_use]
    pub const fn geodetic() -> Self {
        Self {
            wrap_policy: WrapPolicy::Lazy,
            kind: OverrideKind::Geodetic,
            defaults: OverlayDefaults::new(),
        }
    }

    /// Meters-per-unit correction, wrapped eagerly.
    #[must_use]
    pub const fn metrics() -> Self {
        Self {
            wrap_policy: WrapPolicy::Eager,
            kind: OverrideKind::Metrics,
            defaults: OverlayDefaults::new(),
        }
    }

    /// Returns this configuration with a different wrap policy.
    #[must_use]
    pub const fn with_wrap_policy(mut self, wrap_policy: WrapPolicy) -> Self {
        self.wrap_policy = wrap_policy;
        self
    }

    /// Returns this configuration with different defaults.
    #[must_use]
    pub const fn with_defaults(mut self, defaults: OverlayDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}
