// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lazily computed transform containers.
//!
//! A [`ComputedXform`] stands in for a node's `xform` container. Its
//! `matrix` leaf is a [`CorrectedMatrix`], which evaluates the correction on
//! every read from live upstream data. What gets cached per node is the
//! container (the decision of *which* correction applies), not the numbers.

use std::sync::Arc;

use crate::data::{ContainerHandle, DataSource, SampledHandle, Token};
use crate::diagnostics::Warning;
use crate::geodetic;
use crate::path::Path;
use crate::recovery::{self, RecoveryError};
use crate::sample::{Sampled, Time, merge_contributing_sample_times};
use crate::schema::{self, ReferenceFrame};
use crate::transform::Transform3d;

use super::node::OverlayContext;

/// Which correction a [`CorrectedMatrix`] applies.
#[derive(Clone, Debug)]
pub enum Recipe {
    /// The node carries no parameters but an ancestor does: follow the
    /// parent's correction.
    Dependent,
    /// The node carries a geodetic position; `reference` is the container
    /// declaring the reference frame, if any.
    Geodetic {
        /// Node (or nearest ancestor) container with the reference frame.
        reference: Option<ContainerHandle>,
    },
    /// The node carries a meters-per-unit divergence.
    Metrics,
}

/// Replacement `xform` container: `matrix` plus `resetXformStack`.
#[derive(Debug)]
pub struct ComputedXform {
    input: ContainerHandle,
    matrix: SampledHandle,
}

impl ComputedXform {
    /// Creates the container for the node at `path` whose upstream
    /// attributes are `input`.
    #[must_use]
    pub fn new(
        path: Path,
        input: ContainerHandle,
        recipe: Recipe,
        context: Arc<OverlayContext>,
    ) -> Self {
        let matrix = Arc::new(Sampled::Corrected(CorrectedMatrix {
            path,
            input: input.clone(),
            recipe,
            context,
        }));
        Self { input, matrix }
    }

    /// Returns `matrix` and `resetXformStack`.
    #[must_use]
    pub fn names(&self) -> Vec<Token> {
        vec![
            Token::new(schema::MATRIX),
            Token::new(schema::RESET_XFORM_STACK),
        ]
    }

    /// Returns the corrected matrix or the upstream reset flag.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<DataSource> {
        match name {
            schema::MATRIX => Some(DataSource::Sampled(self.matrix.clone())),
            schema::RESET_XFORM_STACK => schema::reset_source(&self.input).map(DataSource::Sampled),
            _ => None,
        }
    }
}

/// A corrected flattened transform, evaluated on demand.
///
/// Failures never propagate: a non-invertible parent or a non-finite result
/// is reported and the upstream matrix is returned unchanged.
#[derive(Debug)]
pub struct CorrectedMatrix {
    path: Path,
    input: ContainerHandle,
    recipe: Recipe,
    context: Arc<OverlayContext>,
}

/// The parent's transform before and after correction.
struct ParentMatrices {
    original: Transform3d,
    corrected: Transform3d,
}

impl ParentMatrices {
    const IDENTITY: Self = Self {
        original: Transform3d::IDENTITY,
        corrected: Transform3d::IDENTITY,
    };
}

impl CorrectedMatrix {
    /// The node this matrix belongs to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the corrected flattened transform at `time`.
    #[must_use]
    pub fn value(&self, time: Time) -> Transform3d {
        let reader = schema::Reader::new(&self.path, self.context.diagnostics());
        let flattened = reader.xform_matrix(&self.input, time);
        let reset = reader.reset_xform_stack(&self.input, time);
        if reset && matches!(self.recipe, Recipe::Dependent) {
            return flattened;
        }
        // A reset node's flattened transform is its local transform.
        let parent = if reset {
            ParentMatrices::IDENTITY
        } else {
            self.parent_matrices(time)
        };
        let defaults = self.context.defaults();

        let corrected = match &self.recipe {
            Recipe::Dependent => recovery::rebase(&flattened, &parent.original, &parent.corrected),
            Recipe::Geodetic { reference } => {
                let frame = reference.as_ref().map_or_else(
                    || ReferenceFrame::from_defaults(defaults),
                    |r| reader.reference_frame(r, defaults),
                );
                let position = reader
                    .local_position(&self.input, time)
                    .unwrap_or(defaults.position);
                let translation = geodetic::local_translation(
                    position,
                    frame.position,
                    frame.up_axis,
                    frame.meters_per_unit,
                );
                recovery::reposition(&flattened, &parent.original, &parent.corrected, translation)
            }
            Recipe::Metrics => {
                let Some(metrics) = reader.metrics(&self.input, defaults) else {
                    return flattened;
                };
                let factor = metrics.corrective_factor();
                recovery::rescale(&flattened, &parent.original, &parent.corrected, factor)
            }
        };

        match corrected {
            Ok(m) if m.is_finite() => m,
            Ok(_) => {
                self.warn(Warning::NonFinite {
                    path: self.path.clone(),
                });
                flattened
            }
            Err(RecoveryError::Singular { .. }) => {
                self.warn(Warning::SingularParent {
                    path: self.path.clone(),
                });
                flattened
            }
        }
    }

    /// Returns the union of the sample times of every input.
    #[must_use]
    pub fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>> {
        let mut sources: Vec<SampledHandle> = Vec::with_capacity(4);
        sources.extend(schema::matrix_source(&self.input));
        if let Some((_, parent)) = self.parent_container() {
            sources.extend(schema::matrix_source(&parent));
            sources.extend(schema::preserved_matrix_source(&parent));
        }
        if matches!(self.recipe, Recipe::Geodetic { .. }) {
            sources.extend(schema::local_position_source(&self.input));
        }
        merge_contributing_sample_times(sources.iter().map(|s| &**s), start, end)
    }

    fn warn(&self, warning: Warning) {
        self.context.diagnostics().warning(&warning);
    }

    fn parent_container(&self) -> Option<(Path, ContainerHandle)> {
        let parent = self.path.parent()?;
        let container = self.context.lookup(&parent)?.container?;
        Some((parent, container))
    }

    /// Reads the parent's corrected transform and, for a parent wrapped by
    /// this engine, its upstream transform. Other parents are uncorrected
    /// here, so both are equal.
    fn parent_matrices(&self, time: Time) -> ParentMatrices {
        let Some((path, container)) = self.parent_container() else {
            return ParentMatrices::IDENTITY;
        };
        let reader = schema::Reader::new(&path, self.context.diagnostics());
        let corrected_source = schema::matrix_source(&container);
        let corrected = reader
            .matrix(corrected_source.as_ref(), time, [schema::XFORM, schema::MATRIX])
            .unwrap_or(Transform3d::IDENTITY);
        let own_overlay = container
            .as_overlay()
            .is_some_and(|node| node.shares_context(&self.context));
        if !own_overlay {
            return ParentMatrices {
                original: corrected,
                corrected,
            };
        }
        let original = match schema::preserved_matrix_source(&container) {
            Some(source) => reader
                .matrix(
                    Some(&source),
                    time,
                    [schema::OVERLAY_PRESERVED_XFORM, schema::MATRIX],
                )
                .unwrap_or(corrected),
            None => {
                if corrected_source.is_some() {
                    self.warn(Warning::MissingPreservedXform { path });
                }
                corrected
            }
        };
        ParentMatrices {
            original,
            corrected,
        }
    }
}
