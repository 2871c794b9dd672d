// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Upstream scene fixtures.

use std::sync::Arc;

use reframe_core::data::{Container, DataSource, Node, RetainedContainer, Token, Value};
use reframe_core::path::Path;
use reframe_core::retained::MemoryScene;
use reframe_core::sample::{RetainedSampled, Sampled, Time};
use reframe_core::schema;
use reframe_core::source::SceneGraphSource;
use reframe_core::transform::Transform3d;

/// Parses `s` as a path.
///
/// # Panics
///
/// Panics if `s` is not an absolute path. Fixtures are written by hand.
#[must_use]
pub fn p(s: &str) -> Path {
    match Path::parse(s) {
        Ok(path) => path,
        Err(e) => panic!("bad fixture path {s:?}: {e}"),
    }
}

/// Builds one upstream node.
#[derive(Clone, Debug)]
pub struct PrimBuilder {
    type_tag: Token,
    xform: Option<RetainedContainer>,
    attributes: RetainedContainer,
}

impl PrimBuilder {
    /// A transformable node with a constant flattened matrix.
    #[must_use]
    pub fn xform(matrix: Transform3d) -> Self {
        Self {
            type_tag: Token::new("Xform"),
            xform: Some(RetainedContainer::new().with(schema::MATRIX, Value::Matrix(matrix))),
            attributes: RetainedContainer::new(),
        }
    }

    /// A transformable node whose flattened matrix is sampled at `samples`.
    ///
    /// Falls back to identity if `samples` is empty.
    #[must_use]
    pub fn animated(samples: &[(Time, Transform3d)]) -> Self {
        let sampled = RetainedSampled::from_samples(
            samples.iter().map(|(t, m)| (*t, Value::Matrix(*m))),
        )
        .unwrap_or_else(|| RetainedSampled::constant(Value::Matrix(Transform3d::IDENTITY)));
        Self {
            type_tag: Token::new("Xform"),
            xform: Some(
                RetainedContainer::new()
                    .with(schema::MATRIX, DataSource::from(Sampled::Retained(sampled))),
            ),
            attributes: RetainedContainer::new(),
        }
    }

    /// A node without a transform.
    #[must_use]
    pub fn scope() -> Self {
        Self {
            type_tag: Token::new("Scope"),
            xform: None,
            attributes: RetainedContainer::new(),
        }
    }

    /// Replaces the type tag.
    #[must_use]
    pub fn typed(mut self, type_tag: &str) -> Self {
        self.type_tag = Token::new(type_tag);
        self
    }

    /// Sets the reset-stack flag on the transform.
    #[must_use]
    pub fn reset(mut self) -> Self {
        if let Some(x) = self.xform.as_mut() {
            x.insert(schema::RESET_XFORM_STACK, Value::Bool(true));
        }
        self
    }

    /// Attaches unit-scale parameters.
    #[must_use]
    pub fn metrics(mut self, layer_meters_per_unit: f64, stage_meters_per_unit: f64) -> Self {
        let metrics = RetainedContainer::new()
            .with(schema::LAYER_METERS_PER_UNIT, Value::Double(layer_meters_per_unit))
            .with(schema::STAGE_METERS_PER_UNIT, Value::Double(stage_meters_per_unit));
        self.attributes
            .insert(schema::METRICS, Container::from(metrics));
        self
    }

    /// Attaches a geodetic position `(lat, lon, alt)` in degrees and meters.
    #[must_use]
    pub fn local_position(mut self, llh: [f64; 3]) -> Self {
        let position = RetainedContainer::new().with(schema::POSITION, Value::Vec3(llh));
        self.attributes
            .insert(schema::LOCAL_POSITION, Container::from(position));
        self
    }

    /// Attaches a geodetic reference frame.
    #[must_use]
    pub fn reference(mut self, llh: [f64; 3], up_axis: &str, stage_meters_per_unit: f64) -> Self {
        let reference = RetainedContainer::new()
            .with(schema::TANGENT_PLANE, Value::Token(Token::new("ENU")))
            .with(schema::REFERENCE_POSITION, Value::Vec3(llh))
            .with(schema::ORIENTATION, Value::Vec3([0.0; 3]))
            .with(schema::STAGE_UP_AXIS, Value::Token(Token::new(up_axis)))
            .with(schema::STAGE_METERS_PER_UNIT, Value::Double(stage_meters_per_unit));
        self.attributes
            .insert(schema::REFERENCE_POSITION, Container::from(reference));
        self
    }

    /// Sets an arbitrary attribute.
    #[must_use]
    pub fn with(mut self, name: &str, source: impl Into<DataSource>) -> Self {
        self.attributes.insert(name, source);
        self
    }

    /// Returns the attribute container.
    #[must_use]
    pub fn container(&self) -> RetainedContainer {
        let mut attributes = self.attributes.clone();
        if let Some(x) = &self.xform {
            attributes.insert(schema::XFORM, Container::from(x.clone()));
        }
        attributes
    }

    /// Returns the node.
    #[must_use]
    pub fn build(&self) -> Node {
        Node::new(self.type_tag.clone(), Some(self.container().into_handle()))
    }
}

/// Creates a scene holding `prims`.
pub fn scene<'a>(prims: impl IntoIterator<Item = (&'a str, PrimBuilder)>) -> Arc<MemoryScene> {
    let scene = Arc::new(MemoryScene::new());
    let _ = scene.insert_all(prims.into_iter().map(|(path, prim)| (p(path), prim.build())));
    scene
}

/// Reads the flattened matrix of `path` from `source` at `time`.
#[must_use]
pub fn matrix_at(source: &impl SceneGraphSource, path: &Path, time: Time) -> Option<Transform3d> {
    source
        .node(path)
        .container?
        .get_container(schema::XFORM)?
        .get_sampled(schema::MATRIX)?
        .value(time)
        .as_matrix()
}

/// Builds a uniform tree `depth` levels deep with `fanout` children per
/// node, each translated by one unit along x from its parent. The root
/// child `/n0` carries unit-scale parameters when `metrics` is set.
#[must_use]
pub fn tree(depth: usize, fanout: usize, metrics: Option<(f64, f64)>) -> (Arc<MemoryScene>, Vec<Path>) {
    let scene = Arc::new(MemoryScene::new());
    let mut paths = Vec::new();
    let mut level = vec![(Path::root(), Transform3d::IDENTITY)];
    for d in 0..depth {
        let mut next = Vec::new();
        for (parent, parent_matrix) in &level {
            let children = if parent.is_root() { 1 } else { fanout };
            for i in 0..children {
                let path = parent.child(&format!("n{i}"));
                let matrix = *parent_matrix * Transform3d::from_translation(1.0, 0.0, 0.0);
                let mut prim = PrimBuilder::xform(matrix);
                if d == 0
                    && let Some((layer, stage)) = metrics
                {
                    prim = prim.metrics(layer, stage);
                }
                let _ = scene.insert(path.clone(), prim.build());
                paths.push(path.clone());
                next.push((path, matrix));
            }
        }
        level = next;
    }
    (scene, paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_nests_reset_inside_xform() {
        let c = PrimBuilder::xform(Transform3d::IDENTITY).reset().container();
        assert!(schema::reset_source(&Container::from(c)).is_some());
    }

    #[test]
    fn tree_counts_nodes() {
        let (scene, paths) = tree(3, 2, None);
        assert_eq!(paths.len(), 1 + 2 + 4);
        assert_eq!(scene.child_paths(&p("/n0")).len(), 2);
        let leaf = matrix_at(&*scene, &p("/n0/n1/n0"), 0.0).unwrap();
        assert_eq!(leaf.translation(), [3.0, 0.0, 0.0]);
    }
}
