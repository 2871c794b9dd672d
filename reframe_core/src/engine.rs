// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The overlay engine.
//!
//! [`OverlayEngine`] filters an upstream [`SceneGraphSource`]. Lookups go
//! through the [`Registry`]: a wrapped node is answered by its overlay
//! node, anything else by upstream directly. Change batches from upstream
//! are applied in three ways:
//!
//! - **Added**: a wrapped node gets the new upstream attributes and type
//!   in place; a node that no longer qualifies for wrapping is reverted to a
//!   placeholder; a new node is wrapped if the policy asks for it. In every
//!   case cached transforms below the node are cleared and reported.
//! - **Removed**: the registry subtree is erased (everything, for the
//!   root). Released overlay nodes are dropped after the table lock is gone.
//! - **Dirtied**: transform changes clear cached transforms in the
//!   subtree. Changes to override parameters also clear the node's own
//!   cache and report the node itself.
//!
//! The upstream batch is always forwarded first, unchanged. Transform
//! invalidations the engine synthesizes follow as one extra dirtied batch.

use core::fmt;
use std::sync::{Arc, Weak};

use crate::config::{EngineConfig, WrapPolicy};
use crate::data::{Container, Node, Token};
use crate::diagnostics::{Diagnostics, WrapCause};
use crate::locator::{self, LocatorSet};
use crate::overlay::{NodeLookup, OverlayContext, OverlayNode};
use crate::path::Path;
use crate::registry::{Registry, WrappedPrim, dirty_hierarchy};
use crate::schema;
use crate::source::{
    AddedEntry, ChangeObserver, DirtiedEntry, Notice, RemovedEntry, SceneGraphSource,
};

/// A transform-overriding view of an upstream scene graph.
///
/// Cloning is cheap and yields another handle to the same engine.
pub struct OverlayEngine<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for OverlayEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S> fmt::Debug for OverlayEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayEngine")
            .field("config", &self.shared.config)
            .field("entries", &self.shared.registry.len())
            .finish_non_exhaustive()
    }
}

struct Shared<S> {
    upstream: S,
    config: EngineConfig,
    registry: Registry,
    context: Arc<OverlayContext>,
}

impl<S: SceneGraphSource + 'static> OverlayEngine<S> {
    /// Creates an engine over `upstream` whose warnings go to the [`log`] facade.
    pub fn new(upstream: S, config: EngineConfig) -> Self {
        Self::with_diagnostics(upstream, config, Diagnostics::none())
    }

    /// Creates an engine over `upstream` reporting to `diagnostics`.
    ///
    /// With [`WrapPolicy::Eager`] the whole upstream tree is walked and
    /// wrapped before this returns.
    pub fn with_diagnostics(upstream: S, config: EngineConfig, diagnostics: Diagnostics) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<S>>| {
            let lookup: Weak<dyn NodeLookup> = weak.clone();
            Shared {
                upstream,
                config,
                registry: Registry::new(),
                context: Arc::new(OverlayContext::new(lookup, &config, diagnostics)),
            }
        });
        if config.wrap_policy == WrapPolicy::Eager {
            shared.wrap_all();
        }
        Self { shared }
    }
}

impl<S: SceneGraphSource> OverlayEngine<S> {
    /// The upstream scene graph.
    #[must_use]
    pub fn upstream(&self) -> &S {
        &self.shared.upstream
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Returns whether `path` is currently wrapped.
    #[must_use]
    pub fn is_wrapped(&self, path: &Path) -> bool {
        self.shared.registry.lookup(path).1
    }

    /// Returns whether `path` has a cached transform.
    #[must_use]
    pub fn is_cached(&self, path: &Path) -> bool {
        self.shared
            .registry
            .entry(path)
            .is_some_and(|entry| entry.is_cached())
    }

    /// Number of wrapped nodes.
    #[must_use]
    pub fn wrapped_count(&self) -> usize {
        self.shared.registry.wrapped_count()
    }

    /// Number of registry entries, placeholders included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Applies one upstream batch of any kind.
    pub fn apply(&self, notice: &Notice, downstream: &mut dyn ChangeObserver) {
        match notice {
            Notice::Added(entries) => self.prims_added(entries, downstream),
            Notice::Removed(entries) => self.prims_removed(entries, downstream),
            Notice::Dirtied(entries) => self.prims_dirtied(entries, downstream),
        }
    }

    /// Applies an upstream added batch.
    pub fn prims_added(&self, entries: &[AddedEntry], downstream: &mut dyn ChangeObserver) {
        let mut dirtied = Vec::new();
        for entry in entries {
            self.shared.added(entry, &mut dirtied);
        }
        downstream.added(entries);
        if !dirtied.is_empty() {
            downstream.dirtied(&dirtied);
        }
    }

    /// Applies an upstream removed batch.
    pub fn prims_removed(&self, entries: &[RemovedEntry], downstream: &mut dyn ChangeObserver) {
        let mut released = Vec::new();
        for entry in entries {
            let erased = self.shared.registry.erase_subtree(&entry.path);
            self.shared.diagnostics().erased(&entry.path, erased.len());
            released.extend(erased);
        }
        drop(released);
        downstream.removed(entries);
    }

    /// Applies an upstream dirtied batch.
    pub fn prims_dirtied(&self, entries: &[DirtiedEntry], downstream: &mut dyn ChangeObserver) {
        let mut dirtied = Vec::new();
        for entry in entries {
            self.shared.dirtied(entry, &mut dirtied);
        }
        downstream.dirtied(entries);
        if !dirtied.is_empty() {
            downstream.dirtied(&dirtied);
        }
    }
}

impl<S: SceneGraphSource> SceneGraphSource for OverlayEngine<S> {
    fn node(&self, path: &Path) -> Node {
        self.shared.node(path)
    }

    fn child_paths(&self, path: &Path) -> Vec<Path> {
        self.shared.upstream.child_paths(path)
    }
}

impl<S: SceneGraphSource> NodeLookup for Shared<S> {
    fn lookup(&self, path: &Path) -> Node {
        self.node(path)
    }
}

impl<S: SceneGraphSource> Shared<S> {
    fn diagnostics(&self) -> &Diagnostics {
        self.context.diagnostics()
    }

    /// Returns whether the policy wants `node` wrapped.
    fn wants_wrap(&self, path: &Path, node: &Node) -> bool {
        match self.config.wrap_policy {
            WrapPolicy::Eager => !node.is_empty(),
            WrapPolicy::Lazy => node.container.as_ref().is_some_and(|c| {
                schema::has_xform(c)
                    && !schema::Reader::new(path, self.diagnostics()).reset_xform_stack(c, 0.0)
            }),
        }
    }

    fn wrap(&self, path: &Path, type_tag: Token, node: Node) -> WrappedPrim {
        let overlay = OverlayNode::new(path.clone(), node.container, self.context.clone());
        WrappedPrim {
            type_tag,
            container: Some(Arc::new(Container::Overlay(overlay))),
        }
    }

    fn node(&self, path: &Path) -> Node {
        if let Some(prim) = self.registry.lookup(path).0 {
            return prim.to_node();
        }
        let upstream = self.upstream.node(path);
        if !self.wants_wrap(path, &upstream) {
            return upstream;
        }
        let type_tag = upstream.type_tag.clone();
        let prim = self
            .registry
            .entry_or_insert(path)
            .publish(self.wrap(path, type_tag, upstream));
        self.diagnostics().wrapped(path, WrapCause::Lookup);
        prim.to_node()
    }

    /// Iterative pre-order walk wrapping every qualifying upstream node.
    fn wrap_all(&self) {
        let mut stack = vec![Path::root()];
        while let Some(path) = stack.pop() {
            let node = self.upstream.node(&path);
            if self.wants_wrap(&path, &node) {
                let type_tag = node.type_tag.clone();
                self.registry
                    .insert_or_update(&path, self.wrap(&path, type_tag, node));
                self.diagnostics().wrapped(&path, WrapCause::Eager);
            }
            let mut children = self.upstream.child_paths(&path);
            children.reverse();
            stack.extend(children);
        }
    }

    fn added(&self, entry: &AddedEntry, dirtied: &mut Vec<DirtiedEntry>) {
        let path = &entry.path;
        let upstream = self.upstream.node(path);
        let wants = self.wants_wrap(path, &upstream);
        let current = self
            .registry
            .entry(path)
            .and_then(|e| e.prim().map(|prim| (e, prim)));

        match current {
            Some((handle, prim)) if wants => match prim.overlay() {
                Some(overlay) => {
                    overlay.set_delegate(upstream.container);
                    handle.set_prim(WrappedPrim {
                        type_tag: entry.type_tag.clone(),
                        container: prim.container.clone(),
                    });
                }
                None => {
                    handle.set_prim(self.wrap(path, entry.type_tag.clone(), upstream));
                }
            },
            Some((handle, _)) => {
                handle.clear_prim();
                self.diagnostics().unwrapped(path);
            }
            None if wants => {
                self.registry
                    .insert_or_update(path, self.wrap(path, entry.type_tag.clone(), upstream));
                self.diagnostics().wrapped(path, WrapCause::Added);
            }
            None => {}
        }

        // The node's transform, parameters or wrapping may all have changed.
        let xform = LocatorSet::from(locator::xform());
        let cleared = dirty_hierarchy(&self.registry, path, &xform, false, self.diagnostics());
        dirtied.extend(cleared.into_iter().map(DirtiedEntry::xform));
    }

    fn dirtied(&self, entry: &DirtiedEntry, dirtied: &mut Vec<DirtiedEntry>) {
        let path = &entry.path;
        self.refresh_delegate(path);

        let parameters = entry
            .locators
            .intersects_set(&locator::override_parameters());
        let locators = if parameters {
            dirtied.push(DirtiedEntry::xform(path.clone()));
            LocatorSet::from(locator::xform())
        } else {
            entry.locators.clone()
        };
        let cleared = dirty_hierarchy(&self.registry, path, &locators, false, self.diagnostics());
        dirtied.extend(cleared.into_iter().map(DirtiedEntry::xform));
    }

    /// Points a wrapped node at the current upstream attributes.
    fn refresh_delegate(&self, path: &Path) {
        let Some(prim) = self.registry.lookup(path).0 else {
            return;
        };
        let Some(overlay) = prim.overlay() else {
            return;
        };
        let upstream = self.upstream.node(path).container;
        let unchanged = match (&upstream, overlay.delegate()) {
            (Some(new), Some(old)) => Arc::ptr_eq(new, &old),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            overlay.set_delegate(upstream);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::data::{ContainerHandle, DataSource, RetainedContainer, Value};
    use crate::diagnostics::{DiagnosticSink, Warning};
    use crate::retained::MemoryScene;
    use crate::source::ChangeLog;
    use crate::transform::Transform3d;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    fn xform(matrix: Transform3d) -> RetainedContainer {
        RetainedContainer::new().with(schema::MATRIX, Value::Matrix(matrix))
    }

    fn plain(matrix: Transform3d) -> RetainedContainer {
        RetainedContainer::new().with(schema::XFORM, Container::from(xform(matrix)))
    }

    fn reset(matrix: Transform3d) -> RetainedContainer {
        let x = xform(matrix).with(schema::RESET_XFORM_STACK, Value::Bool(true));
        RetainedContainer::new().with(schema::XFORM, Container::from(x))
    }

    fn metrics(matrix: Transform3d, layer: f64, stage: f64) -> RetainedContainer {
        let m = RetainedContainer::new()
            .with(schema::LAYER_METERS_PER_UNIT, Value::Double(layer))
            .with(schema::STAGE_METERS_PER_UNIT, Value::Double(stage));
        plain(matrix).with(schema::METRICS, Container::from(m))
    }

    fn node(c: RetainedContainer) -> Node {
        Node::new(Token::new("Xform"), Some(c.into_handle()))
    }

    fn scene(nodes: &[(&str, RetainedContainer)]) -> Arc<MemoryScene> {
        let scene = Arc::new(MemoryScene::new());
        scene.insert_all(nodes.iter().map(|(path, c)| (p(path), node(c.clone()))));
        scene
    }

    fn xform_container<S: SceneGraphSource>(engine: &OverlayEngine<S>, path: &str) -> ContainerHandle {
        engine
            .node(&p(path))
            .container
            .unwrap()
            .get_container(schema::XFORM)
            .unwrap()
    }

    fn matrix_of<S: SceneGraphSource>(engine: &OverlayEngine<S>, path: &str) -> Transform3d {
        xform_container(engine, path)
            .get_sampled(schema::MATRIX)
            .unwrap()
            .value(0.0)
            .as_matrix()
            .unwrap()
    }

    #[derive(Default)]
    struct Warnings(Mutex<Vec<Warning>>);

    impl DiagnosticSink for Warnings {
        fn on_warning(&self, warning: &Warning) {
            self.0.lock().unwrap().push(warning.clone());
        }
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn lazy_lookup_wraps_only_transformable_nodes() {
        let s = scene(&[
            ("/a", plain(Transform3d::IDENTITY)),
            ("/b", RetainedContainer::new()),
            ("/c", reset(Transform3d::IDENTITY)),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::geodetic());
        assert_eq!(engine.wrapped_count(), 0, "lazy engines start empty");
        for path in ["/a", "/b", "/c"] {
            let _ = engine.node(&p(path));
        }
        assert!(engine.is_wrapped(&p("/a")));
        assert!(!engine.is_wrapped(&p("/b")), "no transform");
        assert!(!engine.is_wrapped(&p("/c")), "reset stack");
    }

    #[test]
    fn eager_wraps_every_node_at_construction() {
        let s = scene(&[
            ("/a", plain(Transform3d::IDENTITY)),
            ("/a/b", RetainedContainer::new()),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        assert!(engine.is_wrapped(&p("/a")));
        assert!(engine.is_wrapped(&p("/a/b")));
        assert!(!engine.is_wrapped(&Path::root()), "empty root is passed through");
    }

    #[test]
    fn no_override_passes_upstream_container_through() {
        let m = Transform3d::from_translation(1.0, 2.0, 3.0);
        let s = scene(&[("/a", plain(m))]);
        let upstream = s.node(&p("/a")).container.unwrap().get_container(schema::XFORM).unwrap();
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        assert!(Arc::ptr_eq(&xform_container(&engine, "/a"), &upstream));
    }

    #[test]
    fn preserved_xform_exposes_upstream_transform() {
        let m = Transform3d::from_translation(1.0, 0.0, 0.0);
        let s = scene(&[("/a", metrics(m, 1.0, 0.01))]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let container = engine.node(&p("/a")).container.unwrap();
        assert!(
            container
                .names()
                .iter()
                .any(|n| n.as_str() == schema::OVERLAY_PRESERVED_XFORM)
        );
        let preserved = schema::preserved_matrix_source(&container).unwrap();
        assert_eq!(preserved.value(0.0), Value::Matrix(m));
    }

    #[test]
    fn metrics_scale_local_transform() {
        let s = scene(&[
            ("/w", plain(Transform3d::IDENTITY)),
            ("/w/c", metrics(Transform3d::from_translation(1.0, 0.0, 0.0), 1.0, 0.01)),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let m = matrix_of(&engine, "/w/c");
        let t = m.translation();
        assert!((t[0] - 100.0).abs() < EPS, "translation scaled by 100: {t:?}");
        assert!(t[1].abs() < EPS && t[2].abs() < EPS);
    }

    #[test]
    fn dependent_child_follows_parent_correction() {
        let parent = Transform3d::from_translation(1.0, 2.0, 3.0);
        let child = Transform3d::from_translation(1.0, 3.0, 3.0);
        let s = scene(&[("/a", metrics(parent, 1.0, 0.5)), ("/a/b", plain(child))]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let parent_new = matrix_of(&engine, "/a");
        let expected = parent_new * parent.inverse().unwrap() * child;
        assert!(matrix_of(&engine, "/a/b").approx_eq(&expected, EPS));
    }

    #[test]
    fn reset_stack_ignores_ancestor_override() {
        let child = Transform3d::from_translation(7.0, 0.0, 0.0);
        let s = scene(&[
            ("/a", metrics(Transform3d::IDENTITY, 1.0, 0.01)),
            ("/a/b", reset(child)),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        assert!(engine.is_wrapped(&p("/a/b")));
        assert!(matrix_of(&engine, "/a/b").approx_eq(&child, 0.0));
    }

    #[test]
    fn repeated_lookups_share_the_cached_container() {
        let s = scene(&[("/a", metrics(Transform3d::IDENTITY, 1.0, 0.01))]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let first = xform_container(&engine, "/a");
        let second = xform_container(&engine, "/a");
        assert!(Arc::ptr_eq(&first, &second), "second lookup hits the cache");
        assert!(engine.is_cached(&p("/a")));
    }

    #[test]
    fn xform_dirty_clears_and_reports_cached_descendants() {
        let s = scene(&[
            ("/a", metrics(Transform3d::IDENTITY, 1.0, 0.01)),
            ("/a/b", plain(Transform3d::IDENTITY)),
            ("/a/b/c", plain(Transform3d::IDENTITY)),
            ("/a/d", plain(Transform3d::IDENTITY)),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let _ = matrix_of(&engine, "/a/b/c");
        assert!(engine.is_cached(&p("/a")) && engine.is_cached(&p("/a/b")));
        assert!(!engine.is_cached(&p("/a/d")));

        let mut log = ChangeLog::new();
        let upstream = [DirtiedEntry::xform(p("/a"))];
        engine.prims_dirtied(&upstream, &mut log);
        assert_eq!(log.notices().len(), 2);
        assert_eq!(log.notices()[0], Notice::Dirtied(upstream.to_vec()));
        let Notice::Dirtied(synthesized) = &log.notices()[1] else {
            panic!("expected a synthesized dirtied batch");
        };
        let paths: Vec<_> = synthesized.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![p("/a/b"), p("/a/b/c")]);
        for path in ["/a", "/a/b", "/a/b/c"] {
            assert!(!engine.is_cached(&p(path)), "{path} cleared");
        }

        log.clear();
        engine.prims_dirtied(&upstream, &mut log);
        assert_eq!(log.notices().len(), 1, "nothing left to report");
    }

    #[test]
    fn unrelated_dirty_is_only_forwarded() {
        let s = scene(&[("/a", metrics(Transform3d::IDENTITY, 1.0, 0.01))]);
        let engine = OverlayEngine::new(s, EngineConfig::metrics());
        let _ = matrix_of(&engine, "/a");
        let mut log = ChangeLog::new();
        engine.prims_dirtied(
            &[DirtiedEntry {
                path: p("/a"),
                locators: LocatorSet::from(locator::Locator::single("visibility")),
            }],
            &mut log,
        );
        assert_eq!(log.notices().len(), 1);
        assert!(engine.is_cached(&p("/a")));
    }

    #[test]
    fn parameter_dirty_reports_the_node_itself() {
        let s = scene(&[
            ("/a", metrics(Transform3d::IDENTITY, 1.0, 0.01)),
            ("/a/b", plain(Transform3d::IDENTITY)),
        ]);
        let engine = OverlayEngine::new(s.clone(), EngineConfig::metrics());
        let before = matrix_of(&engine, "/a/b");

        let notice = s
            .update(
                &p("/a"),
                metrics(Transform3d::IDENTITY, 1.0, 0.5).into_handle(),
                LocatorSet::from(locator::metrics()),
            )
            .unwrap();
        let mut log = ChangeLog::new();
        engine.apply(&notice, &mut log);
        assert_eq!(log.xform_dirtied(), vec![p("/a"), p("/a/b")]);

        let after = matrix_of(&engine, "/a/b");
        assert!(!after.approx_eq(&before, EPS), "new factor applies");
        assert!(after.approx_eq(&Transform3d::from_uniform_scale(2.0), EPS));
    }

    #[test]
    fn removal_erases_subtree_and_root_clears_all() {
        let s = scene(&[
            ("/a", plain(Transform3d::IDENTITY)),
            ("/a/b", plain(Transform3d::IDENTITY)),
            ("/c", plain(Transform3d::IDENTITY)),
        ]);
        let engine = OverlayEngine::new(s.clone(), EngineConfig::metrics());
        let mut log = ChangeLog::new();
        engine.apply(&s.remove(&p("/a")), &mut log);
        assert!(!engine.is_wrapped(&p("/a")) && !engine.is_wrapped(&p("/a/b")));
        assert!(engine.is_wrapped(&p("/c")));
        assert_eq!(log.notices().len(), 1, "removal is forwarded as is");

        engine.apply(&s.remove(&Path::root()), &mut log);
        assert_eq!(engine.entry_count(), 0);
    }

    #[test]
    fn readd_updates_wrapped_node_in_place() {
        let s = scene(&[
            ("/a", plain(Transform3d::IDENTITY)),
            ("/a/b", plain(Transform3d::IDENTITY)),
        ]);
        let engine = OverlayEngine::new(s.clone(), EngineConfig::metrics());
        let before = engine.node(&p("/a")).container.unwrap();
        let _ = matrix_of(&engine, "/a/b");

        let notice = s.insert(
            p("/a"),
            Node::new(
                Token::new("Scope"),
                Some(metrics(Transform3d::IDENTITY, 1.0, 0.01).into_handle()),
            ),
        );
        let mut log = ChangeLog::new();
        engine.apply(&notice, &mut log);

        let after = engine.node(&p("/a"));
        assert!(Arc::ptr_eq(&before, after.container.as_ref().unwrap()), "same wrapper");
        assert_eq!(after.type_tag.as_str(), "Scope");
        assert_eq!(log.xform_dirtied(), vec![p("/a/b")]);
        assert!(matrix_of(&engine, "/a").approx_eq(&Transform3d::from_uniform_scale(100.0), EPS));
    }

    #[test]
    fn lazy_readd_of_exempt_node_unwraps_it() {
        let s = scene(&[("/a", plain(Transform3d::IDENTITY))]);
        let engine = OverlayEngine::new(s.clone(), EngineConfig::geodetic());
        let _ = matrix_of(&engine, "/a");
        assert!(engine.is_wrapped(&p("/a")));

        let mut log = ChangeLog::new();
        engine.apply(&s.insert(p("/a"), node(reset(Transform3d::IDENTITY))), &mut log);
        assert!(!engine.is_wrapped(&p("/a")));
        assert!(engine.node(&p("/a")).container.unwrap().as_overlay().is_none());
    }

    #[test]
    fn added_unwrapped_node_follows_policy() {
        let s = scene(&[("/a", plain(Transform3d::IDENTITY))]);
        let eager = OverlayEngine::new(s.clone(), EngineConfig::metrics());
        let lazy = OverlayEngine::new(s.clone(), EngineConfig::geodetic());
        let notice = s.insert_all([
            (p("/b"), node(plain(Transform3d::IDENTITY))),
            (p("/c"), node(reset(Transform3d::IDENTITY))),
        ]);
        let mut log = ChangeLog::new();
        eager.apply(&notice, &mut log);
        lazy.apply(&notice, &mut log);

        assert!(eager.is_wrapped(&p("/b")) && eager.is_wrapped(&p("/c")));
        assert!(lazy.is_wrapped(&p("/b")));
        assert!(!lazy.is_wrapped(&p("/c")), "reset-stack node is exempt");
    }

    #[test]
    fn geodetic_position_at_reference_origin_is_zero() {
        let reference = RetainedContainer::new()
            .with(schema::REFERENCE_POSITION, Value::Vec3([0.0; 3]))
            .with(schema::STAGE_UP_AXIS, Value::Token(Token::new("y")))
            .with(schema::STAGE_METERS_PER_UNIT, Value::Double(0.01));
        let position = |alt: f64| {
            RetainedContainer::new().with(schema::POSITION, Value::Vec3([0.0, 0.0, alt]))
        };
        let root = plain(Transform3d::IDENTITY)
            .with(schema::REFERENCE_POSITION, Container::from(reference));
        let s = scene(&[
            ("/geo", root),
            (
                "/geo/here",
                plain(Transform3d::from_translation(5.0, 5.0, 5.0))
                    .with(schema::LOCAL_POSITION, Container::from(position(0.0))),
            ),
            (
                "/geo/up",
                plain(Transform3d::IDENTITY)
                    .with(schema::LOCAL_POSITION, Container::from(position(1.0))),
            ),
        ]);
        let engine = OverlayEngine::new(s, EngineConfig::geodetic());
        let here = matrix_of(&engine, "/geo/here").translation();
        assert!(here.iter().all(|v| v.abs() < 1e-6), "{here:?}");
        let up = matrix_of(&engine, "/geo/up").translation();
        assert!((up[1] - 100.0).abs() < 1e-6, "one meter up in centimeters: {up:?}");
    }

    #[test]
    fn singular_parent_warns_and_falls_back() {
        let child = Transform3d::from_translation(1.0, 0.0, 0.0);
        let s = scene(&[
            ("/a", plain(Transform3d::from_uniform_scale(0.0))),
            ("/a/b", metrics(child, 1.0, 0.01)),
        ]);
        let sink = Arc::new(Warnings::default());
        let engine =
            OverlayEngine::with_diagnostics(s, EngineConfig::metrics(), Diagnostics::new(sink.clone()));
        assert!(matrix_of(&engine, "/a/b").approx_eq(&child, 0.0));
        let warnings = sink.0.lock().unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, Warning::SingularParent { path } if *path == p("/a/b")))
        );
    }

    #[test]
    fn type_mismatch_is_treated_as_absent() {
        let bad = plain(Transform3d::from_translation(1.0, 0.0, 0.0)).with(
            schema::METRICS,
            Container::from(
                RetainedContainer::new()
                    .with(schema::LAYER_METERS_PER_UNIT, Value::Double(1.0))
                    .with(schema::STAGE_METERS_PER_UNIT, DataSource::constant(Value::Bool(true))),
            ),
        );
        let s = scene(&[("/a", bad)]);
        let sink = Arc::new(Warnings::default());
        let engine =
            OverlayEngine::with_diagnostics(s, EngineConfig::metrics(), Diagnostics::new(sink.clone()));
        let t = matrix_of(&engine, "/a").translation();
        assert!((t[0] - 1.0).abs() < EPS, "mismatched metrics leave the transform uncorrected");
        assert!(
            sink.0
                .lock()
                .unwrap()
                .iter()
                .any(|w| matches!(w, Warning::TypeMismatch { .. }))
        );
    }

    #[test]
    fn engines_chain() {
        let s = scene(&[
            ("/a", metrics(Transform3d::IDENTITY, 1.0, 0.5)),
            ("/a/b", plain(Transform3d::from_translation(1.0, 0.0, 0.0))),
        ]);
        let inner = OverlayEngine::new(s, EngineConfig::metrics());
        let outer = OverlayEngine::new(inner.clone(), EngineConfig::geodetic());
        assert_eq!(outer.child_paths(&p("/a")), vec![p("/a/b")]);
        assert!(matrix_of(&outer, "/a/b").approx_eq(&matrix_of(&inner, "/a/b"), EPS));
    }
}
