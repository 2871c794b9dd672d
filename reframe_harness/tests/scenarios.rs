// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end overlay scenarios against an in-memory upstream.

use std::sync::Arc;

use reframe_core::config::EngineConfig;
use reframe_core::diagnostics::{Diagnostics, Warning, WrapCause};
use reframe_core::engine::OverlayEngine;
use reframe_core::geodetic;
use reframe_core::locator::{self, LocatorSet};
use reframe_core::path::Path;
use reframe_core::schema;
use reframe_core::source::{ChangeLog, DirtiedEntry, Notice, SceneGraphSource};
use reframe_core::transform::Transform3d;
use reframe_debug::recorder::{RecordedEvent, RecorderSink};
use reframe_harness::{PrimBuilder, matrix_at, p, scene};

const EPS: f64 = 1e-9;

fn recorded<S: SceneGraphSource + 'static>(
    upstream: S,
    config: EngineConfig,
) -> (OverlayEngine<S>, Arc<RecorderSink>) {
    let recorder = Arc::new(RecorderSink::new());
    let engine = OverlayEngine::with_diagnostics(upstream, config, Diagnostics::new(recorder.clone()));
    (engine, recorder)
}

#[test]
fn geodetic_origin_maps_to_zero_offset() {
    let ecef = geodetic::geodetic_to_ecef([0.0, 0.0, 0.0]);
    assert!((ecef[0] - 6_378_137.0).abs() < 1e-6, "{ecef:?}");
    assert!(ecef[1].abs() < 1e-6 && ecef[2].abs() < 1e-6);
    let enu = geodetic::ecef_to_enu(ecef, [0.0, 0.0, 0.0]);
    assert!(enu.iter().all(|v| v.abs() < 1e-9), "{enu:?}");

    let s = scene([
        (
            "/world",
            PrimBuilder::xform(Transform3d::IDENTITY).reference([0.0; 3], "z", 1.0),
        ),
        (
            "/world/site",
            PrimBuilder::xform(Transform3d::from_translation(9.0, 9.0, 9.0))
                .local_position([0.0; 3]),
        ),
    ]);
    let engine = OverlayEngine::new(s, EngineConfig::geodetic());
    let t = matrix_at(&engine, &p("/world/site"), 0.0).unwrap().translation();
    assert!(t.iter().all(|v| v.abs() < 1e-6), "{t:?}");
}

#[test]
fn metrics_scale_local_translation_by_hundred() {
    let parent = Transform3d::from_translation(0.0, 0.0, 5.0);
    let s = scene([
        ("/p", PrimBuilder::xform(parent)),
        (
            "/p/c",
            PrimBuilder::xform(parent * Transform3d::from_translation(1.0, 0.0, 0.0))
                .metrics(1.0, 0.01),
        ),
    ]);
    let engine = OverlayEngine::new(s, EngineConfig::metrics());
    let flattened = matrix_at(&engine, &p("/p/c"), 0.0).unwrap();
    let local = parent.inverse().unwrap() * flattened;
    let t = local.translation();
    assert!((t[0] - 100.0).abs() < EPS && t[1].abs() < EPS && t[2].abs() < EPS, "{t:?}");
}

#[test]
fn dependent_grandchild_follows_repositioned_parent() {
    let a_old = Transform3d::from_translation(3.0, 0.0, 0.0);
    let b = a_old * Transform3d::from_translation(0.0, 0.0, 1.0);
    let s = scene([
        (
            "/r",
            PrimBuilder::xform(Transform3d::IDENTITY).reference([0.0; 3], "y", 1.0),
        ),
        ("/r/a", PrimBuilder::xform(a_old).local_position([0.0, 0.0, 2.0])),
        ("/r/a/b", PrimBuilder::xform(b)),
    ]);
    let engine = OverlayEngine::new(s, EngineConfig::geodetic());
    let a_new = matrix_at(&engine, &p("/r/a"), 0.0).unwrap();
    let a_t = a_new.translation();
    assert!((a_t[1] - 2.0).abs() < 1e-6, "two meters up: {a_t:?}");

    let expected = a_new * a_old.inverse().unwrap() * b;
    let got = matrix_at(&engine, &p("/r/a/b"), 0.0).unwrap();
    assert!(got.approx_eq(&expected, 1e-6), "{got:?} vs {expected:?}");
}

#[test]
fn reset_stack_node_is_untouched_by_ancestor_override() {
    let own = Transform3d::from_translation(4.0, 5.0, 6.0);
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY).metrics(1.0, 0.01)),
        ("/a/b", PrimBuilder::xform(own).reset()),
    ]);
    for config in [EngineConfig::metrics(), EngineConfig::geodetic()] {
        let engine = OverlayEngine::new(s.clone(), config);
        assert_eq!(matrix_at(&engine, &p("/a/b"), 0.0), Some(own), "{:?}", config.kind);
    }
}

#[test]
fn invalidation_reports_each_cached_descendant_once() {
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY).metrics(1.0, 0.01)),
        ("/a/b", PrimBuilder::xform(Transform3d::IDENTITY)),
        ("/a/b/c", PrimBuilder::xform(Transform3d::IDENTITY)),
        ("/a/cold", PrimBuilder::xform(Transform3d::IDENTITY)),
        ("/z", PrimBuilder::xform(Transform3d::IDENTITY)),
    ]);
    let (engine, recorder) = recorded(s, EngineConfig::metrics());
    for path in ["/a/b/c", "/z"] {
        let _ = matrix_at(&engine, &p(path), 0.0);
    }

    let mut log = ChangeLog::new();
    engine.prims_dirtied(
        &[DirtiedEntry::xform(p("/a")), DirtiedEntry::xform(p("/a/b"))],
        &mut log,
    );
    let synthesized = match &log.notices()[1] {
        Notice::Dirtied(entries) => entries.iter().map(|e| e.path.clone()).collect::<Vec<_>>(),
        other => panic!("expected dirtied, got {other:?}"),
    };
    assert_eq!(synthesized, vec![p("/a/b"), p("/a/b/c")], "no duplicates, no cold paths");
    assert!(engine.is_cached(&p("/z")), "unrelated subtree untouched");

    let invalidated: Vec<_> = recorder
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RecordedEvent::Invalidated { origin, cleared } => Some((origin, cleared)),
            _ => None,
        })
        .collect();
    assert_eq!(invalidated.len(), 1, "second entry cleared nothing");
    assert_eq!(invalidated[0].0, p("/a"));
}

#[test]
fn eager_and_lazy_wrap_events() {
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY)),
        ("/s", PrimBuilder::scope()),
    ]);
    let (_eager, recorder) = recorded(s.clone(), EngineConfig::metrics());
    assert_eq!(recorder.wrapped(WrapCause::Eager), vec![p("/a"), p("/s")]);

    let (lazy, recorder) = recorded(s, EngineConfig::geodetic());
    assert!(recorder.is_empty());
    let _ = lazy.node(&p("/a"));
    let _ = lazy.node(&p("/s"));
    assert_eq!(recorder.wrapped(WrapCause::Lookup), vec![p("/a")]);
}

#[test]
fn added_nodes_are_wrapped_per_policy() {
    let s = scene([("/a", PrimBuilder::xform(Transform3d::IDENTITY))]);
    let mut log = ChangeLog::new();

    let (eager, recorder) = recorded(s.clone(), EngineConfig::metrics());
    eager.apply(&s.insert(p("/a/s"), PrimBuilder::scope().build()), &mut log);
    assert!(eager.is_wrapped(&p("/a/s")), "eager wraps any non-empty node");
    assert_eq!(recorder.wrapped(WrapCause::Added), vec![p("/a/s")]);

    let (lazy, recorder) = recorded(s.clone(), EngineConfig::geodetic());
    let added = s.insert_all([
        (p("/b"), PrimBuilder::xform(Transform3d::IDENTITY).build()),
        (p("/c"), PrimBuilder::xform(Transform3d::IDENTITY).reset().build()),
        (p("/d"), PrimBuilder::scope().build()),
    ]);
    lazy.apply(&added, &mut log);
    assert!(lazy.is_wrapped(&p("/b")));
    assert!(!lazy.is_wrapped(&p("/c")), "reset-stack nodes stay unwrapped");
    assert!(!lazy.is_wrapped(&p("/d")), "nodes without a transform stay unwrapped");
    assert_eq!(recorder.wrapped(WrapCause::Added), vec![p("/b")]);
}

#[test]
fn animated_child_merges_sample_times() {
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY).metrics(1.0, 0.5)),
        (
            "/a/b",
            PrimBuilder::animated(&[
                (0.0, Transform3d::from_translation(0.0, 0.0, 0.0)),
                (1.0, Transform3d::from_translation(2.0, 0.0, 0.0)),
            ]),
        ),
    ]);
    let engine = OverlayEngine::new(s, EngineConfig::metrics());
    let leaf = engine
        .node(&p("/a/b"))
        .container
        .unwrap()
        .get_container(schema::XFORM)
        .unwrap()
        .get_sampled(schema::MATRIX)
        .unwrap();
    assert_eq!(leaf.contributing_sample_times(0.0, 1.0), Some(vec![0.0, 1.0]));

    let mid = matrix_at(&engine, &p("/a/b"), 0.5).unwrap().translation();
    assert!((mid[0] - 2.0).abs() < EPS, "halfway, doubled by the parent: {mid:?}");
}

#[test]
fn unknown_up_axis_warns_and_uses_default() {
    let s = scene([
        (
            "/w",
            PrimBuilder::xform(Transform3d::IDENTITY).reference([0.0; 3], "sideways", 1.0),
        ),
        (
            "/w/x",
            PrimBuilder::xform(Transform3d::IDENTITY).local_position([0.0, 0.0, 1.0]),
        ),
    ]);
    let (engine, recorder) = recorded(s, EngineConfig::geodetic());
    let t = matrix_at(&engine, &p("/w/x"), 0.0).unwrap().translation();
    assert!((t[1] - 1.0).abs() < 1e-6, "default up axis is y: {t:?}");
    assert!(
        recorder
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::UnknownUpAxis { axis, .. } if axis.as_str() == "sideways"))
    );
}

#[test]
fn parameter_edit_propagates_to_cached_subtree() {
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY).metrics(1.0, 0.01)),
        ("/a/b", PrimBuilder::xform(Transform3d::from_translation(1.0, 0.0, 0.0))),
    ]);
    let engine = OverlayEngine::new(s.clone(), EngineConfig::metrics());
    let before = matrix_at(&engine, &p("/a/b"), 0.0).unwrap();
    assert!((before.translation()[0] - 100.0).abs() < EPS);

    let edited = PrimBuilder::xform(Transform3d::IDENTITY).metrics(1.0, 1.0);
    let notice = s
        .update(
            &p("/a"),
            edited.container().into_handle(),
            LocatorSet::from(locator::metrics()),
        )
        .unwrap();
    let mut log = ChangeLog::new();
    engine.apply(&notice, &mut log);
    assert_eq!(log.xform_dirtied(), vec![p("/a"), p("/a/b")]);
    let after = matrix_at(&engine, &p("/a/b"), 0.0).unwrap();
    assert!(after.approx_eq(&Transform3d::from_translation(1.0, 0.0, 0.0), EPS));
}

#[test]
fn json_export_of_a_session() {
    let s = scene([
        ("/a", PrimBuilder::xform(Transform3d::IDENTITY)),
        ("/a/b", PrimBuilder::xform(Transform3d::IDENTITY)),
    ]);
    let (engine, recorder) = recorded(s.clone(), EngineConfig::metrics());
    let mut log = ChangeLog::new();
    engine.apply(&s.remove(&Path::root()), &mut log);

    let mut out = Vec::new();
    reframe_debug::json::export(&recorder.events(), &mut out).unwrap();
    let parsed: Vec<serde_json::Value> = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed.last().unwrap()["event"], "erased");
    assert_eq!(parsed.last().unwrap()["count"], 3);
}
