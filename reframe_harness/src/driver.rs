// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Concurrent lookup driver.
//!
//! [`LookupStress::run`] takes a single-threaded baseline of every path's
//! flattened matrix, then reads the same paths from several threads at
//! once and counts lookups whose result differs from the baseline. A
//! writer closure may run alongside the readers on its own thread; it is
//! the only thread delivering change batches, which keeps them serialized.
//! The writer must leave the scene in a state whose matrices equal the
//! baseline, for example by re-announcing unchanged nodes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use reframe_core::path::Path;
use reframe_core::source::SceneGraphSource;
use reframe_core::transform::Transform3d;

use crate::fixtures::matrix_at;

/// Shape of a concurrent lookup run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupStress {
    /// Reader threads.
    pub threads: usize,
    /// Passes over the path list per reader.
    pub rounds: usize,
}

impl Default for LookupStress {
    fn default() -> Self {
        Self {
            threads: 4,
            rounds: 50,
        }
    }
}

/// Outcome of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StressReport {
    /// Lookups performed by readers.
    pub lookups: u64,
    /// Lookups whose matrix differed from the baseline.
    pub divergent: u64,
    /// Writer iterations completed.
    pub writes: u64,
}

impl StressReport {
    /// Returns whether every lookup agreed with the baseline.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.divergent == 0
    }
}

impl LookupStress {
    /// Reads `paths` from `source` concurrently.
    pub fn run<S: SceneGraphSource>(&self, source: &S, paths: &[Path]) -> StressReport {
        self.run_with_writer(source, paths, |_| {})
    }

    /// Reads `paths` from `source` concurrently while `writer` is called
    /// once per round, with the round index, on a separate thread.
    pub fn run_with_writer<S: SceneGraphSource>(
        &self,
        source: &S,
        paths: &[Path],
        writer: impl Fn(usize) + Sync,
    ) -> StressReport {
        let baseline: Vec<Option<Transform3d>> =
            paths.iter().map(|path| matrix_at(source, path, 0.0)).collect();
        let lookups = AtomicU64::new(0);
        let divergent = AtomicU64::new(0);
        let mut writes = 0;

        thread::scope(|scope| {
            for _ in 0..self.threads {
                scope.spawn(|| {
                    for _ in 0..self.rounds {
                        for (path, expected) in paths.iter().zip(&baseline) {
                            let got = matrix_at(source, path, 0.0);
                            lookups.fetch_add(1, Ordering::Relaxed);
                            if got != *expected {
                                divergent.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
            let writer_thread = scope.spawn(|| {
                for round in 0..self.rounds {
                    writer(round);
                }
                self.rounds as u64
            });
            writes = writer_thread.join().unwrap_or(0);
        });

        StressReport {
            lookups: lookups.into_inner(),
            divergent: divergent.into_inner(),
            writes,
        }
    }
}
