// Copyright 2026 the Reframe Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time-sampled leaf values.
//!
//! Times are shutter offsets relative to the current frame. A leaf answers
//! two questions: its value at a time, and which sample times inside an
//! interval contribute to that value (for motion blur). A leaf with a single
//! sample contributes nothing, which is reported as `None` so callers can
//! skip sub-frame evaluation entirely.

use crate::data::Value;
use crate::overlay::CorrectedMatrix;

/// A shutter offset.
pub type Time = f32;

/// A time-sampled leaf.
#[derive(Debug)]
pub enum Sampled {
    /// Static samples, typically from an upstream scene.
    Retained(RetainedSampled),
    /// A lazily computed corrected transform.
    Corrected(CorrectedMatrix),
}

impl Sampled {
    /// Creates a single-sample leaf.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::Retained(RetainedSampled::constant(value))
    }

    /// Returns the value at `time`.
    #[must_use]
    pub fn value(&self, time: Time) -> Value {
        match self {
            Self::Retained(s) => s.value(time),
            Self::Corrected(s) => Value::Matrix(s.value(time)),
        }
    }

    /// Returns the sample times in `[start, end]` that contribute to this
    /// leaf, or `None` if the leaf is constant over the interval.
    #[must_use]
    pub fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>> {
        match self {
            Self::Retained(s) => s.contributing_sample_times(start, end),
            Self::Corrected(s) => s.contributing_sample_times(start, end),
        }
    }
}

/// Static samples sorted by time, interpolated linearly between neighbors
/// and held beyond either end.
#[derive(Clone, Debug)]
pub struct RetainedSampled {
    samples: Vec<(Time, Value)>,
}

impl RetainedSampled {
    /// Creates a leaf with a single sample at time zero.
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self {
            samples: vec![(0.0, value)],
        }
    }

    /// Creates a leaf from `(time, value)` pairs in any order.
    ///
    /// Returns `None` if `samples` is empty or contains a NaN time.
    #[must_use]
    pub fn from_samples(samples: impl IntoIterator<Item = (Time, Value)>) -> Option<Self> {
        let mut samples: Vec<_> = samples.into_iter().collect();
        if samples.is_empty() || samples.iter().any(|(t, _)| t.is_nan()) {
            return None;
        }
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        samples.dedup_by(|a, b| a.0 == b.0);
        Some(Self { samples })
    }

    /// Returns the value at `time`.
    #[must_use]
    pub fn value(&self, time: Time) -> Value {
        let after = self.samples.partition_point(|(t, _)| *t <= time);
        if after == 0 {
            return self.samples[0].1.clone();
        }
        let (t0, v0) = &self.samples[after - 1];
        match self.samples.get(after) {
            Some((t1, v1)) if *t0 != time => {
                let u = f64::from((time - t0) / (t1 - t0));
                v0.lerp(v1, u)
            }
            _ => v0.clone(),
        }
    }

    /// Returns the sample times relevant to `[start, end]`.
    ///
    /// Includes the nearest sample on either side of the interval so that
    /// interpolated values at the interval bounds are reproducible. An
    /// interval lying wholly before or after the samples sees a held value
    /// and yields `None`.
    #[must_use]
    pub fn contributing_sample_times(&self, start: Time, end: Time) -> Option<Vec<Time>> {
        if self.samples.len() < 2 {
            return None;
        }
        let first = self
            .samples
            .partition_point(|(t, _)| *t <= start)
            .saturating_sub(1);
        let last = self
            .samples
            .partition_point(|(t, _)| *t < end)
            .min(self.samples.len() - 1);
        if last <= first {
            return None;
        }
        Some(self.samples[first..=last].iter().map(|(t, _)| *t).collect())
    }
}

/// Unions the contributing sample times of `sources` over `[start, end]`.
///
/// Sources that contribute nothing are skipped. Returns `None` when no
/// source contributes; otherwise the times are sorted and deduplicated.
#[must_use]
pub fn merge_contributing_sample_times<'a>(
    sources: impl IntoIterator<Item = &'a Sampled>,
    start: Time,
    end: Time,
) -> Option<Vec<Time>> {
    let mut merged: Option<Vec<Time>> = None;
    for source in sources {
        if let Some(times) = source.contributing_sample_times(start, end) {
            merged.get_or_insert_with(Vec::new).extend(times);
        }
    }
    let mut merged = merged?;
    merged.sort_by(f32::total_cmp);
    merged.dedup();
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubles(pairs: &[(Time, f64)]) -> Sampled {
        Sampled::Retained(
            RetainedSampled::from_samples(pairs.iter().map(|&(t, v)| (t, Value::Double(v))))
                .unwrap(),
        )
    }

    #[test]
    fn constant_has_no_contribution() {
        let s = Sampled::constant(Value::Double(3.0));
        assert_eq!(s.value(-1.0).as_double(), Some(3.0));
        assert_eq!(s.contributing_sample_times(-1.0, 1.0), None);
    }

    #[test]
    fn interpolates_and_holds() {
        let s = doubles(&[(1.0, 10.0), (-1.0, 0.0)]);
        assert_eq!(s.value(-2.0).as_double(), Some(0.0));
        assert_eq!(s.value(0.0).as_double(), Some(5.0));
        assert_eq!(s.value(1.0).as_double(), Some(10.0));
        assert_eq!(s.value(5.0).as_double(), Some(10.0));
    }

    #[test]
    fn contributing_times_bracket_the_interval() {
        let s = doubles(&[(-2.0, 0.0), (-1.0, 1.0), (0.0, 2.0), (1.0, 3.0), (2.0, 4.0)]);
        assert_eq!(
            s.contributing_sample_times(-0.5, 0.5),
            Some(vec![-1.0, 0.0, 1.0])
        );
        assert_eq!(
            s.contributing_sample_times(-1.0, 1.0),
            Some(vec![-1.0, 0.0, 1.0])
        );
    }

    #[test]
    fn interval_outside_samples_has_no_contribution() {
        let s = doubles(&[(5.0, 1.0), (6.0, 2.0)]);
        assert_eq!(s.contributing_sample_times(-1.0, 1.0), None, "before");
        assert_eq!(s.contributing_sample_times(7.0, 8.0), None, "after");
        assert_eq!(
            merge_contributing_sample_times([&s], -1.0, 1.0),
            None,
            "held values are not merged"
        );
    }

    #[test]
    fn empty_or_nan_samples_are_rejected() {
        assert!(RetainedSampled::from_samples(Vec::new()).is_none());
        assert!(RetainedSampled::from_samples([(f32::NAN, Value::Bool(true))]).is_none());
    }

    #[test]
    fn merge_unions_contributors() {
        let a = doubles(&[(-1.0, 0.0), (1.0, 1.0)]);
        let b = doubles(&[(0.0, 0.0), (1.0, 1.0)]);
        let c = Sampled::constant(Value::Double(0.0));
        assert_eq!(
            merge_contributing_sample_times([&a, &b, &c], -1.0, 1.0),
            Some(vec![-1.0, 0.0, 1.0])
        );
    }

    #[test]
    fn merge_without_contributors_is_none() {
        let c = Sampled::constant(Value::Double(0.0));
        assert_eq!(merge_contributing_sample_times([&c, &c], -1.0, 1.0), None);
        assert_eq!(merge_contributing_sample_times(std::iter::empty(), -1.0, 1.0), None);
    }
}
