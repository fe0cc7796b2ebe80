//! Running-statistics normalization of raw metric sums.
//!
//! Each metric lives on its own scale (squared pixels, degrees squared, a
//! crossing count), so raw sums cannot be weighted against each other
//! directly. A raw value is scored as `raw / top`, where `top` is the larger
//! of the metric's analytic ceiling for the current drawing and the largest
//! value observed so far. Scoring never records, so a trial and the state it
//! is compared with always share one scale, and a worse value always scores
//! higher.

use crate::metrics::{MetricKey, Metrics, PerMetric};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunningStats {
    pub count: u64,
    pub max: f64,
}

impl RunningStats {
    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 || value > self.max {
            self.max = value;
        }
    }

    /// Scores `value` against `ceiling` and the history, without recording it.
    pub fn score(&self, value: f64, ceiling: f64) -> f64 {
        // incremental cache drift can leave a hair below zero
        let value = if value < 0.0 { 0.0 } else { value };
        let top = if self.count == 0 {
            ceiling
        } else {
            ceiling.max(self.max)
        };
        if top > 0.0 { value / top } else { value * 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Normalizer {
    stats: PerMetric<RunningStats>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.stats = PerMetric::default();
    }

    pub fn stats(&self, key: MetricKey) -> &RunningStats {
        &self.stats[key]
    }

    /// Observes `raw` and returns its normalized scores.
    pub fn normalize_all(&mut self, raw: &Metrics, ceilings: &Metrics) -> Metrics {
        for key in MetricKey::ALL {
            self.stats[key].observe(raw[key]);
        }
        self.score_all(raw, ceilings)
    }

    /// Scores `raw` against the current history only.
    pub fn score_all(&self, raw: &Metrics, ceilings: &Metrics) -> Metrics {
        Metrics::from_fn(|key| self.stats[key].score(raw[key], ceilings[key]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(v: f64) -> Metrics {
        Metrics::from_fn(|_| v)
    }

    #[test]
    fn running_stats_track_count_and_max() {
        let mut stats = RunningStats::default();
        for v in [4.0, 2.0, 6.0, 5.0] {
            stats.observe(v);
        }
        assert_eq!(stats.count, 4);
        assert_eq!(stats.max, 6.0);
    }

    #[test]
    fn first_observation_sets_max_even_when_negative() {
        let mut stats = RunningStats::default();
        stats.observe(-3.0);
        assert_eq!(stats.max, -3.0);
    }

    #[test]
    fn zero_history_and_ceiling_scores_zero() {
        let mut n = Normalizer::new();
        let scores = n.normalize_all(&Metrics::default(), &Metrics::default());
        assert_eq!(scores, Metrics::default());
    }

    #[test]
    fn ceiling_sets_the_scale() {
        let mut n = Normalizer::new();
        assert_eq!(n.normalize_all(&uniform(10.0), &uniform(40.0)).edge_length, 0.25);
        assert_eq!(n.score_all(&uniform(20.0), &uniform(40.0)).edge_length, 0.5);
        assert_eq!(n.stats(MetricKey::EdgeLength).count, 1);
    }

    #[test]
    fn history_above_the_ceiling_takes_over() {
        let mut n = Normalizer::new();
        n.normalize_all(&uniform(80.0), &uniform(40.0));
        assert_eq!(n.score_all(&uniform(20.0), &uniform(40.0)).node_occlusion, 0.25);
    }

    #[test]
    fn values_past_the_history_max_keep_growing() {
        let mut n = Normalizer::new();
        n.normalize_all(&uniform(10.0), &uniform(0.0));
        let at_max = n.score_all(&uniform(10.0), &uniform(0.0));
        let worse = n.score_all(&uniform(30.0), &uniform(0.0));
        assert_eq!(at_max.edge_crossing, 1.0);
        assert_eq!(worse.edge_crossing, 3.0);
    }

    #[test]
    fn score_is_monotonic_for_fixed_history() {
        let mut n = Normalizer::new();
        n.normalize_all(&uniform(100.0), &uniform(50.0));
        let low = n.score_all(&uniform(20.0), &uniform(50.0));
        let high = n.score_all(&uniform(300.0), &uniform(50.0));
        assert!(low.angular_resolution < high.angular_resolution);
    }

    #[test]
    fn nan_survives_scoring() {
        let n = Normalizer::new();
        let scores = n.score_all(&uniform(f64::NAN), &uniform(1.0));
        assert!(scores.edge_crossing.is_nan());
    }

    #[test]
    fn reset_forgets_history() {
        let mut n = Normalizer::new();
        n.normalize_all(&uniform(3.0), &uniform(1.0));
        n.reset();
        assert_eq!(n, Normalizer::new());
    }
}
