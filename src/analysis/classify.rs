//! Overall performance rating from Core Web Vitals.

use super::model::MetricEntry;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy constants for the rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingThresholds {
    /// A metric counts as good when at least this share of users is in the
    /// good band.
    pub good_ratio: f64,
    /// Share of good core metrics needed for "Good".
    pub batch_high: f64,
    /// Share of good core metrics needed for "Needs Improvement".
    pub batch_low: f64,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            good_ratio: 0.75,
            batch_high: 0.67,
            batch_low: 0.33,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
    InsufficientData,
}

impl Rating {
    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Good => "Good",
            Rating::NeedsImprovement => "Needs Improvement",
            Rating::Poor => "Poor",
            Rating::InsufficientData => "Insufficient data",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate a URL from its normalized metrics.
///
/// Only core metrics with a good ratio take part. The share of good core
/// metrics is rounded to two decimals before comparing, so two good out of
/// three (0.666...) reaches the 0.67 bar.
pub fn classify(metrics: &[MetricEntry], thresholds: &RatingThresholds) -> Rating {
    let good_ratios: Vec<f64> = metrics
        .iter()
        .filter(|m| m.metric_name.is_core())
        .filter_map(|m| m.good_ratio)
        .collect();

    if good_ratios.is_empty() {
        return Rating::InsufficientData;
    }

    let good_count = good_ratios
        .iter()
        .filter(|&&r| r >= thresholds.good_ratio)
        .count();
    let share = round2(good_count as f64 / good_ratios.len() as f64);

    if share >= thresholds.batch_high {
        Rating::Good
    } else if share >= thresholds.batch_low {
        Rating::NeedsImprovement
    } else {
        Rating::Poor
    }
}

/// Round to two decimal places. Values too large to scale are returned as is.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::model::MetricKind;

    fn entry(kind: MetricKind, good: Option<f64>) -> MetricEntry {
        MetricEntry {
            metric_name: kind,
            p75_value: good.map(|_| 1.0),
            good_ratio: good,
            needs_improvement_ratio: None,
            poor_ratio: None,
        }
    }

    fn core(lcp: f64, cls: f64, inp: f64) -> Vec<MetricEntry> {
        vec![
            entry(MetricKind::Lcp, Some(lcp)),
            entry(MetricKind::Cls, Some(cls)),
            entry(MetricKind::Inp, Some(inp)),
        ]
    }

    #[test]
    fn test_round2_passes_through_unscalable_values() {
        assert_eq!(round2(1e307), 1e307);
        assert_eq!(round2(f64::MAX), f64::MAX);
        assert!(round2(f64::NAN).is_nan());
    }

    #[test]
    fn test_two_of_three_good_is_good() {
        let rating = classify(&core(0.8, 0.8, 0.2), &RatingThresholds::default());
        assert_eq!(rating, Rating::Good);
    }

    #[test]
    fn test_one_of_three_good_needs_improvement() {
        let rating = classify(&core(0.8, 0.5, 0.2), &RatingThresholds::default());
        assert_eq!(rating, Rating::NeedsImprovement);
    }

    #[test]
    fn test_none_good_is_poor() {
        let rating = classify(&core(0.5, 0.5, 0.5), &RatingThresholds::default());
        assert_eq!(rating, Rating::Poor);
    }

    #[test]
    fn test_good_bar_is_inclusive() {
        let rating = classify(&core(0.75, 0.75, 0.75), &RatingThresholds::default());
        assert_eq!(rating, Rating::Good);
    }

    #[test]
    fn test_insufficient_data() {
        let thresholds = RatingThresholds::default();
        assert_eq!(classify(&[], &thresholds), Rating::InsufficientData);

        // Non-core metrics and entries without ratios never qualify.
        let metrics = vec![
            entry(MetricKind::Fcp, Some(0.9)),
            entry(MetricKind::Fid, Some(0.9)),
            entry(MetricKind::Ttfb, Some(0.9)),
            entry(MetricKind::Lcp, None),
            entry(MetricKind::Cls, None),
        ];
        assert_eq!(classify(&metrics, &thresholds), Rating::InsufficientData);
    }

    #[test]
    fn test_partial_core_set() {
        let thresholds = RatingThresholds::default();
        let one_good = vec![entry(MetricKind::Lcp, Some(0.9))];
        assert_eq!(classify(&one_good, &thresholds), Rating::Good);

        let half = vec![
            entry(MetricKind::Lcp, Some(0.9)),
            entry(MetricKind::Inp, Some(0.1)),
        ];
        assert_eq!(classify(&half, &thresholds), Rating::NeedsImprovement);
    }

    #[test]
    fn test_custom_thresholds() {
        let strict = RatingThresholds {
            good_ratio: 0.9,
            batch_high: 1.0,
            batch_low: 0.5,
        };
        assert_eq!(classify(&core(0.95, 0.95, 0.8), &strict), Rating::NeedsImprovement);
        assert_eq!(classify(&core(0.95, 0.95, 0.95), &strict), Rating::Good);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(2400.0), 2400.0);
        assert_eq!(round2(0.666_666), 0.67);
        assert_eq!(round2(1.005_1), 1.01);
    }
}
