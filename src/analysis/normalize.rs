//! Converts raw CrUX metric blocks into [`MetricEntry`] values.
//!
//! Histogram buckets are folded into three bands following the CrUX
//! convention: the first bucket is "good", the last is "poor" and every
//! bucket in between is "needs improvement". A payload using a different
//! band layout would be mislabelled.

use super::model::{MetricEntry, MetricKind};
use crate::crux::{CruxResponse, HistogramBucket, RawMetric};

use serde_json::Value;

/// Share of samples per experience band.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandRatios {
    pub good: Option<f64>,
    pub needs_improvement: Option<f64>,
    pub poor: Option<f64>,
}

/// Read a number that may be encoded as a JSON number or a decimal string.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Density of one bucket. Missing or unreadable densities count as zero.
pub fn bucket_density(bucket: &HistogramBucket) -> f64 {
    bucket.density.as_ref().and_then(coerce_f64).unwrap_or(0.0)
}

/// Fold histogram densities into band ratios.
pub fn histogram_ratios(buckets: &[HistogramBucket]) -> BandRatios {
    let densities: Vec<f64> = buckets.iter().map(bucket_density).collect();
    let total: f64 = densities.iter().sum();
    if densities.is_empty() || total.is_nan() || total <= 0.0 {
        return BandRatios::default();
    }

    let last = densities.len() - 1;
    let mut ratios = BandRatios {
        good: Some(densities[0] / total),
        ..Default::default()
    };
    if last >= 1 {
        ratios.poor = Some(densities[last] / total);
    }
    if last >= 2 {
        let middle: f64 = densities[1..last].iter().sum();
        ratios.needs_improvement = Some(middle / total);
    }
    ratios
}

/// Normalize one metric block.
///
/// A block without a usable p75 produces an entry with no values at all.
pub fn normalize_metric(kind: MetricKind, raw: &RawMetric) -> MetricEntry {
    let p75_value = raw
        .percentiles
        .as_ref()
        .and_then(|p| p.p75.as_ref())
        .and_then(coerce_f64);

    if p75_value.is_none() {
        tracing::debug!("Normalizer: {} has no p75, dropping ratios", kind);
        return MetricEntry::empty(kind);
    }

    let ratios = raw
        .histogram
        .as_deref()
        .map(histogram_ratios)
        .unwrap_or_default();

    MetricEntry {
        metric_name: kind,
        p75_value,
        good_ratio: ratios.good,
        needs_improvement_ratio: ratios.needs_improvement,
        poor_ratio: ratios.poor,
    }
}

/// Normalize every known metric present in a response, in canonical order.
///
/// Returns `None` when the response carries no metric record. A block that
/// cannot be read is skipped; the remaining metrics are still normalized.
pub fn normalize_record(response: &CruxResponse) -> Option<Vec<MetricEntry>> {
    let metrics = response.record.as_ref()?.metrics.as_ref()?;
    Some(
        MetricKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let block = metrics.get(kind.api_key())?;
                match RawMetric::from_value(block) {
                    Ok(raw) => Some(normalize_metric(kind, &raw)),
                    Err(e) => {
                        tracing::warn!("Normalizer: Skipping unreadable {} block: {}", kind, e);
                        None
                    }
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crux::Percentiles;
    use serde_json::json;

    fn buckets(densities: &[f64]) -> Vec<HistogramBucket> {
        densities
            .iter()
            .map(|&density| HistogramBucket {
                density: Some(json!(density)),
                ..Default::default()
            })
            .collect()
    }

    fn raw(p75: Option<Value>, densities: &[f64]) -> RawMetric {
        RawMetric {
            percentiles: Some(Percentiles { p75 }),
            histogram: (!densities.is_empty()).then(|| buckets(densities)),
        }
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    #[test]
    fn test_coerce_f64() {
        assert_eq!(coerce_f64(&json!(2100)), Some(2100.0));
        assert_eq!(coerce_f64(&json!("0.05")), Some(0.05));
        assert_eq!(coerce_f64(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(coerce_f64(&json!("abc")), None);
        assert_eq!(coerce_f64(&json!(null)), None);
        assert_eq!(coerce_f64(&json!("NaN")), None);
        assert_eq!(coerce_f64(&json!([1])), None);
    }

    #[test]
    fn test_three_bucket_histogram() {
        let r = histogram_ratios(&buckets(&[0.8, 0.15, 0.05]));
        assert!(approx(r.good, 0.8));
        assert!(approx(r.needs_improvement, 0.15));
        assert!(approx(r.poor, 0.05));
    }

    #[test]
    fn test_middle_buckets_are_folded() {
        let r = histogram_ratios(&buckets(&[2.0, 1.0, 1.0, 1.0, 5.0]));
        assert!(approx(r.good, 0.2));
        assert!(approx(r.needs_improvement, 0.3));
        assert!(approx(r.poor, 0.5));
    }

    #[test]
    fn test_bands_cover_every_bucket_once() {
        for densities in [
            vec![0.1, 0.2, 0.3],
            vec![0.5, 0.25, 0.125, 0.0625],
            vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0],
        ] {
            let r = histogram_ratios(&buckets(&densities));
            let sum = r.good.unwrap() + r.needs_improvement.unwrap() + r.poor.unwrap();
            assert!((sum - 1.0).abs() < 1e-9, "{:?} summed to {}", densities, sum);
        }
    }

    #[test]
    fn test_unnormalized_densities_are_scaled() {
        let r = histogram_ratios(&buckets(&[0.45, 0.05, 0.0]));
        assert!(approx(r.good, 0.9));
        assert!(approx(r.needs_improvement, 0.1));
        assert!(approx(r.poor, 0.0));
    }

    #[test]
    fn test_unreadable_densities_count_as_zero() {
        let mut hist = buckets(&[0.8, 0.0, 0.2]);
        hist[1].density = Some(Value::Null);
        hist.push(HistogramBucket::default());
        hist[0].density = Some(json!("0.8"));

        assert_eq!(bucket_density(&hist[1]), 0.0);
        assert_eq!(bucket_density(&hist[3]), 0.0);
        let r = histogram_ratios(&hist);
        assert!(approx(r.good, 0.8));
        assert!(approx(r.needs_improvement, 0.2));
        assert!(approx(r.poor, 0.0));
    }

    #[test]
    fn test_single_and_double_bucket_histograms() {
        let one = histogram_ratios(&buckets(&[0.7]));
        assert!(approx(one.good, 1.0));
        assert_eq!(one.needs_improvement, None);
        assert_eq!(one.poor, None);

        let two = histogram_ratios(&buckets(&[0.6, 0.4]));
        assert!(approx(two.good, 0.6));
        assert!(approx(two.poor, 0.4));
        assert_eq!(two.needs_improvement, None);
    }

    #[test]
    fn test_empty_or_zero_histogram() {
        assert_eq!(histogram_ratios(&[]), BandRatios::default());
        assert_eq!(histogram_ratios(&buckets(&[0.0, 0.0, 0.0])), BandRatios::default());
    }

    #[test]
    fn test_normalize_metric_with_string_p75() {
        let entry = normalize_metric(
            MetricKind::Cls,
            &raw(Some(json!("0.03")), &[0.9, 0.06, 0.04]),
        );
        assert_eq!(entry.metric_name, MetricKind::Cls);
        assert_eq!(entry.p75_value, Some(0.03));
        assert!(approx(entry.good_ratio, 0.9));
    }

    #[test]
    fn test_normalize_metric_without_histogram() {
        let entry = normalize_metric(MetricKind::Lcp, &raw(Some(json!(1800)), &[]));
        assert_eq!(entry.p75_value, Some(1800.0));
        assert_eq!(entry.good_ratio, None);
        assert_eq!(entry.needs_improvement_ratio, None);
        assert_eq!(entry.poor_ratio, None);
    }

    #[test]
    fn test_missing_p75_clears_ratios() {
        let entry = normalize_metric(MetricKind::Inp, &raw(None, &[0.8, 0.1, 0.1]));
        assert_eq!(entry, MetricEntry::empty(MetricKind::Inp));
    }

    #[test]
    fn test_normalize_record_order_and_omission() {
        let response = CruxResponse::from_value(&json!({
            "record": {
                "metrics": {
                    "first_contentful_paint": {"percentiles": {"p75": 1500}},
                    "cumulative_layout_shift": {"percentiles": {"p75": "0.10"}},
                    "largest_contentful_paint": {"percentiles": {"p75": 2400}},
                    "round_trip_time": {"percentiles": {"p75": 90}}
                }
            }
        }))
        .unwrap();

        let entries = normalize_record(&response).unwrap();
        let kinds: Vec<_> = entries.iter().map(|e| e.metric_name).collect();
        assert_eq!(kinds, vec![MetricKind::Lcp, MetricKind::Cls, MetricKind::Fcp]);
    }

    #[test]
    fn test_bad_block_keeps_other_metrics() {
        let response = CruxResponse::from_value(&json!({
            "record": {
                "metrics": {
                    "largest_contentful_paint": {
                        "histogram": [{"density": 0.8}, {"density": 0.15}, {"density": 0.05}],
                        "percentiles": {"p75": 2100}
                    },
                    "cumulative_layout_shift": {
                        "histogram": [{"density": null}, {"density": 0.5}, {"density": 0.5}],
                        "percentiles": {"p75": "0.12"}
                    },
                    "interaction_to_next_paint": null,
                    "first_contentful_paint": {"histogram": "broken"}
                }
            }
        }))
        .unwrap();

        let entries = normalize_record(&response).unwrap();
        let kinds: Vec<_> = entries.iter().map(|e| e.metric_name).collect();
        assert_eq!(kinds, vec![MetricKind::Lcp, MetricKind::Cls]);
        assert!(approx(entries[0].good_ratio, 0.8));
        assert_eq!(entries[1].p75_value, Some(0.12));
        assert!(approx(entries[1].good_ratio, 0.0));
        assert!(approx(entries[1].poor_ratio, 0.5));
    }

    #[test]
    fn test_normalize_record_without_metrics() {
        let response = CruxResponse::from_value(&json!({"record": {}})).unwrap();
        assert!(normalize_record(&response).is_none());
        assert!(normalize_record(&CruxResponse::default()).is_none());
    }
}
