//! Cross-URL summary statistics.

use super::classify::round2;
use super::model::{MetricKind, SummaryEntry, UrlResult};

use std::collections::BTreeMap;
use thiserror::Error;

/// Marker returned to clients when the summary could not be computed.
pub const SUMMARY_ERROR: &str = "Failed to calculate summary statistics";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("aggregate for {0} is not finite")]
    NonFinite(MetricKind),
}

/// Summarize p75 values per metric across a batch.
///
/// Lower values are better for every metric. Ties keep the first URL seen.
/// Metrics without any numeric p75 are left out. Output follows canonical
/// metric order.
pub fn summarize(results: &[UrlResult]) -> Result<Vec<SummaryEntry>, AggregationError> {
    let mut groups: BTreeMap<MetricKind, Vec<(f64, &str)>> = BTreeMap::new();

    for result in results {
        for metric in &result.metrics {
            let Some(value) = metric.p75_value else {
                continue;
            };
            if !value.is_finite() {
                tracing::warn!(
                    "Summary: Invalid p75 value for {} at {}: {}",
                    metric.metric_name,
                    result.url,
                    value
                );
                continue;
            }
            groups
                .entry(metric.metric_name)
                .or_default()
                .push((value, result.url.as_str()));
        }
    }

    groups
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(kind, values)| summarize_group(kind, &values))
        .collect()
}

fn summarize_group(
    kind: MetricKind,
    values: &[(f64, &str)],
) -> Result<SummaryEntry, AggregationError> {
    let mut best = values[0];
    let mut worst = values[0];
    let mut total = 0.0;

    for &(value, url) in values {
        total += value;
        if value < best.0 {
            best = (value, url);
        }
        if value > worst.0 {
            worst = (value, url);
        }
    }

    let average = total / values.len() as f64;
    if !average.is_finite() {
        return Err(AggregationError::NonFinite(kind));
    }

    Ok(SummaryEntry {
        metric_name: kind,
        average_p75: round2(average),
        best_url: best.1.to_string(),
        worst_url: worst.1.to_string(),
        best_value: round2(best.0),
        worst_value: round2(worst.0),
    })
}
