//! Per-URL result construction.

use super::classify::{classify, RatingThresholds};
use super::model::{FormFactor, MetricEntry, MetricKind, UrlResult};
use super::normalize::normalize_record;
use crate::crux::{CruxResponse, FetchError};
use crate::db::NewReport;

use chrono::Utc;
use serde_json::Value;

pub const NO_DATA: &str = "No data available";
pub const PERMISSION_ERROR: &str = "API key error - check permissions";

/// Build the result for one URL from its fetch outcome.
///
/// Every outcome maps to a result; errors become status strings.
pub fn build_result(
    url: &str,
    form_factor: FormFactor,
    outcome: &Result<Value, FetchError>,
    thresholds: &RatingThresholds,
) -> UrlResult {
    let (metrics, overall_performance) = match outcome {
        Ok(payload) => from_payload(url, payload, thresholds),
        Err(FetchError::NotFound(detail)) => {
            tracing::warn!("Analyzer: No CrUX data for {}: {}", url, detail);
            (vec![MetricEntry::empty(MetricKind::Lcp)], NO_DATA.to_string())
        }
        Err(FetchError::PermissionDenied(detail)) => {
            tracing::error!("Analyzer: API key permission denied for {}: {}", url, detail);
            (Vec::new(), PERMISSION_ERROR.to_string())
        }
        Err(FetchError::Other(detail)) => {
            tracing::error!("Analyzer: Error analyzing {}: {}", url, detail);
            (Vec::new(), api_error(detail))
        }
    };

    UrlResult {
        url: url.to_string(),
        form_factor,
        metrics,
        overall_performance,
        created_at: Utc::now(),
    }
}

fn from_payload(
    url: &str,
    payload: &Value,
    thresholds: &RatingThresholds,
) -> (Vec<MetricEntry>, String) {
    let response = match CruxResponse::from_value(payload) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Analyzer: Unreadable payload for {}: {}", url, e);
            return (Vec::new(), api_error(&e.to_string()));
        }
    };

    match normalize_record(&response) {
        Some(metrics) => {
            let rating = classify(&metrics, thresholds);
            (metrics, rating.to_string())
        }
        None => (Vec::new(), NO_DATA.to_string()),
    }
}

fn api_error(detail: &str) -> String {
    format!("API Error: {}", detail)
}

/// Columns persisted for a fetched URL.
pub fn report_for(result: &UrlResult, payload: &Value) -> NewReport {
    let p75 = |kind| result.metric(kind).and_then(|m| m.p75_value);
    NewReport {
        url: result.url.clone(),
        form_factor: result.form_factor.as_str().to_string(),
        largest_contentful_paint: p75(MetricKind::Lcp),
        first_input_delay: p75(MetricKind::Fid),
        cumulative_layout_shift: p75(MetricKind::Cls),
        first_contentful_paint: p75(MetricKind::Fcp),
        interaction_to_next_paint: p75(MetricKind::Inp),
        time_to_first_byte: p75(MetricKind::Ttfb),
        overall_performance: result.overall_performance.clone(),
        api_response: payload.clone(),
    }
}
