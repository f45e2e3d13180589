//! Database model types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A report to be inserted.
#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub url: String,
    pub form_factor: String,
    pub largest_contentful_paint: Option<f64>,
    /// Deprecated metric, kept for older payloads.
    pub first_input_delay: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub first_contentful_paint: Option<f64>,
    pub interaction_to_next_paint: Option<f64>,
    /// Deprecated metric, kept for older payloads.
    pub time_to_first_byte: Option<f64>,
    pub overall_performance: String,
    pub api_response: serde_json::Value,
}

/// A stored CrUX report.
#[derive(Debug, Clone, Serialize)]
pub struct StoredReport {
    pub id: i64,
    pub url: String,
    pub form_factor: String,
    pub largest_contentful_paint: Option<f64>,
    pub first_input_delay: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub first_contentful_paint: Option<f64>,
    pub interaction_to_next_paint: Option<f64>,
    pub time_to_first_byte: Option<f64>,
    pub overall_performance: String,
    pub api_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A stored analysis session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub session_id: String,
    pub urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}
