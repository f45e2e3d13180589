//! Chrome UX Report data sources.
//!
//! Supports the live CrUX API and a synthetic generator for mock mode.

mod client;
mod mock;

pub use client::*;
pub use mock::*;

use crate::analysis::FormFactor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Fetch error kinds surfaced to the result builder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("no CrUX data: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    Other(String),
}

/// Upstream metrics fetch.
///
/// Implementations return the raw JSON payload so it can be persisted as
/// received.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        form_factor: FormFactor,
    ) -> Result<serde_json::Value, FetchError>;

    /// Whether the payloads are synthetic.
    fn is_mock(&self) -> bool {
        false
    }
}

/// Top level `queryRecord` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CruxResponse {
    #[serde(default)]
    pub record: Option<CruxRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CruxRecord {
    /// Metric blocks stay raw until normalization so an unreadable block
    /// only loses itself.
    #[serde(default)]
    pub metrics: Option<HashMap<String, serde_json::Value>>,
}

/// One metric block as returned upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMetric {
    #[serde(default)]
    pub percentiles: Option<Percentiles>,
    #[serde(default)]
    pub histogram: Option<Vec<HistogramBucket>>,
}

/// CrUX sends some percentiles (CLS) as decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Percentiles {
    #[serde(default)]
    pub p75: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistogramBucket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<serde_json::Value>,
    /// Number, numeric string or absent. See `normalize::bucket_density`.
    #[serde(default)]
    pub density: Option<serde_json::Value>,
}

impl RawMetric {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

impl CruxResponse {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, FetchError> {
        serde_json::from_value(value.clone())
            .map_err(|e| FetchError::Other(format!("malformed payload: {}", e)))
    }
}
