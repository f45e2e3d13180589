//! Analysis data model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A web-vital metric reported by CrUX.
///
/// Variant order is the canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Lcp,
    Cls,
    Inp,
    Fcp,
    /// Deprecated upstream, kept for older payloads.
    Fid,
    /// Deprecated upstream, kept for older payloads.
    Ttfb,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Lcp,
        MetricKind::Cls,
        MetricKind::Inp,
        MetricKind::Fcp,
        MetricKind::Fid,
        MetricKind::Ttfb,
    ];

    /// Metrics requested from the upstream API.
    pub const REQUESTED: [MetricKind; 4] = [
        MetricKind::Lcp,
        MetricKind::Cls,
        MetricKind::Inp,
        MetricKind::Fcp,
    ];

    /// Key used by the CrUX payload.
    pub fn api_key(self) -> &'static str {
        match self {
            MetricKind::Lcp => "largest_contentful_paint",
            MetricKind::Cls => "cumulative_layout_shift",
            MetricKind::Inp => "interaction_to_next_paint",
            MetricKind::Fcp => "first_contentful_paint",
            MetricKind::Fid => "first_input_delay",
            MetricKind::Ttfb => "time_to_first_byte",
        }
    }

    /// Human readable name used in responses.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::Lcp => "Largest Contentful Paint (LCP)",
            MetricKind::Cls => "Cumulative Layout Shift (CLS)",
            MetricKind::Inp => "Interaction to Next Paint (INP)",
            MetricKind::Fcp => "First Contentful Paint (FCP)",
            MetricKind::Fid => "First Input Delay (FID)",
            MetricKind::Ttfb => "Time to First Byte (TTFB)",
        }
    }

    /// Core Web Vitals drive the overall rating.
    pub fn is_core(self) -> bool {
        matches!(self, MetricKind::Lcp | MetricKind::Cls | MetricKind::Inp)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.label() == label)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for MetricKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for MetricKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        MetricKind::from_label(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown metric: {}", label)))
    }
}

/// Device class the metrics are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormFactor {
    #[default]
    AllFormFactors,
    Phone,
    Desktop,
    Tablet,
}

impl FormFactor {
    pub fn as_str(self) -> &'static str {
        match self {
            FormFactor::AllFormFactors => "ALL_FORM_FACTORS",
            FormFactor::Phone => "PHONE",
            FormFactor::Desktop => "DESKTOP",
            FormFactor::Tablet => "TABLET",
        }
    }
}

impl fmt::Display for FormFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named metric for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub metric_name: MetricKind,
    pub p75_value: Option<f64>,
    pub good_ratio: Option<f64>,
    pub needs_improvement_ratio: Option<f64>,
    pub poor_ratio: Option<f64>,
}

impl MetricEntry {
    /// Entry carrying no values at all.
    pub fn empty(metric_name: MetricKind) -> Self {
        Self {
            metric_name,
            p75_value: None,
            good_ratio: None,
            needs_improvement_ratio: None,
            poor_ratio: None,
        }
    }
}

/// Full analysis of one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlResult {
    pub url: String,
    pub form_factor: FormFactor,
    pub metrics: Vec<MetricEntry>,
    pub overall_performance: String,
    pub created_at: DateTime<Utc>,
}

impl UrlResult {
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricEntry> {
        self.metrics.iter().find(|m| m.metric_name == kind)
    }
}

/// Aggregate of one metric across a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub metric_name: MetricKind,
    pub average_p75: f64,
    pub best_url: String,
    pub worst_url: String,
    pub best_value: f64,
    pub worst_value: f64,
}

/// Response body for a batch analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub session_id: String,
    pub results: Vec<UrlResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Vec<SummaryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
