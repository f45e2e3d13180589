//! Batch analysis driver.

use super::builder::{build_result, report_for};
use super::classify::RatingThresholds;
use super::model::{AnalysisResponse, FormFactor, UrlResult};
use super::summary::{summarize, SUMMARY_ERROR};
use crate::config::ServerConfig;
use crate::crux::{FetchError, MetricsSource};
use crate::db::ReportStore;

use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

pub const MOCK_NOTE: &str = "Mock data for testing - configure a CrUX API key for real data";

/// Input rejected before any processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("At least one URL is required")]
    Empty,
    #[error("Maximum {max} URLs allowed")]
    TooMany { max: usize },
    #[error("Invalid URL: {0}. URLs must start with http:// or https://")]
    Invalid(String),
    #[error("Duplicate URLs are not allowed: {0}")]
    Duplicate(String),
}

/// Analyzer settings.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub thresholds: RatingThresholds,
    pub max_urls_per_batch: usize,
    pub fetch_timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            thresholds: RatingThresholds::default(),
            max_urls_per_batch: 10,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ServerConfig> for AnalyzerSettings {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            thresholds: cfg.thresholds,
            max_urls_per_batch: cfg.max_urls_per_batch,
            fetch_timeout: cfg.fetch_timeout,
        }
    }
}

/// Check that `urls` is a non-empty, capped list of distinct http(s) URLs.
pub fn validate_urls(urls: &[String], max: usize) -> Result<Vec<String>, ValidationError> {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| {
        Regex::new(r"^https?://[A-Za-z0-9\-._~%!$&'()*+,;=:@\[\]]+(?:[/?#]\S*)?$")
            .expect("valid regex")
    });

    if urls.is_empty() {
        return Err(ValidationError::Empty);
    }
    if urls.len() > max {
        return Err(ValidationError::TooMany { max });
    }

    let mut seen = HashSet::with_capacity(urls.len());
    let mut validated = Vec::with_capacity(urls.len());
    for url in urls {
        let url = url.trim();
        if !re.is_match(url) {
            return Err(ValidationError::Invalid(url.to_string()));
        }
        if !seen.insert(url) {
            return Err(ValidationError::Duplicate(url.to_string()));
        }
        validated.push(url.to_string());
    }
    Ok(validated)
}

/// Drives a batch: validation, fetch, normalization, rating, summary and
/// persistence.
pub struct Analyzer {
    source: Arc<dyn MetricsSource>,
    store: Arc<dyn ReportStore>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        store: Arc<dyn ReportStore>,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            source,
            store,
            settings,
        }
    }

    /// Analyze a batch of URLs.
    ///
    /// Only validation can fail. Fetch, summary and storage failures degrade
    /// the response instead.
    pub async fn analyze(
        &self,
        urls: &[String],
        form_factor: FormFactor,
    ) -> Result<AnalysisResponse, ValidationError> {
        let urls = validate_urls(urls, self.settings.max_urls_per_batch)?;
        let session_id = uuid::Uuid::new_v4().to_string();
        let mock = self.source.is_mock();

        tracing::info!(
            "Analyzer: Session {} analyzing {} URL(s) ({}, {})",
            session_id,
            urls.len(),
            form_factor,
            if mock { "mock" } else { "live" }
        );

        let mut results = Vec::with_capacity(urls.len());
        for url in &urls {
            results.push(self.analyze_url(url, form_factor).await);
        }

        if let Err(e) = self.store.save_session(&session_id, &urls) {
            tracing::error!("Analyzer: Failed to save session {}: {}", session_id, e);
        }

        let (summary, summary_error) = if urls.len() > 1 {
            batch_summary(&results)
        } else {
            (None, None)
        };

        Ok(AnalysisResponse {
            session_id,
            results,
            summary,
            summary_error,
            note: mock.then(|| MOCK_NOTE.to_string()),
        })
    }

    async fn analyze_url(&self, url: &str, form_factor: FormFactor) -> UrlResult {
        let timeout = self.settings.fetch_timeout;
        let outcome = match tokio::time::timeout(timeout, self.source.fetch(url, form_factor)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchError::Other(format!(
                "request timed out after {}s",
                timeout.as_secs_f64()
            ))),
        };

        let result = build_result(url, form_factor, &outcome, &self.settings.thresholds);

        if let Ok(payload) = &outcome {
            if let Err(e) = self.store.save_report(&report_for(&result, payload)) {
                tracing::error!("Analyzer: Failed to save report for {}: {}", url, e);
            }
        }

        result
    }
}

fn batch_summary(
    results: &[UrlResult],
) -> (Option<Vec<super::model::SummaryEntry>>, Option<String>) {
    match summarize(results) {
        Ok(summary) => (Some(summary), None),
        Err(e) => {
            tracing::error!("Analyzer: Error calculating summary statistics: {}", e);
            (Some(Vec::new()), Some(SUMMARY_ERROR.to_string()))
        }
    }
}
