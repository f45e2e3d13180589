//! Live CrUX API client.

use super::{FetchError, MetricsSource};
use crate::analysis::{FormFactor, MetricKind};

use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::OnceLock;
use std::time::Duration;

/// Which record key a query is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    Url,
    Origin,
}

/// One query shape. Strategies are tried in order; a `400` moves on to the
/// next one.
#[derive(Debug, Clone)]
pub struct QueryStrategy {
    pub description: &'static str,
    pub key: QueryKey,
}

/// URL-keyed query first, origin-keyed as the fallback.
pub fn default_strategies() -> Vec<QueryStrategy> {
    vec![
        QueryStrategy {
            description: "URL-based query",
            key: QueryKey::Url,
        },
        QueryStrategy {
            description: "Origin-based query",
            key: QueryKey::Origin,
        },
    ]
}

/// Client for the Chrome UX Report `queryRecord` endpoint.
pub struct CruxClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    strategies: Vec<QueryStrategy>,
}

impl CruxClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            strategies: default_strategies(),
        })
    }

    #[cfg(test)]
    pub fn with_strategies(mut self, strategies: Vec<QueryStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    fn request_body(&self, key: QueryKey, url: &str, form_factor: FormFactor) -> Value {
        let metrics: Vec<&str> = MetricKind::REQUESTED.iter().map(|k| k.api_key()).collect();
        let mut body = match key {
            QueryKey::Url => json!({ "url": url, "metrics": metrics }),
            QueryKey::Origin => json!({ "origin": origin_of(url), "metrics": metrics }),
        };
        // CrUX aggregates over all devices when formFactor is omitted.
        if form_factor != FormFactor::AllFormFactors {
            body["formFactor"] = json!(form_factor.as_str());
        }
        body
    }
}

#[async_trait]
impl MetricsSource for CruxClient {
    async fn fetch(&self, url: &str, form_factor: FormFactor) -> Result<Value, FetchError> {
        let clean = clean_url(url);
        tracing::info!(
            "CruxClient: Querying {} with form factor {}",
            clean,
            form_factor
        );

        for strategy in &self.strategies {
            let body = self.request_body(strategy.key, &clean, form_factor);
            let response = self
                .http
                .post(&self.base_url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        FetchError::Other("request timed out".to_string())
                    } else {
                        FetchError::Other(e.to_string())
                    }
                })?;

            let status = response.status();
            tracing::info!(
                "CruxClient: Response status {} for {}",
                status.as_u16(),
                strategy.description
            );

            match status {
                s if s.is_success() => {
                    return response
                        .json::<Value>()
                        .await
                        .map_err(|e| FetchError::Other(format!("invalid response body: {}", e)));
                }
                StatusCode::BAD_REQUEST => {
                    let details = response.text().await.unwrap_or_default();
                    tracing::warn!(
                        "CruxClient: 400 for {} ({}), trying next approach",
                        strategy.description,
                        details.trim()
                    );
                }
                StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound(format!(
                        "No CrUX data available for {}",
                        clean
                    )));
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(FetchError::PermissionDenied(status.as_u16().to_string()));
                }
                other => return Err(FetchError::Other(other.as_u16().to_string())),
            }
        }

        Err(FetchError::NotFound(format!(
            "No CrUX data available for {}",
            clean
        )))
    }
}

/// Strip fragment, query string and trailing slashes.
pub fn clean_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    without_query.trim_end_matches('/').to_string()
}

/// `scheme://host[:port]` of a URL, or the input when it has no such prefix.
pub fn origin_of(url: &str) -> String {
    static ORIGIN: OnceLock<Regex> = OnceLock::new();
    let re = ORIGIN.get_or_init(|| Regex::new(r"^(https?://[^/?#]+)").expect("valid regex"));
    re.captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| url.to_string())
}
