//! Configuration module for CruxTrail.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::analysis::RatingThresholds;

/// Default CrUX `queryRecord` endpoint.
pub const DEFAULT_API_URL: &str = "https://chromeuxreport.googleapis.com/v1/records:queryRecord";

/// Keys at or below this length are treated as placeholders.
const MIN_API_KEY_LEN: usize = 20;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the web server (default: 8080)
    pub http_port: u16,
    /// Path to the SQLite database file (default: "cruxtrail.db")
    pub db_path: String,
    /// CrUX API key. Mock mode is used when absent or too short.
    pub api_key: Option<String>,
    /// CrUX query endpoint.
    pub api_base_url: String,
    /// Force synthetic data even when a key is configured.
    pub use_mock_data: bool,
    pub thresholds: RatingThresholds,
    pub max_urls_per_batch: usize,
    /// Upper bound on a single upstream fetch.
    pub fetch_timeout: Duration,
    /// Number of reports returned by the history endpoint.
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_path: "cruxtrail.db".to_string(),
            api_key: None,
            api_base_url: DEFAULT_API_URL.to_string(),
            use_mock_data: false,
            thresholds: RatingThresholds::default(),
            max_urls_per_batch: 10,
            fetch_timeout: Duration::from_secs(30),
            history_limit: 50,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CRUXTRAIL_HTTP_PORT`: HTTP port (default: 8080)
    /// - `CRUXTRAIL_DB_PATH`: Database file path (default: "cruxtrail.db")
    /// - `CRUXTRAIL_API_KEY`: CrUX API key (default: unset, mock mode)
    /// - `CRUXTRAIL_API_URL`: CrUX endpoint
    /// - `CRUXTRAIL_USE_MOCK_DATA`: force mock mode (default: false)
    /// - `CRUXTRAIL_GOOD_RATIO_THRESHOLD`: per-metric good bar (default: 0.75)
    /// - `CRUXTRAIL_BATCH_GOOD_RATIO_HIGH` / `_LOW`: rating bars (default: 0.67 / 0.33)
    /// - `CRUXTRAIL_MAX_URLS_PER_BATCH`: batch cap (default: 10)
    /// - `CRUXTRAIL_FETCH_TIMEOUT_SECS`: fetch timeout (default: 30)
    /// - `CRUXTRAIL_HISTORY_LIMIT`: history size (default: 50)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Unparseable values
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        set_parsed(&lookup, "CRUXTRAIL_HTTP_PORT", &mut cfg.http_port);
        if let Some(db_path) = lookup("CRUXTRAIL_DB_PATH") {
            cfg.db_path = db_path;
        }
        cfg.api_key = lookup("CRUXTRAIL_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(url) = lookup("CRUXTRAIL_API_URL") {
            cfg.api_base_url = url;
        }
        set_parsed(&lookup, "CRUXTRAIL_USE_MOCK_DATA", &mut cfg.use_mock_data);
        set_parsed(
            &lookup,
            "CRUXTRAIL_GOOD_RATIO_THRESHOLD",
            &mut cfg.thresholds.good_ratio,
        );
        set_parsed(
            &lookup,
            "CRUXTRAIL_BATCH_GOOD_RATIO_HIGH",
            &mut cfg.thresholds.batch_high,
        );
        set_parsed(
            &lookup,
            "CRUXTRAIL_BATCH_GOOD_RATIO_LOW",
            &mut cfg.thresholds.batch_low,
        );
        set_parsed(&lookup, "CRUXTRAIL_MAX_URLS_PER_BATCH", &mut cfg.max_urls_per_batch);
        let mut timeout_secs = cfg.fetch_timeout.as_secs();
        set_parsed(&lookup, "CRUXTRAIL_FETCH_TIMEOUT_SECS", &mut timeout_secs);
        if timeout_secs > 0 {
            cfg.fetch_timeout = Duration::from_secs(timeout_secs);
        }
        set_parsed(&lookup, "CRUXTRAIL_HISTORY_LIMIT", &mut cfg.history_limit);

        cfg
    }

    /// Whether synthetic data should be served instead of calling CrUX.
    pub fn mock_mode(&self) -> bool {
        if self.use_mock_data {
            return true;
        }
        match &self.api_key {
            Some(key) => key.len() <= MIN_API_KEY_LEN,
            None => true,
        }
    }
}

fn set_parsed<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.db_path, "cruxtrail.db");
        assert_eq!(cfg.max_urls_per_batch, 10);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
        assert_eq!(cfg.history_limit, 50);
        assert_eq!(cfg.thresholds.good_ratio, 0.75);
        assert_eq!(cfg.thresholds.batch_high, 0.67);
        assert_eq!(cfg.thresholds.batch_low, 0.33);
    }

    #[test]
    fn test_overrides_from_environment() {
        let cfg = config_from(&[
            ("CRUXTRAIL_HTTP_PORT", "9000"),
            ("CRUXTRAIL_DB_PATH", "/tmp/x.db"),
            ("CRUXTRAIL_GOOD_RATIO_THRESHOLD", "0.8"),
            ("CRUXTRAIL_MAX_URLS_PER_BATCH", "3"),
            ("CRUXTRAIL_FETCH_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.http_port, 9000);
        assert_eq!(cfg.db_path, "/tmp/x.db");
        assert_eq!(cfg.thresholds.good_ratio, 0.8);
        assert_eq!(cfg.max_urls_per_batch, 3);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let cfg = config_from(&[
            ("CRUXTRAIL_HTTP_PORT", "not-a-port"),
            ("CRUXTRAIL_FETCH_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_mock_mode_decision() {
        assert!(config_from(&[]).mock_mode());
        assert!(config_from(&[("CRUXTRAIL_API_KEY", "short")]).mock_mode());

        let key = "AIzaSyA-0123456789abcdefghijklmnop";
        assert!(!config_from(&[("CRUXTRAIL_API_KEY", key)]).mock_mode());
        assert!(config_from(&[
            ("CRUXTRAIL_API_KEY", key),
            ("CRUXTRAIL_USE_MOCK_DATA", "true"),
        ])
        .mock_mode());
    }
}
