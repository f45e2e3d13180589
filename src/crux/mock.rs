//! Synthetic CrUX payloads for mock mode.
//!
//! Values are placeholders with no domain meaning. Each URL gets a stable
//! variant so repeated runs produce the same numbers.

use super::{FetchError, MetricsSource};
use crate::analysis::FormFactor;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

const VARIANTS: u32 = 4;

/// Data source that never leaves the process.
#[derive(Debug, Clone, Default)]
pub struct MockSource;

impl MockSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricsSource for MockSource {
    async fn fetch(&self, url: &str, _form_factor: FormFactor) -> Result<Value, FetchError> {
        Ok(mock_payload(url))
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Stable variant index for a URL.
fn variant(url: &str) -> u32 {
    url.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
        % VARIANTS
}

/// Build a CrUX shaped payload for `url`.
pub fn mock_payload(url: &str) -> Value {
    let i = variant(url) as f64;

    json!({
        "mock": true,
        "generated_at": Utc::now().to_rfc3339(),
        "record": {
            "key": {"url": url},
            "metrics": {
                "largest_contentful_paint": metric(
                    json!(2000.0 + i * 200.0),
                    [0.8 - i * 0.1, 0.15, 0.05 + i * 0.1],
                    [0.0, 2500.0, 4000.0],
                ),
                "interaction_to_next_paint": metric(
                    json!(150.0 + i * 50.0),
                    [0.85 - i * 0.05, 0.10, 0.05 + i * 0.05],
                    [0.0, 200.0, 500.0],
                ),
                "cumulative_layout_shift": metric(
                    json!(format!("{:.2}", 0.05 + i * 0.02)),
                    [0.75 - i * 0.08, 0.15, 0.10 + i * 0.08],
                    [0.0, 0.1, 0.25],
                ),
                "first_contentful_paint": metric(
                    json!(1500.0 + i * 100.0),
                    [0.78 - i * 0.06, 0.12, 0.10 + i * 0.06],
                    [0.0, 1800.0, 3000.0],
                ),
            }
        }
    })
}

fn metric(p75: Value, densities: [f64; 3], starts: [f64; 3]) -> Value {
    json!({
        "histogram": [
            {"start": starts[0], "end": starts[1], "density": densities[0]},
            {"start": starts[1], "end": starts[2], "density": densities[1]},
            {"start": starts[2], "density": densities[2]},
        ],
        "percentiles": {"p75": p75}
    })
}
