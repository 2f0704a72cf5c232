//! Pipeline configuration
//!
//! Environment variables:
//! - `ACCESS_ENABLE_METRICS` - collect decision metrics (default: true)
//! - `ACCESS_MAX_LATENCY_SAMPLES` - latency samples kept for percentiles (default: 10000)

use serde::{Deserialize, Serialize};

/// Access-control pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Latency samples retained for percentile calculation
    pub max_latency_samples: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            max_latency_samples: 10_000,
        }
    }
}

impl PipelineConfig {
    /// Load from environment, falling back to defaults for absent or unparsable values
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            enable_metrics: lookup("ACCESS_ENABLE_METRICS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_metrics),
            max_latency_samples: lookup("ACCESS_MAX_LATENCY_SAMPLES")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_latency_samples),
        }
    }
}
