//! Decision metrics for the access-control pipeline

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::AccessError;

/// Pipeline metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
    /// Total number of evaluated operations
    pub total_requests: u64,

    /// Operations allowed
    pub allowed: u64,

    /// Clean denials
    pub denied: u64,

    /// Rules that returned non-booleans
    pub return_type_errors: u64,

    /// Rules that failed while running
    pub extension_errors: u64,

    /// Filter, storage, registry and cancellation failures
    pub other_errors: u64,

    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
    pub avg_latency_ms: f64,
}

impl PipelineMetrics {
    /// Share of decided operations that were allowed
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed + self.denied;
        if total == 0 {
            0.0
        } else {
            self.allowed as f64 / total as f64
        }
    }
}

/// Bucket for failures raised by payload keys that are not declared fields
pub const UNKNOWN_FIELD_TAG: &str = "unknown_field";

/// Metrics collector
pub struct MetricsCollector {
    metrics: Arc<RwLock<PipelineMetrics>>,

    /// Latency window; percentiles are computed when read
    latency_samples: Arc<RwLock<VecDeque<f64>>>,

    max_samples: usize,

    /// Broken-rule counts keyed by declared rule tag
    broken_rules: DashMap<String, u64>,
}

impl MetricsCollector {
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            metrics: Arc::new(RwLock::new(PipelineMetrics::default())),
            latency_samples: Arc::new(RwLock::new(VecDeque::with_capacity(
                max_samples.min(10_000),
            ))),
            max_samples,
            broken_rules: DashMap::new(),
        }
    }

    /// Record the result of one pipeline operation
    pub async fn record_result<T>(&self, result: &Result<T, AccessError>, latency: Duration) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.total_requests += 1;

            match result {
                Ok(_) => metrics.allowed += 1,
                Err(AccessError::AccessDenied(_)) => metrics.denied += 1,
                Err(AccessError::ReturnType(err)) => {
                    metrics.return_type_errors += 1;
                    for entry in &err.entries {
                        self.count_broken(&entry.tag);
                    }
                }
                Err(AccessError::Extension(err)) => {
                    metrics.extension_errors += 1;
                    for failure in &err.failures {
                        if failure.is_unknown_field() {
                            self.count_broken(UNKNOWN_FIELD_TAG);
                        } else {
                            self.count_broken(&failure.tag);
                        }
                    }
                }
                Err(_) => metrics.other_errors += 1,
            }
        }

        self.record_latency(latency).await;
    }

    fn count_broken(&self, tag: &str) {
        *self.broken_rules.entry(tag.to_string()).or_insert(0) += 1;
    }

    async fn record_latency(&self, latency: Duration) {
        let mut samples = self.latency_samples.write().await;
        samples.push_back(latency.as_secs_f64() * 1000.0);
        while samples.len() > self.max_samples {
            samples.pop_front();
        }
    }

    /// Times a rule tag was reported broken
    pub fn broken_rule_count(&self, tag: &str) -> u64 {
        self.broken_rules.get(tag).map(|count| *count).unwrap_or(0)
    }

    /// Number of distinct broken-rule tags
    pub fn broken_rule_series(&self) -> usize {
        self.broken_rules.len()
    }

    pub async fn get_metrics(&self) -> PipelineMetrics {
        let mut metrics = self.metrics.read().await.clone();

        let mut sorted: Vec<f64> = self.latency_samples.read().await.iter().copied().collect();
        if !sorted.is_empty() {
            sorted.sort_by(|a, b| a.total_cmp(b));
            metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
            metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
            metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
        }

        metrics
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = PipelineMetrics::default();
        self.latency_samples.write().await.clear();
        self.broken_rules.clear();
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.get_metrics().await;

        let mut out = format!(
            r#"# HELP access_control_requests_total Total number of evaluated mutations
# TYPE access_control_requests_total counter
access_control_requests_total {}

# HELP access_control_decisions_total Decisions by outcome
# TYPE access_control_decisions_total counter
access_control_decisions_total{{outcome="allowed"}} {}
access_control_decisions_total{{outcome="denied"}} {}
access_control_decisions_total{{outcome="return_type_error"}} {}
access_control_decisions_total{{outcome="extension_error"}} {}
access_control_decisions_total{{outcome="other_error"}} {}

# HELP access_control_latency_seconds Evaluation latency percentiles
# TYPE access_control_latency_seconds summary
access_control_latency_seconds{{quantile="0.5"}} {}
access_control_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.total_requests,
            metrics.allowed,
            metrics.denied,
            metrics.return_type_errors,
            metrics.extension_errors,
            metrics.other_errors,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        );

        let mut broken: Vec<(String, u64)> = self
            .broken_rules
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        broken.sort();

        if !broken.is_empty() {
            out.push_str("\n# HELP access_control_broken_rules_total Broken rule reports by tag\n");
            out.push_str("# TYPE access_control_broken_rules_total counter\n");
            for (tag, count) in broken {
                out.push_str(&format!(
                    "access_control_broken_rules_total{{tag=\"{}\"}} {}\n",
                    escape_label_value(&tag),
                    count
                ));
            }
        }

        out
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(10_000)
    }
}

/// Escape a label value for the Prometheus text exposition format
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}
