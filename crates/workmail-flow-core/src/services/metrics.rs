/// CloudWatch metrics service for monitoring and observability
use crate::constants::{DEFAULT_METRICS_NAMESPACE, LOG_TARGET_METRICS};
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use std::collections::HashMap;
use tracing::{debug, error};

#[async_trait]
pub trait MetricsService: Send + Sync {
    /// Record a counter metric (count of events)
    async fn record_counter(&self, name: &str, value: f64, dimensions: &[(&str, &str)]);

    /// Record a histogram metric (distribution of values)
    async fn record_histogram(
        &self,
        name: &str,
        value: f64,
        unit: MetricUnit,
        dimensions: &[(&str, &str)],
    );
}

#[derive(Debug, Clone, Copy)]
pub enum MetricUnit {
    Count,
    Milliseconds,
}

impl From<MetricUnit> for StandardUnit {
    fn from(unit: MetricUnit) -> Self {
        match unit {
            MetricUnit::Count => StandardUnit::Count,
            MetricUnit::Milliseconds => StandardUnit::Milliseconds,
        }
    }
}

/// CloudWatch metrics service implementation
pub struct CloudWatchMetricsService {
    client: aws_sdk_cloudwatch::Client,
    namespace: String,
}

impl CloudWatchMetricsService {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self::with_namespace(client, DEFAULT_METRICS_NAMESPACE.to_string())
    }

    pub fn with_namespace(client: aws_sdk_cloudwatch::Client, namespace: String) -> Self {
        Self { client, namespace }
    }

    async fn emit_metric(
        &self,
        name: &str,
        value: f64,
        unit: MetricUnit,
        dimensions: &[(&str, &str)],
    ) {
        let dims: Vec<Dimension> = dimensions
            .iter()
            .map(|(k, v)| Dimension::builder().name(*k).value(*v).build())
            .collect();

        let datum = MetricDatum::builder()
            .metric_name(name)
            .value(value)
            .unit(unit.into())
            .timestamp(aws_smithy_types::DateTime::from(
                std::time::SystemTime::now(),
            ))
            .set_dimensions(if dims.is_empty() { None } else { Some(dims) })
            .build();

        // Metric failures must never fail the mail flow
        match self
            .client
            .put_metric_data()
            .namespace(&self.namespace)
            .metric_data(datum)
            .send()
            .await
        {
            Ok(_) => {
                debug!(
                    target: LOG_TARGET_METRICS,
                    metric = name,
                    value = value,
                    "Emitted metric to CloudWatch"
                );
            }
            Err(e) => {
                error!(
                    target: LOG_TARGET_METRICS,
                    metric = name,
                    error = %e,
                    "Failed to emit metric to CloudWatch"
                );
            }
        }
    }
}

#[async_trait]
impl MetricsService for CloudWatchMetricsService {
    async fn record_counter(&self, name: &str, value: f64, dimensions: &[(&str, &str)]) {
        self.emit_metric(name, value, MetricUnit::Count, dimensions)
            .await;
    }

    async fn record_histogram(
        &self,
        name: &str,
        value: f64,
        unit: MetricUnit,
        dimensions: &[(&str, &str)],
    ) {
        self.emit_metric(name, value, unit, dimensions).await;
    }
}

/// Helper functions for commonly used metrics
pub struct Metrics;

impl Metrics {
    /// Record a fresh execution start
    pub async fn execution_started(service: &dyn MetricsService) {
        service.record_counter("ExecutionsStarted", 1.0, &[]).await;
    }

    /// Record a duplicate start resolved to an existing execution
    pub async fn duplicate_start_resolved(service: &dyn MetricsService, source: &str) {
        service
            .record_counter("DuplicateStartsResolved", 1.0, &[("Source", source)])
            .await;
    }

    /// Record a fallback scan over the execution listing
    pub async fn locator_fallback_scan(service: &dyn MetricsService, pages: usize) {
        service
            .record_counter("LocatorFallbackScans", 1.0, &[])
            .await;
        service
            .record_histogram(
                "LocatorFallbackPages",
                pages as f64,
                MetricUnit::Count,
                &[],
            )
            .await;
    }

    /// Record state machine output that failed validation
    pub async fn malformed_output(service: &dyn MetricsService) {
        service.record_counter("MalformedOutputs", 1.0, &[]).await;
    }

    /// Record a routing decision taken from the state machine
    pub async fn decision_returned(service: &dyn MetricsService, source: &str, duration_ms: f64) {
        service
            .record_counter("DecisionsReturned", 1.0, &[("Source", source)])
            .await;
        service
            .record_histogram(
                "FlowDuration",
                duration_ms,
                MetricUnit::Milliseconds,
                &[("Source", source)],
            )
            .await;
    }

    /// Record a fallback to the default decision
    pub async fn default_decision(service: &dyn MetricsService, reason: &str, duration_ms: f64) {
        service
            .record_counter("DefaultDecisions", 1.0, &[("Reason", reason)])
            .await;
        service
            .record_histogram(
                "FlowDuration",
                duration_ms,
                MetricUnit::Milliseconds,
                &[("Source", "Default")],
            )
            .await;
    }
}

/// Mock metrics service for testing
pub struct MockMetricsService {
    metrics: tokio::sync::Mutex<HashMap<String, Vec<f64>>>,
}

impl MockMetricsService {
    pub fn new() -> Self {
        Self {
            metrics: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_metric_values(&self, name: &str) -> Vec<f64> {
        self.metrics
            .lock()
            .await
            .get(name)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MockMetricsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsService for MockMetricsService {
    async fn record_counter(&self, name: &str, value: f64, _dimensions: &[(&str, &str)]) {
        let mut metrics = self.metrics.lock().await;
        metrics.entry(name.to_string()).or_default().push(value);
    }

    async fn record_histogram(
        &self,
        name: &str,
        value: f64,
        _unit: MetricUnit,
        _dimensions: &[(&str, &str)],
    ) {
        let mut metrics = self.metrics.lock().await;
        metrics.entry(name.to_string()).or_default().push(value);
    }
}
