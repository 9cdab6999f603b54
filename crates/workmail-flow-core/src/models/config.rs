/// Configuration models
use crate::constants::{
    DEFAULT_DEADLINE_SAFETY_MARGIN_MS, DEFAULT_EXECUTION_RECORD_TTL_SECONDS,
    DEFAULT_METRICS_NAMESPACE, DEFAULT_POLL_INITIAL_WAIT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_MAX_RETRIES, POLL_JITTER_FACTOR,
};
use crate::models::OutputValidation;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Everything the dispatcher, locator and poller need, fixed for the Lambda lifetime
#[derive(Debug, Clone, TypedBuilder)]
pub struct FlowConfig {
    /// State machine every invocation is dispatched to
    #[builder(setter(into))]
    pub state_machine_arn: String,
    /// DynamoDB table holding execution records
    #[builder(setter(into))]
    pub executions_table: String,
    /// State whose exit output is returned before the execution finishes
    #[builder(default)]
    pub checkpoint_state: Option<String>,
    #[builder(default = Duration::from_secs(DEFAULT_EXECUTION_RECORD_TTL_SECONDS))]
    pub record_ttl: Duration,
    #[builder(default)]
    pub poll: PollConfig,
    #[builder(default)]
    pub output_validation: OutputValidation,
    #[builder(default = Duration::from_millis(DEFAULT_DEADLINE_SAFETY_MARGIN_MS))]
    pub deadline_safety_margin: Duration,
    #[builder(default = DEFAULT_METRICS_NAMESPACE.to_string(), setter(into))]
    pub metrics_namespace: String,
}

impl FlowConfig {
    /// Validates configuration is usable
    pub fn validate(&self) -> Result<(), String> {
        if !self.state_machine_arn.starts_with("arn:") {
            return Err(format!(
                "Invalid state machine ARN: '{}'",
                self.state_machine_arn
            ));
        }

        if self.executions_table.trim().is_empty() {
            return Err("Executions table not configured".to_string());
        }

        if let Some(state) = &self.checkpoint_state
            && state.trim().is_empty()
        {
            return Err("Checkpoint state name must not be blank".to_string());
        }

        if self.record_ttl.is_zero() {
            return Err("Execution record TTL must be > 0".to_string());
        }

        // A retry arriving after the record expired falls back to a full listing scan
        let window = self.poll.worst_case_window();
        if self.record_ttl < window {
            return Err(format!(
                "Execution record TTL {}s is shorter than the polling window {}s",
                self.record_ttl.as_secs(),
                window.as_secs()
            ));
        }

        if !(0.0..1.0).contains(&self.poll.jitter_factor) {
            return Err("Poll jitter factor must be within [0, 1)".to_string());
        }

        Ok(())
    }
}

/// Poll schedule: an initial wait, then up to `max_retries` further polls
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub initial_wait: Duration,
    pub interval: Duration,
    pub max_retries: u32,
    pub jitter_factor: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_millis(DEFAULT_POLL_INITIAL_WAIT_MS),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_retries: DEFAULT_POLL_MAX_RETRIES,
            jitter_factor: POLL_JITTER_FACTOR,
        }
    }
}

impl PollConfig {
    pub fn new(initial_wait: Duration, interval: Duration, max_retries: u32) -> Self {
        Self {
            initial_wait,
            interval,
            max_retries,
            jitter_factor: POLL_JITTER_FACTOR,
        }
    }

    /// Interval before the next poll: interval * (1 ± jitter)
    pub fn next_delay(&self) -> Duration {
        if self.interval.is_zero() || self.jitter_factor == 0.0 {
            return self.interval;
        }

        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * self.jitter_factor;
        let jittered_ms = (self.interval.as_millis() as f64 * (1.0 + jitter)).max(0.0) as u64;

        Duration::from_millis(jittered_ms)
    }

    /// Longest time a single invocation can spend waiting between polls
    pub fn worst_case_window(&self) -> Duration {
        let max_interval = self.interval.mul_f64(1.0 + self.jitter_factor);
        self.initial_wait + max_interval * self.max_retries
    }
}
