/// Configuration service - loads config from environment variables
use crate::constants::{
    DEFAULT_DEADLINE_SAFETY_MARGIN_MS, DEFAULT_EXECUTION_RECORD_TTL_SECONDS,
    DEFAULT_METRICS_NAMESPACE, DEFAULT_POLL_INITIAL_WAIT_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_POLL_MAX_RETRIES,
};
use crate::error::FlowError;
use crate::models::{FlowConfig, OutputValidation, PollConfig};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable-based configuration provider
pub struct EnvConfigProvider {
    config: FlowConfig,
}

impl EnvConfigProvider {
    pub fn new() -> Result<Self, FlowError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let state_machine_arn = get("STATE_MACHINE_ARN")
            .ok_or_else(|| FlowError::Config("Missing STATE_MACHINE_ARN env var".to_string()))?;
        let executions_table = get("EXECUTIONS_TABLE")
            .ok_or_else(|| FlowError::Config("Missing EXECUTIONS_TABLE env var".to_string()))?;

        let checkpoint_state = get("MACHINE_STATE_FOR_OUTPUT");
        if checkpoint_state.is_none() {
            tracing::info!(
                "MACHINE_STATE_FOR_OUTPUT not set, the execution output of the state machine will be used"
            );
        }

        let poll = PollConfig::new(
            Duration::from_millis(parse_or(
                get("POLL_INITIAL_WAIT_MS"),
                "POLL_INITIAL_WAIT_MS",
                DEFAULT_POLL_INITIAL_WAIT_MS,
            )?),
            Duration::from_millis(parse_or(
                get("POLL_INTERVAL_MS"),
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            parse_or(
                get("POLL_MAX_RETRIES"),
                "POLL_MAX_RETRIES",
                DEFAULT_POLL_MAX_RETRIES,
            )?,
        );

        let config = FlowConfig::builder()
            .state_machine_arn(state_machine_arn)
            .executions_table(executions_table)
            .checkpoint_state(checkpoint_state)
            .record_ttl(Duration::from_secs(parse_or(
                get("EXECUTION_RECORD_TTL_SECONDS"),
                "EXECUTION_RECORD_TTL_SECONDS",
                DEFAULT_EXECUTION_RECORD_TTL_SECONDS,
            )?))
            .poll(poll)
            .output_validation(parse_or(
                get("OUTPUT_VALIDATION"),
                "OUTPUT_VALIDATION",
                OutputValidation::default(),
            )?)
            .deadline_safety_margin(Duration::from_millis(parse_or(
                get("DEADLINE_SAFETY_MARGIN_MS"),
                "DEADLINE_SAFETY_MARGIN_MS",
                DEFAULT_DEADLINE_SAFETY_MARGIN_MS,
            )?))
            .metrics_namespace(
                get("METRICS_NAMESPACE").unwrap_or_else(|| DEFAULT_METRICS_NAMESPACE.to_string()),
            )
            .build();

        // Validate configuration
        config
            .validate()
            .map_err(|e| FlowError::Config(format!("Invalid configuration: {}", e)))?;

        tracing::info!(
            state_machine_arn = %config.state_machine_arn,
            checkpoint_state = ?config.checkpoint_state,
            record_ttl_seconds = config.record_ttl.as_secs(),
            "Configuration validated successfully"
        );

        Ok(Self { config })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn into_config(self) -> FlowConfig {
        self.config
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, FlowError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| FlowError::Config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider(vars: &[(&str, &str)]) -> Result<EnvConfigProvider, FlowError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvConfigProvider::from_source(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        (
            "STATE_MACHINE_ARN",
            "arn:aws:states:us-east-1:123456789012:stateMachine:workmail-flow",
        ),
        ("EXECUTIONS_TABLE", "workmail-flow-executions"),
    ];

    #[test]
    fn test_missing_required_vars() {
        assert!(provider(&[]).is_err());
        assert!(provider(&REQUIRED[..1]).is_err());

        let err = provider(&[REQUIRED[0], ("EXECUTIONS_TABLE", "  ")]).err().unwrap();
        assert!(err.to_string().contains("EXECUTIONS_TABLE"));
    }

    #[test]
    fn test_defaults() {
        let config = provider(&REQUIRED).unwrap().into_config();
        assert_eq!(config.executions_table, "workmail-flow-executions");
        assert!(config.checkpoint_state.is_none());
        assert_eq!(config.record_ttl, Duration::from_secs(14400));
        assert_eq!(config.poll.initial_wait, Duration::from_secs(1));
        assert_eq!(config.poll.max_retries, 10);
        assert_eq!(config.output_validation, OutputValidation::Minimal);
        assert_eq!(config.deadline_safety_margin, Duration::from_millis(1500));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("MACHINE_STATE_FOR_OUTPUT", "Classify"),
            ("EXECUTION_RECORD_TTL_SECONDS", "7200"),
            ("POLL_INITIAL_WAIT_MS", "250"),
            ("POLL_INTERVAL_MS", "2000"),
            ("POLL_MAX_RETRIES", "5"),
            ("DEADLINE_SAFETY_MARGIN_MS", "3000"),
            ("OUTPUT_VALIDATION", "strict"),
            ("METRICS_NAMESPACE", "Custom"),
        ]);

        let config = provider(&vars).unwrap().into_config();
        assert_eq!(config.checkpoint_state.as_deref(), Some("Classify"));
        assert_eq!(config.record_ttl, Duration::from_secs(7200));
        assert_eq!(config.poll.interval, Duration::from_secs(2));
        assert_eq!(config.poll.max_retries, 5);
        assert_eq!(config.poll.initial_wait, Duration::from_millis(250));
        assert_eq!(config.deadline_safety_margin, Duration::from_secs(3));
        assert_eq!(config.output_validation, OutputValidation::Strict);
        assert_eq!(config.metrics_namespace, "Custom");
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("POLL_MAX_RETRIES", "ten"));
        let err = provider(&vars).err().unwrap();
        assert!(err.to_string().contains("POLL_MAX_RETRIES"));

        let mut vars = REQUIRED.to_vec();
        vars.push(("EXECUTION_RECORD_TTL_SECONDS", "30"));
        assert!(provider(&vars).is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push(("OUTPUT_VALIDATION", "paranoid"));
        assert!(provider(&vars).is_err());
    }
}
