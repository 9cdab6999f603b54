//! Common test utilities and helpers for integration tests
#![allow(dead_code)]

use lambda_runtime::{Context, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use workmail_flow_worker::FlowContext;
use workmail_flow_worker::models::{FlowConfig, PollConfig};
use workmail_flow_worker::services::engine::InMemoryExecutionEngine;
use workmail_flow_worker::services::execution_store::InMemoryExecutionStore;
use workmail_flow_worker::services::metrics::MockMetricsService;

pub mod test_data;

pub const STATE_MACHINE_ARN: &str =
    "arn:aws:states:us-east-1:123456789012:stateMachine:message-flow";
pub const EXECUTIONS_TABLE: &str = "workmail-flow-executions";
pub const CHECKPOINT_STATE: &str = "Classify";

/// Polling with no waits, so tests never sleep
pub fn immediate_poll(max_retries: u32) -> PollConfig {
    PollConfig::new(Duration::ZERO, Duration::ZERO, max_retries)
}

pub fn test_config(poll: PollConfig, checkpoint: Option<&str>) -> FlowConfig {
    FlowConfig::builder()
        .state_machine_arn(STATE_MACHINE_ARN)
        .executions_table(EXECUTIONS_TABLE)
        .checkpoint_state(checkpoint.map(str::to_string))
        .poll(poll)
        .build()
}

/// In-memory collaborators plus a handler context wired to them
pub struct TestHarness {
    pub engine: Arc<InMemoryExecutionEngine>,
    pub store: Arc<InMemoryExecutionStore>,
    pub metrics: Arc<MockMetricsService>,
    pub ctx: FlowContext,
}

impl TestHarness {
    pub fn new(config: FlowConfig) -> Self {
        Self::with_engine(config, InMemoryExecutionEngine::new())
    }

    pub fn with_engine(config: FlowConfig, engine: InMemoryExecutionEngine) -> Self {
        let engine = Arc::new(engine);
        let store = Arc::new(InMemoryExecutionStore::new());
        let metrics = Arc::new(MockMetricsService::new());
        let ctx = FlowContext::new(config, engine.clone(), store.clone(), metrics.clone());

        Self {
            engine,
            store,
            metrics,
            ctx,
        }
    }
}

/// Wraps a payload the way the Lambda runtime delivers it, without a deadline
pub fn lambda_event(payload: Value) -> LambdaEvent<Value> {
    LambdaEvent::new(payload, Context::default())
}

/// Generate a unique invocation ID
pub fn generate_invocation_id() -> String {
    format!("test-{}", uuid::Uuid::new_v4())
}

