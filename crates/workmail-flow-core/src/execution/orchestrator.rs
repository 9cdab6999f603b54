/// Dispatch-then-poll loop producing the routing decision for one invocation
use crate::error::FlowError;
use crate::execution::dispatcher::{Dispatched, Dispatcher};
use crate::execution::poller::{PollOutcome, ResultPoller};
use crate::models::{FlowConfig, RoutingDecision};
use crate::services::engine::ExecutionEngine;
use crate::services::execution_store::ExecutionStore;
use crate::services::metrics::{Metrics, MetricsService};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    DecisionFound(RoutingDecision),
    /// Poll budget or deadline exhausted; the execution keeps running on its own
    TimedOut,
    /// The execution terminated without producing a usable decision
    ExecutionClosed,
}

impl FlowOutcome {
    /// The decision to hand back to WorkMail, falling back to letting the message through
    pub fn into_decision(self) -> RoutingDecision {
        match self {
            Self::DecisionFound(decision) => decision,
            Self::TimedOut | Self::ExecutionClosed => RoutingDecision::allow_all(),
        }
    }

    pub fn is_default(&self) -> bool {
        !matches!(self, Self::DecisionFound(_))
    }
}

pub struct FlowOrchestrator {
    config: FlowConfig,
    dispatcher: Dispatcher,
    poller: ResultPoller,
    metrics: Arc<dyn MetricsService>,
}

impl FlowOrchestrator {
    pub fn new(
        config: FlowConfig,
        engine: Arc<dyn ExecutionEngine>,
        store: Arc<dyn ExecutionStore>,
        metrics: Arc<dyn MetricsService>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            engine.clone(),
            store,
            metrics.clone(),
            config.record_ttl,
        );
        let poller = ResultPoller::new(engine, metrics.clone(), config.output_validation);

        Self {
            config,
            dispatcher,
            poller,
            metrics,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Runs one invocation to a decision, a timeout or a closed execution
    ///
    /// No wait is started that would end past `deadline`.
    #[tracing::instrument(name = "orchestrator.run", skip(self, input, deadline))]
    pub async fn run(
        &self,
        invocation_id: &str,
        input: &str,
        deadline: Option<Instant>,
    ) -> Result<FlowOutcome, FlowError> {
        let started_at = Instant::now();

        let dispatched = self
            .dispatcher
            .dispatch(invocation_id, &self.config.state_machine_arn, input)
            .await?;
        let state = match &dispatched {
            Dispatched::Started(_) => "STARTED",
            Dispatched::ExistsResolved(_) => "EXISTS_RESOLVED",
        };
        info!(
            state = state,
            execution_arn = dispatched.handle().arn(),
            "Execution handle obtained, polling"
        );

        let handle = dispatched.handle();
        let checkpoint = self.config.checkpoint_state.as_deref();
        let poll = &self.config.poll;

        if wait_within(poll.initial_wait, deadline).await {
            let mut retries = 0;

            loop {
                match self.poller.poll(handle, checkpoint).await? {
                    PollOutcome::Decision(decision) => {
                        let source = if checkpoint.is_some() {
                            "Checkpoint"
                        } else {
                            "Execution"
                        };
                        info!(
                            state = "DECISION_FOUND",
                            source = source,
                            polls = retries + 1,
                            actions = decision.actions.len(),
                            "Routing decision found"
                        );
                        Metrics::decision_returned(
                            self.metrics.as_ref(),
                            source,
                            elapsed_ms(started_at),
                        )
                        .await;
                        return Ok(FlowOutcome::DecisionFound(decision));
                    }
                    PollOutcome::Closed => {
                        warn!(
                            state = "EXECUTION_CLOSED",
                            "Execution ended without a usable routing decision, using default action"
                        );
                        Metrics::default_decision(
                            self.metrics.as_ref(),
                            "ExecutionClosed",
                            elapsed_ms(started_at),
                        )
                        .await;
                        return Ok(FlowOutcome::ExecutionClosed);
                    }
                    PollOutcome::Pending | PollOutcome::Invalid => {}
                }

                if retries >= poll.max_retries || !wait_within(poll.next_delay(), deadline).await
                {
                    break;
                }
                retries += 1;
            }
        }

        warn!(
            state = "TIMED_OUT",
            elapsed_ms = elapsed_ms(started_at),
            "Unable to retrieve output from the state machine, using default action"
        );
        Metrics::default_decision(self.metrics.as_ref(), "Timeout", elapsed_ms(started_at)).await;
        Ok(FlowOutcome::TimedOut)
    }
}

/// Sleeps for `delay` unless doing so would reach the deadline
async fn wait_within(delay: Duration, deadline: Option<Instant>) -> bool {
    if let Some(deadline) = deadline
        && Instant::now() + delay >= deadline
    {
        return false;
    }

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    true
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_millis() as f64
}
