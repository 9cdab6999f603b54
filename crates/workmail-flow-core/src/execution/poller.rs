/// Reads a routing decision out of an execution's history
use crate::error::FlowError;
use crate::models::{
    ExecutionHandle, HistoryEvent, HistoryEventKind, OutputValidation, RoutingDecision,
};
use crate::services::engine::ExecutionEngine;
use crate::services::metrics::{Metrics, MetricsService};
use crate::utils::logging::redact_email;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Decision(RoutingDecision),
    /// No matching event yet
    Pending,
    /// Matching events exist but none carried a valid decision
    Invalid,
    /// The execution has terminated without a usable decision
    Closed,
}

pub struct ResultPoller {
    engine: Arc<dyn ExecutionEngine>,
    metrics: Arc<dyn MetricsService>,
    validation: OutputValidation,
}

impl ResultPoller {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        metrics: Arc<dyn MetricsService>,
        validation: OutputValidation,
    ) -> Self {
        Self {
            engine,
            metrics,
            validation,
        }
    }

    /// Fetches the full history and scans it for the awaited output
    ///
    /// With a checkpoint, the output of that state's exit is used even while the
    /// execution is still running; without one, only `ExecutionSucceeded` counts.
    pub async fn poll(
        &self,
        execution: &ExecutionHandle,
        checkpoint: Option<&str>,
    ) -> Result<PollOutcome, FlowError> {
        let events = self.engine.get_execution_history(execution).await?;
        let (outcome, skipped) = scan(&events, checkpoint, self.validation);

        if skipped > 0 {
            Metrics::malformed_output(self.metrics.as_ref()).await;
        }

        debug!(
            execution_arn = execution.arn(),
            events = events.len(),
            outcome = outcome_label(&outcome),
            "Polled execution history"
        );
        Ok(outcome)
    }
}

/// Scans events oldest first; the first valid matching output wins
pub fn scan_history(
    events: &[HistoryEvent],
    checkpoint: Option<&str>,
    validation: OutputValidation,
) -> PollOutcome {
    scan(events, checkpoint, validation).0
}

/// Outcome plus the number of matching outputs skipped as malformed
fn scan(
    events: &[HistoryEvent],
    checkpoint: Option<&str>,
    validation: OutputValidation,
) -> (PollOutcome, usize) {
    let mut skipped = 0;
    let mut closed = false;

    for event in events {
        let output = match (&event.kind, checkpoint) {
            (HistoryEventKind::StateExited { name, output }, Some(state)) if name == state => {
                output.as_deref()
            }
            (HistoryEventKind::ExecutionSucceeded { output }, None) => {
                closed = true;
                output.as_deref()
            }
            (kind, _) => {
                closed |= kind.is_terminal();
                continue;
            }
        };

        match output.map(|raw| RoutingDecision::parse(raw, validation)) {
            Some(Ok(decision)) => return (PollOutcome::Decision(decision), skipped),
            Some(Err(e)) => {
                warn!(
                    event_id = event.id,
                    error = %redact_email(&e.to_string()),
                    "Skipping output that is not a valid routing decision"
                );
                skipped += 1;
            }
            None => {
                warn!(event_id = event.id, "Skipping matching event without output");
                skipped += 1;
            }
        }
    }

    let outcome = if closed {
        PollOutcome::Closed
    } else if skipped > 0 {
        PollOutcome::Invalid
    } else {
        PollOutcome::Pending
    };
    (outcome, skipped)
}

fn outcome_label(outcome: &PollOutcome) -> &'static str {
    match outcome {
        PollOutcome::Decision(_) => "decision",
        PollOutcome::Pending => "pending",
        PollOutcome::Invalid => "invalid",
        PollOutcome::Closed => "closed",
    }
}
