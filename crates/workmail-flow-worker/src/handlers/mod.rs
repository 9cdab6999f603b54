/// Lambda event handler for WorkMail synchronous run-Lambda rules
pub mod context;

pub use context::FlowContext;

use chrono::Utc;
use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};
use workmail_flow_core::error::FlowError;
use workmail_flow_core::MessageSummary;
use workmail_flow_core::utils::logging::safe_summary_context;

/// Main Lambda handler - returns the routing decision for one message summary
///
/// Errors are returned to the runtime so WorkMail retries the invocation; the
/// retry resolves the execution already started under the same invocation ID.
#[tracing::instrument(
    name = "handler",
    skip(ctx, event),
    fields(request_id = %event.context.request_id)
)]
pub async fn handler(ctx: &FlowContext, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let summary = MessageSummary::from_value(&event.payload).inspect_err(|e| {
        error!(error = %e, "Rejected message summary");
    })?;

    info!(
        invocation_id = %summary.invocation_id,
        summary = %safe_summary_context(&summary),
        "Received message summary"
    );

    let deadline = deadline_from_context(event.context.deadline, ctx.config.deadline_safety_margin);
    let input = event.payload.to_string();

    let outcome = ctx
        .orchestrator
        .run(&summary.invocation_id, &input, deadline)
        .await
        .inspect_err(|e| {
            error!(
                invocation_id = %summary.invocation_id,
                error = %e,
                retriable = e.is_retriable(),
                "Message flow failed"
            );
        })?;

    let response = serde_json::to_value(outcome.into_decision())
        .map_err(|e| FlowError::Lambda(format!("Failed to serialize routing decision: {}", e)))?;
    Ok(response)
}

/// Converts the runtime's epoch-millisecond deadline into a local instant,
/// keeping `margin` in reserve for returning the response
///
/// A zero deadline means the runtime did not provide one.
pub fn deadline_from_context(deadline_ms: u64, margin: Duration) -> Option<Instant> {
    if deadline_ms == 0 {
        return None;
    }

    let now_ms = Utc::now().timestamp_millis();
    let remaining_ms = (deadline_ms as i64).saturating_sub(now_ms).max(0) as u64;
    let usable = Duration::from_millis(remaining_ms).saturating_sub(margin);
    Some(Instant::now() + usable)
}
