/// Starts one execution per invocation id
use crate::constants::LOG_TARGET_DISPATCH;
use crate::error::FlowError;
use crate::execution::locator::{ExecutionLocator, Located};
use crate::models::{ExecutionHandle, StartOutcome};
use crate::services::engine::ExecutionEngine;
use crate::services::execution_store::ExecutionStore;
use crate::services::metrics::{Metrics, MetricsService};
use crate::utils::validation::validate_execution_name;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How the execution handle for an invocation was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Started(ExecutionHandle),
    /// The start collided with an earlier execution of the same name
    ExistsResolved(ExecutionHandle),
}

impl Dispatched {
    pub fn handle(&self) -> &ExecutionHandle {
        match self {
            Self::Started(handle) | Self::ExistsResolved(handle) => handle,
        }
    }
}

pub struct Dispatcher {
    engine: Arc<dyn ExecutionEngine>,
    store: Arc<dyn ExecutionStore>,
    locator: ExecutionLocator,
    metrics: Arc<dyn MetricsService>,
    record_ttl: Duration,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<dyn ExecutionEngine>,
        store: Arc<dyn ExecutionStore>,
        metrics: Arc<dyn MetricsService>,
        record_ttl: Duration,
    ) -> Self {
        let locator = ExecutionLocator::new(store.clone(), engine.clone(), metrics.clone());
        Self {
            engine,
            store,
            locator,
            metrics,
            record_ttl,
        }
    }

    /// Starts the execution named `invocation_id`, or resolves the one already started
    ///
    /// The engine's name uniqueness is the authority; the store only speeds up
    /// resolution of retries.
    #[tracing::instrument(name = "dispatcher.dispatch", skip(self, input))]
    pub async fn dispatch(
        &self,
        invocation_id: &str,
        state_machine_arn: &str,
        input: &str,
    ) -> Result<Dispatched, FlowError> {
        validate_execution_name(invocation_id)?;

        match self
            .engine
            .start_execution(state_machine_arn, invocation_id, input)
            .await?
        {
            StartOutcome::Started(handle) => {
                self.store
                    .record(invocation_id, &handle, self.record_ttl)
                    .await?;
                info!(
                    target: LOG_TARGET_DISPATCH,
                    execution_arn = handle.arn(),
                    "Started new execution"
                );
                Metrics::execution_started(self.metrics.as_ref()).await;
                Ok(Dispatched::Started(handle))
            }
            StartOutcome::AlreadyExists => {
                info!(
                    target: LOG_TARGET_DISPATCH,
                    "Execution already exists, resolving existing handle"
                );

                let (handle, source) = match self
                    .locator
                    .locate(invocation_id, state_machine_arn)
                    .await?
                {
                    Located::Indexed(handle) => (handle, "Store"),
                    Located::Scanned(handle) => (handle, "Scan"),
                    Located::NotFound => {
                        return Err(FlowError::LocatorExhausted(invocation_id.to_string()));
                    }
                };

                Metrics::duplicate_start_resolved(self.metrics.as_ref(), source).await;
                Ok(Dispatched::ExistsResolved(handle))
            }
        }
    }
}
