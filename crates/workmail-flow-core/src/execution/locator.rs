/// Resolves an invocation id to the execution started for it
use crate::error::FlowError;
use crate::models::ExecutionHandle;
use crate::services::execution_store::ExecutionStore;
use crate::services::engine::ExecutionEngine;
use crate::services::metrics::{Metrics, MetricsService};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// Found in the execution store
    Indexed(ExecutionHandle),
    /// Found by scanning the engine's execution listing
    Scanned(ExecutionHandle),
    NotFound,
}

impl Located {
    pub fn into_handle(self) -> Option<ExecutionHandle> {
        match self {
            Self::Indexed(handle) | Self::Scanned(handle) => Some(handle),
            Self::NotFound => None,
        }
    }
}

pub struct ExecutionLocator {
    store: Arc<dyn ExecutionStore>,
    engine: Arc<dyn ExecutionEngine>,
    metrics: Arc<dyn MetricsService>,
}

impl ExecutionLocator {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        engine: Arc<dyn ExecutionEngine>,
        metrics: Arc<dyn MetricsService>,
    ) -> Self {
        Self {
            store,
            engine,
            metrics,
        }
    }

    /// Store lookup first; a paginated listing scan only when the record is gone
    #[tracing::instrument(name = "locator.locate", skip(self))]
    pub async fn locate(
        &self,
        invocation_id: &str,
        state_machine_arn: &str,
    ) -> Result<Located, FlowError> {
        if let Some(handle) = self
            .store
            .lookup(invocation_id)
            .await?
            .and_then(|record| record.handle())
        {
            debug!(execution_arn = handle.arn(), "Execution resolved from store");
            return Ok(Located::Indexed(handle));
        }

        warn!("No execution record, scanning execution listing");
        let mut next_token = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .engine
                .list_executions(state_machine_arn, next_token)
                .await?;
            pages += 1;

            if let Some(found) = page
                .executions
                .into_iter()
                .find(|execution| execution.name == invocation_id)
            {
                info!(
                    execution_arn = found.handle.arn(),
                    pages = pages,
                    "Execution resolved by listing scan"
                );
                Metrics::locator_fallback_scan(self.metrics.as_ref(), pages).await;
                return Ok(Located::Scanned(found.handle));
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        warn!(pages = pages, "Execution listing exhausted without a match");
        Metrics::locator_fallback_scan(self.metrics.as_ref(), pages).await;
        Ok(Located::NotFound)
    }
}
