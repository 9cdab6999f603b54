/// Execution models shared by the engine, the store and the dispatch loop
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a started state machine execution (its ARN)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExecutionHandle(String);

impl ExecutionHandle {
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    pub fn arn(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted mapping from invocation id to execution, expiring at `expires_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub invocation_id: String,
    pub execution_arn: String,
    /// Epoch seconds
    pub expires_at: i64,
}

impl ExecutionRecord {
    /// Handle for a usable record; empty ARNs are treated as absent
    pub fn handle(&self) -> Option<ExecutionHandle> {
        if self.execution_arn.is_empty() {
            None
        } else {
            Some(ExecutionHandle::new(self.execution_arn.clone()))
        }
    }
}

/// Result of asking the engine to start a named execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started(ExecutionHandle),
    /// An execution with the requested name already exists
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub name: String,
    pub handle: ExecutionHandle,
}

/// One page of the engine's execution listing
#[derive(Debug, Clone, Default)]
pub struct ExecutionPage {
    pub executions: Vec<ExecutionSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub id: i64,
    pub kind: HistoryEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEventKind {
    /// Any `*StateExited` event
    StateExited {
        name: String,
        output: Option<String>,
    },
    ExecutionSucceeded {
        output: Option<String>,
    },
    ExecutionFailed,
    ExecutionAborted,
    ExecutionTimedOut,
    Other(String),
}

impl HistoryEventKind {
    /// True once the execution can produce no further events
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionSucceeded { .. }
                | Self::ExecutionFailed
                | Self::ExecutionAborted
                | Self::ExecutionTimedOut
        )
    }
}
