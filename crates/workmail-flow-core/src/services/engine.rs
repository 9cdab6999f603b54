/// Step Functions execution engine
use crate::constants::{HISTORY_PAGE_SIZE, LIST_EXECUTIONS_PAGE_SIZE};
use crate::error::FlowError;
use crate::models::{
    ExecutionHandle, ExecutionPage, ExecutionSummary, HistoryEvent, HistoryEventKind,
    StartOutcome,
};
use async_trait::async_trait;
use aws_sdk_sfn::error::SdkError;
use aws_sdk_sfn::operation::start_execution::StartExecutionError;
use aws_sdk_sfn::types::{HistoryEvent as SfnHistoryEvent, HistoryEventType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Start an execution named `name`
    ///
    /// Reports a name collision as `StartOutcome::AlreadyExists` rather than an error
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: &str,
    ) -> Result<StartOutcome, FlowError>;

    /// One page of executions, newest first
    async fn list_executions(
        &self,
        state_machine_arn: &str,
        next_token: Option<String>,
    ) -> Result<ExecutionPage, FlowError>;

    /// Full execution history, oldest first
    async fn get_execution_history(
        &self,
        execution: &ExecutionHandle,
    ) -> Result<Vec<HistoryEvent>, FlowError>;
}

/// Step Functions engine implementation
pub struct StepFunctionsEngine {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsEngine {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExecutionEngine for StepFunctionsEngine {
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: &str,
    ) -> Result<StartOutcome, FlowError> {
        let result = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .name(name)
            .input(input)
            .send()
            .await;

        match result {
            Ok(output) => {
                debug!(
                    execution_arn = output.execution_arn(),
                    "Started state machine execution"
                );
                Ok(StartOutcome::Started(ExecutionHandle::new(
                    output.execution_arn(),
                )))
            }
            Err(SdkError::ServiceError(err)) => match err.into_err() {
                StartExecutionError::ExecutionAlreadyExists(_) => Ok(StartOutcome::AlreadyExists),
                err => Err(FlowError::Engine(format!("StartExecution failed: {}", err))),
            },
            Err(e) => Err(FlowError::Engine(format!("StartExecution failed: {}", e))),
        }
    }

    async fn list_executions(
        &self,
        state_machine_arn: &str,
        next_token: Option<String>,
    ) -> Result<ExecutionPage, FlowError> {
        let output = self
            .client
            .list_executions()
            .state_machine_arn(state_machine_arn)
            .max_results(LIST_EXECUTIONS_PAGE_SIZE)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| FlowError::Engine(format!("ListExecutions failed: {}", e)))?;

        let executions = output
            .executions()
            .iter()
            .map(|item| ExecutionSummary {
                name: item.name().to_string(),
                handle: ExecutionHandle::new(item.execution_arn()),
            })
            .collect();

        Ok(ExecutionPage {
            executions,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn get_execution_history(
        &self,
        execution: &ExecutionHandle,
    ) -> Result<Vec<HistoryEvent>, FlowError> {
        let mut events = Vec::new();
        let mut next_token = None;

        loop {
            let output = self
                .client
                .get_execution_history()
                .execution_arn(execution.arn())
                .max_results(HISTORY_PAGE_SIZE)
                .include_execution_data(true)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| FlowError::Engine(format!("GetExecutionHistory failed: {}", e)))?;

            events.extend(output.events().iter().map(convert_history_event));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(
            execution_arn = execution.arn(),
            events = events.len(),
            "Fetched execution history"
        );
        Ok(events)
    }
}

fn convert_history_event(event: &SfnHistoryEvent) -> HistoryEvent {
    // Every *StateExited type carries the same details shape
    let kind = if let Some(details) = event.state_exited_event_details() {
        HistoryEventKind::StateExited {
            name: details.name().to_string(),
            output: details.output().map(str::to_string),
        }
    } else {
        match event.r#type() {
            HistoryEventType::ExecutionSucceeded => HistoryEventKind::ExecutionSucceeded {
                output: event
                    .execution_succeeded_event_details()
                    .and_then(|details| details.output())
                    .map(str::to_string),
            },
            HistoryEventType::ExecutionFailed => HistoryEventKind::ExecutionFailed,
            HistoryEventType::ExecutionAborted => HistoryEventKind::ExecutionAborted,
            HistoryEventType::ExecutionTimedOut => HistoryEventKind::ExecutionTimedOut,
            other => HistoryEventKind::Other(other.as_str().to_string()),
        }
    };

    HistoryEvent {
        id: event.id(),
        kind,
    }
}

/// In-memory engine for testing and local runs
///
/// Enforces name uniqueness per state machine, lists newest first in pages of
/// `page_size`, and can hold back history events until a given history fetch.
pub struct InMemoryExecutionEngine {
    state: Mutex<EngineState>,
    page_size: usize,
    start_calls: AtomicUsize,
    list_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

#[derive(Default)]
struct EngineState {
    executions: Vec<StoredExecution>,
    start_failure: Option<String>,
}

struct StoredExecution {
    state_machine_arn: String,
    name: String,
    handle: ExecutionHandle,
    input: String,
    events: Vec<HistoryEvent>,
    /// (visible from this history fetch onward, event)
    scheduled: Vec<(usize, HistoryEventKind)>,
    history_reads: usize,
}

impl StoredExecution {
    fn push_event(&mut self, kind: HistoryEventKind) {
        let id = self.events.len() as i64 + 1;
        self.events.push(HistoryEvent { id, kind });
    }
}

impl InMemoryExecutionEngine {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            page_size: page_size.max(1),
            start_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    /// Handle the engine assigns to an execution named `name`
    pub fn handle_for(name: &str) -> ExecutionHandle {
        ExecutionHandle::new(format!("arn:exec:{}", name))
    }

    /// Registers an execution as if it had been started earlier
    pub fn seed_execution(&self, state_machine_arn: &str, name: &str) -> ExecutionHandle {
        let mut state = self.state();
        insert_execution(&mut state, state_machine_arn, name, "{}")
    }

    /// Appends an event to the execution's history right away
    pub fn append_event(&self, name: &str, kind: HistoryEventKind) {
        let mut state = self.state();
        if let Some(execution) = state.executions.iter_mut().find(|e| e.name == name) {
            execution.push_event(kind);
        }
    }

    /// Appends an event once the execution's history has been fetched `from_read` times
    pub fn schedule_event(&self, name: &str, from_read: usize, kind: HistoryEventKind) {
        let mut state = self.state();
        if let Some(execution) = state.executions.iter_mut().find(|e| e.name == name) {
            execution.scheduled.push((from_read, kind));
        }
    }

    /// Makes every subsequent start fail with an engine error
    pub fn fail_starts(&self, message: &str) {
        self.state().start_failure = Some(message.to_string());
    }

    pub fn input_of(&self, name: &str) -> Option<String> {
        self.state()
            .executions
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.input.clone())
    }

    pub fn execution_count(&self) -> usize {
        self.state().executions.len()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_execution(
    state: &mut EngineState,
    state_machine_arn: &str,
    name: &str,
    input: &str,
) -> ExecutionHandle {
    let handle = InMemoryExecutionEngine::handle_for(name);
    let mut execution = StoredExecution {
        state_machine_arn: state_machine_arn.to_string(),
        name: name.to_string(),
        handle: handle.clone(),
        input: input.to_string(),
        events: Vec::new(),
        scheduled: Vec::new(),
        history_reads: 0,
    };
    execution.push_event(HistoryEventKind::Other("ExecutionStarted".to_string()));
    state.executions.push(execution);
    handle
}

#[async_trait]
impl ExecutionEngine for InMemoryExecutionEngine {
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: &str,
    ) -> Result<StartOutcome, FlowError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();

        if let Some(message) = &state.start_failure {
            return Err(FlowError::Engine(format!(
                "StartExecution failed: {}",
                message
            )));
        }

        let exists = state
            .executions
            .iter()
            .any(|e| e.state_machine_arn == state_machine_arn && e.name == name);
        if exists {
            return Ok(StartOutcome::AlreadyExists);
        }

        Ok(StartOutcome::Started(insert_execution(
            &mut state,
            state_machine_arn,
            name,
            input,
        )))
    }

    async fn list_executions(
        &self,
        state_machine_arn: &str,
        next_token: Option<String>,
    ) -> Result<ExecutionPage, FlowError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| FlowError::Engine(format!("Invalid pagination token: {}", token)))?,
            None => 0,
        };

        let state = self.state();
        let matching: Vec<ExecutionSummary> = state
            .executions
            .iter()
            .rev()
            .filter(|e| e.state_machine_arn == state_machine_arn)
            .map(|e| ExecutionSummary {
                name: e.name.clone(),
                handle: e.handle.clone(),
            })
            .collect();

        let end = (offset + self.page_size).min(matching.len());
        let executions = matching.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(ExecutionPage {
            executions,
            next_token,
        })
    }

    async fn get_execution_history(
        &self,
        execution: &ExecutionHandle,
    ) -> Result<Vec<HistoryEvent>, FlowError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();

        let stored = state
            .executions
            .iter_mut()
            .find(|e| &e.handle == execution)
            .ok_or_else(|| {
                FlowError::Engine(format!("ExecutionDoesNotExist: {}", execution.arn()))
            })?;

        stored.history_reads += 1;
        let reads = stored.history_reads;
        let (due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut stored.scheduled)
            .into_iter()
            .partition(|(from_read, _)| *from_read <= reads);
        stored.scheduled = later;
        for (_, kind) in due {
            stored.push_event(kind);
        }

        Ok(stored.events.clone())
    }
}
