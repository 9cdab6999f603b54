/// Idempotent state machine dispatch: start, locate, poll
pub mod dispatcher;
pub mod locator;
pub mod orchestrator;
pub mod poller;

pub use dispatcher::{Dispatched, Dispatcher};
pub use locator::{ExecutionLocator, Located};
pub use orchestrator::{FlowOrchestrator, FlowOutcome};
pub use poller::{PollOutcome, ResultPoller};
