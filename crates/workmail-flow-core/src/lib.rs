/// WorkMail Flow Core - idempotent state machine dispatch for WorkMail message flow rules
///
/// This crate holds the models, service traits and the dispatch/poll loop shared by
/// the WorkMail message flow Lambda function.
pub mod constants;
pub mod error;
pub mod execution;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::FlowError;
pub use execution::{FlowOrchestrator, FlowOutcome};
pub use models::{FlowConfig, MessageSummary, RoutingDecision};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
