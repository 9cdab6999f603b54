/// WorkMail message flow worker - synchronous rules Lambda
///
/// Hands each message summary to a Step Functions state machine and returns its
/// routing decision to WorkMail.
pub mod handlers;

// Re-export commonly used items
pub use handlers::{FlowContext, handler};
pub use workmail_flow_core::*;
