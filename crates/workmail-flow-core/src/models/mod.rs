pub mod config;
/// Data models for the WorkMail flow system
pub mod decision;
pub mod execution;
pub mod summary;

// Re-export commonly used types
pub use config::*;
pub use decision::*;
pub use execution::*;
pub use summary::*;
