/// AWS service clients and infrastructure services
pub mod config;
pub mod engine;
pub mod execution_store;
pub mod metrics;

// Re-export service traits
pub use config::EnvConfigProvider;
pub use engine::ExecutionEngine;
pub use execution_store::ExecutionStore;
pub use metrics::MetricsService;
