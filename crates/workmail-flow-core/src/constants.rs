/// Application constants
///
/// Defaults for every tunable in `FlowConfig` live here, next to the fixed
/// limits imposed by Step Functions and DynamoDB.
// ============================================================================
// Execution Record Constants
// ============================================================================
/// Execution record TTL in seconds (240 minutes, the longest a WorkMail retry can arrive)
pub const DEFAULT_EXECUTION_RECORD_TTL_SECONDS: u64 = 4 * 60 * 60;

/// Partition key of the execution record table
pub const RECORD_KEY_ATTRIBUTE: &str = "invocationId";

/// Attribute holding the execution ARN
pub const RECORD_EXECUTION_ARN_ATTRIBUTE: &str = "executionArn";

/// Attribute holding the creation timestamp (epoch seconds)
pub const RECORD_CREATED_AT_ATTRIBUTE: &str = "createdAt";

/// DynamoDB TTL attribute (epoch seconds)
pub const RECORD_TTL_ATTRIBUTE: &str = "ttl";

// ============================================================================
// Polling Constants
// ============================================================================

/// Wait before the first history poll in milliseconds
pub const DEFAULT_POLL_INITIAL_WAIT_MS: u64 = 1000;

/// Wait between history polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Number of polls after the first one
pub const DEFAULT_POLL_MAX_RETRIES: u32 = 10;

/// Jitter factor applied to the poll interval (0.0 to 1.0)
pub const POLL_JITTER_FACTOR: f64 = 0.1;

/// Time kept in reserve before the Lambda deadline in milliseconds
pub const DEFAULT_DEADLINE_SAFETY_MARGIN_MS: u64 = 1500;

// ============================================================================
// Step Functions Limits
// ============================================================================

/// Maximum execution name length
pub const MAX_EXECUTION_NAME_LENGTH: usize = 80;

/// Page size for ListExecutions
pub const LIST_EXECUTIONS_PAGE_SIZE: i32 = 1000;

/// Page size for GetExecutionHistory
pub const HISTORY_PAGE_SIZE: i32 = 1000;

// ============================================================================
// Logging & Monitoring
// ============================================================================

/// Metric namespace for CloudWatch
pub const DEFAULT_METRICS_NAMESPACE: &str = "WorkMailMessageFlow";

/// Log target for metrics
pub const LOG_TARGET_METRICS: &str = "metrics";

/// Log target for dispatch decisions
pub const LOG_TARGET_DISPATCH: &str = "dispatch";

// ============================================================================
// Testing Constants
// ============================================================================
