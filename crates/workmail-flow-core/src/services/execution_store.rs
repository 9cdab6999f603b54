/// Execution record store - maps invocation ids to started executions
use crate::constants::{
    RECORD_CREATED_AT_ATTRIBUTE, RECORD_EXECUTION_ARN_ATTRIBUTE, RECORD_KEY_ATTRIBUTE,
    RECORD_TTL_ATTRIBUTE,
};
use crate::error::FlowError;
use crate::models::{ExecutionHandle, ExecutionRecord};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Look up the execution recorded for an invocation
    ///
    /// Returns None when no record exists. A record past its TTL may still be
    /// returned until the backend purges it.
    async fn lookup(&self, invocation_id: &str) -> Result<Option<ExecutionRecord>, FlowError>;

    /// Record the execution started for an invocation
    ///
    /// Stores the mapping with TTL so retries can find it without listing executions
    async fn record(
        &self,
        invocation_id: &str,
        execution: &ExecutionHandle,
        ttl: Duration,
    ) -> Result<(), FlowError>;
}

/// DynamoDB-backed execution store
pub struct DynamoDbExecutionStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoDbExecutionStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl ExecutionStore for DynamoDbExecutionStore {
    async fn lookup(&self, invocation_id: &str) -> Result<Option<ExecutionRecord>, FlowError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(
                RECORD_KEY_ATTRIBUTE,
                AttributeValue::S(invocation_id.to_string()),
            )
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| FlowError::Store(format!("DynamoDB get_item failed: {}", e)))?;

        let Some(item) = result.item() else {
            return Ok(None);
        };

        let execution_arn = item
            .get(RECORD_EXECUTION_ARN_ATTRIBUTE)
            .and_then(|value| value.as_s().ok())
            .cloned()
            .unwrap_or_default();
        let expires_at = item
            .get(RECORD_TTL_ATTRIBUTE)
            .and_then(|value| value.as_n().ok())
            .and_then(|n| n.parse::<i64>().ok())
            .unwrap_or_default();

        debug!(
            invocation_id = invocation_id,
            execution_arn = %execution_arn,
            "Found execution record"
        );

        // DynamoDB deletes expired items lazily; the ARN stays valid, so the row is still used
        Ok(Some(ExecutionRecord {
            invocation_id: invocation_id.to_string(),
            execution_arn,
            expires_at,
        }))
    }

    async fn record(
        &self,
        invocation_id: &str,
        execution: &ExecutionHandle,
        ttl: Duration,
    ) -> Result<(), FlowError> {
        let now = Utc::now().timestamp();
        let expiration = now + ttl.as_secs() as i64;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item(
                RECORD_KEY_ATTRIBUTE,
                AttributeValue::S(invocation_id.to_string()),
            )
            .item(
                RECORD_EXECUTION_ARN_ATTRIBUTE,
                AttributeValue::S(execution.arn().to_string()),
            )
            .item(RECORD_CREATED_AT_ATTRIBUTE, AttributeValue::N(now.to_string()))
            .item(RECORD_TTL_ATTRIBUTE, AttributeValue::N(expiration.to_string()))
            .send()
            .await
            .map_err(|e| FlowError::Store(format!("DynamoDB put_item failed: {}", e)))?;

        info!(
            invocation_id = invocation_id,
            execution_arn = execution.arn(),
            ttl_seconds = ttl.as_secs(),
            "Recorded execution"
        );

        Ok(())
    }
}

/// In-memory execution store for testing
pub struct InMemoryExecutionStore {
    store: tokio::sync::Mutex<HashMap<String, ExecutionRecord>>,
    lookups: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self {
            store: tokio::sync::Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Pushes a record's expiry into the past, as if its TTL had elapsed
    pub async fn expire(&self, invocation_id: &str) {
        if let Some(record) = self.store.lock().await.get_mut(invocation_id) {
            record.expires_at = Utc::now().timestamp() - 1;
        }
    }

    /// Drops a record, as if its write had never landed
    pub async fn remove(&self, invocation_id: &str) {
        self.store.lock().await.remove(invocation_id);
    }

    /// Stores a record directly, bypassing the write counter
    pub async fn insert(&self, record: ExecutionRecord) {
        self.store
            .lock()
            .await
            .insert(record.invocation_id.clone(), record);
    }

    pub async fn get(&self, invocation_id: &str) -> Option<ExecutionRecord> {
        self.store.lock().await.get(invocation_id).cloned()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn lookup(&self, invocation_id: &str) -> Result<Option<ExecutionRecord>, FlowError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let store = self.store.lock().await;
        let now = Utc::now().timestamp();

        Ok(store
            .get(invocation_id)
            .filter(|record| record.expires_at > now)
            .cloned())
    }

    async fn record(
        &self,
        invocation_id: &str,
        execution: &ExecutionHandle,
        ttl: Duration,
    ) -> Result<(), FlowError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut store = self.store.lock().await;
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        store.insert(
            invocation_id.to_string(),
            ExecutionRecord {
                invocation_id: invocation_id.to_string(),
                execution_arn: execution.arn().to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}
