/// Handler context - AWS clients and the orchestrator, built once per cold start
use std::sync::Arc;
use workmail_flow_core::error::FlowError;
use workmail_flow_core::execution::FlowOrchestrator;
use workmail_flow_core::models::FlowConfig;
use workmail_flow_core::services::config::EnvConfigProvider;
use workmail_flow_core::services::engine::{ExecutionEngine, StepFunctionsEngine};
use workmail_flow_core::services::execution_store::{DynamoDbExecutionStore, ExecutionStore};
use workmail_flow_core::services::metrics::{CloudWatchMetricsService, MetricsService};

pub struct FlowContext {
    pub config: FlowConfig,
    pub orchestrator: FlowOrchestrator,
}

impl FlowContext {
    pub async fn from_env() -> Result<Self, FlowError> {
        let config = EnvConfigProvider::new()?.into_config();
        let aws_config = aws_config::load_from_env().await;

        let sfn_client = aws_sdk_sfn::Client::new(&aws_config);
        let dynamodb_client = aws_sdk_dynamodb::Client::new(&aws_config);
        let cloudwatch_client = aws_sdk_cloudwatch::Client::new(&aws_config);

        let store = DynamoDbExecutionStore::new(dynamodb_client, config.executions_table.clone());
        let metrics = CloudWatchMetricsService::with_namespace(
            cloudwatch_client,
            config.metrics_namespace.clone(),
        );

        Ok(Self::new(
            config,
            Arc::new(StepFunctionsEngine::new(sfn_client)),
            Arc::new(store),
            Arc::new(metrics),
        ))
    }

    pub fn new(
        config: FlowConfig,
        engine: Arc<dyn ExecutionEngine>,
        store: Arc<dyn ExecutionStore>,
        metrics: Arc<dyn MetricsService>,
    ) -> Self {
        let orchestrator = FlowOrchestrator::new(config.clone(), engine, store, metrics);
        Self {
            config,
            orchestrator,
        }
    }
}
