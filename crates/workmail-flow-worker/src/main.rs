use lambda_runtime::{Error, run, service_fn};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use workmail_flow_worker::{FlowContext, handler};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing subscriber for structured logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,aws_config=warn,aws_smithy_runtime=warn,aws_sdk_sfn=warn")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!(
        version = workmail_flow_worker::VERSION,
        "Starting WorkMail message flow Lambda function"
    );

    // Clients and configuration live for the whole container
    let ctx = Arc::new(FlowContext::from_env().await?);

    run(service_fn(move |event| {
        let ctx = ctx.clone();
        async move { handler(&ctx, event).await }
    }))
    .await
}
