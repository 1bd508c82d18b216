pub mod api;
pub mod config;
pub mod pipeline;
pub mod summary_view;
pub mod wizard;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_gateway_server_on, ApiContext, ServerError};
use crate::config::{ConfigError, EnvCredentials, GatewayConfig};
use crate::pipeline::summary::{GeminiClient, SummaryError, SummaryPipeline};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Cannot create Gemini client: {0}")]
    Client(#[from] SummaryError),
    #[error("Cannot start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
}

pub fn run() -> Result<(), StartupError> {
    // Optional .env next to the binary; real environment wins.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} gateway starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        api_base = %config.api_base_url,
        model = %config.default_model,
        timeout_secs = config.timeout_secs,
        "Configuration loaded"
    );

    // The blocking client must be built and dropped outside the runtime.
    let client = GeminiClient::new(&config.api_base_url, config.timeout_secs)?;
    let pipeline = Arc::new(SummaryPipeline::new(
        Box::new(client),
        Box::new(EnvCredentials),
        &config.default_model,
    ));
    if !pipeline.credential_configured() {
        tracing::warn!(
            var = config::API_KEY_VAR,
            "Credential not set, model calls will fail until it is"
        );
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let ctx = ApiContext::new(pipeline.clone());
    let served = runtime.block_on(async move {
        let server = start_gateway_server_on(ctx, config.bind_addr).await?;
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
        }
        server.stop().await;
        Ok::<(), StartupError>(())
    });

    drop(runtime);
    drop(pipeline);
    served
}
