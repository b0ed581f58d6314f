use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ae_dashboard::app::build_app;
use ae_dashboard::infrastructure::config::{Config, LogFormat};
use ae_dashboard::infrastructure::http::start_http_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting AE Dashboard on {}:{}",
        config.host,
        config.port
    );
    tracing::info!(
        environment = ?config.environment,
        salesforce_oauth = config.salesforce.oauth_configured(),
        password_fallback = config.salesforce.password_credentials().is_some(),
        azure_gate = config.azure.is_some(),
        token_dir = %config.tokens.dir.display(),
        cache_ttl_secs = config.dashboard.cache_ttl_secs,
        "Configuration loaded"
    );

    let config = Arc::new(config);
    let app = build_app(config.clone())?;

    start_http_server(config, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))?;

    Ok(())
}

fn init_logging(config: &Config) {
    let default_filter = if config.is_development() {
        "ae_dashboard=debug,tower_http=debug"
    } else {
        "ae_dashboard=info,tower_http=info"
    };

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
