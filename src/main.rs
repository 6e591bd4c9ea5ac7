use moodflix_api::{
    api::{create_router, AppState},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::from_env()?;

    if let Some(e) = config.classifier_credential_error() {
        tracing::error!(
            ai_mode = %config.ai_mode,
            error = %e,
            "Classifier misconfigured, every request will use the static mapping"
        );
    }
    if config.tmdb_key().is_none() {
        tracing::error!("TMDB_API_KEY not configured, every request will use the synthetic fallback");
    }

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app).await?;

    Ok(())
}
