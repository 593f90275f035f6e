use anyhow::Result;
use signalhub_server::state::Config;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "signalhub_server=debug,tower_http=debug".into());
    let production = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");

    if production {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting Signalhub signaling server...");

    // Load configuration
    let config = Config::load()?;
    let bind_address = config.bind_address.clone();
    tracing::info!(
        "Environment: {}, allowed origins: {:?}",
        config.environment,
        config.allowed_origins
    );

    let (app, state) = signalhub_server::create_app(config).await?;
    signalhub_server::spawn_directory_sweeper(state.directory.clone(), SWEEP_PERIOD);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
