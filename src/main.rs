use jenkins_bridge::{router, store, AppConfig, AppState};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jenkins_bridge=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Jenkins bridge");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    info!("Configuration loaded");

    // Connect the correlation store
    let conn = store::connect(&config.redis_url)
        .await
        .expect("Failed to connect to correlation store");

    // Create app state
    let state = AppState::new(conn, config.clone());

    // Build router
    let app = router::build(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT");
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
