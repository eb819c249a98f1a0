use change_feed::config::ServiceConfig;
use change_feed::router::create_router;
use change_feed::state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        version = change_feed::SERVICE_VERSION,
        log_capacity = config.feed.log_capacity,
        mailbox_capacity = config.feed.mailbox_capacity,
        heartbeat_secs = config.feed.heartbeat_interval.as_secs(),
        "Starting change feed service"
    );

    let state = AppState::with_demo_home(config.feed.clone());
    let app = create_router(state);

    // Bind and serve
    let listener = TcpListener::bind(config.bind_addr).await?;

    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
