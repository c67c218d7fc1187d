use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vm_dashboard::api::create_router;
use vm_dashboard::config::Config;
use vm_dashboard::store::{seed, InstanceStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vm_dashboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded: {:?}", config);

    let store = Arc::new(InstanceStore::new(config.restart_delay));

    if config.seed_sample_data {
        seed::load_sample_data(&store).await?;
    } else {
        info!("Sample data disabled, starting with an empty fleet");
    }

    if config.uptime_tick.is_zero() {
        info!("Uptime ticker disabled");
    } else {
        store.clone().start_uptime_task(config.uptime_tick);
        info!("Started uptime ticker every {:?}", config.uptime_tick);
    }

    // Create router
    let app = create_router(store);

    // Start server
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
