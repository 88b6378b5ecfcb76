use std::error::Error;

use payslip_engine::api::{AppState, create_router};
use payslip_engine::config::ConfigLoader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_PATH: &str = "./config/payslip.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payslip_engine=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path =
        std::env::var("PAYSLIP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let config = ConfigLoader::load(&config_path)?;
    tracing::info!(path = %config_path, "Configuration loaded");

    let bind_addr = config.config().server.bind_addr.clone();
    let backend = config.config().store.backend;
    let isolation = config.config().store.isolation;
    let database_url = std::env::var("DATABASE_URL").ok();
    let state = AppState::connect(config, database_url.as_deref()).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, ?backend, ?isolation, "Starting server");
    axum::serve(listener, app).await?;
    Ok(())
}
