use std::net::SocketAddr;

use anyhow::Result;
use tracing::info;
use volant_api::{AppState, Config};
use volant_logging::LoggingConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let logging_config = LoggingConfig::from_env("volant-api")
        .with_level("volant_api=debug,tower_http=debug,volant_orchestrator=info");
    volant_logging::init_logging(logging_config)?;

    info!(
        service = "volant-api",
        version = env!("CARGO_PKG_VERSION"),
        "starting volant api server"
    );

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config).await?;
    let app = volant_api::create_app(state);

    let addr: SocketAddr = bind_addr.parse()?;
    info!(server.address = %addr, "api server binding to address");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}