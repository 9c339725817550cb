use anyhow::Result;
use energy_mix_forecaster::{api, config, state::AppState, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let state = AppState::new(cfg.clone()).await?;
    let app = api::router(state);

    let addr = cfg.server.socket_addr()?;
    info!(%addr, models = %cfg.models.dir.display(), "starting energy mix forecaster");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
