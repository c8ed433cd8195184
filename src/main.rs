//! Cocoa Atelier - storefront shipping and checkout service

use anyhow::Result;
use cocoa_atelier::{api, config::AppConfig, logging};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;
    logging::init();

    let state = api::AppState::from_config(&config).await?;
    let sweeper = state.heat_hold.clone().spawn_auto_release_sweeper(config.heat_hold_sweep_every);

    let app = api::router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive());

    tracing::info!("🍫 Cocoa Atelier listening on 0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    axum::serve(listener, app).await?;
    sweeper.abort();
    Ok(())
}
