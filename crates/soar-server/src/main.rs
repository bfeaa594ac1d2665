//! Soaring task server: calculation loops plus a REST API.

use anyhow::Result;
use axum::routing::get;
use soar_core::TaskManager;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soar_server::config::Config;
use soar_server::state::AppState;
use soar_server::{api, loops};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("soar_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting soaring task server...");

    let config = Config::from_env();
    let port = config.server_port;

    let mut manager = TaskManager::new(config.load_behaviour()?);
    if let Some(definition) = config.load_task()? {
        let warnings = manager.set_task(definition.build()?)?;
        for warning in &warnings {
            tracing::warn!(?warning, "startup task warning");
        }
    }
    let (state, fixes) = AppState::new(manager, config.fix_queue_capacity);

    // Start background loops
    tokio::spawn(loops::calculation_loop::run_calculation_loop(
        state.clone(),
        fixes,
        config.clone(),
    ));
    tokio::spawn(loops::target_loop::run_target_loop(state.clone(), config));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
