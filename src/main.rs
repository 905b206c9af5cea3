//! Main entry point for the mesh generation gateway

use mesh_gen_gateway::{api, config::Settings, AppState};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    info!("Starting mesh generation gateway");
    info!(
        "Loaded configuration: server={}:{}, backends={}",
        settings.server.host,
        settings.server.port,
        settings.backends.len()
    );

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app_state = AppState::build(settings).await?;

    let app = api::routes::create_router(app_state.clone());

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.backend_registry.shutdown();
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
