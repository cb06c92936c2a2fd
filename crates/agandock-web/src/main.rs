//! AGanDock Web Server
//!
//! Run with: cargo run -p agandock-web

use tracing::info;
use tracing_subscriber::EnvFilter;

use agandock_common::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting AGanDock Web Server...");

    let config = DashboardConfig::load()?;
    info!("Workspace root: {}", config.pipeline.workspace_root.display());
    info!("agandock CLI: {}", config.pipeline.cli_path.display());

    let addr = config.bind_addr();
    let state = agandock_web::state::AppState::new(config);

    // Build router
    let app = agandock_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
