//! Axum router - maps all URL paths to handlers.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    dashboard::dashboard,
    results::{results_page, api_results, api_reset, api_export},
    experiments::{api_experiments, api_experiment_detail, api_check_pdb, api_check_pb, api_plc_files},
    docking::api_docking,
    analysis::{api_filter, api_plip, api_plip_tables, api_plip_report},
    files::api_file,
};
use crate::sse::sse_handler;

/// Receptor and ligand uploads can be large.
const UPLOAD_LIMIT: usize = 256 * 1024 * 1024;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",        get(dashboard))
        .route("/results", get(results_page))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // Experiment folders
        .route("/api/experiments",        get(api_experiments))
        .route("/api/experiments/{name}", get(api_experiment_detail))
        .route("/api/check-pdb/{name}",   get(api_check_pdb))
        .route("/api/check-pb/{name}",    get(api_check_pb))
        .route("/api/plc/{name}",         get(api_plc_files))
        .route("/api/file",               get(api_file))

        // Result views
        .route("/api/results/{name}/{variant}",        get(api_results))
        .route("/api/results/{name}/{variant}/reset",  post(api_reset))
        .route("/api/results/{name}/{variant}/export", get(api_export))

        // Pipeline stages
        .route("/api/docking", post(api_docking).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)))
        .route("/api/filter",  post(api_filter))
        .route("/api/plip",    post(api_plip))
        .route("/api/plip/{name}/tables", get(api_plip_tables))
        .route("/api/plip/{name}/report", get(api_plip_report))

        // Static files
        .nest_service("/static", ServeDir::new(static_dir))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
