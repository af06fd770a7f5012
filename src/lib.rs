pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::handlers;
use crate::api::middleware::{metrics, request_id, session};
use crate::config::AppConfig;
use crate::services::intake::FileIntake;
use crate::services::metadata_tool::MetadataTool;
use crate::services::session_store::SessionStore;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use std::sync::Arc;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub intake: FileIntake,
    pub tool: Arc<dyn MetadataTool>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, tool: Arc<dyn MetadataTool>) -> Self {
        Self {
            intake: FileIntake::new(config.upload_dir.clone()),
            sessions: SessionStore::new(config.session_ttl),
            tool,
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::pages::home))
        .route(
            "/analyze",
            get(handlers::analyze::analyze_form).post(handlers::analyze::analyze_upload),
        )
        .route("/report", get(handlers::pages::report))
        .route("/remove-metadata/", get(handlers::tools::remove_metadata))
        .route(
            "/metadata-tools/",
            get(handlers::tools::metadata_tools).post(handlers::tools::metadata_tools),
        )
        .route("/download-clean/", get(handlers::tools::download_clean))
        .route("/download-txt/", get(handlers::export::download_txt))
        .route("/download-pdf/", get(handlers::export::download_pdf))
        .route("/health", get(handlers::health::health_check))
        .layer(from_fn_with_state(state.clone(), session::session_middleware))
        .layer(from_fn(metrics::metrics_middleware))
        .layer(from_fn(request_id::request_id_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
