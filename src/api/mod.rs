//! JSON HTTP surface.
//!
//! One route module per resource, all sharing [`AppState`]. Every route
//! except login and the health check requires a session cookie.

pub mod error;
pub mod extract;
mod routes;

use crate::{
    config::settings::AppConfig,
    core::{disbursement::Allocator, upload::PhotoStore},
};
use axum::{Json, Router, routing::get};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Public path the proof photos are served under
pub const UPLOADS_PATH: &str = "/uploads/distribusi";

/// Shared state handed to every handler
#[derive(Debug)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Runtime settings
    pub config: AppConfig,
    /// Serializes balance-checked disbursement writes
    pub allocator: Allocator,
    /// Proof photo storage
    pub photos: PhotoStore,
}

impl AppState {
    /// Builds the state from a connection and the runtime settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let allocator = Allocator::new(config.transition_policy);
        let photos = PhotoStore::new(
            config.upload_dir.clone(),
            config.upload_staging_dir.clone(),
        );
        Self {
            db,
            config,
            allocator,
            photos,
        }
    }
}

/// Envelope of every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    /// Response payload
    pub data: T,
}

/// Wraps a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

async fn health() -> Json<ApiResponse<&'static str>> {
    ok("ok")
}

/// Builds the application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    let photos = ServeDir::new(state.photos.root());

    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::users::router())
        .merge(routes::reports::router())
        .merge(routes::groups::router())
        .merge(routes::subdivisions::router())
        .merge(routes::beneficiaries::router())
        .merge(routes::payers::router())
        .merge(routes::rates::router())
        .merge(routes::donations::router())
        .merge(routes::disbursements::router())
        .nest_service(UPLOADS_PATH, photos)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
