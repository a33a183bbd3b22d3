//! Dashboard and collection report.

use crate::{
    api::{ApiResponse, AppState, error::ApiResult, extract::Authenticated, ok},
    core::report::{self, CollectionReport, Dashboard},
};
use axum::{Json, Router, extract::State, routing::get};
use std::sync::Arc;

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<Dashboard>>> {
    let dashboard = report::dashboard(&state.db, state.config.rice_price_per_kg).await?;
    Ok(ok(dashboard))
}

async fn collection_report(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<CollectionReport>>> {
    Ok(ok(report::collection_report(&state.db).await?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/laporan", get(collection_report))
}
