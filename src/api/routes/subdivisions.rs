//! RT routes.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::{
        report::{self, SubdivisionDetail, SubdivisionStats},
        subdivision::{self, SubdivisionInput},
    },
    entities::subdivision as rt,
    errors::Error,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;

async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<Vec<SubdivisionStats>>>> {
    let stats = report::subdivision_stats(&state.db, state.config.rice_price_per_kg).await?;
    Ok(ok(stats))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<SubdivisionDetail>>> {
    let detail = report::subdivision_detail(&state.db, id, state.config.rice_price_per_kg)
        .await?
        .ok_or_else(|| Error::not_found("RT", id))?;
    Ok(ok(detail))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    JsonBody(body): JsonBody<SubdivisionInput>,
) -> ApiResult<Json<ApiResponse<rt::Model>>> {
    Ok(ok(subdivision::create_subdivision(&state.db, body).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<SubdivisionInput>,
) -> ApiResult<Json<ApiResponse<rt::Model>>> {
    Ok(ok(subdivision::update_subdivision(&state.db, id, body).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    subdivision::delete_subdivision(&state.db, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rt", get(list).post(create))
        .route("/rt/{id}", get(detail).put(update).delete(remove))
}
