//! RW routes.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::{
        group::{self, GroupInput},
        report::{self, GroupDetail},
    },
    entities::group as rw,
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
) -> ApiResult<Json<ApiResponse<Vec<rw::Model>>>> {
    Ok(ok(group::list_groups(&state.db).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<GroupDetail>>> {
    let detail = report::group_detail(&state.db, id, state.config.rice_price_per_kg)
        .await?
        .ok_or_else(|| Error::not_found("RW", id))?;
    Ok(ok(detail))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    JsonBody(body): JsonBody<GroupInput>,
) -> ApiResult<Json<ApiResponse<rw::Model>>> {
    Ok(ok(group::create_group(&state.db, body).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<GroupInput>,
) -> ApiResult<Json<ApiResponse<rw::Model>>> {
    Ok(ok(group::update_group(&state.db, id, body).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    group::delete_group(&state.db, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rw", get(list).post(create))
        .route("/rw/{id}", get(detail).put(update).delete(remove))
}
