//! Master zakat rate routes. Reads are open to any user, writes need an admin.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Admin, Authenticated, JsonBody},
        ok,
    },
    core::zakat_rate::{self, RateInput},
    entities::zakat_rate as rate,
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
) -> ApiResult<Json<ApiResponse<Vec<rate::Model>>>> {
    Ok(ok(zakat_rate::list_rates(&state.db).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<rate::Model>>> {
    let rate = zakat_rate::get_rate_by_id(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Zakat rate", id))?;
    Ok(ok(rate))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Admin(user): Admin,
    JsonBody(body): JsonBody<RateInput>,
) -> ApiResult<Json<ApiResponse<rate::Model>>> {
    Ok(ok(zakat_rate::create_rate(&state.db, body, Some(user.id)).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Admin(user): Admin,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<RateInput>,
) -> ApiResult<Json<ApiResponse<rate::Model>>> {
    let rate = zakat_rate::update_rate(&state.db, id, body, Some(user.id)).await?;
    Ok(ok(rate))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    zakat_rate::delete_rate(&state.db, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/muzakki/api/master-zakat", get(list).post(create))
        .route(
            "/muzakki/api/master-zakat/{id}",
            get(detail).put(update).delete(remove),
        )
}
