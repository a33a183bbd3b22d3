//! User management, administrators only.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Admin, JsonBody},
        ok,
    },
    core::auth::{self, NewUser},
    entities::user,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use serde_json::{Value, json};
use std::sync::Arc;

async fn list_users(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> ApiResult<Json<ApiResponse<Vec<user::Model>>>> {
    Ok(ok(auth::list_users(&state.db).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    JsonBody(body): JsonBody<NewUser>,
) -> ApiResult<Json<ApiResponse<user::Model>>> {
    Ok(ok(auth::create_user(&state.db, body).await?))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Admin(acting): Admin,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    auth::delete_user(&state.db, &acting, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", delete(delete_user))
}
