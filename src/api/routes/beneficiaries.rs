//! Mustahik routes.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::beneficiary::{self, BeneficiaryDetail, BeneficiaryInput, BeneficiaryListing},
    entities::beneficiary as mustahik,
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
) -> ApiResult<Json<ApiResponse<Vec<BeneficiaryListing>>>> {
    Ok(ok(beneficiary::list_beneficiaries(&state.db).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<BeneficiaryDetail>>> {
    let detail = beneficiary::get_beneficiary(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Beneficiary", id))?;
    Ok(ok(detail))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    JsonBody(body): JsonBody<BeneficiaryInput>,
) -> ApiResult<Json<ApiResponse<mustahik::Model>>> {
    Ok(ok(beneficiary::create_beneficiary(&state.db, body).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<BeneficiaryInput>,
) -> ApiResult<Json<ApiResponse<mustahik::Model>>> {
    Ok(ok(beneficiary::update_beneficiary(&state.db, id, body).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    beneficiary::delete_beneficiary(&state.db, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mustahik", get(list).post(create))
        .route("/mustahik/{id}", get(detail).put(update).delete(remove))
}
