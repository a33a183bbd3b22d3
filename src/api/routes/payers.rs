//! Muzakki routes: payer CRUD, change donation and the xlsx export.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::{
        export,
        payer::{self, BatchDonationOutcome, PayerInput, PayerListing, PayerRecord},
    },
    entities::donation,
    errors::Error,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ListQuery {
    rt_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct BatchBody {
    payer_ids: Vec<i64>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<PayerListing>>>> {
    Ok(ok(payer::list_payers(&state.db, query.rt_id).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<PayerRecord>>> {
    let record = payer::get_payer(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Payer", id))?;
    Ok(ok(record))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(user): Authenticated,
    JsonBody(body): JsonBody<PayerInput>,
) -> ApiResult<Json<ApiResponse<PayerRecord>>> {
    Ok(ok(payer::create_payer(&state.db, body, user.id).await?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<PayerInput>,
) -> ApiResult<Json<ApiResponse<PayerRecord>>> {
    Ok(ok(payer::update_payer(&state.db, id, body).await?))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    payer::delete_payer(&state.db, id).await?;
    Ok(ok(json!({ "deleted": id })))
}

async fn donate_change(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<donation::Model>>> {
    Ok(ok(payer::donate_change(&state.db, id).await?))
}

async fn donate_change_batch(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(rt_id): Path<i64>,
    JsonBody(body): JsonBody<BatchBody>,
) -> ApiResult<Json<ApiResponse<BatchDonationOutcome>>> {
    let outcome = payer::donate_change_batch(&state.db, rt_id, &body.payer_ids).await?;
    Ok(ok(outcome))
}

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn export_excel(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let body = export::export_workbook(&state.db).await?;
    let file_name = export::export_file_name(chrono::Local::now().date_naive());
    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    Ok((headers, body))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/muzakki", get(list).post(create))
        .route("/muzakki/export-excel", get(export_excel))
        .route("/muzakki/{id}", get(detail).put(update).delete(remove))
        .route("/muzakki/{id}/sedekahkan-kembalian", post(donate_change))
        .route("/muzakki/rt/{rt_id}/batch-infak", post(donate_change_batch))
}
