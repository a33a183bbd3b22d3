//! Infak routes.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::donation::{self, DonationListing},
    entities::donation as infak,
};
use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct DonationList {
    donations: Vec<DonationListing>,
    total: f64,
}

#[derive(Debug, Deserialize)]
struct ManualDonation {
    amount: f64,
    #[serde(default)]
    payer_id: Option<i64>,
    #[serde(default)]
    note: Option<String>,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<DonationList>>> {
    let donations = donation::list_donations(&state.db).await?;
    let total = donation::total_donations(&state.db).await?;
    Ok(ok(DonationList { donations, total }))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    JsonBody(body): JsonBody<ManualDonation>,
) -> ApiResult<Json<ApiResponse<infak::Model>>> {
    let row =
        donation::create_manual_donation(&state.db, body.amount, body.payer_id, body.note).await?;
    Ok(ok(row))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/infak", get(list).post(create))
}
