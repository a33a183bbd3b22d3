//! Distribusi routes. Creating a disbursement and replacing its proof photo
//! take `multipart/form-data` so the photo travels with the form.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody},
        ok,
    },
    core::{
        disbursement::{
            self, Availability, DisbursementInput, DisbursementListing, DisbursementReport,
            DisbursementStats,
        },
        upload::{MAX_PHOTO_BYTES, StagedPhoto},
    },
    entities::{ZakatKind, disbursement as distribusi},
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PHOTO_FIELD: &str = "bukti_foto";

/// Room for the form fields next to a full-size photo
const FORM_OVERHEAD: usize = 1024 * 1024;

#[derive(Debug, Serialize)]
struct DisbursementList {
    disbursements: Vec<DisbursementListing>,
    stats: DisbursementStats,
}

#[derive(Debug, Serialize)]
struct AvailableStock {
    rice: Availability,
    money: Availability,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug)]
struct PhotoUpload {
    content_type: Option<String>,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct DisbursementForm {
    beneficiary_id: Option<String>,
    kind: Option<String>,
    amount: Option<String>,
    photo: Option<PhotoUpload>,
}

impl DisbursementForm {
    async fn read(multipart: &mut Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                PHOTO_FIELD => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen
                    if !bytes.is_empty() {
                        form.photo = Some(PhotoUpload {
                            content_type,
                            bytes,
                        });
                    }
                }
                "beneficiary_id" | "mustahik_id" => form.beneficiary_id = Some(field.text().await?),
                "kind" | "jenis_zakat" => form.kind = Some(field.text().await?),
                "amount" | "jumlah" => form.amount = Some(field.text().await?),
                _ => {}
            }
        }
        Ok(form)
    }

    fn input(&self) -> Result<DisbursementInput> {
        let (Some(beneficiary_id), Some(kind), Some(amount)) =
            (&self.beneficiary_id, &self.kind, &self.amount)
        else {
            return Err(Error::validation(
                "Beneficiary, zakat kind and amount are required",
            ));
        };

        let beneficiary_id = beneficiary_id
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::validation("Beneficiary id must be a number"))?;
        let kind: ZakatKind = kind.parse()?;
        let amount = amount
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::validation("Amount must be a number"))?;

        Ok(DisbursementInput {
            beneficiary_id,
            kind,
            amount,
        })
    }
}

async fn stage(state: &AppState, photo: Option<PhotoUpload>) -> Result<Option<StagedPhoto>> {
    match photo {
        Some(photo) => {
            let staged = state
                .photos
                .stage(photo.content_type.as_deref(), &photo.bytes)
                .await?;
            Ok(Some(staged))
        }
        None => Ok(None),
    }
}

async fn list(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<DisbursementList>>> {
    let disbursements = disbursement::list_disbursements(&state.db).await?;
    let stats = disbursement::stats(&state.db).await?;
    Ok(ok(DisbursementList {
        disbursements,
        stats,
    }))
}

async fn available(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<AvailableStock>>> {
    let rice = disbursement::available(&state.db, ZakatKind::Rice).await?;
    let money = disbursement::available(&state.db, ZakatKind::Money).await?;
    Ok(ok(AvailableStock { rice, money }))
}

async fn report(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ApiResponse<DisbursementReport>>> {
    Ok(ok(disbursement::report(&state.db).await?))
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<DisbursementListing>>> {
    let listing = disbursement::get_disbursement(&state.db, id)
        .await?
        .ok_or_else(|| Error::not_found("Disbursement", id))?;
    Ok(ok(listing))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Authenticated(user): Authenticated,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<distribusi::Model>>> {
    let form = DisbursementForm::read(&mut multipart).await?;
    let input = form.input()?;
    let photo = stage(&state, form.photo).await?;

    let row = state
        .allocator
        .create_with_photo(&state.db, &state.photos, input, user.id, photo)
        .await?;
    Ok(ok(row))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<StatusBody>,
) -> ApiResult<Json<ApiResponse<distribusi::Model>>> {
    let row = state
        .allocator
        .update_status(&state.db, id, &body.status)
        .await?;
    Ok(ok(row))
}

async fn replace_photo(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<Json<ApiResponse<distribusi::Model>>> {
    let form = DisbursementForm::read(&mut multipart).await?;
    let photo = stage(&state, form.photo)
        .await?
        .ok_or_else(|| Error::upload("No proof photo was uploaded"))?;

    let row = disbursement::replace_proof_photo(&state.db, &state.photos, id, photo).await?;
    Ok(ok(row))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    Path(id): Path<i64>,
) -> ApiResult<Json<ApiResponse<distribusi::Model>>> {
    let row = disbursement::delete_disbursement(&state.db, &state.photos, id).await?;
    Ok(ok(row))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/distribusi", get(list).post(create))
        .route("/distribusi/available", get(available))
        .route("/distribusi/laporan", get(report))
        .route("/distribusi/{id}", get(detail).delete(remove))
        .route("/distribusi/{id}/status", put(update_status))
        .route("/distribusi/{id}/bukti-foto", put(replace_photo))
        .layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + FORM_OVERHEAD))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    fn form(beneficiary: &str, kind: &str, amount: &str) -> DisbursementForm {
        DisbursementForm {
            beneficiary_id: Some(beneficiary.to_string()),
            kind: Some(kind.to_string()),
            amount: Some(amount.to_string()),
            photo: None,
        }
    }

    #[test]
    fn test_form_parsing() {
        let input = form("3", "beras", "2.5").input().unwrap();
        assert_eq!(input.beneficiary_id, 3);
        assert_eq!(input.kind, ZakatKind::Rice);
        assert_eq!(input.amount, 2.5);

        assert!(matches!(
            form("x", "uang", "1000").input(),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            form("1", "emas", "1000").input(),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            DisbursementForm::default().input(),
            Err(Error::Validation { .. })
        ));
    }
}
