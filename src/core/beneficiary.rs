//! Beneficiary (mustahik) business logic.

use crate::{
    core::disbursement::list_for_beneficiary,
    entities::{Beneficiary, Disbursement, Subdivision, beneficiary, disbursement},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Fields a client submits to create or update a beneficiary
#[derive(Debug, Clone, Deserialize)]
pub struct BeneficiaryInput {
    /// Beneficiary name
    pub name: String,
    /// Eligibility category
    pub category: String,
    /// RT the beneficiary lives in
    #[serde(default)]
    pub subdivision_id: Option<i64>,
}

/// A beneficiary with its RT number
#[derive(Debug, Clone, Serialize)]
pub struct BeneficiaryListing {
    /// The beneficiary row
    #[serde(flatten)]
    pub beneficiary: beneficiary::Model,
    /// RT number, if any
    pub subdivision_number: Option<String>,
}

/// A beneficiary with everything it received
#[derive(Debug, Clone, Serialize)]
pub struct BeneficiaryDetail {
    /// The beneficiary and its RT
    #[serde(flatten)]
    pub listing: BeneficiaryListing,
    /// Disbursements to this beneficiary, newest first
    pub disbursements: Vec<disbursement::Model>,
}

async fn validate(db: &DatabaseConnection, input: &BeneficiaryInput) -> Result<(String, String)> {
    let name = input.name.trim();
    let category = input.category.trim();
    if name.is_empty() || category.is_empty() {
        return Err(Error::validation("Name and category are required"));
    }
    if let Some(id) = input.subdivision_id {
        if Subdivision::find_by_id(id).one(db).await?.is_none() {
            return Err(Error::validation(format!("RT {id} does not exist")));
        }
    }
    Ok((name.to_string(), category.to_string()))
}

/// Lists beneficiaries ordered by RT number, then name.
pub async fn list_beneficiaries(db: &DatabaseConnection) -> Result<Vec<BeneficiaryListing>> {
    let subdivisions: HashMap<i64, String> = Subdivision::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.number))
        .collect();

    let mut listing: Vec<BeneficiaryListing> = Beneficiary::find()
        .order_by_asc(beneficiary::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|b| BeneficiaryListing {
            subdivision_number: b.subdivision_id.and_then(|id| subdivisions.get(&id).cloned()),
            beneficiary: b,
        })
        .collect();
    // Stable sort keeps name order inside each RT
    listing.sort_by(|a, b| a.subdivision_number.cmp(&b.subdivision_number));
    Ok(listing)
}

/// Loads a beneficiary with its RT and disbursements.
pub async fn get_beneficiary(db: &DatabaseConnection, id: i64) -> Result<Option<BeneficiaryDetail>> {
    let Some(beneficiary) = Beneficiary::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let subdivision_number = match beneficiary.subdivision_id {
        Some(rt) => Subdivision::find_by_id(rt).one(db).await?.map(|s| s.number),
        None => None,
    };
    let disbursements = list_for_beneficiary(db, id).await?;

    Ok(Some(BeneficiaryDetail {
        listing: BeneficiaryListing {
            beneficiary,
            subdivision_number,
        },
        disbursements,
    }))
}

/// Registers a beneficiary.
pub async fn create_beneficiary(
    db: &DatabaseConnection,
    input: BeneficiaryInput,
) -> Result<beneficiary::Model> {
    let (name, category) = validate(db, &input).await?;

    let row = beneficiary::ActiveModel {
        subdivision_id: Set(input.subdivision_id),
        name: Set(name),
        category: Set(category),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(beneficiary_id = row.id, category = %row.category, "Registered beneficiary");
    Ok(row)
}

/// Updates a beneficiary.
pub async fn update_beneficiary(
    db: &DatabaseConnection,
    id: i64,
    input: BeneficiaryInput,
) -> Result<beneficiary::Model> {
    let (name, category) = validate(db, &input).await?;
    let row = Beneficiary::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Beneficiary", id))?;

    let mut row: beneficiary::ActiveModel = row.into();
    row.subdivision_id = Set(input.subdivision_id);
    row.name = Set(name);
    row.category = Set(category);
    row.update(db).await.map_err(Into::into)
}

/// Deletes a beneficiary that never received a disbursement.
///
/// # Errors
/// [`Error::Conflict`] if any disbursement references the beneficiary.
pub async fn delete_beneficiary(db: &DatabaseConnection, id: i64) -> Result<()> {
    let row = Beneficiary::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Beneficiary", id))?;

    let references = Disbursement::find()
        .filter(disbursement::Column::BeneficiaryId.eq(id))
        .count(db)
        .await?;
    if references > 0 {
        return Err(Error::conflict(format!(
            "{} has {references} disbursement(s) and cannot be deleted",
            row.name
        )));
    }

    row.delete(db).await?;
    info!(beneficiary_id = id, "Deleted beneficiary");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::disbursement::{Allocator, DisbursementInput};
    use crate::core::obligation::RateSelection;
    use crate::entities::ZakatKind;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_beneficiary(
            &db,
            BeneficiaryInput {
                name: "Bu Sarah".to_string(),
                category: " ".to_string(),
                subdivision_id: None,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_and_detail() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        create_test_beneficiary(&db, "Zainab", Some(fixture.subdivision.id)).await?;
        let without_rt = create_test_beneficiary(&db, "Abdul", None).await?;

        let listing = list_beneficiaries(&db).await?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].beneficiary.name, "Abdul");
        assert_eq!(listing[1].subdivision_number.as_deref(), Some("RT 01"));

        let updated = update_beneficiary(
            &db,
            without_rt.id,
            BeneficiaryInput {
                name: "Abdul Karim".to_string(),
                category: "miskin".to_string(),
                subdivision_id: Some(fixture.subdivision.id),
            },
        )
        .await?;
        assert_eq!(updated.category, "miskin");

        let detail = get_beneficiary(&db, without_rt.id).await?.unwrap();
        assert_eq!(detail.listing.subdivision_number.as_deref(), Some("RT 01"));
        assert!(detail.disbursements.is_empty());
        assert!(get_beneficiary(&db, 99).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_blocked_by_disbursement() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        create_test_payer(
            &db,
            &fixture,
            RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
            1,
            45_000.0,
        )
        .await?;
        let beneficiary = create_test_beneficiary(&db, "Bu Sarah", None).await?;
        Allocator::default()
            .create(
                &db,
                DisbursementInput {
                    beneficiary_id: beneficiary.id,
                    kind: ZakatKind::Money,
                    amount: 20_000.0,
                },
                fixture.user.id,
                None,
            )
            .await?;

        assert!(matches!(
            delete_beneficiary(&db, beneficiary.id).await,
            Err(Error::Conflict { .. })
        ));
        let detail = get_beneficiary(&db, beneficiary.id).await?.unwrap();
        assert_eq!(detail.disbursements.len(), 1);
        assert!(matches!(
            delete_beneficiary(&db, 77).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
