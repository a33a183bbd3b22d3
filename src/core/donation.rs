//! Donation (infak) business logic - listing, totals and manual entries.
//!
//! `change` and `donated_change` rows are written by the payment ledger; this
//! module only adds free-standing `manual` donations.

use crate::{
    core::payer::{clean_optional, display_names},
    entities::{Donation, DonationSource, Payer, PayerName, Subdivision, donation, payer_name},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// A donation as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct DonationListing {
    /// The donation row
    #[serde(flatten)]
    pub donation: donation::Model,
    /// Names of the donating household, if linked to a payer
    pub payer_names: Option<String>,
    /// RT of the donating household, if linked to a payer
    pub subdivision_number: Option<String>,
}

/// Lists all donations newest first, with payer names and RT.
pub async fn list_donations(db: &DatabaseConnection) -> Result<Vec<DonationListing>> {
    let donations = Donation::find()
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .all(db)
        .await?;

    let payers: HashMap<i64, i64> = Payer::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.subdivision_id))
        .collect();

    let mut names: HashMap<i64, Vec<payer_name::Model>> = HashMap::new();
    for name in PayerName::find()
        .order_by_asc(payer_name::Column::Id)
        .all(db)
        .await?
    {
        names.entry(name.payer_id).or_default().push(name);
    }

    let subdivisions: HashMap<i64, String> = Subdivision::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.number))
        .collect();

    Ok(donations
        .into_iter()
        .map(|donation| {
            let payer_names = donation
                .payer_id
                .and_then(|id| names.get(&id))
                .map(|n| display_names(n));
            let subdivision_number = donation
                .payer_id
                .and_then(|id| payers.get(&id))
                .and_then(|rt| subdivisions.get(rt))
                .cloned();
            DonationListing {
                donation,
                payer_names,
                subdivision_number,
            }
        })
        .collect())
}

/// Sum of every donation, whatever its source.
pub async fn total_donations<C>(db: &C) -> Result<f64>
where
    C: ConnectionTrait,
{
    let donations = Donation::find().all(db).await?;
    Ok(donations.iter().map(|d| d.amount).sum())
}

/// Records a free-standing donation, optionally linked to a payer.
///
/// # Errors
/// [`Error::Validation`] if the amount is not positive or the payer does not exist.
pub async fn create_manual_donation(
    db: &DatabaseConnection,
    amount: f64,
    payer_id: Option<i64>,
    note: Option<String>,
) -> Result<donation::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::validation("Donation amount must be greater than 0"));
    }

    if let Some(payer_id) = payer_id {
        if Payer::find_by_id(payer_id).one(db).await?.is_none() {
            return Err(Error::validation(format!("Payer {payer_id} does not exist")));
        }
    }

    let donation = donation::ActiveModel {
        payer_id: Set(payer_id),
        source: Set(DonationSource::Manual),
        amount: Set(amount),
        note: Set(clean_optional(note.as_deref())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(donation_id = donation.id, amount, "Recorded manual donation");
    Ok(donation)
}
