//! Payment ledger - records household payments and keeps the change donation in step.
//!
//! A payer row, its name rows and its `change` donation are always written
//! together inside one database transaction. The `change` donation mirrors
//! `payer.change_amount`: it exists exactly when the change is positive and
//! always carries the same amount.
//!
//! Donating change is one-way. The payer's change drops to zero and a
//! `donated_change` donation is recorded instead. Later edits subtract what was
//! already donated, so the same rupiah is never counted twice.

use crate::{
    core::{
        obligation::{self, Obligation, Rate, RateSelection},
        zakat_rate,
    },
    entities::{
        Donation, DonationSource, Payer, PayerName, Subdivision, User, ZakatKind, donation, payer,
        payer_name, subdivision, user,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// One person covered by a household payment
#[derive(Debug, Clone, Deserialize)]
pub struct PayerNameInput {
    /// Full name
    pub full_name: String,
    /// Patronymic ("bin"/"binti" name)
    #[serde(default)]
    pub patronymic: Option<String>,
    /// Parent name
    #[serde(default)]
    pub parent_name: Option<String>,
}

/// Fields a client submits to create or update a payer
#[derive(Debug, Clone, Deserialize)]
pub struct PayerInput {
    /// RT the household belongs to
    pub subdivision_id: i64,
    /// Number of people covered
    pub headcount: i32,
    /// Rate the obligation is priced with
    pub rate: RateSelection,
    /// Amount handed over
    pub amount_paid: f64,
    /// Free-form note
    #[serde(default)]
    pub note: Option<String>,
    /// The people covered by the payment
    pub names: Vec<PayerNameInput>,
}

/// A payer together with its name rows
#[derive(Debug, Clone, Serialize)]
pub struct PayerRecord {
    /// The payer row
    #[serde(flatten)]
    pub payer: payer::Model,
    /// The people covered by the payment
    pub names: Vec<payer_name::Model>,
}

/// A payer as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct PayerListing {
    /// The payer row
    #[serde(flatten)]
    pub payer: payer::Model,
    /// The people covered by the payment
    pub names: Vec<payer_name::Model>,
    /// RT number, if the RT still exists
    pub subdivision_number: Option<String>,
    /// Name of the recording user, if the user still exists
    pub recorded_by_name: Option<String>,
}

/// Why a payer was skipped in a batch donation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchSkip {
    /// The payer that was skipped
    pub payer_id: i64,
    /// Human-readable reason
    pub reason: String,
}

/// Outcome of donating change for several payers at once
#[derive(Debug, Clone, Serialize)]
pub struct BatchDonationOutcome {
    /// Donations that were recorded
    pub donated: Vec<donation::Model>,
    /// Sum of the recorded donations
    pub total_amount: f64,
    /// Payers that were skipped, with the reason
    pub skipped: Vec<BatchSkip>,
}

/// Cleaned-up name rows, in submission order
fn validate_names(names: &[PayerNameInput]) -> Result<Vec<PayerNameInput>> {
    let cleaned: Vec<PayerNameInput> = names
        .iter()
        .filter(|n| !n.full_name.trim().is_empty())
        .map(|n| PayerNameInput {
            full_name: n.full_name.trim().to_string(),
            patronymic: clean_optional(n.patronymic.as_deref()),
            parent_name: clean_optional(n.parent_name.as_deref()),
        })
        .collect();

    if cleaned.is_empty() {
        return Err(Error::validation("At least one payer name is required"));
    }
    Ok(cleaned)
}

pub(crate) fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

async fn ensure_subdivision<C>(db: &C, subdivision_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Subdivision::find_by_id(subdivision_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| Error::validation(format!("RT {subdivision_id} does not exist")))
}

async fn insert_names<C>(db: &C, payer_id: i64, names: Vec<PayerNameInput>) -> Result<Vec<payer_name::Model>>
where
    C: ConnectionTrait,
{
    let mut inserted = Vec::with_capacity(names.len());
    for name in names {
        let row = payer_name::ActiveModel {
            payer_id: Set(payer_id),
            full_name: Set(name.full_name),
            patronymic: Set(name.patronymic),
            parent_name: Set(name.parent_name),
            ..Default::default()
        }
        .insert(db)
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

/// Brings the payer's `change` donation in line with `change_amount`.
///
/// Updates the row when both exist, inserts it when change appeared, and
/// deletes it when change dropped to zero.
async fn reconcile_change_donation<C>(db: &C, payer_id: i64, change_amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = Donation::find()
        .filter(donation::Column::PayerId.eq(payer_id))
        .filter(donation::Column::Source.eq(DonationSource::Change))
        .one(db)
        .await?;

    match (existing, change_amount > 0.0) {
        (Some(row), true) => {
            if (row.amount - change_amount).abs() > f64::EPSILON {
                let mut row: donation::ActiveModel = row.into();
                row.amount = Set(change_amount);
                row.update(db).await?;
            }
        }
        (None, true) => {
            donation::ActiveModel {
                payer_id: Set(Some(payer_id)),
                source: Set(DonationSource::Change),
                amount: Set(change_amount),
                note: Set(Some("Kembalian zakat fitrah".to_string())),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
        (Some(row), false) => {
            row.delete(db).await?;
        }
        (None, false) => {}
    }
    Ok(())
}

async fn donated_change_total<C>(db: &C, payer_id: i64) -> Result<f64>
where
    C: ConnectionTrait,
{
    let rows = Donation::find()
        .filter(donation::Column::PayerId.eq(payer_id))
        .filter(donation::Column::Source.eq(DonationSource::DonatedChange))
        .all(db)
        .await?;
    Ok(rows.iter().map(|d| d.amount).sum())
}

async fn names_for<C>(db: &C, payer_id: i64) -> Result<Vec<payer_name::Model>>
where
    C: ConnectionTrait,
{
    PayerName::find()
        .filter(payer_name::Column::PayerId.eq(payer_id))
        .order_by_asc(payer_name::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a household payment.
///
/// Inserts the payer, its names and, when there is change, the `change`
/// donation, all in one transaction.
#[instrument(skip(db, input), fields(subdivision_id = input.subdivision_id))]
pub async fn create_payer(
    db: &DatabaseConnection,
    input: PayerInput,
    recorded_by: i64,
) -> Result<PayerRecord> {
    let names = validate_names(&input.names)?;

    let txn = db.begin().await?;

    ensure_subdivision(&txn, input.subdivision_id).await?;
    let (rate, rate_id) = zakat_rate::resolve_selection(&txn, input.rate).await?;
    let computed: Obligation = obligation::calculate(input.headcount, &rate, input.amount_paid)?;

    let now = chrono::Utc::now();
    let payer = payer::ActiveModel {
        subdivision_id: Set(input.subdivision_id),
        headcount: Set(input.headcount),
        zakat_kind: Set(computed.kind),
        rice_kg: Set(computed.rice_kg),
        money_amount: Set(computed.money_amount),
        amount_paid: Set(computed.amount_paid),
        change_amount: Set(computed.change_amount),
        note: Set(clean_optional(input.note.as_deref())),
        recorded_by: Set(recorded_by),
        rate_id: Set(rate_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let names = insert_names(&txn, payer.id, names).await?;
    reconcile_change_donation(&txn, payer.id, payer.change_amount).await?;

    txn.commit().await?;

    info!(
        payer_id = payer.id,
        kind = %payer.zakat_kind,
        obligation = computed.obligation,
        change = payer.change_amount,
        "Recorded payer"
    );
    Ok(PayerRecord { payer, names })
}

/// Re-records a household payment.
///
/// Recomputes obligation and change, replaces the whole name set and
/// reconciles the `change` donation, all in one transaction.
#[instrument(skip(db, input))]
pub async fn update_payer(
    db: &DatabaseConnection,
    payer_id: i64,
    input: PayerInput,
) -> Result<PayerRecord> {
    let names = validate_names(&input.names)?;

    let txn = db.begin().await?;

    let existing = Payer::find_by_id(payer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payer", payer_id))?;

    ensure_subdivision(&txn, input.subdivision_id).await?;
    let (rate, rate_id) = zakat_rate::resolve_selection(&txn, input.rate).await?;
    let computed = obligation::calculate(input.headcount, &rate, input.amount_paid)?;

    // Donated change is in rupiah; legacy rice change is in kilograms
    let change_amount = if matches!(rate, Rate::Legacy(ZakatKind::Rice)) {
        computed.change_amount
    } else {
        let already_donated = donated_change_total(&txn, payer_id).await?;
        (computed.change_amount - already_donated).max(0.0)
    };

    let mut active: payer::ActiveModel = existing.into();
    active.subdivision_id = Set(input.subdivision_id);
    active.headcount = Set(input.headcount);
    active.zakat_kind = Set(computed.kind);
    active.rice_kg = Set(computed.rice_kg);
    active.money_amount = Set(computed.money_amount);
    active.amount_paid = Set(computed.amount_paid);
    active.change_amount = Set(change_amount);
    active.note = Set(clean_optional(input.note.as_deref()));
    active.rate_id = Set(rate_id);
    active.updated_at = Set(chrono::Utc::now());
    let payer = active.update(&txn).await?;

    PayerName::delete_many()
        .filter(payer_name::Column::PayerId.eq(payer_id))
        .exec(&txn)
        .await?;
    let names = insert_names(&txn, payer_id, names).await?;

    reconcile_change_donation(&txn, payer_id, change_amount).await?;

    txn.commit().await?;

    info!(payer_id, change = change_amount, "Updated payer");
    Ok(PayerRecord { payer, names })
}

/// Deletes a payer with its names and every donation that references it.
#[instrument(skip(db))]
pub async fn delete_payer(db: &DatabaseConnection, payer_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let payer = Payer::find_by_id(payer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payer", payer_id))?;

    let donations = Donation::delete_many()
        .filter(donation::Column::PayerId.eq(payer_id))
        .exec(&txn)
        .await?;
    PayerName::delete_many()
        .filter(payer_name::Column::PayerId.eq(payer_id))
        .exec(&txn)
        .await?;
    payer.delete(&txn).await?;

    txn.commit().await?;

    info!(
        payer_id,
        removed_donations = donations.rows_affected,
        "Deleted payer"
    );
    Ok(())
}

/// Moves a payer's change into a `donated_change` donation.
///
/// Works inside the caller's transaction; the caller has already loaded the payer.
async fn consume_change<C>(db: &C, payer: payer::Model) -> Result<donation::Model>
where
    C: ConnectionTrait,
{
    let payer_id = payer.id;
    let amount = payer.change_amount;

    let donation = donation::ActiveModel {
        payer_id: Set(Some(payer_id)),
        source: Set(DonationSource::DonatedChange),
        amount: Set(amount),
        note: Set(Some("Kembalian disedekahkan sebagai infak".to_string())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut active: payer::ActiveModel = payer.into();
    active.change_amount = Set(0.0);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await?;

    reconcile_change_donation(db, payer_id, 0.0).await?;
    Ok(donation)
}

/// Donates a payer's outstanding change ("sedekahkan kembalian").
///
/// # Errors
/// [`Error::NotFound`] for an unknown payer, [`Error::Validation`] when the
/// payer has no change left.
#[instrument(skip(db))]
pub async fn donate_change(db: &DatabaseConnection, payer_id: i64) -> Result<donation::Model> {
    let txn = db.begin().await?;

    let payer = Payer::find_by_id(payer_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payer", payer_id))?;

    if payer.change_amount <= 0.0 {
        return Err(Error::validation("There is no change left to donate"));
    }

    let donation = consume_change(&txn, payer).await?;
    txn.commit().await?;

    info!(payer_id, amount = donation.amount, "Donated change");
    Ok(donation)
}

/// Donates change for several payers of one RT.
///
/// Payers that are not in the RT, have no change, or already donated change
/// before are skipped and reported; the rest are donated in one transaction.
#[instrument(skip(db, payer_ids), fields(requested = payer_ids.len()))]
pub async fn donate_change_batch(
    db: &DatabaseConnection,
    subdivision_id: i64,
    payer_ids: &[i64],
) -> Result<BatchDonationOutcome> {
    if payer_ids.is_empty() {
        return Err(Error::validation("Select at least one payer"));
    }

    let txn = db.begin().await?;

    Subdivision::find_by_id(subdivision_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("RT", subdivision_id))?;

    let mut donated = Vec::new();
    let mut skipped = Vec::new();

    for &payer_id in payer_ids {
        let payer = Payer::find_by_id(payer_id)
            .filter(payer::Column::SubdivisionId.eq(subdivision_id))
            .one(&txn)
            .await?;

        let Some(payer) = payer else {
            skipped.push(BatchSkip {
                payer_id,
                reason: "Payer not found in this RT".to_string(),
            });
            continue;
        };

        if payer.change_amount <= 0.0 {
            skipped.push(BatchSkip {
                payer_id,
                reason: "No change to donate".to_string(),
            });
            continue;
        }

        let already = Donation::find()
            .filter(donation::Column::PayerId.eq(payer_id))
            .filter(donation::Column::Source.eq(DonationSource::DonatedChange))
            .count(&txn)
            .await?;
        if already > 0 {
            skipped.push(BatchSkip {
                payer_id,
                reason: "Change was already donated".to_string(),
            });
            continue;
        }

        donated.push(consume_change(&txn, payer).await?);
    }

    txn.commit().await?;

    let total_amount = donated.iter().map(|d| d.amount).sum();
    if !skipped.is_empty() {
        warn!(subdivision_id, skipped = skipped.len(), "Batch donation skipped payers");
    }
    info!(
        subdivision_id,
        donated = donated.len(),
        total_amount,
        "Batch donated change"
    );

    Ok(BatchDonationOutcome {
        donated,
        total_amount,
        skipped,
    })
}

/// Loads one payer with its names.
pub async fn get_payer(db: &DatabaseConnection, payer_id: i64) -> Result<Option<PayerRecord>> {
    let Some(payer) = Payer::find_by_id(payer_id).one(db).await? else {
        return Ok(None);
    };
    let names = names_for(db, payer_id).await?;
    Ok(Some(PayerRecord { payer, names }))
}

/// Lists payers newest first, optionally limited to one RT.
pub async fn list_payers(
    db: &DatabaseConnection,
    subdivision_id: Option<i64>,
) -> Result<Vec<PayerListing>> {
    let mut query = Payer::find()
        .order_by_desc(payer::Column::CreatedAt)
        .order_by_desc(payer::Column::Id);
    if let Some(subdivision_id) = subdivision_id {
        query = query.filter(payer::Column::SubdivisionId.eq(subdivision_id));
    }
    let payers = query.all(db).await?;

    let ids: Vec<i64> = payers.iter().map(|p| p.id).collect();
    let mut names_by_payer: HashMap<i64, Vec<payer_name::Model>> = HashMap::new();
    for name in PayerName::find()
        .filter(payer_name::Column::PayerId.is_in(ids))
        .order_by_asc(payer_name::Column::Id)
        .all(db)
        .await?
    {
        names_by_payer.entry(name.payer_id).or_default().push(name);
    }

    let subdivisions: HashMap<i64, subdivision::Model> = Subdivision::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let users: HashMap<i64, user::Model> = User::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(payers
        .into_iter()
        .map(|payer| PayerListing {
            names: names_by_payer.remove(&payer.id).unwrap_or_default(),
            subdivision_number: subdivisions
                .get(&payer.subdivision_id)
                .map(|s| s.number.clone()),
            recorded_by_name: users.get(&payer.recorded_by).map(|u| u.name.clone()),
            payer,
        })
        .collect())
}

/// Joins a payer's names for display ("Ahmad, Siti").
#[must_use]
pub fn display_names(names: &[payer_name::Model]) -> String {
    names
        .iter()
        .map(|n| n.full_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    async fn change_donations(db: &DatabaseConnection, payer_id: i64) -> Vec<donation::Model> {
        Donation::find()
            .filter(donation::Column::PayerId.eq(payer_id))
            .filter(donation::Column::Source.eq(DonationSource::Change))
            .all(db)
            .await
            .unwrap()
    }

    fn input_for(fixture: &Fixture, rate: RateSelection, headcount: i32, paid: f64) -> PayerInput {
        PayerInput {
            subdivision_id: fixture.subdivision.id,
            headcount,
            rate,
            amount_paid: paid,
            note: None,
            names: vec![PayerNameInput {
                full_name: "Ahmad".to_string(),
                patronymic: Some("bin Umar".to_string()),
                parent_name: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_payer_requires_a_name() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let input = PayerInput {
            subdivision_id: 1,
            headcount: 1,
            rate: RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
            amount_paid: 45_000.0,
            note: None,
            names: vec![PayerNameInput {
                full_name: "   ".to_string(),
                patronymic: None,
                parent_name: None,
            }],
        };

        let result = create_payer(&db, input, 1).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_money_overpayment_creates_one_change_donation() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = create_test_rate(&db, "Uang Standar", 45_000.0, 0.0).await?;

        let record = create_payer(
            &db,
            input_for(&fixture, RateSelection::Master { rate_id: rate.id }, 4, 200_000.0),
            fixture.user.id,
        )
        .await?;

        assert_eq!(record.payer.zakat_kind, ZakatKind::Money);
        assert_eq!(record.payer.money_amount, Some(180_000.0));
        assert_eq!(record.payer.rice_kg, None);
        assert_eq!(record.payer.change_amount, 20_000.0);
        assert_eq!(record.names.len(), 1);
        assert_eq!(record.names[0].patronymic.as_deref(), Some("bin Umar"));

        let donations = change_donations(&db, record.payer.id).await;
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].amount, 20_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_rice_underpayment_creates_no_donation() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = create_test_rate(&db, "Beras Standar", 45_000.0, 2.5).await?;

        let record = create_payer(
            &db,
            input_for(&fixture, RateSelection::Master { rate_id: rate.id }, 3, 100_000.0),
            fixture.user.id,
        )
        .await?;

        assert_eq!(record.payer.zakat_kind, ZakatKind::Rice);
        assert_eq!(record.payer.rice_kg, Some(7.5));
        assert_eq!(record.payer.change_amount, 0.0);
        assert!(change_donations(&db, record.payer.id).await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing_behind() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;

        let result = create_payer(
            &db,
            input_for(&fixture, RateSelection::Master { rate_id: 404 }, 2, 90_000.0),
            fixture.user.id,
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let mut bad_rt = input_for(
            &fixture,
            RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
            2,
            90_000.0,
        );
        bad_rt.subdivision_id = 999;
        assert!(create_payer(&db, bad_rt, fixture.user.id).await.is_err());

        assert_eq!(Payer::find().count(&db).await?, 0);
        assert_eq!(PayerName::find().count(&db).await?, 0);
        assert_eq!(Donation::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_converges_change_donation() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = RateSelection::Legacy {
            legacy: ZakatKind::Money,
        };
        let record = create_payer(&db, input_for(&fixture, rate, 2, 100_000.0), fixture.user.id)
            .await?;
        let id = record.payer.id;
        assert_eq!(change_donations(&db, id).await[0].amount, 10_000.0);

        // Exact payment: change gone, donation gone
        update_payer(&db, id, input_for(&fixture, rate, 2, 90_000.0)).await?;
        assert!(change_donations(&db, id).await.is_empty());

        // Overpay again: donation re-created
        update_payer(&db, id, input_for(&fixture, rate, 2, 95_000.0)).await?;
        let rows = change_donations(&db, id).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 5_000.0);

        // Change grows: same row updated
        let updated = update_payer(&db, id, input_for(&fixture, rate, 2, 120_000.0)).await?;
        let rows = change_donations(&db, id).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 30_000.0);
        assert_eq!(updated.payer.change_amount, 30_000.0);

        // Same end state as creating directly with that payment
        let direct = create_payer(&db, input_for(&fixture, rate, 2, 120_000.0), fixture.user.id)
            .await?;
        assert_eq!(direct.payer.change_amount, updated.payer.change_amount);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_names() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = RateSelection::Legacy {
            legacy: ZakatKind::Rice,
        };
        let record =
            create_payer(&db, input_for(&fixture, rate, 1, 2.5), fixture.user.id).await?;

        let mut input = input_for(&fixture, rate, 2, 5.0);
        input.names = vec![
            PayerNameInput {
                full_name: "Siti".to_string(),
                patronymic: None,
                parent_name: Some("Aminah".to_string()),
            },
            PayerNameInput {
                full_name: "Umar".to_string(),
                patronymic: None,
                parent_name: None,
            },
        ];
        let updated = update_payer(&db, record.payer.id, input).await?;

        assert_eq!(display_names(&updated.names), "Siti, Umar");
        assert_eq!(updated.payer.rice_kg, Some(5.0));
        assert_eq!(
            PayerName::find()
                .filter(payer_name::Column::PayerId.eq(record.payer.id))
                .count(&db)
                .await?,
            2
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_payer() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let input = input_for(
            &fixture,
            RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
            1,
            45_000.0,
        );
        assert!(matches!(
            update_payer(&db, 42, input).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_payer_removes_everything() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let record = create_test_payer(
            &db,
            &fixture,
            RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
            1,
            60_000.0,
        )
        .await?;
        let id = record.payer.id;
        crate::core::donation::create_manual_donation(&db, 5_000.0, Some(id), None).await?;

        delete_payer(&db, id).await?;

        assert!(Payer::find_by_id(id).one(&db).await?.is_none());
        assert_eq!(
            PayerName::find()
                .filter(payer_name::Column::PayerId.eq(id))
                .count(&db)
                .await?,
            0
        );
        assert_eq!(
            Donation::find()
                .filter(donation::Column::PayerId.eq(id))
                .count(&db)
                .await?,
            0
        );

        assert!(matches!(
            delete_payer(&db, id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_donate_change_is_one_way() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = RateSelection::Legacy {
            legacy: ZakatKind::Money,
        };
        let record = create_payer(&db, input_for(&fixture, rate, 1, 50_000.0), fixture.user.id)
            .await?;
        let id = record.payer.id;

        let donation = donate_change(&db, id).await?;
        assert_eq!(donation.amount, 5_000.0);
        assert_eq!(donation.source, DonationSource::DonatedChange);

        let payer = Payer::find_by_id(id).one(&db).await?.unwrap();
        assert_eq!(payer.change_amount, 0.0);
        assert!(change_donations(&db, id).await.is_empty());

        // Nothing left to give
        assert!(matches!(
            donate_change(&db, id).await,
            Err(Error::Validation { .. })
        ));

        // Editing with the same payment does not resurrect the donated change
        let updated = update_payer(&db, id, input_for(&fixture, rate, 1, 50_000.0)).await?;
        assert_eq!(updated.payer.change_amount, 0.0);
        assert!(change_donations(&db, id).await.is_empty());

        // Paying more yields only the new surplus
        let updated = update_payer(&db, id, input_for(&fixture, rate, 1, 60_000.0)).await?;
        assert_eq!(updated.payer.change_amount, 10_000.0);
        assert_eq!(change_donations(&db, id).await[0].amount, 10_000.0);

        assert!(matches!(
            donate_change(&db, 999).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_rice_update_ignores_rupiah_donations() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let money = RateSelection::Legacy {
            legacy: ZakatKind::Money,
        };
        let record = create_payer(&db, input_for(&fixture, money, 1, 50_000.0), fixture.user.id)
            .await?;
        let id = record.payer.id;
        donate_change(&db, id).await?;

        // 10 kg against 2.5 kg leaves 7.5 kg, untouched by the 5000 rupiah already given
        let rice = RateSelection::Legacy {
            legacy: ZakatKind::Rice,
        };
        let updated = update_payer(&db, id, input_for(&fixture, rice, 1, 10.0)).await?;
        assert_eq!(updated.payer.zakat_kind, ZakatKind::Rice);
        assert_eq!(updated.payer.change_amount, 7.5);

        let change = change_donations(&db, id).await;
        assert_eq!(change.len(), 1);
        assert_eq!(change[0].amount, 7.5);
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_donation_collects_skips() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let other_rt = create_test_subdivision(&db, "RT 09").await?;
        let rate = RateSelection::Legacy {
            legacy: ZakatKind::Money,
        };

        let with_change =
            create_payer(&db, input_for(&fixture, rate, 1, 50_000.0), fixture.user.id).await?;
        let exact =
            create_payer(&db, input_for(&fixture, rate, 1, 45_000.0), fixture.user.id).await?;
        let mut elsewhere_input = input_for(&fixture, rate, 1, 50_000.0);
        elsewhere_input.subdivision_id = other_rt.id;
        let elsewhere = create_payer(&db, elsewhere_input, fixture.user.id).await?;
        let donated_before =
            create_payer(&db, input_for(&fixture, rate, 1, 50_000.0), fixture.user.id).await?;
        donate_change(&db, donated_before.payer.id).await?;
        update_payer(
            &db,
            donated_before.payer.id,
            input_for(&fixture, rate, 1, 55_000.0),
        )
        .await?;

        let outcome = donate_change_batch(
            &db,
            fixture.subdivision.id,
            &[
                with_change.payer.id,
                exact.payer.id,
                elsewhere.payer.id,
                donated_before.payer.id,
                777,
            ],
        )
        .await?;

        assert_eq!(outcome.donated.len(), 1);
        assert_eq!(outcome.total_amount, 5_000.0);
        let skipped: Vec<i64> = outcome.skipped.iter().map(|s| s.payer_id).collect();
        assert_eq!(
            skipped,
            vec![exact.payer.id, elsewhere.payer.id, donated_before.payer.id, 777]
        );

        assert!(matches!(
            donate_change_batch(&db, fixture.subdivision.id, &[]).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_payers_joins_names_and_rt() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = RateSelection::Legacy {
            legacy: ZakatKind::Money,
        };
        let first = create_payer(&db, input_for(&fixture, rate, 1, 45_000.0), fixture.user.id)
            .await?;
        let second = create_payer(&db, input_for(&fixture, rate, 1, 45_000.0), fixture.user.id)
            .await?;

        let listing = list_payers(&db, None).await?;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].payer.id, second.payer.id);
        assert_eq!(listing[1].payer.id, first.payer.id);
        assert_eq!(listing[0].subdivision_number.as_deref(), Some("RT 01"));
        assert_eq!(listing[0].recorded_by_name.as_deref(), Some("Panitia Test"));
        assert_eq!(display_names(&listing[0].names), "Ahmad");

        let other = list_payers(&db, Some(fixture.subdivision.id + 1)).await?;
        assert!(other.is_empty());
        Ok(())
    }
}
