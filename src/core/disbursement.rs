//! Disbursement (distribusi) business logic.
//!
//! The [`Allocator`] guards every write that can reduce the available balance:
//! creating a disbursement and reviving a cancelled one. It holds an async
//! mutex for the whole check-then-write and runs both steps in one database
//! transaction, so two requests can never both spend the same balance.

use crate::{
    core::upload::{PhotoStore, StagedPhoto},
    entities::{
        Beneficiary, Disbursement, DisbursementStatus, Payer, Subdivision, User, ZakatKind,
        beneficiary, disbursement, payer, subdivision,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Amounts within this distance are treated as equal when checking availability
const AMOUNT_TOLERANCE: f64 = 1e-6;

/// Label used for beneficiaries without an RT in reports
pub const NO_SUBDIVISION_LABEL: &str = "Tidak Ada RT";

/// Which status changes are accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may move to any other
    #[default]
    Permissive,
    /// pending → disbursed → received, cancellation only from pending or disbursed
    Strict,
}

impl TransitionPolicy {
    /// Whether moving from `from` to `to` is allowed. Staying put always is.
    #[must_use]
    pub fn allows(self, from: DisbursementStatus, to: DisbursementStatus) -> bool {
        use DisbursementStatus::{Cancelled, Disbursed, Pending, Received};

        if from == to {
            return true;
        }
        match self {
            Self::Permissive => true,
            Self::Strict => matches!(
                (from, to),
                (Pending, Disbursed) | (Disbursed, Received) | (Pending | Disbursed, Cancelled)
            ),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permissive => f.write_str("permissive"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(Error::Config {
                message: format!("Unknown transition policy '{other}' (expected permissive or strict)"),
            }),
        }
    }
}

/// Fields a client submits to create a disbursement
#[derive(Debug, Clone, Deserialize)]
pub struct DisbursementInput {
    /// Receiving beneficiary
    pub beneficiary_id: i64,
    /// Rice or money
    pub kind: ZakatKind,
    /// Kilograms for rice, rupiah for money
    pub amount: f64,
}

/// Balance of one zakat kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Availability {
    /// Rice or money
    pub kind: ZakatKind,
    /// Everything collected from payers
    pub collected: f64,
    /// Everything handed out, cancelled disbursements excluded
    pub distributed: f64,
    /// `collected - distributed`
    pub available: f64,
}

/// Computes the balance of `kind` from the current rows.
///
/// Collected rice is the sum of `payer.rice_kg`, collected money the sum of
/// `payer.money_amount`; cancelled disbursements do not count.
pub async fn available<C>(db: &C, kind: ZakatKind) -> Result<Availability>
where
    C: ConnectionTrait,
{
    let payers = Payer::find()
        .filter(payer::Column::ZakatKind.eq(kind))
        .all(db)
        .await?;
    let collected: f64 = payers
        .iter()
        .map(|p| match kind {
            ZakatKind::Rice => p.rice_kg.unwrap_or(0.0),
            ZakatKind::Money => p.money_amount.unwrap_or(0.0),
        })
        .sum();

    let distributed: f64 = Disbursement::find()
        .filter(disbursement::Column::Kind.eq(kind))
        .filter(disbursement::Column::Status.ne(DisbursementStatus::Cancelled))
        .all(db)
        .await?
        .iter()
        .map(|d| d.amount)
        .sum();

    Ok(Availability {
        kind,
        collected,
        distributed,
        available: collected - distributed,
    })
}

fn exceeds(amount: f64, balance: &Availability) -> bool {
    amount - balance.available > AMOUNT_TOLERANCE
}

fn insufficient(amount: f64, balance: &Availability) -> Error {
    let unit = match balance.kind {
        ZakatKind::Rice => " kg",
        ZakatKind::Money => "",
    };
    Error::validation(format!(
        "Only {:.2}{unit} of {} is available, {amount:.2}{unit} requested",
        balance.available, balance.kind
    ))
}

/// Serializes availability-gated writes
#[derive(Debug, Default)]
pub struct Allocator {
    lock: Mutex<()>,
    policy: TransitionPolicy,
}

impl Allocator {
    /// New allocator enforcing `policy` on status changes
    #[must_use]
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            lock: Mutex::new(()),
            policy,
        }
    }

    /// The status transition policy in force
    #[must_use]
    pub const fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Creates a `pending` disbursement if the balance allows it.
    ///
    /// # Errors
    /// [`Error::Validation`] when the amount is not positive, the beneficiary
    /// does not exist, or the amount exceeds what is available. No row is
    /// written in any of these cases.
    #[instrument(skip(self, db, input, proof_photo), fields(kind = %input.kind, amount = input.amount))]
    pub async fn create(
        &self,
        db: &DatabaseConnection,
        input: DisbursementInput,
        recorded_by: i64,
        proof_photo: Option<String>,
    ) -> Result<disbursement::Model> {
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(Error::validation("Disbursement amount must be greater than 0"));
        }

        let _guard = self.lock.lock().await;
        let txn = db.begin().await?;

        if Beneficiary::find_by_id(input.beneficiary_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(Error::validation(format!(
                "Beneficiary {} does not exist",
                input.beneficiary_id
            )));
        }

        let balance = available(&txn, input.kind).await?;
        if exceeds(input.amount, &balance) {
            warn!(
                available = balance.available,
                "Rejected disbursement exceeding balance"
            );
            return Err(insufficient(input.amount, &balance));
        }

        let now = chrono::Utc::now();
        let row = disbursement::ActiveModel {
            beneficiary_id: Set(input.beneficiary_id),
            kind: Set(input.kind),
            amount: Set(input.amount),
            status: Set(DisbursementStatus::Pending),
            proof_photo: Set(proof_photo),
            recorded_by: Set(recorded_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(
            disbursement_id = row.id,
            remaining = balance.available - row.amount,
            "Created disbursement"
        );
        Ok(row)
    }

    /// Creates a disbursement and finalizes its staged photo.
    ///
    /// The photo is promoted only after the row commits and discarded if the
    /// row is rejected.
    pub async fn create_with_photo(
        &self,
        db: &DatabaseConnection,
        photos: &PhotoStore,
        input: DisbursementInput,
        recorded_by: i64,
        photo: Option<StagedPhoto>,
    ) -> Result<disbursement::Model> {
        let file_name = photo.as_ref().map(|p| p.file_name().to_string());
        match self.create(db, input, recorded_by, file_name).await {
            Ok(row) => {
                if let Some(photo) = photo {
                    photos.promote(photo).await?;
                }
                Ok(row)
            }
            Err(e) => {
                if let Some(photo) = photo {
                    photos.discard(photo).await;
                }
                Err(e)
            }
        }
    }

    /// Changes a disbursement's status.
    ///
    /// # Errors
    /// [`Error::Validation`] for an unknown status or when reviving a
    /// cancelled disbursement would exceed the balance,
    /// [`Error::Conflict`] when the transition policy forbids the change,
    /// [`Error::NotFound`] for an unknown id.
    #[instrument(skip(self, db))]
    pub async fn update_status(
        &self,
        db: &DatabaseConnection,
        disbursement_id: i64,
        status: &str,
    ) -> Result<disbursement::Model> {
        let target: DisbursementStatus = status.parse()?;

        let _guard = self.lock.lock().await;
        let txn = db.begin().await?;

        let row = Disbursement::find_by_id(disbursement_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Disbursement", disbursement_id))?;
        let current = row.status;

        if !self.policy.allows(current, target) {
            return Err(Error::conflict(format!(
                "Cannot change status from {current} to {target}"
            )));
        }

        if current == DisbursementStatus::Cancelled && target != DisbursementStatus::Cancelled {
            let balance = available(&txn, row.kind).await?;
            if exceeds(row.amount, &balance) {
                warn!(disbursement_id, "Rejected revival exceeding balance");
                return Err(insufficient(row.amount, &balance));
            }
        }

        let mut active: disbursement::ActiveModel = row.into();
        active.status = Set(target);
        active.updated_at = Set(chrono::Utc::now());
        let row = active.update(&txn).await?;

        txn.commit().await?;

        info!(disbursement_id, from = %current, to = %target, "Updated disbursement status");
        Ok(row)
    }
}

/// Deletes a pending or cancelled disbursement and its photo.
///
/// Returns the deleted row.
///
/// # Errors
/// [`Error::Conflict`] once the disbursement was handed out or received.
#[instrument(skip(db, photos))]
pub async fn delete_disbursement(
    db: &DatabaseConnection,
    photos: &PhotoStore,
    disbursement_id: i64,
) -> Result<disbursement::Model> {
    let row = Disbursement::find_by_id(disbursement_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Disbursement", disbursement_id))?;

    if !row.status.is_deletable() {
        return Err(Error::conflict(
            "Only pending or cancelled disbursements can be deleted",
        ));
    }

    row.clone().delete(db).await?;
    if let Some(photo) = &row.proof_photo {
        photos.remove(photo).await;
    }

    info!(disbursement_id, "Deleted disbursement");
    Ok(row)
}

/// Replaces a disbursement's proof photo.
///
/// The new photo is promoted and the old file deleted only after the row
/// update commits; if the update fails the staged photo is discarded.
#[instrument(skip(db, photos, photo))]
pub async fn replace_proof_photo(
    db: &DatabaseConnection,
    photos: &PhotoStore,
    disbursement_id: i64,
    photo: StagedPhoto,
) -> Result<disbursement::Model> {
    let updated = async {
        let row = Disbursement::find_by_id(disbursement_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Disbursement", disbursement_id))?;
        let previous = row.proof_photo.clone();

        let mut active: disbursement::ActiveModel = row.into();
        active.proof_photo = Set(Some(photo.file_name().to_string()));
        active.updated_at = Set(chrono::Utc::now());
        let row = active.update(db).await?;
        Ok::<_, Error>((row, previous))
    }
    .await;

    match updated {
        Ok((row, previous)) => {
            photos.promote(photo).await?;
            if let Some(previous) = previous {
                photos.remove(&previous).await;
            }
            info!(disbursement_id, "Replaced proof photo");
            Ok(row)
        }
        Err(e) => {
            photos.discard(photo).await;
            error!(disbursement_id, error = %e, "Proof photo update failed");
            Err(e)
        }
    }
}

/// A disbursement as shown in listings
#[derive(Debug, Clone, Serialize)]
pub struct DisbursementListing {
    /// The disbursement row
    #[serde(flatten)]
    pub disbursement: disbursement::Model,
    /// Beneficiary name
    pub beneficiary_name: Option<String>,
    /// Beneficiary category
    pub beneficiary_category: Option<String>,
    /// RT of the beneficiary
    pub subdivision_number: Option<String>,
    /// Name of the recording user
    pub recorded_by_name: Option<String>,
}

struct Lookups {
    beneficiaries: HashMap<i64, beneficiary::Model>,
    subdivisions: HashMap<i64, subdivision::Model>,
    users: HashMap<i64, String>,
}

impl Lookups {
    async fn load(db: &DatabaseConnection) -> Result<Self> {
        Ok(Self {
            beneficiaries: Beneficiary::find()
                .all(db)
                .await?
                .into_iter()
                .map(|b| (b.id, b))
                .collect(),
            subdivisions: Subdivision::find()
                .all(db)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect(),
            users: User::find()
                .all(db)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect(),
        })
    }

    fn listing(&self, disbursement: disbursement::Model) -> DisbursementListing {
        let beneficiary = self.beneficiaries.get(&disbursement.beneficiary_id);
        DisbursementListing {
            beneficiary_name: beneficiary.map(|b| b.name.clone()),
            beneficiary_category: beneficiary.map(|b| b.category.clone()),
            subdivision_number: beneficiary
                .and_then(|b| b.subdivision_id)
                .and_then(|id| self.subdivisions.get(&id))
                .map(|s| s.number.clone()),
            recorded_by_name: self.users.get(&disbursement.recorded_by).cloned(),
            disbursement,
        }
    }
}

/// Lists all disbursements newest first.
pub async fn list_disbursements(db: &DatabaseConnection) -> Result<Vec<DisbursementListing>> {
    let rows = Disbursement::find()
        .order_by_desc(disbursement::Column::CreatedAt)
        .order_by_desc(disbursement::Column::Id)
        .all(db)
        .await?;
    let lookups = Lookups::load(db).await?;
    Ok(rows.into_iter().map(|d| lookups.listing(d)).collect())
}

/// Loads one disbursement with its beneficiary details.
pub async fn get_disbursement(
    db: &DatabaseConnection,
    disbursement_id: i64,
) -> Result<Option<DisbursementListing>> {
    let Some(row) = Disbursement::find_by_id(disbursement_id).one(db).await? else {
        return Ok(None);
    };
    let lookups = Lookups::load(db).await?;
    Ok(Some(lookups.listing(row)))
}

/// Disbursements of one beneficiary, newest first.
pub async fn list_for_beneficiary<C>(db: &C, beneficiary_id: i64) -> Result<Vec<disbursement::Model>>
where
    C: ConnectionTrait,
{
    Disbursement::find()
        .filter(disbursement::Column::BeneficiaryId.eq(beneficiary_id))
        .order_by_desc(disbursement::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Counts and totals over every disbursement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisbursementStats {
    /// Number of disbursements
    pub total: u64,
    /// Rice handed out, in kilograms
    pub total_rice_kg: f64,
    /// Money handed out, in rupiah
    pub total_money: f64,
    /// Disbursements still pending
    pub pending: u64,
    /// Disbursements handed out
    pub disbursed: u64,
    /// Disbursements confirmed received
    pub received: u64,
    /// Disbursements cancelled
    pub cancelled: u64,
}

/// Computes [`DisbursementStats`] over all rows, cancelled ones included.
pub async fn stats(db: &DatabaseConnection) -> Result<DisbursementStats> {
    let rows = Disbursement::find().all(db).await?;
    Ok(rows.iter().fold(DisbursementStats::default(), |mut acc, d| {
        acc.total += 1;
        match d.kind {
            ZakatKind::Rice => acc.total_rice_kg += d.amount,
            ZakatKind::Money => acc.total_money += d.amount,
        }
        match d.status {
            DisbursementStatus::Pending => acc.pending += 1,
            DisbursementStatus::Disbursed => acc.disbursed += 1,
            DisbursementStatus::Received => acc.received += 1,
            DisbursementStatus::Cancelled => acc.cancelled += 1,
        }
        acc
    }))
}

/// Totals for one beneficiary category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals {
    /// Beneficiary category
    pub category: String,
    /// Number of disbursements
    pub count: u64,
    /// Rice handed out, in kilograms
    pub rice_kg: f64,
    /// Money handed out, in rupiah
    pub money: f64,
    /// Disbursements confirmed received
    pub received: u64,
    /// Disbursements still pending
    pub pending: u64,
}

/// Totals for one RT
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubdivisionTotals {
    /// RT number, or a placeholder for beneficiaries without an RT
    pub subdivision: String,
    /// Number of disbursements
    pub count: u64,
    /// Rice handed out, in kilograms
    pub rice_kg: f64,
    /// Money handed out, in rupiah
    pub money: f64,
}

/// Disbursement report grouped by category and by RT
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisbursementReport {
    /// One entry per beneficiary category, ordered by category
    pub by_category: Vec<CategoryTotals>,
    /// One entry per RT with beneficiaries, ordered by RT number
    pub by_subdivision: Vec<SubdivisionTotals>,
}

/// Builds the disbursement report. Cancelled disbursements are left out;
/// categories and RTs whose beneficiaries received nothing still appear.
pub async fn report(db: &DatabaseConnection) -> Result<DisbursementReport> {
    let lookups = Lookups::load(db).await?;
    let rows = Disbursement::find()
        .filter(disbursement::Column::Status.ne(DisbursementStatus::Cancelled))
        .all(db)
        .await?;

    let mut categories: BTreeMap<String, CategoryTotals> = BTreeMap::new();
    let mut subdivisions: BTreeMap<String, SubdivisionTotals> = BTreeMap::new();

    for beneficiary in lookups.beneficiaries.values() {
        let category = beneficiary.category.clone();
        categories
            .entry(category.clone())
            .or_insert_with(|| CategoryTotals {
                category,
                ..Default::default()
            });
        let label = subdivision_label(&lookups, beneficiary);
        subdivisions
            .entry(label.clone())
            .or_insert_with(|| SubdivisionTotals {
                subdivision: label,
                ..Default::default()
            });
    }

    for row in rows {
        let Some(beneficiary) = lookups.beneficiaries.get(&row.beneficiary_id) else {
            continue;
        };

        if let Some(totals) = categories.get_mut(&beneficiary.category) {
            totals.count += 1;
            match row.kind {
                ZakatKind::Rice => totals.rice_kg += row.amount,
                ZakatKind::Money => totals.money += row.amount,
            }
            match row.status {
                DisbursementStatus::Received => totals.received += 1,
                DisbursementStatus::Pending => totals.pending += 1,
                DisbursementStatus::Disbursed | DisbursementStatus::Cancelled => {}
            }
        }

        if let Some(totals) = subdivisions.get_mut(&subdivision_label(&lookups, beneficiary)) {
            totals.count += 1;
            match row.kind {
                ZakatKind::Rice => totals.rice_kg += row.amount,
                ZakatKind::Money => totals.money += row.amount,
            }
        }
    }

    Ok(DisbursementReport {
        by_category: categories.into_values().collect(),
        by_subdivision: subdivisions.into_values().collect(),
    })
}

fn subdivision_label(lookups: &Lookups, beneficiary: &beneficiary::Model) -> String {
    beneficiary
        .subdivision_id
        .and_then(|id| lookups.subdivisions.get(&id))
        .map_or_else(|| NO_SUBDIVISION_LABEL.to_string(), |s| s.number.clone())
}
