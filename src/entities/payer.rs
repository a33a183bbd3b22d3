//! Payer (muzakki) entity - one household payment.
//!
//! Exactly one of `rice_kg` / `money_amount` is set, matching `zakat_kind`.
//! `change_amount` is what was paid above the obligation and not yet donated.

use super::zakat_kind::ZakatKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payers")]
pub struct Model {
    /// Unique identifier for the payer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// RT the household belongs to
    pub subdivision_id: i64,
    /// Number of people the payment covers
    pub headcount: i32,
    /// Whether the obligation is counted in rice or money
    pub zakat_kind: ZakatKind,
    /// Rice obligation in kilograms (rice payers only)
    pub rice_kg: Option<f64>,
    /// Money obligation in rupiah (money payers only)
    pub money_amount: Option<f64>,
    /// Amount handed over
    pub amount_paid: f64,
    /// Change still owed back to the payer
    pub change_amount: f64,
    /// Free-form note
    pub note: Option<String>,
    /// User who recorded the payment
    pub recorded_by: i64,
    /// Master rate used for the calculation, None for the legacy constants
    pub rate_id: Option<i64>,
    /// When the payment was recorded
    pub created_at: DateTimeUtc,
    /// When the payment was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payer belongs to one RT
    #[sea_orm(
        belongs_to = "super::subdivision::Entity",
        from = "Column::SubdivisionId",
        to = "super::subdivision::Column::Id"
    )]
    Subdivision,
    /// Each payer may reference a master rate
    #[sea_orm(
        belongs_to = "super::zakat_rate::Entity",
        from = "Column::RateId",
        to = "super::zakat_rate::Column::Id",
        on_delete = "SetNull"
    )]
    ZakatRate,
    /// One payer owns many name rows
    #[sea_orm(has_many = "super::payer_name::Entity")]
    PayerNames,
    /// One payer is referenced by many donations
    #[sea_orm(has_many = "super::donation::Entity")]
    Donations,
}

impl Related<super::subdivision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subdivision.def()
    }
}

impl Related<super::zakat_rate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ZakatRate.def()
    }
}

impl Related<super::payer_name::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayerNames.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
