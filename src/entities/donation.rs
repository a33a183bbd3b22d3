//! Donation (infak) entity.
//!
//! `source` says where the money came from. A `change` row mirrors the payer's
//! current `change_amount` and there is at most one per payer; `donated_change`
//! rows are produced when a payer gives up their change; `manual` rows are
//! free-standing donations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Donation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Payer the donation came from, if any
    pub payer_id: Option<i64>,
    /// Origin of the donation
    pub source: DonationSource,
    /// Amount in rupiah
    pub amount: f64,
    /// Free-form note
    pub note: Option<String>,
    /// When the donation was recorded
    pub created_at: DateTimeUtc,
}

/// Where a donation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DonationSource {
    /// Entered directly
    #[sea_orm(string_value = "manual")]
    Manual,
    /// Tracks the payer's outstanding change
    #[sea_orm(string_value = "change")]
    Change,
    /// Change the payer chose to give up
    #[sea_orm(string_value = "donated_change")]
    DonatedChange,
}

/// Defines relationships between Donation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A donation may reference one payer
    #[sea_orm(
        belongs_to = "super::payer::Entity",
        from = "Column::PayerId",
        to = "super::payer::Column::Id"
    )]
    Payer,
}

impl Related<super::payer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
