//! Disbursement (distribusi zakat) entity.
//!
//! Every disbursement starts `pending`. Only `pending` and `cancelled` rows may be
//! deleted, and `cancelled` rows no longer count against the available balance.

use super::zakat_kind::ZakatKind;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Disbursement database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "disbursements")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Receiving beneficiary
    pub beneficiary_id: i64,
    /// Whether rice or money is handed out
    pub kind: ZakatKind,
    /// Kilograms for rice, rupiah for money
    pub amount: f64,
    /// Lifecycle state
    pub status: DisbursementStatus,
    /// Stored file name of the proof photo, if one was uploaded
    pub proof_photo: Option<String>,
    /// User who recorded the disbursement
    pub recorded_by: i64,
    /// When the disbursement was recorded
    pub created_at: DateTimeUtc,
    /// When the disbursement was last modified
    pub updated_at: DateTimeUtc,
}

/// Lifecycle state of a disbursement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum DisbursementStatus {
    /// Recorded, not yet handed out
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Handed out by the committee
    #[sea_orm(string_value = "disbursed")]
    Disbursed,
    /// Confirmed received by the beneficiary
    #[sea_orm(string_value = "received")]
    Received,
    /// Withdrawn; no longer counts against availability
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DisbursementStatus {
    /// Wire name of the status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Disbursed => "disbursed",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a disbursement in this state may still be deleted.
    #[must_use]
    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::Pending | Self::Cancelled)
    }
}

impl fmt::Display for DisbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisbursementStatus {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "disbursed" | "disalurkan" => Ok(Self::Disbursed),
            "received" | "diterima" => Ok(Self::Received),
            "cancelled" | "batal" => Ok(Self::Cancelled),
            other => Err(crate::errors::Error::validation(format!(
                "Invalid disbursement status '{other}'"
            ))),
        }
    }
}

/// Defines relationships between Disbursement and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each disbursement goes to one beneficiary
    #[sea_orm(
        belongs_to = "super::beneficiary::Entity",
        from = "Column::BeneficiaryId",
        to = "super::beneficiary::Column::Id"
    )]
    Beneficiary,
}

impl Related<super::beneficiary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Beneficiary.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
