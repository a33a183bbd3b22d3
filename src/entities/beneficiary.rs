//! Beneficiary (mustahik) entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Beneficiary database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "beneficiaries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// RT the beneficiary lives in, if known
    pub subdivision_id: Option<i64>,
    /// Beneficiary name
    pub name: String,
    /// Eligibility category (fakir, miskin, amil, ...)
    pub category: String,
    /// When the beneficiary was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Beneficiary and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each beneficiary may belong to one RT
    #[sea_orm(
        belongs_to = "super::subdivision::Entity",
        from = "Column::SubdivisionId",
        to = "super::subdivision::Column::Id"
    )]
    Subdivision,
    /// One beneficiary receives many disbursements
    #[sea_orm(has_many = "super::disbursement::Entity")]
    Disbursements,
}

impl Related<super::subdivision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subdivision.def()
    }
}

impl Related<super::disbursement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disbursements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
