//! Subdivision (RT) entity - the neighbourhood unit payers and beneficiaries live in.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// RT database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subdivisions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// RT number as written locally (e.g., "RT 03")
    #[sea_orm(unique)]
    pub number: String,
    /// Name of the RT head
    pub leader: String,
    /// Free-form note
    pub note: Option<String>,
    /// RW this RT belongs to, if any
    pub group_id: Option<i64>,
    /// When the RT was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between RT and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each RT may belong to one RW
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// One RT has many payers
    #[sea_orm(has_many = "super::payer::Entity")]
    Payers,
    /// One RT has many beneficiaries
    #[sea_orm(has_many = "super::beneficiary::Entity")]
    Beneficiaries,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::payer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payers.def()
    }
}

impl Related<super::beneficiary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Beneficiaries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
