//! Group (RW) entity - the block an RT belongs to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// RW database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rw_groups")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// RW number as written locally (e.g., "RW 01")
    #[sea_orm(unique)]
    pub number: String,
    /// Name of the RW head
    pub leader: String,
    /// Free-form note
    pub note: Option<String>,
    /// When the RW was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between RW and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One RW contains many RTs
    #[sea_orm(has_many = "super::subdivision::Entity")]
    Subdivisions,
}

impl Related<super::subdivision::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subdivisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
