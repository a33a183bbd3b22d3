//! Payer name entity - the individual people covered by one household payment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payer name database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payer_names")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning payer
    pub payer_id: i64,
    /// Full name of the person
    pub full_name: String,
    /// Patronymic ("bin"/"binti" name), if recorded
    pub patronymic: Option<String>,
    /// Parent name, if recorded
    pub parent_name: Option<String>,
}

/// Defines relationships between `PayerName` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each name belongs to one payer
    #[sea_orm(
        belongs_to = "super::payer::Entity",
        from = "Column::PayerId",
        to = "super::payer::Column::Id",
        on_delete = "Cascade"
    )]
    Payer,
}

impl Related<super::payer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
