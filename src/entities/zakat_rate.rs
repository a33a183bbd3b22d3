//! Master zakat rate entity - selectable obligation rates.
//!
//! A rate with `unit_weight_kg > 0` is rice-denominated (the weight is the per-head
//! obligation and `unit_price` its money valuation); otherwise it is money-denominated.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Master zakat rate database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "master_zakat_rates")]
pub struct Model {
    /// Unique identifier for the rate
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Beras Standar")
    pub name: String,
    /// Price per head in rupiah
    pub unit_price: f64,
    /// Rice weight per head in kilograms, 0 for money rates
    pub unit_weight_kg: f64,
    /// User who created the rate
    pub created_by: Option<i64>,
    /// User who last modified the rate
    pub updated_by: Option<i64>,
    /// When the rate was created
    pub created_at: DateTimeUtc,
    /// When the rate was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Rice rates carry a positive per-head weight.
    #[must_use]
    pub fn is_rice(&self) -> bool {
        self.unit_weight_kg > 0.0
    }
}

/// Defines relationships between rates and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One rate is referenced by many payers
    #[sea_orm(has_many = "super::payer::Entity")]
    Payers,
}

impl Related<super::payer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
