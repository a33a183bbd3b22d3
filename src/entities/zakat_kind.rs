//! Zakat kind - whether an obligation or a disbursement is counted in rice or money.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Unit a zakat amount is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ZakatKind {
    /// Counted in kilograms of rice
    #[sea_orm(string_value = "rice")]
    #[serde(alias = "beras")]
    Rice,
    /// Counted in rupiah
    #[sea_orm(string_value = "money")]
    #[serde(alias = "uang")]
    Money,
}

impl ZakatKind {
    /// Wire name of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rice => "rice",
            Self::Money => "money",
        }
    }
}

impl fmt::Display for ZakatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZakatKind {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rice" | "beras" => Ok(Self::Rice),
            "money" | "uang" => Ok(Self::Money),
            other => Err(crate::errors::Error::validation(format!(
                "Unknown zakat kind '{other}', expected rice or money"
            ))),
        }
    }
}
