//! Obligation calculator - turns a headcount, a rate and a payment into an obligation and change.
//!
//! Everything here is pure: rate lookup happens in the ledger, which hands a resolved
//! [`Rate`] to [`calculate`].

use crate::{
    entities::{ZakatKind, zakat_rate},
    errors::{Error, Result},
};
use serde::{Deserialize, Serialize};

/// Rice owed per head under the legacy fixed rate, in kilograms
pub const LEGACY_RICE_KG_PER_HEAD: f64 = 2.5;

/// Money owed per head under the legacy fixed rate, in rupiah
pub const LEGACY_MONEY_PER_HEAD: f64 = 45_000.0;

/// How a payer's obligation is priced, as submitted by a client.
///
/// Either a master rate row (`{"rate_id": 3}`) or one of the legacy fixed
/// constants (`{"legacy": "rice"}`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateSelection {
    /// A row of the master rate table
    Master {
        /// Id of the master rate
        rate_id: i64,
    },
    /// The fixed per-head constants
    Legacy {
        /// Which constant to use
        legacy: ZakatKind,
    },
}

/// A rate resolved to its numbers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    /// Fixed constants; the obligation is in the same unit as the payment
    Legacy(ZakatKind),
    /// Master rate values
    Master {
        /// Price per head in rupiah
        unit_price: f64,
        /// Rice weight per head, 0 for money rates
        unit_weight_kg: f64,
    },
}

impl Rate {
    /// Rice if the rate carries a weight, money otherwise.
    #[must_use]
    pub fn kind(&self) -> ZakatKind {
        match *self {
            Self::Legacy(kind) => kind,
            Self::Master { unit_weight_kg, .. } if unit_weight_kg > 0.0 => ZakatKind::Rice,
            Self::Master { .. } => ZakatKind::Money,
        }
    }
}

impl From<&zakat_rate::Model> for Rate {
    fn from(rate: &zakat_rate::Model) -> Self {
        Self::Master {
            unit_price: rate.unit_price,
            unit_weight_kg: rate.unit_weight_kg,
        }
    }
}

/// Result of an obligation calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obligation {
    /// Whether the obligation is rice or money
    pub kind: ZakatKind,
    /// Rice owed in kilograms (rice only)
    pub rice_kg: Option<f64>,
    /// Money owed in rupiah (money only)
    pub money_amount: Option<f64>,
    /// Obligation in the unit the payment is compared against
    pub obligation: f64,
    /// Amount handed over
    pub amount_paid: f64,
    /// `max(0, amount_paid - obligation)`
    pub change_amount: f64,
}

/// Computes the obligation and change for a household.
///
/// For master rice rates the weight fixes `rice_kg` while the payment is
/// compared against the money value `headcount × unit_price`. The legacy
/// constants compare the payment against the obligation directly.
///
/// # Errors
/// Returns [`Error::Validation`] if the headcount is not positive or the
/// payment is not a positive finite number.
pub fn calculate(headcount: i32, rate: &Rate, amount_paid: f64) -> Result<Obligation> {
    if headcount <= 0 {
        return Err(Error::validation("Headcount must be greater than 0"));
    }
    if !amount_paid.is_finite() || amount_paid <= 0.0 {
        return Err(Error::validation("Amount paid must be greater than 0"));
    }

    let heads = f64::from(headcount);
    let kind = rate.kind();

    let (rice_kg, money_amount, obligation) = match (*rate, kind) {
        (Rate::Legacy(_), ZakatKind::Rice) => {
            let kg = heads * LEGACY_RICE_KG_PER_HEAD;
            (Some(kg), None, kg)
        }
        (Rate::Legacy(_), ZakatKind::Money) => {
            let money = heads * LEGACY_MONEY_PER_HEAD;
            (None, Some(money), money)
        }
        (
            Rate::Master {
                unit_price,
                unit_weight_kg,
            },
            ZakatKind::Rice,
        ) => (Some(heads * unit_weight_kg), None, heads * unit_price),
        (Rate::Master { unit_price, .. }, ZakatKind::Money) => {
            let money = heads * unit_price;
            (None, Some(money), money)
        }
    };

    Ok(Obligation {
        kind,
        rice_kg,
        money_amount,
        obligation,
        amount_paid,
        change_amount: change_for(amount_paid, obligation),
    })
}

/// `max(0, paid - obligation)`
#[must_use]
pub fn change_for(amount_paid: f64, obligation: f64) -> f64 {
    (amount_paid - obligation).max(0.0)
}
