//! Seed data loading from config.toml
//!
//! The master zakat rates listed in config.toml are inserted on first run, when
//! the rates table is still empty. Without a config file the two standard
//! rates (rice 2.5 kg and money Rp 45.000 per head) are used.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct SeedConfig {
    /// Master rates to seed
    #[serde(default = "default_rates")]
    pub rates: Vec<RateConfig>,
}

/// Configuration for a single master rate
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RateConfig {
    /// Display name of the rate
    pub name: String,
    /// Price per head in rupiah
    pub unit_price: f64,
    /// Rice weight per head, 0 for money rates
    #[serde(default)]
    pub unit_weight_kg: f64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            rates: default_rates(),
        }
    }
}

fn default_rates() -> Vec<RateConfig> {
    vec![
        RateConfig {
            name: "Beras Standar".to_string(),
            unit_price: 45_000.0,
            unit_weight_kg: 2.5,
        },
        RateConfig {
            name: "Uang Standar".to_string(),
            unit_price: 45_000.0,
            unit_weight_kg: 0.0,
        },
    ]
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No seed file at {:?}, using built-in rates", path);
        return Ok(SeedConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_rate_config() {
        let toml_str = r#"
            [[rates]]
            name = "Beras Premium"
            unit_price = 50000
            unit_weight_kg = 3.5

            [[rates]]
            name = "Uang"
            unit_price = 47000.0
        "#;

        let config: SeedConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.rates.len(), 2);
        assert_eq!(config.rates[0].name, "Beras Premium");
        assert_eq!(config.rates[0].unit_weight_kg, 3.5);
        assert_eq!(config.rates[1].unit_weight_kg, 0.0);
    }

    #[test]
    fn test_missing_file_yields_standard_rates() {
        let config = load_config("definitely/not/here.toml").unwrap();
        assert_eq!(config.rates.len(), 2);
        assert_eq!(config.rates[0].unit_weight_kg, 2.5);
        assert_eq!(config.rates[1].unit_price, 45_000.0);
    }

    #[test]
    fn test_empty_file_yields_standard_rates() {
        let config: SeedConfig = toml::from_str("").unwrap();
        assert_eq!(config.rates, default_rates());
    }
}
