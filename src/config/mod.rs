/// Database configuration and connection management
pub mod database;

/// Master rate seed data from config.toml
pub mod rates;

/// Runtime settings from environment variables
pub mod settings;

pub use settings::AppConfig;
