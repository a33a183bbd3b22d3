//! Runtime settings loaded from environment variables.
//!
//! Every setting has a default so the service starts with nothing but a `.env`
//! file (or nothing at all). Values that are present but unparseable are a
//! configuration error rather than being silently replaced by the default.

use crate::{
    core::disbursement::TransitionPolicy,
    errors::{Error, Result},
};
use std::{net::SocketAddr, path::PathBuf, str::FromStr};

/// Default SQLite location, created on first start
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/zakat_fitrah.sqlite?mode=rwc";

/// Application configuration shared by the HTTP layer and startup code
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database connection string
    pub database_url: String,
    /// Maximum pooled database connections
    pub db_pool_size: u32,
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Directory proof photos are stored in
    pub upload_dir: PathBuf,
    /// Directory uploads wait in until their row commits; never served
    pub upload_staging_dir: PathBuf,
    /// Lifetime of a login session in hours
    pub session_ttl_hours: i64,
    /// Whether the session cookie is marked `Secure`
    pub session_cookie_secure: bool,
    /// Rupiah value of one kilogram of rice, used by reports
    pub rice_price_per_kg: f64,
    /// Which disbursement status transitions are accepted
    pub transition_policy: TransitionPolicy,
    /// Path to the seed data file
    pub config_path: PathBuf,
    /// Bootstrap administrator, created when no user exists yet
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Credentials for the first administrator account
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    /// Display name
    pub name: String,
    /// Login phone number
    pub phone: String,
    /// Plain-text password, hashed before storage
    pub password: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_pool_size: 10,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            upload_dir: PathBuf::from("public/uploads/distribusi"),
            upload_staging_dir: PathBuf::from("storage/upload-staging"),
            session_ttl_hours: 24,
            session_cookie_secure: false,
            rice_price_per_kg: 12_000.0,
            transition_policy: TransitionPolicy::Permissive,
            config_path: PathBuf::from("config.toml"),
            bootstrap_admin: None,
        }
    }
}

impl AppConfig {
    /// Builds the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Split out from [`AppConfig::from_env`] so parsing can be tested without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bootstrap_admin = match (lookup("ADMIN_PHONE"), lookup("ADMIN_PASSWORD")) {
            (Some(phone), Some(password)) => Some(BootstrapAdmin {
                name: lookup("ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
                phone,
                password,
            }),
            _ => None,
        };

        let upload_dir = lookup("UPLOAD_DIR").map_or(defaults.upload_dir, PathBuf::from);
        let upload_staging_dir =
            lookup("UPLOAD_STAGING_DIR").map_or(defaults.upload_staging_dir, PathBuf::from);
        if upload_staging_dir.starts_with(&upload_dir) {
            return Err(Error::Config {
                message: "UPLOAD_STAGING_DIR must not be inside the served UPLOAD_DIR".to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            db_pool_size: parse_or(&lookup, "DB_POOL_SIZE", defaults.db_pool_size)?,
            listen_addr: parse_or(&lookup, "LISTEN_ADDR", defaults.listen_addr)?,
            upload_dir,
            upload_staging_dir,
            session_ttl_hours: parse_or(&lookup, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            session_cookie_secure: parse_or(
                &lookup,
                "SESSION_COOKIE_SECURE",
                defaults.session_cookie_secure,
            )?,
            rice_price_per_kg: parse_or(&lookup, "RICE_PRICE_PER_KG", defaults.rice_price_per_kg)?,
            transition_policy: parse_or(
                &lookup,
                "DISBURSEMENT_TRANSITIONS",
                defaults.transition_policy,
            )?,
            config_path: lookup("CONFIG_PATH").map_or(defaults.config_path, PathBuf::from),
            bootstrap_admin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| Error::Config {
            message: format!("Invalid value for {key} ('{raw}'): {e}"),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.db_pool_size, 10);
        assert!(!config.upload_staging_dir.starts_with(&config.upload_dir));
        assert_eq!(config.session_ttl_hours, 24);
        assert!(!config.session_cookie_secure);
        assert_eq!(config.rice_price_per_kg, 12_000.0);
        assert_eq!(config.transition_policy, TransitionPolicy::Permissive);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DB_POOL_SIZE", "4"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("DISBURSEMENT_TRANSITIONS", "strict"),
            ("ADMIN_PHONE", "08123"),
            ("ADMIN_PASSWORD", "rahasia"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.db_pool_size, 4);
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.transition_policy, TransitionPolicy::Strict);
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.phone, "08123");
        assert_eq!(admin.name, "Administrator");
    }

    #[test]
    fn test_staging_inside_served_dir_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("UPLOAD_DIR", "public/uploads"),
            ("UPLOAD_STAGING_DIR", "public/uploads/.staging"),
        ]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_unparseable_value_is_a_config_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("DB_POOL_SIZE", "many")]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
