//! Application configuration loaded from `config.toml`.
//!
//! Every section is optional; a missing file or an empty file yields the defaults.
//!
//! ```toml
//! [database]
//! url = "sqlite://data/yield_ledger.sqlite?mode=rwc"
//!
//! [sweeper]
//! interval_secs = 3600
//!
//! [limits]
//! min_deposit = 1
//! max_deposit = 1000000
//! min_withdrawal = 1
//!
//! [seed.admin]
//! email = "admin@example.com"
//! full_name = "System Administrator"
//!
//! [[seed.plans]]
//! title = "Basic Plan"
//! description = "Low risk, steady returns."
//! price = 100
//! roi_percent = 10.0
//! duration_days = 30
//! ```

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::core::amount::Amount;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Maturity sweeper schedule
    pub sweeper: SweeperConfig,
    /// Bounds on deposit and withdrawal requests
    pub limits: Limits,
    /// Bootstrap admin and plan catalogue
    pub seed: SeedConfig,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SeaORM` connection URL; `DATABASE_URL` overrides it
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// `[sweeper]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Seconds between two maturity sweeps in `sweeper` mode
    pub interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

/// Bounds applied to deposit and withdrawal requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Smallest deposit a user may request
    pub min_deposit: Amount,
    /// Largest deposit a user may request
    pub max_deposit: Amount,
    /// Smallest withdrawal a user may request
    pub min_withdrawal: Amount,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_deposit: Amount::from_units(1),
            max_deposit: Amount::from_units(1_000_000),
            min_withdrawal: Amount::from_units(1),
        }
    }
}

/// Data created by `init` when the database is empty
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Admin account created when no ADMIN exists yet
    pub admin: Option<SeedAdmin>,
    /// Plans created when no plan with the same title exists
    pub plans: Vec<SeedPlan>,
}

/// The bootstrap admin account
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    /// Login e-mail
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Optional contact phone
    #[serde(default)]
    pub phone: Option<String>,
}

/// One plan of the bootstrap catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct SeedPlan {
    /// Unique display title
    pub title: String,
    /// Marketing description
    pub description: String,
    /// Purchase price
    pub price: Amount,
    /// Return at maturity, in percent of the price
    pub roi_percent: f64,
    /// Lock period in days
    pub duration_days: i32,
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value has the wrong type (e.g. an amount with three decimals)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Like [`load_config`], but a missing file yields the default configuration.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        tracing::info!(
            "No config file at {}, using defaults",
            path_ref.display()
        );
        Ok(AppConfig::default())
    }
}
