//! # Terminal Configuration
//!
//! Per-terminal settings. Shop-wide settings (prefix, tax rates, shop
//! name) live in the store instead; see [`crate::state::SettingsCache`].
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     DUKAAN_DB_PATH=/srv/dukaan/dukaan.db                               │
//! │     DUKAAN_INVOICE_ALLOCATION=two_phase                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $DUKAAN_CONFIG, or                                                 │
//! │     ~/.config/dukaan/dukaan.toml (Linux)                               │
//! │     ~/Library/Application Support/in.dukaan.dukaan/dukaan.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # dukaan.toml
//! [terminal]
//! name = "Counter 1"
//! user_id = "u_counter"
//! utc_offset_minutes = 330
//!
//! [store]
//! database_path = "dukaan.db"
//! max_connections = 5
//!
//! [session]
//! cart_path = "cart.json"
//!
//! [invoice]
//! allocation = "atomic"   # atomic | two_phase
//! keep_customer_after_finalize = true
//!
//! [stock]
//! decrement_on_sale = true
//! ```

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use dukaan_store::DbConfig;

use crate::error::{CheckoutError, CheckoutResult};

const CONFIG_FILE: &str = "dukaan.toml";

// =============================================================================
// Allocation Mode
// =============================================================================

/// How a new invoice gets its counter.
///
/// ```text
/// ATOMIC (default)                      TWO_PHASE
/// ────────────────                      ─────────
/// reserve = increment(counter)          c = read(counter)
/// create header (reserve)               create header (c + 1)
///                                       write counter = c + 1
///
/// • no duplicate numbers                • two terminals can read the
/// • a failed create leaves a gap          same c and issue one number
///                                         twice
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    #[default]
    Atomic,
    TwoPhase,
}

impl std::fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationMode::Atomic => write!(f, "atomic"),
            AllocationMode::TwoPhase => write!(f, "two_phase"),
        }
    }
}

impl std::str::FromStr for AllocationMode {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "atomic" => Ok(AllocationMode::Atomic),
            "two_phase" | "legacy" => Ok(AllocationMode::TwoPhase),
            other => Err(CheckoutError::Config(format!(
                "Unknown invoice allocation: '{}'. Valid options: atomic, two_phase",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    #[serde(default = "default_terminal_name")]
    pub name: String,

    /// User record stamped as `created_by` on invoices.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Shop's offset from UTC, used for "today" and report days.
    /// Default: 330 (IST)
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_terminal_name() -> String {
    "Counter".to_string()
}

fn default_utc_offset() -> i32 {
    330
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            name: default_terminal_name(),
            user_id: None,
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("in", "dukaan", "dukaan")
        .map(|dirs| dirs.data_dir().join("dukaan.db"))
        .unwrap_or_else(|| PathBuf::from("dukaan.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            database_path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Where the cart snapshot is written. `None` keeps the cart in
    /// memory only.
    #[serde(default)]
    pub cart_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSettings {
    #[serde(default)]
    pub allocation: AllocationMode,

    #[serde(default = "default_true")]
    pub keep_customer_after_finalize: bool,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        InvoiceSettings {
            allocation: AllocationMode::default(),
            keep_customer_after_finalize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSettings {
    #[serde(default = "default_true")]
    pub decrement_on_sale: bool,
}

impl Default for StockSettings {
    fn default() -> Self {
        StockSettings {
            decrement_on_sale: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Checkout Config
// =============================================================================

/// Complete terminal configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub invoice: InvoiceSettings,

    #[serde(default)]
    pub stock: StockSettings,
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (dukaan.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Terminal config saved");
        Ok(())
    }

    pub fn validate(&self) -> CheckoutResult<()> {
        if self.store.max_connections == 0 {
            return Err(CheckoutError::Config(
                "store.max_connections must be greater than 0".into(),
            ));
        }
        if self.store.database_path.as_os_str().is_empty() {
            return Err(CheckoutError::Config("store.database_path is empty".into()));
        }
        // Real offsets run from UTC-12:00 to UTC+14:00
        if !(-720..=840).contains(&self.terminal.utc_offset_minutes) {
            return Err(CheckoutError::Config(format!(
                "terminal.utc_offset_minutes out of range: {}",
                self.terminal.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Applies `DUKAAN_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("DUKAAN_TERMINAL_NAME") {
            self.terminal.name = name;
        }

        if let Some(user) = lookup("DUKAAN_USER_ID") {
            debug!(user_id = %user, "Overriding user id from environment");
            self.terminal.user_id = Some(user).filter(|u| !u.is_empty());
        }

        if let Some(offset) = lookup("DUKAAN_UTC_OFFSET_MINUTES") {
            match offset.parse::<i32>() {
                Ok(minutes) => self.terminal.utc_offset_minutes = minutes,
                Err(_) => warn!(value = %offset, "Ignoring invalid DUKAAN_UTC_OFFSET_MINUTES"),
            }
        }

        if let Some(path) = lookup("DUKAAN_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.database_path = PathBuf::from(path);
        }

        if let Some(max) = lookup("DUKAAN_DB_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.store.max_connections = max;
            }
        }

        if let Some(path) = lookup("DUKAAN_CART_PATH") {
            self.session.cart_path = Some(PathBuf::from(path)).filter(|p| !p.as_os_str().is_empty());
        }

        if let Some(mode) = lookup("DUKAAN_INVOICE_ALLOCATION") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding invoice allocation from environment");
                    self.invoice.allocation = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown invoice allocation in environment"),
            }
        }

        if let Some(keep) = lookup("DUKAAN_KEEP_CUSTOMER") {
            if let Some(flag) = parse_flag(&keep) {
                self.invoice.keep_customer_after_finalize = flag;
            }
        }

        if let Some(decrement) = lookup("DUKAAN_STOCK_DECREMENT") {
            if let Some(flag) = parse_flag(&decrement) {
                self.stock.decrement_on_sale = flag;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DUKAAN_CONFIG") {
            return Some(PathBuf::from(path));
        }
        directories::ProjectDirs::from("in", "dukaan", "dukaan")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Store connection settings for this terminal.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.store.database_path).max_connections(self.store.max_connections)
    }

    /// The shop's fixed offset from UTC.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.terminal.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    /// The shop's calendar date right now.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.utc_offset()).date_naive()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(value = %value, "Ignoring invalid boolean in environment");
            None
        }
    }
}
