//! # Client Configuration
//!
//! Configuration for the register's sale client.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RXPOS_BASE_URL=https://pharmacy.example.com                        │
//! │     RXPOS_CASH_REGISTER_ID=3                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/rxpos/client.toml (Linux)                                │
//! │     ~/Library/Application Support/com.rxpos.register/client.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     http://localhost:8000, 30 s timeout, "ORD-" prefix                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # client.toml
//! [server]
//! base_url = "https://pharmacy.example.com"
//! timeout_secs = 30
//!
//! [register]
//! cash_register_id = "3"
//! cash_register_session_id = "118"
//!
//! [sale]
//! order_number_prefix = "ORD-"
//! auto_open_receipt = true
//! recent_products_limit = 12
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "rxpos";
const APPLICATION: &str = "register";

// =============================================================================
// Server Settings
// =============================================================================

/// Where the sale service lives and how its endpoints are named.
///
/// Paths are relative to `base_url`. `finalize_path` contains a `{id}`
/// placeholder for the draft sale id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds). The only client-side timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_create_path")]
    pub create_sale_path: String,

    #[serde(default = "default_finalize_path")]
    pub finalize_sale_path: String,

    #[serde(default = "default_quick_customer_path")]
    pub quick_customer_path: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_create_path() -> String {
    "sales".to_string()
}

fn default_finalize_path() -> String {
    "sales/{id}/finalize".to_string()
}

fn default_quick_customer_path() -> String {
    "sales/quick-customer".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            create_sale_path: default_create_path(),
            finalize_sale_path: default_finalize_path(),
            quick_customer_path: default_quick_customer_path(),
        }
    }
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves `path` against the base URL.
    pub fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let mut base = Url::parse(&self.base_url)?;
        // Url::join drops the last segment unless the base ends with '/'
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(path.trim_start_matches('/'))?)
    }
}

// =============================================================================
// Register Settings
// =============================================================================

/// The cash register this client runs on, sent along with every sale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterSettings {
    #[serde(default)]
    pub cash_register_id: Option<String>,

    #[serde(default)]
    pub cash_register_session_id: Option<String>,
}

// =============================================================================
// Sale Settings
// =============================================================================

/// Register behavior around a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSettings {
    /// Prefix of the display order number.
    #[serde(default = "default_order_prefix")]
    pub order_number_prefix: String,

    /// Open the printable receipt after a completed sale.
    #[serde(default)]
    pub auto_open_receipt: bool,

    /// How many recently added products to remember.
    #[serde(default = "default_recent_limit")]
    pub recent_products_limit: usize,
}

fn default_order_prefix() -> String {
    rxpos_core::order::DEFAULT_ORDER_PREFIX.to_string()
}

fn default_recent_limit() -> usize {
    12
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            order_number_prefix: default_order_prefix(),
            auto_open_receipt: false,
            recent_products_limit: default_recent_limit(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Recent products file. Defaults to the platform data directory.
    #[serde(default)]
    pub recent_products_path: Option<PathBuf>,
}

// =============================================================================
// Main Client Configuration
// =============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub register: RegisterSettings,

    #[serde(default)]
    pub sale: SaleSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| ClientError::ConfigLoadFailed(e.to_string()))?;
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
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ClientError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Client config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.server.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "Base URL must start with http:// or https://, got: {}",
                self.server.base_url
            )));
        }

        if self.server.timeout_secs == 0 {
            return Err(ClientError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if !self.server.finalize_sale_path.contains("{id}") {
            return Err(ClientError::InvalidConfig(
                "finalize_sale_path must contain an {id} placeholder".into(),
            ));
        }

        if self.sale.recent_products_limit == 0 {
            return Err(ClientError::InvalidConfig(
                "recent_products_limit must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RXPOS_BASE_URL") {
            debug!(url = %url, "Overriding base URL from environment");
            self.server.base_url = url;
        }

        if let Ok(timeout) = std::env::var("RXPOS_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(t) => self.server.timeout_secs = t,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric RXPOS_TIMEOUT_SECS"),
            }
        }

        if let Ok(id) = std::env::var("RXPOS_CASH_REGISTER_ID") {
            debug!(cash_register_id = %id, "Overriding cash register from environment");
            self.register.cash_register_id = Some(id);
        }

        if let Ok(id) = std::env::var("RXPOS_CASH_REGISTER_SESSION_ID") {
            self.register.cash_register_session_id = Some(id);
        }

        if let Ok(prefix) = std::env::var("RXPOS_ORDER_PREFIX") {
            self.sale.order_number_prefix = prefix;
        }

        if let Ok(flag) = std::env::var("RXPOS_AUTO_OPEN_RECEIPT") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.sale.auto_open_receipt = true,
                "0" | "false" | "no" => self.sale.auto_open_receipt = false,
                _ => warn!(value = %flag, "Unknown RXPOS_AUTO_OPEN_RECEIPT value"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    /// Recent products file: configured path, else the platform data dir.
    pub fn recent_products_path(&self) -> Option<PathBuf> {
        self.storage.recent_products_path.clone().or_else(|| {
            directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
                .map(|dirs| dirs.data_dir().join("recent_products.json"))
        })
    }
}
