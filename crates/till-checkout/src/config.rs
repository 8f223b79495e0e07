//! # Register Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TILL_API_BASE_URL=https://pos.example.vn/api/v1                     │
//! │     TILL_BRANCH_ID=3                                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/till-pos/till.toml (Linux)                                │
//! │     ~/Library/Application Support/vn.till.pos/till.toml (macOS)         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     localhost backend, 1 s auto-sync debounce, 10% display VAT          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [api]
//! base_url = "http://localhost:8080/api/v1"
//! public_base_url = "http://localhost:8080/api"
//! timeout_secs = 30          # omit for no client-side timeout
//!
//! [checkout]
//! autosync_debounce_ms = 1000
//! success_redirect_secs = 3
//! transfer_verify_delay_secs = 10
//! tax_rate_bps = 1000
//!
//! [operator]
//! employee_id = 12
//! branch_id = 3
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use till_api::ClientOptions;
use till_core::{EntityId, Operator, TaxRate, DEFAULT_TAX_RATE_BPS};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ConfigError;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

const CONFIG_FILE_NAME: &str = "till.toml";
const TOKEN_FILE_NAME: &str = "session.token";

// =============================================================================
// API Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Versioned API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Unversioned root for public (unauthenticated) endpoints.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Client-side request timeout. `None` imposes none.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Where the bearer token is persisted. Defaults to the config directory.
    #[serde(default)]
    pub token_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            public_base_url: default_public_base_url(),
            timeout_secs: None,
            token_path: None,
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Quiet period after the last cart change before a held bill is synced.
    #[serde(default = "default_autosync_debounce")]
    pub autosync_debounce_ms: u64,

    /// Pause on the success screen before opening the invoice detail.
    #[serde(default = "default_success_redirect")]
    pub success_redirect_secs: u64,

    /// Delay before the one-shot bank-transfer verification.
    #[serde(default = "default_transfer_verify_delay")]
    pub transfer_verify_delay_secs: u64,

    /// Display VAT on the payment summary.
    #[serde(default = "default_tax_rate")]
    pub tax_rate_bps: u32,

    /// Gateway return URL. Defaults to the public API's VNPay return route.
    #[serde(default)]
    pub return_url: Option<String>,
}

fn default_autosync_debounce() -> u64 {
    1000
}

fn default_success_redirect() -> u64 {
    3
}

fn default_transfer_verify_delay() -> u64 {
    10
}

fn default_tax_rate() -> u32 {
    DEFAULT_TAX_RATE_BPS
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            autosync_debounce_ms: default_autosync_debounce(),
            success_redirect_secs: default_success_redirect(),
            transfer_verify_delay_secs: default_transfer_verify_delay(),
            tax_rate_bps: default_tax_rate(),
            return_url: None,
        }
    }
}

// =============================================================================
// Operator Settings
// =============================================================================

/// Who is ringing up sales on this register.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorSettings {
    #[serde(default)]
    pub employee_id: EntityId,

    /// Unset means the operator cannot check out or hold bills.
    #[serde(default)]
    pub branch_id: Option<EntityId>,
}

// =============================================================================
// Full Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TillConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub operator: OperatorSettings,
}

impl TillConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading register config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Save("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Save(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::Save(e.to_string()))?;

        info!(?path, "Register config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_http_url("api.base_url", &self.api.base_url)?;
        validate_http_url("api.public_base_url", &self.api.public_base_url)?;
        if let Some(url) = &self.checkout.return_url {
            validate_http_url("checkout.return_url", url)?;
        }

        if self.checkout.autosync_debounce_ms == 0 {
            return Err(ConfigError::Invalid(
                "autosync_debounce_ms must be greater than 0".into(),
            ));
        }

        if self.checkout.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(
                "tax_rate_bps must be between 0 and 10000".into(),
            ));
        }

        if self.api.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than 0 when set".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TILL_*` overrides read through `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TILL_API_BASE_URL") {
            debug!(url = %url, "Overriding API base URL from environment");
            self.api.base_url = url;
        }

        if let Some(url) = lookup("TILL_PUBLIC_BASE_URL") {
            debug!(url = %url, "Overriding public base URL from environment");
            self.api.public_base_url = url;
        }

        if let Some(secs) = lookup("TILL_API_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.api.timeout_secs = Some(s),
                Err(_) => warn!(value = %secs, "Ignoring invalid TILL_API_TIMEOUT_SECS"),
            }
        }

        if let Some(path) = lookup("TILL_TOKEN_PATH") {
            self.api.token_path = Some(PathBuf::from(path));
        }

        if let Some(ms) = lookup("TILL_AUTOSYNC_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(v) => self.checkout.autosync_debounce_ms = v,
                Err(_) => warn!(value = %ms, "Ignoring invalid TILL_AUTOSYNC_DEBOUNCE_MS"),
            }
        }

        if let Some(bps) = lookup("TILL_TAX_RATE_BPS") {
            match bps.parse::<u32>() {
                Ok(v) => self.checkout.tax_rate_bps = v,
                Err(_) => warn!(value = %bps, "Ignoring invalid TILL_TAX_RATE_BPS"),
            }
        }

        if let Some(url) = lookup("TILL_RETURN_URL") {
            self.checkout.return_url = Some(url);
        }

        if let Some(id) = lookup("TILL_EMPLOYEE_ID") {
            match id.parse::<EntityId>() {
                Ok(v) => self.operator.employee_id = v,
                Err(_) => warn!(value = %id, "Ignoring invalid TILL_EMPLOYEE_ID"),
            }
        }

        if let Some(id) = lookup("TILL_BRANCH_ID") {
            match id.parse::<EntityId>() {
                Ok(v) => self.operator.branch_id = Some(v),
                Err(_) => warn!(value = %id, "Ignoring invalid TILL_BRANCH_ID"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("vn", "till", "pos")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Token file: configured path, else the platform config directory.
    pub fn token_path(&self) -> Option<PathBuf> {
        self.api.token_path.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.config_dir().join(TOKEN_FILE_NAME))
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api.base_url.clone(),
            timeout: self.api.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn operator(&self) -> Operator {
        Operator {
            employee_id: self.operator.employee_id,
            branch_id: self.operator.branch_id,
        }
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.checkout.tax_rate_bps)
    }

    pub fn autosync_debounce(&self) -> Duration {
        Duration::from_millis(self.checkout.autosync_debounce_ms)
    }

    pub fn success_redirect_delay(&self) -> Duration {
        Duration::from_secs(self.checkout.success_redirect_secs)
    }

    pub fn transfer_verify_delay(&self) -> Duration {
        Duration::from_secs(self.checkout.transfer_verify_delay_secs)
    }

    /// Where VNPay sends the customer back to.
    pub fn return_url(&self) -> String {
        self.checkout.return_url.clone().unwrap_or_else(|| {
            format!(
                "{}/payments/vnpay-return",
                self.api.public_base_url.trim_end_matches('/')
            )
        })
    }
}

fn validate_http_url(field: &str, raw: &str) -> ConfigResult<()> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field: field.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl {
            field: field.to_string(),
            reason: format!("must start with http:// or https://, got: {}", raw),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TillConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.autosync_debounce(), Duration::from_millis(1000));
        assert_eq!(config.success_redirect_delay(), Duration::from_secs(3));
        assert_eq!(config.tax_rate().bps(), 1000);
        assert_eq!(config.client_options().timeout, None);
        assert_eq!(
            config.return_url(),
            "http://localhost:8080/api/payments/vnpay-return"
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = TillConfig::default();

        config.api.base_url = "ftp://pos".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

        config.api.base_url = default_base_url();
        config.checkout.autosync_debounce_ms = 0;
        assert!(config.validate().is_err());

        config.checkout.autosync_debounce_ms = 500;
        config.checkout.tax_rate_bps = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TILL_API_BASE_URL", "https://pos.example.vn/api/v1"),
            ("TILL_BRANCH_ID", "3"),
            ("TILL_EMPLOYEE_ID", "12"),
            ("TILL_AUTOSYNC_DEBOUNCE_MS", "not-a-number"),
            ("TILL_API_TIMEOUT_SECS", "20"),
        ]
        .into_iter()
        .collect();

        let mut config = TillConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://pos.example.vn/api/v1");
        assert_eq!(config.operator(), Operator { employee_id: 12, branch_id: Some(3) });
        assert_eq!(config.checkout.autosync_debounce_ms, 1000);
        assert_eq!(config.client_options().timeout, Some(Duration::from_secs(20)));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TillConfig = toml::from_str(
            r#"
            [operator]
            employee_id = 7
            branch_id = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.operator.branch_id, Some(2));
        assert_eq!(config.api.base_url, default_base_url());
        assert_eq!(config.checkout.autosync_debounce_ms, 1000);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("till.toml");

        let mut config = TillConfig::default();
        config.operator.branch_id = Some(5);
        config.checkout.tax_rate_bps = 800;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[checkout]"));

        let loaded: TillConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded, config);
    }
}
