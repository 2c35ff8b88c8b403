//! Configuration loading and validation
//!
//! One authoritative source for every static value the client uses: app
//! metadata, the target chain, tip defaults and the wallet bridge.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::provider::{ProviderOptions, SubAccountCreation};
use crate::units::{Address, ChainId};
use crate::validation::ValidationRules;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub tip: TipConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_tagline")]
    pub tagline: String,
    #[serde(default = "default_logo_url")]
    pub logo_url: String,
    /// Origin used to scope sub-account lookups
    #[serde(default = "default_origin")]
    pub origin: String,
    /// Where users review or revoke sub-account permissions
    #[serde(default = "default_manage_permissions_url")]
    pub manage_permissions_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_id")]
    pub id: u64,
    #[serde(default = "default_chain_name")]
    pub name: String,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    #[serde(default = "default_explorer_name")]
    pub explorer_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TipConfig {
    /// Prefilled amount in the native unit
    #[serde(default = "default_tip_amount")]
    pub default_amount: String,
    #[serde(default = "default_recipient")]
    pub default_recipient: String,
    /// Smallest accepted tip in the native unit
    #[serde(default = "default_tip_amount")]
    pub min_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Ask the wallet to create a sub-account during connect
    #[serde(default = "default_true")]
    pub create_sub_account_on_connect: bool,
}

fn default_app_name() -> String {
    "EthTip".to_string()
}
fn default_tagline() -> String {
    "The frictionless tipping app".to_string()
}
fn default_logo_url() -> String {
    "https://picsum.photos/seed/ethtip-logo/200".to_string()
}
fn default_origin() -> String {
    "https://ethtip.app".to_string()
}
fn default_manage_permissions_url() -> String {
    "https://account.base.app".to_string()
}
fn default_chain_id() -> u64 {
    8453
}
fn default_chain_name() -> String {
    "Base".to_string()
}
fn default_native_symbol() -> String {
    "ETH".to_string()
}
fn default_decimals() -> u32 {
    18
}
fn default_explorer_url() -> String {
    "https://basescan.org".to_string()
}
fn default_explorer_name() -> String {
    "Basescan".to_string()
}
fn default_tip_amount() -> String {
    "0.000000000000001".to_string()
}
fn default_recipient() -> String {
    Address::zero().to_string()
}
fn default_provider_endpoint() -> String {
    std::env::var("ETHTIP_PROVIDER_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".into())
}
fn default_timeout_ms() -> u64 {
    120_000
}
fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            tagline: default_tagline(),
            logo_url: default_logo_url(),
            origin: default_origin(),
            manage_permissions_url: default_manage_permissions_url(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            id: default_chain_id(),
            name: default_chain_name(),
            native_symbol: default_native_symbol(),
            decimals: default_decimals(),
            explorer_url: default_explorer_url(),
            explorer_name: default_explorer_name(),
        }
    }
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            default_amount: default_tip_amount(),
            default_recipient: default_recipient(),
            min_amount: default_tip_amount(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_provider_endpoint(),
            timeout_ms: default_timeout_ms(),
            create_sub_account_on_connect: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            chain: ChainConfig::default(),
            tip: TipConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn chain_id(&self) -> ChainId {
        ChainId(self.id)
    }

    /// Explorer page for a submitted request
    pub fn tx_url(&self, request_id: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), request_id)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env<P: AsRef<Path>>(path: P, env: config::Environment) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            .add_source(env)
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chain.id == 0 {
            anyhow::bail!("chain.id must be non-zero");
        }

        if self.chain.decimals > 36 {
            anyhow::bail!("chain.decimals cannot exceed 36, got {}", self.chain.decimals);
        }

        for (name, value) in [
            ("chain.explorer_url", &self.chain.explorer_url),
            ("app.origin", &self.app.origin),
            ("app.logo_url", &self.app.logo_url),
            ("provider.endpoint", &self.provider.endpoint),
        ] {
            url::Url::parse(value).with_context(|| format!("Invalid {}: {}", name, value))?;
        }

        let rules = ValidationRules::new(self.chain.decimals, &self.tip.min_amount)
            .map_err(|e| anyhow::anyhow!("Invalid tip.min_amount: {}", e))?;

        // The prefilled form must be submittable as-is
        rules
            .validate(&self.tip.default_recipient, &self.tip.default_amount)
            .map_err(|e| anyhow::anyhow!("Invalid tip defaults: {}", e))?;

        if self.provider.timeout_ms == 0 {
            tracing::warn!("provider.timeout_ms is 0 - wallet requests will never time out");
        }

        Ok(())
    }

    /// Options handed to the wallet SDK at initialization
    pub fn provider_options(&self) -> ProviderOptions {
        let creation = if self.provider.create_sub_account_on_connect {
            SubAccountCreation::OnConnect
        } else {
            SubAccountCreation::Manual
        };

        ProviderOptions {
            app_name: self.app.name.clone(),
            app_logo_url: self.app.logo_url.clone(),
            app_chain_ids: vec![self.chain.chain_id()],
            sub_account_creation: creation,
            endpoint: self.provider.endpoint.clone(),
            timeout: Duration::from_millis(self.provider.timeout_ms),
        }
    }

    /// Form validation rules for the configured chain
    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::new(self.chain.decimals, &self.tip.min_amount).unwrap_or_default()
    }

    /// Get masked configuration for display (hide secrets)
    pub fn masked_display(&self) -> String {
        format!(
            r#"Configuration:
  App:
    name: {}
    origin: {}
  Chain:
    id: {} ({})
    native: {} ({} decimals)
    explorer: {} ({})
  Tip:
    default_amount: {} {}
    min_amount: {} {}
  Provider:
    endpoint: {}
    timeout: {}ms
    sub_account_on_connect: {}
"#,
            self.app.name,
            self.app.origin,
            self.chain.id,
            self.chain.name,
            self.chain.native_symbol,
            self.chain.decimals,
            self.chain.explorer_name,
            self.chain.explorer_url,
            self.tip.default_amount,
            self.chain.native_symbol,
            self.tip.min_amount,
            self.chain.native_symbol,
            mask_url(&self.provider.endpoint),
            self.provider.timeout_ms,
            self.provider.create_sub_account_on_connect,
        )
    }
}

/// Environment overrides, e.g. `ETHTIP__TIP__DEFAULT_AMOUNT`.
///
/// Values stay strings: amounts must reach the unit parser untouched, and
/// numeric fields are converted during deserialization.
fn environment() -> config::Environment {
    config::Environment::with_prefix("ETHTIP").separator("__")
}

/// Mask URL for display (hide API keys in query params)
fn mask_url(url: &str) -> String {
    if let Some(idx) = url.find('?') {
        format!("{}?***", &url[..idx])
    } else {
        url.to_string()
    }
}
