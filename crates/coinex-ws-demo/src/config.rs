/*
[INPUT]:  Optional coinex-demo.yaml, COINEX_* environment variables
[OUTPUT]: Validated demo configuration and optional API credentials
[POS]:    Configuration layer - scenario setup
[UPDATE]: When adding new configuration options
*/

use std::time::Duration;

use anyhow::{Context, Result, bail};
use coinex_ws_adapter::Credentials;
use coinex_ws_adapter::ws::DEFAULT_WS_URL;
use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_STEM: &str = "coinex-demo";
pub const ENV_PREFIX: &str = "COINEX";

/// Settings for the three demonstration scenarios
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    /// API access id, empty when running public-only
    #[serde(default)]
    pub access_id: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Markets for public channels; the first one is used by single-market scenarios
    #[serde(default = "default_markets")]
    pub markets: Vec<String>,
    #[serde(default = "default_public_duration_secs")]
    pub public_duration_secs: u64,
    #[serde(default = "default_private_duration_secs")]
    pub private_duration_secs: u64,
    #[serde(default = "default_ping_duration_secs")]
    pub ping_duration_secs: u64,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_depth_limit")]
    pub depth_limit: u32,
    /// Depth merge precision, "0" for none
    #[serde(default = "default_depth_interval")]
    pub depth_interval: String,
    /// Optional price band; crossing either edge prints an alert
    #[serde(default)]
    pub alert_low: Option<Decimal>,
    #[serde(default)]
    pub alert_high: Option<Decimal>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            access_id: String::new(),
            secret_key: String::new(),
            ws_url: default_ws_url(),
            markets: default_markets(),
            public_duration_secs: default_public_duration_secs(),
            private_duration_secs: default_private_duration_secs(),
            ping_duration_secs: default_ping_duration_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            depth_limit: default_depth_limit(),
            depth_interval: default_depth_interval(),
            alert_low: None,
            alert_high: None,
        }
    }
}

fn default_ws_url() -> String {
    DEFAULT_WS_URL.to_string()
}

fn default_markets() -> Vec<String> {
    vec!["BTCUSDT".to_string()]
}

fn default_public_duration_secs() -> u64 {
    30
}

fn default_private_duration_secs() -> u64 {
    60
}

fn default_ping_duration_secs() -> u64 {
    60
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_depth_limit() -> u32 {
    5
}

fn default_depth_interval() -> String {
    "0".to_string()
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("markets")
}

impl DemoConfig {
    /// Load `coinex-demo.yaml` (if present) then the process environment.
    pub fn load() -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE_STEM).required(false))
            .add_source(environment());
        Self::finish(builder)
    }

    /// Load from YAML text plus an explicit variable map standing in for the environment
    pub fn from_sources(yaml: &str, env: config::Map<String, String>) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .add_source(environment().source(Some(env)));
        Self::finish(builder)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::from_sources(yaml, config::Map::new())
    }

    fn finish(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = builder
            .build()
            .context("read configuration sources")?
            .try_deserialize()
            .context("parse demo configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            bail!("ws_url must start with ws:// or wss://, got {}", self.ws_url);
        }
        if self.markets.iter().all(|market| market.trim().is_empty()) {
            bail!("at least one market is required");
        }
        if self.ping_interval_secs == 0 {
            bail!("ping_interval_secs must be greater than zero");
        }
        if let (Some(low), Some(high)) = (self.alert_low, self.alert_high) {
            if low >= high {
                bail!("alert_low ({low}) must be below alert_high ({high})");
            }
        }
        Ok(())
    }

    /// Credentials when both the access id and the secret are set
    pub fn credentials(&self) -> Option<Credentials> {
        let access_id = self.access_id.trim();
        let secret_key = self.secret_key.trim();
        if access_id.is_empty() || secret_key.is_empty() {
            return None;
        }
        Some(Credentials::new(access_id, secret_key))
    }

    /// Non-empty, trimmed market names
    pub fn markets(&self) -> Vec<String> {
        self.markets
            .iter()
            .map(|market| market.trim().to_ascii_uppercase())
            .filter(|market| !market.is_empty())
            .collect()
    }

    pub fn primary_market(&self) -> String {
        self.markets()
            .into_iter()
            .next()
            .unwrap_or_else(|| default_markets().remove(0))
    }

    pub fn public_duration(&self) -> Duration {
        Duration::from_secs(self.public_duration_secs)
    }

    pub fn private_duration(&self) -> Duration {
        Duration::from_secs(self.private_duration_secs)
    }

    pub fn ping_duration(&self) -> Duration {
        Duration::from_secs(self.ping_duration_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}
