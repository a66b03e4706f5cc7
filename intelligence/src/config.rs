//! Configuration management for the decision engine
//!
//! Layers, lowest first: built-in defaults, an optional YAML file, then
//! `GASROUTE__*` environment variables (e.g. `GASROUTE__REFRESH__DEBOUNCE_MS=250`).

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use gasroute_dataplane::feeds::HttpFeedConfig;
use gasroute_dataplane::{Chain, ChainRegistry};

use crate::error::{OptimizationError, Result};
use crate::types::UserPreferences;

/// Decision engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Chains the engine compares, as chain ids
    pub chains: Vec<Chain>,

    pub gas: GasConfig,

    pub timing: TimingConfig,

    /// Flat MEV protection fee per swap, charged when the user enables protection
    pub mev_protection_fee_usd: f64,

    pub market_data: MarketDataConfig,

    pub refresh: RefreshConfig,

    /// Preferences for users with nothing stored
    pub default_preferences: PreferenceDefaults,
}

/// `UserPreferences` as written in the config file (snake_case keys)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDefaults {
    pub min_savings_threshold_bps: u32,
    pub min_absolute_savings_usd: f64,
    pub max_bridge_time_seconds: u64,
    pub enable_cross_chain_optimization: bool,
    pub enable_mev_protection: bool,
    #[serde(default)]
    pub preferred_chains: Vec<Chain>,
    #[serde(default)]
    pub excluded_chains: Vec<Chain>,
}

impl From<UserPreferences> for PreferenceDefaults {
    fn from(p: UserPreferences) -> Self {
        Self {
            min_savings_threshold_bps: p.min_savings_threshold_bps,
            min_absolute_savings_usd: p.min_absolute_savings_usd,
            max_bridge_time_seconds: p.max_bridge_time_seconds,
            enable_cross_chain_optimization: p.enable_cross_chain_optimization,
            enable_mev_protection: p.enable_mev_protection,
            preferred_chains: p.preferred_chains,
            excluded_chains: p.excluded_chains,
        }
    }
}

impl From<PreferenceDefaults> for UserPreferences {
    fn from(d: PreferenceDefaults) -> Self {
        Self {
            min_savings_threshold_bps: d.min_savings_threshold_bps,
            min_absolute_savings_usd: d.min_absolute_savings_usd,
            max_bridge_time_seconds: d.max_bridge_time_seconds,
            enable_cross_chain_optimization: d.enable_cross_chain_optimization,
            enable_mev_protection: d.enable_mev_protection,
            preferred_chains: d.preferred_chains,
            excluded_chains: d.excluded_chains,
        }
    }
}

/// Expected gas consumption of one swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasConfig {
    pub default_swap_gas_units: u64,

    #[serde(default)]
    pub overrides: Vec<ChainGasOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainGasOverride {
    pub chain: Chain,
    pub swap_gas_units: u64,
}

/// Execution time heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Time to execute a swap on a chain once funds are there
    pub local_swap_seconds: u64,

    /// Fractions of the bridge ETA assigned to each plan step
    pub plan_split: PlanSplit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanSplit {
    pub bridge_out: f64,
    pub swap: f64,
    pub bridge_back: f64,
}

impl Default for PlanSplit {
    fn default() -> Self {
        Self {
            bridge_out: 0.6,
            swap: 0.2,
            bridge_back: 0.2,
        }
    }
}

/// Market data sourcing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataConfig {
    /// Bound on every individual fetch
    pub fetch_timeout_ms: u64,

    pub http: HttpFeedConfig,
}

/// Refresh controller timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Quiet period after the last submit before evaluating
    pub debounce_ms: u64,

    /// Background re-evaluation interval while a quote is shown
    pub interval_secs: u64,

    /// Capacity of the transition event channel
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chains: Chain::ALL.to_vec(),
            gas: GasConfig {
                default_swap_gas_units: 150_000,
                overrides: Vec::new(),
            },
            timing: TimingConfig {
                local_swap_seconds: 30,
                plan_split: PlanSplit::default(),
            },
            mev_protection_fee_usd: 0.0,
            market_data: MarketDataConfig {
                fetch_timeout_ms: 2000,
                http: HttpFeedConfig::default(),
            },
            refresh: RefreshConfig {
                debounce_ms: 500,
                interval_secs: 60,
                event_buffer: 64,
            },
            default_preferences: UserPreferences::default().into(),
        }
    }
}

impl EngineConfig {
    /// Load defaults, then the optional YAML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            tracing::info!("Loading engine config from: {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix("GASROUTE").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load a complete configuration from a YAML file, without layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file (for generating examples)
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(invalid("at least one chain must be enabled"));
        }
        if self.gas.default_swap_gas_units == 0 {
            return Err(invalid("gas.default_swap_gas_units must be greater than 0"));
        }
        if let Some(o) = self.gas.overrides.iter().find(|o| o.swap_gas_units == 0) {
            return Err(invalid(format!("gas override for {} must be greater than 0", o.chain)));
        }

        let split = self.timing.plan_split;
        for (name, value) in [
            ("bridge_out", split.bridge_out),
            ("swap", split.swap),
            ("bridge_back", split.bridge_back),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("timing.plan_split.{} must be within 0..=1", name)));
            }
        }

        if !self.mev_protection_fee_usd.is_finite() || self.mev_protection_fee_usd < 0.0 {
            return Err(invalid("mev_protection_fee_usd must be a non-negative number"));
        }
        if self.market_data.fetch_timeout_ms == 0 {
            return Err(invalid("market_data.fetch_timeout_ms must be greater than 0"));
        }
        let http_budget = self.market_data.http.worst_case_duration();
        if http_budget >= self.fetch_timeout() {
            return Err(invalid(format!(
                "market_data.http retries take up to {}ms, more than fetch_timeout_ms {}",
                http_budget.as_millis(),
                self.market_data.fetch_timeout_ms
            )));
        }
        if self.refresh.interval_secs == 0 {
            return Err(invalid("refresh.interval_secs must be greater than 0"));
        }
        if self.refresh.event_buffer == 0 {
            return Err(invalid("refresh.event_buffer must be greater than 0"));
        }

        self.default_preferences()
            .validate()
            .map_err(|e| invalid(format!("default_preferences: {}", e)))
    }

    /// Preferences applied when a user has none stored
    pub fn default_preferences(&self) -> UserPreferences {
        self.default_preferences.clone().into()
    }

    /// Enabled chains with their metadata
    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.iter().copied())
    }

    /// Expected gas units for one swap on `chain`
    pub fn swap_gas_units(&self, chain: Chain) -> u64 {
        self.gas
            .overrides
            .iter()
            .find(|o| o.chain == chain)
            .map(|o| o.swap_gas_units)
            .unwrap_or(self.gas.default_swap_gas_units)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.market_data.fetch_timeout_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.refresh.debounce_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }
}

fn invalid<S: Into<String>>(message: S) -> OptimizationError {
    OptimizationError::Config(config::ConfigError::Message(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry().len(), 5);
        assert_eq!(config.swap_gas_units(Chain::Arbitrum), 150_000);
        assert_eq!(config.fetch_timeout(), Duration::from_millis(2000));
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.default_preferences(), UserPreferences::default());
    }

    #[test]
    fn test_gas_overrides() {
        let mut config = EngineConfig::default();
        config.gas.overrides.push(ChainGasOverride {
            chain: Chain::Arbitrum,
            swap_gas_units: 700_000,
        });
        assert_eq!(config.swap_gas_units(Chain::Arbitrum), 700_000);
        assert_eq!(config.swap_gas_units(Chain::Ethereum), 150_000);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.chains.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.timing.plan_split.bridge_out = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.mev_protection_fee_usd = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.default_preferences.min_absolute_savings_usd = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_http_retries_must_fit_fetch_timeout() {
        let config = EngineConfig::default();
        assert!(config.market_data.http.worst_case_duration() < config.fetch_timeout());

        let mut config = EngineConfig::default();
        config.market_data.http.request_timeout_ms = 1500;
        assert!(config.validate().is_err());

        config.market_data.fetch_timeout_ms = 5000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = EngineConfig::default();
        config.chains = vec![Chain::Ethereum, Chain::Arbitrum];
        config.mev_protection_fee_usd = 1.5;
        let temp_path = std::env::temp_dir().join("gasroute_engine_config_test.yaml");

        config.save_to_file(&temp_path).unwrap();
        let loaded = EngineConfig::from_file(&temp_path).unwrap();
        assert_eq!(loaded, config);

        let layered = EngineConfig::load(Some(&temp_path)).unwrap();
        assert_eq!(layered.chains, vec![Chain::Ethereum, Chain::Arbitrum]);
        assert_eq!(layered.mev_protection_fee_usd, 1.5);

        std::fs::remove_file(temp_path).ok();
    }
}
