//! Layered gateway configuration
//!
//! Loaded in layers with increasing priority:
//! 1. Compiled-in defaults (all four metals, blocking buy-side checks)
//! 2. TOML file, if present
//! 3. Environment overrides, prefix `BULLION_`, nested with `__`
//!    (e.g. `BULLION_POLICY__ENFORCE_SELL_CAPACITY=true`)

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File};
use hedge_engine::HedgeConfig;
use inventory::{InventoryConfig, MetalBootstrap, MetalLimits};
use ledger_store::reconciliation::ReconciliationConfig;
use matching_engine::MatchingConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use types::metal::Metal;
use types::numeric::Grams;

use crate::orchestrator::TradePolicy;

/// Env var naming the TOML file
pub const CONFIG_PATH_ENV: &str = "BULLION_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub policy: TradePolicy,
    pub reconciliation: ReconciliationSettings,
    /// Keyed by metal symbol or name
    pub metals: HashMap<String, MetalSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// JSON lines instead of pretty output
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub max_cas_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationSettings {
    pub interval_secs: u64,
    pub tolerance_grams: Decimal,
}

/// Per-metal ledger seed, limits and spread
#[derive(Debug, Clone, Deserialize)]
pub struct MetalSettings {
    pub initial_stock: Decimal,
    pub vault_capacity: Decimal,
    pub exposure_band: Decimal,
    pub warning_threshold: Decimal,
    /// Counter currency per gram captured on internally netted flow
    pub structural_spread: Decimal,
}

/// Validated per-metal settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetalSetup {
    pub metal: Metal,
    pub bootstrap: MetalBootstrap,
    pub limits: MetalLimits,
    pub structural_spread: Decimal,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let mut builder = Config::builder()
        .set_default("server.bind_addr", "0.0.0.0:8080")?
        .set_default("logging.json", false)?
        .set_default("store.max_cas_attempts", 16i64)?
        .set_default("policy.enforce_buy_capacity", true)?
        .set_default("policy.enforce_sell_capacity", false)?
        .set_default("reconciliation.interval_secs", 60i64)?
        .set_default("reconciliation.tolerance_grams", "0")?;

    // initial stock, vault capacity, exposure band, warning threshold, spread
    let metals: [(&str, [&str; 5]); 4] = [
        ("xau", ["10000", "1000000", "50000", "1000", "0.50"]),
        ("xag", ["500000", "50000000", "2000000", "50000", "0.02"]),
        ("xpt", ["5000", "500000", "25000", "500", "0.40"]),
        ("xpd", ["5000", "500000", "25000", "500", "0.60"]),
    ];
    for (key, [stock, capacity, band, threshold, spread]) in metals {
        builder = builder
            .set_default(format!("metals.{key}.initial_stock"), stock)?
            .set_default(format!("metals.{key}.vault_capacity"), capacity)?
            .set_default(format!("metals.{key}.exposure_band"), band)?
            .set_default(format!("metals.{key}.warning_threshold"), threshold)?
            .set_default(format!("metals.{key}.structural_spread"), spread)?;
    }
    Ok(builder)
}

fn non_negative(value: Decimal, field: &str) -> Result<Grams> {
    match Grams::try_new(value) {
        Some(grams) => Ok(grams),
        None => bail!("{field} must be non-negative, got {value}"),
    }
}

impl GatewayConfig {
    /// Load defaults, the TOML file at `path` (if it exists) and env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = defaults()?;

        if let Some(path) = path {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("BULLION")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: GatewayConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Compiled-in defaults only
    #[cfg(test)]
    pub fn default_config() -> Result<Self> {
        let cfg: GatewayConfig = defaults()?
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.reconciliation.interval_secs == 0 {
            bail!("reconciliation.interval_secs must be positive");
        }
        if self.reconciliation.tolerance_grams.is_sign_negative() {
            bail!("reconciliation.tolerance_grams must be non-negative");
        }
        if self.store.max_cas_attempts == 0 {
            bail!("store.max_cas_attempts must be positive");
        }
        self.metal_setups()?;
        Ok(())
    }

    /// Parse and check every `metals.<SYMBOL>` section, sorted by metal
    pub fn metal_setups(&self) -> Result<Vec<MetalSetup>> {
        let mut setups = Vec::with_capacity(self.metals.len());
        for (key, settings) in &self.metals {
            let metal = Metal::from_str(key).with_context(|| format!("metals.{key}"))?;
            let spread = settings.structural_spread;
            if spread.is_sign_negative() {
                bail!("metals.{key}.structural_spread must be non-negative");
            }
            setups.push(MetalSetup {
                metal,
                bootstrap: MetalBootstrap {
                    initial_stock: non_negative(settings.initial_stock, &format!("metals.{key}.initial_stock"))?,
                    warning_threshold: non_negative(
                        settings.warning_threshold,
                        &format!("metals.{key}.warning_threshold"),
                    )?,
                },
                limits: MetalLimits {
                    vault_capacity: non_negative(settings.vault_capacity, &format!("metals.{key}.vault_capacity"))?,
                    exposure_band: non_negative(settings.exposure_band, &format!("metals.{key}.exposure_band"))?,
                },
                structural_spread: spread,
            });
        }
        setups.sort_by_key(|s| s.metal);
        if setups.windows(2).any(|w| w[0].metal == w[1].metal) {
            bail!("a metal is configured twice under different names");
        }
        Ok(setups)
    }

    pub fn inventory_config(&self) -> Result<InventoryConfig> {
        Ok(InventoryConfig {
            limits: self
                .metal_setups()?
                .into_iter()
                .map(|s| (s.metal, s.limits))
                .collect(),
            max_cas_attempts: self.store.max_cas_attempts,
        })
    }

    pub fn matching_config(&self) -> Result<MatchingConfig> {
        Ok(MatchingConfig {
            spreads: self
                .metal_setups()?
                .into_iter()
                .map(|s| (s.metal, s.structural_spread))
                .collect(),
            max_cas_attempts: self.store.max_cas_attempts,
        })
    }

    pub fn hedge_config(&self) -> HedgeConfig {
        HedgeConfig {
            max_cas_attempts: self.store.max_cas_attempts,
        }
    }

    pub fn reconciliation_config(&self) -> ReconciliationConfig {
        ReconciliationConfig {
            tolerance_grams: self.reconciliation.tolerance_grams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_toml(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(f, "{}", content).unwrap();
        f
    }

    #[test]
    fn test_defaults_cover_all_metals() {
        let cfg = GatewayConfig::default_config().unwrap();
        assert!(cfg.policy.enforce_buy_capacity);
        assert!(!cfg.policy.enforce_sell_capacity);
        let setups = cfg.metal_setups().unwrap();
        let metals: Vec<Metal> = setups.iter().map(|s| s.metal).collect();
        assert_eq!(metals, Metal::ALL.to_vec());
        assert_eq!(setups[0].structural_spread, Decimal::new(50, 2));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let file = write_temp_toml(
            r#"
[policy]
enforce_sell_capacity = true

[reconciliation]
interval_secs = 5
tolerance_grams = "0.001"

[metals.xau]
initial_stock = "250"
vault_capacity = "1000"
exposure_band = "100"
warning_threshold = "10"
structural_spread = "0.75"
"#,
        );
        let cfg = GatewayConfig::load(Some(file.path())).unwrap();
        assert!(cfg.policy.enforce_sell_capacity);
        assert_eq!(cfg.reconciliation.interval_secs, 5);

        let gold = cfg
            .metal_setups()
            .unwrap()
            .into_iter()
            .find(|s| s.metal == Metal::XAU)
            .unwrap();
        assert_eq!(gold.bootstrap.initial_stock, Grams::from_u64(250));
        assert_eq!(gold.limits.exposure_band, Grams::from_u64(100));
        assert_eq!(gold.structural_spread, Decimal::new(75, 2));
    }

    #[test]
    fn test_metal_configured_twice_rejected() {
        let file = write_temp_toml(
            "[metals.gold]\ninitial_stock = \"1\"\nvault_capacity = \"1\"\nexposure_band = \"1\"\nwarning_threshold = \"1\"\nstructural_spread = \"1\"\n",
        );
        let err = GatewayConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("twice"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = GatewayConfig::load(Some(Path::new("does/not/exist.toml"))).unwrap();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let file = write_temp_toml("[reconciliation]\ninterval_secs = 0\n");
        assert!(GatewayConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        let file = write_temp_toml("[metals.xag]\ninitial_stock = \"-1\"\n");
        let err = GatewayConfig::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("initial_stock"));
    }

    #[test]
    fn test_unknown_metal_rejected() {
        let file = write_temp_toml(
            "[metals.xrh]\ninitial_stock = \"1\"\nvault_capacity = \"1\"\nexposure_band = \"1\"\nwarning_threshold = \"1\"\nstructural_spread = \"1\"\n",
        );
        assert!(GatewayConfig::load(Some(file.path())).is_err());
    }
}
