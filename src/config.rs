use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OptrlError, Result};
use crate::pricing::{Dynamics, OptionSpec, OptionType, StochasticVolParams};
use crate::rl::{Hyperparameters, RLConfig};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub option: OptionSettings,
    pub hyperparameters: Hyperparameters,
    #[serde(default)]
    pub rl: RLConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Root directory for experiment outputs
    #[serde(default = "default_experiments_dir")]
    pub experiments_dir: PathBuf,
    /// Base seed; train and eval environments derive their own from it
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Option contract and market inputs as configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSettings {
    /// Initial spot (S0)
    pub spot: f64,
    /// Strike (K)
    pub strike: f64,
    /// Risk-free rate (r)
    pub rate: f64,
    /// Volatility (sigma)
    pub volatility: f64,
    /// Continuous dividend yield (d)
    pub dividend_yield: f64,
    /// Maturity in years (T)
    pub maturity: f64,
    /// Rebalancing steps to maturity (N)
    pub steps: usize,
    /// `lognormal` or `stochastic_vol`
    pub dynamics: String,
    pub option_type: OptionType,
    /// Volatility process parameters for `stochastic_vol`
    #[serde(default)]
    pub stochastic_vol: Option<StochasticVolParams>,
}

impl OptionSettings {
    /// Build the validated contract
    pub fn to_option_spec(&self) -> Result<OptionSpec> {
        let dynamics = Dynamics::from_name(&self.dynamics, self.stochastic_vol)?;
        OptionSpec::new(
            self.spot,
            self.strike,
            self.rate,
            self.dividend_yield,
            self.volatility,
            self.maturity,
            self.steps,
            self.option_type,
            dynamics,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directives when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info,optrl=debug".to_string()
}

fn default_experiments_dir() -> PathBuf {
    PathBuf::from("experiments")
}

fn default_seed() -> u64 {
    42
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Ok(Self::builder(config_dir.as_ref())?.build()?.try_deserialize()?)
    }

    /// Load configuration, then apply explicit `key = value` overrides on top
    pub fn load_with_overrides<P: AsRef<Path>>(
        config_dir: P,
        overrides: &[(&str, String)],
    ) -> Result<Self> {
        let mut builder = Self::builder(config_dir.as_ref())?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str())?;
        }
        Ok(builder.build()?.try_deserialize()?)
    }

    fn builder(config_dir: &Path) -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            // Start with default values
            .set_default("logging.level", "info,optrl=debug")?
            .set_default("logging.json", false)?
            .set_default("experiments_dir", "experiments")?
            .set_default("seed", 42)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/research.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("OPTRL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (OPTRL_OPTION__STRIKE, etc.)
            .add_source(
                Environment::with_prefix("OPTRL")
                    .separator("__")
                    .try_parsing(true),
            ))
    }

    /// Create a configuration from explicit parts with default RL settings
    pub fn from_parts(option: OptionSettings, hyperparameters: Hyperparameters) -> Self {
        Self {
            option,
            hyperparameters,
            rl: RLConfig::default(),
            logging: LoggingConfig::default(),
            experiments_dir: default_experiments_dir(),
            seed: default_seed(),
        }
    }

    /// Seed of the training environment
    pub fn train_seed(&self) -> u64 {
        self.seed
    }

    /// Seed of the evaluation environment, distinct from the training one
    pub fn eval_seed(&self) -> u64 {
        self.seed.wrapping_add(1_000_003)
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.option.to_option_spec() {
            errors.push(e.to_string());
        }
        if let Err(e) = self.hyperparameters.validate() {
            errors.push(e.to_string());
        }
        if let Err(e) = self.rl.env.validate() {
            errors.push(e.to_string());
        }
        if self.rl.network.hidden_dim == 0 {
            errors.push("rl.network.hidden_dim must be positive".to_string());
        }
        if self.rl.dqn.target_update_period == 0 {
            errors.push("rl.dqn.target_update_period must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one configuration error
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()
            .map_err(|errors| OptrlError::Configuration(errors.join("; ")))
    }
}
