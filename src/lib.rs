pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod pricing;
pub mod rl;

pub use config::AppConfig;
pub use error::{OptrlError, Result};
pub use experiment::{ExperimentReport, ExperimentRunner, RunMode};
pub use pricing::{BaselinePricer, OptionSpec, OptionType, PricingResults};
