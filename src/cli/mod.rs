//! optrl CLI
//!
//! Commands:
//! - `optrl run` - Train and/or evaluate an agent for one experiment
//! - `optrl baseline` - Print the closed-form and tree prices only

pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::error::Result;
use crate::experiment::RunMode;
use crate::pricing::OptionType;
use crate::rl::Algorithm;

/// Option pricing with reinforcement learning
#[derive(Parser, Debug)]
#[command(name = "optrl")]
#[command(author, version, about = "Price and hedge European options with RL agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml plus OPTRL_ENV overlay)
    #[arg(short, long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Print results as JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one experiment
    Run {
        /// Experiment number, names the output directory
        #[arg(short = 'n', long, env = "EXPERIMENT_NO")]
        experiment_no: String,

        /// Use the policy-gradient agent instead of DQN
        #[arg(long, default_value = "no", value_parser = parse_yes_no, action = clap::ArgAction::Set)]
        policy_based: bool,

        /// Override option.option_type from the configuration
        #[arg(long, value_parser = parse_option_type)]
        option_type: Option<OptionType>,

        /// train_evaluate or evaluate
        #[arg(long, default_value = "train_evaluate", value_parser = parse_flow)]
        flow: RunMode,
    },

    /// Price with Black-Scholes and the binomial tree only
    Baseline {
        /// Override option.option_type from the configuration
        #[arg(long, value_parser = parse_option_type)]
        option_type: Option<OptionType>,
    },
}

impl Commands {
    pub fn option_type(&self) -> Option<OptionType> {
        match self {
            Self::Run { option_type, .. } | Self::Baseline { option_type } => *option_type,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Run { policy_based, .. } => Algorithm::from_policy_based(*policy_based),
            Self::Baseline { .. } => Algorithm::Dqn,
        }
    }
}

impl Cli {
    /// Load configuration with command-line overrides applied
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut overrides = Vec::new();
        if let Some(option_type) = self.command.option_type() {
            overrides.push(("option.option_type", option_type.as_str().to_string()));
        }
        AppConfig::load_with_overrides(&self.config_dir, &overrides)
    }
}

fn parse_yes_no(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        other => Err(format!("expected yes or no, got '{other}'")),
    }
}

fn parse_option_type(value: &str) -> std::result::Result<OptionType, String> {
    value.parse().map_err(|e: crate::error::OptrlError| e.to_string())
}

fn parse_flow(value: &str) -> std::result::Result<RunMode, String> {
    value.parse().map_err(|e: crate::error::OptrlError| e.to_string())
}
