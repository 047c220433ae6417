//! Experiment Runner
//!
//! Owns one experiment directory: runs the baselines, trains or loads the
//! agent, prices the option with it, and persists the pricing table,
//! metadata and greedy policy.
//!
//! ```text
//! <experiments_dir>/<id>/
//!     history/pricing.csv              (train + evaluate)
//!     history/pricing_evaluation.csv   (evaluate only)
//!     metadata.json
//!     greedy_policy/{model.mpk, policy.json}
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use burn::tensor::backend::Backend;
use chrono::Local;
use csv::Writer;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AppConfig, OptionSettings};
use crate::error::{OptrlError, Result};
use crate::pricing::{
    BaselinePricer, OptionSpec, PricingResults, AGENT_LABEL, DELTA_HEDGE_LABEL,
};
use crate::rl::networks::ValueNetworkConfig;
use crate::rl::{
    build_learner, compute_avg_return, Algorithm, DeltaHedgePolicy, Environment, Hyperparameters,
    OptionEnvironment, PolicyStore, ReplayBuffer, TrainBackend, Trainer, TrainingStats,
};

/// Pricing table written by a training run
pub const PRICING_FILE: &str = "pricing.csv";
/// Pricing table written by an evaluation-only run
pub const EVALUATION_FILE: &str = "pricing_evaluation.csv";
/// Metadata file name
pub const METADATA_FILE: &str = "metadata.json";
/// Policy directory name
pub const POLICY_DIR: &str = "greedy_policy";
/// Log directory name
pub const LOG_DIR: &str = "logs";

/// Experiment flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Train a new agent, price with it, save its policy
    TrainAndEvaluate,
    /// Price with the policy saved by an earlier run
    EvaluateOnly,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrainAndEvaluate => "train_evaluate",
            Self::EvaluateOnly => "evaluate",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = OptrlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train_evaluate" | "train" => Ok(Self::TrainAndEvaluate),
            "evaluate" | "eval" => Ok(Self::EvaluateOnly),
            other => Err(OptrlError::Configuration(format!(
                "flow must be 'train_evaluate' or 'evaluate', got '{other}'"
            ))),
        }
    }
}

/// Record of how a price was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    pub version: String,
    pub major_version: u32,
    pub minor_version: u32,
    pub patch_version: u32,
    pub experiment_id: String,
    pub mode: RunMode,
    pub algorithm: Algorithm,
    /// Local timestamp, `%Y-%m-%d_%H-%M-%S`
    pub model_date: String,
    pub training_time_secs: f64,
    pub policy_based: bool,
    pub seed: u64,
    pub option: OptionSettings,
    pub hyperparameters: Hyperparameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training: Option<TrainingStats>,
}

/// Results and metadata of one run
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub results: PricingResults,
    pub metadata: ExperimentMetadata,
}

/// Directory layout of one experiment
#[derive(Debug, Clone)]
pub struct ExperimentPaths {
    pub root: PathBuf,
    pub history: PathBuf,
    pub policy: PathBuf,
    pub metadata: PathBuf,
}

impl ExperimentPaths {
    pub fn new(experiments_dir: &Path, experiment_id: &str) -> Self {
        let root = experiments_dir.join(experiment_id);
        Self {
            history: root.join("history"),
            policy: root.join(POLICY_DIR),
            metadata: root.join(METADATA_FILE),
            root,
        }
    }

    /// Directory for the run's log file
    ///
    /// `None` for an evaluation of an experiment with no saved policy, so a
    /// run that is about to fail leaves nothing on disk.
    pub fn log_dir(&self, mode: RunMode) -> Option<PathBuf> {
        match mode {
            RunMode::EvaluateOnly if !PolicyStore::new(&self.policy).exists() => None,
            _ => Some(self.root.join(LOG_DIR)),
        }
    }
}

/// Runs one experiment against its directory
pub struct ExperimentRunner {
    config: AppConfig,
    experiment_id: String,
    algorithm: Algorithm,
    paths: ExperimentPaths,
}

impl ExperimentRunner {
    /// Validates the whole configuration before anything is built
    pub fn new(
        config: AppConfig,
        experiment_id: impl Into<String>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        let experiment_id = experiment_id.into();
        if experiment_id.trim().is_empty() {
            return Err(OptrlError::Configuration(
                "experiment id must not be empty".to_string(),
            ));
        }
        config.ensure_valid()?;

        let paths = ExperimentPaths::new(&config.experiments_dir, &experiment_id);
        Ok(Self {
            config,
            experiment_id,
            algorithm,
            paths,
        })
    }

    pub fn paths(&self) -> &ExperimentPaths {
        &self.paths
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn run(&self, mode: RunMode) -> Result<ExperimentReport> {
        info!(
            experiment = %self.experiment_id,
            mode = %mode,
            algorithm = %self.algorithm,
            dynamics = %self.config.option.dynamics,
            option_type = %self.config.option.option_type,
            "Experiment started"
        );

        let report = match mode {
            RunMode::TrainAndEvaluate => self.train_and_evaluate()?,
            RunMode::EvaluateOnly => self.evaluate_only()?,
        };

        info!(experiment = %self.experiment_id, "Experiment completed");
        Ok(report)
    }

    /// Baseline rows only
    pub fn baseline(&self) -> Result<PricingResults> {
        BaselinePricer::new(self.spec()?).baseline_model()
    }

    fn spec(&self) -> Result<OptionSpec> {
        self.config.option.to_option_spec()
    }

    fn env(&self, spec: OptionSpec, seed: u64) -> Result<OptionEnvironment> {
        OptionEnvironment::new(spec, self.config.rl.env.clone(), seed)
    }

    fn train_and_evaluate(&self) -> Result<ExperimentReport> {
        let spec = self.spec()?;
        let hyper = &self.config.hyperparameters;
        let mut results = self.baseline()?;

        let train_env = self.env(spec, self.config.train_seed())?;
        let eval_env = self.env(spec, self.config.eval_seed())?;

        TrainBackend::seed(self.config.train_seed());
        let device = Default::default();
        let network =
            ValueNetworkConfig::new(train_env.observation_dim(), train_env.num_actions())
                .with_hidden_dim(self.config.rl.network.hidden_dim);
        let learner = build_learner::<TrainBackend>(
            self.algorithm,
            network,
            &self.config.rl,
            hyper.learning_rate,
            &device,
        );
        let replay = ReplayBuffer::new(hyper.replay_buffer_max_length);

        let started = Instant::now();
        let mut trainer = Trainer::new(
            learner,
            replay,
            train_env,
            hyper.clone(),
            self.config.rl.training.clone(),
            self.config.train_seed(),
        )?
        .with_eval_env(eval_env);
        let policy = trainer.train()?;

        let mut final_env = self.env(spec, self.config.eval_seed())?;
        let price = compute_avg_return(&mut final_env, &policy, hyper.final_eval_episodes)?;
        results.insert(AGENT_LABEL, price);
        self.insert_delta_hedge(&mut results, spec, &mut final_env)?;
        let training_time_secs = started.elapsed().as_secs_f64();

        info!(
            price,
            episodes = hyper.final_eval_episodes,
            "Agent price estimate"
        );

        PolicyStore::new(&self.paths.policy).save(&policy)?;

        let metadata = self.metadata(
            RunMode::TrainAndEvaluate,
            training_time_secs,
            Some(trainer.stats().clone()),
        );
        fs::create_dir_all(&self.paths.history)?;
        write_pricing_csv(&self.paths.history.join(PRICING_FILE), &results)?;
        fs::write(
            &self.paths.metadata,
            serde_json::to_string_pretty(&metadata)?,
        )?;

        Ok(ExperimentReport { results, metadata })
    }

    fn evaluate_only(&self) -> Result<ExperimentReport> {
        info!(experiment = %self.experiment_id, "Evaluating saved policy");
        let policy = PolicyStore::new(&self.paths.policy).load()?;

        let spec = self.spec()?;
        let mut results = self.baseline()?;
        let mut env = self.env(spec, self.config.eval_seed())?;

        let manifest = policy.manifest();
        if manifest.observation_dim != env.observation_dim()
            || manifest.num_actions != env.num_actions()
        {
            return Err(OptrlError::Configuration(format!(
                "saved policy expects {} features and {} actions, environment has {} and {}",
                manifest.observation_dim,
                manifest.num_actions,
                env.observation_dim(),
                env.num_actions()
            )));
        }

        let started = Instant::now();
        let price = compute_avg_return(
            &mut env,
            &policy,
            self.config.hyperparameters.final_eval_episodes,
        )?;
        results.insert(AGENT_LABEL, price);
        self.insert_delta_hedge(&mut results, spec, &mut env)?;
        info!(price, "Agent price estimate");

        fs::create_dir_all(&self.paths.history)?;
        write_pricing_csv(&self.paths.history.join(EVALUATION_FILE), &results)?;

        let mut metadata =
            self.metadata(RunMode::EvaluateOnly, started.elapsed().as_secs_f64(), None);
        metadata.algorithm = manifest.algorithm;
        metadata.policy_based = manifest.algorithm.is_policy_based();

        Ok(ExperimentReport { results, metadata })
    }

    fn insert_delta_hedge(
        &self,
        results: &mut PricingResults,
        spec: OptionSpec,
        env: &mut OptionEnvironment,
    ) -> Result<()> {
        let delta = DeltaHedgePolicy::new(spec, env.grid().clone());
        let episodes = self.config.hyperparameters.final_eval_episodes;
        let price = compute_avg_return(env, &delta, episodes)?;
        results.insert(DELTA_HEDGE_LABEL, price);
        Ok(())
    }

    fn metadata(
        &self,
        mode: RunMode,
        training_time_secs: f64,
        training: Option<TrainingStats>,
    ) -> ExperimentMetadata {
        ExperimentMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            major_version: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            minor_version: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            patch_version: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
            experiment_id: self.experiment_id.clone(),
            mode,
            algorithm: self.algorithm,
            model_date: Local::now().format("%Y-%m-%d_%H-%M-%S").to_string(),
            training_time_secs,
            policy_based: self.algorithm.is_policy_based(),
            seed: self.config.seed,
            option: self.config.option.clone(),
            hyperparameters: self.config.hyperparameters.clone(),
            training,
        }
    }
}

/// Write `label,price` rows under a `Model,Price` header
pub fn write_pricing_csv(path: &Path, results: &PricingResults) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["Model", "Price"])?;
    for (label, price) in results.iter() {
        writer.write_record([label.to_string(), price.to_string()])?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = results.len(), "Wrote pricing table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_parse() {
        assert_eq!(
            "train_evaluate".parse::<RunMode>().unwrap(),
            RunMode::TrainAndEvaluate
        );
        assert_eq!("evaluate".parse::<RunMode>().unwrap(), RunMode::EvaluateOnly);
        assert!("deploy".parse::<RunMode>().is_err());
        assert_eq!(RunMode::EvaluateOnly.to_string(), "evaluate");
    }

    #[test]
    fn test_paths_layout() {
        let paths = ExperimentPaths::new(Path::new("experiments"), "7");
        assert_eq!(paths.root, PathBuf::from("experiments/7"));
        assert_eq!(paths.history, PathBuf::from("experiments/7/history"));
        assert_eq!(paths.policy, PathBuf::from("experiments/7/greedy_policy"));
        assert_eq!(paths.metadata, PathBuf::from("experiments/7/metadata.json"));
    }

    #[test]
    fn test_no_log_dir_for_evaluating_missing_experiment() {
        let root = std::env::temp_dir().join(format!("optrl_logs_{}", std::process::id()));
        let paths = ExperimentPaths::new(&root, "missing");

        assert_eq!(paths.log_dir(RunMode::EvaluateOnly), None);
        assert_eq!(
            paths.log_dir(RunMode::TrainAndEvaluate),
            Some(paths.root.join("logs"))
        );
        assert!(!paths.root.exists());
    }

    #[test]
    fn test_pricing_csv() {
        let dir = std::env::temp_dir().join(format!("optrl_csv_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pricing.csv");

        let mut results = PricingResults::new();
        results.insert("BlackScholes", 7.5);
        results.insert(AGENT_LABEL, 7.25);
        write_pricing_csv(&path, &results).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "Model,Price\nBlackScholes,7.5\nReinforcementAgent,7.25\n");
        fs::remove_dir_all(&dir).unwrap();
    }
}
