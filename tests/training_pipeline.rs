use std::fs;
use std::path::PathBuf;

use optrl::config::{AppConfig, OptionSettings};
use optrl::error::OptrlError;
use optrl::experiment::{ExperimentRunner, RunMode, METADATA_FILE, PRICING_FILE};
use optrl::pricing::{
    Dynamics, OptionSpec, OptionType, AGENT_LABEL, BINOMIAL_LABEL, BLACK_SCHOLES_LABEL,
    DELTA_HEDGE_LABEL,
};
use optrl::rl::networks::ValueNetworkConfig;
use optrl::rl::{
    build_learner, compute_avg_return, Algorithm, EnvConfig, Environment, Hyperparameters,
    OptionEnvironment, Policy, PolicyStore, RLConfig, ReplayBuffer, TrainBackend, Trainer,
    TrainingConfig,
};

const STEPS: usize = 10;

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("optrl_it_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn option_settings() -> OptionSettings {
    OptionSettings {
        spot: 100.0,
        strike: 100.0,
        rate: 0.01,
        volatility: 0.2,
        dividend_yield: 0.0,
        maturity: 1.0,
        steps: STEPS,
        dynamics: "lognormal".to_string(),
        option_type: OptionType::Put,
        stochastic_vol: None,
    }
}

fn hyperparameters() -> Hyperparameters {
    Hyperparameters {
        learning_rate: 1e-3,
        replay_buffer_max_length: 500,
        batch_size: 16,
        num_iterations: 30,
        num_eval_episodes: 2,
        collect_steps_per_iteration: 1,
        final_eval_episodes: 8,
    }
}

fn spec() -> OptionSpec {
    OptionSpec::new(
        100.0,
        100.0,
        0.01,
        0.0,
        0.2,
        1.0,
        STEPS,
        OptionType::Put,
        Dynamics::Lognormal,
    )
    .expect("valid spec")
}

fn env(seed: u64) -> OptionEnvironment {
    OptionEnvironment::new(spec(), EnvConfig::default(), seed).expect("env")
}

fn trainer(algorithm: Algorithm) -> Trainer<TrainBackend, OptionEnvironment> {
    let train_env = env(1);
    let device = Default::default();
    let network = ValueNetworkConfig::new(train_env.observation_dim(), train_env.num_actions())
        .with_hidden_dim(16);
    let learner = build_learner::<TrainBackend>(
        algorithm,
        network,
        &RLConfig::default(),
        1e-3,
        &device,
    );
    let training = TrainingConfig {
        eval_interval: 10,
        log_interval: 5,
        convergence_window: 10,
    };
    Trainer::new(
        learner,
        ReplayBuffer::new(500),
        train_env,
        hyperparameters(),
        training,
        7,
    )
    .expect("trainer")
    .with_eval_env(env(2))
}

/// Both learners complete a short run and record their progress.
#[test]
fn short_training_runs_complete_for_both_algorithms() {
    for algorithm in [Algorithm::Dqn, Algorithm::PolicyGradient] {
        let mut trainer = trainer(algorithm);
        let policy = trainer.train().expect("train");

        let stats = trainer.stats();
        assert_eq!(stats.iterations, 30, "{algorithm}");
        assert_eq!(stats.updates, 30, "{algorithm}");
        assert!(stats.last_loss.is_finite(), "{algorithm}: loss {}", stats.last_loss);
        assert_eq!(stats.eval_history.len(), 3, "{algorithm}");
        assert!(trainer.replay().len() >= 16);
        assert_eq!(policy.algorithm(), algorithm);
    }
}

/// A frozen policy evaluated twice on the same environment gives bit-identical prices.
#[test]
fn compute_avg_return_is_reproducible() {
    let mut trainer = trainer(Algorithm::Dqn);
    let policy = trainer.train().expect("train");

    let mut eval_env = env(99);
    let first = compute_avg_return(&mut eval_env, &policy, 6).expect("first");
    let second = compute_avg_return(&mut eval_env, &policy, 6).expect("second");
    assert_eq!(first.to_bits(), second.to_bits());

    let err = compute_avg_return(&mut eval_env, &policy, 0).expect_err("zero episodes");
    assert!(matches!(err, OptrlError::Configuration(_)));
}

/// A saved and reloaded policy acts exactly like the live one.
#[test]
fn saved_policy_matches_live_policy() {
    let mut trainer = trainer(Algorithm::PolicyGradient);
    let live = trainer.train().expect("train");

    let dir = temp_dir("policy_roundtrip");
    let store = PolicyStore::new(&dir);
    let manifest = store.save(&live).expect("save");
    assert!(store.exists());
    assert_eq!(manifest.algorithm, Algorithm::PolicyGradient);

    let frozen = store.load().expect("load");
    let mut replay_env = env(5);
    let mut observation = replay_env.reset();
    loop {
        let action = live.action(&observation).expect("live action");
        assert_eq!(frozen.action(&observation).expect("frozen action"), action);
        let result = replay_env.step(action).expect("step");
        if result.done {
            break;
        }
        observation = result.observation;
    }

    let live_price = compute_avg_return(&mut env(6), &live, 5).expect("live price");
    let frozen_price = compute_avg_return(&mut env(6), &frozen, 5).expect("frozen price");
    assert_eq!(live_price.to_bits(), frozen_price.to_bits());
    fs::remove_dir_all(&dir).expect("cleanup");
}

/// Evaluating an experiment that never saved a policy fails with MissingArtifact.
#[test]
fn evaluate_only_without_saved_policy_is_missing_artifact() {
    let root = temp_dir("missing_policy");
    let mut config = AppConfig::from_parts(option_settings(), hyperparameters());
    config.experiments_dir = root.clone();

    let runner = ExperimentRunner::new(config, "404", Algorithm::Dqn).expect("runner");
    let err = runner.run(RunMode::EvaluateOnly).expect_err("no policy saved");
    assert!(matches!(err, OptrlError::MissingArtifact { .. }), "got {err:?}");
    assert!(!runner.paths().history.exists());
}

/// Train-then-evaluate writes every artifact, and a later evaluate-only run reuses the policy.
#[test]
fn experiment_train_then_evaluate_round_trip() {
    let root = temp_dir("experiment");
    let mut config = AppConfig::from_parts(option_settings(), hyperparameters());
    config.experiments_dir = root.clone();
    config.rl.network.hidden_dim = 16;
    config.rl.training.eval_interval = 10;

    let runner = ExperimentRunner::new(config.clone(), "1", Algorithm::Dqn).expect("runner");
    let report = runner.run(RunMode::TrainAndEvaluate).expect("train run");

    for label in [BLACK_SCHOLES_LABEL, BINOMIAL_LABEL, AGENT_LABEL, DELTA_HEDGE_LABEL] {
        let price = report.results.get(label).unwrap_or(f64::NAN);
        assert!(price.is_finite(), "{label} missing or not finite");
    }
    assert!(report.metadata.training.is_some());

    let paths = runner.paths();
    assert!(paths.history.join(PRICING_FILE).is_file());
    assert!(paths.root.join(METADATA_FILE).is_file());
    assert!(PolicyStore::new(&paths.policy).exists());

    let csv = fs::read_to_string(paths.history.join(PRICING_FILE)).expect("csv");
    assert!(csv.starts_with("Model,Price\n"));

    let evaluator = ExperimentRunner::new(config, "1", Algorithm::PolicyGradient).expect("runner");
    let evaluation = evaluator.run(RunMode::EvaluateOnly).expect("evaluate run");
    assert_eq!(evaluation.metadata.algorithm, Algorithm::Dqn);
    assert_eq!(
        evaluation.results.get(AGENT_LABEL).map(f64::to_bits),
        report.results.get(AGENT_LABEL).map(f64::to_bits),
        "same eval seed and same weights must give the same price"
    );

    fs::remove_dir_all(&root).expect("cleanup");
}
