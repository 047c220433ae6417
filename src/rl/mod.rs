//! Reinforcement Learning Module
//!
//! Learns to price and hedge an option on simulated paths using the Burn
//! framework.
//!
//! # Features
//!
//! - **Environment**: Option hedging MDP over GBM or stochastic-vol paths
//! - **Action Space**: Discrete grid of hedge ratios
//! - **Algorithms**: DQN with target network, REINFORCE
//! - **Evaluation**: Monte Carlo price from greedy policy rollouts

pub mod algorithms;
pub mod config;
pub mod core;
pub mod environment;
pub mod memory;
pub mod networks;
pub mod policy;
pub mod training;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;

/// CPU backend used for rollouts and saved policies
pub type InferenceBackend = NdArray<f32>;
/// Autodiff backend used by the learners
pub type TrainBackend = Autodiff<InferenceBackend>;

// Config exports
pub use config::{
    DqnConfig, EnvConfig, Hyperparameters, NetworkConfig, PolicyGradientConfig, RLConfig,
    TrainingConfig,
};

// Core exports
pub use core::{HedgeGrid, MarketState, RewardSignal, StateEncoder};

// Memory exports
pub use memory::{ReplayBuffer, Transition};

// Algorithm exports
pub use algorithms::{build_learner, Algorithm, DqnLearner, Learner, ReinforceLearner};

// Policy exports
pub use policy::{DeltaHedgePolicy, GreedyPolicy, Policy};

// Environment exports
pub use environment::{
    Environment, OptionEnvironment, PathModel, StepInfo, StepResult, StochasticPathModel,
};

// Training exports
pub use training::{
    compute_avg_return, FrozenPolicy, PolicyManifest, PolicyStore, Trainer, TrainingStats,
};
