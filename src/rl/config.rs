//! RL Configuration
//!
//! Configuration structs for reinforcement learning components.

use serde::{Deserialize, Serialize};

use crate::error::{OptrlError, Result};

/// Core training hyperparameters
///
/// Every field is required in the experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Optimizer learning rate
    pub learning_rate: f64,
    /// Replay buffer capacity (hard cap)
    pub replay_buffer_max_length: usize,
    /// Transitions per gradient step
    pub batch_size: usize,
    /// Collect/learn cycles
    pub num_iterations: usize,
    /// Episodes per periodic evaluation
    pub num_eval_episodes: usize,
    /// Environment steps collected per iteration
    pub collect_steps_per_iteration: usize,
    /// Episodes for the final price estimate
    pub final_eval_episodes: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            replay_buffer_max_length: 100_000,
            batch_size: 64,
            num_iterations: 20_000,
            num_eval_episodes: 10,
            collect_steps_per_iteration: 1,
            final_eval_episodes: 1_000,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !(self.learning_rate > 0.0) || !self.learning_rate.is_finite() {
            errors.push(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if self.batch_size == 0 {
            errors.push("batch_size must be positive".to_string());
        }
        if self.replay_buffer_max_length < self.batch_size {
            errors.push(format!(
                "replay_buffer_max_length ({}) must be at least batch_size ({})",
                self.replay_buffer_max_length, self.batch_size
            ));
        }
        if self.num_eval_episodes == 0 {
            errors.push("num_eval_episodes must be positive".to_string());
        }
        if self.collect_steps_per_iteration == 0 {
            errors.push("collect_steps_per_iteration must be positive".to_string());
        }
        if self.final_eval_episodes == 0 {
            errors.push("final_eval_episodes must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(OptrlError::Configuration(errors.join("; ")))
        }
    }
}

/// Main RL configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RLConfig {
    /// Environment (action grid, costs, reward shaping)
    pub env: EnvConfig,
    /// Value network architecture
    pub network: NetworkConfig,
    /// DQN learner configuration
    pub dqn: DqnConfig,
    /// Policy-gradient learner configuration
    pub policy_gradient: PolicyGradientConfig,
    /// Training loop configuration
    pub training: TrainingConfig,
}

/// Hedging environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Number of evenly spaced hedge ratios in the action grid
    pub hedge_levels: usize,
    /// Proportional transaction cost on traded notional
    pub transaction_cost: f64,
    /// Risk aversion used to shape the training reward: r - (lambda / 2) * r^2
    pub risk_aversion: f64,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            hedge_levels: 11,
            transaction_cost: 0.0,
            risk_aversion: 0.1,
        }
    }
}

impl EnvConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hedge_levels < 2 {
            return Err(OptrlError::Configuration(format!(
                "hedge_levels must be at least 2, got {}",
                self.hedge_levels
            )));
        }
        if !(self.transaction_cost >= 0.0) {
            return Err(OptrlError::Configuration(format!(
                "transaction_cost must be non-negative, got {}",
                self.transaction_cost
            )));
        }
        if !(self.risk_aversion >= 0.0) {
            return Err(OptrlError::Configuration(format!(
                "risk_aversion must be non-negative, got {}",
                self.risk_aversion
            )));
        }
        Ok(())
    }
}

/// Value network architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Width of both hidden layers
    pub hidden_dim: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { hidden_dim: 100 }
    }
}

/// DQN hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    /// Discount factor (gamma); rewards are already discounted to inception
    pub gamma: f32,
    /// Learner updates between target-network syncs
    pub target_update_period: usize,
    /// Initial exploration rate (epsilon for epsilon-greedy)
    pub exploration_rate: f32,
    /// Exploration decay per episode
    pub exploration_decay: f32,
    /// Minimum exploration rate
    pub exploration_min: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            target_update_period: 100,
            exploration_rate: 1.0,
            exploration_decay: 0.995,
            exploration_min: 0.05,
        }
    }
}

/// Policy-gradient (REINFORCE) hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyGradientConfig {
    /// Discount factor for returns-to-go
    pub gamma: f32,
    /// Entropy bonus coefficient
    pub ent_coef: f32,
    /// Normalize returns within each batch
    pub normalize_returns: bool,
}

impl Default for PolicyGradientConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            ent_coef: 0.01,
            normalize_returns: true,
        }
    }
}

/// Training loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Iterations between periodic evaluations (0 disables them)
    pub eval_interval: usize,
    /// Iterations between progress log lines
    pub log_interval: usize,
    /// Trailing loss window for the convergence check
    pub convergence_window: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            eval_interval: 1_000,
            log_interval: 200,
            convergence_window: 500,
        }
    }
}
