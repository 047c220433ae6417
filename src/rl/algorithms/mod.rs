//! RL Algorithms
//!
//! Learners share one capability: pick exploratory actions and take one
//! gradient step on a sampled batch. The trainer is written against
//! [`Learner`] only, so the algorithm is chosen once at construction.

pub mod dqn;
pub mod reinforce;

pub use dqn::DqnLearner;
pub use reinforce::ReinforceLearner;

use std::fmt;
use std::str::FromStr;

use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{OptrlError, Result};
use crate::rl::config::RLConfig;
use crate::rl::memory::TransitionBatch;
use crate::rl::networks::{ValueNetwork, ValueNetworkConfig};
use crate::rl::policy::GreedyPolicy;

/// Learning algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Value-based: Q-learning with replay and a target network
    #[serde(rename = "DQN")]
    Dqn,
    /// Likelihood-ratio policy gradient on returns-to-go
    #[serde(rename = "REINFORCE")]
    PolicyGradient,
}

impl Algorithm {
    /// Select from the `policy_based` experiment flag
    pub fn from_policy_based(policy_based: bool) -> Self {
        if policy_based {
            Self::PolicyGradient
        } else {
            Self::Dqn
        }
    }

    pub fn is_policy_based(self) -> bool {
        matches!(self, Self::PolicyGradient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dqn => "DQN",
            Self::PolicyGradient => "REINFORCE",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = OptrlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dqn" => Ok(Self::Dqn),
            "reinforce" | "policy_gradient" | "pg" => Ok(Self::PolicyGradient),
            other => Err(OptrlError::Configuration(format!(
                "unknown algorithm '{other}'"
            ))),
        }
    }
}

/// One learning strategy over the value network
pub trait Learner<B: AutodiffBackend> {
    fn algorithm(&self) -> Algorithm;

    /// Exploratory action for data collection
    fn select_action(&mut self, observation: &[f32], rng: &mut StdRng) -> Result<usize>;

    /// One gradient step on `batch`; returns the loss before the step
    fn update(&mut self, batch: &TransitionBatch) -> Result<f32>;

    /// Greedy snapshot of the current weights
    fn greedy_policy(&self) -> GreedyPolicy<B::InnerBackend>;

    /// Whether transitions need returns-to-go before they can be replayed
    fn needs_returns(&self) -> bool;

    /// Discount used for targets or returns-to-go
    fn gamma(&self) -> f32;

    /// Called by the trainer whenever a collection episode ends
    fn on_episode_end(&mut self) {}

    /// Gradient steps taken so far
    fn updates(&self) -> usize;
}

/// Build the learner for `algorithm` with an Adam optimizer
pub fn build_learner<B: AutodiffBackend>(
    algorithm: Algorithm,
    network: ValueNetworkConfig,
    rl: &RLConfig,
    learning_rate: f64,
    device: &B::Device,
) -> Box<dyn Learner<B>> {
    let optimizer = AdamConfig::new().init::<B, ValueNetwork<B>>();
    match algorithm {
        Algorithm::Dqn => Box::new(DqnLearner::new(
            network,
            rl.dqn.clone(),
            learning_rate,
            optimizer,
            device.clone(),
        )),
        Algorithm::PolicyGradient => Box::new(ReinforceLearner::new(
            network,
            rl.policy_gradient.clone(),
            learning_rate,
            optimizer,
            device.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_flag() {
        assert_eq!(Algorithm::from_policy_based(false), Algorithm::Dqn);
        assert_eq!(Algorithm::from_policy_based(true), Algorithm::PolicyGradient);
        assert!(Algorithm::PolicyGradient.is_policy_based());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("DQN".parse::<Algorithm>().unwrap(), Algorithm::Dqn);
        assert_eq!(
            "reinforce".parse::<Algorithm>().unwrap(),
            Algorithm::PolicyGradient
        );
        assert!("ppo".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_algorithm_serde_label() {
        let json = serde_json::to_string(&Algorithm::Dqn).unwrap();
        assert_eq!(json, "\"DQN\"");
    }
}
