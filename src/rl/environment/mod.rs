//! Simulated Option Market Environment for RL Training
//!
//! This module provides a gym-like environment interface and the option
//! hedging environment built on the simulated path models.

mod market;
mod option_env;

pub use market::{GbmModel, PathModel, StochasticPathModel, StochasticVolModel};
pub use option_env::OptionEnvironment;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result of taking a step in the environment
#[derive(Debug, Clone)]
pub struct StepResult {
    /// New observation after action
    pub observation: Vec<f32>,
    /// Raw reward, summed into the episode return
    pub reward: f64,
    /// Risk-shaped reward the learners train on
    pub training_reward: f32,
    /// Whether episode is done
    pub done: bool,
    /// Additional info
    pub info: StepInfo,
}

/// Additional step information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepInfo {
    /// Step index after the transition
    pub time_index: usize,
    /// Spot after the transition
    pub spot: f64,
    /// Volatility after the transition
    pub volatility: f64,
    /// Hedge ratio held over the step
    pub hedge: f64,
    /// Discounted transaction cost paid
    pub trade_cost: f64,
    /// Discounted gain of the hedge position
    pub hedge_pnl: f64,
    /// Wealth change of the hedged book against the reference value
    pub hedging_error: f64,
}

/// Episodic environment with a discrete action space
pub trait Environment {
    /// Start a new episode and return its first observation
    fn reset(&mut self) -> Vec<f32>;

    /// Apply an action; errors when the episode is already finished
    fn step(&mut self, action: usize) -> Result<StepResult>;

    fn observation_dim(&self) -> usize;

    fn num_actions(&self) -> usize;

    fn is_terminal(&self) -> bool;

    /// Seed the random stream was last started from
    fn seed(&self) -> u64;

    /// Restart the random stream from `seed`
    fn reseed(&mut self, seed: u64);
}
