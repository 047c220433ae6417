//! Policies
//!
//! Observation-to-action mappings used for evaluation rollouts.

use burn::prelude::*;

use crate::error::Result;
use crate::pricing::{bs_delta, OptionSpec};
use crate::rl::algorithms::Algorithm;
use crate::rl::core::HedgeGrid;
use crate::rl::networks::{ValueNetwork, ValueNetworkConfig};

/// Deterministic map from observation to action
pub trait Policy {
    fn action(&self, observation: &[f32]) -> Result<usize>;
}

/// Greedy policy over a network snapshot
///
/// Picks the action with the largest network output. Produced by a learner
/// from its live weights or rebuilt from a saved policy directory.
#[derive(Debug, Clone)]
pub struct GreedyPolicy<B: Backend> {
    network: ValueNetwork<B>,
    config: ValueNetworkConfig,
    algorithm: Algorithm,
    device: B::Device,
}

impl<B: Backend> GreedyPolicy<B> {
    pub fn new(
        network: ValueNetwork<B>,
        config: ValueNetworkConfig,
        algorithm: Algorithm,
        device: B::Device,
    ) -> Self {
        Self {
            network,
            config,
            algorithm,
            device,
        }
    }

    pub fn network(&self) -> &ValueNetwork<B> {
        &self.network
    }

    pub fn network_config(&self) -> &ValueNetworkConfig {
        &self.config
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> Policy for GreedyPolicy<B> {
    fn action(&self, observation: &[f32]) -> Result<usize> {
        self.network.greedy_action(observation, &self.device)
    }
}

/// Black-Scholes delta hedge snapped to the action grid
///
/// Reads time-to-maturity and moneyness back out of the observation, so it
/// runs against the same environment interface as a learned policy.
#[derive(Debug, Clone)]
pub struct DeltaHedgePolicy {
    spec: OptionSpec,
    grid: HedgeGrid,
}

impl DeltaHedgePolicy {
    pub fn new(spec: OptionSpec, grid: HedgeGrid) -> Self {
        Self { spec, grid }
    }
}

impl Policy for DeltaHedgePolicy {
    fn action(&self, observation: &[f32]) -> Result<usize> {
        let remaining = observation.first().copied().unwrap_or(0.0) as f64;
        let log_moneyness = observation.get(1).copied().unwrap_or(0.0) as f64;
        let vol_ratio = observation.get(3).copied().map_or(1.0, f64::from);

        let delta = bs_delta(
            self.spec.option_type,
            self.spec.strike * log_moneyness.exp(),
            self.spec.strike,
            self.spec.rate,
            self.spec.dividend_yield,
            self.spec.volatility * vol_ratio,
            remaining * self.spec.maturity,
        );
        Ok(self.grid.nearest_action(delta))
    }
}
