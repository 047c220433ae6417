//! State Representation
//!
//! Market state of the simulated underlying and its encoding into the
//! observation vector fed to the agent.

use serde::{Deserialize, Serialize};

use crate::pricing::OptionSpec;

/// Observation features: time-to-maturity, log-moneyness, current hedge
pub const BASE_FEATURES: usize = 3;

/// Extra feature when volatility is stochastic: vol relative to base vol
pub const VOL_FEATURES: usize = 1;

/// Simulated market state
///
/// `spot` and `volatility` stay strictly positive for every reachable state;
/// `time_index` only moves forward within an episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Step index in `[0, N]`
    pub time_index: usize,
    /// Current spot price
    pub spot: f64,
    /// Instantaneous volatility
    pub volatility: f64,
}

impl MarketState {
    /// State at inception
    pub fn initial(spec: &OptionSpec) -> Self {
        Self {
            time_index: 0,
            spot: spec.spot,
            volatility: spec.volatility,
        }
    }

    /// Elapsed time in years
    pub fn time(&self, dt: f64) -> f64 {
        self.time_index as f64 * dt
    }
}

/// Encodes market state into normalized agent features
#[derive(Debug, Clone)]
pub struct StateEncoder {
    steps: usize,
    strike: f64,
    base_volatility: f64,
    include_volatility: bool,
}

impl StateEncoder {
    pub fn new(spec: &OptionSpec) -> Self {
        Self {
            steps: spec.steps,
            strike: spec.strike,
            base_volatility: spec.volatility,
            include_volatility: spec.dynamics.is_stochastic_vol(),
        }
    }

    /// Feature vector length
    pub fn feature_dim(&self) -> usize {
        if self.include_volatility {
            BASE_FEATURES + VOL_FEATURES
        } else {
            BASE_FEATURES
        }
    }

    /// Encode state plus the hedge currently held
    pub fn encode(&self, state: &MarketState, hedge: f64) -> Vec<f32> {
        let mut obs = Vec::with_capacity(self.feature_dim());

        let remaining = self.steps.saturating_sub(state.time_index) as f64;
        obs.push((remaining / self.steps as f64) as f32);
        obs.push((state.spot / self.strike).ln() as f32);
        obs.push(hedge as f32);

        if self.include_volatility {
            obs.push((state.volatility / self.base_volatility) as f32);
        }

        obs
    }
}
