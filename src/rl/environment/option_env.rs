//! Option Hedging Environment
//!
//! Finite-horizon MDP over the life of a European option. The agent picks a
//! hedge ratio at each rebalancing date; the episode return is the discounted
//! cost of replicating the option with that hedge.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::market::{PathModel, StochasticPathModel};
use super::{Environment, StepInfo, StepResult};
use crate::error::{OptrlError, Result};
use crate::pricing::{bs_price, OptionSpec};
use crate::rl::config::EnvConfig;
use crate::rl::core::{
    HedgeGrid, MarketState, RewardShaping, RewardSignal, RiskAdjustedReward, StateEncoder,
};

/// Option hedging environment
///
/// Each instance owns its RNG, so a training and an evaluation environment
/// never share random state.
pub struct OptionEnvironment {
    spec: OptionSpec,
    config: EnvConfig,
    model: PathModel,
    grid: HedgeGrid,
    encoder: StateEncoder,
    shaping: RiskAdjustedReward,
    seed: u64,
    rng: StdRng,
    state: MarketState,
    hedge: f64,
    episode_return: f64,
    episodes: usize,
}

impl OptionEnvironment {
    /// Create an environment; fails on an invalid contract or env config
    pub fn new(spec: OptionSpec, config: EnvConfig, seed: u64) -> Result<Self> {
        spec.validate()?;
        config.validate()?;

        let model = PathModel::from_spec(&spec)?;
        let grid = HedgeGrid::new(spec.option_type, config.hedge_levels)?;
        let encoder = StateEncoder::new(&spec);
        let shaping = RiskAdjustedReward::new(config.risk_aversion);
        let state = model.initial_state();

        Ok(Self {
            spec,
            config,
            model,
            grid,
            encoder,
            shaping,
            seed,
            rng: StdRng::seed_from_u64(seed),
            state,
            hedge: 0.0,
            episode_return: 0.0,
            episodes: 0,
        })
    }

    pub fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn grid(&self) -> &HedgeGrid {
        &self.grid
    }

    /// Current market state
    pub fn state(&self) -> &MarketState {
        &self.state
    }

    /// Hedge ratio currently held
    pub fn hedge(&self) -> f64 {
        self.hedge
    }

    /// Sum of raw rewards since the last reset
    pub fn episode_return(&self) -> f64 {
        self.episode_return
    }

    /// Episodes started since construction
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Discounted, dividend-reinvested value of one unit of the underlying
    fn gains(&self, time_index: usize, spot: f64) -> f64 {
        let t = time_index as f64 * self.spec.dt();
        (-(self.spec.rate - self.spec.dividend_yield) * t).exp() * spot
    }

    /// Discounted Black-Scholes reference value of the option
    fn reference_value(&self, state: &MarketState) -> f64 {
        let t = state.time(self.spec.dt());
        let remaining = (self.spec.maturity - t).max(0.0);
        let value = if state.time_index >= self.spec.steps {
            self.spec.option_type.payoff(state.spot, self.spec.strike)
        } else {
            bs_price(
                self.spec.option_type,
                state.spot,
                self.spec.strike,
                self.spec.rate,
                self.spec.dividend_yield,
                state.volatility,
                remaining,
            )
        };
        (-self.spec.rate * t).exp() * value
    }

    fn observation(&self) -> Vec<f32> {
        self.encoder.encode(&self.state, self.hedge)
    }
}

impl Environment for OptionEnvironment {
    fn reset(&mut self) -> Vec<f32> {
        self.state = self.model.initial_state();
        self.hedge = 0.0;
        self.episode_return = 0.0;
        self.episodes += 1;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<StepResult> {
        if self.is_terminal() {
            return Err(OptrlError::InvalidState(format!(
                "episode finished at step {}; call reset before stepping",
                self.state.time_index
            )));
        }

        let target = self.grid.hedge_ratio(action)?;
        let current = self.state;
        let gains_now = self.gains(current.time_index, current.spot);
        let t = current.time(self.spec.dt());
        let notional = (-self.spec.rate * t).exp() * current.spot;
        let trade_cost = self.config.transaction_cost * (target - self.hedge).abs() * notional;

        let next = self.model.advance(&current, self.spec.dt(), &mut self.rng);
        let gains_next = self.gains(next.time_index, next.spot);
        let hedge_pnl = target * (gains_next - gains_now);

        let done = next.time_index >= self.spec.steps;
        let payoff = if done {
            self.spec.discount_factor() * self.spec.option_type.payoff(next.spot, self.spec.strike)
        } else {
            0.0
        };
        let value_change = self.reference_value(&next) - self.reference_value(&current);

        let signal = RewardSignal::new(hedge_pnl, trade_cost, payoff, value_change);
        let training_reward = self.shaping.shape(&signal);

        self.state = next;
        self.hedge = target;
        self.episode_return += signal.total;

        if done {
            debug!(
                episode = self.episodes,
                spot = next.spot,
                episode_return = self.episode_return,
                "Episode finished"
            );
        }

        Ok(StepResult {
            observation: self.observation(),
            reward: signal.total,
            training_reward,
            done,
            info: StepInfo {
                time_index: next.time_index,
                spot: next.spot,
                volatility: next.volatility,
                hedge: target,
                trade_cost,
                hedge_pnl,
                hedging_error: signal.hedging_error(),
            },
        })
    }

    fn observation_dim(&self) -> usize {
        self.encoder.feature_dim()
    }

    fn num_actions(&self) -> usize {
        self.grid.len()
    }

    fn is_terminal(&self) -> bool {
        self.state.time_index >= self.spec.steps
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn reseed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }
}
