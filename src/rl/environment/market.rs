//! Simulated Market Dynamics
//!
//! One-step samplers for the underlying. Spot (and volatility, when it is
//! stochastic) are always stepped in log space so they cannot change sign.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{OptrlError, Result};
use crate::pricing::{Dynamics, OptionSpec, StochasticVolParams};
use crate::rl::core::MarketState;

/// Advances a market state by one discrete time step
pub trait StochasticPathModel {
    /// State at inception
    fn initial_state(&self) -> MarketState;

    /// Sample the state one step of length `dt` after `state`
    fn advance(&self, state: &MarketState, dt: f64, rng: &mut StdRng) -> MarketState;
}

/// Geometric Brownian motion with constant drift and volatility
#[derive(Debug, Clone)]
pub struct GbmModel {
    spot: f64,
    drift: f64,
    volatility: f64,
}

impl GbmModel {
    pub fn new(spec: &OptionSpec) -> Result<Self> {
        check_positive("volatility", spec.volatility)?;
        check_positive("maturity", spec.maturity)?;
        check_steps(spec.steps)?;

        Ok(Self {
            spot: spec.spot,
            drift: spec.rate - spec.dividend_yield,
            volatility: spec.volatility,
        })
    }
}

impl StochasticPathModel for GbmModel {
    fn initial_state(&self) -> MarketState {
        MarketState {
            time_index: 0,
            spot: self.spot,
            volatility: self.volatility,
        }
    }

    fn advance(&self, state: &MarketState, dt: f64, rng: &mut StdRng) -> MarketState {
        let z: f64 = rng.sample(StandardNormal);
        let sigma = self.volatility;
        let log_return = (self.drift - 0.5 * sigma * sigma) * dt + sigma * dt.sqrt() * z;

        MarketState {
            time_index: state.time_index + 1,
            spot: state.spot * log_return.exp(),
            volatility: sigma,
        }
    }
}

/// Correlated log-normal stochastic volatility
///
/// `ln(sigma)` follows an Ornstein-Uhlenbeck process pulled towards
/// `ln(long_run_vol)` at rate `mean_reversion`; with zero mean reversion the
/// volatility is a driftless lognormal martingale. The spot uses the
/// volatility at the start of the step.
#[derive(Debug, Clone)]
pub struct StochasticVolModel {
    spot: f64,
    drift: f64,
    initial_vol: f64,
    params: StochasticVolParams,
}

impl StochasticVolModel {
    pub fn new(spec: &OptionSpec, params: StochasticVolParams) -> Result<Self> {
        check_positive("volatility", spec.volatility)?;
        check_positive("maturity", spec.maturity)?;
        check_steps(spec.steps)?;
        params.validate()?;

        Ok(Self {
            spot: spec.spot,
            drift: spec.rate - spec.dividend_yield,
            initial_vol: spec.volatility,
            params,
        })
    }
}

impl StochasticPathModel for StochasticVolModel {
    fn initial_state(&self) -> MarketState {
        MarketState {
            time_index: 0,
            spot: self.spot,
            volatility: self.initial_vol,
        }
    }

    fn advance(&self, state: &MarketState, dt: f64, rng: &mut StdRng) -> MarketState {
        let z1: f64 = rng.sample(StandardNormal);
        let w: f64 = rng.sample(StandardNormal);
        let rho = self.params.correlation;
        let z2 = rho * z1 + (1.0 - rho * rho).max(0.0).sqrt() * w;

        let sigma = state.volatility;
        let sqrt_dt = dt.sqrt();
        let log_return = (self.drift - 0.5 * sigma * sigma) * dt + sigma * sqrt_dt * z1;

        let nu = self.params.vol_of_vol;
        let kappa = self.params.mean_reversion;
        let reversion = if kappa > 0.0 {
            kappa * (self.params.long_run_vol.ln() - sigma.ln()) * dt
        } else {
            -0.5 * nu * nu * dt
        };
        let log_vol = sigma.ln() + reversion + nu * sqrt_dt * z2;

        MarketState {
            time_index: state.time_index + 1,
            spot: state.spot * log_return.exp(),
            volatility: log_vol.exp(),
        }
    }
}

/// Path model selected by the configured dynamics
#[derive(Debug, Clone)]
pub enum PathModel {
    Lognormal(GbmModel),
    StochasticVol(StochasticVolModel),
}

impl PathModel {
    pub fn from_spec(spec: &OptionSpec) -> Result<Self> {
        match spec.dynamics {
            Dynamics::Lognormal => Ok(Self::Lognormal(GbmModel::new(spec)?)),
            Dynamics::StochasticVol(params) => {
                Ok(Self::StochasticVol(StochasticVolModel::new(spec, params)?))
            }
        }
    }
}

impl StochasticPathModel for PathModel {
    fn initial_state(&self) -> MarketState {
        match self {
            Self::Lognormal(model) => model.initial_state(),
            Self::StochasticVol(model) => model.initial_state(),
        }
    }

    fn advance(&self, state: &MarketState, dt: f64, rng: &mut StdRng) -> MarketState {
        match self {
            Self::Lognormal(model) => model.advance(state, dt, rng),
            Self::StochasticVol(model) => model.advance(state, dt, rng),
        }
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(OptrlError::NumericDomain(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn check_steps(steps: usize) -> Result<()> {
    if steps == 0 {
        return Err(OptrlError::NumericDomain(
            "step count must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::OptionType;
    use rand::SeedableRng;

    fn spec(dynamics: Dynamics) -> OptionSpec {
        OptionSpec {
            spot: 100.0,
            strike: 100.0,
            rate: 0.01,
            dividend_yield: 0.0,
            volatility: 0.2,
            maturity: 1.0,
            steps: 50,
            option_type: OptionType::Put,
            dynamics,
        }
    }

    fn run_path(model: &PathModel, seed: u64, steps: usize) -> Vec<MarketState> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = model.initial_state();
        let mut path = vec![state];
        for _ in 0..steps {
            state = model.advance(&state, 0.02, &mut rng);
            path.push(state);
        }
        path
    }

    #[test]
    fn test_same_seed_same_path() {
        let model = PathModel::from_spec(&spec(Dynamics::Lognormal)).unwrap();
        assert_eq!(run_path(&model, 7, 50), run_path(&model, 7, 50));
        assert_ne!(run_path(&model, 7, 50), run_path(&model, 8, 50));
    }

    #[test]
    fn test_gbm_keeps_constant_vol() {
        let model = PathModel::from_spec(&spec(Dynamics::Lognormal)).unwrap();
        let path = run_path(&model, 3, 100);
        assert!(path.iter().all(|s| s.volatility == 0.2 && s.spot > 0.0));
        assert_eq!(path.last().unwrap().time_index, 100);
    }

    #[test]
    fn test_gbm_mean_matches_forward() {
        let model = GbmModel::new(&spec(Dynamics::Lognormal)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let n = 20_000;
        let mean = (0..n)
            .map(|_| model.advance(&model.initial_state(), 1.0, &mut rng).spot)
            .sum::<f64>()
            / n as f64;
        let forward = 100.0 * (0.01f64).exp();
        assert!((mean - forward).abs() < 0.5, "mean {mean} vs forward {forward}");
    }

    #[test]
    fn test_stochastic_vol_moves_vol() {
        let model =
            PathModel::from_spec(&spec(Dynamics::StochasticVol(StochasticVolParams::default())))
                .unwrap();
        let path = run_path(&model, 5, 20);
        assert!(path.windows(2).any(|w| w[0].volatility != w[1].volatility));
    }

    #[test]
    fn test_zero_mean_reversion_allowed() {
        let params = StochasticVolParams {
            mean_reversion: 0.0,
            ..Default::default()
        };
        let model = PathModel::from_spec(&spec(Dynamics::StochasticVol(params))).unwrap();
        let path = run_path(&model, 9, 500);
        assert!(path.iter().all(|s| s.spot > 0.0 && s.volatility > 0.0));
    }

    #[test]
    fn test_non_positive_inputs_rejected() {
        let mut bad = spec(Dynamics::Lognormal);
        bad.volatility = 0.0;
        assert!(matches!(
            PathModel::from_spec(&bad),
            Err(OptrlError::NumericDomain(_))
        ));

        let mut bad = spec(Dynamics::Lognormal);
        bad.maturity = -1.0;
        assert!(matches!(
            GbmModel::new(&bad),
            Err(OptrlError::NumericDomain(_))
        ));

        let mut bad = spec(Dynamics::Lognormal);
        bad.steps = 0;
        assert!(matches!(
            GbmModel::new(&bad),
            Err(OptrlError::NumericDomain(_))
        ));
    }
}
