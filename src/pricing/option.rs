//! Option Contract
//!
//! Immutable description of the European option being priced and the
//! dynamics its underlying follows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OptrlError, Result};

/// Plain-vanilla option side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Right to buy at the strike
    Call,
    /// Right to sell at the strike
    Put,
}

impl OptionType {
    /// Undiscounted exercise value at `spot`
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl FromStr for OptionType {
    type Err = OptrlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(OptrlError::Configuration(format!(
                "option_type must be one of {{call, put}}, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the mean-reverting lognormal volatility process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticVolParams {
    /// Volatility of volatility (nu)
    pub vol_of_vol: f64,
    /// Speed of mean reversion of log-volatility (kappa); 0 gives a driftless lognormal vol
    pub mean_reversion: f64,
    /// Long-run volatility level (theta)
    pub long_run_vol: f64,
    /// Correlation between spot and volatility shocks
    pub correlation: f64,
}

impl Default for StochasticVolParams {
    fn default() -> Self {
        Self {
            vol_of_vol: 0.3,
            mean_reversion: 1.5,
            long_run_vol: 0.2,
            correlation: -0.5,
        }
    }
}

impl StochasticVolParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.vol_of_vol > 0.0) {
            return Err(OptrlError::NumericDomain(format!(
                "vol_of_vol must be positive, got {}",
                self.vol_of_vol
            )));
        }
        if !(self.long_run_vol > 0.0) {
            return Err(OptrlError::NumericDomain(format!(
                "long_run_vol must be positive, got {}",
                self.long_run_vol
            )));
        }
        if !(self.mean_reversion >= 0.0) {
            return Err(OptrlError::NumericDomain(format!(
                "mean_reversion must be non-negative, got {}",
                self.mean_reversion
            )));
        }
        if !(-1.0..=1.0).contains(&self.correlation) {
            return Err(OptrlError::NumericDomain(format!(
                "correlation must lie in [-1, 1], got {}",
                self.correlation
            )));
        }
        Ok(())
    }
}

/// Dynamics of the underlying
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Dynamics {
    /// Geometric Brownian motion with constant volatility
    Lognormal,
    /// Spot and volatility co-evolve
    StochasticVol(StochasticVolParams),
}

impl Dynamics {
    /// Parse the configuration name (`lognormal` / `stochastic_vol`)
    pub fn from_name(name: &str, params: Option<StochasticVolParams>) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lognormal" | "brownian" | "gbm" => Ok(Self::Lognormal),
            "stochastic_vol" | "sabr" => Ok(Self::StochasticVol(params.unwrap_or_default())),
            other => Err(OptrlError::Configuration(format!(
                "dynamics must be one of {{lognormal, stochastic_vol}}, got '{other}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lognormal => "lognormal",
            Self::StochasticVol(_) => "stochastic_vol",
        }
    }

    pub fn is_stochastic_vol(&self) -> bool {
        matches!(self, Self::StochasticVol(_))
    }
}

/// European option contract plus market inputs
///
/// Created once per experiment and never mutated. Use [`OptionSpec::new`] so
/// every field is validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Initial spot price (S0)
    pub spot: f64,
    /// Strike price (K)
    pub strike: f64,
    /// Continuously compounded risk-free rate (r)
    pub rate: f64,
    /// Continuous dividend yield (d)
    pub dividend_yield: f64,
    /// Base volatility (sigma)
    pub volatility: f64,
    /// Time to maturity in years (T)
    pub maturity: f64,
    /// Number of hedging/time steps to maturity (N)
    pub steps: usize,
    pub option_type: OptionType,
    pub dynamics: Dynamics,
}

impl OptionSpec {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
        maturity: f64,
        steps: usize,
        option_type: OptionType,
        dynamics: Dynamics,
    ) -> Result<Self> {
        let spec = Self {
            spot,
            strike,
            rate,
            dividend_yield,
            volatility,
            maturity,
            steps,
            option_type,
            dynamics,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check every field; rate and dividend yield may be zero or negative
    pub fn validate(&self) -> Result<()> {
        if !(self.spot > 0.0) {
            return Err(OptrlError::Configuration(format!(
                "spot must be positive, got {}",
                self.spot
            )));
        }
        if !(self.strike > 0.0) {
            return Err(OptrlError::Configuration(format!(
                "strike must be positive, got {}",
                self.strike
            )));
        }
        if !self.rate.is_finite() || !self.dividend_yield.is_finite() {
            return Err(OptrlError::Configuration(
                "rate and dividend_yield must be finite".to_string(),
            ));
        }
        if !(self.volatility > 0.0) {
            return Err(OptrlError::NumericDomain(format!(
                "volatility must be positive, got {}",
                self.volatility
            )));
        }
        if !(self.maturity > 0.0) {
            return Err(OptrlError::NumericDomain(format!(
                "maturity must be positive, got {}",
                self.maturity
            )));
        }
        if self.steps == 0 {
            return Err(OptrlError::NumericDomain(
                "step count must be positive".to_string(),
            ));
        }
        if let Dynamics::StochasticVol(params) = &self.dynamics {
            params.validate()?;
        }
        Ok(())
    }

    /// Length of one time step in years
    pub fn dt(&self) -> f64 {
        self.maturity / self.steps as f64
    }

    /// Discount factor from maturity back to inception
    pub fn discount_factor(&self) -> f64 {
        (-self.rate * self.maturity).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_spec() -> OptionSpec {
        OptionSpec::new(
            100.0,
            100.0,
            0.01,
            0.0,
            0.2,
            1.0,
            50,
            OptionType::Put,
            Dynamics::Lognormal,
        )
        .unwrap()
    }

    #[test]
    fn test_option_type_parsing() {
        assert_eq!("call".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!(" PUT ".parse::<OptionType>().unwrap(), OptionType::Put);

        let err = "straddle".parse::<OptionType>().unwrap_err();
        assert!(matches!(err, OptrlError::Configuration(_)));
    }

    #[test]
    fn test_payoff() {
        assert_eq!(OptionType::Call.payoff(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.payoff(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.payoff(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.payoff(110.0, 100.0), 0.0);
    }

    #[test]
    fn test_dynamics_from_name() {
        assert_eq!(
            Dynamics::from_name("lognormal", None).unwrap(),
            Dynamics::Lognormal
        );
        assert!(Dynamics::from_name("stochastic_vol", None)
            .unwrap()
            .is_stochastic_vol());
        assert!(Dynamics::from_name("heston", None).is_err());
    }

    #[test]
    fn test_negative_rate_allowed() {
        let spec = OptionSpec {
            rate: -0.005,
            dividend_yield: -0.01,
            ..put_spec()
        };
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_non_positive_fields_rejected() {
        let base = put_spec();

        let err = OptionSpec { strike: 0.0, ..base }.validate().unwrap_err();
        assert!(matches!(err, OptrlError::Configuration(_)));

        let err = OptionSpec { spot: -1.0, ..base }.validate().unwrap_err();
        assert!(matches!(err, OptrlError::Configuration(_)));

        let err = OptionSpec {
            volatility: 0.0,
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, OptrlError::NumericDomain(_)));

        let err = OptionSpec {
            maturity: 0.0,
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, OptrlError::NumericDomain(_)));

        let err = OptionSpec { steps: 0, ..base }.validate().unwrap_err();
        assert!(matches!(err, OptrlError::NumericDomain(_)));
    }

    #[test]
    fn test_stochastic_vol_params_validated() {
        let spec = OptionSpec {
            dynamics: Dynamics::StochasticVol(StochasticVolParams {
                correlation: 1.5,
                ..Default::default()
            }),
            ..put_spec()
        };
        assert!(matches!(
            spec.validate().unwrap_err(),
            OptrlError::NumericDomain(_)
        ));
    }

    #[test]
    fn test_dt() {
        let spec = put_spec();
        assert!((spec.dt() - 0.02).abs() < 1e-15);
    }
}
