//! Baseline Pricers
//!
//! Closed-form and lattice reference values for the option, independent of
//! the agent. Used only as comparison rows in the final report.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use tracing::info;

use super::option::{OptionSpec, OptionType};
use crate::error::{OptrlError, Result};

/// Label for the Black-Scholes row
pub const BLACK_SCHOLES_LABEL: &str = "BlackScholes";
/// Label for the CRR binomial row
pub const BINOMIAL_LABEL: &str = "BinomialCRR";
/// Label for the learned-policy row
pub const AGENT_LABEL: &str = "ReinforcementAgent";
/// Label for the Monte Carlo row of the discretized delta hedge
pub const DELTA_HEDGE_LABEL: &str = "DeltaHedgeMC";

/// Default depth of the comparison tree
pub const DEFAULT_TREE_STEPS: usize = 500;

/// Standard normal CDF
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Ordered label → price table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingResults {
    rows: Vec<(String, f64)>,
}

impl PricingResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a row, keeping first-insertion order
    pub fn insert(&mut self, label: impl Into<String>, price: f64) {
        let label = label.into();
        match self.rows.iter_mut().find(|(l, _)| *l == label) {
            Some(row) => row.1 = price,
            None => self.rows.push((label, price)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.rows.iter().find(|(l, _)| l == label).map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rows.iter().map(|(l, p)| (l.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reference pricer for an [`OptionSpec`]
///
/// Pure function of the spec: no randomness, no side effects.
#[derive(Debug, Clone)]
pub struct BaselinePricer {
    spec: OptionSpec,
    tree_steps: usize,
}

impl BaselinePricer {
    pub fn new(spec: OptionSpec) -> Self {
        Self {
            spec,
            tree_steps: DEFAULT_TREE_STEPS,
        }
    }

    pub fn with_tree_steps(mut self, tree_steps: usize) -> Self {
        self.tree_steps = tree_steps;
        self
    }

    pub fn spec(&self) -> &OptionSpec {
        &self.spec
    }

    /// Black-Scholes-Merton price with continuous dividend yield
    pub fn black_scholes(&self) -> f64 {
        let s = &self.spec;
        bs_price(
            s.option_type,
            s.spot,
            s.strike,
            s.rate,
            s.dividend_yield,
            s.volatility,
            s.maturity,
        )
    }

    /// Cox-Ross-Rubinstein tree price (European exercise)
    pub fn binomial(&self) -> Result<f64> {
        crr_price(&self.spec, self.tree_steps)
    }

    /// Both baseline rows
    pub fn baseline_model(&self) -> Result<PricingResults> {
        if self.spec.dynamics.is_stochastic_vol() {
            info!(
                "Baseline uses flat volatility {} under {} dynamics",
                self.spec.volatility,
                self.spec.dynamics.name()
            );
        }

        let mut results = PricingResults::new();
        results.insert(BLACK_SCHOLES_LABEL, self.black_scholes());
        results.insert(BINOMIAL_LABEL, self.binomial()?);
        Ok(results)
    }
}

#[inline]
fn d1_d2(
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> (f64, f64) {
    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 =
        ((spot / strike).ln() + (rate - dividend_yield + 0.5 * vol * vol) * expiry) / sig_sqrt_t;
    (d1, d1 - sig_sqrt_t)
}

/// Black-Scholes-Merton price
pub fn bs_price(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    if expiry <= 0.0 {
        return option_type.payoff(spot, strike);
    }
    let df_r = (-rate * expiry).exp();
    let df_q = (-dividend_yield * expiry).exp();
    if vol <= 0.0 {
        return option_type.payoff(spot * df_q, strike * df_r);
    }

    let (d1, d2) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    match option_type {
        OptionType::Call => spot * df_q * norm_cdf(d1) - strike * df_r * norm_cdf(d2),
        OptionType::Put => strike * df_r * norm_cdf(-d2) - spot * df_q * norm_cdf(-d1),
    }
}

/// Black-Scholes-Merton delta (sensitivity to spot)
pub fn bs_delta(
    option_type: OptionType,
    spot: f64,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    vol: f64,
    expiry: f64,
) -> f64 {
    if expiry <= 0.0 || vol <= 0.0 {
        return 0.0;
    }
    let (d1, _) = d1_d2(spot, strike, rate, dividend_yield, vol, expiry);
    let df_q = (-dividend_yield * expiry).exp();
    match option_type {
        OptionType::Call => df_q * norm_cdf(d1),
        OptionType::Put => df_q * (norm_cdf(d1) - 1.0),
    }
}

fn crr_price(spec: &OptionSpec, steps: usize) -> Result<f64> {
    if steps == 0 {
        return Err(OptrlError::NumericDomain(
            "binomial steps must be > 0".to_string(),
        ));
    }

    let dt = spec.maturity / steps as f64;
    let u = (spec.volatility * dt.sqrt()).exp();
    let d = 1.0 / u;
    let growth = ((spec.rate - spec.dividend_yield) * dt).exp();
    let p = (growth - d) / (u - d);
    if !(0.0..=1.0).contains(&p) || !p.is_finite() {
        return Err(OptrlError::NumericDomain(
            "risk-neutral probability is outside [0, 1]".to_string(),
        ));
    }
    let disc = (-spec.rate * dt).exp();
    let disc_p = disc * p;
    let disc_1mp = disc * (1.0 - p);

    // spot * u^j * d^(steps-j) = spot * d^steps * (u/d)^j
    let ratio = u / d;
    let mut values = Vec::with_capacity(steps + 1);
    let mut st = spec.spot * d.powi(steps as i32);
    for _ in 0..=steps {
        values.push(spec.option_type.payoff(st, spec.strike));
        st *= ratio;
    }

    for level in (0..steps).rev() {
        for j in 0..=level {
            values[j] = disc_1mp * values[j] + disc_p * values[j + 1];
        }
    }

    Ok(values[0])
}
