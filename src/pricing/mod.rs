//! Option contract and reference pricers

pub mod baseline;
pub mod option;

pub use baseline::{
    bs_delta, bs_price, norm_cdf, BaselinePricer, PricingResults, AGENT_LABEL, BINOMIAL_LABEL,
    BLACK_SCHOLES_LABEL, DELTA_HEDGE_LABEL,
};
pub use option::{Dynamics, OptionSpec, OptionType, StochasticVolParams};
