//! Reward Functions
//!
//! Reward of the hedging MDP and the risk shaping applied to the training
//! signal.

use serde::{Deserialize, Serialize};

/// Reward signal components, all discounted to inception
///
/// `total` is the raw reward that episode returns sum. `value_change` marks the
/// short option to a Black-Scholes reference so the risk penalty sees the
/// hedging error of every step instead of only at maturity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    /// Gain of the hedge position held over the step
    pub hedge_pnl: f64,
    /// Transaction cost of the rebalance
    pub trade_cost: f64,
    /// Option payoff (final step only)
    pub payoff: f64,
    /// Change in the reference value of the option over the step
    pub value_change: f64,
    /// Raw reward, the writer's replication cash flow: payoff - hedge P&L + cost
    pub total: f64,
}

impl RewardSignal {
    pub fn new(hedge_pnl: f64, trade_cost: f64, payoff: f64, value_change: f64) -> Self {
        Self {
            hedge_pnl,
            trade_cost,
            payoff,
            value_change,
            total: payoff - hedge_pnl + trade_cost,
        }
    }

    /// Reward the learners chase: costs count against the agent
    pub fn net_of_costs(&self) -> f64 {
        self.payoff - self.hedge_pnl - self.trade_cost
    }

    /// Wealth change of the hedged short-option book over the step
    pub fn hedging_error(&self) -> f64 {
        self.hedge_pnl - self.value_change - self.trade_cost
    }
}

/// Trait for turning a raw reward into the learner's training signal
pub trait RewardShaping: Send + Sync {
    fn shape(&self, signal: &RewardSignal) -> f32;
}

/// Mean-variance shaping: `r - (lambda / 2) * e^2`, with `r` net of costs and
/// `e` the step hedging error
#[derive(Debug, Clone, Copy)]
pub struct RiskAdjustedReward {
    risk_aversion: f64,
}

impl RiskAdjustedReward {
    pub fn new(risk_aversion: f64) -> Self {
        Self { risk_aversion }
    }
}

impl RewardShaping for RiskAdjustedReward {
    fn shape(&self, signal: &RewardSignal) -> f32 {
        let error = signal.hedging_error();
        (signal.net_of_costs() - 0.5 * self.risk_aversion * error * error) as f32
    }
}
