//! Core RL abstractions
//!
//! Fundamental types for state representation, actions, and rewards.

pub mod action;
pub mod reward;
pub mod state;

pub use action::HedgeGrid;
pub use reward::{RewardShaping, RewardSignal, RiskAdjustedReward};
pub use state::{MarketState, StateEncoder, BASE_FEATURES, VOL_FEATURES};
