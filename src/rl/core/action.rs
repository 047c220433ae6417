//! Action Space
//!
//! Discrete hedge-ratio grid shared by the environment and the agents.

use serde::{Deserialize, Serialize};

use crate::error::{OptrlError, Result};
use crate::pricing::OptionType;

/// Discrete hedge grid
///
/// Action `i` holds `hedge_ratio(i)` units of the underlying per unit of the
/// option. Calls hedge long in `[0, 1]`, puts hedge short in `[-1, 0]`; the
/// levels are evenly spaced and fixed for the whole episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeGrid {
    levels: Vec<f64>,
}

impl HedgeGrid {
    /// Create a grid with `num_levels` evenly spaced hedge ratios
    pub fn new(option_type: OptionType, num_levels: usize) -> Result<Self> {
        if num_levels < 2 {
            return Err(OptrlError::Configuration(format!(
                "hedge grid needs at least 2 levels, got {num_levels}"
            )));
        }

        let (lo, hi) = match option_type {
            OptionType::Call => (0.0, 1.0),
            OptionType::Put => (-1.0, 0.0),
        };
        let step = (hi - lo) / (num_levels - 1) as f64;
        let levels = (0..num_levels).map(|i| lo + step * i as f64).collect();

        Ok(Self { levels })
    }

    /// Number of discrete actions
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Hedge ratio for an action index
    pub fn hedge_ratio(&self, action: usize) -> Result<f64> {
        self.levels.get(action).copied().ok_or_else(|| {
            OptrlError::InvalidState(format!(
                "action {action} outside hedge grid of {} levels",
                self.levels.len()
            ))
        })
    }

    /// Action whose hedge ratio is closest to `ratio`
    pub fn nearest_action(&self, ratio: f64) -> usize {
        self.levels
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (*a - ratio)
                    .abs()
                    .partial_cmp(&(*b - ratio).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_grid() {
        let grid = HedgeGrid::new(OptionType::Call, 11).unwrap();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid.hedge_ratio(0).unwrap(), 0.0);
        assert!((grid.hedge_ratio(10).unwrap() - 1.0).abs() < 1e-12);
        assert!((grid.hedge_ratio(5).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_put_grid() {
        let grid = HedgeGrid::new(OptionType::Put, 5).unwrap();
        assert_eq!(grid.hedge_ratio(0).unwrap(), -1.0);
        assert!(grid.hedge_ratio(4).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_action() {
        let grid = HedgeGrid::new(OptionType::Call, 3).unwrap();
        assert!(grid.hedge_ratio(3).is_err());
    }

    #[test]
    fn test_nearest_action() {
        let grid = HedgeGrid::new(OptionType::Call, 11).unwrap();
        assert_eq!(grid.nearest_action(0.54), 5);
        assert_eq!(grid.nearest_action(0.56), 6);
        assert_eq!(grid.nearest_action(2.0), 10);
        assert_eq!(grid.nearest_action(-3.0), 0);
    }

    #[test]
    fn test_too_few_levels() {
        assert!(HedgeGrid::new(OptionType::Put, 1).is_err());
    }
}
