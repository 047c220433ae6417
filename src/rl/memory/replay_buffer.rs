//! Replay Buffer
//!
//! Experience replay for off-policy learning and per-episode return
//! accumulation for the policy-gradient learner.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{OptrlError, Result};

/// A single transition in the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Observation before the action
    pub state: Vec<f32>,
    /// Index into the hedge grid
    pub action: usize,
    /// Risk-shaped training reward
    pub reward: f32,
    /// Observation after the action
    pub next_state: Vec<f32>,
    /// Whether the episode terminated
    pub done: bool,
    /// Discounted return from this step (policy-gradient only)
    pub return_to_go: Option<f32>,
}

impl Transition {
    /// Create a new transition
    pub fn new(
        state: Vec<f32>,
        action: usize,
        reward: f32,
        next_state: Vec<f32>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
            return_to_go: None,
        }
    }

    /// Set the return-to-go
    pub fn with_return(mut self, return_to_go: f32) -> Self {
        self.return_to_go = Some(return_to_go);
        self
    }
}

/// Fixed-capacity FIFO replay buffer
///
/// Once full, every insert evicts the oldest transition first, so the buffer
/// never holds more than `capacity` entries.
#[derive(Debug)]
pub struct ReplayBuffer {
    /// Storage for transitions, oldest first
    buffer: VecDeque<Transition>,
    /// Maximum capacity
    capacity: usize,
}

impl ReplayBuffer {
    /// Create a new replay buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition, evicting the oldest one at capacity
    pub fn add(&mut self, transition: Transition) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` transitions uniformly with replacement
    pub fn sample<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Vec<Transition>> {
        if batch_size == 0 || self.buffer.len() < batch_size {
            return Err(OptrlError::InsufficientData {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }

        Ok((0..batch_size)
            .map(|_| self.buffer[rng.gen_range(0..self.buffer.len())].clone())
            .collect())
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    /// Clear all transitions
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get current number of transitions
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if buffer has enough samples for training
    pub fn has_enough_samples(&self, min_samples: usize) -> bool {
        self.buffer.len() >= min_samples
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Transitions of the episode in progress
///
/// Returns-to-go are only known once the episode ends, so the
/// policy-gradient learner buffers here and drains into the replay buffer.
#[derive(Debug, Default)]
pub struct EpisodeBuffer {
    transitions: Vec<Transition>,
}

impl EpisodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Fill discounted returns-to-go and drain the episode
    pub fn finish(&mut self, gamma: f32) -> Vec<Transition> {
        let mut running = 0.0;
        let mut finished: Vec<Transition> = self
            .transitions
            .drain(..)
            .rev()
            .map(|t| {
                running = t.reward + gamma * running;
                t.with_return(running)
            })
            .collect();
        finished.reverse();
        finished
    }
}

/// Column-major view of a batch of transitions, ready for tensor building
#[derive(Debug, Clone)]
pub struct TransitionBatch {
    /// Row-major `[batch, obs_dim]` observations
    pub states: Vec<f32>,
    pub actions: Vec<i64>,
    pub rewards: Vec<f32>,
    /// Row-major `[batch, obs_dim]` next observations
    pub next_states: Vec<f32>,
    /// 1.0 for terminal transitions
    pub dones: Vec<f32>,
    /// Returns-to-go, zero where absent
    pub returns: Vec<f32>,
    pub obs_dim: usize,
}

impl TransitionBatch {
    pub fn from_transitions(batch: &[Transition]) -> Result<Self> {
        let obs_dim = batch
            .first()
            .map(|t| t.state.len())
            .ok_or_else(|| OptrlError::InvalidState("empty transition batch".to_string()))?;

        let mut states = Vec::with_capacity(batch.len() * obs_dim);
        let mut next_states = Vec::with_capacity(batch.len() * obs_dim);
        for t in batch {
            if t.state.len() != obs_dim || t.next_state.len() != obs_dim {
                return Err(OptrlError::InvalidState(format!(
                    "observation length mismatch: expected {obs_dim}"
                )));
            }
            states.extend_from_slice(&t.state);
            next_states.extend_from_slice(&t.next_state);
        }

        Ok(Self {
            states,
            actions: batch.iter().map(|t| t.action as i64).collect(),
            rewards: batch.iter().map(|t| t.reward).collect(),
            next_states,
            dones: batch.iter().map(|t| if t.done { 1.0 } else { 0.0 }).collect(),
            returns: batch.iter().map(|t| t.return_to_go.unwrap_or(0.0)).collect(),
            obs_dim,
        })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_transition(reward: f32, done: bool) -> Transition {
        Transition::new(vec![0.0; 3], 0, reward, vec![0.0; 3], done)
    }

    #[test]
    fn test_replay_buffer_add() {
        let mut buffer = ReplayBuffer::new(10);

        for i in 0..15 {
            buffer.add(make_transition(i as f32, false));
        }

        // Should only keep last 10
        assert_eq!(buffer.len(), 10);
        let rewards: Vec<f32> = buffer.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, (5..15).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_replay_buffer_sample() {
        let mut buffer = ReplayBuffer::new(100);
        let mut rng = StdRng::seed_from_u64(0);

        for i in 0..50 {
            buffer.add(make_transition(i as f32, false));
        }

        let batch = buffer.sample(10, &mut rng).unwrap();
        assert_eq!(batch.len(), 10);
        // With replacement: a batch larger than the buffer is still valid
        assert_eq!(buffer.sample(50, &mut rng).unwrap().len(), 50);
    }

    #[test]
    fn test_sample_insufficient() {
        let mut buffer = ReplayBuffer::new(10);
        let mut rng = StdRng::seed_from_u64(0);
        buffer.add(make_transition(1.0, false));

        match buffer.sample(2, &mut rng) {
            Err(OptrlError::InsufficientData {
                requested,
                available,
            }) => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_episode_buffer_returns() {
        let mut episode = EpisodeBuffer::new();
        episode.push(make_transition(1.0, false));
        episode.push(make_transition(2.0, false));
        episode.push(make_transition(3.0, true));

        let finished = episode.finish(0.5);
        let returns: Vec<f32> = finished.iter().filter_map(|t| t.return_to_go).collect();
        assert_eq!(returns, vec![2.75, 3.5, 3.0]);
        assert!(episode.is_empty());
    }

    #[test]
    fn test_batch_layout() {
        let transitions = vec![
            Transition::new(vec![1.0, 2.0], 3, 0.5, vec![3.0, 4.0], false),
            Transition::new(vec![5.0, 6.0], 1, -0.5, vec![7.0, 8.0], true).with_return(2.0),
        ];
        let batch = TransitionBatch::from_transitions(&transitions).unwrap();
        assert_eq!(batch.obs_dim, 2);
        assert_eq!(batch.states, vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(batch.next_states, vec![3.0, 4.0, 7.0, 8.0]);
        assert_eq!(batch.actions, vec![3, 1]);
        assert_eq!(batch.dones, vec![0.0, 1.0]);
        assert_eq!(batch.returns, vec![0.0, 2.0]);
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(TransitionBatch::from_transitions(&[]).is_err());
    }
}
