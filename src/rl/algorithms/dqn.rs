//! Deep Q-Network learner
//!
//! Epsilon-greedy collection, squared TD error against a target network that
//! is re-synced every `target_update_period` gradient steps.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, TensorData};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use super::{Algorithm, Learner};
use crate::error::Result;
use crate::rl::config::DqnConfig;
use crate::rl::memory::TransitionBatch;
use crate::rl::networks::{observation_tensor, ValueNetwork, ValueNetworkConfig};
use crate::rl::policy::GreedyPolicy;

/// DQN learner
pub struct DqnLearner<B: AutodiffBackend, O> {
    config: DqnConfig,
    network_config: ValueNetworkConfig,
    model: ValueNetwork<B>,
    target: ValueNetwork<B::InnerBackend>,
    optimizer: O,
    learning_rate: f64,
    device: B::Device,
    /// Exploration rate (epsilon for epsilon-greedy)
    exploration_rate: f32,
    updates: usize,
}

impl<B, O> DqnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ValueNetwork<B>, B>,
{
    pub fn new(
        network_config: ValueNetworkConfig,
        config: DqnConfig,
        learning_rate: f64,
        optimizer: O,
        device: B::Device,
    ) -> Self {
        let model = network_config.init::<B>(&device);
        let target = model.valid();
        let exploration_rate = config.exploration_rate;

        Self {
            config,
            network_config,
            model,
            target,
            optimizer,
            learning_rate,
            device,
            exploration_rate,
            updates: 0,
        }
    }

    /// Current exploration rate
    pub fn exploration_rate(&self) -> f32 {
        self.exploration_rate
    }

    /// Decay exploration rate
    pub fn decay_exploration(&mut self) {
        self.exploration_rate =
            (self.exploration_rate * self.config.exploration_decay).max(self.config.exploration_min);
    }

    /// Copy the online weights into the target network
    pub fn sync_target(&mut self) {
        self.target = self.model.valid();
    }

    fn td_targets(&self, batch: &TransitionBatch) -> Tensor<B::InnerBackend, 1> {
        let n = batch.len();
        let next_states = observation_tensor::<B::InnerBackend>(
            &batch.next_states,
            n,
            batch.obs_dim,
            &self.device,
        );
        let next_max = self.target.forward(next_states).max_dim(1).squeeze::<1>(1);

        let rewards = Tensor::<B::InnerBackend, 1>::from_data(
            TensorData::new(batch.rewards.clone(), [n]),
            &self.device,
        );
        let not_done = Tensor::<B::InnerBackend, 1>::from_data(
            TensorData::new(batch.dones.iter().map(|d| 1.0 - d).collect::<Vec<f32>>(), [n]),
            &self.device,
        );

        rewards + next_max.mul(not_done).mul_scalar(self.config.gamma)
    }
}

impl<B, O> Learner<B> for DqnLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ValueNetwork<B>, B>,
{
    fn algorithm(&self) -> Algorithm {
        Algorithm::Dqn
    }

    fn select_action(&mut self, observation: &[f32], rng: &mut StdRng) -> Result<usize> {
        if rng.gen::<f32>() < self.exploration_rate {
            return Ok(rng.gen_range(0..self.network_config.num_actions));
        }
        self.model.valid().greedy_action(observation, &self.device)
    }

    fn update(&mut self, batch: &TransitionBatch) -> Result<f32> {
        let n = batch.len();
        let targets = Tensor::<B, 1>::from_inner(self.td_targets(batch));

        let states = observation_tensor::<B>(&batch.states, n, batch.obs_dim, &self.device);
        let actions = Tensor::<B, 2, Int>::from_data(
            TensorData::new(batch.actions.clone(), [n, 1]),
            &self.device,
        );
        let q_taken = self.model.forward(states).gather(1, actions).squeeze::<1>(1);

        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);
        self.updates += 1;

        if self.updates % self.config.target_update_period.max(1) == 0 {
            self.sync_target();
            debug!(updates = self.updates, "Target network synced");
        }

        Ok(loss_value)
    }

    fn greedy_policy(&self) -> GreedyPolicy<B::InnerBackend> {
        GreedyPolicy::new(
            self.model.valid(),
            self.network_config.clone(),
            Algorithm::Dqn,
            self.device.clone(),
        )
    }

    fn needs_returns(&self) -> bool {
        false
    }

    fn gamma(&self) -> f32 {
        self.config.gamma
    }

    fn on_episode_end(&mut self) {
        self.decay_exploration();
    }

    fn updates(&self) -> usize {
        self.updates
    }
}
