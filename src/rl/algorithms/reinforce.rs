//! REINFORCE policy-gradient learner
//!
//! The value network outputs action logits. Loss is
//! `-mean(log pi(a|s) * A) - ent_coef * H(pi)` where `A` are the batch's
//! returns-to-go, normalized when configured.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, TensorData};
use rand::rngs::StdRng;
use rand::Rng;

use super::{Algorithm, Learner};
use crate::error::{OptrlError, Result};
use crate::rl::config::PolicyGradientConfig;
use crate::rl::memory::TransitionBatch;
use crate::rl::networks::{observation_tensor, ValueNetwork, ValueNetworkConfig};
use crate::rl::policy::GreedyPolicy;

/// REINFORCE learner
pub struct ReinforceLearner<B: AutodiffBackend, O> {
    config: PolicyGradientConfig,
    network_config: ValueNetworkConfig,
    model: ValueNetwork<B>,
    optimizer: O,
    learning_rate: f64,
    device: B::Device,
    updates: usize,
}

impl<B, O> ReinforceLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ValueNetwork<B>, B>,
{
    pub fn new(
        network_config: ValueNetworkConfig,
        config: PolicyGradientConfig,
        learning_rate: f64,
        optimizer: O,
        device: B::Device,
    ) -> Self {
        let model = network_config.init::<B>(&device);
        Self {
            config,
            network_config,
            model,
            optimizer,
            learning_rate,
            device,
            updates: 0,
        }
    }

    /// Action probabilities for one observation
    pub fn action_probs(&self, observation: &[f32]) -> Result<Vec<f32>> {
        let model = self.model.valid();
        let input = observation_tensor::<B::InnerBackend>(
            observation,
            1,
            observation.len(),
            &self.device,
        );
        softmax(model.forward(input), 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| OptrlError::Tensor(format!("failed to read action probabilities: {e:?}")))
    }

    fn advantages(&self, returns: &[f32]) -> Vec<f32> {
        if !self.config.normalize_returns || returns.len() < 2 {
            return returns.to_vec();
        }
        let n = returns.len() as f32;
        let mean = returns.iter().sum::<f32>() / n;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f32>() / n;
        let std = var.sqrt().max(1e-8);
        returns.iter().map(|r| (r - mean) / std).collect()
    }
}

/// Inverse-CDF draw from a discrete distribution
fn sample_categorical(probs: &[f32], rng: &mut StdRng) -> usize {
    let u: f32 = rng.gen();
    let mut cumulative = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}

impl<B, O> Learner<B> for ReinforceLearner<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ValueNetwork<B>, B>,
{
    fn algorithm(&self) -> Algorithm {
        Algorithm::PolicyGradient
    }

    fn select_action(&mut self, observation: &[f32], rng: &mut StdRng) -> Result<usize> {
        let probs = self.action_probs(observation)?;
        Ok(sample_categorical(&probs, rng))
    }

    fn update(&mut self, batch: &TransitionBatch) -> Result<f32> {
        let n = batch.len();
        let states = observation_tensor::<B>(&batch.states, n, batch.obs_dim, &self.device);
        let actions = Tensor::<B, 2, Int>::from_data(
            TensorData::new(batch.actions.clone(), [n, 1]),
            &self.device,
        );
        let advantages = Tensor::<B, 1>::from_data(
            TensorData::new(self.advantages(&batch.returns), [n]),
            &self.device,
        );

        let log_probs = log_softmax(self.model.forward(states), 1);
        let taken = log_probs.clone().gather(1, actions).squeeze::<1>(1);
        let policy_loss = (taken * advantages).mean().neg();

        let entropy = (log_probs.clone().exp() * log_probs)
            .sum_dim(1)
            .mean()
            .neg();
        let loss = policy_loss - entropy.mul_scalar(self.config.ent_coef);
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);
        self.updates += 1;

        Ok(loss_value)
    }

    fn greedy_policy(&self) -> GreedyPolicy<B::InnerBackend> {
        GreedyPolicy::new(
            self.model.valid(),
            self.network_config.clone(),
            Algorithm::PolicyGradient,
            self.device.clone(),
        )
    }

    fn needs_returns(&self) -> bool {
        true
    }

    fn gamma(&self) -> f32 {
        self.config.gamma
    }

    fn updates(&self) -> usize {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::memory::Transition;
    use crate::rl::TrainBackend;
    use burn::optim::AdamConfig;
    use rand::SeedableRng;

    fn learner(
        config: PolicyGradientConfig,
    ) -> ReinforceLearner<TrainBackend, impl Optimizer<ValueNetwork<TrainBackend>, TrainBackend>>
    {
        ReinforceLearner::new(
            ValueNetworkConfig::new(3, 4).with_hidden_dim(16),
            config,
            5e-2,
            AdamConfig::new().init::<TrainBackend, ValueNetwork<TrainBackend>>(),
            Default::default(),
        )
    }

    #[test]
    fn test_probs_sum_to_one() {
        let learner = learner(PolicyGradientConfig::default());
        let probs = learner.action_probs(&[0.5, 0.1, 0.0]).unwrap();
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_sample_categorical() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..50 {
            assert_eq!(sample_categorical(&[0.0, 1.0, 0.0], &mut rng), 1);
        }
    }

    #[test]
    fn test_advantage_normalization() {
        let learner = learner(PolicyGradientConfig::default());
        let adv = learner.advantages(&[1.0, 2.0, 3.0]);
        assert!(adv.iter().sum::<f32>().abs() < 1e-5);
        assert!(adv[0] < 0.0 && adv[2] > 0.0);
    }

    #[test]
    fn test_update_favors_rewarded_action() {
        let mut learner = learner(PolicyGradientConfig {
            ent_coef: 0.0,
            ..Default::default()
        });
        let obs = vec![0.5, 0.0, 0.0];
        let transitions: Vec<Transition> = (0..8)
            .map(|i| {
                let action = i % 2;
                let ret = if action == 1 { 1.0 } else { -1.0 };
                Transition::new(obs.clone(), action, ret, obs.clone(), true).with_return(ret)
            })
            .collect();
        let batch = TransitionBatch::from_transitions(&transitions).unwrap();

        let before = learner.action_probs(&obs).unwrap()[1];
        for _ in 0..20 {
            learner.update(&batch).unwrap();
        }
        let after = learner.action_probs(&obs).unwrap()[1];
        assert!(after > before, "p(a=1) {before} -> {after}");
        assert_eq!(learner.updates(), 20);
    }
}
