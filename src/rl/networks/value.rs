//! Value Network
//!
//! Maps an observation to one output per hedge action: Q-values for the DQN
//! learner, action logits for the policy-gradient learner.

use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::OptrlError;

/// Value network configuration
#[derive(Config, Debug)]
pub struct ValueNetworkConfig {
    /// Observation dimension
    pub input_dim: usize,
    /// Number of discrete actions
    pub num_actions: usize,
    /// Width of both hidden layers
    #[config(default = "100")]
    pub hidden_dim: usize,
}

/// Two-layer MLP with one output per action
#[derive(Module, Debug)]
pub struct ValueNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    head: Linear<B>,
    activation: Relu,
}

impl ValueNetworkConfig {
    /// Initialize value network
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueNetwork<B> {
        ValueNetwork {
            fc1: LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            fc2: LinearConfig::new(self.hidden_dim, self.hidden_dim).init(device),
            head: LinearConfig::new(self.hidden_dim, self.num_actions).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> ValueNetwork<B> {
    /// Forward pass, `[batch, input_dim] -> [batch, num_actions]`
    pub fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.fc1.forward(state));
        let x = self.activation.forward(self.fc2.forward(x));
        self.head.forward(x)
    }

    /// Index of the largest output for a single observation
    pub fn greedy_action(&self, observation: &[f32], device: &B::Device) -> crate::error::Result<usize> {
        let input = observation_tensor::<B>(observation, 1, observation.len(), device);
        let outputs = self.forward(input).into_data().to_vec::<f32>().map_err(|e| {
            OptrlError::Tensor(format!("failed to read network output: {e:?}"))
        })?;
        argmax(&outputs)
            .ok_or_else(|| OptrlError::Tensor("network produced no outputs".to_string()))
    }
}

/// Build a `[rows, dim]` tensor from row-major values
pub fn observation_tensor<B: Backend>(
    values: &[f32],
    rows: usize,
    dim: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(values.to_vec(), [rows, dim]), device)
}

/// First index of the maximum; NaNs never win
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i).or(if values.is_empty() { None } else { Some(0) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let network = ValueNetworkConfig::new(3, 11)
            .with_hidden_dim(16)
            .init::<TestBackend>(&device);

        let input = observation_tensor::<TestBackend>(&[0.0; 12], 4, 3, &device);
        let output = network.forward(input);
        assert_eq!(output.dims(), [4, 11]);
    }

    #[test]
    fn test_greedy_action_in_range() {
        let device = Default::default();
        let network = ValueNetworkConfig::new(4, 5).init::<TestBackend>(&device);
        let action = network.greedy_action(&[1.0, 0.1, -0.5, 1.2], &device).unwrap();
        assert!(action < 5);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5, -1.0]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
