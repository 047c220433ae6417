//! Neural Network Architectures
//!
//! Value network shared by the value-based and policy-gradient learners.

pub mod value;

pub use value::{argmax, observation_tensor, ValueNetwork, ValueNetworkConfig};
