//! Training Infrastructure
//!
//! Training loop, evaluation rollouts, and policy checkpointing.

pub mod checkpointing;
pub mod trainer;

pub use checkpointing::{FrozenPolicy, PolicyManifest, PolicyStore};
pub use trainer::{compute_avg_return, ConvergenceMonitor, EvalPoint, Trainer, TrainingStats};
