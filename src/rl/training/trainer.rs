//! Training Loop
//!
//! Alternates collection and learning on a single thread. Collection is the
//! only writer of the replay buffer and the learner is the only writer of the
//! network weights.

use std::collections::VecDeque;
use std::time::Instant;

use burn::tensor::backend::AutodiffBackend;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{OptrlError, Result};
use crate::rl::algorithms::Learner;
use crate::rl::config::{Hyperparameters, TrainingConfig};
use crate::rl::environment::Environment;
use crate::rl::memory::{EpisodeBuffer, ReplayBuffer, Transition, TransitionBatch};
use crate::rl::policy::{GreedyPolicy, Policy};

/// Periodic evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalPoint {
    pub iteration: usize,
    pub avg_return: f64,
}

/// Training statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Collect/learn cycles completed
    pub iterations: usize,
    /// Environment steps taken, warm-up included
    pub env_steps: usize,
    /// Collection episodes completed
    pub episodes: usize,
    /// Gradient steps performed
    pub updates: usize,
    /// Latest loss
    pub last_loss: f32,
    /// Raw return of the latest collection episode
    pub last_episode_return: f64,
    /// Convergence warnings emitted
    pub convergence_warnings: usize,
    /// Periodic evaluation history
    pub eval_history: Vec<EvalPoint>,
    /// Wall-clock seconds spent in `train`
    pub training_time_secs: f64,
}

/// Trailing-window check that the loss is still going down
///
/// Once per full window, compares the mean loss of the newer half against
/// the older half. Advisory only.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    window: usize,
    losses: VecDeque<f32>,
    seen: usize,
}

impl ConvergenceMonitor {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            losses: VecDeque::with_capacity(window),
            seen: 0,
        }
    }

    /// Record a loss; true when the window shows no improvement
    pub fn record(&mut self, loss: f32) -> bool {
        if self.window < 2 {
            return false;
        }
        if self.losses.len() == self.window {
            self.losses.pop_front();
        }
        self.losses.push_back(loss);
        self.seen += 1;

        if self.losses.len() < self.window || self.seen % self.window != 0 {
            return false;
        }

        let half = self.window / 2;
        let older = self.losses.iter().take(half).sum::<f32>() / half as f32;
        let newer =
            self.losses.iter().skip(half).sum::<f32>() / (self.window - half) as f32;
        newer >= older
    }

    /// Mean of the losses currently in the window
    pub fn mean(&self) -> Option<f32> {
        if self.losses.is_empty() {
            None
        } else {
            Some(self.losses.iter().sum::<f32>() / self.losses.len() as f32)
        }
    }
}

/// Average raw episode return of `policy` on `env`
///
/// Restarts the environment's random stream from its seed first, so the same
/// frozen policy always gets the same answer. Never touches a learner.
pub fn compute_avg_return<E, P>(env: &mut E, policy: &P, num_episodes: usize) -> Result<f64>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    if num_episodes == 0 {
        return Err(OptrlError::Configuration(
            "num_episodes must be positive".to_string(),
        ));
    }

    env.reseed(env.seed());
    let mut total = 0.0;
    for _ in 0..num_episodes {
        let mut observation = env.reset();
        let mut episode_return = 0.0;
        loop {
            let action = policy.action(&observation)?;
            let result = env.step(action)?;
            episode_return += result.reward;
            if result.done {
                break;
            }
            observation = result.observation;
        }
        total += episode_return;
    }

    Ok(total / num_episodes as f64)
}

/// Collection/learning loop around a [`Learner`]
pub struct Trainer<B: AutodiffBackend, E: Environment> {
    learner: Box<dyn Learner<B>>,
    replay: ReplayBuffer,
    episode: EpisodeBuffer,
    train_env: E,
    eval_env: Option<E>,
    hyper: Hyperparameters,
    config: TrainingConfig,
    rng: StdRng,
    observation: Vec<f32>,
    episode_return: f64,
    needs_reset: bool,
    monitor: ConvergenceMonitor,
    stats: TrainingStats,
}

impl<B: AutodiffBackend, E: Environment> Trainer<B, E> {
    pub fn new(
        learner: Box<dyn Learner<B>>,
        replay: ReplayBuffer,
        train_env: E,
        hyper: Hyperparameters,
        config: TrainingConfig,
        seed: u64,
    ) -> Result<Self> {
        hyper.validate()?;
        if replay.capacity() < hyper.batch_size {
            return Err(OptrlError::Configuration(format!(
                "replay capacity {} is smaller than batch_size {}",
                replay.capacity(),
                hyper.batch_size
            )));
        }

        let monitor = ConvergenceMonitor::new(config.convergence_window);
        Ok(Self {
            learner,
            replay,
            episode: EpisodeBuffer::new(),
            train_env,
            eval_env: None,
            hyper,
            config,
            rng: StdRng::seed_from_u64(seed),
            observation: Vec::new(),
            episode_return: 0.0,
            needs_reset: true,
            monitor,
            stats: TrainingStats::default(),
        })
    }

    /// Environment used for periodic evaluation during training
    pub fn with_eval_env(mut self, env: E) -> Self {
        self.eval_env = Some(env);
        self
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    pub fn learner(&self) -> &dyn Learner<B> {
        self.learner.as_ref()
    }

    /// Run warm-up collection then `num_iterations` collect/learn cycles
    pub fn train(&mut self) -> Result<GreedyPolicy<B::InnerBackend>> {
        let started = Instant::now();
        info!(
            algorithm = %self.learner.algorithm(),
            iterations = self.hyper.num_iterations,
            batch_size = self.hyper.batch_size,
            "Starting training"
        );

        while !self.replay.has_enough_samples(self.hyper.batch_size) {
            self.collect_step()?;
        }
        debug!(transitions = self.replay.len(), "Warm-up collection complete");

        for iteration in 1..=self.hyper.num_iterations {
            for _ in 0..self.hyper.collect_steps_per_iteration {
                self.collect_step()?;
            }

            let sampled = self.replay.sample(self.hyper.batch_size, &mut self.rng)?;
            let batch = TransitionBatch::from_transitions(&sampled)?;
            let loss = self.learner.update(&batch)?;

            self.stats.iterations = iteration;
            self.stats.updates = self.learner.updates();
            self.stats.last_loss = loss;

            if !loss.is_finite() {
                warn!(iteration, loss, "Non-finite training loss");
            }
            if self.monitor.record(loss) {
                self.stats.convergence_warnings += 1;
                warn!(
                    iteration,
                    window = self.config.convergence_window,
                    mean_loss = self.monitor.mean().unwrap_or(f32::NAN),
                    "Loss has not decreased over the trailing window"
                );
            }

            if self.config.log_interval > 0 && iteration % self.config.log_interval == 0 {
                debug!(
                    iteration,
                    loss,
                    episodes = self.stats.episodes,
                    episode_return = self.stats.last_episode_return,
                    "Training progress"
                );
            }

            if self.config.eval_interval > 0 && iteration % self.config.eval_interval == 0 {
                self.evaluate(iteration)?;
            }
        }

        self.stats.training_time_secs = started.elapsed().as_secs_f64();
        info!(
            iterations = self.stats.iterations,
            episodes = self.stats.episodes,
            env_steps = self.stats.env_steps,
            seconds = self.stats.training_time_secs,
            "Training complete"
        );

        Ok(self.learner.greedy_policy())
    }

    fn evaluate(&mut self, iteration: usize) -> Result<()> {
        let Some(env) = self.eval_env.as_mut() else {
            return Ok(());
        };
        let policy = self.learner.greedy_policy();
        let avg_return = compute_avg_return(env, &policy, self.hyper.num_eval_episodes)?;
        self.stats.eval_history.push(EvalPoint {
            iteration,
            avg_return,
        });
        info!(iteration, avg_return, "Evaluation");
        Ok(())
    }

    /// One exploratory step in the training environment
    fn collect_step(&mut self) -> Result<()> {
        if self.needs_reset {
            self.observation = self.train_env.reset();
            self.needs_reset = false;
        }

        let action = self.learner.select_action(&self.observation, &mut self.rng)?;
        let result = self.train_env.step(action)?;
        self.stats.env_steps += 1;
        self.episode_return += result.reward;

        let state = std::mem::replace(&mut self.observation, result.observation.clone());
        let transition = Transition::new(
            state,
            action,
            result.training_reward,
            result.observation,
            result.done,
        );

        if self.learner.needs_returns() {
            self.episode.push(transition);
            if result.done {
                for finished in self.episode.finish(self.learner.gamma()) {
                    self.replay.add(finished);
                }
            }
        } else {
            self.replay.add(transition);
        }

        if result.done {
            self.stats.episodes += 1;
            self.learner.on_episode_end();
            self.needs_reset = true;
            self.stats.last_episode_return = self.episode_return;
            self.episode_return = 0.0;
        }

        Ok(())
    }
}
