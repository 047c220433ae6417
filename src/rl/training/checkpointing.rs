//! Policy Checkpointing
//!
//! Save a greedy policy into a directory and rebuild it for evaluation-only
//! runs. A policy directory holds the network weights (`model.mpk`) and a
//! manifest (`policy.json`) describing how to rebuild the network.

use std::fs;
use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{OptrlError, Result};
use crate::rl::algorithms::Algorithm;
use crate::rl::networks::ValueNetworkConfig;
use crate::rl::policy::{GreedyPolicy, Policy};
use crate::rl::InferenceBackend;

/// Weights file stem; the recorder appends `.mpk`
pub const MODEL_STEM: &str = "model";
/// Manifest file name
pub const MANIFEST_FILE: &str = "policy.json";

/// Network shape and provenance of a saved policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyManifest {
    pub algorithm: Algorithm,
    pub observation_dim: usize,
    pub num_actions: usize,
    pub hidden_dim: usize,
    pub saved_at: DateTime<Utc>,
}

/// Immutable policy loaded from a policy directory
#[derive(Debug, Clone)]
pub struct FrozenPolicy {
    inner: GreedyPolicy<InferenceBackend>,
    manifest: PolicyManifest,
}

impl FrozenPolicy {
    pub fn manifest(&self) -> &PolicyManifest {
        &self.manifest
    }
}

impl Policy for FrozenPolicy {
    fn action(&self, observation: &[f32]) -> Result<usize> {
        self.inner.action(observation)
    }
}

/// Policy directory handle
#[derive(Debug, Clone)]
pub struct PolicyStore {
    dir: PathBuf,
}

impl PolicyStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_STEM}.mpk"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Whether both artifacts are present
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.manifest_path().is_file()
    }

    /// Write weights and manifest, creating the directory if needed
    pub fn save<B: Backend>(&self, policy: &GreedyPolicy<B>) -> Result<PolicyManifest> {
        fs::create_dir_all(&self.dir)?;

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        policy
            .network()
            .clone()
            .save_file(self.dir.join(MODEL_STEM), &recorder)
            .map_err(|e| OptrlError::Recorder(format!("failed to save policy: {e}")))?;

        let config = policy.network_config();
        let manifest = PolicyManifest {
            algorithm: policy.algorithm(),
            observation_dim: config.input_dim,
            num_actions: config.num_actions,
            hidden_dim: config.hidden_dim,
            saved_at: Utc::now(),
        };
        fs::write(
            self.manifest_path(),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        info!(dir = %self.dir.display(), algorithm = %manifest.algorithm, "Saved policy");
        Ok(manifest)
    }

    /// Rebuild the saved policy on the inference backend
    pub fn load(&self) -> Result<FrozenPolicy> {
        if !self.dir.is_dir() {
            return Err(OptrlError::missing_artifact(&self.dir));
        }
        for path in [self.manifest_path(), self.model_path()] {
            if !path.is_file() {
                return Err(OptrlError::missing_artifact(path));
            }
        }

        let manifest: PolicyManifest =
            serde_json::from_str(&fs::read_to_string(self.manifest_path())?)?;

        let device = Default::default();
        let config = ValueNetworkConfig::new(manifest.observation_dim, manifest.num_actions)
            .with_hidden_dim(manifest.hidden_dim);
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let network = config
            .init::<InferenceBackend>(&device)
            .load_file(self.dir.join(MODEL_STEM), &recorder, &device)
            .map_err(|e| OptrlError::Recorder(format!("failed to load policy: {e}")))?;

        info!(dir = %self.dir.display(), algorithm = %manifest.algorithm, "Loaded policy");
        Ok(FrozenPolicy {
            inner: GreedyPolicy::new(network, config, manifest.algorithm, device),
            manifest,
        })
    }
}
