use crate::OptimizerConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`AsyncDqn`](super::AsyncDqn).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AsyncDqnConfig {
    /// Number of worker threads.
    pub num_threads: usize,

    /// Total number of environment steps across all threads.
    pub total_steps: usize,

    /// Hidden layer sizes of the Q-network.
    pub hidden_units: Vec<usize>,

    /// Optimizer applied to the global parameters.
    pub optimizer: OptimizerConfig,

    /// Maximum number of transitions per gradient batch.
    pub batch_size: usize,

    /// Discount factor.
    pub gamma: f32,

    /// Global-norm threshold for gradient clipping, if any.
    pub gradient_clip: Option<f32>,

    /// Pool of minimum epsilon values, one drawn per thread.
    pub epsilon_pool: Vec<f64>,

    /// Steps over which each thread anneals epsilon from 1.0.
    pub epsilon_steps: usize,

    /// Interval of target network refresh in environment steps.
    pub target_freq: usize,

    /// Interval of evaluation, logging and checkpointing in environment
    /// steps. Also the reporting cadence of each worker thread.
    pub log_freq: usize,

    /// Number of greedy episodes per evaluation.
    pub eval_episodes: usize,

    /// Where checkpoints are stored. `None` disables checkpointing.
    pub model_dir: Option<String>,

    /// Number of checkpoints kept on disk.
    pub keep_checkpoints: usize,

    /// Workers render their environment after every step.
    pub render: bool,

    /// Seed of the weight initialization.
    pub seed: u64,
}

impl AsyncDqnConfig {
    /// Constructs [`AsyncDqnConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`AsyncDqnConfig`] to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    /// Sets the directory where checkpoints are saved.
    pub fn model_dir<T: Into<String>>(mut self, model_dir: T) -> Self {
        self.model_dir = Some(model_dir.into());
        self
    }

    /// Sets the number of worker threads.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Sets the total number of environment steps.
    pub fn total_steps(mut self, total_steps: usize) -> Self {
        self.total_steps = total_steps;
        self
    }
}

impl Default for AsyncDqnConfig {
    /// There is no special intention behind these initial values.
    fn default() -> Self {
        Self {
            num_threads: 4,
            total_steps: 1_000_000,
            hidden_units: vec![64],
            optimizer: OptimizerConfig::default(),
            batch_size: 32,
            gamma: 0.99,
            gradient_clip: Some(40.0),
            epsilon_pool: vec![0.1, 0.01, 0.5],
            epsilon_steps: 100_000,
            target_freq: 10_000,
            log_freq: 10_000,
            eval_episodes: 3,
            model_dir: None,
            keep_checkpoints: 10,
            render: false,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AsyncDqnConfig;
    use tempdir::TempDir;

    #[test]
    fn yaml_roundtrip() {
        let dir = TempDir::new("async_dqn_config").unwrap();
        let path = dir.path().join("config.yaml");
        let config = AsyncDqnConfig::default()
            .num_threads(8)
            .total_steps(5000)
            .model_dir("model");
        config.save(&path).unwrap();
        let loaded = AsyncDqnConfig::load(&path).unwrap();
        assert_eq!(loaded.num_threads, 8);
        assert_eq!(loaded.total_steps, 5000);
        assert_eq!(loaded.model_dir, Some("model".to_string()));
        assert_eq!(loaded.batch_size, config.batch_size);
    }
}
