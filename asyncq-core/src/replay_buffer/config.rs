use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ExperienceReplay`](super::ExperienceReplay).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExperienceReplayConfig {
    /// Maximum number of stored transitions.
    pub capacity: usize,

    /// Minimum number of transitions, on top of `batch_size`, required
    /// before sampling becomes available.
    pub min_size: usize,

    /// Number of transitions per sampled batch.
    pub batch_size: usize,

    /// Random seed of the sampler.
    pub seed: u64,
}

impl ExperienceReplayConfig {
    /// Constructs [`ExperienceReplayConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ExperienceReplayConfig`] to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

impl Default for ExperienceReplayConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            min_size: 5_000,
            batch_size: 32,
            seed: 42,
        }
    }
}
