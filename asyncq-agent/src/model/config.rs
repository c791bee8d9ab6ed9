use serde::{Deserialize, Serialize};

/// Configuration of [`Mlp`](super::Mlp).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    pub(super) seed: u64,
}

impl MlpConfig {
    /// Constructs [`MlpConfig`].
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, seed: u64) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            seed,
        }
    }

    /// The number of outputs, one per action.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }
}
