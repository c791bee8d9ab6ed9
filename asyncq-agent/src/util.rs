//! Utilities.
mod shared_params;
use crate::{AsyncDqn, AsyncDqnStat};
use anyhow::Result;
use asyncq_core::Env;
use asyncq_tensorboard::TensorboardRecorder;
use ndarray::{Array1, ArrayD};
pub use shared_params::SharedParams;
use std::path::Path;

/// Index of the maximum action-value.
pub fn argmax(q: &Array1<f32>) -> usize {
    let mut best = 0;
    let mut best_v = f32::MIN;
    for (i, &v) in q.iter().enumerate() {
        if v > best_v {
            best_v = v;
            best = i;
        }
    }
    best
}

/// Maximum action-value.
pub fn max_q(q: &Array1<f32>) -> f32 {
    q.iter().fold(f32::MIN, |m, &v| v.max(m))
}

/// Global L2 norm over a list of gradient tensors.
pub fn global_norm(grads: &[ArrayD<f32>]) -> f32 {
    grads
        .iter()
        .map(|g| g.iter().map(|v| v * v).sum::<f32>())
        .sum::<f32>()
        .sqrt()
}

/// Scales `grads` in place when their global norm exceeds `max_norm`.
pub fn clip_global_norm(grads: &mut [ArrayD<f32>], max_norm: f32) {
    let norm = global_norm(grads);
    if norm > max_norm {
        let scale = max_norm / norm;
        for g in grads.iter_mut() {
            g.mapv_inplace(|v| v * scale);
        }
    }
}

/// Runs asynchronous training with records written for tensorboard.
///
/// Event files are stored in `logdir`, next to the checkpoints when the
/// agent's model directory points at the same place.
pub fn train_tensorboard<E>(
    agent: &mut AsyncDqn<E>,
    logdir: impl AsRef<Path>,
) -> Result<AsyncDqnStat>
where
    E: Env + 'static,
    E::Obs: Into<Array1<f32>>,
    E::Act: From<usize>,
    E::Config: Send + 'static,
{
    let mut recorder = TensorboardRecorder::new(logdir);
    agent.train(&mut recorder)
}
