//! Exploration strategy of the worker threads.
use crate::util::argmax;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy action selection with linear annealing.
///
/// The exploration rate decreases linearly from `eps_start` to
/// `eps_final` over `anneal_steps` environment steps; the step fed to
/// [`EpsilonGreedy::action`] is the shared global observation count, so
/// all threads anneal on the same schedule.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EpsilonGreedy {
    eps_start: f64,
    eps_final: f64,
    anneal_steps: usize,
}

impl EpsilonGreedy {
    /// Constructs the policy.
    pub fn new(eps_start: f64, eps_final: f64, anneal_steps: usize) -> Self {
        Self {
            eps_start,
            eps_final,
            anneal_steps,
        }
    }

    /// The exploration rate at the given global step.
    pub fn epsilon(&self, step: usize) -> f64 {
        let d = (self.eps_start - self.eps_final) / (self.anneal_steps as f64);
        (self.eps_start - d * step as f64).max(self.eps_final)
    }

    /// Selects an action for the given action-value estimates.
    pub fn action(&self, q: &Array1<f32>, step: usize) -> usize {
        if fastrand::f64() < self.epsilon(step) {
            fastrand::usize(..q.len())
        } else {
            argmax(q)
        }
    }
}
