//! Optimizers applying worker gradients to the shared global parameters.
use crate::util::SharedParams;
use ndarray::{ArrayD, Zip};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Configures the optimizer shared by all worker threads.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// Stochastic gradient descent.
    Sgd {
        /// Learning rate.
        lr: f32,
    },

    /// Adam.
    Adam {
        /// Learning rate.
        lr: f32,
        /// Decay rate of the first moment.
        beta1: f32,
        /// Decay rate of the second moment.
        beta2: f32,
        /// Division guard.
        eps: f32,
    },
}

impl OptimizerConfig {
    /// Adam with common defaults for the given learning rate.
    pub fn adam(lr: f32) -> Self {
        Self::Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
        }
    }

    /// Constructs an optimizer with state slots matching `params`.
    pub fn build(&self, params: &SharedParams) -> Optimizer {
        let state = match self {
            OptimizerConfig::Sgd { .. } => None,
            OptimizerConfig::Adam { .. } => Some(
                params
                    .snapshot()
                    .iter()
                    .map(|t| {
                        Mutex::new(AdamState {
                            m: ArrayD::zeros(t.raw_dim()),
                            v: ArrayD::zeros(t.raw_dim()),
                            t: 0,
                        })
                    })
                    .collect(),
            ),
        };
        Optimizer {
            config: self.clone(),
            state,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-3)
    }
}

/// Per-tensor Adam accumulators.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AdamState {
    m: ArrayD<f32>,
    v: ArrayD<f32>,
    t: i32,
}

/// The optimizer shared by all worker threads.
///
/// [`Optimizer::apply`] locks one parameter tensor (and its state slot)
/// at a time; concurrent applies from different threads interleave per
/// tensor instead of serializing on the whole parameter set. The
/// accumulator state is likewise shared and concurrently mutated.
pub struct Optimizer {
    config: OptimizerConfig,
    state: Option<Vec<Mutex<AdamState>>>,
}

impl Optimizer {
    /// Applies a list of gradients to the shared parameters.
    ///
    /// `grads` must match the shapes and ordering of `params`.
    pub fn apply(&self, params: &SharedParams, grads: &[ArrayD<f32>]) {
        match &self.config {
            OptimizerConfig::Sgd { lr } => {
                for (i, g) in grads.iter().enumerate() {
                    params.with_mut(i, |w| w.zip_mut_with(g, |w, &g| *w -= lr * g));
                }
            }
            OptimizerConfig::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => {
                let state = self.state.as_ref().unwrap();
                for (i, g) in grads.iter().enumerate() {
                    let mut s = state[i].lock().unwrap();
                    s.t += 1;
                    let t = s.t;
                    s.m.zip_mut_with(g, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
                    s.v
                        .zip_mut_with(g, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);
                    let bc1 = 1.0 - beta1.powi(t);
                    let bc2 = 1.0 - beta2.powi(t);
                    params.with_mut(i, |w| {
                        Zip::from(w).and(&s.m).and(&s.v).for_each(|w, &m, &v| {
                            let m_hat = m / bc1;
                            let v_hat = v / bc2;
                            *w -= lr * m_hat / (v_hat.sqrt() + eps);
                        });
                    });
                }
            }
        }
    }

    /// Snapshot of the accumulator state, if the optimizer has any.
    pub fn state(&self) -> Option<Vec<AdamState>> {
        self.state
            .as_ref()
            .map(|state| state.iter().map(|s| s.lock().unwrap().clone()).collect())
    }

    /// Restores accumulator state taken with [`Optimizer::state`].
    pub fn restore_state(&self, state: Vec<AdamState>) {
        if let Some(slots) = &self.state {
            debug_assert_eq!(slots.len(), state.len());
            for (slot, s) in slots.iter().zip(state.into_iter()) {
                *slot.lock().unwrap() = s;
            }
        }
    }
}
