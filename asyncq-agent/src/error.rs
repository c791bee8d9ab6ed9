//! Errors of the asynchronous agent.
use thiserror::Error;

/// Errors of the asynchronous agent.
#[derive(Error, Debug)]
pub enum AsyncDqnError {
    /// The requested number of worker threads is invalid.
    #[error("Number of threads must be >= 1 (got: {0})")]
    InvalidThreadCount(usize),

    /// The pool of minimum epsilon values is empty.
    #[error("Epsilon pool must not be empty")]
    EmptyEpsilonPool,

    /// Single-batch training is not supported on the asynchronous agent.
    #[error("Training on a single batch is not supported; use `train()` instead")]
    TrainOnBatchNotSupported,

    /// Thread learners are driven by the coordinator, not by callers.
    #[error("Thread learners are driven by `AsyncDqn::train()`")]
    ThreadTrainNotSupported,
}
