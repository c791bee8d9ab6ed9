//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum AsyncqError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The minimum replay size is smaller than the batch size.
    #[error("Minimum replay size must be higher or equal to batch size (got: {min_size} < {batch_size})")]
    ReplayMinSize {
        /// Requested minimum size.
        min_size: usize,
        /// Requested batch size.
        batch_size: usize,
    },

    /// The replay buffer does not hold enough transitions for sampling.
    #[error("Replay buffer is not ready for sampling (size: {size}, required: {required})")]
    ReplayNotReady {
        /// Current number of stored transitions.
        size: usize,
        /// Number of transitions required for sampling.
        required: usize,
    },
}
