//! Worker threads of the asynchronous agent.
mod base;
pub use base::ThreadLearner;
