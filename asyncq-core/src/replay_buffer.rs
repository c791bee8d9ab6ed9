//! Experience replay buffer.
//!
//! The asynchronous agent trains on-policy and does not consume this
//! buffer; it backs sampling-based training regimes elsewhere.
mod base;
mod config;
pub use base::ExperienceReplay;
pub use config::ExperienceReplayConfig;
