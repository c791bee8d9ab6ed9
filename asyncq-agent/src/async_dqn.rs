//! Asynchronous n-step Q-learning agent.
mod base;
mod config;
mod stat;
pub(crate) use base::Globals;
pub use base::{AsyncDqn, StopHandle};
pub use config::AsyncDqnConfig;
pub use stat::AsyncDqnStat;
