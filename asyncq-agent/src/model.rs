//! Q-network.
mod base;
mod config;
pub use base::Mlp;
pub use config::MlpConfig;
