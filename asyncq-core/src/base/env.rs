//! Environment.
use super::{Act, Info, Obs, Step};
use anyhow::Result;

/// Represents an environment, typically an MDP.
///
/// Independent instances with the same configuration are created with
/// [`Env::build`] and a per-instance seed; worker threads each build
/// their own copy.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Performs an environment step.
    fn step(&mut self, a: &Self::Act) -> Step<Self>
    where
        Self: Sized;

    /// Resets the environment and returns an initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Shape of observations.
    fn observation_shape(&self) -> Vec<usize>;

    /// Renders the current state. Debugging aid, no-op by default.
    fn render(&self) {}
}
