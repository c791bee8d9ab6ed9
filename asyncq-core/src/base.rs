//! Core functionalities.
mod env;
mod step;
pub use env::Env;
pub use step::{Info, Step};
use std::fmt::Debug;

/// An observation of an environment.
pub trait Obs: Clone + Debug {}

/// An action of an environment.
pub trait Act: Clone + Debug {}
