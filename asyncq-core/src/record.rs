//! Types and traits for recording training metrics.
//!
//! A [`Record`] is a string-keyed container of values taken at one point
//! of training. [`Recorder`] is the sink-side interface; the
//! `asyncq-tensorboard` crate provides an implementation writing TFRecord
//! event files, while [`NullRecorder`] discards everything and is useful
//! in tests.
mod base;
mod null_recorder;
mod recorder;
pub use base::{Record, RecordValue};
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
