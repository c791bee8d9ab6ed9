use super::{Record, Recorder};

/// A recorder that discards any records. Used for testing.
pub struct NullRecorder {}

impl Recorder for NullRecorder {
    /// Discards the given record.
    fn write(&mut self, _record: Record) {}
}
