//! Messages sent from worker threads to the coordinator.
use asyncq_core::record::Record;

/// A training-progress record emitted by a worker thread.
///
/// The coordinator prefixes the record keys with `scope`, which is unique
/// per thread, before writing them to the metrics sink.
pub struct RecordMessage {
    /// Scope name of the emitting thread.
    pub scope: String,

    /// Observation count at which the record was taken.
    pub step: usize,

    /// The recorded values.
    pub record: Record,
}
