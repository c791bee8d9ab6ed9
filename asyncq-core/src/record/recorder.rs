use super::Record;

/// Writes a record to an output destination with [`Recorder::write`].
pub trait Recorder {
    /// Write a record to the [`Recorder`].
    fn write(&mut self, record: Record);

    /// Flushes buffered values to the destination.
    fn flush(&mut self) {}

    /// Closes the destination. Called once when training ends.
    fn close(&mut self) {}
}
