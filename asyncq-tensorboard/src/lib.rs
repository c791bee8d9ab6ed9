//! Tensorboard recorder.
use asyncq_core::record::{Record, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
///
/// Every record must carry its step index as a scalar under the step key
/// (`"global_step"` by default). [`RecordValue::Array1`] values are
/// reduced to `min`/`mean`/`max` scalars under sub-keys.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: "global_step".to_string(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] with checking unsupported record value.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: "global_step".to_string(),
            ignore_unsupported_value: false,
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key).unwrap() {
            RecordValue::Scalar(v) => *v as usize,
            _ => {
                panic!("Step key of a record must be a scalar")
            }
        };

        for (k, v) in record.iter() {
            if *k != self.step_key {
                match v {
                    RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                    RecordValue::DateTime(_) => {} // discard value
                    RecordValue::Array1(data) => {
                        if !data.is_empty() {
                            let min = data.iter().fold(f32::MAX, |m, v| v.min(m));
                            let max = data.iter().fold(-f32::MAX, |m, v| v.max(m));
                            let mean = data.iter().sum::<f32>() / data.len() as f32;
                            self.writer.add_scalar(&format!("{}/min", k), min, step);
                            self.writer.add_scalar(&format!("{}/mean", k), mean, step);
                            self.writer.add_scalar(&format!("{}/max", k), max, step);
                        }
                    }
                    _ => {
                        if !self.ignore_unsupported_value {
                            panic!("Unsupported value: {:?}", (k, v));
                        }
                    }
                };
            }
        }
    }

    fn flush(&mut self) {
        self.writer.flush();
    }

    fn close(&mut self) {
        self.writer.flush();
    }
}
