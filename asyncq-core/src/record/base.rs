//! Base implementation of records for logging.
use crate::error::AsyncqError;
use chrono::prelude::{DateTime, Local};
use std::collections::{
    hash_map::{Iter, Keys},
    HashMap,
};

/// Represents possible types of values in a [`Record`].
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// Scalar, e.g., reward, loss or epsilon.
    Scalar(f32),

    /// Date and time.
    DateTime(DateTime<Local>),

    /// A 1-dimensional array, e.g., a flattened parameter tensor.
    Array1(Vec<f32>),

    /// String.
    String(String),
}

/// Represents a record of values taken at one point of training.
#[derive(Debug)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record from a scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Returns the keys in the record.
    pub fn keys(&self) -> Keys<String, RecordValue> {
        self.0.keys()
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value of the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Merges another record into this one in place.
    ///
    /// Values of keys in both records are taken from the given record.
    pub fn merge_inplace(&mut self, record: Record) {
        for (k, v) in record.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Gets a scalar value.
    pub fn get_scalar(&self, k: &str) -> Result<f32, AsyncqError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::Scalar(v) => Ok(*v),
                _ => Err(AsyncqError::RecordValueTypeError("Scalar".to_string())),
            }
        } else {
            Err(AsyncqError::RecordKeyError(k.to_string()))
        }
    }

    /// Gets a string value.
    pub fn get_string(&self, k: &str) -> Result<String, AsyncqError> {
        if let Some(v) = self.0.get(k) {
            match v {
                RecordValue::String(s) => Ok(s.clone()),
                _ => Err(AsyncqError::RecordValueTypeError("String".to_string())),
            }
        } else {
            Err(AsyncqError::RecordKeyError(k.to_string()))
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordValue};

    #[test]
    fn merge_overwrites_and_keeps() {
        let mut r1 = Record::from_slice(&[
            ("a", RecordValue::Scalar(1.0)),
            ("b", RecordValue::Scalar(2.0)),
        ]);
        let r2 = Record::from_slice(&[
            ("b", RecordValue::Scalar(3.0)),
            ("c", RecordValue::Scalar(4.0)),
        ]);
        r1.merge_inplace(r2);
        assert_eq!(r1.get_scalar("a").unwrap(), 1.0);
        assert_eq!(r1.get_scalar("b").unwrap(), 3.0);
        assert_eq!(r1.get_scalar("c").unwrap(), 4.0);
    }

    #[test]
    fn get_scalar_type_mismatch() {
        let r = Record::from_slice(&[("s", RecordValue::String("x".to_string()))]);
        assert!(r.get_scalar("s").is_err());
        assert!(r.get_scalar("missing").is_err());
        assert_eq!(r.get_string("s").unwrap(), "x");
    }
}
