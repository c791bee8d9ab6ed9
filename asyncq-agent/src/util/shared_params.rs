//! Parameter sets shared between threads.
use ndarray::ArrayD;
use std::sync::Mutex;

/// An ordered set of parameter tensors shared between threads.
///
/// Each tensor is guarded by its own lock; accesses to different tensors
/// do not contend and no lock is ever held across the whole set. A reader
/// interleaving with a concurrent update may observe a partially updated
/// set, which the asynchronous method tolerates.
pub struct SharedParams {
    tensors: Vec<Mutex<ArrayD<f32>>>,
}

impl SharedParams {
    /// Wraps an ordered parameter list.
    pub fn new(params: Vec<ArrayD<f32>>) -> Self {
        Self {
            tensors: params.into_iter().map(Mutex::new).collect(),
        }
    }

    /// The number of tensors in the set.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Checks if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Copies this set into `dst`, tensor by tensor.
    pub fn copy_to(&self, dst: &mut [ArrayD<f32>]) {
        debug_assert_eq!(self.tensors.len(), dst.len());
        for (src, dst) in self.tensors.iter().zip(dst.iter_mut()) {
            dst.assign(&src.lock().unwrap());
        }
    }

    /// Overwrites this set from `src`.
    ///
    /// Only one lock is held at a time, so concurrent per-tensor readers
    /// and writers cannot deadlock against this call.
    pub fn copy_from(&self, src: &SharedParams) {
        debug_assert_eq!(self.tensors.len(), src.tensors.len());
        for (dst, src) in self.tensors.iter().zip(src.tensors.iter()) {
            let tmp = src.lock().unwrap().clone();
            dst.lock().unwrap().assign(&tmp);
        }
    }

    /// Overwrites this set from a plain parameter list.
    pub fn restore(&self, src: &[ArrayD<f32>]) {
        debug_assert_eq!(self.tensors.len(), src.len());
        for (dst, src) in self.tensors.iter().zip(src.iter()) {
            dst.lock().unwrap().assign(src);
        }
    }

    /// Clones the current tensors.
    pub fn snapshot(&self) -> Vec<ArrayD<f32>> {
        self.tensors
            .iter()
            .map(|t| t.lock().unwrap().clone())
            .collect()
    }

    /// Applies `f` to tensor `i` under its lock.
    pub(crate) fn with_mut<R>(&self, i: usize, f: impl FnOnce(&mut ArrayD<f32>) -> R) -> R {
        f(&mut self.tensors[i].lock().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::SharedParams;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn copy_roundtrip() {
        let params = SharedParams::new(vec![
            ArrayD::from_elem(IxDyn(&[2, 3]), 1.0f32),
            ArrayD::from_elem(IxDyn(&[3]), -1.0f32),
        ]);
        let target = SharedParams::new(vec![
            ArrayD::zeros(IxDyn(&[2, 3])),
            ArrayD::zeros(IxDyn(&[3])),
        ]);
        target.copy_from(&params);
        assert_eq!(target.snapshot(), params.snapshot());

        let mut local = vec![ArrayD::zeros(IxDyn(&[2, 3])), ArrayD::zeros(IxDyn(&[3]))];
        params.copy_to(&mut local);
        assert_eq!(local, params.snapshot());
    }
}
