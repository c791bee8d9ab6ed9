//! Fixed-capacity replay buffer with uniform random sampling.
use super::ExperienceReplayConfig;
use crate::error::AsyncqError;
use anyhow::Result;
use log::debug;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::VecDeque;

/// A fixed-capacity FIFO buffer of transitions with uniform random
/// sampling.
///
/// Once the buffer is at capacity, adding a transition evicts the oldest
/// entry. Sampling requires [`ExperienceReplay::is_ready`] and returns
/// pairwise-distinct elements.
pub struct ExperienceReplay<T> {
    memory: VecDeque<T>,
    capacity: usize,
    min_size: usize,
    batch_size: usize,
    rng: StdRng,
}

impl<T> ExperienceReplay<T> {
    /// Builds the buffer.
    ///
    /// Fails if `min_size < batch_size`. `min_size` is clamped to
    /// `capacity - batch_size` so that a sample of distinct elements is
    /// always obtainable once [`ExperienceReplay::is_ready`] holds.
    pub fn build(config: &ExperienceReplayConfig) -> Result<Self> {
        if config.min_size < config.batch_size {
            return Err(AsyncqError::ReplayMinSize {
                min_size: config.min_size,
                batch_size: config.batch_size,
            }
            .into());
        }
        let min_size = config
            .min_size
            .min(config.capacity.saturating_sub(config.batch_size));
        if min_size != config.min_size {
            debug!(
                "Clamped min_size from {} to {}",
                config.min_size, min_size
            );
        }
        Ok(Self {
            memory: VecDeque::with_capacity(config.capacity),
            capacity: config.capacity,
            min_size,
            batch_size: config.batch_size,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Appends a transition, evicting the oldest entry when the buffer is
    /// at capacity.
    pub fn add(&mut self, transition: T) {
        if self.memory.len() == self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(transition);
    }

    /// Draws `batch_size` distinct transitions uniformly at random.
    ///
    /// Fails when the buffer is not ready.
    pub fn sample(&mut self) -> Result<Vec<&T>> {
        if !self.is_ready() {
            return Err(AsyncqError::ReplayNotReady {
                size: self.memory.len(),
                required: self.min_size + self.batch_size,
            }
            .into());
        }
        let ixs = rand::seq::index::sample(&mut self.rng, self.memory.len(), self.batch_size);
        let memory = &self.memory;
        Ok(ixs.iter().map(|ix| &memory[ix]).collect())
    }

    /// The number of stored transitions.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// Checks if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Checks if the buffer holds enough transitions for sampling.
    pub fn is_ready(&self) -> bool {
        self.memory.len() >= self.min_size + self.batch_size
    }

    /// The effective minimum size after clamping.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// The number of transitions per sampled batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::{ExperienceReplay, ExperienceReplayConfig};
    use std::collections::HashSet;

    fn config(capacity: usize, min_size: usize, batch_size: usize) -> ExperienceReplayConfig {
        ExperienceReplayConfig {
            capacity,
            min_size,
            batch_size,
            seed: 42,
        }
    }

    #[test]
    fn min_size_smaller_than_batch_size_fails() {
        assert!(ExperienceReplay::<usize>::build(&config(10, 3, 4)).is_err());
    }

    #[test]
    fn min_size_is_clamped() {
        let buffer = ExperienceReplay::<usize>::build(&config(10, 9, 4)).unwrap();
        assert_eq!(buffer.min_size(), 6);
    }

    #[test]
    fn fifo_eviction() {
        let capacity = 16;
        let k = 5;
        let mut buffer = ExperienceReplay::build(&config(capacity, 4, 4)).unwrap();
        for i in 0..capacity + k {
            buffer.add(i);
        }
        assert_eq!(buffer.len(), capacity);
        let contents: HashSet<_> = (0..buffer.len()).map(|i| buffer.memory[i]).collect();
        for i in 0..k {
            assert!(!contents.contains(&i));
        }
        for i in k..capacity + k {
            assert!(contents.contains(&i));
        }
    }

    #[test]
    fn sample_draws_distinct_elements() {
        let mut buffer = ExperienceReplay::build(&config(64, 8, 8)).unwrap();
        for i in 0..20 {
            buffer.add(i);
        }
        assert!(buffer.is_ready());
        let batch = buffer.sample().unwrap();
        assert_eq!(batch.len(), 8);
        let distinct: HashSet<_> = batch.iter().map(|&&v| v).collect();
        assert_eq!(distinct.len(), 8);
        for v in distinct {
            assert!(v < 20);
        }
    }

    #[test]
    fn sample_before_ready_fails() {
        let mut buffer = ExperienceReplay::build(&config(64, 8, 8)).unwrap();
        for i in 0..15 {
            buffer.add(i);
        }
        assert!(!buffer.is_ready());
        assert!(buffer.sample().is_err());
        buffer.add(15);
        assert!(buffer.is_ready());
        assert!(buffer.sample().is_ok());
    }
}
