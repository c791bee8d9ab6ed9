use std::time::Duration;

/// Stats of [`AsyncDqn`](super::AsyncDqn)`::train()`.
pub struct AsyncDqnStat {
    /// The number of environment steps per second.
    pub obs_per_sec: f32,

    /// The number of optimizer applications per second.
    pub opt_per_sec: f32,

    /// Duration of training.
    pub duration: Duration,
}

impl AsyncDqnStat {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "obs/sec, updates/sec, duration\n".to_string();
        s += format!(
            "{}, {}, {}\n",
            self.obs_per_sec,
            self.opt_per_sec,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}
