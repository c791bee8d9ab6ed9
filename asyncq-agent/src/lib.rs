//! Asynchronous n-step Q-learning agent.
//!
//! [`AsyncDqn`] owns the canonical network parameters and spawns one
//! [`ThreadLearner`] per worker thread. Workers interact with independent
//! environment instances, accumulate n-step trajectories and apply their
//! gradients to the global parameters through a shared [`Optimizer`],
//! tolerating the parameter staleness this interleaving implies. The
//! coordinator inside [`AsyncDqn::train`] supervises the shared step
//! counters to refresh the target network, evaluate the greedy policy,
//! write records and save checkpoints on fixed cadences, and drives
//! graceful shutdown through a shared stop flag (see [`StopHandle`]).
mod async_dqn;
pub mod checkpoint;
mod error;
mod explorer;
mod messages;
mod model;
mod opt;
mod thread_learner;
pub mod util;

pub use async_dqn::{AsyncDqn, AsyncDqnConfig, AsyncDqnStat, StopHandle};
pub use error::AsyncDqnError;
pub use explorer::EpsilonGreedy;
pub use messages::RecordMessage;
pub use model::{Mlp, MlpConfig};
pub use opt::{AdamState, Optimizer, OptimizerConfig};
pub use thread_learner::ThreadLearner;

#[cfg(test)]
mod test {
    use super::{checkpoint, util::SharedParams, AsyncDqn, AsyncDqnConfig, OptimizerConfig};
    use anyhow::Result;
    use asyncq_core::{record::NullRecorder, Act, Env, Info, Obs, Step};
    use ndarray::{Array1, ArrayD};
    use std::time::Duration;
    use tempdir::TempDir;
    use test_log::test;

    #[derive(Clone, Debug)]
    struct CorridorObs(Vec<f32>);

    impl Obs for CorridorObs {}

    impl From<CorridorObs> for Array1<f32> {
        fn from(obs: CorridorObs) -> Self {
            Array1::from(obs.0)
        }
    }

    #[derive(Clone, Debug)]
    struct CorridorAct(usize);

    impl Act for CorridorAct {}

    impl From<usize> for CorridorAct {
        fn from(a: usize) -> Self {
            Self(a)
        }
    }

    #[derive(Clone, Debug)]
    struct CorridorInfo;

    impl Info for CorridorInfo {}

    #[derive(Clone)]
    struct CorridorConfig {
        /// Pacing of environment steps, so that the supervision loop
        /// observes several cadence crossings during the test.
        step_delay: Duration,
    }

    /// A deterministic corridor of 8 cells. Action 1 moves right, action
    /// 0 moves left. Reaching the right end pays 5.0 (clipped by the
    /// learner) and terminates; episodes are truncated after 20 steps.
    struct Corridor {
        config: CorridorConfig,
        pos: usize,
        t: usize,
    }

    const CELLS: usize = 8;
    const MAX_EPISODE_LEN: usize = 20;

    impl Corridor {
        fn obs(&self) -> CorridorObs {
            let mut one_hot = vec![0.0; CELLS];
            one_hot[self.pos] = 1.0;
            CorridorObs(one_hot)
        }
    }

    impl Env for Corridor {
        type Config = CorridorConfig;
        type Obs = CorridorObs;
        type Act = CorridorAct;
        type Info = CorridorInfo;

        fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
            Ok(Self {
                config: config.clone(),
                pos: 0,
                t: 0,
            })
        }

        fn step(&mut self, a: &Self::Act) -> Step<Self> {
            std::thread::sleep(self.config.step_delay);
            self.t += 1;
            if a.0 == 1 {
                self.pos = (self.pos + 1).min(CELLS - 1);
            } else {
                self.pos = self.pos.saturating_sub(1);
            }
            let reached_goal = self.pos == CELLS - 1;
            let reward = if reached_goal { 5.0 } else { -0.1 };
            let is_terminated = reached_goal || self.t >= MAX_EPISODE_LEN;
            Step::new(self.obs(), a.clone(), reward, is_terminated, CorridorInfo)
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            self.pos = 0;
            self.t = 0;
            Ok(self.obs())
        }

        fn n_actions(&self) -> usize {
            2
        }

        fn observation_shape(&self) -> Vec<usize> {
            vec![CELLS]
        }
    }

    fn env_config() -> CorridorConfig {
        CorridorConfig {
            step_delay: Duration::from_millis(2),
        }
    }

    fn agent_config(model_dir: Option<String>) -> AsyncDqnConfig {
        AsyncDqnConfig {
            num_threads: 2,
            total_steps: 500,
            hidden_units: vec![16],
            optimizer: OptimizerConfig::adam(1e-3),
            batch_size: 16,
            gamma: 0.9,
            gradient_clip: Some(40.0),
            epsilon_pool: vec![0.1, 0.01, 0.5],
            epsilon_steps: 400,
            target_freq: 100,
            log_freq: 100,
            eval_episodes: 1,
            model_dir,
            keep_checkpoints: 5,
            render: false,
            seed: 42,
        }
    }

    #[test]
    fn zero_threads_fails_before_building() {
        let config = agent_config(None).num_threads(0);
        assert!(AsyncDqn::<Corridor>::build(config, env_config()).is_err());
    }

    #[test]
    fn train_on_batch_is_unsupported() {
        let mut agent = AsyncDqn::<Corridor>::build(agent_config(None), env_config()).unwrap();
        let obs = CorridorObs(vec![0.0; CELLS]);
        assert!(agent.train_on_batch(&[obs], &[0], &[1.0]).is_err());
    }

    #[test]
    fn empty_epsilon_pool_fails() {
        let mut config = agent_config(None);
        config.epsilon_pool.clear();
        let mut agent = AsyncDqn::<Corridor>::build(config, env_config()).unwrap();
        let mut recorder = NullRecorder {};
        assert!(agent.train(&mut recorder).is_err());
    }

    #[test]
    fn async_training_runs_to_step_budget() {
        let dir = TempDir::new("async_dqn").unwrap();
        let model_dir = dir.path().to_str().unwrap().to_string();
        let config = agent_config(Some(model_dir.clone()));
        let total_steps = config.total_steps;

        let mut agent = AsyncDqn::<Corridor>::build(config, env_config()).unwrap();
        let mut recorder = NullRecorder {};
        let stat = agent.train(&mut recorder).unwrap();

        // The budget bounds termination from below; workers may finish
        // their current batch after the budget is reached.
        let obs_count = agent.obs_count();
        assert!(obs_count >= total_steps, "stopped early at {}", obs_count);
        assert!(
            obs_count <= total_steps + 300,
            "overshot the budget: {}",
            obs_count
        );
        assert!(agent.opt_count() > 0);
        assert!(stat.obs_per_sec > 0.0);

        // The target network was refreshed on the configured cadence.
        assert!(
            agent.target_update_count() >= 4,
            "only {} target updates",
            agent.target_update_count()
        );

        // The final checkpoint holds the final global parameters.
        let step = checkpoint::latest(&model_dir).unwrap().unwrap();
        assert_eq!(step, obs_count);
        let weights = agent.weights();
        let restored = SharedParams::new(
            weights
                .iter()
                .map(|w| ArrayD::zeros(w.raw_dim()))
                .collect(),
        );
        let restored_target = SharedParams::new(
            weights
                .iter()
                .map(|w| ArrayD::zeros(w.raw_dim()))
                .collect(),
        );
        let optimizer = OptimizerConfig::adam(1e-3).build(&restored);
        checkpoint::load(&model_dir, step, &restored, &restored_target, &optimizer).unwrap();
        assert_eq!(restored.snapshot(), weights);
        assert_eq!(restored_target.snapshot(), agent.target_weights());
    }
}
