use crate::{
    checkpoint,
    util::{argmax, max_q, SharedParams},
    AsyncDqnConfig, AsyncDqnError, AsyncDqnStat, EpsilonGreedy, Mlp, MlpConfig, Optimizer,
    RecordMessage, ThreadLearner,
};
use anyhow::Result;
use asyncq_core::{
    record::{Record, RecordValue::Scalar, Recorder},
    util::IncrementalAverage,
    Env,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use ndarray::{Array1, ArrayD};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

/// Interval of the coordinator's supervision tick.
///
/// Threshold crossings of the logging and target-update cadences are
/// acted on within one tick.
const TICK: Duration = Duration::from_millis(10);

/// State shared between the coordinator and all worker threads.
///
/// The only cells shared across threads: the two parameter sets, the
/// optimizer, the two monotonic counters and the stop flag. There is no
/// other communication channel between workers.
pub(crate) struct Globals {
    /// Canonical network parameters, updated by the workers.
    pub(crate) params: SharedParams,

    /// Target network parameters, refreshed by the coordinator.
    pub(crate) target: SharedParams,

    /// Optimizer applying worker gradients to `params`.
    pub(crate) optimizer: Optimizer,

    obs_counter: AtomicUsize,
    opt_counter: AtomicUsize,
    target_updates: AtomicUsize,
    stop: AtomicBool,
}

impl Globals {
    /// Increments the observation counter and returns the new count.
    pub(crate) fn increment_obs(&self) -> usize {
        self.obs_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn obs_count(&self) -> usize {
        self.obs_counter.load(Ordering::SeqCst)
    }

    pub(crate) fn increment_opt(&self) {
        self.opt_counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn opt_count(&self) -> usize {
        self.opt_counter.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn update_target(&self) {
        self.target.copy_from(&self.params);
        self.target_updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Requests cooperative shutdown of a running [`AsyncDqn::train`] call.
///
/// Clone it before training starts and trigger it from a signal handler
/// or any other thread; workers observe the flag at their loop boundary,
/// finish their current batch and exit, after which `train` saves a
/// final checkpoint and closes the recorder.
#[derive(Clone)]
pub struct StopHandle {
    globals: Arc<Globals>,
}

impl StopHandle {
    /// Sets the shared stop flag.
    pub fn request_stop(&self) {
        self.globals.request_stop();
    }
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Asynchronous n-step Q-learning agent.
///
/// Multiple worker threads interact with independent environment
/// instances, accumulate n-step trajectories, compute gradients against
/// their local parameter copies and apply them to a single set of global
/// parameters through a shared optimizer, without any lock around the
/// whole parameter set. The coordinator supervises the shared counters,
/// refreshing the target network, evaluating the greedy policy and
/// saving checkpoints on fixed cadences.
///
/// ```mermaid
/// graph LR
///     W[ThreadLearner]-->|gradients|G[global params]
///     G -->|resync|W
///     T[target params] -->|bootstrap|W
///     G -->|refresh|T
/// ```
pub struct AsyncDqn<E: Env> {
    config: AsyncDqnConfig,
    env_config: E::Config,
    model_config: MlpConfig,
    globals: Arc<Globals>,
    eval_env: E,
}

impl<E> AsyncDqn<E>
where
    E: Env + 'static,
    E::Obs: Into<Array1<f32>>,
    E::Act: From<usize>,
    E::Config: Send + 'static,
{
    /// Constructs the agent.
    ///
    /// One environment instance is built for probing the observation and
    /// action shapes; it is kept for greedy evaluation episodes.
    pub fn build(config: AsyncDqnConfig, env_config: E::Config) -> Result<Self> {
        if config.num_threads < 1 {
            return Err(AsyncDqnError::InvalidThreadCount(config.num_threads).into());
        }
        let eval_env = E::build(&env_config, 0)?;
        let in_dim = eval_env.observation_shape().iter().product();
        let n_actions = eval_env.n_actions();
        let model_config = MlpConfig::new(in_dim, config.hidden_units.clone(), n_actions, config.seed);

        let qnet = Mlp::build(model_config.clone());
        let params = SharedParams::new(qnet.params().to_vec());
        let target = SharedParams::new(qnet.params().to_vec());
        let optimizer = config.optimizer.build(&params);

        Ok(Self {
            config,
            env_config,
            model_config,
            globals: Arc::new(Globals {
                params,
                target,
                optimizer,
                obs_counter: AtomicUsize::new(0),
                opt_counter: AtomicUsize::new(0),
                target_updates: AtomicUsize::new(0),
                stop: AtomicBool::new(false),
            }),
            eval_env,
        })
    }

    /// Snapshot of the global network parameters.
    pub fn weights(&self) -> Vec<ArrayD<f32>> {
        self.globals.params.snapshot()
    }

    /// Snapshot of the target network parameters.
    pub fn target_weights(&self) -> Vec<ArrayD<f32>> {
        self.globals.target.snapshot()
    }

    /// The number of environment steps taken so far, over all threads.
    pub fn obs_count(&self) -> usize {
        self.globals.obs_count()
    }

    /// The number of optimizer applications so far, over all threads.
    pub fn opt_count(&self) -> usize {
        self.globals.opt_count()
    }

    /// The number of target network refreshes so far.
    pub fn target_update_count(&self) -> usize {
        self.globals.target_updates.load(Ordering::SeqCst)
    }

    /// Handle for requesting graceful shutdown from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            globals: self.globals.clone(),
        }
    }

    /// Copies the global parameters into the target network.
    pub fn update_target(&self) {
        self.globals.update_target();
    }

    /// Runs greedy evaluation episodes with the current global parameters.
    ///
    /// Returns the mean episode reward and the mean per-step max-Q.
    pub fn evaluate(&mut self, episodes: usize) -> Result<(f32, f32)> {
        let mut qnet = Mlp::build(self.model_config.clone());
        self.globals.params.copy_to(qnet.params_mut());

        let mut reward_avg = IncrementalAverage::new();
        let mut q_avg = IncrementalAverage::new();
        for _ in 0..episodes {
            let mut obs: Array1<f32> = self.eval_env.reset()?.into();
            let mut ep_reward = 0.0;
            loop {
                let q = qnet.forward(&obs);
                q_avg.add(max_q(&q));
                let step = self.eval_env.step(&argmax(&q).into());
                ep_reward += step.reward;
                if step.is_terminated {
                    break;
                }
                obs = step.obs.into();
            }
            reward_avg.add(ep_reward);
        }
        Ok((reward_avg.mean(), q_avg.mean()))
    }

    /// Unsupported on the asynchronous agent; use [`AsyncDqn::train`].
    pub fn train_on_batch(
        &mut self,
        _obs: &[E::Obs],
        _actions: &[usize],
        _returns: &[f32],
    ) -> Result<Record> {
        Err(AsyncDqnError::TrainOnBatchNotSupported.into())
    }

    /// Runs asynchronous training until the step budget is exhausted or a
    /// stop is requested.
    ///
    /// Always saves a final checkpoint and closes the recorder before
    /// returning, regardless of the exit cause.
    pub fn train(&mut self, recorder: &mut impl Recorder) -> Result<AsyncDqnStat> {
        if self.config.num_threads < 1 {
            return Err(AsyncDqnError::InvalidThreadCount(self.config.num_threads).into());
        }
        if self.config.epsilon_pool.is_empty() {
            return Err(AsyncDqnError::EmptyEpsilonPool.into());
        }

        if let Some(model_dir) = self.config.model_dir.clone() {
            if let Some(step) = checkpoint::latest(&model_dir)? {
                info!("Restoring parameters from checkpoint at step {}", step);
                checkpoint::load(
                    &model_dir,
                    step,
                    &self.globals.params,
                    &self.globals.target,
                    &self.globals.optimizer,
                )?;
            }
        }

        let (sender, receiver) = unbounded();
        let mut threads = Vec::with_capacity(self.config.num_threads);
        for id in 0..self.config.num_threads {
            threads.push(self.spawn_worker(id, sender.clone()));
        }
        drop(sender);

        let start = Instant::now();
        let mut last_log_step = self.globals.obs_count();
        let mut last_target_update = last_log_step;
        let mut prev_obs_step = last_log_step;
        let mut prev_opt_step = self.globals.opt_count();
        let mut last_time = Instant::now();

        while threads.iter().any(|h| !h.is_finished())
            && self.globals.obs_count() < self.config.total_steps
        {
            std::thread::sleep(TICK);
            Self::drain_records(&receiver, recorder);

            let step = self.globals.obs_count();
            if step - last_log_step >= self.config.log_freq {
                last_log_step = step;
                if let Err(e) = self.log_evaluation(
                    recorder,
                    step,
                    &mut prev_obs_step,
                    &mut prev_opt_step,
                    &mut last_time,
                ) {
                    warn!("Evaluation failed: {}", e);
                }
                self.save_checkpoint(step)?;
            }
            if step - last_target_update >= self.config.target_freq {
                last_target_update = step;
                self.globals.update_target();
            }
        }

        self.globals.request_stop();
        for handle in threads {
            if handle.join().is_err() {
                warn!("A worker thread panicked during shutdown");
            }
        }
        Self::drain_records(&receiver, recorder);
        self.save_checkpoint(self.globals.obs_count())?;
        recorder.flush();
        recorder.close();
        info!("Training finished");

        let duration = start.elapsed();
        let secs = duration.as_secs_f32();
        Ok(AsyncDqnStat {
            obs_per_sec: self.globals.obs_count() as f32 / secs,
            opt_per_sec: self.globals.opt_count() as f32 / secs,
            duration,
        })
    }

    fn spawn_worker(&self, id: usize, sender: Sender<RecordMessage>) -> JoinHandle<()> {
        let eps_pool = &self.config.epsilon_pool;
        let eps_final = eps_pool[fastrand::usize(..eps_pool.len())];
        debug!(
            "Sampling minimum epsilon = {:.2} for thread learner #{}",
            eps_final, id
        );
        let policy = EpsilonGreedy::new(1.0, eps_final, self.config.epsilon_steps);
        let globals = self.globals.clone();
        let env_config = self.env_config.clone();
        let model_config = self.model_config.clone();
        let batch_size = self.config.batch_size;
        let gamma = self.config.gamma;
        let gradient_clip = self.config.gradient_clip;
        let log_freq = self.config.log_freq;
        let render = self.config.render;

        std::thread::spawn(move || {
            let learner = ThreadLearner::<E>::build(
                id,
                globals,
                &env_config,
                model_config,
                policy,
                batch_size,
                gamma,
                gradient_clip,
                log_freq,
                render,
                sender,
            );
            match learner {
                Ok(learner) => {
                    if let Err(e) = learner.run() {
                        error!("Thread learner #{} died: {}", id, e);
                    }
                }
                Err(e) => error!("Failed to build thread learner #{}: {}", id, e),
            }
        })
    }

    /// Writes pending worker records, prefixing keys with the worker scope.
    fn drain_records(receiver: &Receiver<RecordMessage>, recorder: &mut impl Recorder) {
        while let Ok(msg) = receiver.try_recv() {
            let mut record = Record::empty();
            record.insert("global_step", Scalar(msg.step as f32));
            for (k, v) in msg.record.iter() {
                record.insert(format!("{}/{}", msg.scope, k), v.clone());
            }
            recorder.write(record);
        }
    }

    fn log_evaluation(
        &mut self,
        recorder: &mut impl Recorder,
        step: usize,
        prev_obs_step: &mut usize,
        prev_opt_step: &mut usize,
        last_time: &mut Instant,
    ) -> Result<()> {
        let episodes = self.config.eval_episodes;
        let (reward, q) = self.evaluate(episodes)?;

        let elapsed = last_time.elapsed().as_secs_f32();
        let opt_step = self.globals.opt_count();
        let obs_per_sec = (step - *prev_obs_step) as f32 / elapsed;
        let opt_per_sec = (opt_step - *prev_opt_step) as f32 / elapsed;
        *last_time = Instant::now();
        *prev_obs_step = step;
        *prev_opt_step = opt_step;

        info!(
            "Global agent greedy eval: average R: {:.2}, average maxQ: {:.2}, step: {}",
            reward, q, step
        );
        info!(
            "Performance: {:.2} obs/sec, {:.2} updates/sec",
            obs_per_sec, opt_per_sec
        );

        let mut record = Record::empty();
        record.insert("global_step", Scalar(step as f32));
        record.insert("greedy/reward", Scalar(reward));
        record.insert("greedy/max_q", Scalar(q));
        record.insert("performance/obs_per_sec", Scalar(obs_per_sec));
        record.insert("performance/updates_per_sec", Scalar(opt_per_sec));
        recorder.write(record);
        recorder.flush();
        Ok(())
    }

    fn save_checkpoint(&self, step: usize) -> Result<()> {
        if let Some(model_dir) = &self.config.model_dir {
            checkpoint::save(
                model_dir,
                step,
                &self.globals.params,
                &self.globals.target,
                &self.globals.optimizer,
            )?;
            checkpoint::prune(model_dir, self.config.keep_checkpoints)?;
        }
        Ok(())
    }
}
