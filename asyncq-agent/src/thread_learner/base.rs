use crate::{
    async_dqn::Globals,
    util::{clip_global_norm, max_q},
    AsyncDqnError, EpsilonGreedy, Mlp, MlpConfig, RecordMessage,
};
use anyhow::Result;
use asyncq_core::{
    record::{Record, RecordValue},
    util::{clip_reward, discount_rewards, IncrementalAverage},
    Env,
};
use crossbeam_channel::Sender;
use log::info;
use ndarray::{Array1, ArrayD};
use std::sync::Arc;

/// One autonomous training worker.
///
/// Owns a private environment instance, a local copy of the network
/// parameters and its own annealing policy. Each batch it resynchronizes
/// the local copy from the global parameters, collects up to
/// `batch_size` transitions, bootstraps n-step returns from the global
/// target network and applies its gradients to the global parameters
/// through the shared optimizer.
pub struct ThreadLearner<E: Env> {
    id: usize,
    scope: String,
    globals: Arc<Globals>,
    env: E,
    policy: EpsilonGreedy,
    qnet: Mlp,
    target: Mlp,
    batch_size: usize,
    gamma: f32,
    gradient_clip: Option<f32>,
    log_freq: usize,
    render: bool,
    sender: Sender<RecordMessage>,
}

impl<E> ThreadLearner<E>
where
    E: Env,
    E::Obs: Into<Array1<f32>>,
    E::Act: From<usize>,
{
    /// Builds a worker with its own environment instance, seeded by the
    /// worker id.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        id: usize,
        globals: Arc<Globals>,
        env_config: &E::Config,
        model_config: MlpConfig,
        policy: EpsilonGreedy,
        batch_size: usize,
        gamma: f32,
        gradient_clip: Option<f32>,
        log_freq: usize,
        render: bool,
        sender: Sender<RecordMessage>,
    ) -> Result<Self> {
        let env = E::build(env_config, id as i64)?;
        let qnet = Mlp::build(model_config.clone());
        let target = Mlp::build(model_config);
        Ok(Self {
            id,
            scope: format!("thread_learner_{}", id),
            globals,
            env,
            policy,
            qnet,
            target,
            batch_size,
            gamma,
            gradient_clip,
            log_freq,
            render,
            sender,
        })
    }

    /// The worker id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs the training loop until a stop is requested.
    ///
    /// The stop flag is observed at the loop boundary only; a worker that
    /// is mid-batch when the flag is set finishes that batch first.
    pub fn run(mut self) -> Result<()> {
        let mut ep_reward = IncrementalAverage::new();
        let mut ep_q = IncrementalAverage::new();
        let mut reward_accum = 0.0;
        let mut prev_log_step = self.globals.obs_count();
        let mut obs: Array1<f32> = self.env.reset()?.into();
        let mut term = false;
        info!("Started {}", self.scope);

        while !self.globals.stop_requested() {
            self.globals.params.copy_to(self.qnet.params_mut());
            if term {
                term = false;
                obs = self.env.reset()?.into();
            }

            let mut batch_obs = Vec::with_capacity(self.batch_size);
            let mut batch_actions = Vec::with_capacity(self.batch_size);
            let mut batch_rewards = Vec::with_capacity(self.batch_size);
            while !term && batch_obs.len() < self.batch_size {
                let current_step = self.globals.increment_obs();
                let q = self.qnet.forward(&obs);
                let action = self.policy.action(&q, current_step);
                let step = self.env.step(&action.into());
                if self.render {
                    self.env.render();
                }
                reward_accum += step.reward;
                batch_obs.push(obs);
                batch_actions.push(action);
                batch_rewards.push(clip_reward(step.reward));
                term = step.is_terminated;
                obs = step.obs.into();
            }

            let bootstrap = if !term {
                self.globals.target.copy_to(self.target.params_mut());
                let value = max_q(&self.target.forward(&obs));
                ep_q.add(value);
                value
            } else {
                ep_reward.add(reward_accum);
                reward_accum = 0.0;
                0.0
            };

            let returns = discount_rewards(&batch_rewards, self.gamma, bootstrap);
            let (mut grads, loss) = self.qnet.gradients(&batch_obs, &batch_actions, &returns);
            if let Some(threshold) = self.gradient_clip {
                clip_global_norm(&mut grads, threshold);
            }
            self.globals.optimizer.apply(&self.globals.params, &grads);
            self.globals.increment_opt();

            let step = self.globals.obs_count();
            if term && self.log_freq > 0 && step - prev_log_step > self.log_freq {
                prev_log_step = step;
                self.report(step, &mut ep_reward, &mut ep_q, loss, &grads);
            }
        }
        info!("Stopped {}", self.scope);
        Ok(())
    }

    fn report(
        &self,
        step: usize,
        ep_reward: &mut IncrementalAverage,
        ep_q: &mut IncrementalAverage,
        loss: f32,
        grads: &[ArrayD<f32>],
    ) {
        let train_r = ep_reward.reset();
        let train_q = ep_q.reset();
        let epsilon = self.policy.epsilon(step) as f32;
        info!(
            "{} on-policy eval: average R: {:.2}, average maxQ: {:.2}, step: {}",
            self.scope, train_r, train_q, step
        );

        let mut record = Record::empty();
        record.insert("train_r", RecordValue::Scalar(train_r));
        record.insert("train_q", RecordValue::Scalar(train_q));
        record.insert("epsilon", RecordValue::Scalar(epsilon));
        record.insert("loss", RecordValue::Scalar(loss));
        for (i, (param, grad)) in self.qnet.params().iter().zip(grads.iter()).enumerate() {
            record.insert(
                format!("weights_{}", i),
                RecordValue::Array1(param.iter().copied().collect()),
            );
            record.insert(
                format!("gradients_{}", i),
                RecordValue::Array1(grad.iter().copied().collect()),
            );
        }
        // The coordinator may already have left its supervision loop.
        let _ = self.sender.try_send(RecordMessage {
            scope: self.scope.clone(),
            step,
            record,
        });
    }

    /// Unsupported on a worker; see [`AsyncDqn::train`](crate::AsyncDqn::train).
    pub fn train(&mut self) -> Result<()> {
        Err(AsyncDqnError::ThreadTrainNotSupported.into())
    }

    /// Unsupported on a worker; see [`AsyncDqn::train`](crate::AsyncDqn::train).
    pub fn train_on_batch(
        &mut self,
        _obs: &[E::Obs],
        _actions: &[usize],
        _returns: &[f32],
    ) -> Result<Record> {
        Err(AsyncDqnError::ThreadTrainNotSupported.into())
    }

    /// Shutdown hook; termination itself is cooperative via the shared
    /// stop flag.
    pub fn close(&mut self) {}
}
