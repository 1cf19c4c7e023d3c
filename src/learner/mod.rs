//! The actor-learner rollout loop.
//!
//! One [`ActorLearner`] runs per thread. Each iteration syncs the local
//! network from the shared store, collects an on-policy segment, pushes the
//! actor-critic gradient, and periodically pushes an off-policy Q-learning
//! gradient from replay. The only cross-learner coordination is the shared
//! step counter and the parameter store.

mod feedforward;
mod recurrent;
mod strategy;

pub use feedforward::FeedforwardStrategy;
pub use recurrent::RecurrentStrategy;
pub use strategy::{ActionChoice, RolloutStrategy, SegmentBatch};

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::PgqConfig;
use crate::emulator::Emulator;
use crate::error::Result;
use crate::scheduler::QUpdateScheduler;
use crate::shared::{GlobalStep, ParameterStore};

/// Summary of a finished episode, handed to [`LearnerHooks`].
#[derive(Clone, Debug)]
pub struct EpisodeStats {
    /// Sum of raw (un-rescaled) rewards over the episode
    pub reward: f32,
    /// Number of environment steps in the episode
    pub length: usize,
    /// Entropy of the policy, averaged over the episode's segments
    pub mean_entropy: f32,
    /// Mean value estimate over the episode's steps
    pub mean_value: f32,
}

/// External side effects triggered by the rollout loop: checkpointing (master
/// only) and episode bookkeeping. Both default to no-ops.
pub trait LearnerHooks: Send {
    /// Called once per iteration by the master learner, right after the sync.
    fn save_vars(&mut self) {}

    /// Called whenever an episode completes.
    fn episode_finished(&mut self, _stats: &EpisodeStats) {}
}

/// No-op hooks.
pub struct NoHooks;

impl LearnerHooks for NoHooks {}

/// One asynchronous PGQ learner.
///
/// Owns its rollout strategy (and through it the local network and replay
/// memory) and its emulator; shares only the step counter and parameter
/// store with other learners.
pub struct ActorLearner<S: RolloutStrategy> {
    actor_id: usize,
    config: PgqConfig,
    strategy: S,
    emulator: Box<dyn Emulator>,
    store: Arc<dyn ParameterStore>,
    global_step: GlobalStep,
    scheduler: QUpdateScheduler,
    hooks: Box<dyn LearnerHooks>,
    local_step: usize,
}

impl<S: RolloutStrategy> ActorLearner<S> {
    pub fn new(
        actor_id: usize,
        config: PgqConfig,
        strategy: S,
        emulator: Box<dyn Emulator>,
        store: Arc<dyn ParameterStore>,
        global_step: GlobalStep,
        hooks: Box<dyn LearnerHooks>,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = QUpdateScheduler::new(config.q_update_interval);
        Ok(ActorLearner {
            actor_id,
            config,
            strategy,
            emulator,
            store,
            global_step,
            scheduler,
            hooks,
            local_step: 0,
        })
    }

    /// The designated checkpointing learner
    pub fn is_master(&self) -> bool {
        self.actor_id == 0
    }

    pub fn local_step(&self) -> usize {
        self.local_step
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    fn rescale_reward(&self, reward: f32) -> f32 {
        reward.clamp(-self.config.reward_clip, self.config.reward_clip)
    }

    /// Main actor-learner loop for advantage actor-critic learning with
    /// scheduled Q-updates. Runs until the shared step counter reaches its
    /// maximum; the termination condition is checked once per iteration, so
    /// an in-flight segment always completes.
    pub fn train(&mut self) -> Result<()> {
        info!(
            actor = self.actor_id,
            step = self.global_step.value(),
            "learner starting"
        );

        let mut state = self.emulator.get_initial_state()?;
        let mut episode_reward = 0.0f32;
        let mut episode_value_sum = 0.0f32;
        let mut mean_entropy = 0.0f32;
        let mut episode_start_step = self.local_step;

        while self.global_step.value() < self.config.max_global_steps {
            // Sync local learning net with shared memory.
            self.store.sync_net(self.strategy.network_mut())?;
            if self.is_master() {
                self.hooks.save_vars();
            }
            self.strategy.begin_segment();

            let segment_start = self.local_step;
            let mut episode_over = false;
            let mut states = Vec::new();
            let mut actions = Vec::new();
            let mut rewards = Vec::new();
            let mut values = Vec::new();

            while !episode_over && self.local_step - segment_start < self.config.max_local_steps {
                let choice = self.strategy.choose_next_action(state.view())?;

                if self.is_master() && self.local_step % 100 == 0 {
                    debug!(actor = self.actor_id, value = choice.value, pi = ?choice.pi, "policy output");
                }

                let step = self.emulator.next(choice.action.view())?;
                episode_reward += step.reward;

                // Rescale or clip immediate reward before it enters learning.
                let reward = self.rescale_reward(step.reward);
                self.strategy
                    .store_transition(&state, &choice.action, reward, step.episode_over);

                rewards.push(reward);
                values.push(choice.value);
                actions.push(choice.action);
                states.push(std::mem::replace(&mut state, step.next_state));

                episode_over = step.episode_over;
                self.local_step += 1;
                self.global_step.increment();
            }

            // Value offered by the critic in the final state, unless the
            // episode ended naturally.
            let mut r = if episode_over {
                0.0
            } else {
                self.strategy.bootstrap_value(state.view())?
            };

            episode_value_sum += values.iter().sum::<f32>();

            // Backward accumulation of discounted returns; the batch ends up
            // in reverse-chronological order.
            let mut segment = SegmentBatch::with_capacity(states.len());
            for ((state, action), (&reward, &value)) in states
                .into_iter()
                .rev()
                .zip(actions.into_iter().rev())
                .zip(rewards.iter().rev().zip(values.iter().rev()))
            {
                r = reward + self.config.gamma * r;
                segment.value_targets.push(r);
                segment.advantages.push(r - value);
                segment.actions.push(action);
                segment.states.push(state);
            }

            let update = self.strategy.segment_gradients(&segment)?;
            self.store.apply_gradients(&update.gradients)?;

            let delta_old = (segment_start - episode_start_step) as f32;
            let delta_new = (self.local_step - segment_start) as f32;
            mean_entropy = (mean_entropy * delta_old + update.mean_entropy * delta_new)
                / (delta_old + delta_new);

            if self.scheduler.tick() {
                if let Some(gradients) = self.strategy.batch_q_update()? {
                    self.store.apply_gradients(&gradients)?;
                }
            }

            if episode_over {
                let length = self.local_step - episode_start_step;
                let stats = EpisodeStats {
                    reward: episode_reward,
                    length,
                    mean_entropy,
                    mean_value: episode_value_sum / length as f32,
                };
                info!(
                    actor = self.actor_id,
                    reward = stats.reward,
                    length = stats.length,
                    entropy = stats.mean_entropy,
                    "episode finished"
                );
                self.hooks.episode_finished(&stats);

                episode_reward = 0.0;
                episode_value_sum = 0.0;
                mean_entropy = 0.0;
                episode_start_step = self.local_step;
                self.strategy.reset_hidden_state();
                state = self.emulator.get_initial_state()?;
            }
        }

        info!(
            actor = self.actor_id,
            step = self.global_step.value(),
            "learner finished"
        );
        Ok(())
    }
}
