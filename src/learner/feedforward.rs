use ndarray::{Array1, ArrayView1};
use rand::rngs::ThreadRng;

use crate::config::PgqConfig;
use crate::error::Result;
use crate::gradient::GradientSet;
use crate::network::{PolicyValueNetwork, PolicyUpdate};
use crate::q_update::{has_minimum_occupancy, QObjective};
use crate::replay_memory::{ReplayMemory, Transition};

use super::strategy::{
    one_hot, sample_policy_action, stack_rows, ActionChoice, RolloutStrategy, SegmentBatch,
};

/// Feedforward rollout variant: no recurrent state anywhere, segment order
/// does not matter, and replayed transitions need no extra context.
pub struct FeedforwardStrategy<N: PolicyValueNetwork> {
    net: N,
    replay: ReplayMemory,
    objective: QObjective,
    batch_update_size: usize,
    rng: ThreadRng,
}

impl<N: PolicyValueNetwork> FeedforwardStrategy<N> {
    pub fn new(net: N, config: &PgqConfig) -> Self {
        FeedforwardStrategy {
            net,
            replay: ReplayMemory::new(config.replay_size),
            objective: QObjective::new(config),
            batch_update_size: config.batch_update_size,
            rng: rand::thread_rng(),
        }
    }

    pub fn replay(&self) -> &ReplayMemory {
        &self.replay
    }

    pub fn network(&self) -> &N {
        &self.net
    }
}

impl<N: PolicyValueNetwork> RolloutStrategy for FeedforwardStrategy<N> {
    fn network_mut(&mut self) -> &mut dyn PolicyValueNetwork {
        &mut self.net
    }

    fn reset_hidden_state(&mut self) {}

    fn choose_next_action(&mut self, state: ArrayView1<f32>) -> Result<ActionChoice> {
        let (value, pi) = self.net.predict(state)?;
        let action_index = sample_policy_action(&pi, &mut self.rng);
        Ok(ActionChoice {
            action: one_hot(action_index, self.net.num_actions()),
            value,
            pi,
        })
    }

    fn bootstrap_value(&mut self, state: ArrayView1<f32>) -> Result<f32> {
        let (value, _) = self.net.predict(state)?;
        Ok(value)
    }

    fn store_transition(
        &mut self,
        state: &Array1<f32>,
        action: &Array1<f32>,
        reward: f32,
        terminal: bool,
    ) {
        self.replay
            .append(Transition::new(state.clone(), action.clone(), reward, terminal));
    }

    fn segment_gradients(&mut self, segment: &SegmentBatch) -> Result<PolicyUpdate> {
        let states = stack_rows(&segment.states)?;
        let actions = stack_rows(&segment.actions)?;
        let targets = Array1::from_vec(segment.value_targets.clone());
        let advantages = Array1::from_vec(segment.advantages.clone());

        self.net.actor_critic_gradients(
            states.view(),
            actions.view(),
            targets.view(),
            advantages.view(),
        )
    }

    fn batch_q_update(&mut self) -> Result<Option<GradientSet>> {
        if !has_minimum_occupancy(&self.replay) {
            return Ok(None);
        }
        let batch = self.replay.sample_batch(self.batch_update_size)?;
        let gradients = self.objective.gradients(&mut self.net, &batch)?;
        Ok(Some(gradients))
    }
}
