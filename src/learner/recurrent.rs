use ndarray::{Array1, ArrayView1};
use rand::rngs::ThreadRng;

use crate::config::PgqConfig;
use crate::error::Result;
use crate::gradient::GradientSet;
use crate::network::{PolicyUpdate, PolicyValueNetwork, RecurrentPolicyValueNetwork};
use crate::q_update::{has_minimum_occupancy, QObjective};
use crate::replay_memory::{ReplayMemory, Transition};

use super::strategy::{
    one_hot, sample_policy_action, stack_rows, ActionChoice, RolloutStrategy, SegmentBatch,
};

const HIDDEN_CHANGE_TOLERANCE: f32 = 1e-6;

/// Recurrent rollout variant.
///
/// The strategy owns the hidden state and threads it through every network
/// call. Each stored transition carries the hidden state held *before* the
/// step, so replay can re-establish the exact context that produced it; each
/// replayed row is then a single-step unroll from that historical state.
///
/// Two invariants are checked at runtime and are fatal when violated, since
/// they indicate a wiring bug rather than a transient condition: action
/// selection must change the hidden state, and a bootstrap value query must
/// leave it bit-identical.
pub struct RecurrentStrategy<N: RecurrentPolicyValueNetwork> {
    net: N,
    replay: ReplayMemory,
    objective: QObjective,
    batch_update_size: usize,
    rng: ThreadRng,
    hidden: Array1<f32>,
    /// Hidden state before the most recent action selection
    prev_hidden: Array1<f32>,
    /// Hidden state at the start of the current segment
    segment_start_hidden: Array1<f32>,
}

impl<N: RecurrentPolicyValueNetwork> RecurrentStrategy<N> {
    pub fn new(net: N, config: &PgqConfig) -> Self {
        let hidden_size = net.hidden_state_size();
        RecurrentStrategy {
            net,
            replay: ReplayMemory::new(config.replay_size),
            objective: QObjective::new(config),
            batch_update_size: config.batch_update_size,
            rng: rand::thread_rng(),
            hidden: Array1::zeros(hidden_size),
            prev_hidden: Array1::zeros(hidden_size),
            segment_start_hidden: Array1::zeros(hidden_size),
        }
    }

    pub fn replay(&self) -> &ReplayMemory {
        &self.replay
    }

    pub fn hidden_state(&self) -> &Array1<f32> {
        &self.hidden
    }
}

fn arrays_close(a: &Array1<f32>, b: &Array1<f32>, tolerance: f32) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(&x, &y)| (x - y).abs() <= tolerance)
}

impl<N: RecurrentPolicyValueNetwork> RolloutStrategy for RecurrentStrategy<N> {
    fn network_mut(&mut self) -> &mut dyn PolicyValueNetwork {
        &mut self.net
    }

    fn reset_hidden_state(&mut self) {
        self.hidden.fill(0.0);
        self.prev_hidden.fill(0.0);
    }

    fn begin_segment(&mut self) {
        self.segment_start_hidden = self.hidden.clone();
    }

    fn choose_next_action(&mut self, state: ArrayView1<f32>) -> Result<ActionChoice> {
        let before = self.hidden.clone();
        let output = self.net.step(state, self.hidden.view())?;

        assert!(
            !arrays_close(&output.next_hidden, &before, HIDDEN_CHANGE_TOLERANCE),
            "recurrent state did not advance on action selection"
        );

        self.prev_hidden = before;
        self.hidden = output.next_hidden;

        let action_index = sample_policy_action(&output.pi, &mut self.rng);
        Ok(ActionChoice {
            action: one_hot(action_index, self.net.num_actions()),
            value: output.value,
            pi: output.pi,
        })
    }

    fn bootstrap_value(&mut self, state: ArrayView1<f32>) -> Result<f32> {
        let before = self.hidden.clone();
        let value = self.net.value_with_hidden(state, self.hidden.view())?;

        assert!(
            self.hidden == before,
            "recurrent state mutated by a bootstrap value query"
        );
        Ok(value)
    }

    fn store_transition(
        &mut self,
        state: &Array1<f32>,
        action: &Array1<f32>,
        reward: f32,
        terminal: bool,
    ) {
        self.replay.append(Transition::with_hidden(
            state.clone(),
            self.prev_hidden.clone(),
            action.clone(),
            reward,
            terminal,
        ));
    }

    fn segment_gradients(&mut self, segment: &SegmentBatch) -> Result<PolicyUpdate> {
        // The backward accumulation produced reverse order; the recurrent
        // unroll needs its inputs time-ordered.
        let states: Vec<Array1<f32>> = segment.states.iter().rev().cloned().collect();
        let actions: Vec<Array1<f32>> = segment.actions.iter().rev().cloned().collect();
        let targets: Array1<f32> = segment.value_targets.iter().rev().cloned().collect();
        let advantages: Array1<f32> = segment.advantages.iter().rev().cloned().collect();

        let states = stack_rows(&states)?;
        let actions = stack_rows(&actions)?;

        self.net.actor_critic_gradients_recurrent(
            states.view(),
            actions.view(),
            targets.view(),
            advantages.view(),
            self.segment_start_hidden.view(),
        )
    }

    fn batch_q_update(&mut self) -> Result<Option<GradientSet>> {
        if !has_minimum_occupancy(&self.replay) {
            return Ok(None);
        }
        let batch = self.replay.sample_batch(self.batch_update_size)?;
        let gradients = self.objective.gradients_recurrent(&mut self.net, &batch)?;
        Ok(Some(gradients))
    }
}
