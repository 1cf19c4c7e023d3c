//! Off-policy Q-learning objective over replayed transitions.
//!
//! The batch network sees current and next states concatenated along the
//! batch axis; the outputs are split back in half to form the
//! entropy-regularized surrogate `Q~ = beta * (log pi + H) + V`, the
//! bootstrap target and the TD error. The TD error is consumed as a constant
//! coefficient by the network's score-gradient entry point, never
//! differentiated through.

use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::config::PgqConfig;
use crate::error::{PgqError, Result};
use crate::gradient::GradientSet;
use crate::network::{BatchOutputs, PolicyValueNetwork, RecurrentPolicyValueNetwork};
use crate::replay_memory::{ReplayMemory, TransitionBatch};

/// Q-updates are skipped while occupancy is below capacity / 10.
const MIN_OCCUPANCY_DIVISOR: usize = 10;

/// Whether the replay memory is full enough to support a Q-update.
pub fn has_minimum_occupancy(memory: &ReplayMemory) -> bool {
    !memory.is_empty() && memory.len() >= memory.capacity() / MIN_OCCUPANCY_DIVISOR
}

/// Builder for the off-policy Q-learning gradient.
#[derive(Clone, Debug)]
pub struct QObjective {
    gamma: f32,
    pgq_fraction: f32,
}

impl QObjective {
    pub fn new(config: &PgqConfig) -> Self {
        QObjective {
            gamma: config.gamma,
            pgq_fraction: config.pgq_fraction,
        }
    }

    /// `Q~[i][a] = beta * (log_pi[i][a] + H_i) + V_i`
    pub fn q_tilde(outputs: &BatchOutputs, beta: f32) -> Array2<f32> {
        let entropy = outputs.entropy.view().insert_axis(Axis(1));
        let value = outputs.value.view().insert_axis(Axis(1));
        (&outputs.log_pi + &entropy) * beta + &value
    }

    /// `gamma * max_a(Q_next) * (1 - terminal)`; zero for terminal rows
    /// regardless of the next-state values.
    pub fn bootstrap_targets(
        &self,
        q_next: ArrayView2<f32>,
        terminals: ArrayView1<f32>,
    ) -> Array1<f32> {
        let max_q = q_next.map_axis(Axis(1), |row| {
            row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b))
        });
        self.gamma * max_q * (1.0 - &terminals)
    }

    /// Q-value of the action actually taken, gathered through the one-hot mask.
    pub fn taken_action_values(q_current: ArrayView2<f32>, actions: ArrayView2<f32>) -> Array1<f32> {
        (&q_current * &actions).sum_axis(Axis(1))
    }

    /// Per-row coefficient handed to the network: `-pgq_fraction * delta`,
    /// where `delta = reward + gamma * max_a(Q_next) * (1 - terminal) - Q_a`.
    fn coefficients(
        &self,
        outputs: &BatchOutputs,
        beta: f32,
        batch: &TransitionBatch,
    ) -> Result<Array1<f32>> {
        let n = batch.len();
        if outputs.log_pi.nrows() != 2 * n {
            return Err(PgqError::dimension_mismatch(
                format!("{} output rows", 2 * n),
                format!("{}", outputs.log_pi.nrows()),
            ));
        }

        let q_tilde = Self::q_tilde(outputs, beta);
        let q_current = q_tilde.slice(ndarray::s![..n, ..]);
        let q_next = q_tilde.slice(ndarray::s![n.., ..]);

        let max_tq = self.bootstrap_targets(q_next, batch.terminals.view());
        let q_a = Self::taken_action_values(q_current, batch.actions.view());
        let delta = &batch.rewards + &max_tq - &q_a;

        Ok(delta * (-self.pgq_fraction))
    }

    /// Gradient of `-pgq_fraction * mean(delta * (V + log pi_a))` with respect
    /// to all network parameters, clipped per the network's declared mode.
    pub fn gradients(
        &self,
        net: &mut dyn PolicyValueNetwork,
        batch: &TransitionBatch,
    ) -> Result<GradientSet> {
        let states = concatenate(
            Axis(0),
            &[batch.states.view(), batch.next_states.view()],
        )
        .map_err(|e| PgqError::NumericalError(e.to_string()))?;
        let actions = concatenate(Axis(0), &[batch.actions.view(), batch.actions.view()])
            .map_err(|e| PgqError::NumericalError(e.to_string()))?;

        let outputs = net.batch_forward(states.view(), actions.view())?;
        let coefficients = self.coefficients(&outputs, net.beta(), batch)?;

        let mut gradients =
            net.weighted_score_gradients(batch.states.view(), batch.actions.view(), coefficients.view())?;
        net.gradient_clipper().clip_set(&mut gradients);
        Ok(gradients)
    }

    /// Recurrent counterpart: every replayed row carries its historical
    /// hidden state and is treated as an independent single-step unroll.
    pub fn gradients_recurrent(
        &self,
        net: &mut dyn RecurrentPolicyValueNetwork,
        batch: &TransitionBatch,
    ) -> Result<GradientSet> {
        let hiddens = batch.hiddens.as_ref().ok_or_else(|| {
            PgqError::TrainingError("replayed batch is missing hidden states".to_string())
        })?;
        let next_hiddens = batch.next_hiddens.as_ref().ok_or_else(|| {
            PgqError::TrainingError("replayed batch is missing next hidden states".to_string())
        })?;

        let states = concatenate(
            Axis(0),
            &[batch.states.view(), batch.next_states.view()],
        )
        .map_err(|e| PgqError::NumericalError(e.to_string()))?;
        let actions = concatenate(Axis(0), &[batch.actions.view(), batch.actions.view()])
            .map_err(|e| PgqError::NumericalError(e.to_string()))?;
        let initial_hiddens = concatenate(Axis(0), &[hiddens.view(), next_hiddens.view()])
            .map_err(|e| PgqError::NumericalError(e.to_string()))?;
        let step_sizes = vec![1usize; 2 * batch.len()];

        let outputs = net.batch_forward_recurrent(
            states.view(),
            actions.view(),
            initial_hiddens.view(),
            &step_sizes,
        )?;
        let coefficients = self.coefficients(&outputs, net.beta(), batch)?;

        let mut gradients = net.weighted_score_gradients_recurrent(
            batch.states.view(),
            batch.actions.view(),
            hiddens.view(),
            coefficients.view(),
        )?;
        net.gradient_clipper().clip_set(&mut gradients);
        Ok(gradients)
    }
}
