use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::ThreadRng;
use rand::Rng;

use crate::error::{PgqError, Result};
use crate::gradient::GradientSet;
use crate::network::{PolicyValueNetwork, PolicyUpdate};

/// Outcome of one action selection.
#[derive(Clone, Debug)]
pub struct ActionChoice {
    /// One-hot encoding of the sampled action
    pub action: Array1<f32>,
    /// Value estimate of the state the action was chosen in
    pub value: f32,
    /// Policy probabilities the action was drawn from
    pub pi: Array1<f32>,
}

/// Batch built from one rollout segment.
///
/// Rows are in *reverse-chronological* order, as produced by the backward
/// discounted-return accumulation. The feedforward variant is
/// order-insensitive and consumes the batch as-is; the recurrent variant
/// re-reverses it into time order before the forward-time gradient pass.
#[derive(Clone, Debug, Default)]
pub struct SegmentBatch {
    pub states: Vec<Array1<f32>>,
    pub actions: Vec<Array1<f32>>,
    pub value_targets: Vec<f32>,
    pub advantages: Vec<f32>,
}

impl SegmentBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        SegmentBatch {
            states: Vec::with_capacity(capacity),
            actions: Vec::with_capacity(capacity),
            value_targets: Vec::with_capacity(capacity),
            advantages: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// The operations a rollout variant must provide.
///
/// The rollout driver is generic over this interface; the feedforward and
/// recurrent variants differ only in how they thread (or ignore) recurrent
/// state through these calls.
pub trait RolloutStrategy {
    /// The learner-local network, for syncing from the shared store.
    fn network_mut(&mut self) -> &mut dyn PolicyValueNetwork;

    /// Zero any recurrent state. Called at construction and at episode start;
    /// a no-op for the feedforward variant.
    fn reset_hidden_state(&mut self);

    /// Called once per iteration right after the parameter sync, before any
    /// step of the new segment is taken.
    fn begin_segment(&mut self) {}

    /// Sample an action from the current policy distribution.
    fn choose_next_action(&mut self, state: ArrayView1<f32>) -> Result<ActionChoice>;

    /// Value estimate used to bootstrap a truncated segment. Must not advance
    /// any recurrent state.
    fn bootstrap_value(&mut self, state: ArrayView1<f32>) -> Result<f32>;

    /// Append one step to the replay memory.
    fn store_transition(
        &mut self,
        state: &Array1<f32>,
        action: &Array1<f32>,
        reward: f32,
        terminal: bool,
    );

    /// Actor-critic gradients for the collected segment.
    fn segment_gradients(&mut self, segment: &SegmentBatch) -> Result<PolicyUpdate>;

    /// Off-policy Q-learning gradients from replay, or `None` when the
    /// replay memory is below its minimum occupancy.
    fn batch_q_update(&mut self) -> Result<Option<GradientSet>>;
}

/// Sample an action index from a categorical distribution.
pub(crate) fn sample_policy_action(probabilities: &Array1<f32>, rng: &mut ThreadRng) -> usize {
    let mut cumsum = 0.0;
    let rand_val: f32 = rng.gen();

    for (i, &p) in probabilities.iter().enumerate() {
        cumsum += p;
        if rand_val < cumsum {
            return i;
        }
    }

    // Fallback to last action if numerical issues
    probabilities.len() - 1
}

/// One-hot encoding of an action index.
pub(crate) fn one_hot(index: usize, num_actions: usize) -> Array1<f32> {
    let mut action = Array1::zeros(num_actions);
    action[index] = 1.0;
    action
}

/// Stack 1D rows into a 2D array.
pub(crate) fn stack_rows(rows: &[Array1<f32>]) -> Result<Array2<f32>> {
    if rows.is_empty() {
        return Err(PgqError::EmptyBuffer(
            "cannot stack an empty segment".to_string(),
        ));
    }

    let cols = rows[0].len();
    let mut result = Array2::zeros((rows.len(), cols));
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            return Err(PgqError::dimension_mismatch(
                format!("{} columns", cols),
                format!("{}", row.len()),
            ));
        }
        result.row_mut(i).assign(row);
    }
    Ok(result)
}
