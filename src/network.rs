//! Collaborator traits for the policy/value network.
//!
//! The forward/backward computation graph lives outside this crate; the
//! learner only needs the declared outputs of the network and a small set of
//! gradient entry points. Implementations decide how parameters are stored
//! and differentiated.

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2};

use crate::error::Result;
use crate::gradient::{GradientClipper, GradientSet};

/// Declared outputs of a batched forward pass, one row per batch entry.
#[derive(Clone, Debug)]
pub struct BatchOutputs {
    /// Value estimate per row
    pub value: Array1<f32>,
    /// Policy probabilities, rows x actions
    pub pi: Array2<f32>,
    /// Log policy probabilities, rows x actions
    pub log_pi: Array2<f32>,
    /// Policy entropy per row
    pub entropy: Array1<f32>,
    /// Log probability of the selected action per row
    pub log_pi_selected: Array1<f32>,
}

/// Gradients for one rollout segment plus the segment's mean policy entropy.
#[derive(Clone, Debug)]
pub struct PolicyUpdate {
    pub gradients: GradientSet,
    pub mean_entropy: f32,
}

/// Output of a single recurrent step.
#[derive(Clone, Debug)]
pub struct StepOutput {
    pub value: f32,
    pub pi: Array1<f32>,
    pub next_hidden: Array1<f32>,
}

/// A policy/value network as seen by a learner.
///
/// All methods take `&mut self` because implementations typically cache
/// forward activations between the forward and backward passes.
pub trait PolicyValueNetwork {
    /// Size of the discrete action space
    fn num_actions(&self) -> usize;

    /// Temperature applied to the entropy-regularized Q surrogate
    fn beta(&self) -> f32;

    /// The clipping the network wants applied to its gradients
    fn gradient_clipper(&self) -> GradientClipper;

    /// Value estimate and policy probabilities for a single state
    fn predict(&mut self, state: ArrayView1<f32>) -> Result<(f32, Array1<f32>)>;

    /// Batched forward pass with the taken actions wired in, so that
    /// `log_pi_selected` can be reported per row.
    fn batch_forward(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
    ) -> Result<BatchOutputs>;

    /// Gradients of `mean(coefficients_i * (V_i + log pi_{a_i}))` with
    /// respect to all trainable parameters.
    ///
    /// Contract: `coefficients` are constants for the differentiation pass.
    /// The caller has already evaluated them; no gradient may flow through
    /// them.
    fn weighted_score_gradients(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
        coefficients: ArrayView1<f32>,
    ) -> Result<GradientSet>;

    /// Standard actor-critic gradients over a rollout segment: policy loss
    /// weighted by the advantages, value regression against the targets, and
    /// an entropy bonus.
    fn actor_critic_gradients(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
        value_targets: ArrayView1<f32>,
        advantages: ArrayView1<f32>,
    ) -> Result<PolicyUpdate>;

    /// Overwrite local parameters, used when syncing from the shared store.
    fn set_parameters(&mut self, params: &[ArrayD<f32>]) -> Result<()>;
}

/// Recurrent extension of [`PolicyValueNetwork`].
///
/// Hidden state is owned by the caller and threaded through every call; the
/// network itself stays stateless across invocations.
pub trait RecurrentPolicyValueNetwork: PolicyValueNetwork {
    /// Width of the recurrent state vector
    fn hidden_state_size(&self) -> usize;

    /// Advance one step: consumes the current hidden state, produces the next.
    fn step(&mut self, state: ArrayView1<f32>, hidden: ArrayView1<f32>) -> Result<StepOutput>;

    /// Value estimate under a given hidden state. Must not advance or mutate
    /// any recurrent state visible to the caller.
    fn value_with_hidden(&mut self, state: ArrayView1<f32>, hidden: ArrayView1<f32>)
        -> Result<f32>;

    /// Batched forward pass where each row carries its own initial hidden
    /// state and unrolls for `step_sizes[row]` steps (1 for replayed rows).
    fn batch_forward_recurrent(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
        initial_hiddens: ArrayView2<f32>,
        step_sizes: &[usize],
    ) -> Result<BatchOutputs>;

    /// Recurrent counterpart of
    /// [`PolicyValueNetwork::weighted_score_gradients`]; each row is an
    /// independent single-step unroll from its stored hidden state.
    fn weighted_score_gradients_recurrent(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
        initial_hiddens: ArrayView2<f32>,
        coefficients: ArrayView1<f32>,
    ) -> Result<GradientSet>;

    /// Recurrent actor-critic gradients over one time-ordered segment,
    /// unrolled from the hidden state the learner held at segment start.
    fn actor_critic_gradients_recurrent(
        &mut self,
        states: ArrayView2<f32>,
        selected_actions: ArrayView2<f32>,
        value_targets: ArrayView1<f32>,
        advantages: ArrayView1<f32>,
        initial_hidden: ArrayView1<f32>,
    ) -> Result<PolicyUpdate>;
}
