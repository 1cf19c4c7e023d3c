use ndarray::{Array1, ArrayView1};

use crate::error::Result;

/// Result of one environment step.
#[derive(Clone, Debug)]
pub struct EmulatorStep {
    pub next_state: Array1<f32>,
    /// Raw reward, before any rescaling by the learner
    pub reward: f32,
    pub episode_over: bool,
}

/// The environment as seen by one learner.
///
/// Each learner owns its emulator instance; nothing here is shared across
/// threads.
pub trait Emulator {
    /// Observation at the start of a fresh episode
    fn get_initial_state(&mut self) -> Result<Array1<f32>>;

    /// Execute the one-hot encoded action and observe the outcome
    fn next(&mut self, action: ArrayView1<f32>) -> Result<EmulatorStep>;
}
