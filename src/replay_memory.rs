use ndarray::{Array1, Array2};
use rand::Rng;

use crate::error::{PgqError, Result};

/// One environment step as stored in replay.
///
/// The successor state is not stored: it is reconstructed from the next
/// entry in chronological order at sampling time, so each step costs a
/// single state copy. Terminal entries have no meaningful successor; their
/// bootstrap term is cancelled by the `1 - terminal` mask downstream.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    /// Recurrent state the learner held *before* taking this step, if any
    pub hidden: Option<Array1<f32>>,
    /// One-hot encoding of the taken action
    pub action: Array1<f32>,
    /// Reward after rescaling
    pub reward: f32,
    pub terminal: bool,
}

impl Transition {
    pub fn new(state: Array1<f32>, action: Array1<f32>, reward: f32, terminal: bool) -> Self {
        Transition {
            state,
            hidden: None,
            action,
            reward,
            terminal,
        }
    }

    pub fn with_hidden(
        state: Array1<f32>,
        hidden: Array1<f32>,
        action: Array1<f32>,
        reward: f32,
        terminal: bool,
    ) -> Self {
        Transition {
            state,
            hidden: Some(hidden),
            action,
            reward,
            terminal,
        }
    }
}

/// A batch of sampled transitions as parallel arrays, one row per draw.
#[derive(Clone, Debug)]
pub struct TransitionBatch {
    pub states: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub next_states: Array2<f32>,
    /// 1.0 for terminal transitions, 0.0 otherwise
    pub terminals: Array1<f32>,
    pub hiddens: Option<Array2<f32>>,
    pub next_hiddens: Option<Array2<f32>>,
}

impl TransitionBatch {
    pub fn len(&self) -> usize {
        self.states.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.states.nrows() == 0
    }
}

/// Fixed-capacity replay memory backed by a ring of transitions.
///
/// Appending is O(1) and overwrites the oldest entry once the ring is full.
/// `sample_batch` performs independent uniform draws with replacement over the
/// stored transitions. The caller is responsible for the minimum-occupancy
/// policy; sampling an empty memory is an error.
#[derive(Clone)]
pub struct ReplayMemory {
    entries: Vec<Transition>,
    capacity: usize,
    position: usize,
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        ReplayMemory {
            entries: Vec::with_capacity(capacity),
            capacity,
            position: 0,
        }
    }

    /// Store one transition, evicting the oldest when at capacity.
    pub fn append(&mut self, transition: Transition) {
        if self.entries.len() < self.capacity {
            self.entries.push(transition);
        } else {
            self.entries[self.position] = transition;
            self.position = (self.position + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entry at chronological rank `k` (0 = oldest surviving entry).
    fn chronological(&self, k: usize) -> &Transition {
        let start = if self.entries.len() < self.capacity {
            0
        } else {
            self.position
        };
        &self.entries[(start + k) % self.capacity]
    }

    /// A rank can be sampled when its successor state is reconstructible:
    /// either the next chronological entry exists, or the transition is
    /// terminal and the successor is masked out anyway.
    fn eligible(&self, k: usize) -> bool {
        k + 1 < self.entries.len() || self.chronological(k).terminal
    }

    /// Draw `n` transitions uniformly at random, with replacement.
    pub fn sample_batch(&self, n: usize) -> Result<TransitionBatch> {
        let eligible: Vec<usize> = (0..self.entries.len())
            .filter(|&k| self.eligible(k))
            .collect();
        if eligible.is_empty() {
            return Err(PgqError::EmptyBuffer(
                "replay memory has no sampleable transitions".to_string(),
            ));
        }

        let state_size = self.chronological(0).state.len();
        let action_size = self.chronological(0).action.len();
        let hidden_size = self.chronological(0).hidden.as_ref().map(|h| h.len());

        let mut states = Array2::zeros((n, state_size));
        let mut actions = Array2::zeros((n, action_size));
        let mut rewards = Array1::zeros(n);
        let mut next_states = Array2::zeros((n, state_size));
        let mut terminals = Array1::zeros(n);
        let mut hiddens = hidden_size.map(|h| Array2::zeros((n, h)));
        let mut next_hiddens = hidden_size.map(|h| Array2::zeros((n, h)));

        let mut rng = rand::thread_rng();
        for row in 0..n {
            let k = eligible[rng.gen_range(0..eligible.len())];
            let entry = self.chronological(k);
            let successor = if k + 1 < self.entries.len() {
                Some(self.chronological(k + 1))
            } else {
                None
            };

            states.row_mut(row).assign(&entry.state);
            actions.row_mut(row).assign(&entry.action);
            rewards[row] = entry.reward;
            terminals[row] = if entry.terminal { 1.0 } else { 0.0 };
            if let Some(next) = successor {
                next_states.row_mut(row).assign(&next.state);
            }

            if let (Some(hiddens), Some(h)) = (hiddens.as_mut(), entry.hidden.as_ref()) {
                hiddens.row_mut(row).assign(h);
            }
            if let Some(next_hiddens) = next_hiddens.as_mut() {
                if let Some(h) = successor.and_then(|next| next.hidden.as_ref()) {
                    next_hiddens.row_mut(row).assign(h);
                }
            }
        }

        Ok(TransitionBatch {
            states,
            actions,
            rewards,
            next_states,
            terminals,
            hiddens,
            next_hiddens,
        })
    }
}
