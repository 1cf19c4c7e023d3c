/// Decides when a rollout iteration additionally triggers a Q-update.
///
/// Pure counting policy: the counter advances once per rollout iteration and
/// the update fires every `interval` ticks. The counter is local to one
/// learner; nothing here is shared.
#[derive(Clone, Debug)]
pub struct QUpdateScheduler {
    counter: usize,
    interval: usize,
}

impl QUpdateScheduler {
    /// `interval` must be positive; the configuration validates this.
    pub fn new(interval: usize) -> Self {
        QUpdateScheduler {
            counter: 0,
            interval,
        }
    }

    /// Advance by one iteration and report whether a Q-update is due.
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        self.counter % self.interval == 0
    }

    pub fn iterations(&self) -> usize {
        self.counter
    }
}
