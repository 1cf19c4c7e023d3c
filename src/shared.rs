//! State shared between concurrent learners: the canonical parameters and
//! the global step counter. Everything else is learner-local.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use ndarray::ArrayD;

use crate::error::{PgqError, Result};
use crate::gradient::GradientSet;
use crate::network::PolicyValueNetwork;

/// The shared parameter store as seen by a learner.
///
/// Implementations must be safe to call concurrently from all learners: a
/// gradient application is a single opaque call and the store decides its own
/// locking, averaging and staleness discipline. Learners treat both calls as
/// always succeeding or propagating a fatal error.
pub trait ParameterStore: Send + Sync {
    /// Copy the canonical parameters into a learner's local network.
    fn sync_net(&self, net: &mut dyn PolicyValueNetwork) -> Result<()>;

    /// Apply one gradient set to the canonical parameters.
    fn apply_gradients(&self, gradients: &GradientSet) -> Result<()>;
}

/// Cloneable handle on the shared, monotonically-increasing step counter.
///
/// Each environment step anywhere in the system increments it once; learners
/// read it only to decide termination, once per outer rollout iteration.
#[derive(Clone, Default)]
pub struct GlobalStep {
    counter: Arc<AtomicUsize>,
}

impl GlobalStep {
    pub fn new() -> Self {
        GlobalStep {
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn value(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn increment(&self) -> usize {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Reference in-process [`ParameterStore`]: canonical parameters behind a
/// `RwLock`, gradients applied by plain SGD descent.
///
/// Suitable for single-process multi-threaded training and for tests; a
/// distributed deployment would supply its own store.
pub struct InMemoryStore {
    params: RwLock<Vec<ArrayD<f32>>>,
    learning_rate: f32,
}

impl InMemoryStore {
    pub fn new(initial_params: Vec<ArrayD<f32>>, learning_rate: f32) -> Self {
        InMemoryStore {
            params: RwLock::new(initial_params),
            learning_rate,
        }
    }

    /// Snapshot of the canonical parameters
    pub fn snapshot(&self) -> Vec<ArrayD<f32>> {
        self.params
            .read()
            .expect("parameter store lock poisoned")
            .clone()
    }
}

impl ParameterStore for InMemoryStore {
    fn sync_net(&self, net: &mut dyn PolicyValueNetwork) -> Result<()> {
        let params = self
            .params
            .read()
            .map_err(|_| PgqError::TrainingError("parameter store lock poisoned".to_string()))?;
        net.set_parameters(&params)
    }

    fn apply_gradients(&self, gradients: &GradientSet) -> Result<()> {
        let mut params = self
            .params
            .write()
            .map_err(|_| PgqError::TrainingError("parameter store lock poisoned".to_string()))?;

        if params.len() != gradients.len() {
            return Err(PgqError::dimension_mismatch(
                format!("{} parameter tensors", params.len()),
                format!("{} gradient tensors", gradients.len()),
            ));
        }
        for (param, grad) in params.iter_mut().zip(gradients.iter()) {
            if param.shape() != grad.shape() {
                return Err(PgqError::dimension_mismatch(
                    format!("{:?}", param.shape()),
                    format!("{:?}", grad.shape()),
                ));
            }
            param.zip_mut_with(grad, |p, &g| *p -= self.learning_rate * g);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::thread;

    #[test]
    fn test_global_step_counts_across_threads() {
        let step = GlobalStep::new();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let step = step.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    step.increment();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(step.value(), 4000);
    }

    #[test]
    fn test_store_applies_sgd_update() {
        let store = InMemoryStore::new(vec![array![1.0, 2.0].into_dyn()], 0.5);
        store
            .apply_gradients(&vec![array![2.0, -2.0].into_dyn()])
            .unwrap();
        let params = store.snapshot();
        assert_eq!(params[0], array![0.0, 3.0].into_dyn());
    }

    #[test]
    fn test_store_rejects_mismatched_gradients() {
        let store = InMemoryStore::new(vec![array![1.0, 2.0].into_dyn()], 0.1);
        assert!(store.apply_gradients(&vec![]).is_err());
        assert!(store
            .apply_gradients(&vec![array![1.0, 2.0, 3.0].into_dyn()])
            .is_err());
    }
}
