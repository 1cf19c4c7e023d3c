use std::sync::{Arc, Mutex};
use std::thread;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, IxDyn};

use pgq::config::{PgqConfig, PgqConfigBuilder};
use pgq::emulator::{Emulator, EmulatorStep};
use pgq::error::Result;
use pgq::gradient::{GradientClipper, GradientSet};
use pgq::learner::{ActorLearner, EpisodeStats, FeedforwardStrategy, LearnerHooks, NoHooks};
use pgq::network::{BatchOutputs, PolicyUpdate, PolicyValueNetwork};
use pgq::shared::{GlobalStep, InMemoryStore, ParameterStore};

const PARAM_SHAPE: [usize; 2] = [2, 2];

/// Two-action test network with a single 2x2 parameter tensor. Outputs are
/// deterministic; gradients are a constant so parameter movement in the
/// shared store is easy to predict.
struct TestNet {
    params: ArrayD<f32>,
    sync_count: usize,
}

impl TestNet {
    fn new() -> Self {
        TestNet {
            params: ArrayD::zeros(IxDyn(&PARAM_SHAPE)),
            sync_count: 0,
        }
    }

    fn constant_gradients() -> GradientSet {
        vec![ArrayD::from_elem(IxDyn(&PARAM_SHAPE), 0.1)]
    }

    fn uniform_outputs(rows: usize) -> BatchOutputs {
        BatchOutputs {
            value: Array1::from_elem(rows, 0.25),
            pi: Array2::from_elem((rows, 2), 0.5),
            log_pi: Array2::from_elem((rows, 2), 0.5f32.ln()),
            entropy: Array1::from_elem(rows, 2.0f32.ln()),
            log_pi_selected: Array1::from_elem(rows, 0.5f32.ln()),
        }
    }
}

impl PolicyValueNetwork for TestNet {
    fn num_actions(&self) -> usize {
        2
    }

    fn beta(&self) -> f32 {
        0.1
    }

    fn gradient_clipper(&self) -> GradientClipper {
        GradientClipper::ClipByGlobalNorm { max_norm: 40.0 }
    }

    fn predict(&mut self, _state: ArrayView1<f32>) -> Result<(f32, Array1<f32>)> {
        Ok((0.25, Array1::from_vec(vec![0.5, 0.5])))
    }

    fn batch_forward(
        &mut self,
        states: ArrayView2<f32>,
        _selected_actions: ArrayView2<f32>,
    ) -> Result<BatchOutputs> {
        Ok(Self::uniform_outputs(states.nrows()))
    }

    fn weighted_score_gradients(
        &mut self,
        _states: ArrayView2<f32>,
        _selected_actions: ArrayView2<f32>,
        _coefficients: ArrayView1<f32>,
    ) -> Result<GradientSet> {
        Ok(Self::constant_gradients())
    }

    fn actor_critic_gradients(
        &mut self,
        _states: ArrayView2<f32>,
        _selected_actions: ArrayView2<f32>,
        _value_targets: ArrayView1<f32>,
        _advantages: ArrayView1<f32>,
    ) -> Result<PolicyUpdate> {
        Ok(PolicyUpdate {
            gradients: Self::constant_gradients(),
            mean_entropy: 0.69,
        })
    }

    fn set_parameters(&mut self, params: &[ArrayD<f32>]) -> Result<()> {
        self.params = params[0].clone();
        self.sync_count += 1;
        Ok(())
    }
}

/// Walks a one-dimensional chain; the episode ends after a fixed number of
/// steps with a terminal reward of 1.
struct ChainEmulator {
    position: usize,
    episode_length: usize,
}

impl ChainEmulator {
    fn new(episode_length: usize) -> Self {
        ChainEmulator {
            position: 0,
            episode_length,
        }
    }
}

impl Emulator for ChainEmulator {
    fn get_initial_state(&mut self) -> Result<Array1<f32>> {
        self.position = 0;
        Ok(Array1::from_vec(vec![0.0]))
    }

    fn next(&mut self, _action: ArrayView1<f32>) -> Result<EmulatorStep> {
        self.position += 1;
        let episode_over = self.position >= self.episode_length;
        Ok(EmulatorStep {
            next_state: Array1::from_vec(vec![self.position as f32]),
            reward: if episode_over { 1.0 } else { 0.0 },
            episode_over,
        })
    }
}

fn test_config(max_global_steps: usize) -> PgqConfig {
    PgqConfigBuilder::new()
        .replay_size(50)
        .batch_update_size(8)
        .q_update_interval(2)
        .gamma(0.95)
        .max_local_steps(5)
        .max_global_steps(max_global_steps)
        .build()
        .unwrap()
}

fn shared_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(
        vec![ArrayD::zeros(IxDyn(&PARAM_SHAPE))],
        0.01,
    ))
}

#[test]
fn test_single_learner_trains_to_completion() {
    let config = test_config(100);
    let store = shared_store();
    let global_step = GlobalStep::new();

    let mut learner = ActorLearner::new(
        0,
        config.clone(),
        FeedforwardStrategy::new(TestNet::new(), &config),
        Box::new(ChainEmulator::new(6)),
        store.clone(),
        global_step.clone(),
        Box::new(NoHooks),
    )
    .unwrap();

    learner.train().unwrap();

    // An in-flight segment may overshoot the cap by at most one segment.
    assert!(global_step.value() >= 100);
    assert!(global_step.value() <= 100 + config.max_local_steps);
    assert_eq!(learner.local_step(), global_step.value());

    // The learner synced once per iteration and saw the descending store.
    assert!(learner.strategy().network().sync_count >= 100 / config.max_local_steps);
    let params = store.snapshot();
    assert!(params[0].iter().all(|&p| p < 0.0 && p.is_finite()));
}

#[test]
fn test_concurrent_learners_share_store_and_counter() {
    let workers = num_cpus::get().clamp(2, 4);
    let config = test_config(60 * workers);
    let store = shared_store();
    let global_step = GlobalStep::new();

    let mut handles = Vec::new();
    for actor_id in 0..workers {
        let config = config.clone();
        let store = store.clone();
        let global_step = global_step.clone();
        handles.push(thread::spawn(move || {
            let mut learner = ActorLearner::new(
                actor_id,
                config.clone(),
                FeedforwardStrategy::new(TestNet::new(), &config),
                Box::new(ChainEmulator::new(6)),
                store,
                global_step,
                Box::new(NoHooks),
            )
            .unwrap();
            learner.train().unwrap();
            learner.local_step()
        }));
    }

    let local_steps: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // Every learner did some of the work and each checked the cap after its
    // final segment, so the total overshoot is bounded by one segment per
    // learner.
    let total: usize = local_steps.iter().sum();
    assert_eq!(total, global_step.value());
    assert!(global_step.value() >= 60 * workers);
    assert!(global_step.value() <= 60 * workers + workers * config.max_local_steps);
    assert!(local_steps.iter().all(|&steps| steps > 0));

    // All gradient traffic landed in one place and stayed finite.
    let params = store.snapshot();
    assert!(params[0].iter().all(|&p| p < 0.0 && p.is_finite()));
}

#[test]
fn test_episode_lifecycle_reported_through_hooks() {
    struct RecordingHooks {
        episodes: Arc<Mutex<Vec<EpisodeStats>>>,
    }

    impl LearnerHooks for RecordingHooks {
        fn episode_finished(&mut self, stats: &EpisodeStats) {
            self.episodes.lock().unwrap().push(stats.clone());
        }
    }

    let episodes = Arc::new(Mutex::new(Vec::new()));
    let config = test_config(60);
    let mut learner = ActorLearner::new(
        0,
        config.clone(),
        FeedforwardStrategy::new(TestNet::new(), &config),
        Box::new(ChainEmulator::new(6)),
        shared_store(),
        GlobalStep::new(),
        Box::new(RecordingHooks {
            episodes: episodes.clone(),
        }),
    )
    .unwrap();

    learner.train().unwrap();

    let episodes = episodes.lock().unwrap();
    // 60 steps of 6-step episodes: ten episodes, each ending with reward 1.
    assert_eq!(episodes.len(), 10);
    for stats in episodes.iter() {
        assert_eq!(stats.length, 6);
        assert!((stats.reward - 1.0).abs() < 1e-6);
        assert!(stats.mean_entropy > 0.0);
    }
}

#[test]
fn test_store_rejects_foreign_gradient_shapes() {
    let store = shared_store();
    let wrong_shape = vec![ArrayD::<f32>::zeros(IxDyn(&[3]))];
    assert!(store.apply_gradients(&wrong_shape).is_err());

    let wrong_count = vec![
        ArrayD::<f32>::zeros(IxDyn(&PARAM_SHAPE)),
        ArrayD::<f32>::zeros(IxDyn(&PARAM_SHAPE)),
    ];
    assert!(store.apply_gradients(&wrong_count).is_err());
}
