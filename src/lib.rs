//! # PGQ - Asynchronous Policy-Gradient Q-Learning
//!
//! PGQ is a Rust library for asynchronous reinforcement learning that combines
//! on-policy actor-critic rollouts with off-policy Q-learning from replayed
//! experience. Many actor-learners run in parallel, each interleaving short
//! policy-gradient segments with periodic Q-updates, and all of them share
//! gradients through a common parameter store.
//!
//! ## Key Features
//!
//! - **Combined objective**: A3C-style rollout updates plus a Q-learning
//!   correction derived from the entropy-regularized policy
//! - **Asynchronous training**: lock-free global step counting and a shared
//!   parameter store designed for many concurrent learners
//! - **Feedforward and recurrent policies**: one rollout driver, two
//!   interchangeable strategies that differ only in how recurrent state is
//!   threaded through the steps
//! - **Per-learner replay**: fixed-capacity ring memory with successor
//!   reconstruction, so each stored step costs a single state copy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use pgq::config::PgqConfigBuilder;
//! use pgq::learner::{ActorLearner, FeedforwardStrategy, NoHooks};
//! use pgq::shared::{GlobalStep, InMemoryStore};
//!
//! let config = PgqConfigBuilder::new()
//!     .max_global_steps(1_000_000)
//!     .q_update_interval(4)
//!     .build()?;
//!
//! let store = Arc::new(InMemoryStore::new(initial_params, 1e-4));
//! let global_step = GlobalStep::new();
//!
//! let mut learner = ActorLearner::new(
//!     0,
//!     config,
//!     FeedforwardStrategy::new(net, &config),
//!     Box::new(emulator),
//!     store,
//!     global_step,
//!     Box::new(NoHooks),
//! )?;
//! learner.train()?;
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Hyperparameters, validation, and JSON persistence
//! - [`emulator`] - Environment interface the learners step against
//! - [`error`] - Error types and result handling
//! - [`gradient`] - Gradient sets and clipping policies
//! - [`learner`] - The rollout driver and its strategy variants
//! - [`network`] - Collaborator traits for the policy/value network
//! - [`q_update`] - The off-policy Q-learning objective
//! - [`replay_memory`] - Per-learner experience replay
//! - [`scheduler`] - Q-update cadence
//! - [`shared`] - Parameter store and global step counter

pub mod config;
pub mod emulator;
pub mod error;
pub mod gradient;
pub mod learner;
pub mod network;
pub mod q_update;
pub mod replay_memory;
pub mod scheduler;
pub mod shared;
