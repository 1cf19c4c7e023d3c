use serde::{Deserialize, Serialize};

use crate::error::{PgqError, Result};

/// Hyperparameters for a PGQ actor-learner.
///
/// The configuration is validated once at construction; learners treat it as
/// read-only afterwards. All learners sharing a parameter store are expected
/// to be built from the same configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PgqConfig {
    /// Capacity of the per-learner replay memory
    pub replay_size: usize,
    /// Weight of the Q-learning objective relative to the policy gradient
    pub pgq_fraction: f32,
    /// Number of transitions sampled per Q-update
    pub batch_update_size: usize,
    /// A Q-update fires every this many rollout iterations
    pub q_update_interval: usize,
    /// Discount factor, in (0, 1)
    pub gamma: f32,
    /// Step cap for a single rollout segment
    pub max_local_steps: usize,
    /// Training stops once the shared step counter reaches this
    pub max_global_steps: usize,
    /// Immediate rewards are clipped to [-reward_clip, reward_clip]
    pub reward_clip: f32,
}

impl Default for PgqConfig {
    fn default() -> Self {
        PgqConfig {
            replay_size: 100_000,
            pgq_fraction: 0.5,
            batch_update_size: 32,
            q_update_interval: 4,
            gamma: 0.99,
            max_local_steps: 5,
            max_global_steps: 80_000_000,
            reward_clip: 1.0,
        }
    }
}

impl PgqConfig {
    /// Check that all fields are mutually consistent.
    pub fn validate(&self) -> Result<()> {
        if self.replay_size == 0 {
            return Err(PgqError::invalid_parameter(
                "replay_size",
                "must be positive",
            ));
        }
        if self.batch_update_size == 0 {
            return Err(PgqError::invalid_parameter(
                "batch_update_size",
                "must be positive",
            ));
        }
        if self.q_update_interval == 0 {
            return Err(PgqError::invalid_parameter(
                "q_update_interval",
                "must be positive",
            ));
        }
        if !(self.gamma > 0.0 && self.gamma < 1.0) {
            return Err(PgqError::invalid_parameter(
                "gamma",
                "must lie in (0, 1)",
            ));
        }
        if self.max_local_steps == 0 {
            return Err(PgqError::invalid_parameter(
                "max_local_steps",
                "must be positive",
            ));
        }
        if !(self.pgq_fraction.is_finite() && self.pgq_fraction >= 0.0) {
            return Err(PgqError::invalid_parameter(
                "pgq_fraction",
                "must be finite and non-negative",
            ));
        }
        if !(self.reward_clip.is_finite() && self.reward_clip > 0.0) {
            return Err(PgqError::invalid_parameter(
                "reward_clip",
                "must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Save the configuration as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Load and validate a configuration from JSON
    pub fn load(path: &str) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder pattern for PgqConfig
pub struct PgqConfigBuilder {
    config: PgqConfig,
}

impl PgqConfigBuilder {
    pub fn new() -> Self {
        PgqConfigBuilder {
            config: PgqConfig::default(),
        }
    }

    pub fn replay_size(mut self, size: usize) -> Self {
        self.config.replay_size = size;
        self
    }

    pub fn pgq_fraction(mut self, fraction: f32) -> Self {
        self.config.pgq_fraction = fraction;
        self
    }

    pub fn batch_update_size(mut self, size: usize) -> Self {
        self.config.batch_update_size = size;
        self
    }

    pub fn q_update_interval(mut self, interval: usize) -> Self {
        self.config.q_update_interval = interval;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn max_local_steps(mut self, steps: usize) -> Self {
        self.config.max_local_steps = steps;
        self
    }

    pub fn max_global_steps(mut self, steps: usize) -> Self {
        self.config.max_global_steps = steps;
        self
    }

    pub fn reward_clip(mut self, clip: f32) -> Self {
        self.config.reward_clip = clip;
        self
    }

    pub fn build(self) -> Result<PgqConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PgqConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PgqConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PgqConfigBuilder::new()
            .replay_size(500)
            .batch_update_size(16)
            .q_update_interval(2)
            .gamma(0.95)
            .max_local_steps(20)
            .max_global_steps(1000)
            .build()
            .unwrap();

        assert_eq!(config.replay_size, 500);
        assert_eq!(config.batch_update_size, 16);
        assert_eq!(config.q_update_interval, 2);
        assert_eq!(config.gamma, 0.95);
    }

    #[test]
    fn test_invalid_gamma_rejected() {
        let result = PgqConfigBuilder::new().gamma(1.0).build();
        assert!(result.is_err());

        let result = PgqConfigBuilder::new().gamma(-0.1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(PgqConfigBuilder::new().q_update_interval(0).build().is_err());
        assert!(PgqConfigBuilder::new().replay_size(0).build().is_err());
        assert!(PgqConfigBuilder::new().max_local_steps(0).build().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pgq.json");
        let path = path.to_str().unwrap();

        let config = PgqConfigBuilder::new()
            .replay_size(123)
            .gamma(0.9)
            .build()
            .unwrap();
        config.save(path).unwrap();

        let loaded = PgqConfig::load(path).unwrap();
        assert_eq!(loaded.replay_size, 123);
        assert_eq!(loaded.gamma, 0.9);
    }
}
