//! Workshop configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Phase};

/// Per-phase worker pool sizes that override the defaults derived from
/// slot and specialized-worker counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<usize>,
}

impl PoolOverrides {
    fn get(&self, phase: Phase) -> Option<usize> {
        match phase {
            Phase::Documentation => self.documentation,
            Phase::Repair => self.repair,
            Phase::Cleaning => self.cleaning,
            Phase::Delivery => self.delivery,
        }
    }

    fn set(&mut self, phase: Phase, size: usize) {
        let slot = match phase {
            Phase::Documentation => &mut self.documentation,
            Phase::Repair => &mut self.repair,
            Phase::Cleaning => &mut self.cleaning,
            Phase::Delivery => &mut self.delivery,
        };
        *slot = Some(size);
    }
}

/// Configuration for one workshop run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    /// Number of cars to push through the pipeline.
    pub num_jobs: usize,
    /// Garage capacity: cars in flight at once.
    pub num_slots: usize,
    /// Mechanics available for the repair phase.
    pub num_specialized_workers: usize,
    /// Explicit pool sizes, per phase.
    pub pool_sizes: PoolOverrides,
    /// Wall-clock length of one service time unit, in milliseconds.
    pub time_unit_ms: u64,
    /// Hold the slot for one more service time after delivery.
    pub delivery_handover: bool,
    /// Seed for the random job generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            num_jobs: 20,
            num_slots: 10,
            num_specialized_workers: 4,
            pool_sizes: PoolOverrides::default(),
            time_unit_ms: 1000,
            delivery_handover: true,
            seed: None,
        }
    }
}

impl WorkshopConfig {
    pub fn new(num_jobs: usize, num_slots: usize, num_specialized_workers: usize) -> Self {
        Self {
            num_jobs,
            num_slots,
            num_specialized_workers,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_jobs(mut self, num_jobs: usize) -> Self {
        self.num_jobs = num_jobs;
        self
    }

    pub fn with_slots(mut self, num_slots: usize) -> Self {
        self.num_slots = num_slots;
        self
    }

    /// Staff the repair phase with `workers` mechanics, replacing any explicit
    /// repair pool size.
    pub fn with_specialized_workers(mut self, workers: usize) -> Self {
        self.num_specialized_workers = workers;
        self.pool_sizes.repair = None;
        self
    }

    /// Override the worker pool size for a single phase.
    pub fn with_pool_size(mut self, phase: Phase, size: usize) -> Self {
        self.pool_sizes.set(phase, size);
        self
    }

    /// Set the service time unit. Resolution is one millisecond: sub-millisecond
    /// parts are dropped and units beyond `u64::MAX` milliseconds saturate.
    pub fn with_time_unit(mut self, unit: Duration) -> Self {
        self.time_unit_ms = u64::try_from(unit.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_delivery_handover(mut self, enabled: bool) -> Self {
        self.delivery_handover = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Worker count for `phase`. Repair is staffed by the specialized workers,
    /// every other phase by one worker per slot.
    pub fn pool_size(&self, phase: Phase) -> usize {
        self.pool_sizes.get(phase).unwrap_or(match phase {
            Phase::Repair => self.num_specialized_workers,
            _ => self.num_slots,
        })
    }

    /// Reject configurations that could never finish.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_jobs == 0 {
            return Err(ConfigError::NoJobs);
        }
        if self.num_slots == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.num_specialized_workers == 0 && self.pool_sizes.repair.is_none() {
            return Err(ConfigError::NoSpecializedWorkers);
        }
        if let Some(phase) = Phase::ALL.into_iter().find(|p| self.pool_size(*p) == 0) {
            return Err(ConfigError::EmptyPool(phase));
        }
        if self.time_unit_ms == 0 {
            return Err(ConfigError::ZeroTimeUnit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pools_follow_slots_and_mechanics() {
        let config = WorkshopConfig::new(20, 10, 4);
        assert_eq!(config.pool_size(Phase::Documentation), 10);
        assert_eq!(config.pool_size(Phase::Repair), 4);
        assert_eq!(config.pool_size(Phase::Cleaning), 10);
        assert_eq!(config.pool_size(Phase::Delivery), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_take_precedence() {
        let config = WorkshopConfig::new(5, 3, 2).with_pool_size(Phase::Cleaning, 1);
        assert_eq!(config.pool_size(Phase::Cleaning), 1);
        assert_eq!(config.pool_size(Phase::Delivery), 3);
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(matches!(
            WorkshopConfig::new(0, 1, 1).validate(),
            Err(ConfigError::NoJobs)
        ));
        assert!(matches!(
            WorkshopConfig::new(1, 0, 1).validate(),
            Err(ConfigError::NoSlots)
        ));
        assert!(matches!(
            WorkshopConfig::new(1, 1, 0).validate(),
            Err(ConfigError::NoSpecializedWorkers)
        ));
        assert!(matches!(
            WorkshopConfig::new(1, 1, 1)
                .with_pool_size(Phase::Delivery, 0)
                .validate(),
            Err(ConfigError::EmptyPool(Phase::Delivery))
        ));
        assert!(matches!(
            WorkshopConfig::new(1, 1, 1)
                .with_time_unit(Duration::ZERO)
                .validate(),
            Err(ConfigError::ZeroTimeUnit)
        ));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = WorkshopConfig::from_json_str(
            r#"{ "num_jobs": 30, "pool_sizes": { "documentation": 2 } }"#,
        )
        .expect("valid config");
        assert_eq!(config.num_jobs, 30);
        assert_eq!(config.num_slots, 10);
        assert_eq!(config.pool_size(Phase::Documentation), 2);
        assert!(config.delivery_handover);
    }

    #[test]
    fn time_unit_has_millisecond_resolution_and_saturates() {
        let config = WorkshopConfig::default().with_time_unit(Duration::from_micros(1500));
        assert_eq!(config.time_unit_ms, 1);
        assert_eq!(config.time_unit(), Duration::from_millis(1));

        let config = WorkshopConfig::default().with_time_unit(Duration::MAX);
        assert_eq!(config.time_unit_ms, u64::MAX);
    }

    #[test]
    fn mechanics_replace_a_repair_override_from_the_file() {
        let config = WorkshopConfig::from_json_str(r#"{ "pool_sizes": { "repair": 7 } }"#)
            .expect("valid config");
        assert_eq!(config.pool_size(Phase::Repair), 7);

        let config = config.with_specialized_workers(2);
        assert_eq!(config.pool_size(Phase::Repair), 2);
        assert_eq!(
            config.with_pool_size(Phase::Repair, 5).pool_size(Phase::Repair),
            5
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            WorkshopConfig::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
