//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::ProjectionError;

/// Seed the reference runs were produced with.
pub const DEFAULT_RNG_SEED: u64 = 76_213_290_821_348_841;

/// How many nearest neighbors seed each instance's layout adjacency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborCount {
    /// One third of the instance count (integer division).
    #[default]
    OneThird,
    /// One fourth of the instance count.
    OneFourth,
    /// One fifth of the instance count.
    OneFifth,
    /// A fixed neighbor count independent of the dataset size.
    Absolute(usize),
}

impl NeighborCount {
    /// Concrete neighbor count for a dataset of `instance_count` rows.
    #[must_use]
    pub fn resolve(self, instance_count: usize) -> usize {
        match self {
            NeighborCount::OneThird => instance_count / 3,
            NeighborCount::OneFourth => instance_count / 4,
            NeighborCount::OneFifth => instance_count / 5,
            NeighborCount::Absolute(count) => count,
        }
    }
}

/// Tunable parameters of a projection run.
///
/// Defaults reproduce the reference schedule: a 1000 x 1000 canvas,
/// temperature cooling from 100, one replication opportunity per step
/// and a fixed setup seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Layout canvas width used for random placement.
    pub width: f64,
    /// Layout canvas height used for random placement.
    pub height: f64,
    /// Cooling start; per-step displacement is capped at the current
    /// temperature.
    pub initial_temperature: f64,
    /// Neighbor count for the initial adjacency graph.
    pub neighbor_count: NeighborCount,
    /// Exponent adjustment of the attraction base term; 1 means
    /// distance-independent attraction.
    pub visual_density_adjustment: f64,
    /// Cap on the data-driven attraction correction, as a fraction of
    /// the base term.
    pub original_data_impact_factor: f64,
    /// Steps between replication opportunities while replication is
    /// active.
    pub replication_interval: usize,
    /// Replaces the pressure-outlier count as the replication budget.
    pub replication_budget_override: Option<usize>,
    /// Neighborhood size of the trustworthiness evaluator.
    pub evaluation_neighborhood_size: usize,
    /// Fork-join width of the force passes and the evaluator. Results
    /// are identical for every worker count.
    pub worker_threads: usize,
    /// Record full remapped adjacency in every snapshot instead of
    /// positions only.
    pub retain_snapshot_edges: bool,
    /// Seed for the setup-time random placement.
    pub rng_seed: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            initial_temperature: 100.0,
            neighbor_count: NeighborCount::default(),
            visual_density_adjustment: 0.9,
            original_data_impact_factor: 0.5,
            replication_interval: 1,
            replication_budget_override: None,
            evaluation_neighborhood_size: 10,
            worker_threads: default_worker_threads(),
            retain_snapshot_edges: false,
            rng_seed: DEFAULT_RNG_SEED,
        }
    }
}

impl ProjectionConfig {
    /// Checks invariants the engine depends on.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(ProjectionError::InvalidConfig("width must be positive and finite"));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(ProjectionError::InvalidConfig("height must be positive and finite"));
        }
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(ProjectionError::InvalidConfig(
                "initial_temperature must be positive and finite",
            ));
        }
        if !(self.visual_density_adjustment > 0.0 && self.visual_density_adjustment <= 1.0) {
            return Err(ProjectionError::InvalidConfig(
                "visual_density_adjustment must be in (0, 1]",
            ));
        }
        if !(self.original_data_impact_factor.is_finite() && self.original_data_impact_factor >= 0.0)
        {
            return Err(ProjectionError::InvalidConfig(
                "original_data_impact_factor must be non-negative and finite",
            ));
        }
        if self.replication_interval == 0 {
            return Err(ProjectionError::InvalidConfig(
                "replication_interval must be at least 1",
            ));
        }
        if self.evaluation_neighborhood_size == 0 {
            return Err(ProjectionError::InvalidConfig(
                "evaluation_neighborhood_size must be at least 1",
            ));
        }
        if self.worker_threads == 0 {
            return Err(ProjectionError::InvalidConfig("worker_threads must be at least 1"));
        }
        if self.neighbor_count == NeighborCount::Absolute(0) {
            return Err(ProjectionError::InvalidConfig("neighbor count must be at least 1"));
        }
        Ok(())
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ProjectionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.worker_threads >= 1);
        assert_eq!(config.rng_seed, DEFAULT_RNG_SEED);
    }

    #[test]
    fn neighbor_count_resolution() {
        assert_eq!(NeighborCount::OneThird.resolve(100), 33);
        assert_eq!(NeighborCount::OneFourth.resolve(100), 25);
        assert_eq!(NeighborCount::OneFifth.resolve(102), 20);
        assert_eq!(NeighborCount::Absolute(7).resolve(100), 7);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = ProjectionConfig::default();
        config.width = 0.0;
        assert!(config.validate().is_err());

        let mut config = ProjectionConfig::default();
        config.visual_density_adjustment = 1.5;
        assert!(config.validate().is_err());

        let mut config = ProjectionConfig::default();
        config.replication_interval = 0;
        assert!(config.validate().is_err());

        let mut config = ProjectionConfig::default();
        config.worker_threads = 0;
        assert!(config.validate().is_err());

        let mut config = ProjectionConfig::default();
        config.neighbor_count = NeighborCount::Absolute(0);
        assert!(config.validate().is_err());
    }
}
