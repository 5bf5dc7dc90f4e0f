//! Force-directed multi-point projection engine.
//!
//! The engine lays a dataset out on a 2D canvas with a modified
//! Fruchterman-Reingold scheme, then improves reliability by letting
//! overloaded points split into replicas:
//!
//! 1. **Warmup** (steps 0-499): plain repulsion/attraction refinement.
//! 2. **Replication window** (steps 500-950): the layout's bounding box
//!    is frozen, per-point directional pressure is tracked across 36
//!    angle bins, a replication budget is sized from pressure outliers,
//!    and each step the most pressured point is marked ineffective
//!    (gray) while the budget lasts.
//! 3. **Freeze replay** (rewind to step 510): marked points are released
//!    and every other point is frozen, letting the gray points find
//!    their pressure directions undisturbed.
//! 4. **Expansion replay** (rewind to step 510 again): every gray point
//!    splits into two replicas along its strongest antipodal pressure
//!    pair, and the layout anneals to the end of the schedule.
//!
//! Every iteration is recorded as a [`ProjectionStep`] with both
//! trustworthiness scores, so callers can pick the best layout rather
//! than the last one.
//!
//! Force passes fork-join across a fixed worker count, partitioning
//! instances by index modulo the worker count; per-point contributions
//! are accumulated worker-locally in a fixed order and applied
//! single-threaded, so runs are bit-identical for every worker count.

mod config;
mod output;

pub use config::{DEFAULT_RNG_SEED, NeighborCount, ProjectionConfig};
pub use output::{ProjectionOutput, ProjectionStep};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use redgray_core::points::bin_direction;
use redgray_core::{ANGLE_BINS, Bounds, InstanceSet, PointSet};
use redgray_metrics::{Layer, TrustworthinessEvaluator};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Nominal schedule length; replays rewind within it.
pub const NOMINAL_STEPS: usize = 1000;

/// Iterations a full run executes: 951 for the first pass, 390 for the
/// freeze replay and 489 for the expansion replay.
pub const TOTAL_ITERATIONS: usize = 1830;

const EPSILON: f64 = 1e-9;
const FREEZE_STEP: usize = 500;
const BUDGET_STEP: usize = 501;
const REPLAY_REWIND_STEP: usize = 510;
const FREEZE_REPLAY_TRIGGER: usize = 950;
const EXPANSION_REPLAY_TRIGGER: usize = 900;
const FROZEN_REGION_MARGIN: f64 = 0.05;

/// Errors raised by the engine boundary.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("dataset contains no instances")]
    EmptyDataset,
    #[error("non-finite coordinate recorded at step {label}")]
    NonFiniteCoordinate { label: String },
}

/// Position in the fixed projection schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Force refinement before any replication bookkeeping.
    Warmup,
    /// First pass with pressure tracking and candidate marking.
    ReplicationActive,
    /// Replay with marked points released and all others frozen.
    FreezeReplay,
    /// Final replay after gray points split into replicas.
    ExpansionReplay,
    /// Schedule exhausted; `advance` is a no-op.
    Done,
}

impl Phase {
    /// True once the step-500 transition has happened.
    #[must_use]
    pub fn replication_started(self) -> bool {
        !matches!(self, Phase::Warmup)
    }
}

/// Worker-local force and pressure sums for one point.
#[derive(Clone)]
struct ForceAccumulator {
    delta_x: f64,
    delta_y: f64,
    positive: [f64; ANGLE_BINS],
    negative: [f64; ANGLE_BINS],
}

impl ForceAccumulator {
    fn zeroed() -> Self {
        Self {
            delta_x: 0.0,
            delta_y: 0.0,
            positive: [0.0; ANGLE_BINS],
            negative: [0.0; ANGLE_BINS],
        }
    }

    /// Projects a force vector onto every angle bin, splitting by sign.
    fn accumulate_pressure(&mut self, fx: f64, fy: f64, cos: &[f64; ANGLE_BINS], sin: &[f64; ANGLE_BINS]) {
        for bin in 0..ANGLE_BINS {
            let projected = cos[bin] * fx + sin[bin] * fy;
            if projected > 0.0 {
                self.positive[bin] += projected;
            } else {
                self.negative[bin] += -projected;
            }
        }
    }
}

/// The projection engine. Construct with [`ProjectionEngine::new`],
/// then either [`run`](ProjectionEngine::run) the whole schedule or
/// [`advance`](ProjectionEngine::advance) step by step.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    config: ProjectionConfig,
    dataset: InstanceSet,
    points: PointSet,
    phase: Phase,
    /// Schedule position; rewound by the replay transitions.
    step: usize,
    /// Iterations executed so far; never rewound.
    iteration: usize,
    temperature: f64,
    replication_budget: usize,
    budget_assigned: bool,
    frozen_region: Option<Bounds>,
    ideal_distance: f64,
    ideal_distance_squared: f64,
    max_original_distance: f64,
    max_visual_distance: f64,
    angle_cos: [f64; ANGLE_BINS],
    angle_sin: [f64; ANGLE_BINS],
}

impl ProjectionEngine {
    /// Builds the neighbor graph, places one point per instance at a
    /// seeded random position and wires the initial adjacency.
    pub fn new(mut dataset: InstanceSet, config: ProjectionConfig) -> Result<Self, ProjectionError> {
        config.validate()?;
        if dataset.is_empty() {
            return Err(ProjectionError::EmptyDataset);
        }
        let neighbor_count = config.neighbor_count.resolve(dataset.len());
        if neighbor_count == 0 {
            return Err(ProjectionError::InvalidConfig(
                "neighbor count resolves to zero for this dataset",
            ));
        }
        dataset.compute_neighbors(neighbor_count);

        let mut rng = SmallRng::seed_from_u64(config.rng_seed);
        let mut points = PointSet::new(dataset.len());
        for instance in 0..dataset.len() {
            let x = rng.random::<f64>() * config.width;
            let y = rng.random::<f64>() * config.height;
            points.push_point(instance, x, y);
        }
        for instance in 0..dataset.len() {
            let adjacency: Vec<usize> = dataset
                .instance(instance)
                .neighbors()
                .iter()
                .map(|&neighbor| points.instance_points(neighbor)[0])
                .collect();
            let own = points.instance_points(instance)[0];
            points.point_mut(own).neighbors = adjacency;
        }

        let ideal_distance = (config.width * config.height / dataset.len() as f64).sqrt();
        let max_original_distance = dataset.max_distance();
        let max_visual_distance = points.max_distance();
        let mut angle_cos = [0.0; ANGLE_BINS];
        let mut angle_sin = [0.0; ANGLE_BINS];
        for bin in 0..ANGLE_BINS {
            let (cos, sin) = bin_direction(bin);
            angle_cos[bin] = cos;
            angle_sin[bin] = sin;
        }

        Ok(Self {
            temperature: config.initial_temperature,
            config,
            dataset,
            points,
            phase: Phase::Warmup,
            step: 0,
            iteration: 0,
            replication_budget: 1,
            budget_assigned: false,
            frozen_region: None,
            ideal_distance,
            ideal_distance_squared: ideal_distance * ideal_distance,
            max_original_distance,
            max_visual_distance,
            angle_cos,
            angle_sin,
        })
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current schedule position (rewound during replays).
    #[must_use]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Iterations executed so far.
    #[must_use]
    pub fn iterations_completed(&self) -> usize {
        self.iteration
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    #[must_use]
    pub fn replication_budget(&self) -> usize {
        self.replication_budget
    }

    #[must_use]
    pub fn frozen_region(&self) -> Option<Bounds> {
        self.frozen_region
    }

    #[must_use]
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    #[must_use]
    pub fn dataset(&self) -> &InstanceSet {
        &self.dataset
    }

    #[must_use]
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Runs the remaining schedule, recording every iteration plus the
    /// initial layout.
    pub fn run(&mut self) -> ProjectionOutput {
        info!(
            instances = self.dataset.len(),
            workers = self.config.worker_threads,
            "starting projection run"
        );
        let mut steps = Vec::with_capacity(TOTAL_ITERATIONS + 1);
        steps.push(self.record_step("Initial random"));
        while self.phase != Phase::Done {
            self.advance();
            steps.push(self.record_step(&self.iteration.to_string()));
        }
        ProjectionOutput::new("Red Gray Plus projection", steps)
    }

    /// Executes one iteration: the three force passes, candidate
    /// selection, displacement and the schedule transitions.
    pub fn advance(&mut self) {
        if self.phase == Phase::Done {
            return;
        }
        if self.iteration % 100 == 0 {
            debug!(
                iteration = self.iteration + 1,
                total = TOTAL_ITERATIONS,
                step = self.step,
                phase = ?self.phase,
                "projection progress"
            );
        }
        let track = self.phase.replication_started()
            && self.step % self.config.replication_interval == 0;

        self.repulsion_pass(track);
        self.attraction_source_pass(track);
        self.attraction_target_pass(track);
        let candidate = if track && self.replication_budget > 0 {
            self.select_candidate()
        } else {
            None
        };
        self.displacement_pass();

        if self.step == BUDGET_STEP && !self.budget_assigned {
            self.budget_assigned = true;
            self.replication_budget = self
                .config
                .replication_budget_override
                .unwrap_or_else(|| self.points.pressure_outlier_count());
            info!(budget = self.replication_budget, "replication budget assigned");
        } else if let Some((pid, bin)) = candidate {
            self.points.point_mut(pid).set_ineffective(true);
            self.replication_budget -= 1;
            debug!(
                point = pid,
                bin,
                remaining = self.replication_budget,
                "replication candidate marked"
            );
        }

        if self.step == FREEZE_STEP && self.phase == Phase::Warmup {
            self.phase = Phase::ReplicationActive;
            self.frozen_region = self
                .points
                .containing_box()
                .map(|bounds| bounds.expanded(FROZEN_REGION_MARGIN));
            info!(region = ?self.frozen_region, "replication window opened");
        }

        if self.step == FREEZE_REPLAY_TRIGGER && self.phase == Phase::ReplicationActive {
            self.phase = Phase::FreezeReplay;
            self.step = REPLAY_REWIND_STEP;
            let mut released = 0usize;
            for id in self.points.instance_major_ids() {
                if self.points.point(id).ineffective() {
                    self.points.point_mut(id).set_ineffective(false);
                    released += 1;
                } else {
                    self.points.point_mut(id).set_frozen(true);
                }
            }
            info!(released, "freeze replay started");
        }

        if self.step == EXPANSION_REPLAY_TRIGGER && self.phase == Phase::FreezeReplay {
            self.phase = Phase::ExpansionReplay;
            self.step = REPLAY_REWIND_STEP;
            let mut replicas = 0usize;
            let mut failures = 0usize;
            for instance in 0..self.points.instance_count() {
                let ids = self.points.instance_points(instance).to_vec();
                for id in ids {
                    if self.points.point(id).gray() {
                        match self.points.replicate_by_angles(id) {
                            Some(_) => replicas += 1,
                            None => failures += 1,
                        }
                    }
                }
            }
            info!(replicas, failures, "expansion replay started");
        }

        self.temperature = self.config.initial_temperature
            * (1.0 - (self.step as f64 + 1.0) / NOMINAL_STEPS as f64);
        self.step += 1;
        self.iteration += 1;

        if self.step == NOMINAL_STEPS && self.phase == Phase::ExpansionReplay {
            self.phase = Phase::Done;
            info!(iterations = self.iteration, "projection schedule complete");
        }
    }

    /// Scores and snapshots the current layout.
    fn record_step(&self, label: &str) -> ProjectionStep {
        let evaluator = TrustworthinessEvaluator::new(self.config.evaluation_neighborhood_size);
        let workers = self.config.worker_threads;
        ProjectionStep {
            label: label.to_string(),
            red_and_gray_trustworthiness: evaluator.evaluate_partitioned(
                &self.dataset,
                &self.points,
                Layer::RedAndGray,
                workers,
            ),
            red_trustworthiness: evaluator.evaluate_partitioned(
                &self.dataset,
                &self.points,
                Layer::RedOnly,
                workers,
            ),
            points: self.points.snapshot(self.config.retain_snapshot_edges),
        }
    }

    /// All-pairs repulsion. Assigns (rather than adds) each point's
    /// accumulators, which doubles as the per-step reset.
    fn repulsion_pass(&mut self, track: bool) {
        let workers = self.config.worker_threads;
        let stripes = self.compute_stripes(workers, |this, stripe| {
            this.repulsion_stripe(stripe, workers, track)
        });
        for (stripe, accumulators) in stripes.iter().enumerate() {
            for pid in 0..self.points.len() {
                if self.points.point(pid).instance() % workers != stripe {
                    continue;
                }
                let acc = &accumulators[pid];
                let point = self.points.point_mut(pid);
                point.additional_x = acc.delta_x;
                point.additional_y = acc.delta_y;
                point.positive_pressure = acc.positive;
                point.negative_pressure = acc.negative;
            }
        }
    }

    /// Attraction contributions to edge sources, striped by source
    /// instance.
    fn attraction_source_pass(&mut self, track: bool) {
        let workers = self.config.worker_threads;
        let stripes = self.compute_stripes(workers, |this, stripe| {
            this.attraction_source_stripe(stripe, workers, track)
        });
        self.apply_additive(&stripes, workers);
    }

    /// Attraction contributions to edge targets. Every worker walks the
    /// sources in global order and keeps only edges whose target
    /// instance falls in its stripe, so per-target accumulation order is
    /// independent of the worker count.
    fn attraction_target_pass(&mut self, track: bool) {
        let workers = self.config.worker_threads;
        let stripes = self.compute_stripes(workers, |this, stripe| {
            this.attraction_target_stripe(stripe, workers, track)
        });
        self.apply_additive(&stripes, workers);
    }

    fn compute_stripes<F>(&self, workers: usize, compute: F) -> Vec<Vec<ForceAccumulator>>
    where
        F: Fn(&Self, usize) -> Vec<ForceAccumulator> + Sync,
    {
        let this = &*self;
        if workers == 1 {
            vec![compute(this, 0)]
        } else {
            (0..workers)
                .into_par_iter()
                .map(|stripe| compute(this, stripe))
                .collect()
        }
    }

    fn apply_additive(&mut self, stripes: &[Vec<ForceAccumulator>], workers: usize) {
        for (stripe, accumulators) in stripes.iter().enumerate() {
            for pid in 0..self.points.len() {
                if self.points.point(pid).instance() % workers != stripe {
                    continue;
                }
                let acc = &accumulators[pid];
                let point = self.points.point_mut(pid);
                point.additional_x += acc.delta_x;
                point.additional_y += acc.delta_y;
                for bin in 0..ANGLE_BINS {
                    point.positive_pressure[bin] += acc.positive[bin];
                    point.negative_pressure[bin] += acc.negative[bin];
                }
            }
        }
    }

    fn repulsion_stripe(&self, stripe: usize, workers: usize, track: bool) -> Vec<ForceAccumulator> {
        let mut accumulators = vec![ForceAccumulator::zeroed(); self.points.len()];
        for instance in (stripe..self.points.instance_count()).step_by(workers) {
            for &pid in self.points.instance_points(instance) {
                let p1 = self.points.point(pid);
                if p1.ineffective() {
                    continue;
                }
                let acc = &mut accumulators[pid];
                for other in 0..self.points.instance_count() {
                    for &qid in self.points.instance_points(other) {
                        if qid == pid {
                            continue;
                        }
                        let p2 = self.points.point(qid);
                        if p2.ineffective() {
                            continue;
                        }
                        let dx = p1.x - p2.x;
                        let dy = p1.y - p2.y;
                        let size = (dx * dx + dy * dy).sqrt().max(EPSILON);
                        let force = self.ideal_distance_squared / size;
                        let fx = dx / size * force;
                        let fy = dy / size * force;
                        if track {
                            acc.accumulate_pressure(fx, fy, &self.angle_cos, &self.angle_sin);
                        }
                        acc.delta_x += fx;
                        acc.delta_y += fy;
                    }
                }
            }
        }
        accumulators
    }

    fn attraction_source_stripe(
        &self,
        stripe: usize,
        workers: usize,
        track: bool,
    ) -> Vec<ForceAccumulator> {
        let mut accumulators = vec![ForceAccumulator::zeroed(); self.points.len()];
        for instance in (stripe..self.points.instance_count()).step_by(workers) {
            for &pid in self.points.instance_points(instance) {
                for &qid in &self.points.point(pid).neighbors {
                    if self.points.point(pid).ineffective() || self.points.point(qid).ineffective()
                    {
                        continue;
                    }
                    let (push_x, push_y) = self.edge_force(pid, qid);
                    let acc = &mut accumulators[pid];
                    if track {
                        acc.accumulate_pressure(-push_x, -push_y, &self.angle_cos, &self.angle_sin);
                    }
                    let weight = self.points.point(pid).effective_weight;
                    acc.delta_x -= push_x * weight;
                    acc.delta_y -= push_y * weight;
                }
            }
        }
        accumulators
    }

    fn attraction_target_stripe(
        &self,
        stripe: usize,
        workers: usize,
        track: bool,
    ) -> Vec<ForceAccumulator> {
        let mut accumulators = vec![ForceAccumulator::zeroed(); self.points.len()];
        for instance in 0..self.points.instance_count() {
            for &pid in self.points.instance_points(instance) {
                for &qid in &self.points.point(pid).neighbors {
                    if self.points.point(qid).instance() % workers != stripe {
                        continue;
                    }
                    if self.points.point(pid).ineffective() || self.points.point(qid).ineffective()
                    {
                        continue;
                    }
                    let (push_x, push_y) = self.edge_force(pid, qid);
                    let acc = &mut accumulators[qid];
                    if track {
                        acc.accumulate_pressure(push_x, push_y, &self.angle_cos, &self.angle_sin);
                    }
                    let weight = self.points.point(qid).effective_weight;
                    acc.delta_x += push_x * weight;
                    acc.delta_y += push_y * weight;
                }
            }
        }
        accumulators
    }

    /// Attraction along one edge, as the push applied to the target;
    /// the source receives the negation. The base term follows the
    /// visual distance, the correction term pulls toward the original
    /// data distance and is capped at a fraction of the base.
    fn edge_force(&self, pid: usize, qid: usize) -> (f64, f64) {
        let p1 = self.points.point(pid);
        let p2 = self.points.point(qid);
        let dx = p1.x - p2.x;
        let dy = p1.y - p2.y;
        let size = (dx * dx + dy * dy).sqrt().max(EPSILON);
        let base = (size / self.ideal_distance).powf(1.0 - self.config.visual_density_adjustment);
        let original =
            self.dataset.distance(p1.instance(), p2.instance()) / self.max_original_distance;
        let limit = base.abs() * self.config.original_data_impact_factor;
        let correction = (original - size / self.max_visual_distance).clamp(-limit, limit);
        let force = base + correction;
        (dx / size * force, dy / size * force)
    }

    /// Picks the point and angle bin with the strongest replication
    /// pressure, seeded by the first non-failed, non-gray point at bin 0
    /// and upgraded only on strictly greater pressure.
    fn select_candidate(&self) -> Option<(usize, usize)> {
        let mut candidate: Option<(usize, usize)> = None;
        for instance in 0..self.points.instance_count() {
            for &pid in self.points.instance_points(instance) {
                let point = self.points.point(pid);
                if point.replication_failed() || point.gray() {
                    continue;
                }
                for bin in 0..ANGLE_BINS {
                    match candidate {
                        None => candidate = Some((pid, bin)),
                        Some((best_pid, best_bin)) => {
                            if self.points.replication_pressure(pid, bin)
                                > self.points.replication_pressure(best_pid, best_bin)
                            {
                                candidate = Some((pid, bin));
                            }
                        }
                    }
                }
            }
        }
        candidate
    }

    /// Moves every unfrozen point along its accumulated force, capped
    /// by the temperature and clamped into the frozen region once
    /// replication has started.
    fn displacement_pass(&mut self) {
        let temperature = self.temperature;
        let clamp_region = if self.phase.replication_started() {
            self.frozen_region
        } else {
            None
        };
        for pid in 0..self.points.len() {
            let point = self.points.point_mut(pid);
            let size =
                (point.additional_x * point.additional_x + point.additional_y * point.additional_y)
                    .sqrt();
            if size > EPSILON && !point.frozen() {
                let travel = size.min(temperature);
                point.x += point.additional_x / size * travel;
                point.y += point.additional_y / size * travel;
                if let Some(region) = clamp_region {
                    let (x, y) = region.clamp(point.x, point.y);
                    point.x = x;
                    point.y = y;
                }
            }
        }
    }
}
