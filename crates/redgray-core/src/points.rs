//! Projected-point arena: positions, force accumulators, directional
//! pressure bins, status flags and angle-based replication.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of directional pressure bins per point (one every 10 degrees).
pub const ANGLE_BINS: usize = 36;

/// Outliers sit more than this many standard deviations from the mean.
const OUTLIER_DEVIATIONS: f64 = 1.2;

/// Unit direction of pressure bin `bin`.
#[must_use]
pub fn bin_direction(bin: usize) -> (f64, f64) {
    let angle = bin as f64 * PI / (ANGLE_BINS as f64 / 2.0);
    (angle.cos(), angle.sin())
}

/// Axis-aligned rectangle in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Tight bounds of a coordinate stream, `None` if it is empty.
    pub fn from_coordinates(coords: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for (x, y) in coords {
            match &mut bounds {
                None => {
                    bounds = Some(Bounds {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    });
                }
                Some(b) => {
                    b.min_x = b.min_x.min(x);
                    b.min_y = b.min_y.min(y);
                    b.max_x = b.max_x.max(x);
                    b.max_y = b.max_y.max(y);
                }
            }
        }
        bounds
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Grows the rectangle by `fraction` of its extent on every side.
    #[must_use]
    pub fn expanded(&self, fraction: f64) -> Self {
        let grow_x = self.width() * fraction;
        let grow_y = self.height() * fraction;
        Self {
            min_x: self.min_x - grow_x,
            min_y: self.min_y - grow_y,
            max_x: self.max_x + grow_x,
            max_y: self.max_y + grow_y,
        }
    }

    /// Clamps a coordinate into the rectangle.
    #[must_use]
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(self.min_x, self.max_x), y.clamp(self.min_y, self.max_y))
    }
}

/// One 2D point projecting an instance.
///
/// Position, per-step force accumulators, pressure bins, adjacency and
/// the effective weight are plain public state driven by the engine;
/// the status flags are method-gated because gray and replication
/// failure are permanent once set.
#[derive(Debug, Clone)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    /// Net force accumulated during the current step, applied as
    /// displacement at the end of the step.
    pub additional_x: f64,
    pub additional_y: f64,
    /// Point indices this point attracts and is attracted by.
    pub neighbors: Vec<usize>,
    /// Attraction weight, redistributed across replicas at each split.
    pub effective_weight: f64,
    pub positive_pressure: [f64; ANGLE_BINS],
    pub negative_pressure: [f64; ANGLE_BINS],
    instance: usize,
    projection_index: usize,
    frozen: bool,
    ineffective: bool,
    gray: bool,
    replication_failed: bool,
}

impl ProjectedPoint {
    fn new(x: f64, y: f64, instance: usize, projection_index: usize) -> Self {
        Self {
            x,
            y,
            additional_x: 0.0,
            additional_y: 0.0,
            neighbors: Vec::new(),
            effective_weight: 1.0,
            positive_pressure: [0.0; ANGLE_BINS],
            negative_pressure: [0.0; ANGLE_BINS],
            instance,
            projection_index,
            frozen: false,
            ineffective: false,
            gray: false,
            replication_failed: false,
        }
    }

    /// Copy used by replication: inherits pressures and status, starts
    /// unfrozen at the given position with a fresh neighbor list and
    /// unit weight.
    fn replica(&self, x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            additional_x: 0.0,
            additional_y: 0.0,
            neighbors: Vec::new(),
            effective_weight: 1.0,
            positive_pressure: self.positive_pressure,
            negative_pressure: self.negative_pressure,
            instance: self.instance,
            projection_index: self.projection_index + 1,
            frozen: false,
            ineffective: self.ineffective,
            gray: self.gray,
            replication_failed: self.replication_failed,
        }
    }

    /// Index of the instance this point projects.
    #[must_use]
    pub fn instance(&self) -> usize {
        self.instance
    }

    /// Ordinal of this point among its instance's points.
    #[must_use]
    pub fn projection_index(&self) -> usize {
        self.projection_index
    }

    #[must_use]
    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Whether the point is currently excluded from force passes.
    #[must_use]
    pub fn ineffective(&self) -> bool {
        self.ineffective
    }

    /// Marking a point ineffective also marks it gray; gray never clears,
    /// even when the point is made effective again.
    pub fn set_ineffective(&mut self, ineffective: bool) {
        self.ineffective = ineffective;
        if ineffective {
            self.gray = true;
        }
    }

    #[must_use]
    pub fn gray(&self) -> bool {
        self.gray
    }

    #[must_use]
    pub fn replication_failed(&self) -> bool {
        self.replication_failed
    }

    pub fn mark_replication_failed(&mut self) {
        self.replication_failed = true;
    }

    /// Adds a signed force component to the bin: positive magnitudes go
    /// to the positive accumulator, negative ones (negated) to the
    /// negative accumulator.
    #[inline]
    pub fn accumulate_pressure(&mut self, bin: usize, value: f64) {
        if value > 0.0 {
            self.positive_pressure[bin] += value;
        } else {
            self.negative_pressure[bin] += -value;
        }
    }

    /// Zeroes both pressure accumulators.
    pub fn reset_pressures(&mut self) {
        self.positive_pressure = [0.0; ANGLE_BINS];
        self.negative_pressure = [0.0; ANGLE_BINS];
    }

    /// Largest combined pressure across all bins.
    #[must_use]
    pub fn max_replication_pressure(&self) -> f64 {
        let mut max = 0.0_f64;
        for bin in 0..ANGLE_BINS {
            max = max.max(self.positive_pressure[bin] + self.negative_pressure[bin]);
        }
        max
    }

    #[must_use]
    pub fn distance_to(&self, other: &ProjectedPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Lightweight copy of one point for recorded steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSnapshot {
    pub instance: usize,
    pub x: f64,
    pub y: f64,
    pub gray: bool,
    /// Indices into the snapshot vector; empty unless edge retention was
    /// requested.
    pub neighbors: Vec<usize>,
}

/// Append-only arena of projected points with a per-instance index.
///
/// Every instance owns one point after setup and at most two after
/// replication. Point indices are stable; replication only appends.
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<ProjectedPoint>,
    instance_points: Vec<Vec<usize>>,
}

impl PointSet {
    /// Creates an empty arena tracking `instance_count` instances.
    #[must_use]
    pub fn new(instance_count: usize) -> Self {
        Self {
            points: Vec::with_capacity(instance_count),
            instance_points: vec![Vec::new(); instance_count],
        }
    }

    /// Appends a point for `instance` and returns its index.
    pub fn push_point(&mut self, instance: usize, x: f64, y: f64) -> usize {
        let id = self.points.len();
        let projection_index = self.instance_points[instance].len();
        self.points.push(ProjectedPoint::new(x, y, instance, projection_index));
        self.instance_points[instance].push(id);
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instance_points.len()
    }

    #[must_use]
    pub fn point(&self, id: usize) -> &ProjectedPoint {
        &self.points[id]
    }

    #[must_use]
    pub fn point_mut(&mut self, id: usize) -> &mut ProjectedPoint {
        &mut self.points[id]
    }

    /// Point indices owned by `instance`, in creation order.
    #[must_use]
    pub fn instance_points(&self, instance: usize) -> &[usize] {
        &self.instance_points[instance]
    }

    /// All point indices grouped by instance, instances ascending. This
    /// is the canonical iteration and snapshot order.
    #[must_use]
    pub fn instance_major_ids(&self) -> Vec<usize> {
        self.instance_points.iter().flatten().copied().collect()
    }

    #[must_use]
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.points[a].distance_to(&self.points[b])
    }

    /// Pressure a point reports when competing for replication: the
    /// combined pressure of `bin`, or -1 when its instance already has
    /// more than one point (replicated instances never compete again).
    #[must_use]
    pub fn replication_pressure(&self, id: usize, bin: usize) -> f64 {
        let point = &self.points[id];
        if self.instance_points[point.instance].len() > 1 {
            return -1.0;
        }
        point.positive_pressure[bin] + point.negative_pressure[bin]
    }

    /// Tight bounding box of all points, `None` while the arena is empty.
    #[must_use]
    pub fn containing_box(&self) -> Option<Bounds> {
        Bounds::from_coordinates(self.points.iter().map(|p| (p.x, p.y)))
    }

    /// Largest pairwise point distance.
    #[must_use]
    pub fn max_distance(&self) -> f64 {
        let mut max = 0.0_f64;
        for i in 0..self.points.len() {
            for j in (i + 1)..self.points.len() {
                max = max.max(self.points[i].distance_to(&self.points[j]));
            }
        }
        max
    }

    /// Number of points whose maximum pressure deviates from the mean by
    /// more than 1.2 standard deviations, capped at a quarter of the
    /// instance count. Used to size the replication budget.
    #[must_use]
    pub fn pressure_outlier_count(&self) -> usize {
        let n = self.points.len();
        if n < 2 {
            return 0;
        }
        let values: Vec<f64> = self.points.iter().map(ProjectedPoint::max_replication_pressure).collect();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64;
        let threshold = OUTLIER_DEVIATIONS * variance.sqrt();
        let outliers = values.iter().filter(|v| (*v - mean).abs() > threshold).count();
        outliers.min(self.instance_count() / 4)
    }

    /// Rescales all points so the containing box maps onto a
    /// `width` x `height` rectangle anchored at the origin. With
    /// `uniform` set, both axes share the smaller scale factor.
    pub fn normalize_to_size(&mut self, width: f64, height: f64, uniform: bool) {
        let Some(bounds) = self.containing_box() else {
            return;
        };
        let (scale_x, scale_y) = normalization_scales(&bounds, width, height, uniform);
        for point in &mut self.points {
            point.x = (point.x - bounds.min_x) * scale_x;
            point.y = (point.y - bounds.min_y) * scale_y;
        }
    }

    /// Splits a point in two along its strongest antipodal pressure pair.
    ///
    /// The point's neighbors are partitioned by the two opposite
    /// directions; the replica takes the second partition (starting at
    /// its centroid), then neighbors of the first partition that ended
    /// up closer to the replica migrate over, the replica's neighbors
    /// are rewired to it, and the original weight is redistributed
    /// proportionally to the pre-split degree.
    ///
    /// Returns the replica's index, or `None` (and permanently flags the
    /// point) when no bin pair carries positive negative pressure or one
    /// of the partitions is empty.
    pub fn replicate_by_angles(&mut self, id: usize) -> Option<usize> {
        let mut best_bin = None;
        let mut max_sum = 0.0;
        for bin in 0..ANGLE_BINS {
            let opposite = (bin + ANGLE_BINS / 2) % ANGLE_BINS;
            let sum = self.points[id].negative_pressure[bin]
                + self.points[id].negative_pressure[opposite];
            if sum > max_sum {
                max_sum = sum;
                best_bin = Some(bin);
            }
        }
        let Some(bin) = best_bin else {
            self.points[id].mark_replication_failed();
            return None;
        };

        let (origin_x, origin_y) = (self.points[id].x, self.points[id].y);
        let neighbors = self.points[id].neighbors.clone();
        let on_side = |dir: (f64, f64), nid: usize| {
            let n = &self.points[nid];
            (n.x - origin_x) * dir.0 + (n.y - origin_y) * dir.1 < 0.0
        };
        let dir_first = bin_direction(bin);
        let dir_second = bin_direction((bin + ANGLE_BINS / 2) % ANGLE_BINS);
        let first: Vec<usize> = neighbors.iter().copied().filter(|&n| on_side(dir_first, n)).collect();
        let second: Vec<usize> = neighbors.iter().copied().filter(|&n| on_side(dir_second, n)).collect();
        if first.is_empty() || second.is_empty() {
            self.points[id].mark_replication_failed();
            return None;
        }

        let initial_degree = neighbors.len() as f64;
        let original_weight = self.points[id].effective_weight;

        let mut centroid_x = 0.0;
        let mut centroid_y = 0.0;
        for &nid in &second {
            centroid_x += self.points[nid].x;
            centroid_y += self.points[nid].y;
        }
        centroid_x /= second.len() as f64;
        centroid_y /= second.len() as f64;

        let clone_id = self.points.len();
        let mut replica = self.points[id].replica(centroid_x, centroid_y);
        replica.effective_weight = original_weight * initial_degree / second.len() as f64;
        replica.neighbors = second;
        let instance = replica.instance;
        self.points.push(replica);
        self.instance_points[instance].push(clone_id);

        // First-partition neighbors that drifted closer to the replica
        // migrate to it.
        let mut kept = Vec::with_capacity(first.len());
        for nid in first {
            let n = &self.points[nid];
            let dx_o = n.x - origin_x;
            let dy_o = n.y - origin_y;
            let dx_c = n.x - centroid_x;
            let dy_c = n.y - centroid_y;
            if (dx_o * dx_o + dy_o * dy_o).sqrt() > (dx_c * dx_c + dy_c * dy_c).sqrt() {
                self.points[clone_id].neighbors.push(nid);
            } else {
                kept.push(nid);
            }
        }
        let final_degree = kept.len() as f64;
        self.points[id].neighbors = kept;
        self.points[id].effective_weight = original_weight * initial_degree / final_degree;

        // Back edges of everything the replica now owns point at it.
        let replica_neighbors = self.points[clone_id].neighbors.clone();
        for nid in replica_neighbors {
            for entry in &mut self.points[nid].neighbors {
                if *entry == id {
                    *entry = clone_id;
                }
            }
        }
        Some(clone_id)
    }

    /// Records every point in instance-major order, remapping adjacency
    /// into snapshot positions when `retain_edges` is set.
    #[must_use]
    pub fn snapshot(&self, retain_edges: bool) -> Vec<PointSnapshot> {
        let ids = self.instance_major_ids();
        let mut position = vec![usize::MAX; self.points.len()];
        for (pos, &id) in ids.iter().enumerate() {
            position[id] = pos;
        }
        ids.iter()
            .map(|&id| {
                let point = &self.points[id];
                let neighbors = if retain_edges {
                    point.neighbors.iter().map(|&n| position[n]).collect()
                } else {
                    Vec::new()
                };
                PointSnapshot {
                    instance: point.instance,
                    x: point.x,
                    y: point.y,
                    gray: point.gray,
                    neighbors,
                }
            })
            .collect()
    }
}

/// Scale factors mapping `bounds` onto a `width` x `height` rectangle.
#[must_use]
pub fn normalization_scales(bounds: &Bounds, width: f64, height: f64, uniform: bool) -> (f64, f64) {
    let scale_x = width / bounds.width().max(1e-9);
    let scale_y = height / bounds.height().max(1e-9);
    if uniform {
        let scale = scale_x.min(scale_y);
        (scale, scale)
    } else {
        (scale_x, scale_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ineffective_marks_gray_permanently() {
        let mut set = PointSet::new(1);
        let id = set.push_point(0, 0.0, 0.0);
        assert!(!set.point(id).gray());
        set.point_mut(id).set_ineffective(true);
        assert!(set.point(id).gray());
        set.point_mut(id).set_ineffective(false);
        assert!(!set.point(id).ineffective());
        assert!(set.point(id).gray());
    }

    #[test]
    fn pressure_accumulation_splits_by_sign() {
        let mut set = PointSet::new(1);
        let id = set.push_point(0, 0.0, 0.0);
        set.point_mut(id).accumulate_pressure(3, 2.0);
        set.point_mut(id).accumulate_pressure(3, -5.0);
        assert_eq!(set.point(id).positive_pressure[3], 2.0);
        assert_eq!(set.point(id).negative_pressure[3], 5.0);
        assert_eq!(set.replication_pressure(id, 3), 7.0);
        assert_eq!(set.point(id).max_replication_pressure(), 7.0);
        set.point_mut(id).reset_pressures();
        assert_eq!(set.replication_pressure(id, 3), 0.0);
    }

    #[test]
    fn replicated_instances_report_negative_pressure() {
        let mut set = PointSet::new(1);
        let a = set.push_point(0, 0.0, 0.0);
        set.point_mut(a).accumulate_pressure(0, 4.0);
        assert_eq!(set.replication_pressure(a, 0), 4.0);
        set.push_point(0, 1.0, 1.0);
        assert_eq!(set.replication_pressure(a, 0), -1.0);
    }

    #[test]
    fn bin_directions_cover_the_circle() {
        let (x0, y0) = bin_direction(0);
        assert!((x0 - 1.0).abs() < 1e-12 && y0.abs() < 1e-12);
        let (x9, y9) = bin_direction(9);
        assert!(x9.abs() < 1e-12 && (y9 - 1.0).abs() < 1e-12);
        let (x18, y18) = bin_direction(18);
        assert!((x18 + 1.0).abs() < 1e-12 && y18.abs() < 1e-12);
    }

    #[test]
    fn containing_box_and_expansion() {
        let mut set = PointSet::new(3);
        set.push_point(0, -1.0, 2.0);
        set.push_point(1, 3.0, 4.0);
        set.push_point(2, 1.0, 0.0);
        let bounds = set.containing_box().expect("non-empty");
        assert_eq!(bounds.min_x, -1.0);
        assert_eq!(bounds.max_x, 3.0);
        assert_eq!(bounds.min_y, 0.0);
        assert_eq!(bounds.max_y, 4.0);
        let grown = bounds.expanded(0.05);
        assert!((grown.min_x - (-1.2)).abs() < 1e-12);
        assert!((grown.max_x - 3.2).abs() < 1e-12);
        assert!((grown.min_y - (-0.2)).abs() < 1e-12);
        assert!((grown.max_y - 4.2).abs() < 1e-12);
        assert_eq!(grown.clamp(10.0, -10.0), (grown.max_x, grown.min_y));
    }

    #[test]
    fn normalize_maps_box_onto_target_rectangle() {
        let mut set = PointSet::new(2);
        set.push_point(0, 10.0, 20.0);
        set.push_point(1, 30.0, 30.0);
        set.normalize_to_size(100.0, 50.0, false);
        let bounds = set.containing_box().expect("non-empty");
        assert!((bounds.min_x - 0.0).abs() < 1e-9);
        assert!((bounds.max_x - 100.0).abs() < 1e-9);
        assert!((bounds.min_y - 0.0).abs() < 1e-9);
        assert!((bounds.max_y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn normalize_uniform_keeps_aspect_ratio() {
        let mut set = PointSet::new(2);
        set.push_point(0, 0.0, 0.0);
        set.push_point(1, 10.0, 5.0);
        set.normalize_to_size(100.0, 100.0, true);
        let bounds = set.containing_box().expect("non-empty");
        assert!((bounds.max_x - 100.0).abs() < 1e-9);
        assert!((bounds.max_y - 50.0).abs() < 1e-9);
    }

    fn replication_fixture() -> PointSet {
        // Instance 0's point at the origin with neighbors on both sides
        // of the x axis direction.
        let mut set = PointSet::new(4);
        set.push_point(0, 0.0, 0.0);
        set.push_point(1, -1.0, 0.0);
        set.push_point(2, 1.0, 0.0);
        set.push_point(3, -1.0, 0.5);
        set.point_mut(0).neighbors = vec![1, 2, 3];
        set.point_mut(2).neighbors = vec![0];
        set
    }

    #[test]
    fn replication_splits_partitions_and_rewires() {
        let mut set = replication_fixture();
        // Strongest antipodal pair along bins 0/18.
        set.point_mut(0).accumulate_pressure(0, -2.0);
        let clone = set.replicate_by_angles(0).expect("split succeeds");
        assert_eq!(clone, 4);
        assert_eq!(set.instance_points(0), &[0, 4]);
        assert_eq!(set.point(clone).projection_index(), 1);
        // Bin 0 points along +x, so the first partition is the x < 0
        // side and the replica takes the x > 0 side.
        assert_eq!(set.point(0).neighbors, vec![1, 3]);
        assert_eq!(set.point(clone).neighbors, vec![2]);
        // Replica starts at the centroid of its partition.
        assert_eq!(set.point(clone).x, 1.0);
        assert_eq!(set.point(clone).y, 0.0);
        // Weight redistribution against the pre-split degree of 3.
        assert!((set.point(clone).effective_weight - 3.0).abs() < 1e-12);
        assert!((set.point(0).effective_weight - 1.5).abs() < 1e-12);
        // The back edge of the replica's neighbor now names the replica.
        assert_eq!(set.point(2).neighbors, vec![clone]);
        assert!(!set.point(0).replication_failed());
    }

    #[test]
    fn replication_fails_with_zero_pressure() {
        let mut set = replication_fixture();
        let before = set.len();
        assert!(set.replicate_by_angles(0).is_none());
        assert!(set.point(0).replication_failed());
        assert_eq!(set.len(), before);
        assert_eq!(set.instance_points(0), &[0]);
    }

    #[test]
    fn replication_fails_on_one_sided_neighborhood() {
        let mut set = PointSet::new(3);
        set.push_point(0, 0.0, 0.0);
        set.push_point(1, -1.0, 0.0);
        set.push_point(2, -2.0, 0.0);
        set.point_mut(0).neighbors = vec![1, 2];
        set.point_mut(0).accumulate_pressure(0, -2.0);
        assert!(set.replicate_by_angles(0).is_none());
        assert!(set.point(0).replication_failed());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn outlier_count_flags_extreme_pressure() {
        let mut set = PointSet::new(8);
        for instance in 0..8 {
            let id = set.push_point(instance, instance as f64, 0.0);
            set.point_mut(id).accumulate_pressure(0, 1.0);
        }
        assert_eq!(set.pressure_outlier_count(), 0);
        set.point_mut(0).accumulate_pressure(0, 50.0);
        assert_eq!(set.pressure_outlier_count(), 1);
    }

    #[test]
    fn outlier_count_caps_at_quarter_of_instances() {
        // Two clear outliers among seven points, but the cap is 7/4 = 1.
        let mut set = PointSet::new(7);
        for instance in 0..7 {
            set.push_point(instance, 0.0, 0.0);
        }
        set.point_mut(0).accumulate_pressure(0, 100.0);
        set.point_mut(1).accumulate_pressure(0, 100.0);
        assert_eq!(set.pressure_outlier_count(), 1);
    }

    #[test]
    fn snapshot_remaps_edges_into_snapshot_positions() {
        let mut set = replication_fixture();
        set.point_mut(0).accumulate_pressure(0, -2.0);
        let clone = set.replicate_by_angles(0).expect("split succeeds");
        let snapshot = set.snapshot(true);
        assert_eq!(snapshot.len(), 5);
        // Instance-major order: instance 0 owns positions 0 and 1.
        assert_eq!(snapshot[0].instance, 0);
        assert_eq!(snapshot[1].instance, 0);
        assert_eq!(snapshot[2].instance, 1);
        // Point 2 (instance 2, snapshot position 3) points at the
        // replica, which sits at snapshot position 1.
        assert_eq!(snapshot[3].neighbors, vec![1]);
        let compact = set.snapshot(false);
        assert!(compact.iter().all(|p| p.neighbors.is_empty()));
        let _ = clone;
    }
}
