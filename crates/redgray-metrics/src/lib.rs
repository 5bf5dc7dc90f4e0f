//! Trustworthiness scoring for multi-point projections.
//!
//! The score asks: of the instance pairs that look like neighbors in the
//! 2D layout, how many are genuine neighbors in data space? Each
//! violating pair is penalized by how far down the true neighbor ranking
//! the visual neighbor actually sits, and the penalty total is folded
//! into a score with maximum 1.
//!
//! Because instances can be projected by more than one point, both the
//! visual ranking and the penalty take the minimum over all point pairs
//! of the two instances. The [`Layer::RedOnly`] variant scores the
//! layout as if gray points did not exist, shrinking the instance count
//! to match.

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use redgray_core::{InstanceSet, PointSet};

/// Which points participate in the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Every projected point counts.
    RedAndGray,
    /// Gray points are invisible; instances with no red point drop out
    /// of the instance count entirely.
    RedOnly,
}

/// Rank-based trustworthiness evaluator with a fixed neighborhood size.
#[derive(Debug, Clone, Copy)]
pub struct TrustworthinessEvaluator {
    neighborhood_size: usize,
}

impl TrustworthinessEvaluator {
    #[must_use]
    pub fn new(neighborhood_size: usize) -> Self {
        Self { neighborhood_size }
    }

    #[must_use]
    pub fn neighborhood_size(&self) -> usize {
        self.neighborhood_size
    }

    /// Scores the layout single-threaded.
    #[must_use]
    pub fn evaluate(&self, dataset: &InstanceSet, points: &PointSet, layer: Layer) -> f64 {
        self.evaluate_partitioned(dataset, points, layer, 1)
    }

    /// Scores the layout with instances striped across `workers` by
    /// index modulo the worker count. Per-worker penalty totals are sums
    /// of integers, so any worker count produces the identical score.
    #[must_use]
    pub fn evaluate_partitioned(
        &self,
        dataset: &InstanceSet,
        points: &PointSet,
        layer: Layer,
        workers: usize,
    ) -> f64 {
        let total = dataset.len();
        let k = self.neighborhood_size;
        let eligible: Vec<usize> = points
            .instance_major_ids()
            .into_iter()
            .filter(|&id| match layer {
                Layer::RedAndGray => true,
                Layer::RedOnly => !points.point(id).gray(),
            })
            .collect();
        let scored_instances = match layer {
            Layer::RedAndGray => total,
            Layer::RedOnly => (0..total)
                .filter(|&i| {
                    points
                        .instance_points(i)
                        .iter()
                        .any(|&id| !points.point(id).gray())
                })
                .count(),
        };

        let workers = workers.max(1);
        let penalties: Vec<f64> = if workers == 1 {
            vec![self.stripe_penalty(dataset, points, layer, &eligible, 0, 1)]
        } else {
            (0..workers)
                .into_par_iter()
                .map(|w| self.stripe_penalty(dataset, points, layer, &eligible, w, workers))
                .collect()
        };
        let penalty: f64 = penalties.iter().sum();

        let n = scored_instances as f64;
        let k = k as f64;
        1.0 - 2.0 * penalty / (n * k * (2.0 * n - 3.0 * k - 1.0))
    }

    /// Penalty contributed by instances congruent to `stripe` modulo
    /// `workers`.
    fn stripe_penalty(
        &self,
        dataset: &InstanceSet,
        points: &PointSet,
        layer: Layer,
        eligible: &[usize],
        stripe: usize,
        workers: usize,
    ) -> f64 {
        let total = dataset.len();
        let k = self.neighborhood_size;
        let mut penalty = 0.0;
        for i in (stripe..total).step_by(workers) {
            // Pass 1: for each other instance, the best rank any of its
            // eligible points achieves in the distance ordering around
            // any of instance i's points. -1 marks "never seen".
            let mut visual_rank: Vec<i64> = vec![-1; total];
            for &pid in points.instance_points(i) {
                let mut sorted: Vec<(OrderedFloat<f64>, usize)> = eligible
                    .iter()
                    .copied()
                    .filter(|&q| q != pid)
                    .map(|q| (OrderedFloat(points.distance(pid, q)), q))
                    .collect();
                sorted.sort_unstable();
                for (position, (_, q)) in sorted.iter().enumerate() {
                    let target = points.point(*q).instance();
                    let rank = (position + 1) as i64;
                    if visual_rank[target] == -1 || rank < visual_rank[target] {
                        visual_rank[target] = rank;
                    }
                }
            }

            // Pass 2: penalize visual neighbors that are not true
            // neighbors, taking the minimum true rank over point pairs.
            for j in 0..total {
                if j == i {
                    continue;
                }
                if visual_rank[j] == -1 || visual_rank[j] > k as i64 {
                    continue;
                }
                let mut min_rank = total;
                let mut has_projection = false;
                let mut is_visual_neighbor = false;
                for &pid in points.instance_points(i) {
                    for &qid in points.instance_points(j) {
                        // Gray pairs still rank; they just cannot prove
                        // the pair visible on the red layer.
                        if layer == Layer::RedAndGray
                            || (!points.point(pid).gray() && !points.point(qid).gray())
                        {
                            has_projection = true;
                        }
                        let pair_distance = points.distance(pid, qid);
                        let mut rank = 1usize;
                        for &other in eligible {
                            if other == pid || other == qid {
                                continue;
                            }
                            if points.distance(pid, other) < pair_distance {
                                rank += 1;
                                if rank > k {
                                    break;
                                }
                            }
                        }
                        if rank > k {
                            continue;
                        }
                        is_visual_neighbor = true;
                        min_rank = min_rank.min(self.true_rank(dataset, points, layer, i, j));
                    }
                }
                if min_rank > k && has_projection && is_visual_neighbor {
                    penalty += (min_rank - k) as f64;
                }
            }
        }
        penalty
    }

    /// Position of instance `j` in the data-space neighbor ordering of
    /// instance `i`, counting only instances the layer can see.
    fn true_rank(
        &self,
        dataset: &InstanceSet,
        points: &PointSet,
        layer: Layer,
        i: usize,
        j: usize,
    ) -> usize {
        let reference = dataset.evaluation_distance(i, j);
        let mut rank = 1usize;
        for u in 0..dataset.len() {
            if u == i || u == j {
                continue;
            }
            if layer == Layer::RedOnly {
                let first = points.instance_points(u)[0];
                if points.point(first).gray() {
                    continue;
                }
            }
            if dataset.evaluation_distance(i, u) < reference {
                rank += 1;
            }
        }
        rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Instances on a line with layout positions matching data order.
    fn consistent_layout(n: usize) -> (InstanceSet, PointSet) {
        let mut dataset = InstanceSet::new();
        let mut points = PointSet::new(n);
        for i in 0..n {
            dataset.push(vec![i as f64], Vec::new(), 0).expect("push");
            points.push_point(i, i as f64 * 10.0, 0.0);
        }
        (dataset, points)
    }

    #[test]
    fn consistent_layout_scores_one() {
        let (dataset, points) = consistent_layout(6);
        let evaluator = TrustworthinessEvaluator::new(2);
        let red_and_gray = evaluator.evaluate(&dataset, &points, Layer::RedAndGray);
        let red = evaluator.evaluate(&dataset, &points, Layer::RedOnly);
        assert_eq!(red_and_gray, 1.0);
        assert_eq!(red, 1.0);
    }

    #[test]
    fn misplaced_point_lowers_the_score() {
        let (dataset, mut points) = consistent_layout(6);
        // Drop instance 0's point between instances 4 and 5.
        points.point_mut(0).x = 45.0;
        let evaluator = TrustworthinessEvaluator::new(2);
        let score = evaluator.evaluate(&dataset, &points, Layer::RedAndGray);
        assert!(score < 1.0);
        assert!(score > 0.0);
    }

    #[test]
    fn red_layer_ignores_gray_points() {
        let (dataset, mut points) = consistent_layout(4);
        // A misplaced gray point hurts the full layer but not the red one.
        points.point_mut(3).x = 5.0;
        points.point_mut(3).set_ineffective(true);
        let evaluator = TrustworthinessEvaluator::new(1);
        let full = evaluator.evaluate(&dataset, &points, Layer::RedAndGray);
        let red = evaluator.evaluate(&dataset, &points, Layer::RedOnly);
        assert!(full < 1.0);
        assert_eq!(red, 1.0);
    }

    #[test]
    fn replicated_instances_score_via_their_best_pair() {
        let (dataset, mut points) = consistent_layout(5);
        // A second point for instance 2 far away must not hurt the score
        // while the first point still sits correctly.
        points.push_point(2, 1000.0, 1000.0);
        let evaluator = TrustworthinessEvaluator::new(2);
        let score = evaluator.evaluate(&dataset, &points, Layer::RedAndGray);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn worker_count_does_not_change_the_score() {
        let (dataset, mut points) = consistent_layout(6);
        points.point_mut(0).x = 45.0;
        let evaluator = TrustworthinessEvaluator::new(2);
        let single = evaluator.evaluate(&dataset, &points, Layer::RedAndGray);
        for workers in [2, 4, 8] {
            let parallel =
                evaluator.evaluate_partitioned(&dataset, &points, Layer::RedAndGray, workers);
            assert_eq!(single, parallel, "workers = {workers}");
        }
    }
}
