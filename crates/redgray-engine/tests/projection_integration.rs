//! End-to-end runs of the full projection schedule.

use redgray_core::InstanceSet;
use redgray_engine::{
    NeighborCount, Phase, ProjectionConfig, ProjectionEngine, TOTAL_ITERATIONS,
};

fn two_cluster_dataset(n: usize) -> InstanceSet {
    let mut dataset = InstanceSet::new();
    for i in 0..n {
        let (base_x, base_y, label) = if i % 2 == 0 {
            (0.0, 0.0, 0)
        } else {
            (50.0, 50.0, 1)
        };
        dataset
            .push(
                vec![base_x + i as f64 * 0.5, base_y - i as f64 * 0.25],
                Vec::new(),
                label,
            )
            .expect("push");
    }
    dataset
}

fn small_config(workers: usize) -> ProjectionConfig {
    ProjectionConfig {
        neighbor_count: NeighborCount::Absolute(2),
        evaluation_neighborhood_size: 2,
        worker_threads: workers,
        ..ProjectionConfig::default()
    }
}

#[test]
fn full_run_records_every_iteration() {
    let mut engine =
        ProjectionEngine::new(two_cluster_dataset(6), small_config(2)).expect("engine");
    let output = engine.run();

    assert_eq!(engine.phase(), Phase::Done);
    assert_eq!(output.method, "Red Gray Plus projection");
    assert_eq!(output.steps.len(), TOTAL_ITERATIONS + 1);
    assert_eq!(output.steps[0].label, "Initial random");
    assert_eq!(output.steps[1].label, "1");
    assert_eq!(output.steps.last().expect("non-empty").label, "1830");

    output.check_finite().expect("finite coordinates");
    for step in &output.steps {
        assert!(step.red_and_gray_trustworthiness.is_finite());
        assert!(step.red_trustworthiness.is_finite());
        assert!(step.red_and_gray_trustworthiness <= 1.0 + 1e-9);
        assert!(step.red_trustworthiness <= 1.0 + 1e-9);
    }
    assert!(output.best_by_red_and_gray().is_some());
    assert!(output.best_by_red().is_some());

    // Replication appends at most one replica per instance.
    let finale = &output.steps.last().expect("non-empty").points;
    let mut per_instance = vec![0usize; 6];
    for point in finale {
        per_instance[point.instance] += 1;
    }
    for (instance, &count) in per_instance.iter().enumerate() {
        assert!(
            (1..=2).contains(&count),
            "instance {instance} projected by {count} points"
        );
    }
}

#[test]
fn worker_count_never_changes_the_result() {
    let mut single =
        ProjectionEngine::new(two_cluster_dataset(6), small_config(1)).expect("engine");
    let mut striped =
        ProjectionEngine::new(two_cluster_dataset(6), small_config(4)).expect("engine");
    let baseline = single.run();
    let parallel = striped.run();

    assert_eq!(baseline.steps.len(), parallel.steps.len());
    for (a, b) in baseline.steps.iter().zip(&parallel.steps) {
        assert_eq!(
            a.red_and_gray_trustworthiness, b.red_and_gray_trustworthiness,
            "step {}",
            a.label
        );
        assert_eq!(a.red_trustworthiness, b.red_trustworthiness, "step {}", a.label);
        assert_eq!(a.points.len(), b.points.len(), "step {}", a.label);
        for (p, q) in a.points.iter().zip(&b.points) {
            assert_eq!(p.x, q.x, "step {}", a.label);
            assert_eq!(p.y, q.y, "step {}", a.label);
            assert_eq!(p.gray, q.gray, "step {}", a.label);
        }
    }
}

#[test]
fn pressure_tracking_is_identical_across_worker_counts() {
    let mut baseline =
        ProjectionEngine::new(two_cluster_dataset(7), small_config(1)).expect("engine");
    // 505 steps puts the run past the step-500 transition, so pressure
    // tracking has been live for several iterations.
    for _ in 0..505 {
        baseline.advance();
    }
    for workers in [2, 4, 8] {
        let mut striped = ProjectionEngine::new(two_cluster_dataset(7), small_config(workers))
            .expect("engine");
        for _ in 0..505 {
            striped.advance();
        }
        let mut saw_pressure = false;
        for pid in 0..baseline.points().len() {
            let a = baseline.points().point(pid);
            let b = striped.points().point(pid);
            assert_eq!(a.x, b.x, "workers {workers}, point {pid} x");
            assert_eq!(a.y, b.y, "workers {workers}, point {pid} y");
            assert_eq!(
                a.positive_pressure, b.positive_pressure,
                "workers {workers}, point {pid} positive pressure"
            );
            assert_eq!(
                a.negative_pressure, b.negative_pressure,
                "workers {workers}, point {pid} negative pressure"
            );
            saw_pressure |= a.positive_pressure.iter().any(|&v| v != 0.0)
                || a.negative_pressure.iter().any(|&v| v != 0.0);
        }
        assert!(saw_pressure, "tracking recorded no pressure by step 505");
    }
}

#[test]
fn zero_budget_disables_replication() {
    let config = ProjectionConfig {
        replication_budget_override: Some(0),
        ..small_config(1)
    };
    let mut engine = ProjectionEngine::new(two_cluster_dataset(6), config).expect("engine");
    let output = engine.run();

    assert_eq!(engine.phase(), Phase::Done);
    let finale = &output.steps.last().expect("non-empty").points;
    assert_eq!(finale.len(), 6);
    assert!(finale.iter().all(|point| !point.gray));

    // With no gray points the freeze replay froze everything, so the
    // layout cannot move again for the rest of the schedule.
    let frozen = &output.steps[951].points;
    for step in &output.steps[952..] {
        for (p, q) in frozen.iter().zip(&step.points) {
            assert_eq!(p.x, q.x, "step {}", step.label);
            assert_eq!(p.y, q.y, "step {}", step.label);
        }
    }
}

#[test]
fn same_seed_reproduces_the_run() {
    let mut first =
        ProjectionEngine::new(two_cluster_dataset(6), small_config(2)).expect("engine");
    let mut second =
        ProjectionEngine::new(two_cluster_dataset(6), small_config(2)).expect("engine");
    let a = first.run();
    let b = second.run();
    for (x, y) in a.steps.iter().zip(&b.steps) {
        for (p, q) in x.points.iter().zip(&y.points) {
            assert_eq!(p.x, q.x);
            assert_eq!(p.y, q.y);
        }
    }
}
