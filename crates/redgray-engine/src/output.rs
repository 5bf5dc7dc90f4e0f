//! Recorded projection steps and run output.

use redgray_core::points::{Bounds, PointSnapshot, normalization_scales};
use serde::{Deserialize, Serialize};

use crate::ProjectionError;

/// One recorded layout state with its trustworthiness scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionStep {
    /// "Initial random" for the setup snapshot, the 1-based iteration
    /// number otherwise.
    pub label: String,
    pub red_and_gray_trustworthiness: f64,
    pub red_trustworthiness: f64,
    pub points: Vec<PointSnapshot>,
}

impl ProjectionStep {
    /// Rescales the snapshot so its containing box maps onto a
    /// `width` x `height` rectangle anchored at the origin.
    pub fn normalize_to_size(&mut self, width: f64, height: f64, uniform: bool) {
        let Some(bounds) = Bounds::from_coordinates(self.points.iter().map(|p| (p.x, p.y))) else {
            return;
        };
        let (scale_x, scale_y) = normalization_scales(&bounds, width, height, uniform);
        for point in &mut self.points {
            point.x = (point.x - bounds.min_x) * scale_x;
            point.y = (point.y - bounds.min_y) * scale_y;
        }
    }
}

/// Full history of a projection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub method: String,
    pub steps: Vec<ProjectionStep>,
}

impl ProjectionOutput {
    #[must_use]
    pub fn new(method: impl Into<String>, steps: Vec<ProjectionStep>) -> Self {
        Self {
            method: method.into(),
            steps,
        }
    }

    /// Earliest step with the highest combined-layer score.
    #[must_use]
    pub fn best_by_red_and_gray(&self) -> Option<&ProjectionStep> {
        self.best_by(|step| step.red_and_gray_trustworthiness)
    }

    /// Earliest step with the highest red-layer score.
    #[must_use]
    pub fn best_by_red(&self) -> Option<&ProjectionStep> {
        self.best_by(|step| step.red_trustworthiness)
    }

    fn best_by(&self, score: impl Fn(&ProjectionStep) -> f64) -> Option<&ProjectionStep> {
        let mut best: Option<&ProjectionStep> = None;
        for step in &self.steps {
            match best {
                None => best = Some(step),
                Some(current) if score(step) > score(current) => best = Some(step),
                Some(_) => {}
            }
        }
        best
    }

    /// Rescales every recorded step onto a `width` x `height` rectangle.
    pub fn normalize_to_size(&mut self, width: f64, height: f64, uniform: bool) {
        for step in &mut self.steps {
            step.normalize_to_size(width, height, uniform);
        }
    }

    /// Rejects histories containing NaN or infinite coordinates,
    /// reporting the first offending step.
    pub fn check_finite(&self) -> Result<(), ProjectionError> {
        for step in &self.steps {
            if step
                .points
                .iter()
                .any(|p| !p.x.is_finite() || !p.y.is_finite())
            {
                return Err(ProjectionError::NonFiniteCoordinate {
                    label: step.label.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(label: &str, red_and_gray: f64, red: f64, coords: &[(f64, f64)]) -> ProjectionStep {
        ProjectionStep {
            label: label.to_string(),
            red_and_gray_trustworthiness: red_and_gray,
            red_trustworthiness: red,
            points: coords
                .iter()
                .map(|&(x, y)| PointSnapshot {
                    instance: 0,
                    x,
                    y,
                    gray: false,
                    neighbors: Vec::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn best_step_prefers_the_earliest_maximum() {
        let output = ProjectionOutput::new(
            "test",
            vec![
                step("1", 0.5, 0.9, &[]),
                step("2", 0.8, 0.7, &[]),
                step("3", 0.8, 0.1, &[]),
            ],
        );
        assert_eq!(output.best_by_red_and_gray().map(|s| s.label.as_str()), Some("2"));
        assert_eq!(output.best_by_red().map(|s| s.label.as_str()), Some("1"));
    }

    #[test]
    fn check_finite_names_the_poisoned_step() {
        let output = ProjectionOutput::new(
            "test",
            vec![
                step("1", 1.0, 1.0, &[(0.0, 0.0)]),
                step("2", 1.0, 1.0, &[(f64::NAN, 0.0)]),
            ],
        );
        let err = output.check_finite().unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::NonFiniteCoordinate { ref label } if label == "2"
        ));
    }

    #[test]
    fn normalize_rescales_each_step() {
        let mut output = ProjectionOutput::new(
            "test",
            vec![step("1", 1.0, 1.0, &[(10.0, 20.0), (30.0, 40.0)])],
        );
        output.normalize_to_size(200.0, 100.0, false);
        let points = &output.steps[0].points;
        assert!((points[0].x - 0.0).abs() < 1e-9);
        assert!((points[0].y - 0.0).abs() < 1e-9);
        assert!((points[1].x - 200.0).abs() < 1e-9);
        assert!((points[1].y - 100.0).abs() < 1e-9);
    }
}
