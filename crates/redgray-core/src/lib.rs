//! Core data model for Red Gray Plus multi-point projection.
//!
//! Two halves live here:
//!
//! - [`dataset`]: high-dimensional instances, the distance provider
//!   (feature vectors, optional dissimilarity matrix, optional precomputed
//!   matrices, matrix transforms) and the k-nearest-neighbor graph builder.
//! - [`points`]: the 2D projected-point arena, including per-point force
//!   accumulators, 36-bin directional pressure, status flags, bounding
//!   boxes and angle-based point replication.
//!
//! Both halves use plain index-based arenas: instances refer to neighbors
//! by instance index, points refer to neighbors by point index, and a point
//! carries the index of the instance it projects. Nothing is ever removed
//! from either arena, so indices stay stable for the lifetime of a run.

pub mod dataset;
pub mod points;

pub use dataset::{DatasetError, DistanceTransform, Instance, InstanceSet, SquareMatrix};
pub use points::{ANGLE_BINS, Bounds, PointSet, PointSnapshot, ProjectedPoint};
