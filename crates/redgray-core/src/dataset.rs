//! Instances, the distance provider and the neighbor graph builder.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Neighborhood size used by [`DistanceTransform::NeighborhoodNormalized`].
const NORMALIZATION_NEIGHBORHOOD: usize = 20;

/// Floor applied to the squared vector norms in cosine similarity,
/// guarding against zero vectors.
const COSINE_NORM_FLOOR: f64 = 1e-7;

/// Errors raised at the dataset boundary.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Structural problem described by a static message.
    #[error("invalid dataset: {0}")]
    Invalid(&'static str),
    /// A supplied matrix row has the wrong length.
    #[error("matrix is not square: row {row} has {len} cells, expected {expected}")]
    RaggedMatrix {
        row: usize,
        len: usize,
        expected: usize,
    },
    /// A supplied matrix does not match the instance count.
    #[error("matrix size {len} does not match instance count {expected}")]
    MatrixSize { len: usize, expected: usize },
    /// A feature vector disagrees with the dimensionality already stored.
    #[error("feature vector of length {actual} does not match existing dimensionality {expected}")]
    FeatureLength { expected: usize, actual: usize },
    /// A matrix transform was requested without a matrix to transform.
    #[error("no precomputed distance matrix to transform")]
    MissingMatrix,
}

/// Dense symmetric `n x n` matrix of distances or dissimilarities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareMatrix {
    len: usize,
    cells: Vec<f64>,
}

impl SquareMatrix {
    /// Creates an all-zero matrix with `len` rows.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self {
            len,
            cells: vec![0.0; len * len],
        }
    }

    /// Builds a matrix from row vectors, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DatasetError> {
        let len = rows.len();
        let mut cells = Vec::with_capacity(len * len);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != len {
                return Err(DatasetError::RaggedMatrix {
                    row,
                    len: values.len(),
                    expected: len,
                });
            }
            cells.extend_from_slice(values);
        }
        Ok(Self { len, cells })
    }

    /// Number of rows (and columns).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.cells[i * self.len + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.cells[i * self.len + j] = value;
    }
}

/// One high-dimensional instance: feature vector, optional evaluation
/// feature vector, class label and the most recently built neighbor list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    index: usize,
    label: i32,
    features: Vec<f64>,
    evaluation_features: Vec<f64>,
    neighbors: Vec<usize>,
}

impl Instance {
    /// Position of this instance in its [`InstanceSet`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn label(&self) -> i32 {
        self.label
    }

    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.features
    }

    #[must_use]
    pub fn evaluation_features(&self) -> &[f64] {
        &self.evaluation_features
    }

    /// Instance indices of the k nearest neighbors, ascending by distance.
    /// Empty until [`InstanceSet::compute_neighbors`] runs.
    #[must_use]
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }
}

/// The dataset: an append-only arena of instances plus the distance
/// provider state (dissimilarity matrix, precomputed matrices).
///
/// Distance resolution order for a pair `(i, j)`:
/// 1. the precomputed matrix, if one has been built or supplied;
/// 2. the dissimilarity matrix, when dissimilarity use is enabled;
/// 3. Euclidean distance over the feature vectors.
///
/// Evaluation distances resolve the same way against the evaluation
/// matrix and evaluation feature vectors, falling back to the primary
/// provider when the instance carries no evaluation features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceSet {
    instances: Vec<Instance>,
    dissimilarities: Option<SquareMatrix>,
    use_dissimilarity: bool,
    distances: Option<SquareMatrix>,
    evaluation_distances: Option<SquareMatrix>,
}

/// In-place rewrites of a precomputed distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceTransform {
    /// Compresses each distance through `atan`, scaled so that the 20th
    /// nearest neighbor of each endpoint lands at `atan(tan(1)) = 1`,
    /// averaging the two endpoint scales.
    NeighborhoodNormalized,
    /// Replaces the matrix with `1 - cosine_similarity` over the feature
    /// vectors, discarding whatever was there before.
    Cosine,
}

impl InstanceSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instance and returns its index.
    ///
    /// Feature vectors must share one dimensionality across the set, and
    /// likewise for non-empty evaluation feature vectors.
    pub fn push(
        &mut self,
        features: Vec<f64>,
        evaluation_features: Vec<f64>,
        label: i32,
    ) -> Result<usize, DatasetError> {
        if let Some(first) = self.instances.first() {
            if features.len() != first.features.len() {
                return Err(DatasetError::FeatureLength {
                    expected: first.features.len(),
                    actual: features.len(),
                });
            }
        }
        if !evaluation_features.is_empty() {
            if let Some(existing) = self
                .instances
                .iter()
                .find(|instance| !instance.evaluation_features.is_empty())
            {
                if evaluation_features.len() != existing.evaluation_features.len() {
                    return Err(DatasetError::FeatureLength {
                        expected: existing.evaluation_features.len(),
                        actual: evaluation_features.len(),
                    });
                }
            }
        }
        let index = self.instances.len();
        self.instances.push(Instance {
            index,
            label,
            features,
            evaluation_features,
            neighbors: Vec::new(),
        });
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    #[must_use]
    pub fn instance(&self, index: usize) -> &Instance {
        &self.instances[index]
    }

    /// Installs a dissimilarity matrix and enables dissimilarity use.
    pub fn set_dissimilarities(&mut self, matrix: SquareMatrix) -> Result<(), DatasetError> {
        if matrix.len() != self.instances.len() {
            return Err(DatasetError::MatrixSize {
                len: matrix.len(),
                expected: self.instances.len(),
            });
        }
        self.dissimilarities = Some(matrix);
        self.use_dissimilarity = true;
        Ok(())
    }

    /// Toggles dissimilarity use. Enabling requires a matrix to be present.
    pub fn set_use_dissimilarity(&mut self, enabled: bool) -> Result<(), DatasetError> {
        if enabled && self.dissimilarities.is_none() {
            return Err(DatasetError::Invalid(
                "dissimilarity use enabled without a dissimilarity matrix",
            ));
        }
        self.use_dissimilarity = enabled;
        Ok(())
    }

    /// Averages the dissimilarity matrix with its transpose in place.
    pub fn symmetrize_dissimilarities(&mut self) -> Result<(), DatasetError> {
        let matrix = self
            .dissimilarities
            .as_mut()
            .ok_or(DatasetError::MissingMatrix)?;
        for i in 0..matrix.len() {
            for j in (i + 1)..matrix.len() {
                let mean = (matrix.get(i, j) + matrix.get(j, i)) / 2.0;
                matrix.set(i, j, mean);
                matrix.set(j, i, mean);
            }
        }
        Ok(())
    }

    /// Distance between instances `i` and `j` under the current provider.
    #[must_use]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        if let Some(matrix) = &self.distances {
            return matrix.get(i, j);
        }
        self.raw_distance(i, j)
    }

    /// Distance used by the trustworthiness evaluator.
    #[must_use]
    pub fn evaluation_distance(&self, i: usize, j: usize) -> f64 {
        if let Some(matrix) = &self.evaluation_distances {
            return matrix.get(i, j);
        }
        self.raw_evaluation_distance(i, j)
    }

    fn raw_distance(&self, i: usize, j: usize) -> f64 {
        if self.use_dissimilarity {
            if let Some(matrix) = &self.dissimilarities {
                return matrix.get(i, j);
            }
        }
        euclidean(&self.instances[i].features, &self.instances[j].features)
    }

    fn raw_evaluation_distance(&self, i: usize, j: usize) -> f64 {
        if self.use_dissimilarity {
            if let Some(matrix) = &self.dissimilarities {
                return matrix.get(i, j);
            }
        }
        if self.instances[i].evaluation_features.is_empty() {
            return self.distance(i, j);
        }
        euclidean(
            &self.instances[i].evaluation_features,
            &self.instances[j].evaluation_features,
        )
    }

    /// Materializes the current provider into a dense matrix so later
    /// lookups are O(1). Transforms require this to have run (or a matrix
    /// to have been supplied via [`Self::set_distances`]).
    pub fn precompute_distances(&mut self) {
        let n = self.instances.len();
        let mut matrix = SquareMatrix::zeroed(n);
        for i in 0..n {
            for j in 0..n {
                matrix.set(i, j, self.raw_distance(i, j));
            }
        }
        self.distances = Some(matrix);
    }

    /// Evaluation-distance counterpart of [`Self::precompute_distances`].
    pub fn precompute_evaluation_distances(&mut self) {
        let n = self.instances.len();
        let mut matrix = SquareMatrix::zeroed(n);
        for i in 0..n {
            for j in 0..n {
                matrix.set(i, j, self.raw_evaluation_distance(i, j));
            }
        }
        self.evaluation_distances = Some(matrix);
    }

    /// Installs an externally computed distance matrix.
    pub fn set_distances(&mut self, matrix: SquareMatrix) -> Result<(), DatasetError> {
        if matrix.len() != self.instances.len() {
            return Err(DatasetError::MatrixSize {
                len: matrix.len(),
                expected: self.instances.len(),
            });
        }
        self.distances = Some(matrix);
        Ok(())
    }

    /// Installs an externally computed evaluation distance matrix.
    pub fn set_evaluation_distances(&mut self, matrix: SquareMatrix) -> Result<(), DatasetError> {
        if matrix.len() != self.instances.len() {
            return Err(DatasetError::MatrixSize {
                len: matrix.len(),
                expected: self.instances.len(),
            });
        }
        self.evaluation_distances = Some(matrix);
        Ok(())
    }

    /// Rewrites the precomputed distance matrix in place.
    pub fn transform_distances(&mut self, transform: DistanceTransform) -> Result<(), DatasetError> {
        match transform {
            DistanceTransform::NeighborhoodNormalized => {
                let scales = self.neighborhood_scales(false)?;
                let matrix = self.distances.as_mut().ok_or(DatasetError::MissingMatrix)?;
                apply_neighborhood_normalization(matrix, &scales);
            }
            DistanceTransform::Cosine => {
                let matrix = self.cosine_matrix(false);
                self.distances = Some(matrix);
            }
        }
        Ok(())
    }

    /// Evaluation counterpart of [`Self::transform_distances`].
    pub fn transform_evaluation_distances(
        &mut self,
        transform: DistanceTransform,
    ) -> Result<(), DatasetError> {
        match transform {
            DistanceTransform::NeighborhoodNormalized => {
                let scales = self.neighborhood_scales(true)?;
                let matrix = self
                    .evaluation_distances
                    .as_mut()
                    .ok_or(DatasetError::MissingMatrix)?;
                apply_neighborhood_normalization(matrix, &scales);
            }
            DistanceTransform::Cosine => {
                let matrix = self.cosine_matrix(true);
                self.evaluation_distances = Some(matrix);
            }
        }
        Ok(())
    }

    /// Per-instance scale factor `tan(1) / d_k(i)` with `d_k` the distance
    /// to the 20th nearest neighbor (clamped to the set size).
    fn neighborhood_scales(&self, evaluation: bool) -> Result<Vec<f64>, DatasetError> {
        let n = self.instances.len();
        let present = if evaluation {
            self.evaluation_distances.is_some()
        } else {
            self.distances.is_some()
        };
        if !present {
            return Err(DatasetError::MissingMatrix);
        }
        if n < 2 {
            return Ok(vec![1.0; n]);
        }
        let rank = NORMALIZATION_NEIGHBORHOOD.min(n - 1) - 1;
        let scale_numerator = 1.0_f64.tan();
        let mut scales = Vec::with_capacity(n);
        for i in 0..n {
            let mut sorted: Vec<(OrderedFloat<f64>, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = if evaluation {
                        self.evaluation_distance(i, j)
                    } else {
                        self.distance(i, j)
                    };
                    (OrderedFloat(d), j)
                })
                .collect();
            sorted.sort_unstable();
            scales.push(scale_numerator / sorted[rank].0.into_inner());
        }
        Ok(scales)
    }

    fn cosine_matrix(&self, evaluation: bool) -> SquareMatrix {
        let n = self.instances.len();
        let mut matrix = SquareMatrix::zeroed(n);
        for i in 0..n {
            for j in 0..n {
                let a = self.vectors_for(i, evaluation);
                let b = self.vectors_for(j, evaluation);
                matrix.set(i, j, cosine_distance(a, b));
            }
        }
        matrix
    }

    fn vectors_for(&self, index: usize, evaluation: bool) -> &[f64] {
        let instance = &self.instances[index];
        if evaluation && !instance.evaluation_features.is_empty() {
            &instance.evaluation_features
        } else {
            &instance.features
        }
    }

    /// Rebuilds every instance's neighbor list with the `k` nearest
    /// other instances under the current distance provider, ascending by
    /// `(distance, index)`. Lists are `min(k, len - 1)` long.
    pub fn compute_neighbors(&mut self, k: usize) {
        let n = self.instances.len();
        let take = if n == 0 { 0 } else { k.min(n - 1) };
        let mut lists: Vec<Vec<usize>> = Vec::with_capacity(n);
        for i in 0..n {
            let mut sorted: Vec<(OrderedFloat<f64>, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (OrderedFloat(self.distance(i, j)), j))
                .collect();
            sorted.sort_unstable();
            lists.push(sorted.into_iter().take(take).map(|(_, j)| j).collect());
        }
        for (instance, list) in self.instances.iter_mut().zip(lists) {
            instance.neighbors = list;
        }
    }

    /// Largest pairwise distance under the current provider.
    #[must_use]
    pub fn max_distance(&self) -> f64 {
        let n = self.instances.len();
        let mut max = 0.0_f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max = max.max(self.distance(i, j));
            }
        }
        max
    }

    /// Largest pairwise evaluation distance.
    #[must_use]
    pub fn max_evaluation_distance(&self) -> f64 {
        let n = self.instances.len();
        let mut max = 0.0_f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max = max.max(self.evaluation_distance(i, j));
            }
        }
        max
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().max(COSINE_NORM_FLOOR).sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().max(COSINE_NORM_FLOOR).sqrt();
    1.0 - dot / (norm_a * norm_b)
}

fn apply_neighborhood_normalization(matrix: &mut SquareMatrix, scales: &[f64]) {
    for i in 0..matrix.len() {
        for j in 0..matrix.len() {
            let d = matrix.get(i, j);
            let compressed = ((d * scales[i]).atan() + (d * scales[j]).atan()) / 2.0;
            matrix.set(i, j, compressed);
        }
    }
}
