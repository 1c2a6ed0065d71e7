use serde::{Deserialize, Serialize};

use crate::error::MatcherError;

/// A correspondence between a query descriptor and a train descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DMatch {
    /// Index into the first (query) descriptor set.
    pub query_idx: usize,
    /// Index into the second (train) descriptor set.
    pub train_idx: usize,
    /// Dissimilarity under the configured norm.
    pub distance: f32,
}

impl DMatch {
    /// Create a new match.
    pub fn new(query_idx: usize, train_idx: usize, distance: f32) -> Self {
        Self {
            query_idx,
            train_idx,
            distance,
        }
    }
}

/// The two nearest train descriptors of a single query, ordered by distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnnMatch {
    /// Closest train descriptor.
    pub best: DMatch,
    /// Runner-up train descriptor.
    pub second: DMatch,
}

/// Dense boolean matrix of permitted `(query, train)` pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchMask {
    rows: usize,
    cols: usize,
    data: Vec<bool>,
}

impl MatchMask {
    /// A `rows x cols` mask with every pair set to `value`.
    pub fn new(rows: usize, cols: usize, value: bool) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Build a mask by evaluating `f(query, train)` for every pair.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Build a mask from nested rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self, MatcherError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(MatcherError::MaskShapeMismatch {
                    expected: (rows.len(), cols),
                    actual: (i, row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of query rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of train columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the pair `(query, train)` may be matched.
    #[inline]
    pub fn allowed(&self, query: usize, train: usize) -> bool {
        self.data[query * self.cols + train]
    }

    /// Set whether the pair `(query, train)` may be matched.
    pub fn set(&mut self, query: usize, train: usize, value: bool) {
        self.data[query * self.cols + train] = value;
    }

    pub(crate) fn check_shape(&self, rows: usize, cols: usize) -> Result<(), MatcherError> {
        if self.rows != rows || self.cols != cols {
            return Err(MatcherError::MaskShapeMismatch {
                expected: (rows, cols),
                actual: (self.rows, self.cols),
            });
        }
        Ok(())
    }
}

/// Counts recorded at each stage of a matching call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    /// Matches (cross-check mode) or match pairs (k-NN mode) from the raw search.
    pub num_raw_matches: usize,
    /// Matches surviving the distance or ratio filter.
    pub num_filtered_matches: usize,
    /// Matches surviving geometric outlier rejection, if it ran.
    pub num_good_matches: Option<usize>,
}

/// Output of a matching call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Accepted correspondences in query order.
    pub matches: Vec<DMatch>,
    /// Per-stage counts.
    pub stats: MatchStats,
}
