use crate::distance::error::{DistanceError, Result};
use nalgebra::DMatrix;
use rand::Rng;
use rand::distr::Uniform;
use std::ops::Range;

/// A rectangular table of feature vectors, one sample per row.
///
/// Every row has the same number of columns. Values are not required to be
/// finite; non-finite values flow through the distance computation unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorBatch {
    data: DMatrix<f64>,
}

impl VectorBatch {
    /// Builds a batch from owned rows. An empty `rows` gives a 0x0 batch.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(DistanceError::RaggedRow {
                    row: i,
                    expected: cols,
                    found: row.len(),
                });
            }
            values.extend_from_slice(row);
        }
        Ok(Self {
            data: DMatrix::from_row_slice(rows.len(), cols, &values),
        })
    }

    /// Builds a batch from values laid out row after row.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Result<Self> {
        let mismatch = |expected| DistanceError::LengthMismatch {
            rows,
            cols,
            expected,
            found: values.len(),
        };
        // An overflowing shape cannot match any slice.
        let expected = rows.checked_mul(cols).ok_or_else(|| mismatch(usize::MAX))?;
        if values.len() != expected {
            return Err(mismatch(expected));
        }
        Ok(Self {
            data: DMatrix::from_row_slice(rows, cols, values),
        })
    }

    /// Uniformly distributed values in `range`. Fails with
    /// [`DistanceError::InvalidRange`] when the range is empty, has an
    /// infinite bound or a span that overflows `f64`.
    pub fn random<R: Rng>(
        rows: usize,
        cols: usize,
        range: Range<f64>,
        rng: &mut R,
    ) -> Result<Self> {
        let dist =
            Uniform::new(range.start, range.end).map_err(|_| DistanceError::InvalidRange {
                low: range.start,
                high: range.end,
            })?;
        let data = DMatrix::from_fn(rows, cols, |_, _| rng.sample(&dist));
        Ok(Self { data })
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Copy of row `i`. Panics when `i` is out of bounds.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data.row(i).iter().copied().collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub(crate) fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}
