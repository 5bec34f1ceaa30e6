use nalgebra::DMatrix;

/// Squared distances between every row of one batch (matrix rows) and every
/// row of another (matrix columns).
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    data: DMatrix<f64>,
}

impl DistanceMatrix {
    pub(crate) fn new(data: DMatrix<f64>) -> Self {
        Self { data }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    /// Entry `(i, j)`, or `None` when out of bounds.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.data.get((i, j)).copied()
    }

    /// Copy of row `i`. Panics when `i` is out of bounds.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data.row(i).iter().copied().collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows()).map(|i| self.row(i)).collect()
    }

    /// The matrix with the roles of the two batches swapped.
    pub fn transpose(&self) -> Self {
        Self::new(self.data.transpose())
    }

    /// Square, and `|a_ij - a_ji| <= tolerance` for every pair. A NaN off the
    /// diagonal makes the matrix asymmetric.
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let (rows, cols) = self.shape();
        if rows != cols {
            return false;
        }
        for i in 0..rows {
            for j in (i + 1)..cols {
                let diff = (self.data[(i, j)] - self.data[(j, i)]).abs();
                if !(diff <= tolerance) {
                    return false;
                }
            }
        }
        true
    }

    /// Largest entry, ignoring NaN. `None` for an empty or all-NaN matrix.
    pub fn max_value(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| match acc {
                Some(m) if m >= v => Some(m),
                _ => Some(v),
            })
    }

    /// For every row, the column holding the smallest distance. Ties go to the
    /// lowest column and NaN entries are never picked. A row with no
    /// candidate maps to `None`.
    pub fn nearest(&self) -> Vec<Option<usize>> {
        (0..self.rows())
            .map(|i| {
                let mut best: Option<(usize, f64)> = None;
                for (j, &d) in self.data.row(i).iter().enumerate() {
                    if d.is_nan() {
                        continue;
                    }
                    match best {
                        Some((_, m)) if d >= m => {}
                        _ => best = Some((j, d)),
                    }
                }
                best.map(|(j, _)| j)
            })
            .collect()
    }

    pub(crate) fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize, values: &[f64]) -> DistanceMatrix {
        DistanceMatrix::new(DMatrix::from_row_slice(rows, cols, values))
    }

    #[test]
    fn symmetric_requires_square() {
        assert!(!matrix(1, 2, &[0.0, 1.0]).is_symmetric(1e-9));
        assert!(matrix(2, 2, &[0.0, 25.0, 25.0, 0.0]).is_symmetric(1e-9));
        assert!(!matrix(2, 2, &[0.0, 25.0, 24.0, 0.0]).is_symmetric(1e-9));
        assert!(matrix(2, 2, &[0.0, 25.0, 24.5, 0.0]).is_symmetric(0.5));
        assert!(!matrix(2, 2, &[0.0, f64::NAN, f64::NAN, 0.0]).is_symmetric(1e-9));
        assert!(!matrix(2, 2, &[0.0, 25.0, f64::NAN, 0.0]).is_symmetric(f64::INFINITY));
        assert!(matrix(2, 2, &[f64::NAN, 1.0, 1.0, 0.0]).is_symmetric(1e-9));
    }

    #[test]
    fn transpose_swaps_indices() {
        let m = matrix(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = m.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.get(2, 1), Some(6.0));
        assert_eq!(t.get(0, 1), Some(4.0));
        assert_eq!(t.get(3, 0), None);
    }

    #[test]
    fn rows_come_back_in_order() {
        let m = matrix(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(m.to_rows(), vec![vec![0.0, 1.0], vec![2.0, 3.0]]);
    }

    #[test]
    fn max_value_skips_nan() {
        let m = matrix(1, 3, &[1.0, f64::NAN, 4.0]);
        assert_eq!(m.max_value(), Some(4.0));
        assert_eq!(matrix(0, 0, &[]).max_value(), None);
        assert_eq!(matrix(1, 1, &[f64::NAN]).max_value(), None);
    }

    #[test]
    fn nearest_picks_smallest_column() {
        let m = matrix(
            3,
            3,
            &[
                4.0, 1.0, 9.0, //
                2.0, 2.0, 3.0, //
                f64::NAN, 8.0, 7.0,
            ],
        );
        assert_eq!(m.nearest(), vec![Some(1), Some(0), Some(2)]);
        assert_eq!(matrix(2, 0, &[]).nearest(), vec![None, None]);
    }
}
