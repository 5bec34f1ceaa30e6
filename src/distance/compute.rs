use crate::distance::batch::VectorBatch;
use crate::distance::error::{DistanceError, Result};
use crate::distance::matrix::DistanceMatrix;
use nalgebra::DMatrix;
use std::cmp::{max, min};
use std::fmt;
use std::str::FromStr;
use std::thread;
use tracing::debug;

const DEFAULT_CHUNK_ROWS: usize = 256;

/// How the distance matrix is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Subtract every pair of rows, square and sum over features.
    Direct,
    /// `|x|² + |y|² - 2 x·y`, with the dot products from one matrix product.
    #[default]
    Expansion,
    /// [`Strategy::Expansion`] over row blocks of `x` on worker threads.
    Chunked,
}

impl FromStr for Strategy {
    type Err = DistanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Strategy::Direct),
            "expansion" => Ok(Strategy::Expansion),
            "chunked" => Ok(Strategy::Chunked),
            _ => Err(DistanceError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Direct => "direct",
            Strategy::Expansion => "expansion",
            Strategy::Chunked => "chunked",
        };
        f.write_str(name)
    }
}

/// Computes pairwise squared Euclidean distances between two batches.
///
/// `chunk_rows` and `workers` only matter for [`Strategy::Chunked`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceMatrixComputer {
    pub strategy: Strategy,
    pub chunk_rows: usize,
    pub workers: usize,
}

impl Default for DistanceMatrixComputer {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            chunk_rows: DEFAULT_CHUNK_ROWS,
            workers: max(num_cpus::get(), 1),
        }
    }
}

impl DistanceMatrixComputer {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Entry `(i, j)` of the result is the squared distance between row `i`
    /// of `x` and row `j` of `y`.
    ///
    /// Fails with [`DistanceError::ShapeMismatch`] when the batches have
    /// different column counts.
    pub fn compute(&self, x: &VectorBatch, y: &VectorBatch) -> Result<DistanceMatrix> {
        debug!(
            strategy = %self.strategy,
            x_rows = x.rows(),
            y_rows = y.rows(),
            cols = x.cols(),
            "Computing distance matrix"
        );
        match self.strategy {
            Strategy::Direct => direct(x, y),
            Strategy::Expansion => expansion(x, y),
            Strategy::Chunked => chunked(x, y, self.chunk_rows, self.workers),
        }
    }
}

/// [`DistanceMatrixComputer::compute`] with the default computer.
pub fn pairwise_squared_distances(x: &VectorBatch, y: &VectorBatch) -> Result<DistanceMatrix> {
    DistanceMatrixComputer::default().compute(x, y)
}

/// Direct difference. NaN in either row gives NaN, an infinite value with
/// otherwise finite rows gives `+inf`.
pub fn direct(x: &VectorBatch, y: &VectorBatch) -> Result<DistanceMatrix> {
    check_width(x, y)?;
    let (n, m) = (x.rows(), y.rows());
    let cols = x.cols();
    if cols == 0 {
        return Ok(DistanceMatrix::new(DMatrix::zeros(n, m)));
    }

    // Columns of the transposed batch are the original rows, contiguous.
    let xt = x.matrix().transpose();
    let yt = y.matrix().transpose();
    let xs: Vec<&[f64]> = xt.as_slice().chunks_exact(cols).collect();
    let ys: Vec<&[f64]> = yt.as_slice().chunks_exact(cols).collect();

    let out = DMatrix::from_fn(n, m, |i, j| squared_distance(xs[i], ys[j]));
    Ok(DistanceMatrix::new(out))
}

/// Algebraic expansion through a single dense matrix product.
///
/// Entries are `|‖x_i‖² + ‖y_j‖² − 2 x_i·y_j|`; the absolute value removes the
/// small negative values cancellation leaves near zero. Non-finite inputs
/// propagate, but an infinite value yields NaN rather than `+inf` since the
/// identity subtracts infinities.
pub fn expansion(x: &VectorBatch, y: &VectorBatch) -> Result<DistanceMatrix> {
    check_width(x, y)?;
    if x.cols() == 0 {
        return Ok(DistanceMatrix::new(DMatrix::zeros(x.rows(), y.rows())));
    }
    let yt = y.matrix().transpose();
    let y_norms = squared_norms(y.matrix());
    Ok(DistanceMatrix::new(expand(x.matrix(), &yt, &y_norms)))
}

/// Expansion over blocks of `chunk_rows` rows of `x`, at most `workers`
/// blocks computed at a time on scoped threads.
pub fn chunked(
    x: &VectorBatch,
    y: &VectorBatch,
    chunk_rows: usize,
    workers: usize,
) -> Result<DistanceMatrix> {
    check_width(x, y)?;
    if chunk_rows == 0 || workers == 0 {
        return Err(DistanceError::InvalidChunking {
            chunk_rows,
            workers,
        });
    }
    let n = x.rows();
    if x.cols() == 0 {
        return Ok(DistanceMatrix::new(DMatrix::zeros(n, y.rows())));
    }

    let yt = y.matrix().transpose();
    let y_norms = squared_norms(y.matrix());
    let blocks: Vec<(usize, usize)> = (0..n)
        .step_by(chunk_rows)
        .map(|start| (start, min(start + chunk_rows, n)))
        .collect();
    debug!(
        rows = n,
        chunk_rows,
        blocks = blocks.len(),
        workers,
        "Chunk plan"
    );

    let mut out = DMatrix::zeros(n, y.rows());
    for wave in blocks.chunks(workers) {
        let results = thread::scope(|s| {
            let handles: Vec<_> = wave
                .iter()
                .map(|&(start, end)| {
                    let block = x.matrix().rows(start, end - start).into_owned();
                    let yt = &yt;
                    let y_norms = &y_norms;
                    let handle = s.spawn(move || expand(&block, yt, y_norms));
                    (start, end, handle)
                })
                .collect();
            // Join every handle so a panicked worker never escapes the scope.
            handles
                .into_iter()
                .map(|(start, end, handle)| {
                    handle
                        .join()
                        .map(|block| (start, block))
                        .map_err(|_| DistanceError::WorkerPanicked { start, end })
                })
                .collect::<Vec<_>>()
        });

        for result in results {
            let (start, block) = result?;
            out.rows_mut(start, block.nrows()).copy_from(&block);
        }
    }
    Ok(DistanceMatrix::new(out))
}

fn check_width(x: &VectorBatch, y: &VectorBatch) -> Result<()> {
    if x.cols() != y.cols() {
        return Err(DistanceError::ShapeMismatch {
            x: x.cols(),
            y: y.cols(),
        });
    }
    Ok(())
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    let mut t: f64;
    for (p, q) in a.iter().zip(b) {
        t = p - q;
        s += t * t;
    }
    s
}

fn squared_norms(m: &DMatrix<f64>) -> Vec<f64> {
    m.row_iter().map(|row| row.norm_squared()).collect()
}

/// `yt` is the transposed second batch and `y_norms` its squared row norms.
fn expand(x: &DMatrix<f64>, yt: &DMatrix<f64>, y_norms: &[f64]) -> DMatrix<f64> {
    let x_norms = squared_norms(x);
    let mut out = x * yt;
    for (j, mut column) in out.column_iter_mut().enumerate() {
        for (i, v) in column.iter_mut().enumerate() {
            *v = (x_norms[i] + y_norms[j] - 2.0 * *v).abs();
        }
    }
    out
}
