use thiserror::Error;

pub type Result<T> = std::result::Result<T, DistanceError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistanceError {
    /// The two batches do not live in the same feature space.
    #[error("feature width mismatch: x has {x} columns, y has {y}")]
    ShapeMismatch { x: usize, y: usize },

    #[error("row {row} has {found} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} values for a {rows}x{cols} batch, got {found}")]
    LengthMismatch {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },

    /// Empty, or too wide to sample uniformly with finite values.
    #[error("invalid value range {low}..{high}")]
    InvalidRange { low: f64, high: f64 },

    #[error("matrix shapes differ: {left:?} vs {right:?}")]
    MatrixShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("chunk rows and workers must be positive (chunk_rows={chunk_rows}, workers={workers})")]
    InvalidChunking { chunk_rows: usize, workers: usize },

    #[error("worker computing rows {start}..{end} panicked")]
    WorkerPanicked { start: usize, end: usize },

    #[error("strategies disagree: max abs discrepancy {max_abs} exceeds tolerance {tolerance}")]
    StrategiesDisagree { max_abs: f64, tolerance: f64 },

    #[error("unknown strategy {0:?}, expected one of direct, expansion, chunked")]
    UnknownStrategy(String),
}
