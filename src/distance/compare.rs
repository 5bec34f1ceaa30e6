use crate::distance::batch::VectorBatch;
use crate::distance::compute::{direct, expansion};
use crate::distance::error::{DistanceError, Result};
use crate::distance::matrix::DistanceMatrix;

/// Largest difference between two distance matrices of the same shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    pub max_abs: f64,
    /// Difference relative to `max(|a|, |b|, 1)`.
    pub max_rel: f64,
}

impl Discrepancy {
    /// False when the discrepancy is NaN.
    pub fn within(&self, abs_tolerance: f64) -> bool {
        self.max_abs <= abs_tolerance
    }
}

/// NaN on either side makes both fields NaN.
pub fn discrepancy(a: &DistanceMatrix, b: &DistanceMatrix) -> Result<Discrepancy> {
    if a.shape() != b.shape() {
        return Err(DistanceError::MatrixShapeMismatch {
            left: a.shape(),
            right: b.shape(),
        });
    }
    let mut max_abs = 0f64;
    let mut max_rel = 0f64;
    for (p, q) in a.matrix().iter().zip(b.matrix().iter()) {
        let diff = (p - q).abs();
        if diff.is_nan() {
            return Ok(Discrepancy {
                max_abs: f64::NAN,
                max_rel: f64::NAN,
            });
        }
        let scale = p.abs().max(q.abs()).max(1.0);
        max_abs = max_abs.max(diff);
        max_rel = max_rel.max(diff / scale);
    }
    Ok(Discrepancy { max_abs, max_rel })
}

/// Runs the direct and expansion strategies on the same input and fails with
/// [`DistanceError::StrategiesDisagree`] when they differ by more than
/// `abs_tolerance`.
pub fn validate_strategies(
    x: &VectorBatch,
    y: &VectorBatch,
    abs_tolerance: f64,
) -> Result<Discrepancy> {
    let reference = direct(x, y)?;
    let expanded = expansion(x, y)?;
    let found = discrepancy(&reference, &expanded)?;
    if !found.within(abs_tolerance) {
        return Err(DistanceError::StrategiesDisagree {
            max_abs: found.max_abs,
            tolerance: abs_tolerance,
        });
    }
    Ok(found)
}
