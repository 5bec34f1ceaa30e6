pub mod batch;
pub mod compare;
pub mod compute;
pub mod error;
pub mod matrix;

pub use batch::VectorBatch;
pub use compare::{Discrepancy, discrepancy, validate_strategies};
pub use compute::{
    DistanceMatrixComputer, Strategy, chunked, direct, expansion, pairwise_squared_distances,
};
pub use error::{DistanceError, Result};
pub use matrix::DistanceMatrix;
