//! Pairwise squared Euclidean distance matrices.
//!
//! The [`distance`] module holds the whole computation: validated input
//! batches, the strategies that turn two batches into a distance matrix, and
//! the helpers used to check those strategies against each other.

pub mod distance;

pub use distance::{
    DistanceError, DistanceMatrix, DistanceMatrixComputer, Result, Strategy, VectorBatch,
    pairwise_squared_distances,
};
