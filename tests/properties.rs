use rand::SeedableRng;
use rand::rngs::StdRng;
use sqdist::distance::{
    DistanceMatrixComputer, Strategy, VectorBatch, chunked, direct, discrepancy, expansion,
    validate_strategies,
};
use sqdist::{DistanceError, pairwise_squared_distances};

const STRATEGIES: [Strategy; 3] = [Strategy::Direct, Strategy::Expansion, Strategy::Chunked];

fn random_batch(rows: usize, cols: usize, seed: u64) -> VectorBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    VectorBatch::random(rows, cols, 0.0..10.0, &mut rng).unwrap()
}

fn small_chunks(strategy: Strategy) -> DistanceMatrixComputer {
    DistanceMatrixComputer {
        strategy,
        chunk_rows: 7,
        workers: 3,
    }
}

#[test]
fn two_points_three_four_five() {
    let x = VectorBatch::from_rows(vec![vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
    for strategy in STRATEGIES {
        let d = small_chunks(strategy).compute(&x, &x).unwrap();
        let rows = d.to_rows();
        assert_eq!(rows.len(), 2, "{strategy}");
        for (got, want) in rows.iter().flatten().zip([0.0, 25.0, 25.0, 0.0]) {
            assert!((got - want).abs() < 1e-12, "{strategy}: {got} != {want}");
        }
    }
}

#[test]
fn single_pair_in_three_dimensions() {
    let x = VectorBatch::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
    let y = VectorBatch::from_rows(vec![vec![4.0, 5.0, 6.0]]).unwrap();
    for strategy in STRATEGIES {
        let d = small_chunks(strategy).compute(&x, &y).unwrap();
        assert_eq!(d.shape(), (1, 1));
        assert!((d.get(0, 0).unwrap() - 27.0).abs() < 1e-12, "{strategy}");
    }
}

#[test]
fn self_distance_is_symmetric_with_zero_diagonal() {
    let x = random_batch(40, 6, 1);
    for strategy in STRATEGIES {
        let d = small_chunks(strategy).compute(&x, &x).unwrap();
        assert!(d.is_symmetric(1e-9), "{strategy}");
        for i in 0..x.rows() {
            assert!(d.get(i, i).unwrap().abs() < 1e-9, "{strategy}: diagonal {i}");
        }
    }
}

#[test]
fn entries_are_non_negative() {
    let x = random_batch(30, 4, 2);
    let y = random_batch(25, 4, 3);
    for strategy in STRATEGIES {
        let d = small_chunks(strategy).compute(&x, &y).unwrap();
        assert!(d.to_rows().iter().flatten().all(|v| *v >= 0.0), "{strategy}");
    }
}

#[test]
fn direct_and_expansion_agree_on_random_input() {
    for seed in 0..5 {
        let x = random_batch(50, 10, seed);
        let y = random_batch(50, 10, seed + 100);
        let found = validate_strategies(&x, &y, 1e-6).unwrap();
        assert!(found.max_rel < 1e-9, "seed {seed}: {found:?}");
    }
}

#[test]
fn chunked_matches_expansion_for_any_block_size() {
    let x = random_batch(37, 5, 4);
    let y = random_batch(11, 5, 5);
    let reference = expansion(&x, &y).unwrap();
    for chunk_rows in [1, 4, 36, 37, 100] {
        for workers in [1, 2, 8] {
            let d = chunked(&x, &y, chunk_rows, workers).unwrap();
            assert!(
                discrepancy(&reference, &d).unwrap().within(1e-9),
                "chunk_rows={chunk_rows} workers={workers}"
            );
        }
    }
}

#[test]
fn swapping_inputs_transposes_the_matrix() {
    let x = random_batch(12, 3, 6);
    let y = random_batch(9, 3, 7);
    for strategy in STRATEGIES {
        let computer = small_chunks(strategy);
        let xy = computer.compute(&x, &y).unwrap();
        let yx = computer.compute(&y, &x).unwrap();
        assert_eq!(xy.shape(), (12, 9));
        assert!(discrepancy(&xy, &yx.transpose()).unwrap().within(1e-9), "{strategy}");
    }
}

#[test]
fn width_mismatch_is_a_shape_error() {
    let x = random_batch(3, 4, 8);
    let y = random_batch(3, 5, 9);
    assert_eq!(
        pairwise_squared_distances(&x, &y).unwrap_err(),
        DistanceError::ShapeMismatch { x: 4, y: 5 }
    );
    assert!(matches!(direct(&x, &y), Err(DistanceError::ShapeMismatch { .. })));
}

#[test]
fn nan_spreads_to_row_and_column() {
    let mut rows = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
    rows[1][0] = f64::NAN;
    let x = VectorBatch::from_rows(rows).unwrap();
    for strategy in STRATEGIES {
        let d = small_chunks(strategy).compute(&x, &x).unwrap();
        for k in 0..3 {
            assert!(d.get(1, k).unwrap().is_nan(), "{strategy}");
            assert!(d.get(k, 1).unwrap().is_nan(), "{strategy}");
        }
        assert!((d.get(0, 2).unwrap() - 32.0).abs() < 1e-12, "{strategy}");
    }
}

#[test]
fn nearest_matches_brute_force_assignment() {
    let points = random_batch(60, 3, 10);
    let centroids = random_batch(5, 3, 11);
    let d = pairwise_squared_distances(&points, &centroids).unwrap();
    let reference = direct(&points, &centroids).unwrap();
    for (i, nearest) in d.nearest().into_iter().enumerate() {
        let j = nearest.unwrap();
        let best = reference.row(i).into_iter().fold(f64::INFINITY, f64::min);
        assert!((reference.get(i, j).unwrap() - best).abs() < 1e-9);
    }
}
