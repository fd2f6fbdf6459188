//! Decomposition tests for distmg
//!
//! These tests declare and bind the distributed matrix, unpack every
//! partition, populate the 27-point structure, and check the row and nonzero
//! totals against the per-partition counts.
//!
//! - Local rows summed over partitions equal the global row count.
//! - Local nonzeros summed over partitions equal the reduced global total.
//! - Geometries come from `ProblemOptions`, with and without an explicit grid.

use distmg::config::ProblemOptions;
use distmg::error::DistError;
use distmg::geometry::Geometry;
use distmg::matrix::{DistributedMatrix, LogicalSparseMatrix, SparseMatrixView, laplacian_27};
use rand::Rng;

/// Builds a populated single-level matrix over the given grid.
fn populated(grid: (usize, usize, usize), local: (usize, usize, usize)) -> DistributedMatrix {
    let size = grid.0 * grid.1 * grid.2;
    let g = Geometry::new(size, 0, grid, local, 27, 1).unwrap();
    let mut m = DistributedMatrix::new(&g).unwrap();
    m.populate_structure(laplacian_27).unwrap();
    m
}

/// Nonzeros of the 27-point operator on a `gx * gy * gz` grid.
fn stencil_nnz(gx: usize, gy: usize, gz: usize) -> usize {
    let line = |n: usize| if n == 1 { 1 } else { 3 * n - 2 };
    line(gx) * line(gy) * line(gz)
}

#[test]
fn row_and_nonzero_totals_match() {
    let m = populated((2, 2, 1), (4, 4, 4));
    let rows: usize = m.views().iter().map(|v| v.summary().local_number_of_rows).sum();
    let nnz: usize = m.views().iter().map(|v| v.summary().local_number_of_nonzeros).sum();
    for v in m.views() {
        assert_eq!(v.summary().total_number_of_rows, rows);
        assert_eq!(v.summary().total_number_of_nonzeros, nnz);
    }
    assert_eq!(rows, 256);
    assert_eq!(nnz, stencil_nnz(8, 8, 4));
}

/// Random grids and block shapes keep the totals consistent.
#[test]
fn random_grids_keep_totals() {
    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let grid = (rng.gen_range(1..4), rng.gen_range(1..3), rng.gen_range(1..3));
        let local = (rng.gen_range(1..5), rng.gen_range(1..5), rng.gen_range(1..5));
        let m = populated(grid, local);
        let g = m.geometry();
        let nnz: usize = m.views().iter().map(|v| v.summary().local_number_of_nonzeros).sum();
        assert_eq!(nnz, stencil_nnz(g.gnx(), g.gny(), g.gnz()));
        assert!(m.views().iter().all(|v| v.summary().total_number_of_nonzeros == nnz));
    }
}

#[test]
fn local_to_global_inverts_global_to_local() {
    let m = populated((2, 1, 2), (3, 2, 2));
    for v in m.views() {
        for (local, &global) in v.local_to_global_map.iter().enumerate() {
            assert_eq!(v.global_to_local_map[&global], local);
        }
    }
}

#[test]
fn options_derive_a_cubic_grid() {
    let opts = ProblemOptions::default().with_local_dims(4, 4, 4).with_mg_levels(1);
    let g = Geometry::from_options(&opts, 8, 5).unwrap();
    assert_eq!((g.npx, g.npy, g.npz), (2, 2, 2));
    assert_eq!((g.ipx, g.ipy, g.ipz), (1, 0, 1));

    let opts = opts.with_process_grid(4, 1, 2);
    let g = Geometry::from_options(&opts, 8, 5).unwrap();
    assert_eq!((g.ipx, g.ipy, g.ipz), (1, 0, 1));
    assert_eq!(
        Geometry::from_options(&opts, 6, 0),
        Err(DistError::GridMismatch { size: 6, npx: 4, npy: 1, npz: 2 })
    );
}

/// Each partition's slot in every container can be taken once.
#[test]
fn every_partition_unpacks_once() {
    let g = Geometry::new(3, 0, (3, 1, 1), (2, 2, 2), 27, 1).unwrap();
    let mut decl = LogicalSparseMatrix::declare(&g).unwrap();
    decl.bind(3).unwrap();
    for part in 0..3 {
        let v = SparseMatrixView::unpack(&mut decl, part).unwrap();
        assert_eq!(v.rank(), part);
        assert!(v.reductions.arrivals() == 3);
    }
    assert!(SparseMatrixView::unpack(&mut decl, 0).is_err());
    assert!(decl.release() > 0);
}
