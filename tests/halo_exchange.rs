//! Halo negotiation and exchange tests for distmg
//!
//! These tests set up the halo of small process grids and run the two-phase
//! pull exchange concurrently, one task per partition.
//!
//! - Neighbor lists, send lengths and pull ranges agree on both sides of every pair.
//! - After each exchange every halo column equals the owner's current value,
//!   across consecutive generations.
//! - Boundary partitions report fewer than `stencil_size - 1` neighbors.

use approx::assert_abs_diff_eq;
use distmg::error::DistError;
use distmg::geometry::Geometry;
use distmg::halo::{NEIGHBOR_OFFSETS, exchange_halo, shared_points};
use distmg::matrix::{DistributedMatrix, SparseMatrix, SparseMatrixView, laplacian_27, to_csr};

/// Builds a populated matrix with its halo wired.
fn wired(grid: (usize, usize, usize), local: (usize, usize, usize)) -> DistributedMatrix {
    let size = grid.0 * grid.1 * grid.2;
    let g = Geometry::new(size, 0, grid, local, 27, 1).unwrap();
    let mut m = DistributedMatrix::new(&g).unwrap();
    m.populate_structure(laplacian_27).unwrap();
    m.setup_halo().unwrap();
    m
}

/// Global id of every local column: owned rows, then the halo.
fn column_globals(v: &SparseMatrixView) -> Vec<usize> {
    let mut globals = v.local_to_global_map.to_vec();
    globals.resize(v.summary().local_number_of_columns, usize::MAX);
    for (&global, &local) in &v.external_to_local_map {
        globals[local] = global;
    }
    globals
}

fn value(global: usize, generation: usize) -> f64 {
    global as f64 + 1000.0 * generation as f64
}

#[test]
fn corner_partition_of_2x2x1() {
    let m = wired((2, 2, 1), (4, 4, 4));
    let v = m.view(0).unwrap();
    let s = v.summary();
    // east, north, and the diagonal edge between them
    assert_eq!(v.neighbor_ranks(), &[1, 2, 3]);
    assert_eq!(&v.send_length[..], &[16, 16, 4]);
    assert_eq!(s.number_of_send_neighbors, 3);
    assert_eq!(s.total_to_be_sent, 36);
    assert_eq!(s.number_of_external_values, 36);
    assert_eq!(s.local_number_of_columns, 64 + 36);
    assert!(s.number_of_send_neighbors < v.geometry().max_neighbors());
    assert_eq!(v.neighbors.len(), s.number_of_send_neighbors);
    assert_eq!(v.pull_bes.len(), s.number_of_send_neighbors);

    // The east face is x == 3 of the local block.
    let g = v.geometry();
    let east = shared_points(g, (1, 0, 0));
    assert!(east.iter().all(|&i| i % g.nx == g.nx - 1));
    assert_eq!(&v.elements_to_send.as_ref().unwrap()[..16], &east[..]);
}

#[test]
fn send_and_pull_sizes_are_symmetric() {
    let m = wired((3, 2, 2), (3, 2, 4));
    for p in m.views() {
        let s = p.summary();
        assert!(s.total_to_be_sent <= p.pull_buffer.len());
        for (i, &q) in p.neighbor_ranks().iter().enumerate() {
            let nbr = m.view(q).unwrap();
            let j = nbr.neighbor_ranks().iter().position(|&r| r == p.rank()).unwrap();
            // What p pulls from q is exactly what q sends to p.
            assert_eq!(p.pull_bes[i].extent, nbr.send_length[j]);
            let base: usize = nbr.send_length[..j].iter().sum();
            assert_eq!(p.pull_bes[i].base, base);
            assert!(p.pull_bes[i].end() <= nbr.summary().total_to_be_sent);
            assert!(nbr.summary().total_to_be_sent < nbr.summary().local_number_of_columns);
        }
        assert_eq!(s.total_to_be_sent, s.number_of_external_values);
        assert!(s.number_of_send_neighbors <= NEIGHBOR_OFFSETS.len());
    }
}

#[test]
fn interior_partition_has_every_neighbor() {
    let m = wired((3, 3, 3), (2, 2, 2));
    let center = m.view(13).unwrap();
    assert_eq!(center.summary().number_of_send_neighbors, 26);
    for v in m.views().iter().filter(|v| v.rank() != 13) {
        assert!(v.summary().number_of_send_neighbors < 26);
    }
}

/// Halo values track the owner over three back-to-back generations.
#[test]
fn exchange_is_current_every_generation() {
    let mut m = wired((2, 2, 2), (3, 3, 3));
    let stale = m
        .launch(|_, v| {
            let globals = column_globals(v);
            let nrows = v.summary().local_number_of_rows;
            let mut x = vec![f64::NAN; globals.len()];
            let mut stale = 0;
            for generation in 0..3 {
                for (xi, &gid) in x.iter_mut().zip(&globals).take(nrows) {
                    *xi = value(gid, generation);
                }
                exchange_halo(v, &mut x)?;
                stale += x
                    .iter()
                    .zip(&globals)
                    .filter(|&(&xi, &gid)| xi != value(gid, generation))
                    .count();
            }
            Ok::<usize, DistError>(stale)
        })
        .unwrap();
    for (p, s) in stale.into_iter().enumerate() {
        assert_eq!(s.unwrap(), 0, "partition {p} saw stale halo values");
    }
}

/// A local product with the exchanged vector equals the global product.
#[test]
fn local_block_applies_after_exchange() {
    let mut m = wired((2, 1, 1), (3, 3, 3));
    let sums = m
        .launch(|_, v| {
            let nrows = v.summary().local_number_of_rows;
            let mut x = vec![f64::NAN; v.summary().local_number_of_columns];
            x[..nrows].fill(1.0);
            exchange_halo(v, &mut x).unwrap();
            let a = to_csr(v).unwrap();
            let mut y = vec![0.0; nrows];
            a.spmv(&x, &mut y);
            // Row sums of the operator: 26 minus the off-diagonal count.
            (0..nrows)
                .map(|r| {
                    let nnz = v.nonzeros_in_row[r] as f64;
                    (y[r] - (26.0 - (nnz - 1.0))).abs()
                })
                .fold(0.0, f64::max)
        })
        .unwrap();
    for err in sums {
        assert_abs_diff_eq!(err, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn exchange_before_setup_is_rejected() {
    let g = Geometry::new(2, 0, (2, 1, 1), (2, 2, 2), 27, 1).unwrap();
    let mut m = DistributedMatrix::new(&g).unwrap();
    m.populate_structure(laplacian_27).unwrap();
    let v = &mut m.views_mut()[0];
    let mut x = vec![0.0; 8];
    assert!(matches!(exchange_halo(v, &mut x), Err(DistError::HaloNotReady(_))));
}
