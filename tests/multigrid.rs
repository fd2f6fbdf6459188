//! Level chain tests for distmg
//!
//! These tests build multigrid hierarchies, walk their level chains, and run
//! halo exchanges on every level.
//!
//! - The chain stops at exactly the requested number of levels.
//! - Each level has its own neighbors, halo, and collectives.
//! - Accounting (statistics, memory, flop model) walks the whole chain.

use distmg::config::ProblemOptions;
use distmg::error::DistError;
use distmg::geometry::Geometry;
use distmg::halo::exchange_halo;
use distmg::matrix::{DistributedMatrix, SparseMatrixView, laplacian_27};
use distmg::multigrid::{level_stats, levels, memory_footprint, mg_flops, verify_chain};
use distmg::reduction::reduce_scalar;
use distmg::runtime::ReduceOp;

fn hierarchy(levels: usize) -> DistributedMatrix {
    let g = Geometry::new(4, 0, (2, 2, 1), (8, 8, 4), 27, 1).unwrap();
    DistributedMatrix::build_hierarchy(&g, levels, 1, 2, laplacian_27).unwrap()
}

#[test]
fn chain_has_requested_depth() {
    let m = hierarchy(3);
    assert_eq!(m.n_levels(), 3);
    for v in m.views() {
        verify_chain(v, 3).unwrap();
        assert_eq!(verify_chain(v, 2), Err(DistError::BrokenLevelChain { expected: 2, found: 3 }));
        assert_eq!(verify_chain(v, 4), Err(DistError::BrokenLevelChain { expected: 4, found: 3 }));
        let dims: Vec<_> = levels(v).map(|l| l.geometry().nx).collect();
        assert_eq!(dims, vec![8, 4, 2]);
    }
}

#[test]
fn too_deep_hierarchy_is_rejected() {
    let g = Geometry::new(1, 0, (1, 1, 1), (4, 4, 2), 27, 1).unwrap();
    assert!(matches!(
        DistributedMatrix::build_hierarchy(&g, 3, 1, 1, laplacian_27),
        Err(DistError::NotCoarsenable(1))
    ));
}

#[test]
fn stats_follow_coarsening() {
    let m = hierarchy(3);
    let stats = level_stats(m.view(0).unwrap());
    assert_eq!(stats.len(), 3);
    assert_eq!(stats[0].local_rows, 256);
    assert_eq!(stats[1].local_rows, 32);
    assert_eq!(stats[2].local_rows, 4);
    assert_eq!(stats[0].total_rows, 4 * 256);
    assert_eq!((stats[0].presmoother_steps, stats[0].postsmoother_steps), (1, 2));
    assert_eq!((stats[2].presmoother_steps, stats[2].postsmoother_steps), (0, 0));
    // the coarsest level is 4x4x1 globally
    assert_eq!(stats[2].total_nonzeros, 10 * 10);
}

#[test]
fn flop_model_walks_every_level() {
    let m = hierarchy(2);
    let v = m.view(0).unwrap();
    let nnz: Vec<f64> = levels(v).map(|l| l.summary().total_number_of_nonzeros as f64).collect();
    let expected = 10.0 * ((1.0 + 2.0) * 4.0 * nnz[0] + 2.0 * nnz[0]) + 10.0 * 4.0 * nnz[1];
    assert_eq!(mg_flops(v, 10), expected);
    let top = v.local_bytes();
    assert!(memory_footprint(v) > top);
}

/// Descend to `depth` levels below `v`.
fn level_mut(v: &mut SparseMatrixView, depth: usize) -> &mut SparseMatrixView {
    match depth {
        0 => v,
        _ => match v.coarse_mut() {
            Some(c) => level_mut(c, depth - 1),
            None => panic!("chain ended early"),
        },
    }
}

/// Every level exchanges and reduces independently.
#[test]
fn each_level_has_its_own_machinery() {
    let mut m = hierarchy(3);
    let out = m
        .launch(|_, v| {
            let mut results = Vec::new();
            for depth in 0..3 {
                let lv = level_mut(v, depth);
                let ncols = lv.summary().local_number_of_columns;
                let nrows = lv.summary().local_number_of_rows;
                let mut x = vec![-1.0; ncols];
                x[..nrows].fill(depth as f64);
                exchange_halo(lv, &mut x).unwrap();
                let all_level = x.iter().all(|&xi| xi == depth as f64);
                let rows = reduce_scalar(lv, nrows as f64, ReduceOp::Sum);
                results.push((all_level, rows));
            }
            results
        })
        .unwrap();
    for per_part in out {
        assert_eq!(per_part, vec![(true, 1024.0), (true, 128.0), (true, 16.0)]);
    }
}

#[test]
fn hierarchy_from_options() {
    let opts = ProblemOptions::default()
        .with_local_dims(4, 4, 4)
        .with_process_grid(2, 1, 1)
        .with_mg_levels(2)
        .with_smoother_steps(2, 2);
    let m = DistributedMatrix::from_options(&opts, 2, laplacian_27).unwrap();
    assert_eq!(m.n_levels(), 2);
    let f2c = &m.view(1).unwrap().mg_data.as_ref().unwrap().f2c_operator;
    assert_eq!(f2c.len(), 8);
    assert!(m.release() > 0);
}
