//! Level Chain: links each level's view to its coarser counterpart.
//!
//! A fine level carries [`MgData`] and owns the next coarser view; the
//! coarsest level carries neither. Every level runs the same decomposition,
//! halo and synchronization machinery at its own resolution.

use crate::error::DistError;
use crate::geometry::{Geometry, local_index};
use crate::matrix::SparseMatrixView;

/// Per-level multigrid configuration, consumed by the smoother.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MgData {
    pub number_of_presmoother_steps: usize,
    pub number_of_postsmoother_steps: usize,
    /// Fine local row of every coarse local row (injection at even points).
    pub f2c_operator: Vec<usize>,
}

impl MgData {
    pub fn new(
        fine: &Geometry,
        coarse: &Geometry,
        presmoother_steps: usize,
        postsmoother_steps: usize,
    ) -> Result<Self, DistError> {
        if fine.coarsen()? != *coarse {
            return Err(DistError::InvalidGeometry(format!(
                "{}x{}x{} is not the coarsening of {}x{}x{}",
                coarse.nx, coarse.ny, coarse.nz, fine.nx, fine.ny, fine.nz
            )));
        }
        let mut f2c_operator = vec![0; coarse.local_xyz()];
        for iz in 0..coarse.nz {
            for iy in 0..coarse.ny {
                for ix in 0..coarse.nx {
                    f2c_operator[local_index(coarse, ix, iy, iz)] =
                        local_index(fine, 2 * ix, 2 * iy, 2 * iz);
                }
            }
        }
        Ok(Self {
            number_of_presmoother_steps: presmoother_steps,
            number_of_postsmoother_steps: postsmoother_steps,
            f2c_operator,
        })
    }
}

fn coarsest_mut(view: &mut SparseMatrixView) -> &mut SparseMatrixView {
    match view.coarse {
        Some(ref mut next) => coarsest_mut(next),
        None => view,
    }
}

/// Hang `coarse` below the coarsest level currently reachable from `fine`.
pub fn attach_coarse(
    fine: &mut SparseMatrixView,
    coarse: SparseMatrixView,
    presmoother_steps: usize,
    postsmoother_steps: usize,
) -> Result<(), DistError> {
    let bottom = coarsest_mut(fine);
    if bottom.rank() != coarse.rank() {
        return Err(DistError::InvalidGeometry(format!(
            "coarse partition {} attached to fine partition {}",
            coarse.rank(),
            bottom.rank()
        )));
    }
    let data = MgData::new(
        bottom.geometry(),
        coarse.geometry(),
        presmoother_steps,
        postsmoother_steps,
    )?;
    bottom.mg_data = Some(data);
    bottom.coarse = Some(Box::new(coarse));
    Ok(())
}

/// Iterator over a level chain, finest first.
pub struct Levels<'a> {
    next: Option<&'a SparseMatrixView>,
}

impl<'a> Iterator for Levels<'a> {
    type Item = &'a SparseMatrixView;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;
        self.next = cur.coarse();
        Some(cur)
    }
}

pub fn levels(view: &SparseMatrixView) -> Levels<'_> {
    Levels { next: Some(view) }
}

/// Check that the chain stops at exactly `expected` levels.
///
/// Every level but the coarsest must carry [`MgData`]; the coarsest none.
pub fn verify_chain(view: &SparseMatrixView, expected: usize) -> Result<(), DistError> {
    let mut found = 0;
    for level in levels(view) {
        found += 1;
        if level.coarse.is_some() != level.mg_data.is_some() {
            return Err(DistError::BrokenLevelChain { expected, found });
        }
    }
    if found != expected {
        return Err(DistError::BrokenLevelChain { expected, found });
    }
    Ok(())
}

/// Diagnostics for one level of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelStats {
    pub level: usize,
    pub local_rows: usize,
    pub local_nonzeros: usize,
    pub total_rows: usize,
    pub total_nonzeros: usize,
    pub presmoother_steps: usize,
    pub postsmoother_steps: usize,
}

pub fn level_stats(view: &SparseMatrixView) -> Vec<LevelStats> {
    levels(view)
        .enumerate()
        .map(|(level, v)| {
            let s = v.summary();
            let (pre, post) = v
                .mg_data
                .as_ref()
                .map_or((0, 0), |m| (m.number_of_presmoother_steps, m.number_of_postsmoother_steps));
            LevelStats {
                level,
                local_rows: s.local_number_of_rows,
                local_nonzeros: s.local_number_of_nonzeros,
                total_rows: s.total_number_of_rows,
                total_nonzeros: s.total_number_of_nonzeros,
                presmoother_steps: pre,
                postsmoother_steps: post,
            }
        })
        .collect()
}

/// Bytes held by this partition across every level.
pub fn memory_footprint(view: &SparseMatrixView) -> usize {
    levels(view).map(SparseMatrixView::local_bytes).sum()
}

/// Floating-point operations of `niters` V-cycle preconditioner applications.
///
/// Each non-coarsest level costs its pre- and post-smoother sweeps at
/// `4 * nnz` each plus one residual at `2 * nnz`; the coarsest level costs one
/// symmetric sweep.
pub fn mg_flops(view: &SparseMatrixView, niters: usize) -> f64 {
    let n = niters as f64;
    levels(view)
        .map(|v| {
            let nnz = v.summary().total_number_of_nonzeros as f64;
            match &v.mg_data {
                Some(m) => {
                    let sweeps = (m.number_of_presmoother_steps + m.number_of_postsmoother_steps) as f64;
                    sweeps * n * 4.0 * nnz + n * 2.0 * nnz
                }
                None => n * 4.0 * nnz,
            }
        })
        .sum()
}
