//! Geometry of the process grid and of this process's local sub-grid.
//!
//! A [`Geometry`] is a pure value: it is created once, validated, and then
//! replicated read-only to every partition. Everything else in the crate
//! (decomposition, neighbor discovery, addressing) is a deterministic
//! function of it.

pub mod addressing;
pub use addressing::{
    global_coords, global_row, global_row_of, local_coords, local_index, local_row, owner_of,
};

use crate::config::ProblemOptions;
use crate::error::DistError;

/// Process-grid shape, this process's coordinate in it, and the local sub-grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Geometry {
    /// Total number of processes.
    pub size: usize,
    /// This process's rank.
    pub rank: usize,
    pub npx: usize,
    pub npy: usize,
    pub npz: usize,
    pub ipx: usize,
    pub ipy: usize,
    pub ipz: usize,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Max candidate neighbors + 1.
    pub stencil_size: usize,
    pub num_threads: usize,
}

impl Geometry {
    /// Build and validate a geometry for `rank` on an explicit process grid.
    pub fn new(
        size: usize,
        rank: usize,
        (npx, npy, npz): (usize, usize, usize),
        (nx, ny, nz): (usize, usize, usize),
        stencil_size: usize,
        num_threads: usize,
    ) -> Result<Self, DistError> {
        if size == 0 || rank >= size {
            return Err(DistError::InvalidGeometry(format!(
                "rank {rank} out of range for size {size}"
            )));
        }
        if npx * npy * npz != size {
            return Err(DistError::GridMismatch { size, npx, npy, npz });
        }
        let ipz = rank / (npx * npy);
        let ipy = (rank - ipz * npx * npy) / npx;
        let ipx = rank % npx;
        let geom = Self {
            size,
            rank,
            npx,
            npy,
            npz,
            ipx,
            ipy,
            ipz,
            nx,
            ny,
            nz,
            stencil_size,
            num_threads,
        };
        geom.validate()?;
        Ok(geom)
    }

    /// Build a geometry, factoring `size` into the most cubic process grid.
    pub fn generate(
        size: usize,
        rank: usize,
        local: (usize, usize, usize),
        stencil_size: usize,
        num_threads: usize,
    ) -> Result<Self, DistError> {
        let grid = optimal_process_grid(size)?;
        Self::new(size, rank, grid, local, stencil_size, num_threads)
    }

    /// Build a geometry from validated problem options.
    pub fn from_options(opts: &ProblemOptions, size: usize, rank: usize) -> Result<Self, DistError> {
        opts.validate()?;
        let local = (opts.nx, opts.ny, opts.nz);
        match (opts.npx, opts.npy, opts.npz) {
            (Some(px), Some(py), Some(pz)) => {
                Self::new(size, rank, (px, py, pz), local, opts.stencil_size, opts.num_threads)
            }
            _ => Self::generate(size, rank, local, opts.stencil_size, opts.num_threads),
        }
    }

    /// Check every structural invariant of the geometry.
    pub fn validate(&self) -> Result<(), DistError> {
        if self.npx * self.npy * self.npz != self.size {
            return Err(DistError::GridMismatch {
                size: self.size,
                npx: self.npx,
                npy: self.npy,
                npz: self.npz,
            });
        }
        if self.ipx >= self.npx || self.ipy >= self.npy || self.ipz >= self.npz {
            return Err(DistError::InvalidGeometry(format!(
                "coordinate ({}, {}, {}) outside grid {}x{}x{}",
                self.ipx, self.ipy, self.ipz, self.npx, self.npy, self.npz
            )));
        }
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(DistError::InvalidGeometry("local dimensions must be positive".into()));
        }
        if self.stencil_size < 2 {
            return Err(DistError::InvalidGeometry("stencil size must be at least 2".into()));
        }
        Ok(())
    }

    /// Same process grid and sub-grid, seen from another rank.
    pub fn with_rank(&self, rank: usize) -> Result<Self, DistError> {
        Self::new(
            self.size,
            rank,
            (self.npx, self.npy, self.npz),
            (self.nx, self.ny, self.nz),
            self.stencil_size,
            self.num_threads,
        )
    }

    /// Geometry of the next coarser level: every local dimension halved.
    pub fn coarsen(&self) -> Result<Self, DistError> {
        for d in [self.nx, self.ny, self.nz] {
            if d < 2 || d % 2 != 0 {
                return Err(DistError::NotCoarsenable(d));
            }
        }
        Ok(Self { nx: self.nx / 2, ny: self.ny / 2, nz: self.nz / 2, ..*self })
    }

    #[inline]
    pub fn gnx(&self) -> usize { self.npx * self.nx }
    #[inline]
    pub fn gny(&self) -> usize { self.npy * self.ny }
    #[inline]
    pub fn gnz(&self) -> usize { self.npz * self.nz }

    /// Number of rows owned by one process.
    #[inline]
    pub fn local_xyz(&self) -> usize { self.nx * self.ny * self.nz }

    /// Number of rows in the whole problem.
    #[inline]
    pub fn global_xyz(&self) -> usize { self.gnx() * self.gny() * self.gnz() }

    #[inline]
    pub fn max_neighbors(&self) -> usize { self.stencil_size - 1 }

    /// Rank at process-grid coordinate `(px, py, pz)`.
    #[inline]
    pub fn rank_of(&self, px: usize, py: usize, pz: usize) -> usize {
        pz * self.npx * self.npy + py * self.npx + px
    }

    /// Process-grid coordinate of `rank`.
    #[inline]
    pub fn coords_of(&self, rank: usize) -> (usize, usize, usize) {
        let pz = rank / (self.npx * self.npy);
        let py = (rank - pz * self.npx * self.npy) / self.npx;
        (rank % self.npx, py, pz)
    }
}

/// Most cubic factorisation `npx * npy * npz == size`, with `npx >= npy >= npz`.
pub fn optimal_process_grid(size: usize) -> Result<(usize, usize, usize), DistError> {
    if size == 0 {
        return Err(DistError::InvalidGeometry("process count must be positive".into()));
    }
    let mut best = (size, 1, 1);
    for pz in 1..=size {
        if size % pz != 0 {
            continue;
        }
        let rest = size / pz;
        for py in pz..=rest {
            if rest % py != 0 {
                continue;
            }
            let px = rest / py;
            if px < py {
                break;
            }
            if px + py + pz < best.0 + best.1 + best.2 {
                best = (px, py, pz);
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_to_coordinates() {
        let g = Geometry::new(12, 7, (3, 2, 2), (4, 4, 4), 27, 1).unwrap();
        assert_eq!((g.ipx, g.ipy, g.ipz), (1, 0, 1));
        assert_eq!(g.rank_of(g.ipx, g.ipy, g.ipz), 7);
        assert_eq!(g.coords_of(7), (1, 0, 1));
        assert_eq!((g.gnx(), g.gny(), g.gnz()), (12, 8, 8));
    }

    #[test]
    fn size_must_match_grid() {
        let err = Geometry::new(4, 0, (2, 2, 2), (4, 4, 4), 27, 1).unwrap_err();
        assert_eq!(err, DistError::GridMismatch { size: 4, npx: 2, npy: 2, npz: 2 });
    }

    #[test]
    fn factoring_prefers_cubic_grids() {
        assert_eq!(optimal_process_grid(1).unwrap(), (1, 1, 1));
        assert_eq!(optimal_process_grid(4).unwrap(), (2, 2, 1));
        assert_eq!(optimal_process_grid(8).unwrap(), (2, 2, 2));
        assert_eq!(optimal_process_grid(6).unwrap(), (3, 2, 1));
        assert_eq!(optimal_process_grid(7).unwrap(), (7, 1, 1));
    }

    #[test]
    fn coarsening_halves_local_dims() {
        let g = Geometry::new(1, 0, (1, 1, 1), (8, 4, 2), 27, 1).unwrap();
        let c = g.coarsen().unwrap();
        assert_eq!((c.nx, c.ny, c.nz), (4, 2, 1));
        assert_eq!(c.coarsen(), Err(DistError::NotCoarsenable(1)));
    }
}
