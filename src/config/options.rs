//! Command-line or API options for the distributed problem.
//!
//! This module provides the `ProblemOptions` struct, which is used to specify
//! the local sub-grid, the optional process-grid shape, the stencil width, and
//! the multigrid hierarchy parameters. Options are validated before any
//! geometry is derived from them.

use crate::error::DistError;

/// Problem shape & hierarchy parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemOptions {
    /// Local sub-grid dimensions owned by each process.
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,

    /// Process-grid shape; derived by factoring the process count when absent.
    pub npx: Option<usize>,
    pub npy: Option<usize>,
    pub npz: Option<usize>,

    /// Max candidate neighbors + 1 (27 for the 3-D 27-point stencil)
    pub stencil_size: usize,

    /// Worker threads available to each process
    pub num_threads: usize,

    /// Number of levels in the multigrid hierarchy (finest included)
    pub mg_levels: usize,

    pub presmoother_steps: usize,
    pub postsmoother_steps: usize,
}

impl Default for ProblemOptions {
    fn default() -> Self {
        Self {
            nx: 16,
            ny: 16,
            nz: 16,
            npx: None,
            npy: None,
            npz: None,
            stencil_size: 27,
            num_threads: num_cpus::get(),
            mg_levels: 4,
            presmoother_steps: 1,
            postsmoother_steps: 1,
        }
    }
}

impl ProblemOptions {
    pub fn with_local_dims(mut self, nx: usize, ny: usize, nz: usize) -> Self {
        self.nx = nx;
        self.ny = ny;
        self.nz = nz;
        self
    }

    pub fn with_process_grid(mut self, npx: usize, npy: usize, npz: usize) -> Self {
        self.npx = Some(npx);
        self.npy = Some(npy);
        self.npz = Some(npz);
        self
    }

    pub fn with_mg_levels(mut self, levels: usize) -> Self {
        self.mg_levels = levels;
        self
    }

    pub fn with_smoother_steps(mut self, pre: usize, post: usize) -> Self {
        self.presmoother_steps = pre;
        self.postsmoother_steps = post;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Check the options for internal consistency.
    ///
    /// The process grid must be either fully given or fully absent, and the
    /// local dimensions must survive `mg_levels - 1` halvings.
    pub fn validate(&self) -> Result<(), DistError> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(DistError::InvalidGeometry(format!(
                "local dimensions must be positive, got {}x{}x{}",
                self.nx, self.ny, self.nz
            )));
        }
        let given = [self.npx, self.npy, self.npz].iter().filter(|p| p.is_some()).count();
        if given != 0 && given != 3 {
            return Err(DistError::InvalidGeometry(
                "process grid must specify all of npx, npy, npz or none".into(),
            ));
        }
        if self.stencil_size < 2 {
            return Err(DistError::InvalidGeometry(format!(
                "stencil size {} leaves no room for neighbors",
                self.stencil_size
            )));
        }
        if self.mg_levels == 0 {
            return Err(DistError::InvalidGeometry("at least one level is required".into()));
        }
        let factor = 1usize << (self.mg_levels - 1);
        for d in [self.nx, self.ny, self.nz] {
            if d % factor != 0 {
                return Err(DistError::NotCoarsenable(d));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ProblemOptions::default().validate().is_ok());
    }

    #[test]
    fn partial_process_grid_is_rejected() {
        let mut opts = ProblemOptions::default();
        opts.npx = Some(2);
        assert!(matches!(opts.validate(), Err(DistError::InvalidGeometry(_))));
    }

    #[test]
    fn too_many_levels_for_dims() {
        let opts = ProblemOptions::default().with_local_dims(4, 4, 6).with_mg_levels(3);
        assert_eq!(opts.validate(), Err(DistError::NotCoarsenable(6)));
    }
}
