//! The whole distributed matrix as seen by the driver.
//!
//! Owns the bound declaration of every level and one view per partition.
//! Communication-free setup runs data-parallel over the views; anything that
//! blocks on barriers or collectives runs through [`launch`], one task per
//! partition.

use log::info;
use rayon::prelude::*;

use crate::config::ProblemOptions;
use crate::error::DistError;
use crate::geometry::Geometry;
use crate::halo::{negotiate, wire};
use crate::matrix::declaration::LogicalSparseMatrix;
use crate::matrix::stencil::populate_structure;
use crate::matrix::SparseMatrixView;
use crate::multigrid;
use crate::runtime::launch;

/// Every partition of one matrix hierarchy, indexed by rank.
pub struct DistributedMatrix {
    /// Finest level first.
    decls: Vec<LogicalSparseMatrix>,
    views: Vec<SparseMatrixView>,
}

impl DistributedMatrix {
    /// Declare, bind and unpack one level for the process grid of `geom`.
    pub fn new(geom: &Geometry) -> Result<Self, DistError> {
        let mut decl = LogicalSparseMatrix::declare(geom)?;
        decl.bind(geom.size)?;
        let mut views = (0..geom.size)
            .map(|part| SparseMatrixView::unpack(&mut decl, part))
            .collect::<Result<Vec<_>, _>>()?;
        views.par_iter_mut().for_each(SparseMatrixView::populate_global_to_local_map);
        Ok(Self { decls: vec![decl], views })
    }

    pub fn geometry(&self) -> &Geometry { self.decls[0].geometry() }

    pub fn n_parts(&self) -> usize { self.views.len() }

    pub fn n_levels(&self) -> usize { self.decls.len() }

    pub fn views(&self) -> &[SparseMatrixView] { &self.views }

    pub fn views_mut(&mut self) -> &mut [SparseMatrixView] { &mut self.views }

    pub fn view(&self, part: usize) -> Option<&SparseMatrixView> { self.views.get(part) }

    /// Fill the 27-point structure of every partition and agree on the global
    /// nonzero count.
    pub fn populate_structure<F>(&mut self, coeff: F) -> Result<(), DistError>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        self.views.par_iter_mut().for_each(|v| {
            populate_structure(v, &coeff);
        });
        launch(&mut self.views, |_, v| {
            let local = v.summary().local_number_of_nonzeros as i64;
            let total = v.reductions.sum_count(local);
            v.summary_mut().total_number_of_nonzeros = total as usize;
        })?;
        Ok(())
    }

    /// Negotiate every partition's halo, then wire the synchronizers.
    pub fn setup_halo(&mut self) -> Result<(), DistError> {
        self.views.par_iter_mut().try_for_each(negotiate)?;
        wire(&mut self.views)
    }

    /// Run `task` once per partition, concurrently. Results in rank order.
    pub fn launch<F, R>(&mut self, task: F) -> Result<Vec<R>, DistError>
    where
        F: Fn(usize, &mut SparseMatrixView) -> R + Sync,
        R: Send,
    {
        launch(&mut self.views, task)
    }

    /// Hang every partition of `coarse` below the matching partition's
    /// coarsest level.
    pub fn attach_coarse(
        &mut self,
        coarse: DistributedMatrix,
        presmoother_steps: usize,
        postsmoother_steps: usize,
    ) -> Result<(), DistError> {
        if coarse.n_parts() != self.n_parts() {
            return Err(DistError::PartitionCount { parts: coarse.n_parts(), size: self.n_parts() });
        }
        let DistributedMatrix { decls, views } = coarse;
        for (fine, c) in self.views.iter_mut().zip(views) {
            multigrid::attach_coarse(fine, c, presmoother_steps, postsmoother_steps)?;
        }
        self.decls.extend(decls);
        Ok(())
    }

    /// Build, populate and wire a `levels`-deep hierarchy, finest first.
    pub fn build_hierarchy<F>(
        geom: &Geometry,
        levels: usize,
        presmoother_steps: usize,
        postsmoother_steps: usize,
        coeff: F,
    ) -> Result<Self, DistError>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        if levels == 0 {
            return Err(DistError::BrokenLevelChain { expected: 1, found: 0 });
        }
        let mut top = Self::new(geom)?;
        top.populate_structure(&coeff)?;
        top.setup_halo()?;
        let mut g = *geom;
        for _ in 1..levels {
            g = g.coarsen()?;
            let mut level = Self::new(&g)?;
            level.populate_structure(&coeff)?;
            level.setup_halo()?;
            top.attach_coarse(level, presmoother_steps, postsmoother_steps)?;
        }
        for view in &top.views {
            multigrid::verify_chain(view, levels)?;
        }
        info!(
            "built {levels}-level hierarchy over {} partitions ({} fine rows)",
            top.n_parts(),
            geom.global_xyz()
        );
        Ok(top)
    }

    /// Hierarchy described by `opts` over `size` in-process partitions.
    pub fn from_options<F>(opts: &ProblemOptions, size: usize, coeff: F) -> Result<Self, DistError>
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let geom = Geometry::from_options(opts, size, 0)?;
        Self::build_hierarchy(
            &geom,
            opts.mg_levels,
            opts.presmoother_steps,
            opts.postsmoother_steps,
            coeff,
        )
    }

    /// Drop every view, then release each level's declaration.
    ///
    /// Returns the bytes all levels were declared with.
    pub fn release(self) -> usize {
        let Self { decls, views } = self;
        drop(views);
        decls.into_iter().map(LogicalSparseMatrix::release).sum()
    }
}
