//! Logical form of the distributed matrix and the partition binder.
//!
//! Before any partition exists, the matrix is a fixed, ordered list of named
//! containers sized for the worst case of the global problem. Binding splits
//! every container into one disjoint range per partition and, only then,
//! creates the shared collectives with the final arrival count.

use log::{debug, info};

use crate::error::DistError;
use crate::geometry::Geometry;
use crate::halo::{BaseExtent, Synchronizers};
use crate::matrix::summary::MatrixSummary;
use crate::runtime::{Access, DynamicCollective, LogicalArray, ReduceOp};

/// Upper bound on the number of values one partition sends per exchange.
///
/// Six faces, twelve edges and eight corners of the local block.
pub fn halo_capacity(g: &Geometry) -> usize {
    2 * (g.nx * g.ny + g.ny * g.nz + g.nx * g.nz) + 4 * (g.nx + g.ny + g.nz) + 8
}

/// Smallest stencil the structure population and neighbor search support.
pub const MIN_STENCIL_SIZE: usize = 27;

/// The distributed matrix before and during binding.
pub struct LogicalSparseMatrix {
    geom: Geometry,
    n_parts: Option<usize>,
    pub(crate) geoms: LogicalArray<Geometry>,
    pub(crate) sclrs: LogicalArray<MatrixSummary>,
    pub(crate) nonzeros_in_row: LogicalArray<u8>,
    // Flattened to 1D from 2D.
    pub(crate) mtx_ind_g: LogicalArray<usize>,
    // Flattened to 1D from 2D.
    pub(crate) mtx_ind_l: LogicalArray<usize>,
    // Flattened to 1D from 2D.
    pub(crate) matrix_values: LogicalArray<f64>,
    pub(crate) matrix_diagonal: LogicalArray<f64>,
    pub(crate) local_to_global_map: LogicalArray<usize>,
    // One slot per partition, all holding handles to the same instance.
    pub(crate) dc_allreduce_sum: LogicalArray<Option<DynamicCollective<i64>>>,
    pub(crate) dc_allred_sum_ft: LogicalArray<Option<DynamicCollective<f64>>>,
    pub(crate) dc_allred_min_ft: LogicalArray<Option<DynamicCollective<f64>>>,
    pub(crate) dc_allred_max_ft: LogicalArray<Option<DynamicCollective<f64>>>,
    pub(crate) neighbors: LogicalArray<usize>,
    pub(crate) send_length: LogicalArray<usize>,
    pub(crate) synchronizers: LogicalArray<Option<Synchronizers>>,
    pub(crate) pull_bes: LogicalArray<BaseExtent>,
    // Transient cross-partition reads only; kept apart from the owned containers.
    pub(crate) pull_buffer: LogicalArray<f64>,
}

impl LogicalSparseMatrix {
    /// Size every container for the global problem described by `geom`.
    pub fn declare(geom: &Geometry) -> Result<Self, DistError> {
        geom.validate()?;
        if geom.stencil_size < MIN_STENCIL_SIZE {
            return Err(DistError::Unsupported("stencils narrower than 27 points"));
        }
        let size = geom.size;
        let global_xyz = geom.global_xyz();
        let stencil = geom.stencil_size;
        let max_neighbors = geom.max_neighbors();
        info!(
            "declaring distributed matrix: {} rows, {} processes, stencil {}",
            global_xyz, size, stencil
        );
        Ok(Self {
            geom: *geom,
            n_parts: None,
            geoms: LogicalArray::allocate("geoms", size, *geom, Access::RW_E),
            sclrs: LogicalArray::allocate("sclrs", size, MatrixSummary::default(), Access::RW_E),
            nonzeros_in_row: LogicalArray::allocate("nonzerosInRow", global_xyz, 0, Access::RW_E),
            mtx_ind_g: LogicalArray::allocate("mtxIndG", global_xyz * stencil, 0, Access::RW_E),
            mtx_ind_l: LogicalArray::allocate("mtxIndL", global_xyz * stencil, 0, Access::RW_E),
            matrix_values: LogicalArray::allocate("matrixValues", global_xyz * stencil, 0.0, Access::RW_E),
            matrix_diagonal: LogicalArray::allocate("matrixDiagonal", global_xyz, 0.0, Access::RW_E),
            local_to_global_map: LogicalArray::allocate("localToGlobalMap", global_xyz, 0, Access::RW_E),
            dc_allreduce_sum: LogicalArray::allocate("dcAllreduceSum", size, None, Access::RW_E),
            dc_allred_sum_ft: LogicalArray::allocate("dcAllRedSumFT", size, None, Access::RW_E),
            dc_allred_min_ft: LogicalArray::allocate("dcAllRedMinFT", size, None, Access::RW_E),
            dc_allred_max_ft: LogicalArray::allocate("dcAllRedMaxFT", size, None, Access::RW_E),
            neighbors: LogicalArray::allocate("neighbors", size * max_neighbors, 0, Access::RW_E),
            send_length: LogicalArray::allocate("sendLength", size * max_neighbors, 0, Access::RW_E),
            synchronizers: LogicalArray::allocate("synchronizers", size, None, Access::RW_E),
            pull_bes: LogicalArray::allocate(
                "pullBEs",
                size * max_neighbors,
                BaseExtent::default(),
                Access::RW_E,
            ),
            pull_buffer: LogicalArray::allocate(
                "pullBuffer",
                size * halo_capacity(geom),
                0.0,
                Access::empty(),
            ),
        })
    }

    pub fn geometry(&self) -> &Geometry { &self.geom }

    pub fn n_parts(&self) -> Option<usize> { self.n_parts }

    pub fn is_bound(&self) -> bool { self.n_parts.is_some() }

    /// Container names in declaration order; the no-access pull buffer comes last.
    pub fn container_names(&self) -> [&'static str; 17] {
        [
            self.geoms.name(),
            self.sclrs.name(),
            self.nonzeros_in_row.name(),
            self.mtx_ind_g.name(),
            self.mtx_ind_l.name(),
            self.matrix_values.name(),
            self.matrix_diagonal.name(),
            self.local_to_global_map.name(),
            self.dc_allreduce_sum.name(),
            self.dc_allred_sum_ft.name(),
            self.dc_allred_min_ft.name(),
            self.dc_allred_max_ft.name(),
            self.neighbors.name(),
            self.send_length.name(),
            self.synchronizers.name(),
            self.pull_bes.name(),
            self.pull_buffer.name(),
        ]
    }

    /// Bytes of storage across every declared container.
    pub fn declared_bytes(&self) -> usize {
        self.geoms.bytes()
            + self.sclrs.bytes()
            + self.nonzeros_in_row.bytes()
            + self.mtx_ind_g.bytes()
            + self.mtx_ind_l.bytes()
            + self.matrix_values.bytes()
            + self.matrix_diagonal.bytes()
            + self.local_to_global_map.bytes()
            + self.dc_allreduce_sum.bytes()
            + self.dc_allred_sum_ft.bytes()
            + self.dc_allred_min_ft.bytes()
            + self.dc_allred_max_ft.bytes()
            + self.neighbors.bytes()
            + self.send_length.bytes()
            + self.synchronizers.bytes()
            + self.pull_bes.bytes()
            + self.pull_buffer.bytes()
    }

    /// Split every container into `n_parts` disjoint ranges, one per process.
    ///
    /// The collectives are created afterwards, because their arrival count is
    /// the partition count fixed here.
    pub fn bind(&mut self, n_parts: usize) -> Result<(), DistError> {
        if self.n_parts.is_some() {
            return Err(DistError::AlreadyBound("distributed matrix"));
        }
        if n_parts != self.geom.size {
            return Err(DistError::PartitionCount { parts: n_parts, size: self.geom.size });
        }
        self.geoms.partition(n_parts)?;
        self.sclrs.partition(n_parts)?;
        self.nonzeros_in_row.partition(n_parts)?;
        self.mtx_ind_g.partition(n_parts)?;
        self.mtx_ind_l.partition(n_parts)?;
        self.matrix_values.partition(n_parts)?;
        self.matrix_diagonal.partition(n_parts)?;
        self.local_to_global_map.partition(n_parts)?;
        self.dc_allreduce_sum.partition(n_parts)?;
        self.dc_allred_sum_ft.partition(n_parts)?;
        self.dc_allred_min_ft.partition(n_parts)?;
        self.dc_allred_max_ft.partition(n_parts)?;
        self.neighbors.partition(n_parts)?;
        self.send_length.partition(n_parts)?;
        self.synchronizers.partition(n_parts)?;
        self.pull_bes.partition(n_parts)?;
        ////////////////////////////////////////////////////////////////////////
        // NO_ACCESS
        ////////////////////////////////////////////////////////////////////////
        self.pull_buffer.partition(n_parts)?;
        self.n_parts = Some(n_parts);
        // Partition p is bound to process p.
        for part in 0..n_parts {
            let geom = self.geom.with_rank(part)?;
            if let Some(slot) = self.geoms.part_mut(part) {
                slot[0] = geom;
            }
        }
        self.populate_collectives(n_parts);
        info!("bound distributed matrix to {n_parts} partitions");
        Ok(())
    }

    fn populate_collectives(&mut self, arrivals: usize) {
        replicate(&mut self.dc_allreduce_sum, DynamicCollective::new(arrivals, ReduceOp::Sum));
        replicate(&mut self.dc_allred_sum_ft, DynamicCollective::new(arrivals, ReduceOp::Sum));
        replicate(&mut self.dc_allred_min_ft, DynamicCollective::new(arrivals, ReduceOp::Min));
        replicate(&mut self.dc_allred_max_ft, DynamicCollective::new(arrivals, ReduceOp::Max));
        debug!("replicated collectives with {arrivals} arrivals");
    }

    /// Return all container storage. Consumes the declaration.
    ///
    /// Returns the number of bytes the declaration was sized for.
    pub fn release(self) -> usize {
        let bytes = self.declared_bytes();
        info!(
            "released distributed matrix ({} rows, {} bytes declared)",
            self.geom.global_xyz(),
            bytes
        );
        bytes
    }
}

fn replicate<T: Clone>(slots: &mut LogicalArray<Option<T>>, instance: T) {
    for part in 0..slots.n_parts().unwrap_or(0) {
        if let Some(slot) = slots.part_mut(part) {
            slot[0] = Some(instance.clone());
        }
    }
}
