//! Per-partition matrix view: the live, locally writable slice of the matrix.
//!
//! A view is unpacked from the bound declaration in container order. It owns
//! its slice of every container outright; the only state another partition
//! can touch is the pull buffer, and only through a read capability granted
//! during halo wiring.

use std::collections::HashMap;

use crate::error::DistError;
use crate::geometry::{Geometry, global_row, local_index};
use crate::halo::{BaseExtent, Synchronizers};
use crate::matrix::declaration::LogicalSparseMatrix;
use crate::matrix::summary::MatrixSummary;
use crate::multigrid::MgData;
use crate::reduction::Reductions;
use crate::runtime::{PhysicalArray, PullBuffer, PullCapability};

/// One partition's slice of the distributed matrix.
#[derive(Debug)]
pub struct SparseMatrixView {
    // Geometry info for this instance.
    pub geom: PhysicalArray<Geometry>,
    // Container for all scalar values.
    pub sclrs: PhysicalArray<MatrixSummary>,
    pub nonzeros_in_row: PhysicalArray<u8>,
    // Row-major, `stencil_size` slots per row.
    pub mtx_ind_g: PhysicalArray<usize>,
    pub mtx_ind_l: PhysicalArray<usize>,
    pub matrix_values: PhysicalArray<f64>,
    pub matrix_diagonal: PhysicalArray<f64>,
    pub local_to_global_map: PhysicalArray<usize>,
    pub reductions: Reductions,
    // Only the first `number_of_send_neighbors` entries survive halo setup.
    pub neighbors: PhysicalArray<usize>,
    pub send_length: PhysicalArray<usize>,
    pub synchronizers: PhysicalArray<Option<Synchronizers>>,
    /// Ranges of each neighbor's pull buffer this partition reads.
    pub pull_bes: PhysicalArray<BaseExtent>,
    pub pull_buffer: PullBuffer,
    /// Read capabilities on neighbor pull buffers, one per neighbor.
    pub pulls: Vec<PullCapability>,
    /// Global to local mapping of owned rows. Only valid after
    /// [`SparseMatrixView::populate_global_to_local_map`].
    pub global_to_local_map: HashMap<usize, usize>,
    /// Global id to local column of halo values. Only valid after halo setup.
    pub external_to_local_map: HashMap<usize, usize>,
    /// Local rows packed into the pull buffer, in send order. Only valid after halo setup.
    pub elements_to_send: Option<Vec<usize>>,
    pub coarse: Option<Box<SparseMatrixView>>,
    pub mg_data: Option<MgData>,
}

impl SparseMatrixView {
    /// Unpack partition `part` from a bound declaration.
    ///
    /// MUST MATCH the declaration's container order.
    pub fn unpack(decl: &mut LogicalSparseMatrix, part: usize) -> Result<Self, DistError> {
        if !decl.is_bound() {
            return Err(DistError::NotBound("unpacking a partition"));
        }
        let geom = decl.geoms.take(part)?;
        let sclrs = decl.sclrs.take(part)?;
        let nonzeros_in_row = decl.nonzeros_in_row.take(part)?;
        let mtx_ind_g = decl.mtx_ind_g.take(part)?;
        let mtx_ind_l = decl.mtx_ind_l.take(part)?;
        let matrix_values = decl.matrix_values.take(part)?;
        let matrix_diagonal = decl.matrix_diagonal.take(part)?;
        let local_to_global_map = decl.local_to_global_map.take(part)?;
        let reductions = Reductions::unpack(
            decl.dc_allreduce_sum.take(part)?,
            decl.dc_allred_sum_ft.take(part)?,
            decl.dc_allred_min_ft.take(part)?,
            decl.dc_allred_max_ft.take(part)?,
        )?;
        let neighbors = decl.neighbors.take(part)?;
        let send_length = decl.send_length.take(part)?;
        let synchronizers = decl.synchronizers.take(part)?;
        let pull_bes = decl.pull_bes.take(part)?;
        let pull_buffer = PullBuffer::new(part, decl.pull_buffer.take(part)?.into_inner());
        let view = Self {
            geom,
            sclrs,
            nonzeros_in_row,
            mtx_ind_g,
            mtx_ind_l,
            matrix_values,
            matrix_diagonal,
            local_to_global_map,
            reductions,
            neighbors,
            send_length,
            synchronizers,
            pull_bes,
            pull_buffer,
            pulls: Vec::new(),
            global_to_local_map: HashMap::new(),
            external_to_local_map: HashMap::new(),
            elements_to_send: None,
            coarse: None,
            mg_data: None,
        };
        view.verify_unpack()?;
        Ok(view)
    }

    fn verify_unpack(&self) -> Result<(), DistError> {
        let g = self.geometry();
        let rows = g.local_xyz();
        let slots = rows * g.stencil_size;
        let checks: [(&'static str, bool); 9] = [
            (self.nonzeros_in_row.name(), self.nonzeros_in_row.len() == rows),
            (self.mtx_ind_g.name(), self.mtx_ind_g.len() == slots),
            (self.mtx_ind_l.name(), self.mtx_ind_l.len() == slots),
            (self.matrix_values.name(), self.matrix_values.len() == slots),
            (self.matrix_diagonal.name(), self.matrix_diagonal.len() == rows),
            (self.local_to_global_map.name(), self.local_to_global_map.len() == rows),
            (self.neighbors.name(), self.neighbors.len() == g.max_neighbors()),
            (self.send_length.name(), self.send_length.len() == g.max_neighbors()),
            (self.pull_bes.name(), self.pull_bes.len() == g.max_neighbors()),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some((name, _)) => Err(DistError::MissingContainer(*name)),
            None => Ok(()),
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry { self.geom.item() }

    #[inline]
    pub fn summary(&self) -> &MatrixSummary { self.sclrs.item() }

    #[inline]
    pub fn summary_mut(&mut self) -> &mut MatrixSummary { self.sclrs.item_mut() }

    pub fn rank(&self) -> usize { self.geometry().rank }

    /// Neighbor ranks, exactly `number_of_send_neighbors` long after halo setup.
    pub fn neighbor_ranks(&self) -> &[usize] { &self.neighbors }

    /// Map every owned global row to its flattened local index.
    ///
    /// Must run before any matrix entry is translated to local columns.
    pub fn populate_global_to_local_map(&mut self) {
        let g = *self.geometry();
        let map = &mut self.global_to_local_map;
        map.clear();
        map.reserve(g.local_xyz());
        for iz in 0..g.nz {
            for iy in 0..g.ny {
                for ix in 0..g.nx {
                    map.insert(global_row(&g, ix, iy, iz), local_index(&g, ix, iy, iz));
                }
            }
        }
    }

    /// Local column of global id `col`, owned or halo.
    pub fn local_column(&self, col: usize) -> Option<usize> {
        self.global_to_local_map
            .get(&col)
            .or_else(|| self.external_to_local_map.get(&col))
            .copied()
    }

    /// Sparse entries of local row `row`: (local columns, values).
    pub fn row(&self, row: usize) -> (&[usize], &[f64]) {
        let stencil = self.geometry().stencil_size;
        let start = row * stencil;
        let end = start + self.nonzeros_in_row[row] as usize;
        (&self.mtx_ind_l[start..end], &self.matrix_values[start..end])
    }

    pub fn coarse(&self) -> Option<&SparseMatrixView> { self.coarse.as_deref() }

    pub fn coarse_mut(&mut self) -> Option<&mut SparseMatrixView> { self.coarse.as_deref_mut() }

    /// Bytes held by this level of the view (coarser levels excluded).
    pub fn local_bytes(&self) -> usize {
        use std::mem::size_of;
        let entry = size_of::<(usize, usize)>();
        self.nonzeros_in_row.len() * size_of::<u8>()
            + (self.mtx_ind_g.len() + self.mtx_ind_l.len()) * size_of::<usize>()
            + (self.matrix_values.len() + self.matrix_diagonal.len()) * size_of::<f64>()
            + self.local_to_global_map.len() * size_of::<usize>()
            + (self.neighbors.len() + self.send_length.len()) * size_of::<usize>()
            + self.pull_bes.len() * size_of::<BaseExtent>()
            + self.pull_buffer.len() * size_of::<f64>()
            + (self.global_to_local_map.len() + self.external_to_local_map.len()) * entry
            + self.elements_to_send.as_ref().map_or(0, |e| e.len() * size_of::<usize>())
            + self.mg_data.as_ref().map_or(0, |m| m.f2c_operator.len() * size_of::<usize>())
    }
}
