//! Structural population of the 27-point stencil.
//!
//! Only the sparsity pattern is fixed here. Entry values come from a caller
//! supplied coefficient function of `(global row, global column)`.

use crate::geometry::{Geometry, global_row_of};
use crate::matrix::SparseMatrixView;

/// Coefficients of the standard 27-point operator: 26 on the diagonal, -1 elsewhere.
pub fn laplacian_27(row: usize, col: usize) -> f64 {
    if row == col { 26.0 } else { -1.0 }
}

fn axis(g: usize, len: usize) -> impl Iterator<Item = usize> {
    g.saturating_sub(1)..(g + 2).min(len)
}

/// Fill one partition's rows with the 27-point pattern.
///
/// Columns are stored as global ids in ascending order; boundary rows keep
/// only the in-grid neighbors. Returns the local nonzero count.
pub fn populate_structure<F>(view: &mut SparseMatrixView, coeff: F) -> usize
where
    F: Fn(usize, usize) -> f64,
{
    let g: Geometry = *view.geometry();
    let stencil = g.stencil_size;
    let (gnx, gny, gnz) = (g.gnx(), g.gny(), g.gnz());
    let mut local_nnz = 0;
    let mut row = 0;
    for iz in 0..g.nz {
        let gz = g.ipz * g.nz + iz;
        for iy in 0..g.ny {
            let gy = g.ipy * g.ny + iy;
            for ix in 0..g.nx {
                let gx = g.ipx * g.nx + ix;
                let grow = global_row_of(&g, gx, gy, gz);
                let start = row * stencil;
                let mut k = 0;
                for cz in axis(gz, gnz) {
                    for cy in axis(gy, gny) {
                        for cx in axis(gx, gnx) {
                            let gcol = global_row_of(&g, cx, cy, cz);
                            let value = coeff(grow, gcol);
                            if gcol == grow {
                                view.matrix_diagonal[row] = value;
                            }
                            view.mtx_ind_g[start + k] = gcol;
                            view.matrix_values[start + k] = value;
                            k += 1;
                        }
                    }
                }
                view.nonzeros_in_row[row] = k as u8;
                view.local_to_global_map[row] = grow;
                local_nnz += k;
                row += 1;
            }
        }
    }
    let s = view.summary_mut();
    s.total_number_of_rows = g.global_xyz();
    s.local_number_of_rows = row;
    s.local_number_of_columns = row;
    s.local_number_of_nonzeros = local_nnz;
    s.max_nonzeros_per_row = stencil;
    local_nnz
}
