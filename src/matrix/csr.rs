//! Export of a partition's local block to a faer CSR matrix.

use faer::sparse::{SparseRowMat, SymbolicSparseRowMat};

use crate::error::DistError;
use crate::matrix::SparseMatrixView;

/// A read-only sparse matrix supporting y = A * x.
pub trait SparseMatrix {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[f64], y: &mut [f64]);
}

/// Local rows by local columns (owned plus halo) of one partition.
pub struct CsrMatrix {
    inner: SparseRowMat<usize, f64>,
}

impl CsrMatrix {
    /// Build a CSR from raw row-ptr, col-idx, and values.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        let symbolic = SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptr, None, col_idx);
        Self { inner: SparseRowMat::new(symbolic, values) }
    }

    pub fn as_faer(&self) -> &SparseRowMat<usize, f64> { &self.inner }

    pub fn nnz(&self) -> usize {
        self.inner.as_ref().symbolic().col_idx().len()
    }
}

impl SparseMatrix for CsrMatrix {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
    fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.ncols());
        assert_eq!(y.len(), self.nrows());
        let a = self.inner.as_ref();
        let row_ptr = a.symbolic().row_ptr();
        let col_idx = a.symbolic().col_idx();
        let val = a.val();
        for (i, yi) in y.iter_mut().enumerate() {
            *yi = (row_ptr[i]..row_ptr[i + 1]).map(|k| val[k] * x[col_idx[k]]).sum();
        }
    }
}

/// Local block of `view` in CSR form. Columns must already be local.
pub fn to_csr(view: &SparseMatrixView) -> Result<CsrMatrix, DistError> {
    if view.elements_to_send.is_none() {
        return Err(DistError::HaloNotReady("exporting the local block"));
    }
    let s = view.summary();
    let mut row_ptr = Vec::with_capacity(s.local_number_of_rows + 1);
    let mut col_idx = Vec::with_capacity(s.local_number_of_nonzeros);
    let mut values = Vec::with_capacity(s.local_number_of_nonzeros);
    let mut entries = Vec::with_capacity(s.max_nonzeros_per_row);
    row_ptr.push(0);
    for row in 0..s.local_number_of_rows {
        // Halo columns sit past the owned ones, so rows need re-sorting.
        let (cols, vals) = view.row(row);
        entries.clear();
        entries.extend(cols.iter().copied().zip(vals.iter().copied()));
        entries.sort_unstable_by_key(|&(c, _)| c);
        for &(c, v) in &entries {
            col_idx.push(c);
            values.push(v);
        }
        row_ptr.push(col_idx.len());
    }
    Ok(CsrMatrix::from_csr(
        s.local_number_of_rows,
        s.local_number_of_columns,
        row_ptr,
        col_idx,
        values,
    ))
}
