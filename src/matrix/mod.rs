//! Matrix module: logical declaration, per-partition views, and the driver-side handle.

pub mod csr;
pub mod declaration;
pub mod distributed;
pub mod stencil;
pub mod summary;
pub mod view;

pub use csr::{CsrMatrix, SparseMatrix, to_csr};
pub use declaration::{LogicalSparseMatrix, halo_capacity};
pub use distributed::DistributedMatrix;
pub use stencil::{laplacian_27, populate_structure};
pub use summary::MatrixSummary;
pub use view::SparseMatrixView;
