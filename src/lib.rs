//! distmg: distributed sparse-matrix data layer for geometric multigrid
//!
//! This crate decomposes a 3-D structured problem over a process grid, gives
//! every partition an exclusively owned slice of the matrix, and coordinates
//! halo exchange and scalar reductions between partitions without a global
//! barrier. Each multigrid level repeats the same machinery at its own
//! resolution.

pub mod config;
pub mod error;
pub mod geometry;
pub mod halo;
pub mod matrix;
pub mod multigrid;
pub mod reduction;
pub mod runtime;

// Re-exports for convenience
pub use config::*;
pub use error::*;
pub use geometry::Geometry;
pub use halo::{BaseExtent, exchange_halo};
pub use matrix::*;
pub use multigrid::{MgData, levels, mg_flops, verify_chain};
pub use reduction::{TimingSummary, aggregate_timing, reduce_scalar};
pub use runtime::{ReduceOp, launch};
