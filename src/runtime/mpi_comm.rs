//! MPI-backed all-reduce for one-process-per-partition runs.
//!
//! This module provides an implementation of the `AllReduce` trait using the
//! MPI (Message Passing Interface) backend. Each process contributes one
//! scalar per call and receives the combined value, which is how run-wide
//! timings and accuracy-insensitive partial sums are aggregated when the
//! partitions live in separate processes. The implementation is only
//! available when the `mpi` feature is enabled.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "mpi")]
//! # {
//! use distmg::runtime::{AllReduce, MpiComm, ReduceOp};
//! let mut comm = MpiComm::new().unwrap();
//! let slowest = comm.all_reduce(1.5, ReduceOp::Max);
//! # }
//! ```

use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::{AllReduce, ReduceOp};
use crate::config::ProblemOptions;
use crate::error::DistError;
use crate::geometry::Geometry;

/// MPI communicator wrapper.
///
/// Holds the MPI universe (finalised on drop), the world communicator, the
/// rank of the current process, and the total number of processes.
pub struct MpiComm {
    _universe: Universe,
    /// The MPI world communicator (all processes in the job).
    pub world: SimpleCommunicator,
    /// The rank (ID) of this process within the communicator.
    pub rank: usize,
    /// The total number of processes in the communicator.
    pub size: usize,
}

impl MpiComm {
    /// Initializes MPI and constructs a new `MpiComm` instance.
    pub fn new() -> Result<Self, DistError> {
        let universe = mpi::initialize()
            .ok_or_else(|| DistError::Runtime("MPI already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm { _universe: universe, world, rank, size })
    }

    /// Geometry of this process, one partition per MPI rank.
    pub fn geometry(&self, opts: &ProblemOptions) -> Result<Geometry, DistError> {
        Geometry::from_options(opts, self.size, self.rank)
    }

    /// Synchronizes all processes at a barrier.
    pub fn barrier(&self) {
        self.world.barrier();
    }
}

impl AllReduce for MpiComm {
    /// Performs an all-reduce across all processes with the given operator.
    fn all_reduce(&mut self, value: f64, op: ReduceOp) -> f64 {
        let mut out = value;
        let sys = match op {
            ReduceOp::Sum => SystemOperation::sum(),
            ReduceOp::Min => SystemOperation::min(),
            ReduceOp::Max => SystemOperation::max(),
        };
        self.world.all_reduce_into(&value, &mut out, sys);
        out
    }
}
