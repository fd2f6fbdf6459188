//! In-process realisation of the distributed task runtime.
//!
//! The solver layer only relies on a handful of runtime capabilities: named
//! containers that can be split into disjoint per-partition ranges, two-phase
//! barriers that advance generation by generation, multi-party reductions
//! with a fixed arrival count, and a way to launch one task per partition.
//! This module provides all of them on top of threads, plus an MPI-backed
//! all-reduce behind the `mpi` feature.

use bitflags::bitflags;

pub mod collective;
pub mod launch;
pub mod phase_barrier;
pub mod region;

#[cfg(feature = "mpi")]
pub mod mpi_comm;
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

pub use collective::DynamicCollective;
pub use launch::launch;
pub use phase_barrier::PhaseBarrier;
pub use region::{LogicalArray, PhysicalArray, PullBuffer, PullCapability};

bitflags! {
    /// Access mode tag attached to a mapped container.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const READ      = 0b001;
        const WRITE     = 0b010;
        const EXCLUSIVE = 0b100;
        /// Read-write, exclusively owned by one partition.
        const RW_E      = Self::READ.bits() | Self::WRITE.bits() | Self::EXCLUSIVE.bits();
        /// Read-only, shared with other partitions.
        const RO_S      = Self::READ.bits();
    }
}

/// Reduction operator of a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

/// Element types a collective can reduce.
pub trait Reducible:
    Copy + Send + Sync + PartialOrd + num_traits::Zero + num_traits::Bounded + std::fmt::Debug + 'static
{
}

impl<T> Reducible for T where
    T: Copy + Send + Sync + PartialOrd + num_traits::Zero + num_traits::Bounded + std::fmt::Debug + 'static
{
}

impl ReduceOp {
    /// Neutral element of the operator.
    pub fn identity<T: Reducible>(self) -> T {
        match self {
            ReduceOp::Sum => T::zero(),
            ReduceOp::Min => T::max_value(),
            ReduceOp::Max => T::min_value(),
        }
    }

    pub fn combine<T: Reducible>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => {
                if b < a { b } else { a }
            }
            ReduceOp::Max => {
                if b > a { b } else { a }
            }
        }
    }
}

/// Scalar all-reduce across every participating partition.
pub trait AllReduce {
    /// Combine `value` from every partition with `op`; blocks until all arrive.
    fn all_reduce(&mut self, value: f64, op: ReduceOp) -> f64;

    /// Global dot product of two locally owned vector slices.
    fn dot(&mut self, a: &[f64], b: &[f64]) -> f64 {
        let local = a.iter().zip(b).map(|(&x, &y)| x * y).sum::<f64>();
        self.all_reduce(local, ReduceOp::Sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_neutral() {
        for op in [ReduceOp::Sum, ReduceOp::Min, ReduceOp::Max] {
            assert_eq!(op.combine(op.identity::<f64>(), 3.5), 3.5);
            assert_eq!(op.combine(op.identity::<i64>(), -7), -7);
        }
    }

    #[test]
    fn access_shorthands() {
        assert!(Access::RW_E.contains(Access::WRITE | Access::EXCLUSIVE));
        assert!(!Access::RO_S.contains(Access::WRITE));
    }
}
