//! Collective Reduction Manager.
//!
//! Every level owns one collective per reduction purpose: an integer sum for
//! nonzero counts and a floating-point sum, min and max. All partitions hold
//! handles to the same four instances, created once the partition count is
//! fixed. Each call is a blocking all-reduce that advances the caller's handle.

use log::trace;

use crate::error::DistError;
use crate::matrix::SparseMatrixView;
use crate::runtime::{AllReduce, DynamicCollective, PhysicalArray, ReduceOp};

/// One partition's handles to the level's collectives.
#[derive(Debug, Clone)]
pub struct Reductions {
    nnz_sum: DynamicCollective<i64>,
    sum: DynamicCollective<f64>,
    min: DynamicCollective<f64>,
    max: DynamicCollective<f64>,
}

fn slot<T>(arr: PhysicalArray<Option<T>>) -> Result<T, DistError> {
    let name = arr.name();
    arr.into_inner()
        .into_iter()
        .next()
        .flatten()
        .ok_or(DistError::MissingContainer(name))
}

impl Reductions {
    /// Take the replicated handles out of a partition's collective slots.
    pub fn unpack(
        nnz_sum: PhysicalArray<Option<DynamicCollective<i64>>>,
        sum: PhysicalArray<Option<DynamicCollective<f64>>>,
        min: PhysicalArray<Option<DynamicCollective<f64>>>,
        max: PhysicalArray<Option<DynamicCollective<f64>>>,
    ) -> Result<Self, DistError> {
        Ok(Self { nnz_sum: slot(nnz_sum)?, sum: slot(sum)?, min: slot(min)?, max: slot(max)? })
    }

    /// Number of partitions taking part in every reduction.
    pub fn arrivals(&self) -> usize { self.sum.arrivals() }

    pub fn for_op(&mut self, op: ReduceOp) -> &mut DynamicCollective<f64> {
        match op {
            ReduceOp::Sum => &mut self.sum,
            ReduceOp::Min => &mut self.min,
            ReduceOp::Max => &mut self.max,
        }
    }

    /// Exact global sum of an integer count.
    pub fn sum_count(&mut self, value: i64) -> i64 {
        self.nnz_sum.reduce(value)
    }
}

impl AllReduce for Reductions {
    fn all_reduce(&mut self, value: f64, op: ReduceOp) -> f64 {
        self.for_op(op).reduce(value)
    }
}

/// Combine `value` from every partition of `level` with `op`.
///
/// Blocks until all partitions of the level have called it with the same `op`.
pub fn reduce_scalar(level: &mut SparseMatrixView, value: f64, op: ReduceOp) -> f64 {
    let generation = level.reductions.for_op(op).generation();
    trace!("partition {}: {op:?} reduction, generation {generation}", level.rank());
    level.reductions.all_reduce(value, op)
}

/// Run-wide spread of a per-partition timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregate one timing across all partitions. Collective over the level.
pub fn aggregate_timing(level: &mut SparseMatrixView, seconds: f64) -> TimingSummary {
    let parts = level.reductions.arrivals() as f64;
    let min = reduce_scalar(level, seconds, ReduceOp::Min);
    let max = reduce_scalar(level, seconds, ReduceOp::Max);
    let sum = reduce_scalar(level, seconds, ReduceOp::Sum);
    TimingSummary { min, max, avg: sum / parts }
}
