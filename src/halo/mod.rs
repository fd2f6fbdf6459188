//! Halo (ghost) exchange between neighboring partitions.
//!
//! Neighbor relationships are a deterministic function of process-grid
//! coordinates, so every partition negotiates its halo from the geometry
//! alone. Wiring then hands each partition the barrier handles and read
//! capabilities it needs, and [`exchange_halo`] runs one generation of the
//! two-phase pull protocol.
//!
//! - [`negotiator`]: neighbor discovery, send lists, pull ranges.
//! - [`sync`]: per-partition phase-barrier handle sets.
//! - [`exchange`]: the per-generation ready/done handshake and pull.

pub mod exchange;
pub mod negotiator;
pub mod sync;

pub use exchange::exchange_halo;
pub use negotiator::{NEIGHBOR_OFFSETS, negotiate, shared_points, wire};
pub use sync::{PhaseBarriers, Synchronizers};

/// A contiguous range of a partition's pull buffer exposed to one neighbor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BaseExtent {
    pub base: usize,
    pub extent: usize,
}

impl BaseExtent {
    pub fn new(base: usize, extent: usize) -> Self {
        Self { base, extent }
    }

    pub fn end(&self) -> usize { self.base + self.extent }

    pub fn range(&self) -> std::ops::Range<usize> { self.base..self.end() }
}
