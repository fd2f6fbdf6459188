//! Structures required for neighbor-to-neighbor task synchronization.

use crate::runtime::PhaseBarrier;

/// The two barriers guarding one partition's pull buffer.
#[derive(Debug, Clone)]
pub struct PhaseBarriers {
    /// Owner arrives once its pull buffer holds this generation's data.
    pub ready: PhaseBarrier,
    /// Every neighbor arrives once it has finished pulling this generation.
    pub done: PhaseBarrier,
}

impl PhaseBarriers {
    /// Barriers for a partition read by `consumers` neighbors.
    pub fn new(consumers: usize) -> Self {
        Self { ready: PhaseBarrier::new(1), done: PhaseBarrier::new(consumers) }
    }

    #[must_use]
    pub fn advance(&self) -> Self {
        Self { ready: self.ready.advance(), done: self.done.advance() }
    }
}

/// The barriers a partition owns plus one handle set per neighbor.
#[derive(Debug, Clone)]
pub struct Synchronizers {
    /// The barriers that I own.
    pub mine: PhaseBarriers,
    /// Neighbor barriers, in the same order as the view's neighbor list.
    pub neighbors: Vec<PhaseBarriers>,
    /// `mine.done` of the previous generation, awaited before the next write.
    pending_done: Option<PhaseBarrier>,
    generation: u64,
}

impl Synchronizers {
    pub fn new(mine: PhaseBarriers, neighbors: Vec<PhaseBarriers>) -> Self {
        Self { mine, neighbors, pending_done: None, generation: 0 }
    }

    /// Number of completed exchange generations.
    pub fn generation(&self) -> u64 { self.generation }

    /// Block until every neighbor has consumed the previous generation.
    pub fn wait_buffer_free(&mut self) {
        if let Some(done) = self.pending_done.take() {
            done.wait();
        }
    }

    /// Move every handle to the next generation, in lockstep.
    pub fn advance(&mut self) {
        self.pending_done = Some(self.mine.done.clone());
        self.mine = self.mine.advance();
        for n in &mut self.neighbors {
            *n = n.advance();
        }
        self.generation += 1;
        debug_assert_eq!(self.mine.ready.generation(), self.generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_keeps_handles_in_lockstep() {
        let mine = PhaseBarriers::new(2);
        let other = PhaseBarriers::new(1);
        let mut sync = Synchronizers::new(mine, vec![other]);
        sync.advance();
        sync.advance();
        assert_eq!(sync.generation(), 2);
        assert_eq!(sync.mine.done.generation(), 2);
        assert!(sync.neighbors.iter().all(|n| n.ready.generation() == 2));
    }
}
