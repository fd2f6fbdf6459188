//! Generation-counted phase barriers.
//!
//! A barrier is created with a fixed number of expected arrivals per
//! generation. A handle names one generation; arriving or waiting on a
//! handle whose generation the barrier has already moved past is a protocol
//! violation, caught by `debug_assert!` only.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct BarrierState {
    /// Generation currently collecting arrivals; all earlier ones are complete.
    generation: u64,
    arrived: usize,
}

#[derive(Debug)]
struct BarrierInner {
    arrivals: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

/// Handle to one generation of a shared barrier.
#[derive(Debug, Clone)]
pub struct PhaseBarrier {
    inner: Arc<BarrierInner>,
    generation: u64,
}

impl PhaseBarrier {
    /// New barrier expecting `arrivals` arrivals per generation.
    ///
    /// A barrier with zero arrivals is complete in every generation.
    pub fn new(arrivals: usize) -> Self {
        Self {
            inner: Arc::new(BarrierInner {
                arrivals,
                state: Mutex::new(BarrierState { generation: 0, arrived: 0 }),
                cvar: Condvar::new(),
            }),
            generation: 0,
        }
    }

    pub fn arrivals(&self) -> usize { self.inner.arrivals }

    pub fn generation(&self) -> u64 { self.generation }

    /// True if both handles refer to the same underlying barrier.
    pub fn same_barrier(&self, other: &PhaseBarrier) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Signal one arrival for this handle's generation.
    pub fn arrive(&self) {
        let mut state = self.inner.state.lock();
        debug_assert_eq!(
            state.generation, self.generation,
            "arrival on stale or future phase barrier generation"
        );
        debug_assert!(self.inner.arrivals > 0, "arrival on a barrier expecting none");
        state.arrived += 1;
        if state.arrived == self.inner.arrivals {
            state.generation += 1;
            state.arrived = 0;
            self.inner.cvar.notify_all();
        }
    }

    /// Block until every arrival for this handle's generation has happened.
    pub fn wait(&self) {
        if self.inner.arrivals == 0 {
            return;
        }
        let mut state = self.inner.state.lock();
        while state.generation <= self.generation {
            self.inner.cvar.wait(&mut state);
        }
    }

    pub fn has_triggered(&self) -> bool {
        self.inner.arrivals == 0 || self.inner.state.lock().generation > self.generation
    }

    /// Handle for the next generation of the same barrier.
    #[must_use]
    pub fn advance(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), generation: self.generation + 1 }
    }
}
