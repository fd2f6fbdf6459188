//! Dynamic collectives: blocking multi-party reductions with a fixed arrival count.
//!
//! Every partition holds its own handle to the same shared instance. A handle
//! contributes once per generation; [`DynamicCollective::reduce`] arrives,
//! waits for the result, and advances the handle so the next call uses a
//! fresh generation.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::{ReduceOp, Reducible};

#[derive(Debug)]
struct CollectiveState<T> {
    generation: u64,
    arrived: usize,
    acc: T,
    /// Result of the most recently completed generation.
    last: Option<(u64, T)>,
}

#[derive(Debug)]
struct CollectiveInner<T> {
    arrivals: usize,
    op: ReduceOp,
    state: Mutex<CollectiveState<T>>,
    cvar: Condvar,
}

/// Handle to one generation of a shared reduction instance.
#[derive(Debug)]
pub struct DynamicCollective<T> {
    inner: Arc<CollectiveInner<T>>,
    generation: u64,
}

impl<T> Clone for DynamicCollective<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), generation: self.generation }
    }
}

impl<T: Reducible> DynamicCollective<T> {
    /// New instance combining `arrivals` contributions per generation with `op`.
    pub fn new(arrivals: usize, op: ReduceOp) -> Self {
        assert!(arrivals > 0, "a collective needs at least one arrival");
        Self {
            inner: Arc::new(CollectiveInner {
                arrivals,
                op,
                state: Mutex::new(CollectiveState {
                    generation: 0,
                    arrived: 0,
                    acc: op.identity(),
                    last: None,
                }),
                cvar: Condvar::new(),
            }),
            generation: 0,
        }
    }

    pub fn arrivals(&self) -> usize { self.inner.arrivals }
    pub fn op(&self) -> ReduceOp { self.inner.op }
    pub fn generation(&self) -> u64 { self.generation }

    /// True if both handles refer to the same reduction instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Contribute `value` to this handle's generation.
    pub fn arrive(&self, value: T) {
        let mut state = self.inner.state.lock();
        debug_assert_eq!(
            state.generation, self.generation,
            "contribution to stale or future collective generation"
        );
        state.acc = self.inner.op.combine(state.acc, value);
        state.arrived += 1;
        if state.arrived == self.inner.arrivals {
            let done = state.generation;
            state.last = Some((done, state.acc));
            state.acc = self.inner.op.identity();
            state.arrived = 0;
            state.generation += 1;
            self.inner.cvar.notify_all();
        }
    }

    /// Block until this handle's generation completes and return its result.
    pub fn get_result(&self) -> T {
        let mut state = self.inner.state.lock();
        loop {
            if let Some((generation, value)) = state.last {
                if generation >= self.generation {
                    debug_assert_eq!(generation, self.generation, "collective result overwritten");
                    return value;
                }
            }
            self.inner.cvar.wait(&mut state);
        }
    }

    /// Handle for the next generation of the same instance.
    #[must_use]
    pub fn advance(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), generation: self.generation + 1 }
    }

    /// Arrive with `value`, wait for the combined result, and advance.
    pub fn reduce(&mut self, value: T) -> T {
        self.arrive(value);
        let result = self.get_result();
        *self = self.advance();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn single_party_is_identity() {
        let mut dc = DynamicCollective::new(1, ReduceOp::Max);
        assert_eq!(dc.reduce(4.0), 4.0);
        assert_eq!(dc.reduce(-1.0), -1.0);
        assert_eq!(dc.generation(), 2);
    }

    #[test]
    fn repeated_generations_across_threads() {
        let dc = DynamicCollective::<i64>::new(4, ReduceOp::Sum);
        let results: Vec<Vec<i64>> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|p| {
                    let mut h = dc.clone();
                    s.spawn(move || (0..5).map(|k| h.reduce(p + k)).collect::<Vec<_>>())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for per_party in results {
            let expected: Vec<i64> = (0..5).map(|k| 6 + 4 * k).collect();
            assert_eq!(per_party, expected);
        }
    }
}
