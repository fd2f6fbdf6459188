//! One task per partition.
//!
//! Partition tasks block on barriers and collectives, so each one needs its
//! own thread: the pool is sized to the partition count and every thread runs
//! exactly one task via `ThreadPool::broadcast`.

use log::debug;
use parking_lot::Mutex;

use crate::error::DistError;

/// Run `task(part, &mut parts[part])` concurrently for every partition.
///
/// Results are returned in partition order.
pub fn launch<V, F, R>(parts: &mut [V], task: F) -> Result<Vec<R>, DistError>
where
    V: Send,
    F: Fn(usize, &mut V) -> R + Sync,
    R: Send,
{
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    let n = parts.len();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .thread_name(|i| format!("partition-{i}"))
        .build()
        .map_err(|e| DistError::Runtime(e.to_string()))?;
    debug!("launching {n} partition tasks");
    let slots: Vec<Mutex<&mut V>> = parts.iter_mut().map(Mutex::new).collect();
    Ok(pool.broadcast(|ctx| {
        let part = ctx.index();
        let mut slot = slots[part].lock();
        task(part, &mut **slot)
    }))
}
