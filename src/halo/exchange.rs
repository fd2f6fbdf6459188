//! One generation of the two-phase pull exchange.

use log::trace;

use crate::error::DistError;
use crate::matrix::SparseMatrixView;

/// Make the halo columns of `x` current with their owning partitions.
///
/// `x` holds one value per local column: owned rows first, then the halo in
/// neighbor order. Every partition must call this once per generation, in
/// lockstep with its neighbors; a partition that never calls blocks them.
pub fn exchange_halo(view: &mut SparseMatrixView, x: &mut [f64]) -> Result<(), DistError> {
    let nrows = view.geometry().local_xyz();
    let ncols = view.summary().local_number_of_columns;
    debug_assert_eq!(x.len(), ncols);
    let rank = view.rank();
    let elements = view
        .elements_to_send
        .as_deref()
        .ok_or(DistError::HaloNotReady("exchange before halo negotiation"))?;
    let sync = view
        .synchronizers
        .item_mut()
        .as_mut()
        .ok_or(DistError::HaloNotReady("exchange before synchronizers are wired"))?;
    if sync.neighbors.is_empty() {
        return Ok(());
    }
    debug_assert_eq!(sync.neighbors.len(), view.pulls.len());

    // Nobody may still be reading the previous generation.
    sync.wait_buffer_free();
    {
        let mut buf = view.pull_buffer.write();
        for (slot, &row) in buf.iter_mut().zip(elements) {
            *slot = x[row];
        }
    }
    trace!("partition {rank}: generation {} ready", sync.generation());
    sync.mine.ready.arrive();

    let mut offset = nrows;
    for (nbr, cap) in sync.neighbors.iter().zip(&view.pulls) {
        nbr.ready.wait();
        {
            let src = cap.acquire();
            x[offset..offset + src.len()].copy_from_slice(&src);
            offset += src.len();
        }
        nbr.done.arrive();
        trace!("partition {rank}: pulled from {}", cap.owner());
    }
    debug_assert_eq!(offset, ncols);
    sync.advance();
    Ok(())
}
