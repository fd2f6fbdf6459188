//! Halo negotiation from geometry alone.
//!
//! Both sides of every neighbor pair derive the same answer independently:
//! the owner packs the points adjacent to a neighbor into its pull buffer in
//! ascending local order, in neighbor-offset order, and the neighbor numbers
//! the matching ghost columns in that same order. No communication is needed
//! to agree on bases, extents, or column ids.

use std::collections::HashMap;
use std::ops::Range;

use log::debug;

use super::{BaseExtent, PhaseBarriers, Synchronizers};
use crate::error::DistError;
use crate::geometry::{Geometry, global_row, local_coords, local_index};
use crate::matrix::SparseMatrixView;
use crate::runtime::PullCapability;

/// Candidate neighbor directions `(dx, dy, dz)`, z slowest, x fastest.
pub const NEIGHBOR_OFFSETS: [(isize, isize, isize); 26] = neighbor_offsets();

const fn neighbor_offsets() -> [(isize, isize, isize); 26] {
    let mut out = [(0, 0, 0); 26];
    let mut k = 0;
    let mut dz = -1;
    while dz <= 1 {
        let mut dy = -1;
        while dy <= 1 {
            let mut dx = -1;
            while dx <= 1 {
                if !(dx == 0 && dy == 0 && dz == 0) {
                    out[k] = (dx, dy, dz);
                    k += 1;
                }
                dx += 1;
            }
            dy += 1;
        }
        dz += 1;
    }
    out
}

fn span(d: isize, n: usize) -> Range<usize> {
    match d {
        -1 => 0..1,
        1 => n - 1..n,
        _ => 0..n,
    }
}

fn shift(p: usize, d: isize, np: usize) -> Option<usize> {
    let q = p.checked_add_signed(d)?;
    (q < np).then_some(q)
}

/// Rank of the neighbor of `g` in direction `d`, if it exists.
pub fn neighbor_of(g: &Geometry, (dx, dy, dz): (isize, isize, isize)) -> Option<usize> {
    let px = shift(g.ipx, dx, g.npx)?;
    let py = shift(g.ipy, dy, g.npy)?;
    let pz = shift(g.ipz, dz, g.npz)?;
    Some(g.rank_of(px, py, pz))
}

/// Local indices of `g`'s points adjacent to its neighbor in direction `d`,
/// in ascending order.
pub fn shared_points(g: &Geometry, (dx, dy, dz): (isize, isize, isize)) -> Vec<usize> {
    let xs = span(dx, g.nx);
    let ys = span(dy, g.ny);
    let zs = span(dz, g.nz);
    let mut out = Vec::with_capacity(xs.len() * ys.len() * zs.len());
    for iz in zs {
        for iy in ys.clone() {
            for ix in xs.clone() {
                out.push(local_index(g, ix, iy, iz));
            }
        }
    }
    out
}

fn shared_count(g: &Geometry, (dx, dy, dz): (isize, isize, isize)) -> usize {
    span(dx, g.nx).len() * span(dy, g.ny).len() * span(dz, g.nz).len()
}

/// Offset in `g`'s pull buffer of the segment packed for direction `toward`.
fn send_offset(g: &Geometry, toward: (isize, isize, isize)) -> usize {
    NEIGHBOR_OFFSETS
        .iter()
        .take_while(|&&d| d != toward)
        .filter(|&&d| neighbor_of(g, d).is_some())
        .map(|&d| shared_count(g, d))
        .sum()
}

/// Negotiate the halo of one partition and translate its columns to local ids.
///
/// Fills the neighbor list, send lengths, pull ranges, elements to send and
/// the halo part of the summary. Requires the global-to-local map.
pub fn negotiate(view: &mut SparseMatrixView) -> Result<(), DistError> {
    let g = *view.geometry();
    let nrows = g.local_xyz();
    if view.global_to_local_map.len() != nrows {
        return Err(DistError::MapNotPopulated("halo negotiation"));
    }
    let mut neighbors = Vec::new();
    let mut send_length = Vec::new();
    let mut pull_bes = Vec::new();
    let mut elements_to_send = Vec::new();
    let mut external = HashMap::new();
    let mut next_col = nrows;
    for &d in NEIGHBOR_OFFSETS.iter() {
        let Some(q) = neighbor_of(&g, d) else { continue };
        let send = shared_points(&g, d);
        send_length.push(send.len());
        elements_to_send.extend_from_slice(&send);

        let qg = g.with_rank(q)?;
        let back = (-d.0, -d.1, -d.2);
        let ghosts = shared_points(&qg, back);
        pull_bes.push(BaseExtent::new(send_offset(&qg, back), ghosts.len()));
        for idx in ghosts {
            let (x, y, z) = local_coords(&qg, idx);
            external.insert(global_row(&qg, x, y, z), next_col);
            next_col += 1;
        }
        neighbors.push(q);
    }
    debug_assert!(neighbors.len() <= g.max_neighbors());

    let total_to_be_sent = elements_to_send.len();
    debug!(
        "partition {}: {} neighbors, {} to send, {} external",
        g.rank,
        neighbors.len(),
        total_to_be_sent,
        next_col - nrows
    );
    {
        let s = view.summary_mut();
        s.number_of_send_neighbors = neighbors.len();
        s.total_to_be_sent = total_to_be_sent;
        s.number_of_external_values = next_col - nrows;
        s.local_number_of_columns = next_col;
    }
    view.neighbors.clear();
    view.neighbors.extend(neighbors);
    view.send_length.clear();
    view.send_length.extend(send_length);
    view.pull_bes.clear();
    view.pull_bes.extend(pull_bes);
    view.elements_to_send = Some(elements_to_send);
    view.external_to_local_map = external;
    translate_columns(view)
}

/// Rewrite every global column index of the local rows as a local column.
fn translate_columns(view: &mut SparseMatrixView) -> Result<(), DistError> {
    let stencil = view.geometry().stencil_size;
    let owned = &view.global_to_local_map;
    let external = &view.external_to_local_map;
    let nnz = &view.nonzeros_in_row;
    let ind_g = &view.mtx_ind_g;
    let ind_l = &mut view.mtx_ind_l;
    for (row, &count) in nnz.iter().enumerate() {
        let start = row * stencil;
        for k in start..start + count as usize {
            let col = ind_g[k];
            ind_l[k] = owned
                .get(&col)
                .or_else(|| external.get(&col))
                .copied()
                .ok_or(DistError::UnreachableColumn(col))?;
        }
    }
    Ok(())
}

/// Give every partition its barrier handles and read capabilities.
///
/// `views` must be indexed by rank and every view must have been negotiated.
pub fn wire(views: &mut [SparseMatrixView]) -> Result<(), DistError> {
    if views.iter().any(|v| v.elements_to_send.is_none()) {
        return Err(DistError::HaloNotReady("wiring synchronizers"));
    }
    debug_assert!(views.iter().enumerate().all(|(p, v)| v.rank() == p));
    let owned: Vec<PhaseBarriers> =
        views.iter().map(|v| PhaseBarriers::new(v.neighbors.len())).collect();
    let grants: Vec<Vec<PullCapability>> = views
        .iter()
        .map(|v| {
            v.neighbors
                .iter()
                .zip(v.pull_bes.iter())
                .map(|(&q, be)| {
                    debug_assert!(be.end() <= views[q].pull_buffer.len());
                    views[q].pull_buffer.grant(be.range())
                })
                .collect()
        })
        .collect();
    for ((view, mine), pulls) in views.iter_mut().zip(&owned).zip(grants) {
        let nbrs = view.neighbors.iter().map(|&q| owned[q].clone()).collect();
        *view.synchronizers.item_mut() = Some(Synchronizers::new(mine.clone(), nbrs));
        view.pulls = pulls;
    }
    debug!("wired synchronizers for {} partitions", views.len());
    Ok(())
}
