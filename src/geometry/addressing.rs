//! Row addressing: (geometry, local 3-D index) <-> global row id.
//!
//! Local points are flattened x-fastest, then y, then z, both within a
//! partition and across the global grid. All functions are pure; passing
//! indices outside the local sub-grid violates the caller contract and is
//! only checked in debug builds.

use super::Geometry;

/// Flattened local index of local point `(lx, ly, lz)`.
#[inline]
pub fn local_index(g: &Geometry, lx: usize, ly: usize, lz: usize) -> usize {
    debug_assert!(lx < g.nx && ly < g.ny && lz < g.nz, "local point out of range");
    lz * g.nx * g.ny + ly * g.nx + lx
}

/// Local point of flattened local index `idx`.
#[inline]
pub fn local_coords(g: &Geometry, idx: usize) -> (usize, usize, usize) {
    debug_assert!(idx < g.local_xyz(), "local index out of range");
    let lz = idx / (g.nx * g.ny);
    let rem = idx - lz * g.nx * g.ny;
    (rem % g.nx, rem / g.nx, lz)
}

/// Global row id of local point `(lx, ly, lz)` on the partition described by `g`.
#[inline]
pub fn global_row(g: &Geometry, lx: usize, ly: usize, lz: usize) -> usize {
    debug_assert!(lx < g.nx && ly < g.ny && lz < g.nz, "local point out of range");
    let gnx = g.gnx();
    let gny = g.gny();
    (g.ipz * g.nz + lz) * gnx * gny + (g.ipy * g.ny + ly) * gnx + (g.ipx * g.nx + lx)
}

/// Global coordinate `(gx, gy, gz)` of a global row id.
#[inline]
pub fn global_coords(g: &Geometry, row: usize) -> (usize, usize, usize) {
    let gnx = g.gnx();
    let gny = g.gny();
    let gz = row / (gnx * gny);
    let rem = row - gz * gnx * gny;
    (rem % gnx, rem / gnx, gz)
}

/// Global row id of global coordinate `(gx, gy, gz)`.
#[inline]
pub fn global_row_of(g: &Geometry, gx: usize, gy: usize, gz: usize) -> usize {
    gz * g.gnx() * g.gny() + gy * g.gnx() + gx
}

/// Owning rank and local point of a global row.
pub fn owner_of(g: &Geometry, row: usize) -> (usize, (usize, usize, usize)) {
    let (gx, gy, gz) = global_coords(g, row);
    let rank = g.rank_of(gx / g.nx, gy / g.ny, gz / g.nz);
    (rank, (gx % g.nx, gy % g.ny, gz % g.nz))
}

/// Local point of `row` if the partition described by `g` owns it.
pub fn local_row(g: &Geometry, row: usize) -> Option<(usize, usize, usize)> {
    let (rank, local) = owner_of(g, row);
    (rank == g.rank).then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_rows_on_second_partition() {
        // 2x1x1 process grid, 4x4x4 local blocks: rank 1 starts at gx = 4.
        let g = Geometry::new(2, 1, (2, 1, 1), (4, 4, 4), 27, 1).unwrap();
        assert_eq!(global_row(&g, 0, 0, 0), 4);
        assert_eq!(global_row(&g, 3, 3, 3), 3 * 8 * 4 + 3 * 8 + 7);
        assert_eq!(local_row(&g, 4), Some((0, 0, 0)));
        assert_eq!(local_row(&g, 0), None);
        assert_eq!(owner_of(&g, 3), (0, (3, 0, 0)));
    }

    #[test]
    fn local_index_round_trip() {
        let g = Geometry::new(1, 0, (1, 1, 1), (3, 5, 2), 27, 1).unwrap();
        for idx in 0..g.local_xyz() {
            let (x, y, z) = local_coords(&g, idx);
            assert_eq!(local_index(&g, x, y, z), idx);
        }
    }
}
