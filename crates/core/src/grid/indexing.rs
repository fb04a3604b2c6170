//! AMR cell addressing in the normalized domain
//!
//! A cell at refinement level `L` with 1-based integer index `c` along an axis spans
//! `[(c - 1) / 2^L, c / 2^L]`, so its side is `1 / 2^L` and its center is
//! `(c - 0.5) / 2^L`. Every geometric predicate derives positions from the
//! `(level, cx, cy, cz)` tuple with these relations. Multiplying or dividing by a power
//! of two is exact in binary floating point, so no rounding drift accumulates however
//! many cells are tested.
//!
//! Two membership tests coexist:
//! - ingestion keeps a cell when its cube *overlaps* the selection box
//!   ([`cell_overlaps_box`], evaluated on integer indices through [`IndexWindow`])
//! - subregion carving tests the cell *center* against the shape
//!   ([`cell_center`] feeding the shape predicates)
//!
//! Boundary cells therefore survive loading but may fall out of a subregion with the same
//! box. The two tests are kept distinct on purpose.

use crate::core_types::DVec3;
use crate::grid::range::ResolvedRange;

/// Side length of a cell at `level` as a fraction of the box
#[inline]
pub fn cell_size(level: i32) -> f64 {
    0.5_f64.powi(level)
}

/// Fractional center coordinate of index `c` (1-based) at `level`
#[inline]
pub fn cell_center(level: i32, c: i32) -> f64 {
    (f64::from(c) - 0.5) * cell_size(level)
}

/// Center position and half side length of a cell
#[inline]
pub fn cell_bounds(level: i32, cx: i32, cy: i32, cz: i32) -> (DVec3, f64) {
    let center = DVec3::new(
        cell_center(level, cx),
        cell_center(level, cy),
        cell_center(level, cz),
    );
    (center, 0.5 * cell_size(level))
}

/// Inclusive per-axis interval test of a point against the box
#[inline]
pub fn point_in_box(point: &DVec3, range: &ResolvedRange) -> bool {
    point.x >= range.xmin
        && point.x <= range.xmax
        && point.y >= range.ymin
        && point.y <= range.ymax
        && point.z >= range.zmin
        && point.z <= range.zmax
}

/// Whether the cell's cube overlaps the box (conservative ingestion filter)
#[inline]
pub fn cell_overlaps_box(level: i32, cx: i32, cy: i32, cz: i32, range: &ResolvedRange) -> bool {
    IndexWindow::new(range, level).contains(cx, cy, cz)
}

/// Per-level window of integer cell indices whose cubes overlap a box
///
/// For an axis bound `[min, max]`, the overlapping 1-based indices at level `L` are
/// `floor(min * 2^L) + 1 ..= ceil(max * 2^L)`. A cell that only touches the box on a face
/// is not retained; a degenerate box inside a cell retains that cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    lo: [i64; 3],
    hi: [i64; 3],
}

impl IndexWindow {
    /// Compute the window for `level`
    pub fn new(range: &ResolvedRange, level: i32) -> Self {
        let n = 2.0_f64.powi(level);
        let bounds = range.bounds();
        let mut lo = [0_i64; 3];
        let mut hi = [0_i64; 3];
        for axis in 0..3 {
            // Indices live in 1..=n, so clamping one step outside keeps huge bounds from
            // overflowing without changing membership
            lo[axis] = (bounds[axis][0] * n).floor().clamp(-1.0, n + 1.0) as i64 + 1;
            hi[axis] = (bounds[axis][1] * n).ceil().clamp(-1.0, n + 1.0) as i64;
        }
        Self { lo, hi }
    }

    /// Whether the window holds no index on some axis
    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| self.lo[a] > self.hi[a])
    }

    /// Whether the cell `(cx, cy, cz)` lies in the window
    #[inline]
    pub fn contains(&self, cx: i32, cy: i32, cz: i32) -> bool {
        let c = [i64::from(cx), i64::from(cy), i64::from(cz)];
        (0..3).all(|a| c[a] >= self.lo[a] && c[a] <= self.hi[a])
    }
}
