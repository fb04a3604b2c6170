//! AMR addressing and range resolution

pub mod indexing;
pub mod range;

// Re-export main types
pub use indexing::{cell_bounds, cell_center, cell_size, point_in_box, IndexWindow};
pub use range::{resolve, CenterAxis, CenterSpec, RangeSpec, ResolvedRange};
