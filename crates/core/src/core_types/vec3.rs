//! Vector type alias for domain positions.

use nalgebra::Vector3;

/// 3D vector type for positions in the normalized `[0, 1]³` domain.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`. Double precision keeps cell
/// centers at level 30 (`2^-31` spacing) exactly representable.
pub type DVec3 = Vector3<f64>;
