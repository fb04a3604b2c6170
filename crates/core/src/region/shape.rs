//! Region shapes and their membership predicates
//!
//! User-facing shapes carry lengths in the caller's range unit. [`Region`] is the same
//! shape resolved to fractional domain coordinates, ready to test row positions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core_types::DVec3;
use crate::error::{Error, Result};
use crate::grid::indexing::point_in_box;
use crate::grid::range::ResolvedRange;

/// Axial direction of a cylinder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    /// x axis
    X,
    /// y axis
    Y,
    /// z axis
    #[default]
    Z,
}

impl Axis {
    /// Component index of the axis
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim_start_matches(':').to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(Error::InvalidShape(format!("unknown axis '{other}'"))),
        }
    }
}

/// Solid region, lengths in the range unit of the accompanying range specification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned box given by the range specification itself
    Cuboid,
    /// Cylinder symmetric about the center plane along `direction`
    Cylinder {
        /// Radius orthogonal to the axis
        radius: f64,
        /// Full height along the axis
        height: f64,
        /// Axial direction
        direction: Axis,
    },
    /// Sphere about the center
    Sphere {
        /// Radius
        radius: f64,
    },
}

/// Hollow region between an inner and an outer radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shell {
    /// Cylindrical shell
    Cylinder {
        /// `[inner, outer]` radii
        radii: [f64; 2],
        /// Full height along the axis
        height: f64,
        /// Axial direction
        direction: Axis,
    },
    /// Spherical shell
    Sphere {
        /// `[inner, outer]` radii
        radii: [f64; 2],
    },
}

impl Shell {
    /// Outer and inner solid shapes
    pub fn bounds(&self) -> (Shape, Shape) {
        match *self {
            Shell::Cylinder {
                radii,
                height,
                direction,
            } => (
                Shape::Cylinder {
                    radius: radii[1],
                    height,
                    direction,
                },
                Shape::Cylinder {
                    radius: radii[0],
                    height,
                    direction,
                },
            ),
            Shell::Sphere { radii } => (
                Shape::Sphere { radius: radii[1] },
                Shape::Sphere { radius: radii[0] },
            ),
        }
    }

    /// Reject negative, non-finite or inverted radii
    ///
    /// # Errors
    /// Returns [`Error::InvalidShape`].
    pub fn validate(&self) -> Result<()> {
        let (outer, inner) = self.bounds();
        outer.validate()?;
        inner.validate()?;
        let radii = match self {
            Shell::Cylinder { radii, .. } | Shell::Sphere { radii } => radii,
        };
        if radii[0] > radii[1] {
            return Err(Error::InvalidShape(format!(
                "inner radius {} exceeds outer radius {}",
                radii[0], radii[1]
            )));
        }
        Ok(())
    }
}

impl Shape {
    /// Reject negative or non-finite lengths
    ///
    /// # Errors
    /// Returns [`Error::InvalidShape`].
    pub fn validate(&self) -> Result<()> {
        let lengths = match *self {
            Shape::Cuboid => vec![],
            Shape::Cylinder { radius, height, .. } => vec![("radius", radius), ("height", height)],
            Shape::Sphere { radius } => vec![("radius", radius)],
        };
        for (name, value) in lengths {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidShape(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// RESOLVED REGIONS
// ============================================================================

/// Shape in fractional domain coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Region {
    Cuboid(ResolvedRange),
    Cylinder {
        center: DVec3,
        radius: f64,
        half_height: f64,
        axis: Axis,
    },
    Sphere {
        center: DVec3,
        radius: f64,
    },
}

impl Region {
    /// Inclusive membership test
    #[inline]
    pub(crate) fn contains(&self, p: &DVec3) -> bool {
        match self {
            Region::Cuboid(range) => point_in_box(p, range),
            Region::Cylinder {
                center,
                radius,
                half_height,
                axis,
            } => {
                let d = p - center;
                let a = axis.index();
                let (u, v) = ((a + 1) % 3, (a + 2) % 3);
                d[a].abs() <= *half_height && d[u] * d[u] + d[v] * d[v] <= radius * radius
            }
            Region::Sphere { center, radius } => (p - center).norm_squared() <= radius * radius,
        }
    }

    /// Axis-aligned bounding box, centered on the region center
    pub(crate) fn bounding_box(&self) -> ResolvedRange {
        let (center, half) = match self {
            Region::Cuboid(range) => return *range,
            Region::Cylinder {
                center,
                radius,
                half_height,
                axis,
            } => {
                let mut half = DVec3::repeat(*radius);
                half[axis.index()] = *half_height;
                (*center, half)
            }
            Region::Sphere { center, radius } => (*center, DVec3::repeat(*radius)),
        };
        ResolvedRange::with_center(
            [
                [center.x - half.x, center.x + half.x],
                [center.y - half.y, center.y + half.y],
                [center.z - half.z, center.z + half.z],
            ],
            center,
        )
    }
}
