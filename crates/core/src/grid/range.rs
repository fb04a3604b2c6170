//! Spatial range resolution
//!
//! Users describe the region to load or carve in whatever convention suits them:
//! fractions of the box, physical lengths from the box origin, offsets around an explicit
//! center, or the box center shortcut on some or all axes. [`RangeSpec::resolve`]
//! normalizes all of these into one [`ResolvedRange`] in fractional `[0, 1]³` coordinates.
//!
//! # Conventions
//! - Without a center, axis ranges are absolute positions measured from the box origin.
//! - With a center, axis ranges are offsets added to the center coordinate, so
//!   `center = box center, xrange = [-0.1, 0.1]` selects `[0.4, 0.6]`.
//! - An axis without a range spans the whole domain `[0, 1]`.
//! - Values in [`Unit::Standard`] are already fractions; physical values are divided by
//!   the box length expressed in that unit.
//!
//! Out-of-domain bounds are kept as-is; they simply select nothing.

use serde::{Deserialize, Serialize};

use crate::core_types::{DVec3, Unit, UnitScaleTable};
use crate::error::{Error, Result};

/// Axis-aligned box in fractional domain coordinates plus the resolved center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRange {
    /// Lower x bound
    pub xmin: f64,
    /// Upper x bound
    pub xmax: f64,
    /// Lower y bound
    pub ymin: f64,
    /// Upper y bound
    pub ymax: f64,
    /// Lower z bound
    pub zmin: f64,
    /// Upper z bound
    pub zmax: f64,
    /// Resolved center point
    pub center: DVec3,
}

impl ResolvedRange {
    /// The whole domain with center `[0.5, 0.5, 0.5]`
    pub fn full_domain() -> Self {
        Self::from_bounds([[0.0, 1.0]; 3])
    }

    /// Box from per-axis `[min, max]` pairs, centered on its midpoint
    pub fn from_bounds(bounds: [[f64; 2]; 3]) -> Self {
        let center = DVec3::new(
            0.5 * (bounds[0][0] + bounds[0][1]),
            0.5 * (bounds[1][0] + bounds[1][1]),
            0.5 * (bounds[2][0] + bounds[2][1]),
        );
        Self::with_center(bounds, center)
    }

    /// Box from per-axis `[min, max]` pairs with an explicit center
    pub fn with_center(bounds: [[f64; 2]; 3], center: DVec3) -> Self {
        Self {
            xmin: bounds[0][0],
            xmax: bounds[0][1],
            ymin: bounds[1][0],
            ymax: bounds[1][1],
            zmin: bounds[2][0],
            zmax: bounds[2][1],
            center,
        }
    }

    /// Per-axis `[min, max]` pairs
    pub fn bounds(&self) -> [[f64; 2]; 3] {
        [
            [self.xmin, self.xmax],
            [self.ymin, self.ymax],
            [self.zmin, self.zmax],
        ]
    }

    /// Whether the box covers the whole domain
    pub fn is_full_domain(&self) -> bool {
        self.bounds()
            .iter()
            .all(|&[lo, hi]| lo <= 0.0 && hi >= 1.0)
    }

    /// Bounds expressed in a spatial unit
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`] if `unit` is not a length unit.
    pub fn in_unit(
        &self,
        unit: Unit,
        scale: &UnitScaleTable,
        box_length: f64,
    ) -> Result<[[f64; 2]; 3]> {
        let factor = spatial_factor(unit, scale, box_length)?;
        Ok(self.bounds().map(|[lo, hi]| [lo * factor, hi * factor]))
    }
}

impl Default for ResolvedRange {
    fn default() -> Self {
        Self::full_domain()
    }
}

/// One axis of an explicit center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CenterAxis {
    /// Coordinate in the center unit
    Value(f64),
    /// Middle of the box on this axis
    BoxCenter,
}

/// Center of a range or shape
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CenterSpec {
    /// No center; ranges are absolute
    #[default]
    Unspecified,
    /// Middle of the box on every axis
    BoxCenter,
    /// Per-axis center, mixing coordinates and box-center sentinels
    Axes([CenterAxis; 3]),
}

impl CenterSpec {
    /// Center at explicit coordinates
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        CenterSpec::Axes([
            CenterAxis::Value(x),
            CenterAxis::Value(y),
            CenterAxis::Value(z),
        ])
    }

    /// Parse textual center tokens
    ///
    /// Accepts a single sentinel (`["bc"]`, `["boxcenter"]`) or exactly three entries, each
    /// a number or a sentinel (`["0.3", "bc", "12.5"]`).
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`] for any other length or an unrecognized token.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        match tokens {
            [single] => {
                let token = single.as_ref().trim();
                if is_box_center_token(token) {
                    Ok(CenterSpec::BoxCenter)
                } else {
                    Err(Error::InvalidRangeSpec(format!(
                        "single-entry center must be a box-center sentinel, got '{token}'"
                    )))
                }
            }
            [x, y, z] => Ok(CenterSpec::Axes([
                parse_axis(x.as_ref())?,
                parse_axis(y.as_ref())?,
                parse_axis(z.as_ref())?,
            ])),
            _ => Err(Error::InvalidRangeSpec(format!(
                "center needs 1 sentinel or 3 entries, got {}",
                tokens.len()
            ))),
        }
    }
}

fn is_box_center_token(token: &str) -> bool {
    matches!(token, "bc" | "boxcenter" | ":bc" | ":boxcenter")
}

fn parse_axis(token: &str) -> Result<CenterAxis> {
    let token = token.trim();
    if is_box_center_token(token) {
        return Ok(CenterAxis::BoxCenter);
    }
    token
        .parse::<f64>()
        .map(CenterAxis::Value)
        .map_err(|_| Error::InvalidRangeSpec(format!("unrecognized center entry '{token}'")))
}

/// User-facing range specification
///
/// ```
/// use amrscope_core::grid::range::{CenterSpec, RangeSpec};
/// use amrscope_core::core_types::Unit;
///
/// // 10 kpc on either side of the box center along x, full extent in y and z
/// let spec = RangeSpec::new()
///     .x([-10.0, 10.0])
///     .center(CenterSpec::BoxCenter)
///     .unit(Unit::Kpc);
/// assert_eq!(spec.xrange, Some([-10.0, 10.0]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeSpec {
    /// x bounds (absolute) or offsets (with a center)
    pub xrange: Option<[f64; 2]>,
    /// y bounds (absolute) or offsets (with a center)
    pub yrange: Option<[f64; 2]>,
    /// z bounds (absolute) or offsets (with a center)
    pub zrange: Option<[f64; 2]>,
    /// Center of the selection
    pub center: CenterSpec,
    /// Unit of the axis ranges, shape radii and heights
    pub range_unit: Unit,
    /// Unit of explicit center coordinates; falls back to `range_unit`
    pub center_unit: Option<Unit>,
}

impl RangeSpec {
    /// Whole domain, fractional units
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the x range
    pub fn x(mut self, range: [f64; 2]) -> Self {
        self.xrange = Some(range);
        self
    }

    /// Set the y range
    pub fn y(mut self, range: [f64; 2]) -> Self {
        self.yrange = Some(range);
        self
    }

    /// Set the z range
    pub fn z(mut self, range: [f64; 2]) -> Self {
        self.zrange = Some(range);
        self
    }

    /// Set the center
    pub fn center(mut self, center: CenterSpec) -> Self {
        self.center = center;
        self
    }

    /// Set the unit of ranges (and of the center unless overridden)
    pub fn unit(mut self, unit: Unit) -> Self {
        self.range_unit = unit;
        self
    }

    /// Set a separate unit for explicit center coordinates
    pub fn center_unit(mut self, unit: Unit) -> Self {
        self.center_unit = Some(unit);
        self
    }

    /// Convert a length in `range_unit` to a fraction of the box
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`] if `range_unit` is not a length unit.
    pub fn length_to_fraction(
        &self,
        value: f64,
        scale: &UnitScaleTable,
        box_length: f64,
    ) -> Result<f64> {
        Ok(value / spatial_factor(self.range_unit, scale, box_length)?)
    }

    /// Resolve the fractional center, `None` when unspecified
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`] for a non-length center unit or non-finite
    /// coordinate.
    pub fn resolve_center(
        &self,
        scale: &UnitScaleTable,
        box_length: f64,
    ) -> Result<Option<DVec3>> {
        let unit = self.center_unit.unwrap_or(self.range_unit);
        let factor = spatial_factor(unit, scale, box_length)?;
        let axes = match self.center {
            CenterSpec::Unspecified => return Ok(None),
            CenterSpec::BoxCenter => [CenterAxis::BoxCenter; 3],
            CenterSpec::Axes(axes) => axes,
        };
        let mut center = [0.5; 3];
        for (slot, axis) in center.iter_mut().zip(axes) {
            if let CenterAxis::Value(v) = axis {
                if !v.is_finite() {
                    return Err(Error::InvalidRangeSpec(format!(
                        "center coordinate must be finite, got {v}"
                    )));
                }
                *slot = v / factor;
            }
        }
        Ok(Some(DVec3::new(center[0], center[1], center[2])))
    }

    /// Normalize into fractional domain coordinates
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`] when a unit is not a length unit, a bound is not
    /// finite, or a lower bound exceeds its upper bound.
    pub fn resolve(&self, scale: &UnitScaleTable, box_length: f64) -> Result<ResolvedRange> {
        let factor = spatial_factor(self.range_unit, scale, box_length)?;
        let center = self.resolve_center(scale, box_length)?;

        let axes = [self.xrange, self.yrange, self.zrange];
        let mut bounds = [[0.0, 1.0]; 3];
        for (axis, range) in axes.iter().enumerate() {
            let Some([lo, hi]) = *range else { continue };
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(Error::InvalidRangeSpec(format!(
                    "{} range must be finite, got [{lo}, {hi}]",
                    AXIS_NAMES[axis]
                )));
            }
            if lo > hi {
                return Err(Error::InvalidRangeSpec(format!(
                    "{} range lower bound {lo} exceeds upper bound {hi}",
                    AXIS_NAMES[axis]
                )));
            }
            let offset = center.map_or(0.0, |c| c[axis]);
            bounds[axis] = [offset + lo / factor, offset + hi / factor];
        }

        Ok(match center {
            Some(c) => ResolvedRange::with_center(bounds, c),
            None => ResolvedRange::from_bounds(bounds),
        })
    }
}

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// Length of the whole box expressed in `unit`
pub(crate) fn spatial_factor(unit: Unit, scale: &UnitScaleTable, box_length: f64) -> Result<f64> {
    if !unit.is_spatial() {
        return Err(Error::InvalidRangeSpec(format!(
            "unit '{unit}' is not a length unit"
        )));
    }
    Ok(match unit {
        Unit::Standard => 1.0,
        _ => box_length * scale.get(unit),
    })
}

/// Resolve `spec` against an output's scale table and box length
///
/// # Errors
/// See [`RangeSpec::resolve`].
pub fn resolve(spec: &RangeSpec, scale: &UnitScaleTable, box_length: f64) -> Result<ResolvedRange> {
    spec.resolve(scale, box_length)
}
