//! C-layout parameter blocks and the opaque handles returned to callers
use amrscope_core::{
    Axis, CenterSpec, Dataset, FieldGroup, LoadOptions, RangeSpec, Shape, Shell,
    SimulationMetadata, Snapshot, Unit, UnitConversions,
};
use std::ffi::c_char;
use std::str::FromStr;

use crate::error::DefaultAmrError;
use crate::helpers::{optional_str, required_str};

/// One simulation output. Immutable once opened, so it may be shared between threads.
pub struct AmrSnapshot {
    pub(crate) inner: Snapshot,
}

/// A loaded or carved table of rows. Immutable, so it may be shared between threads.
pub struct AmrDataset {
    pub(crate) inner: Dataset,
}

/// Field group selector. Passed across the boundary as `u32`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrFieldGroup {
    Hydro = 0,
    Gravity = 1,
    Particles = 2,
    Clumps = 3,
}

/// Error for a discriminant that names no variant
fn unknown_variant(param: &str, value: u32) -> DefaultAmrError {
    DefaultAmrError::invalid_parameter(param, &format!("no variant with value {value}"))
}

impl TryFrom<u32> for AmrFieldGroup {
    type Error = DefaultAmrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmrFieldGroup::Hydro),
            1 => Ok(AmrFieldGroup::Gravity),
            2 => Ok(AmrFieldGroup::Particles),
            3 => Ok(AmrFieldGroup::Clumps),
            _ => Err(unknown_variant("group", value)),
        }
    }
}

impl From<AmrFieldGroup> for FieldGroup {
    fn from(group: AmrFieldGroup) -> Self {
        match group {
            AmrFieldGroup::Hydro => FieldGroup::Hydro,
            AmrFieldGroup::Gravity => FieldGroup::Gravity,
            AmrFieldGroup::Particles => FieldGroup::Particles,
            AmrFieldGroup::Clumps => FieldGroup::Clumps,
        }
    }
}

/// Code-to-cgs scalars; mass and velocity are derived.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AmrUnits {
    /// Centimetres per code length unit
    pub length: f64,
    /// g/cm³ per code density unit
    pub density: f64,
    /// Seconds per code time unit
    pub time: f64,
}

/// Everything needed to open an output. Groups flagged `true` use their default variable
/// lists and file templates.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AmrSnapshotParams {
    /// Directory containing the `output_XXXXX` folders (UTF-8)
    pub path: *const c_char,
    pub output: u32,
    pub ncpu: u32,
    /// Box side length in code units
    pub box_length: f64,
    pub levelmin: u8,
    pub levelmax: u8,
    /// Simulation time in code units
    pub time: f64,
    pub units: AmrUnits,
    pub has_hydro: bool,
    pub has_gravity: bool,
    pub has_particles: bool,
    pub has_clumps: bool,
    /// Decode threads, 0 for the global pool
    pub threads: u32,
    /// Log load and subregion summaries at info level
    pub verbose: bool,
}

impl AmrSnapshotParams {
    /// # Safety
    /// `path` must be a valid null-terminated string.
    pub(crate) unsafe fn open(&self) -> Result<Snapshot, DefaultAmrError> {
        // SAFETY: forwarded caller contract
        let path = unsafe { required_str(self.path, "path") }?;
        let units = UnitConversions::from_ldt(self.units.length, self.units.density, self.units.time);
        let mut meta = SimulationMetadata::new(
            path,
            self.output,
            self.ncpu,
            self.box_length,
            (self.levelmin, self.levelmax),
            units,
        )
        .with_time(self.time);
        let flags = [
            (self.has_hydro, FieldGroup::Hydro),
            (self.has_gravity, FieldGroup::Gravity),
            (self.has_particles, FieldGroup::Particles),
            (self.has_clumps, FieldGroup::Clumps),
        ];
        for (present, group) in flags {
            if present {
                meta = meta.with_default_group(group);
            }
        }

        let mut options = LoadOptions::default().verbose(self.verbose);
        if self.threads > 0 {
            options.threads = Some(self.threads as usize);
        }
        Ok(Snapshot::new(meta)?.with_options(options))
    }
}

/// How the center of an [`AmrRange`] is given.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrCenterMode {
    /// Absolute bounds; shapes default to the box center
    None = 0,
    /// Bounds are offsets from the box center
    BoxCenter = 1,
    /// Bounds are offsets from `center`
    Point = 2,
}

impl TryFrom<u32> for AmrCenterMode {
    type Error = DefaultAmrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmrCenterMode::None),
            1 => Ok(AmrCenterMode::BoxCenter),
            2 => Ok(AmrCenterMode::Point),
            _ => Err(unknown_variant("center_mode", value)),
        }
    }
}

/// Spatial range. An axis whose two bounds are both NaN is unrestricted.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AmrRange {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
    /// An [`AmrCenterMode`] value
    pub center_mode: u32,
    /// Used with [`AmrCenterMode::Point`], in `unit`
    pub center: [f64; 3],
    /// Unit symbol such as `"kpc"`; null for fractions of the box
    pub unit: *const c_char,
}

fn axis_bounds(bounds: [f64; 2]) -> Option<[f64; 2]> {
    (!(bounds[0].is_nan() && bounds[1].is_nan())).then_some(bounds)
}

/// Parse an optional unit symbol, null meaning [`Unit::Standard`].
///
/// # Safety
/// `unit` must be null or a valid null-terminated string.
pub(crate) unsafe fn parse_unit(unit: *const c_char) -> Result<Unit, DefaultAmrError> {
    // SAFETY: forwarded caller contract
    match unsafe { optional_str(unit, "unit") }? {
        Some(symbol) => Ok(Unit::from_str(symbol)?),
        None => Ok(Unit::Standard),
    }
}

impl AmrRange {
    /// # Safety
    /// `unit` must be null or a valid null-terminated string.
    pub(crate) unsafe fn to_spec(&self) -> Result<RangeSpec, DefaultAmrError> {
        let center = match AmrCenterMode::try_from(self.center_mode)? {
            AmrCenterMode::None => CenterSpec::Unspecified,
            AmrCenterMode::BoxCenter => CenterSpec::BoxCenter,
            AmrCenterMode::Point => CenterSpec::at(self.center[0], self.center[1], self.center[2]),
        };
        Ok(RangeSpec {
            xrange: axis_bounds(self.x),
            yrange: axis_bounds(self.y),
            zrange: axis_bounds(self.z),
            center,
            // SAFETY: forwarded caller contract
            range_unit: unsafe { parse_unit(self.unit) }?,
            center_unit: None,
        })
    }
}

/// Resolve an optional range pointer; null selects the whole domain.
///
/// # Safety
/// `range` must be null or point to a valid [`AmrRange`].
pub(crate) unsafe fn range_spec(range: *const AmrRange) -> Result<RangeSpec, DefaultAmrError> {
    // SAFETY: caller guarantees validity when non-null
    match unsafe { range.as_ref() } {
        // SAFETY: forwarded caller contract
        Some(range) => unsafe { range.to_spec() },
        None => Ok(RangeSpec::new()),
    }
}

/// Cylinder axis.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl TryFrom<u32> for AmrAxis {
    type Error = DefaultAmrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmrAxis::X),
            1 => Ok(AmrAxis::Y),
            2 => Ok(AmrAxis::Z),
            _ => Err(unknown_variant("direction", value)),
        }
    }
}

impl From<AmrAxis> for Axis {
    fn from(axis: AmrAxis) -> Self {
        match axis {
            AmrAxis::X => Axis::X,
            AmrAxis::Y => Axis::Y,
            AmrAxis::Z => Axis::Z,
        }
    }
}


#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrShapeKind {
    /// The axis ranges of the accompanying [`AmrRange`]
    Cuboid = 0,
    Cylinder = 1,
    Sphere = 2,
}

impl TryFrom<u32> for AmrShapeKind {
    type Error = DefaultAmrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmrShapeKind::Cuboid),
            1 => Ok(AmrShapeKind::Cylinder),
            2 => Ok(AmrShapeKind::Sphere),
            _ => Err(unknown_variant("kind", value)),
        }
    }
}

/// Subregion shape; lengths are in the unit of the accompanying [`AmrRange`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AmrShape {
    /// An [`AmrShapeKind`] value
    pub kind: u32,
    pub radius: f64,
    /// Full cylinder height
    pub height: f64,
    /// An [`AmrAxis`] value, read for cylinders only
    pub direction: u32,
}

impl TryFrom<&AmrShape> for Shape {
    type Error = DefaultAmrError;

    fn try_from(shape: &AmrShape) -> Result<Self, Self::Error> {
        Ok(match AmrShapeKind::try_from(shape.kind)? {
            AmrShapeKind::Cuboid => Shape::Cuboid,
            AmrShapeKind::Cylinder => Shape::Cylinder {
                radius: shape.radius,
                height: shape.height,
                direction: AmrAxis::try_from(shape.direction)?.into(),
            },
            AmrShapeKind::Sphere => Shape::Sphere {
                radius: shape.radius,
            },
        })
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmrShellKind {
    Cylinder = 0,
    Sphere = 1,
}

impl TryFrom<u32> for AmrShellKind {
    type Error = DefaultAmrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AmrShellKind::Cylinder),
            1 => Ok(AmrShellKind::Sphere),
            _ => Err(unknown_variant("kind", value)),
        }
    }
}

/// Shell between two radii; lengths are in the unit of the accompanying [`AmrRange`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AmrShell {
    /// An [`AmrShellKind`] value
    pub kind: u32,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Full cylinder height
    pub height: f64,
    /// An [`AmrAxis`] value, read for cylinders only
    pub direction: u32,
}

impl TryFrom<&AmrShell> for Shell {
    type Error = DefaultAmrError;

    fn try_from(shell: &AmrShell) -> Result<Self, Self::Error> {
        let radii = [shell.inner_radius, shell.outer_radius];
        Ok(match AmrShellKind::try_from(shell.kind)? {
            AmrShellKind::Cylinder => Shell::Cylinder {
                radii,
                height: shell.height,
                direction: AmrAxis::try_from(shell.direction)?.into(),
            },
            AmrShellKind::Sphere => Shell::Sphere { radii },
        })
    }
}
