//! Geometric subregion engine
//!
//! Carves rows out of an already loaded [`Dataset`] without touching any file. Each row is
//! represented by one point: the cell center for grid data, the stored position for
//! particles and clumps. Membership is inclusive on every boundary.
//!
//! Provenance of the result is the shape's axis-aligned bounding box, or the input range
//! when the selection is inverted (the complement of a shape has no tighter box).

pub mod shape;

pub use shape::{Axis, Shape, Shell};

use rayon::prelude::*;

use crate::config::{summary, LoadOptions};
use crate::core_types::DVec3;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::grid::range::{RangeSpec, ResolvedRange};
use shape::Region;

/// Row count above which the membership mask is evaluated on the rayon pool
const PARALLEL_THRESHOLD: usize = 1 << 16;

/// Keep the rows inside `shape` (or outside it when `inverse` is set)
///
/// The cuboid is the resolved range of `spec`. Cylinders and spheres are centered on the
/// center of `spec` (the box center when unspecified); their lengths use `spec`'s range
/// unit. Axis ranges of `spec` are ignored for those shapes.
///
/// # Errors
/// [`Error::InvalidShape`](crate::Error::InvalidShape) for bad lengths,
/// [`Error::InvalidRangeSpec`](crate::Error::InvalidRangeSpec) for bad ranges or units.
pub fn subregion(
    ds: &Dataset,
    shape: &Shape,
    spec: &RangeSpec,
    inverse: bool,
    options: &LoadOptions,
) -> Result<Dataset> {
    shape.validate()?;
    let region = resolve_region(ds, shape, spec)?;
    let provenance = if inverse {
        *ds.range()
    } else {
        region.bounding_box()
    };
    let out = carve(ds, provenance, |p| region.contains(p) != inverse)?;
    summary!(
        options,
        group = %ds.kind(),
        shape = ?shape,
        inverse,
        rows_in = ds.len(),
        rows_out = out.len(),
        "Subregion kept {} of {} rows",
        out.len(),
        ds.len()
    );
    Ok(out)
}

/// Keep the rows between the inner and outer radius of `shell`
///
/// A row belongs to the shell when it lies in the outer shape and not in the inner one,
/// so the inner surface itself is excluded. With `inverse` the complement is returned.
///
/// # Errors
/// [`Error::InvalidShape`](crate::Error::InvalidShape) for bad or inverted radii,
/// [`Error::InvalidRangeSpec`](crate::Error::InvalidRangeSpec) for a bad center or unit.
pub fn shellregion(
    ds: &Dataset,
    shell: &Shell,
    spec: &RangeSpec,
    inverse: bool,
    options: &LoadOptions,
) -> Result<Dataset> {
    shell.validate()?;
    let (outer, inner) = shell.bounds();
    let outer = resolve_region(ds, &outer, spec)?;
    let inner = resolve_region(ds, &inner, spec)?;
    let provenance = if inverse {
        *ds.range()
    } else {
        outer.bounding_box()
    };
    let out = carve(ds, provenance, |p| {
        (outer.contains(p) && !inner.contains(p)) != inverse
    })?;
    summary!(
        options,
        group = %ds.kind(),
        shell = ?shell,
        inverse,
        rows_in = ds.len(),
        rows_out = out.len(),
        "Shell region kept {} of {} rows",
        out.len(),
        ds.len()
    );
    Ok(out)
}

/// Shape in fractional coordinates of the dataset's box
fn resolve_region(ds: &Dataset, shape: &Shape, spec: &RangeSpec) -> Result<Region> {
    let scale = ds.scale();
    let box_length = ds.box_length();
    let to_fraction = |length: f64| spec.length_to_fraction(length, scale, box_length);
    let center = || -> Result<DVec3> {
        Ok(spec
            .resolve_center(scale, box_length)?
            .unwrap_or_else(|| ResolvedRange::full_domain().center))
    };

    Ok(match *shape {
        Shape::Cuboid => Region::Cuboid(spec.resolve(scale, box_length)?),
        Shape::Cylinder {
            radius,
            height,
            direction,
        } => Region::Cylinder {
            center: center()?,
            radius: to_fraction(radius)?,
            half_height: 0.5 * to_fraction(height)?,
            axis: direction,
        },
        Shape::Sphere { radius } => Region::Sphere {
            center: center()?,
            radius: to_fraction(radius)?,
        },
    })
}

/// Filter rows by a predicate on their representative point
fn carve<F>(ds: &Dataset, provenance: ResolvedRange, keep: F) -> Result<Dataset>
where
    F: Fn(&DVec3) -> bool + Sync,
{
    let geometry = ds.geometry()?;
    let mask: Vec<bool> = if ds.len() >= PARALLEL_THRESHOLD {
        (0..ds.len())
            .into_par_iter()
            .map(|row| keep(&geometry.position(row)))
            .collect()
    } else {
        (0..ds.len())
            .map(|row| keep(&geometry.position(row)))
            .collect()
    };
    Ok(ds.select_rows(&mask, provenance))
}
