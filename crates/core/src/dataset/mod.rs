//! Immutable column-oriented dataset
//!
//! A [`Dataset`] is produced by the ingestion engine or by region carving and never
//! mutated afterwards. Rows are cells (hydro, gravity), particles or clumps. Every dataset
//! carries its provenance: field group, selected variables, the refinement levels present,
//! the applied range, and a shared reference to the unit table of its output.
//!
//! # Column layout
//! - grid groups: `level`, `cx`, `cy`, `cz` (i32), then the selected variables (f64)
//! - particles: `level` (i32), `x`, `y`, `z` (f64, fractional), `id` (i64),
//!   `family`, `tag` (i8), then the selected variables
//! - clumps: `x`, `y`, `z` (f64, fractional), then the selected variables

pub mod overview;

pub use overview::{ColumnSummary, LevelSummary};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core_types::{DVec3, Dimension, FieldGroup, Unit, UnitScaleTable};
use crate::error::{Error, Result};
use crate::grid::indexing::{cell_center, cell_size};
use crate::grid::range::{spatial_factor, ResolvedRange};

/// Geometry columns of grid datasets
pub const GRID_GEOMETRY: [&str; 4] = ["level", "cx", "cy", "cz"];
/// Geometry and classifier columns of particle datasets
pub const PARTICLE_GEOMETRY: [&str; 7] = ["level", "x", "y", "z", "id", "family", "tag"];
/// Geometry columns of clump datasets
pub const CLUMP_GEOMETRY: [&str; 3] = ["x", "y", "z"];

/// Typed storage of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    /// Floating point values
    F64(Vec<f64>),
    /// 64-bit identifiers
    I64(Vec<i64>),
    /// Levels and cell indices
    I32(Vec<i32>),
    /// Small classifiers
    I8(Vec<i8>),
}

impl ColumnData {
    /// Number of values
    pub fn len(&self) -> usize {
        match self {
            ColumnData::F64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::I32(v) => v.len(),
            ColumnData::I8(v) => v.len(),
        }
    }

    /// Whether the column holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnData::F64(_) => "f64",
            ColumnData::I64(_) => "i64",
            ColumnData::I32(_) => "i32",
            ColumnData::I8(_) => "i8",
        }
    }

    /// Value at `row` widened to f64
    pub fn value_f64(&self, row: usize) -> f64 {
        match self {
            ColumnData::F64(v) => v[row],
            ColumnData::I64(v) => v[row] as f64,
            ColumnData::I32(v) => f64::from(v[row]),
            ColumnData::I8(v) => f64::from(v[row]),
        }
    }

    /// Append another column of the same type; returns `false` on a type mismatch
    pub(crate) fn append(&mut self, other: ColumnData) -> bool {
        match (self, other) {
            (ColumnData::F64(a), ColumnData::F64(b)) => a.extend(b),
            (ColumnData::I64(a), ColumnData::I64(b)) => a.extend(b),
            (ColumnData::I32(a), ColumnData::I32(b)) => a.extend(b),
            (ColumnData::I8(a), ColumnData::I8(b)) => a.extend(b),
            _ => return false,
        }
        true
    }

    /// Rows where `mask` is set, order preserved
    pub(crate) fn select(&self, mask: &[bool]) -> Self {
        fn pick<T: Copy>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(&v, _)| v)
                .collect()
        }
        match self {
            ColumnData::F64(v) => ColumnData::F64(pick(v, mask)),
            ColumnData::I64(v) => ColumnData::I64(pick(v, mask)),
            ColumnData::I32(v) => ColumnData::I32(pick(v, mask)),
            ColumnData::I8(v) => ColumnData::I8(pick(v, mask)),
        }
    }
}

/// Named column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub(crate) fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column values
    pub fn data(&self) -> &ColumnData {
        &self.data
    }
}

/// Borrowed view of the geometry columns
pub(crate) enum Geometry<'a> {
    Cells {
        level: &'a [i32],
        cx: &'a [i32],
        cy: &'a [i32],
        cz: &'a [i32],
    },
    Points {
        x: &'a [f64],
        y: &'a [f64],
        z: &'a [f64],
    },
}

impl Geometry<'_> {
    /// Fractional position of a row; cell centers derive from the integer indices
    #[inline]
    pub(crate) fn position(&self, row: usize) -> DVec3 {
        match self {
            Geometry::Cells { level, cx, cy, cz } => {
                let l = level[row];
                DVec3::new(
                    cell_center(l, cx[row]),
                    cell_center(l, cy[row]),
                    cell_center(l, cz[row]),
                )
            }
            Geometry::Points { x, y, z } => DVec3::new(x[row], y[row], z[row]),
        }
    }
}

/// Immutable, column-oriented selection of one field group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    kind: FieldGroup,
    columns: Vec<Column>,
    selected: Vec<String>,
    levels: Option<(u8, u8)>,
    range: ResolvedRange,
    scale: Arc<UnitScaleTable>,
    box_length: f64,
    rows: usize,
}

impl Dataset {
    /// Assemble a dataset; only the ingestion engine and region carving call this
    pub(crate) fn from_parts(
        kind: FieldGroup,
        columns: Vec<Column>,
        selected: Vec<String>,
        fallback_levels: Option<(u8, u8)>,
        range: ResolvedRange,
        scale: Arc<UnitScaleTable>,
        box_length: f64,
    ) -> Self {
        let rows = columns.first().map_or(0, |c| c.data.len());
        debug_assert!(columns.iter().all(|c| c.data.len() == rows));
        let levels = observed_levels(&columns).or(fallback_levels);
        Self {
            kind,
            columns,
            selected,
            levels,
            range,
            scale,
            box_length,
            rows,
        }
    }

    /// Field group the rows belong to
    pub fn kind(&self) -> FieldGroup {
        self.kind
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All column names in storage order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// All columns in storage order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Selected physical variables, in caller order
    pub fn selected_variables(&self) -> &[String] {
        &self.selected
    }

    /// `(min, max)` refinement level present; the requested bounds for empty datasets and
    /// `None` for clump catalogs, which carry no level
    pub fn level_bounds(&self) -> Option<(u8, u8)> {
        self.levels
    }

    /// Applied range (provenance)
    pub fn range(&self) -> &ResolvedRange {
        &self.range
    }

    /// Unit table of the originating output
    pub fn scale(&self) -> &Arc<UnitScaleTable> {
        &self.scale
    }

    /// Box length in code units
    pub fn box_length(&self) -> f64 {
        self.box_length
    }

    /// Column by name
    ///
    /// # Errors
    /// Returns [`Error::UnknownColumn`] if absent.
    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.data)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    /// Floating point column by name
    ///
    /// # Errors
    /// [`Error::UnknownColumn`] or [`Error::ColumnType`].
    pub fn f64_column(&self, name: &str) -> Result<&[f64]> {
        match self.column(name)? {
            ColumnData::F64(v) => Ok(v),
            other => Err(type_error(name, "f64", other)),
        }
    }

    /// i32 column by name
    ///
    /// # Errors
    /// [`Error::UnknownColumn`] or [`Error::ColumnType`].
    pub fn i32_column(&self, name: &str) -> Result<&[i32]> {
        match self.column(name)? {
            ColumnData::I32(v) => Ok(v),
            other => Err(type_error(name, "i32", other)),
        }
    }

    /// i64 column by name
    ///
    /// # Errors
    /// [`Error::UnknownColumn`] or [`Error::ColumnType`].
    pub fn i64_column(&self, name: &str) -> Result<&[i64]> {
        match self.column(name)? {
            ColumnData::I64(v) => Ok(v),
            other => Err(type_error(name, "i64", other)),
        }
    }

    /// i8 column by name
    ///
    /// # Errors
    /// [`Error::UnknownColumn`] or [`Error::ColumnType`].
    pub fn i8_column(&self, name: &str) -> Result<&[i8]> {
        match self.column(name)? {
            ColumnData::I8(v) => Ok(v),
            other => Err(type_error(name, "i8", other)),
        }
    }

    /// A floating point column converted from code units to `unit`
    ///
    /// [`Unit::Standard`] returns stored values. Point positions `x`, `y`, `z` are box
    /// fractions and take any length unit; other variables need a unit of their own
    /// dimension, or a number density for mass densities.
    ///
    /// # Errors
    /// [`Error::UnknownColumn`], [`Error::ColumnType`], or [`Error::UnitMismatch`] when
    /// the unit cannot express the variable.
    pub fn variable(&self, name: &str, unit: Unit) -> Result<Vec<f64>> {
        let values = self.f64_column(name)?;
        let position = !self.kind.is_grid() && matches!(name, "x" | "y" | "z");
        let factor = if position && unit.is_spatial() {
            spatial_factor(unit, &self.scale, self.box_length)?
        } else if Dimension::of_variable(name).map_or(unit == Unit::Standard, |d| d.accepts(unit)) {
            self.scale.get(unit)
        } else {
            return Err(Error::UnitMismatch {
                name: name.to_string(),
                unit,
            });
        };
        Ok(values.iter().map(|v| v * factor).collect())
    }

    /// Row positions (cell centers or particle/clump positions) in a spatial unit;
    /// [`Unit::Standard`] gives fractions of the box
    ///
    /// # Errors
    /// [`Error::InvalidRangeSpec`] for a non-length unit.
    pub fn positions(&self, unit: Unit) -> Result<Vec<DVec3>> {
        let factor = spatial_factor(unit, &self.scale, self.box_length)?;
        let geometry = self.geometry()?;
        Ok((0..self.rows)
            .map(|row| geometry.position(row) * factor)
            .collect())
    }

    /// Cell side lengths in a spatial unit (grid groups only)
    ///
    /// # Errors
    /// [`Error::InvalidRangeSpec`] for a non-length unit, [`Error::UnknownColumn`] for
    /// datasets without cell indices.
    pub fn cell_sizes(&self, unit: Unit) -> Result<Vec<f64>> {
        let factor = spatial_factor(unit, &self.scale, self.box_length)?;
        if !self.kind.is_grid() {
            return Err(Error::UnknownColumn("cx".to_string()));
        }
        Ok(self
            .i32_column("level")?
            .iter()
            .map(|&l| cell_size(l) * factor)
            .collect())
    }

    /// Applied range in a spatial unit
    ///
    /// # Errors
    /// [`Error::InvalidRangeSpec`] for a non-length unit.
    pub fn extent(&self, unit: Unit) -> Result<[[f64; 2]; 3]> {
        self.range.in_unit(unit, &self.scale, self.box_length)
    }

    pub(crate) fn geometry(&self) -> Result<Geometry<'_>> {
        if self.kind.is_grid() {
            Ok(Geometry::Cells {
                level: self.i32_column("level")?,
                cx: self.i32_column("cx")?,
                cy: self.i32_column("cy")?,
                cz: self.i32_column("cz")?,
            })
        } else {
            Ok(Geometry::Points {
                x: self.f64_column("x")?,
                y: self.f64_column("y")?,
                z: self.f64_column("z")?,
            })
        }
    }

    /// New dataset with the rows where `mask` is set and the given provenance range
    pub(crate) fn select_rows(&self, mask: &[bool], range: ResolvedRange) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data.select(mask)))
            .collect();
        Dataset::from_parts(
            self.kind,
            columns,
            self.selected.clone(),
            self.levels,
            range,
            Arc::clone(&self.scale),
            self.box_length,
        )
    }
}

fn type_error(name: &str, expected: &'static str, found: &ColumnData) -> Error {
    Error::ColumnType {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Min and max of the `level` column, `None` if absent or empty
fn observed_levels(columns: &[Column]) -> Option<(u8, u8)> {
    let level = columns.iter().find(|c| c.name == "level")?;
    let ColumnData::I32(values) = &level.data else {
        return None;
    };
    let (min, max) = values
        .iter()
        .fold(None, |acc: Option<(i32, i32)>, &l| match acc {
            None => Some((l, l)),
            Some((lo, hi)) => Some((lo.min(l), hi.max(l))),
        })?;
    Some((min.clamp(0, 255) as u8, max.clamp(0, 255) as u8))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core_types::units::KPC_CM;
    use crate::core_types::UnitConversions;
    use approx::assert_relative_eq;

    pub(crate) fn scale_48kpc() -> Arc<UnitScaleTable> {
        Arc::new(UnitScaleTable::build(&UnitConversions::from_ldt(
            KPC_CM, 1.0e-24, 1.0e15,
        )))
    }

    /// Grid dataset from `(level, cx, cy, cz, rho)` rows, box length 48
    pub(crate) fn grid_dataset(rows: &[(i32, i32, i32, i32, f64)]) -> Dataset {
        let columns = vec![
            Column::new("level", ColumnData::I32(rows.iter().map(|r| r.0).collect())),
            Column::new("cx", ColumnData::I32(rows.iter().map(|r| r.1).collect())),
            Column::new("cy", ColumnData::I32(rows.iter().map(|r| r.2).collect())),
            Column::new("cz", ColumnData::I32(rows.iter().map(|r| r.3).collect())),
            Column::new("rho", ColumnData::F64(rows.iter().map(|r| r.4).collect())),
        ];
        Dataset::from_parts(
            FieldGroup::Hydro,
            columns,
            vec!["rho".to_string()],
            Some((1, 10)),
            ResolvedRange::full_domain(),
            scale_48kpc(),
            48.0,
        )
    }

    #[test]
    fn test_provenance_and_levels() {
        let ds = grid_dataset(&[(3, 1, 1, 1, 1.0), (5, 2, 2, 2, 2.0), (4, 8, 8, 8, 3.0)]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.level_bounds(), Some((3, 5)));
        assert_eq!(ds.column_names(), vec!["level", "cx", "cy", "cz", "rho"]);
        assert_eq!(ds.selected_variables(), &["rho".to_string()]);

        let empty = grid_dataset(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.level_bounds(), Some((1, 10)));
        assert_eq!(empty.column_names().len(), 5);
    }

    #[test]
    fn test_typed_column_access() {
        let ds = grid_dataset(&[(3, 1, 1, 1, 1.5)]);
        assert_eq!(ds.f64_column("rho").unwrap(), &[1.5]);
        assert_eq!(ds.i32_column("cx").unwrap(), &[1]);
        assert!(matches!(
            ds.f64_column("level"),
            Err(Error::ColumnType { expected: "f64", found: "i32", .. })
        ));
        assert!(matches!(ds.column("vx"), Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_positions_and_sizes_in_units() {
        // Level 1 cell 2 along x: center 0.75 of a 48 kpc box
        let ds = grid_dataset(&[(1, 2, 1, 1, 1.0)]);
        let pos = ds.positions(Unit::Kpc).unwrap();
        assert_relative_eq!(pos[0].x, 36.0, epsilon = 1e-12);
        assert_relative_eq!(pos[0].y, 12.0, epsilon = 1e-12);
        let frac = ds.positions(Unit::Standard).unwrap();
        assert_eq!(frac[0].x, 0.75);

        let sizes = ds.cell_sizes(Unit::Kpc).unwrap();
        assert_relative_eq!(sizes[0], 24.0, epsilon = 1e-12);
        assert!(ds.positions(Unit::Msun).is_err());
    }

    #[test]
    fn test_variable_in_unit() {
        let ds = grid_dataset(&[(1, 1, 1, 1, 2.0)]);
        let rho = ds.variable("rho", Unit::GPerCm3).unwrap();
        assert_relative_eq!(rho[0], 2.0e-24, max_relative = 1e-14);
        assert_eq!(ds.variable("rho", Unit::Standard).unwrap(), vec![2.0]);
        assert!(ds.variable("rho", Unit::HPerCc).unwrap()[0] > 0.0);
        assert!(matches!(
            ds.variable("rho", Unit::Kpc),
            Err(Error::UnitMismatch { unit: Unit::Kpc, .. })
        ));
        assert!(matches!(
            ds.variable("level", Unit::Standard),
            Err(Error::ColumnType { .. })
        ));
    }

    #[test]
    fn test_point_variables_in_unit() {
        let columns = vec![
            Column::new("x", ColumnData::F64(vec![0.25])),
            Column::new("y", ColumnData::F64(vec![0.5])),
            Column::new("z", ColumnData::F64(vec![0.5])),
            Column::new("relevance", ColumnData::F64(vec![3.0])),
        ];
        let ds = Dataset::from_parts(
            FieldGroup::Clumps,
            columns,
            vec!["relevance".to_string()],
            None,
            ResolvedRange::full_domain(),
            scale_48kpc(),
            48.0,
        );
        assert_eq!(ds.level_bounds(), None);
        assert_relative_eq!(ds.variable("x", Unit::Kpc).unwrap()[0], 12.0, epsilon = 1e-12);
        assert_eq!(ds.variable("x", Unit::Standard).unwrap(), vec![0.25]);
        assert!(ds.variable("x", Unit::Msun).is_err());
        assert_eq!(ds.variable("relevance", Unit::Standard).unwrap(), vec![3.0]);
        assert!(matches!(
            ds.variable("relevance", Unit::Msun),
            Err(Error::UnitMismatch { .. })
        ));
    }

    #[test]
    fn test_select_rows_keeps_schema() {
        let ds = grid_dataset(&[(3, 1, 1, 1, 1.0), (5, 2, 2, 2, 2.0)]);
        let sub = ds.select_rows(&[false, true], ResolvedRange::full_domain());
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.f64_column("rho").unwrap(), &[2.0]);
        assert_eq!(sub.level_bounds(), Some((5, 5)));
        assert!(Arc::ptr_eq(sub.scale(), ds.scale()));

        let none = ds.select_rows(&[false, false], ResolvedRange::full_domain());
        assert!(none.is_empty());
        assert_eq!(none.column_names(), ds.column_names());
        assert_eq!(none.level_bounds(), ds.level_bounds());
    }

    #[test]
    fn test_append_type_mismatch() {
        let mut a = ColumnData::F64(vec![1.0]);
        assert!(a.append(ColumnData::F64(vec![2.0])));
        assert!(!a.append(ColumnData::I32(vec![3])));
        assert_eq!(a, ColumnData::F64(vec![1.0, 2.0]));
    }
}
