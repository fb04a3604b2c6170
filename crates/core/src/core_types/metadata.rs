//! Simulation metadata consumed by the ingestion engine
//!
//! Header parsing (namelist, info and descriptor text files) happens outside this crate.
//! The caller builds a [`SimulationMetadata`] with the handful of scalars the core needs:
//! box length, refinement bounds, the five code-to-cgs conversion factors, and for each
//! field group its ordered variable list and per-rank file template.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// One of the parallel data streams written per output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldGroup {
    /// Hydrodynamic cells
    Hydro,
    /// Gravitational potential and acceleration cells
    Gravity,
    /// Collisionless particles
    Particles,
    /// Clump finder catalog entries
    Clumps,
}

impl FieldGroup {
    /// All field groups in canonical order
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::Hydro,
        FieldGroup::Gravity,
        FieldGroup::Particles,
        FieldGroup::Clumps,
    ];

    /// Lowercase name used in logs and file templates
    pub fn name(self) -> &'static str {
        match self {
            FieldGroup::Hydro => "hydro",
            FieldGroup::Gravity => "gravity",
            FieldGroup::Particles => "particles",
            FieldGroup::Clumps => "clumps",
        }
    }

    /// Whether rows of this group are AMR cells addressed by `(level, cx, cy, cz)`
    pub fn is_grid(self) -> bool {
        matches!(self, FieldGroup::Hydro | FieldGroup::Gravity)
    }

    /// Per-rank file name template used when the caller does not supply one
    pub fn default_template(self) -> &'static str {
        match self {
            FieldGroup::Hydro => "output_{output}/hydro_{output}.out{rank}",
            FieldGroup::Gravity => "output_{output}/grav_{output}.out{rank}",
            FieldGroup::Particles => "output_{output}/part_{output}.out{rank}",
            FieldGroup::Clumps => "output_{output}/clump_{output}.txt{rank}",
        }
    }

    /// Variable list used by [`SimulationMetadata::with_default_group`]
    pub fn default_variables(self) -> &'static [&'static str] {
        match self {
            FieldGroup::Hydro => &["rho", "vx", "vy", "vz", "p"],
            FieldGroup::Gravity => &["epot", "ax", "ay", "az"],
            FieldGroup::Particles => &["vx", "vy", "vz", "mass", "birth"],
            FieldGroup::Clumps => &[
                "index", "lev", "parent", "ncell", "peak_x", "peak_y", "peak_z", "rho-",
                "rho+", "rho_av", "mass_cl", "relevance",
            ],
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Code-to-cgs conversion scalars of one output
///
/// `physical_cgs = code_value * factor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitConversions {
    /// Centimetres per code length unit
    pub length: f64,
    /// g/cm³ per code density unit
    pub density: f64,
    /// Grams per code mass unit
    pub mass: f64,
    /// cm/s per code velocity unit
    pub velocity: f64,
    /// Seconds per code time unit
    pub time: f64,
}

impl UnitConversions {
    /// Build the five scalars from length, density and time, deriving mass and velocity
    /// the way the simulation code does (`m = d l³`, `v = l / t`).
    pub fn from_ldt(length: f64, density: f64, time: f64) -> Self {
        Self {
            length,
            density,
            mass: density * length.powi(3),
            velocity: length / time,
            time,
        }
    }
}

/// Layout of one field group: whether it was written, its variables and file template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayout {
    /// Ordered variable names as declared by the output
    pub variables: Vec<String>,
    /// File template with `{output}` and `{rank}` placeholders, relative to the
    /// metadata root path
    pub file_template: String,
}

/// Simulation scalars and field-group layout for one output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    /// Directory containing the `output_XXXXX` folders
    pub path: PathBuf,
    /// Output number
    pub output: u32,
    /// Number of compute ranks (files per field group)
    pub ncpu: u32,
    /// Box side length in code units
    pub box_length: f64,
    /// Coarsest refinement level
    pub levelmin: u8,
    /// Finest refinement level
    pub levelmax: u8,
    /// Simulation time in code units
    pub time: f64,
    /// Code-to-cgs conversion scalars
    pub units: UnitConversions,
    /// Present field groups
    pub groups: FxHashMap<FieldGroup, GroupLayout>,
}

impl SimulationMetadata {
    /// Create metadata with no field groups
    pub fn new(
        path: impl Into<PathBuf>,
        output: u32,
        ncpu: u32,
        box_length: f64,
        levels: (u8, u8),
        units: UnitConversions,
    ) -> Self {
        Self {
            path: path.into(),
            output,
            ncpu,
            box_length,
            levelmin: levels.0,
            levelmax: levels.1,
            time: 0.0,
            units,
            groups: FxHashMap::default(),
        }
    }

    /// Set the simulation time (code units)
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    /// Declare a field group with the given variable list and the default file template
    pub fn with_group<S: AsRef<str>>(mut self, group: FieldGroup, variables: &[S]) -> Self {
        self.groups.insert(
            group,
            GroupLayout {
                variables: variables.iter().map(|v| v.as_ref().to_string()).collect(),
                file_template: group.default_template().to_string(),
            },
        );
        self
    }

    /// Declare a field group with its default variable list
    pub fn with_default_group(self, group: FieldGroup) -> Self {
        self.with_group(group, group.default_variables())
    }

    /// Override the file template of an already declared group
    pub fn with_template(mut self, group: FieldGroup, template: impl Into<String>) -> Self {
        if let Some(layout) = self.groups.get_mut(&group) {
            layout.file_template = template.into();
        }
        self
    }

    /// Whether the group was written for this output
    pub fn has_group(&self, group: FieldGroup) -> bool {
        self.groups.contains_key(&group)
    }

    /// Layout of a present group
    ///
    /// # Errors
    /// Returns [`Error::FieldGroupAbsent`] if the group was not declared.
    pub fn group(&self, group: FieldGroup) -> Result<&GroupLayout> {
        self.groups.get(&group).ok_or(Error::FieldGroupAbsent(group))
    }

    /// Path of the per-rank file for `rank` (1-based)
    ///
    /// # Errors
    /// Returns [`Error::FieldGroupAbsent`] if the group was not declared.
    pub fn rank_path(&self, group: FieldGroup, rank: u32) -> Result<PathBuf> {
        let layout = self.group(group)?;
        Ok(render_template(&self.path, &layout.file_template, self.output, rank))
    }

    /// Check the scalars the core depends on
    ///
    /// # Errors
    /// Returns [`Error::InvalidMetadata`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.ncpu == 0 {
            return Err(Error::InvalidMetadata("ncpu must be at least 1".into()));
        }
        if !(self.box_length.is_finite() && self.box_length > 0.0) {
            return Err(Error::InvalidMetadata(format!(
                "box length must be finite and positive, got {}",
                self.box_length
            )));
        }
        if self.levelmin > self.levelmax {
            return Err(Error::InvalidMetadata(format!(
                "levelmin {} exceeds levelmax {}",
                self.levelmin, self.levelmax
            )));
        }
        // 2^levelmax cell indices must fit in an i32
        if self.levelmax > 30 {
            return Err(Error::InvalidMetadata(format!(
                "levelmax {} exceeds supported maximum 30",
                self.levelmax
            )));
        }
        let u = &self.units;
        for (name, value) in [
            ("length", u.length),
            ("density", u.density),
            ("mass", u.mass),
            ("velocity", u.velocity),
            ("time", u.time),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidMetadata(format!(
                    "{name} conversion must be finite and positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

fn render_template(root: &Path, template: &str, output: u32, rank: u32) -> PathBuf {
    let name = template
        .replace("{output}", &format!("{output:05}"))
        .replace("{rank}", &format!("{rank:05}"));
    root.join(name)
}
