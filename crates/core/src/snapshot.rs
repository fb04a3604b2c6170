//! One simulation output ready for loading
//!
//! A [`Snapshot`] validates the caller's metadata once, derives the unit table and shares it
//! with every dataset it loads. Loaders resolve the range and check the level cap before
//! the ingestion engine opens any file.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LoadOptions;
use crate::core_types::{FieldGroup, SimulationMetadata, Unit, UnitScaleTable};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::grid::range::{RangeSpec, ResolvedRange};
use crate::io::{ingest, VariableSelection};

/// Selection of one load call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Variables to read
    pub variables: VariableSelection,
    /// Spatial range
    pub ranges: RangeSpec,
    /// Finest level to keep, `None` for the simulation's finest level
    pub lmax: Option<u8>,
}

impl LoadRequest {
    /// Everything: all variables, the whole domain, every level
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the variable selection
    pub fn variables(mut self, variables: VariableSelection) -> Self {
        self.variables = variables;
        self
    }

    /// Set the range
    pub fn ranges(mut self, ranges: RangeSpec) -> Self {
        self.ranges = ranges;
        self
    }

    /// Set the level cap
    pub fn lmax(mut self, lmax: u8) -> Self {
        self.lmax = Some(lmax);
        self
    }
}

/// Metadata of one output plus its shared unit table
#[derive(Debug, Clone)]
pub struct Snapshot {
    meta: SimulationMetadata,
    scale: Arc<UnitScaleTable>,
    options: LoadOptions,
}

impl Snapshot {
    /// Validate metadata and build the unit table
    ///
    /// # Errors
    /// Returns [`Error::InvalidMetadata`](crate::Error::InvalidMetadata) for unusable scalars.
    pub fn new(meta: SimulationMetadata) -> Result<Self> {
        meta.validate()?;
        let scale = Arc::new(UnitScaleTable::build(&meta.units));
        Ok(Self {
            meta,
            scale,
            options: LoadOptions::default(),
        })
    }

    /// Replace the options used by the loaders
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Options used by the loaders
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Metadata of the output
    pub fn metadata(&self) -> &SimulationMetadata {
        &self.meta
    }

    /// Shared unit table
    pub fn scale(&self) -> &Arc<UnitScaleTable> {
        &self.scale
    }

    /// Simulation time in `unit`
    pub fn time(&self, unit: Unit) -> f64 {
        self.scale.to_physical(self.meta.time, unit)
    }

    /// Box side length in `unit`
    pub fn box_length(&self, unit: Unit) -> f64 {
        self.scale.to_physical(self.meta.box_length, unit)
    }

    /// Resolve a range against this output
    ///
    /// # Errors
    /// Returns [`Error::InvalidRangeSpec`](crate::Error::InvalidRangeSpec).
    pub fn resolve(&self, ranges: &RangeSpec) -> Result<ResolvedRange> {
        ranges.resolve(&self.scale, self.meta.box_length)
    }

    /// Load a field group
    ///
    /// # Errors
    /// Configuration errors before any I/O, then ingestion errors.
    pub fn load(&self, group: FieldGroup, request: &LoadRequest) -> Result<Dataset> {
        let range = self.resolve(&request.ranges)?;
        ingest(
            &self.meta,
            &self.scale,
            group,
            &request.variables,
            &range,
            request.lmax,
            &self.options,
        )
    }

    /// Load hydro cells
    ///
    /// # Errors
    /// See [`Snapshot::load`].
    pub fn load_hydro(&self, request: &LoadRequest) -> Result<Dataset> {
        self.load(FieldGroup::Hydro, request)
    }

    /// Load gravity cells
    ///
    /// # Errors
    /// See [`Snapshot::load`].
    pub fn load_gravity(&self, request: &LoadRequest) -> Result<Dataset> {
        self.load(FieldGroup::Gravity, request)
    }

    /// Load particles
    ///
    /// # Errors
    /// See [`Snapshot::load`].
    pub fn load_particles(&self, request: &LoadRequest) -> Result<Dataset> {
        self.load(FieldGroup::Particles, request)
    }

    /// Load the clump catalog
    ///
    /// # Errors
    /// See [`Snapshot::load`].
    pub fn load_clumps(&self, request: &LoadRequest) -> Result<Dataset> {
        self.load(FieldGroup::Clumps, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::units::{KPC_CM, YR_S};
    use crate::core_types::UnitConversions;
    use crate::error::Error;
    use approx::assert_relative_eq;

    fn meta() -> SimulationMetadata {
        SimulationMetadata::new(
            "/nonexistent/sim",
            7,
            4,
            48.0,
            (6, 10),
            UnitConversions::from_ldt(KPC_CM, 1.0e-24, 1.0e6 * YR_S),
        )
        .with_time(250.0)
        .with_default_group(FieldGroup::Hydro)
    }

    #[test]
    fn test_time_and_box_in_units() {
        let snap = Snapshot::new(meta()).unwrap();
        assert_relative_eq!(snap.time(Unit::Myr), 250.0, max_relative = 1e-12);
        assert_relative_eq!(snap.time(Unit::Gyr), 0.25, max_relative = 1e-12);
        assert_relative_eq!(snap.box_length(Unit::Kpc), 48.0, max_relative = 1e-12);
        assert_relative_eq!(snap.box_length(Unit::Pc), 48_000.0, max_relative = 1e-12);
    }

    #[test]
    fn test_configuration_errors_precede_io() {
        // The path does not exist; every failure below must be raised before opening files
        let snap = Snapshot::new(meta()).unwrap();
        let bad_range = LoadRequest::new().ranges(RangeSpec::new().x([0.8, 0.2]));
        assert!(matches!(
            snap.load_hydro(&bad_range),
            Err(Error::InvalidRangeSpec(_))
        ));
        assert!(matches!(
            snap.load_hydro(&LoadRequest::new().lmax(11)),
            Err(Error::InvalidLevelCap { requested: 11, .. })
        ));
        assert!(matches!(
            snap.load_hydro(&LoadRequest::new().lmax(5)),
            Err(Error::InvalidLevelCap { .. })
        ));
        assert!(matches!(
            snap.load_hydro(&LoadRequest::new().variables(VariableSelection::one("temp"))),
            Err(Error::UnknownVariable { .. })
        ));
        assert!(matches!(
            snap.load_particles(&LoadRequest::new()),
            Err(Error::FieldGroupAbsent(FieldGroup::Particles))
        ));
        assert!(matches!(
            snap.load_hydro(&LoadRequest::new()),
            Err(Error::MissingFile { .. })
        ));
    }

    #[test]
    fn test_invalid_metadata_rejected() {
        let mut bad = meta();
        bad.box_length = 0.0;
        assert!(matches!(Snapshot::new(bad), Err(Error::InvalidMetadata(_))));
    }
}
