//! AMR Snapshot Core Library
//!
//! Ingests the per-rank binary output of an adaptive-mesh-refinement simulation (hydro and
//! gravity cells, particles, clump catalogs) into immutable, column-oriented, unit-aware
//! datasets, and carves geometric subregions out of them.
//!
//! ## Pipeline
//!
//! - [`SimulationMetadata`] (supplied by the caller) feeds the [`UnitScaleTable`]
//! - [`RangeSpec`] resolves into a fractional [`ResolvedRange`]
//! - [`ingest`] decodes every rank file in parallel, filtering by range and level cap
//! - [`subregion`] and [`shellregion`] filter an existing [`Dataset`] by shape
//!
//! [`Snapshot`] bundles the first three steps behind `load_hydro`, `load_gravity`,
//! `load_particles` and `load_clumps`.

// Core types and utilities
pub mod core_types;
pub mod config;
pub mod error;

// Addressing, ingestion and selection
pub mod dataset;
pub mod grid;
pub mod io;
pub mod region;
pub mod snapshot;

// Re-export core types
pub use core_types::{FieldGroup, GroupLayout, SimulationMetadata, UnitConversions};
pub use core_types::{DVec3, Dimension, Unit, UnitScaleTable};

pub use config::LoadOptions;
pub use dataset::{Column, ColumnData, ColumnSummary, Dataset, LevelSummary};
pub use error::{Error, Result};
pub use grid::{CenterAxis, CenterSpec, IndexWindow, RangeSpec, ResolvedRange};
pub use io::{ingest, VariableRef, VariableSelection};
pub use region::{shellregion, subregion, Axis, Shape, Shell};
pub use snapshot::{LoadRequest, Snapshot};
