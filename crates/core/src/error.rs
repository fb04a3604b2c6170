//! Error types for snapshot ingestion and region selection.
//!
//! Errors fall into three families:
//! - configuration errors (units, ranges, shapes, level caps, variable names), raised before
//!   any file is opened
//! - I/O and format errors, fatal for the whole ingestion call
//! - column access errors on an already-built dataset
//!
//! Empty selections are never errors; they produce zero-row datasets.

use std::path::PathBuf;
use thiserror::Error;

use crate::core_types::metadata::FieldGroup;
use crate::core_types::units::Unit;

/// Errors that can occur while resolving selections, decoding rank files or
/// reading dataset columns.
#[derive(Debug, Error)]
pub enum Error {
    /// A unit name did not match any entry of the unit table.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// A unit of the wrong physical dimension was requested for a variable.
    #[error("unit '{unit}' cannot express variable '{name}'")]
    UnitMismatch {
        /// Variable name.
        name: String,
        /// Requested unit.
        unit: Unit,
    },

    /// A range or center specification could not be resolved.
    #[error("invalid range specification: {0}")]
    InvalidRangeSpec(String),

    /// Shape parameters were out of domain (negative radius, inverted shell radii, ...).
    #[error("invalid region shape: {0}")]
    InvalidShape(String),

    /// Requested refinement cap lies outside the simulation's level bounds.
    #[error("level cap {requested} outside simulation levels [{levelmin}, {levelmax}]")]
    InvalidLevelCap {
        /// Requested maximum level.
        requested: u8,
        /// Coarsest level of the simulation.
        levelmin: u8,
        /// Finest level of the simulation.
        levelmax: u8,
    },

    /// Metadata supplied by the caller is not usable.
    #[error("invalid simulation metadata: {0}")]
    InvalidMetadata(String),

    /// The field group was not written for this output.
    #[error("field group {0} is not present in this output")]
    FieldGroupAbsent(FieldGroup),

    /// A variable reference could not be resolved against the declared list.
    #[error("{group}: unknown variable '{reference}' (declared: {declared:?})")]
    UnknownVariable {
        /// Field group the lookup ran against.
        group: FieldGroup,
        /// The reference as supplied by the caller.
        reference: String,
        /// Declared variable names of the group.
        declared: Vec<String>,
    },

    /// A per-rank file is absent.
    #[error("{group}: rank {rank} file not found: {path}")]
    MissingFile {
        /// Field group being ingested.
        group: FieldGroup,
        /// 1-based rank index.
        rank: u32,
        /// Path that was expected.
        path: PathBuf,
    },

    /// Any other I/O failure while reading a per-rank file.
    #[error("{group}: failed to read {path}: {source}")]
    Io {
        /// Field group being ingested.
        group: FieldGroup,
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The fixed header of a per-rank file is inconsistent or unreadable.
    #[error("{group}: malformed header in {path}: {reason}")]
    MalformedHeader {
        /// Field group being ingested.
        group: FieldGroup,
        /// The file being read.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// Header declares a different variable count than the metadata.
    #[error("{group}: {path} declares {found} variables, metadata lists {declared}")]
    VariableCountMismatch {
        /// Field group being ingested.
        group: FieldGroup,
        /// The file being read.
        path: PathBuf,
        /// Count from the metadata's variable list.
        declared: usize,
        /// Count found in the file header.
        found: usize,
    },

    /// The record payload after a valid header is truncated or inconsistent.
    #[error("{group}: corrupt payload in {path}: {reason}")]
    CorruptPayload {
        /// Field group being ingested.
        group: FieldGroup,
        /// The file being read.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// A column exists but holds a different element type than requested.
    #[error("column '{name}' holds {found} values, expected {expected}")]
    ColumnType {
        /// Column name.
        name: String,
        /// Requested element type.
        expected: &'static str,
        /// Stored element type.
        found: &'static str,
    },

    /// No column with this name exists in the dataset.
    #[error("dataset has no column '{0}'")]
    UnknownColumn(String),

    /// The decode worker pool could not be created.
    #[error("failed to build decode worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error was raised by input validation, before any file access.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownUnit(_)
                | Error::UnitMismatch { .. }
                | Error::InvalidRangeSpec(_)
                | Error::InvalidShape(_)
                | Error::InvalidLevelCap { .. }
                | Error::InvalidMetadata(_)
                | Error::FieldGroupAbsent(_)
                | Error::UnknownVariable { .. }
        )
    }
}
