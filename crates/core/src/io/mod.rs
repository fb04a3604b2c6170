//! Per-rank file decoding and the multi-file ingestion engine

pub mod record;

mod clump_file;
mod grid_file;
pub mod ingest;
mod particle_file;

pub use ingest::{ingest, VariableRef, VariableSelection};

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use crate::core_types::FieldGroup;
use crate::error::Error;
use crate::grid::range::ResolvedRange;
use record::{RecordError, RecordReader};

/// Everything a decoder needs to filter one rank file
pub(crate) struct RankRequest<'a> {
    pub group: FieldGroup,
    /// 1-based rank
    pub rank: u32,
    pub ncpu: u32,
    /// Declared variables of the group, file order
    pub declared: &'a [String],
    /// For each declared variable, the output slot it fills (if selected)
    pub slots: &'a [Option<usize>],
    /// Number of selected variables
    pub selected: usize,
    pub range: &'a ResolvedRange,
    pub level_cap: u8,
    pub box_length: f64,
}

/// Error constructors carrying the group and path of the file being decoded
pub(crate) struct FileContext<'a> {
    pub group: FieldGroup,
    pub rank: u32,
    pub path: &'a Path,
}

impl FileContext<'_> {
    fn path(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    pub(crate) fn open_error(&self, source: io::Error) -> Error {
        if source.kind() == io::ErrorKind::NotFound {
            Error::MissingFile {
                group: self.group,
                rank: self.rank,
                path: self.path(),
            }
        } else {
            Error::Io {
                group: self.group,
                path: self.path(),
                source,
            }
        }
    }

    pub(crate) fn header(&self, reason: impl Display) -> Error {
        Error::MalformedHeader {
            group: self.group,
            path: self.path(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn header_record(&self, what: &str, err: RecordError) -> Error {
        match err {
            RecordError::Io(source) => Error::Io {
                group: self.group,
                path: self.path(),
                source,
            },
            other => self.header(format!("{what}: {other}")),
        }
    }

    pub(crate) fn payload(&self, reason: impl Display) -> Error {
        Error::CorruptPayload {
            group: self.group,
            path: self.path(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn payload_record(&self, what: &str, err: RecordError) -> Error {
        match err {
            RecordError::Io(source) => Error::Io {
                group: self.group,
                path: self.path(),
                source,
            },
            other => self.payload(format!("{what}: {other}")),
        }
    }

    pub(crate) fn variable_count(&self, declared: usize, found: usize) -> Error {
        Error::VariableCountMismatch {
            group: self.group,
            path: self.path(),
            declared,
            found,
        }
    }

    /// Open a binary rank file for record reading
    pub(crate) fn open_records(&self) -> Result<RecordReader<BufReader<File>>, Error> {
        RecordReader::open(self.path).map_err(|e| self.open_error(e))
    }
}

/// Read the `[ncpu, rank]` and `[nvar]` records shared by every binary rank file
pub(crate) fn read_common_header<R: io::Read + io::Seek>(
    reader: &mut RecordReader<R>,
    ctx: &FileContext<'_>,
    req: &RankRequest<'_>,
) -> Result<(), Error> {
    let ids = reader
        .read_i32s(2)
        .map_err(|e| ctx.header_record("ncpu/rank record", e))?;
    if i64::from(ids[0]) != i64::from(req.ncpu) {
        return Err(ctx.header(format!(
            "file written by {} ranks, metadata declares {}",
            ids[0], req.ncpu
        )));
    }
    if i64::from(ids[1]) != i64::from(req.rank) {
        return Err(ctx.header(format!(
            "file belongs to rank {}, expected rank {}",
            ids[1], req.rank
        )));
    }

    let nvar = reader
        .read_i32s(1)
        .map_err(|e| ctx.header_record("nvar record", e))?[0];
    let found = usize::try_from(nvar)
        .map_err(|_| ctx.header(format!("negative variable count {nvar}")))?;
    if found != req.declared.len() {
        return Err(ctx.variable_count(req.declared.len(), found));
    }
    Ok(())
}

/// Read a non-negative count from a single-value header record
pub(crate) fn read_count<R: io::Read + io::Seek>(
    reader: &mut RecordReader<R>,
    ctx: &FileContext<'_>,
    what: &str,
) -> Result<usize, Error> {
    let value = reader
        .read_i32s(1)
        .map_err(|e| ctx.header_record(what, e))?[0];
    usize::try_from(value).map_err(|_| ctx.header(format!("negative {what} {value}")))
}
