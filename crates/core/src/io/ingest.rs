//! Multi-file ingestion engine
//!
//! Every rank file of a field group is decoded independently on the rayon pool. Each worker
//! applies the range and level cap while decoding and returns its own partial columns; the
//! partials are concatenated in ascending rank order once all workers have finished. Row
//! order therefore depends only on the files, never on scheduling or the worker count.
//!
//! Any failing rank aborts the whole call: a missing or corrupt file means an incomplete
//! domain decomposition, so no partial dataset is returned.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{summary, LoadOptions};
use crate::core_types::{FieldGroup, SimulationMetadata, UnitScaleTable};
use crate::dataset::{
    Column, ColumnData, Dataset, CLUMP_GEOMETRY, GRID_GEOMETRY, PARTICLE_GEOMETRY,
};
use crate::error::{Error, Result};
use crate::grid::range::ResolvedRange;
use crate::io::{clump_file, grid_file, particle_file, FileContext, RankRequest};

// ============================================================================
// VARIABLE SELECTION
// ============================================================================

/// One way of naming a declared variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableRef {
    /// Declared name, or the `varN` alias
    Name(String),
    /// 1-based position in the declared list
    Number(usize),
}

impl From<&str> for VariableRef {
    fn from(name: &str) -> Self {
        VariableRef::Name(name.to_string())
    }
}

impl From<String> for VariableRef {
    fn from(name: String) -> Self {
        VariableRef::Name(name)
    }
}

impl From<usize> for VariableRef {
    fn from(number: usize) -> Self {
        VariableRef::Number(number)
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableRef::Name(name) => f.write_str(name),
            VariableRef::Number(n) => write!(f, "#{n}"),
        }
    }
}

/// Variables to load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableSelection {
    /// Every declared variable, in declared order
    #[default]
    All,
    /// The listed variables, in caller order
    List(Vec<VariableRef>),
}

impl VariableSelection {
    /// Select a single variable
    pub fn one(reference: impl Into<VariableRef>) -> Self {
        VariableSelection::List(vec![reference.into()])
    }

    /// Select variables by name or number
    pub fn list<I, R>(references: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<VariableRef>,
    {
        VariableSelection::List(references.into_iter().map(Into::into).collect())
    }

    /// Map every reference to a 0-based index into `declared`
    ///
    /// Duplicated references (including a name and a number for the same variable) keep
    /// their first position only.
    ///
    /// # Errors
    /// Returns [`Error::UnknownVariable`] for a name or number outside the declared list.
    pub fn resolve(&self, group: FieldGroup, declared: &[String]) -> Result<Vec<usize>> {
        let references = match self {
            VariableSelection::All => return Ok((0..declared.len()).collect()),
            VariableSelection::List(references) => references,
        };

        let mut indices: Vec<usize> = Vec::with_capacity(references.len());
        for reference in references {
            let index = resolve_reference(reference, declared).ok_or_else(|| {
                Error::UnknownVariable {
                    group,
                    reference: reference.to_string(),
                    declared: declared.to_vec(),
                }
            })?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        Ok(indices)
    }
}

fn resolve_reference(reference: &VariableRef, declared: &[String]) -> Option<usize> {
    let number = match reference {
        VariableRef::Number(n) => *n,
        VariableRef::Name(name) => {
            if let Some(index) = declared.iter().position(|d| d == name) {
                return Some(index);
            }
            name.strip_prefix("var")?.parse::<usize>().ok()?
        }
    };
    number.checked_sub(1).filter(|&index| index < declared.len())
}

// ============================================================================
// INGESTION
// ============================================================================

/// Decode every rank file of `group` into one dataset
///
/// Configuration (metadata, variables, level cap, clump position columns) is validated
/// before any file is opened. `level_cap = None` keeps every level up to `levelmax`.
///
/// # Errors
/// Configuration errors, then the I/O or format error of a failing rank. With several
/// failing ranks, which one is reported depends on scheduling.
pub fn ingest(
    meta: &SimulationMetadata,
    scale: &Arc<UnitScaleTable>,
    group: FieldGroup,
    selection: &VariableSelection,
    range: &ResolvedRange,
    level_cap: Option<u8>,
    options: &LoadOptions,
) -> Result<Dataset> {
    meta.validate()?;
    let layout = meta.group(group)?;
    let indices = selection.resolve(group, &layout.variables)?;
    let cap = validate_level_cap(meta, level_cap)?;
    if group == FieldGroup::Clumps {
        for column in clump_file::PEAK_COLUMNS {
            if !layout.variables.iter().any(|v| v == column) {
                return Err(Error::InvalidMetadata(format!(
                    "clump catalog does not declare position column '{column}'"
                )));
            }
        }
    }

    let mut slots = vec![None; layout.variables.len()];
    for (slot, &index) in indices.iter().enumerate() {
        slots[index] = Some(slot);
    }
    let selected: Vec<String> = indices
        .iter()
        .map(|&i| layout.variables[i].clone())
        .collect();

    let ncpu = meta.ncpu;
    summary!(
        options,
        group = %group,
        files = ncpu,
        variables = ?selected,
        level_cap = cap,
        workers = options.worker_count(),
        "Loading {} from {} rank files",
        group,
        ncpu
    );

    let declared = layout.variables.as_slice();
    let slots = slots.as_slice();
    let nselected = selected.len();
    let done = AtomicUsize::new(0);
    let total = ncpu as usize;

    let process = || -> Result<Vec<Vec<ColumnData>>> {
        (1..=ncpu)
            .into_par_iter()
            .map(|rank| {
                let req = RankRequest {
                    group,
                    rank,
                    ncpu,
                    declared,
                    slots,
                    selected: nselected,
                    range,
                    level_cap: cap,
                    box_length: meta.box_length,
                };
                let partial = decode_rank(meta, &req)?;
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if options.show_progress && finished * 10 / total > (finished - 1) * 10 / total {
                    info!(group = %group, "{}: decoded {}/{} rank files", group, finished, total);
                }
                Ok(partial)
            })
            .collect()
    };

    let partials = match options.threads {
        Some(_) => rayon::ThreadPoolBuilder::new()
            .num_threads(options.worker_count())
            .build()?
            .install(process)?,
        None => process()?,
    };

    let columns = concatenate(group, &selected, partials);
    // Clump catalogs carry no refinement level
    let fallback_levels = (group != FieldGroup::Clumps).then_some((meta.levelmin, cap));
    let dataset = Dataset::from_parts(
        group,
        columns,
        selected,
        fallback_levels,
        *range,
        Arc::clone(scale),
        meta.box_length,
    );

    summary!(
        options,
        group = %group,
        rows = dataset.len(),
        levels = ?dataset.level_bounds(),
        "Loaded {} rows of {}",
        dataset.len(),
        group
    );
    Ok(dataset)
}

/// Effective level cap
fn validate_level_cap(meta: &SimulationMetadata, level_cap: Option<u8>) -> Result<u8> {
    let cap = level_cap.unwrap_or(meta.levelmax);
    if cap < meta.levelmin || cap > meta.levelmax {
        return Err(Error::InvalidLevelCap {
            requested: cap,
            levelmin: meta.levelmin,
            levelmax: meta.levelmax,
        });
    }
    Ok(cap)
}

fn decode_rank(meta: &SimulationMetadata, req: &RankRequest<'_>) -> Result<Vec<ColumnData>> {
    let path = meta.rank_path(req.group, req.rank)?;
    let ctx = FileContext {
        group: req.group,
        rank: req.rank,
        path: &path,
    };
    debug!(group = %req.group, rank = req.rank, path = %path.display(), "Decoding rank file");

    match req.group {
        FieldGroup::Hydro | FieldGroup::Gravity => {
            grid_file::decode(&mut ctx.open_records()?, &ctx, req)
        }
        FieldGroup::Particles => particle_file::decode(&mut ctx.open_records()?, &ctx, req),
        FieldGroup::Clumps => {
            let text = std::fs::read_to_string(&path).map_err(|e| ctx.open_error(e))?;
            clump_file::decode(&text, &ctx, req)
        }
    }
}

/// Column names of a group's schema, geometry first
fn schema(group: FieldGroup, selected: &[String]) -> Vec<String> {
    let geometry: &[&str] = match group {
        FieldGroup::Hydro | FieldGroup::Gravity => &GRID_GEOMETRY,
        FieldGroup::Particles => &PARTICLE_GEOMETRY,
        FieldGroup::Clumps => &CLUMP_GEOMETRY,
    };
    geometry
        .iter()
        .map(|&name| name.to_string())
        .chain(selected.iter().cloned())
        .collect()
}

/// Append partials in rank order
fn concatenate(
    group: FieldGroup,
    selected: &[String],
    partials: Vec<Vec<ColumnData>>,
) -> Vec<Column> {
    let names = schema(group, selected);
    let mut partials = partials.into_iter();
    let mut merged = partials.next().unwrap_or_default();
    for partial in partials {
        for (target, part) in merged.iter_mut().zip(partial) {
            let same_type = target.append(part);
            debug_assert!(same_type, "decoders emit a fixed schema per group");
        }
    }
    names
        .into_iter()
        .zip(merged)
        .map(|(name, data)| Column::new(name, data))
        .collect()
}
