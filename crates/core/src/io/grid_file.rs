//! Hydro and gravity rank files
//!
//! Layout (little-endian sequential records):
//! `[ncpu, rank]`, `[nvar]`, `[nlevelmax]`, then per level `1..=nlevelmax`:
//! `[level, ncell]` and, when `ncell > 0`, the `cx`, `cy`, `cz` index records followed by
//! one f64 record per declared variable.
//!
//! Levels above the cap are skipped record by record. Within a kept level the integer
//! indices are tested against the per-level [`IndexWindow`] and only matching values are
//! copied out of each variable record.

use std::io::{Read, Seek};

use crate::dataset::ColumnData;
use crate::error::Result;
use crate::grid::indexing::IndexWindow;
use crate::io::record::RecordReader;
use crate::io::{read_common_header, read_count, FileContext, RankRequest};

/// Levels beyond this cannot be addressed with i32 indices
const MAX_FILE_LEVEL: usize = 30;

/// Decode one grid rank file into `level, cx, cy, cz` plus the selected variables
pub(crate) fn decode<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    ctx: &FileContext<'_>,
    req: &RankRequest<'_>,
) -> Result<Vec<ColumnData>> {
    read_common_header(reader, ctx, req)?;
    let nlevelmax = read_count(reader, ctx, "nlevelmax")?;
    if nlevelmax > MAX_FILE_LEVEL {
        return Err(ctx.header(format!(
            "nlevelmax {nlevelmax} exceeds supported maximum {MAX_FILE_LEVEL}"
        )));
    }
    let nvar = req.declared.len();

    let mut level_out = Vec::new();
    let mut cx_out = Vec::new();
    let mut cy_out = Vec::new();
    let mut cz_out = Vec::new();
    let mut vars_out: Vec<Vec<f64>> = vec![Vec::new(); req.selected];

    for expected_level in 1..=nlevelmax {
        let head = reader
            .read_i32s(2)
            .map_err(|e| ctx.payload_record("level record", e))?;
        let (level, ncell) = (head[0], head[1]);
        if usize::try_from(level).ok() != Some(expected_level) {
            return Err(ctx.payload(format!(
                "found level {level} where level {expected_level} was expected"
            )));
        }
        let ncell = usize::try_from(ncell)
            .map_err(|_| ctx.payload(format!("negative cell count {ncell} at level {level}")))?;
        if ncell == 0 {
            continue;
        }

        if expected_level > usize::from(req.level_cap) {
            for (record, width) in (0..3).map(|_| 4).chain((0..nvar).map(|_| 8)).enumerate() {
                reader.skip_sized(ncell, width).map_err(|e| {
                    ctx.payload_record(&format!("record {} of skipped level {level}", record + 1), e)
                })?;
            }
            continue;
        }

        let mut index = |axis: &str| {
            reader
                .read_i32s(ncell)
                .map_err(|e| ctx.payload_record(&format!("{axis} indices at level {level}"), e))
        };
        let cx = index("cx")?;
        let cy = index("cy")?;
        let cz = index("cz")?;

        let window = IndexWindow::new(req.range, level);
        let mask: Vec<bool> = (0..ncell)
            .map(|i| window.contains(cx[i], cy[i], cz[i]))
            .collect();
        let kept = mask.iter().filter(|&&keep| keep).count();

        for (var, slot) in req.slots.iter().enumerate() {
            let result = match slot {
                Some(slot) if kept > 0 => reader.read_f64s_masked(&mask, &mut vars_out[*slot]),
                _ => reader.skip_sized(ncell, 8),
            };
            result.map_err(|e| {
                ctx.payload_record(&format!("variable '{}' at level {level}", req.declared[var]), e)
            })?;
        }
        if kept == 0 {
            continue;
        }

        level_out.extend(std::iter::repeat(level).take(kept));
        for (src, dst) in [(&cx, &mut cx_out), (&cy, &mut cy_out), (&cz, &mut cz_out)] {
            dst.extend(
                src.iter()
                    .zip(&mask)
                    .filter(|&(_, &keep)| keep)
                    .map(|(&c, _)| c),
            );
        }
    }

    let mut columns = vec![
        ColumnData::I32(level_out),
        ColumnData::I32(cx_out),
        ColumnData::I32(cy_out),
        ColumnData::I32(cz_out),
    ];
    columns.extend(vars_out.into_iter().map(ColumnData::F64));
    Ok(columns)
}
