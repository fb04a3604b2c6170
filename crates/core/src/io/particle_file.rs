//! Particle rank files
//!
//! Layout: `[ncpu, rank]`, `[nvar]`, `[npart]`, then `x`, `y`, `z` (f64, code units),
//! `level` (i32), `id` (i64), `family` and `tag` (i8), then one f64 record per declared
//! variable. Positions and host levels come first so the range and level cap are applied
//! before any other column is copied.

use std::io::{Read, Seek};

use crate::core_types::DVec3;
use crate::dataset::ColumnData;
use crate::error::Result;
use crate::grid::indexing::point_in_box;
use crate::io::record::RecordReader;
use crate::io::{read_common_header, read_count, FileContext, RankRequest};

/// Decode one particle rank file into `level, x, y, z, id, family, tag` plus the selected
/// variables; positions are returned as fractions of the box
pub(crate) fn decode<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    ctx: &FileContext<'_>,
    req: &RankRequest<'_>,
) -> Result<Vec<ColumnData>> {
    read_common_header(reader, ctx, req)?;
    let npart = read_count(reader, ctx, "particle count")?;

    let mut positions = Vec::with_capacity(3);
    for axis in ["x", "y", "z"] {
        let coords = reader
            .read_f64s(npart)
            .map_err(|e| ctx.payload_record(&format!("{axis} positions"), e))?;
        positions.push(coords.into_iter().map(|c| c / req.box_length).collect::<Vec<_>>());
    }
    let levels = reader
        .read_i32s(npart)
        .map_err(|e| ctx.payload_record("levels", e))?;

    let cap = i32::from(req.level_cap);
    let mask: Vec<bool> = (0..npart)
        .map(|i| {
            let p = DVec3::new(positions[0][i], positions[1][i], positions[2][i]);
            levels[i] <= cap && point_in_box(&p, req.range)
        })
        .collect();

    let mut ids = Vec::new();
    let mut family = Vec::new();
    let mut tag = Vec::new();
    reader
        .read_i64s_masked(&mask, &mut ids)
        .map_err(|e| ctx.payload_record("ids", e))?;
    reader
        .read_i8s_masked(&mask, &mut family)
        .map_err(|e| ctx.payload_record("family", e))?;
    reader
        .read_i8s_masked(&mask, &mut tag)
        .map_err(|e| ctx.payload_record("tags", e))?;

    let mut vars_out: Vec<Vec<f64>> = vec![Vec::new(); req.selected];
    for (var, slot) in req.slots.iter().enumerate() {
        let result = match slot {
            Some(slot) => reader.read_f64s_masked(&mask, &mut vars_out[*slot]),
            None => reader.skip_sized(npart, 8),
        };
        result.map_err(|e| ctx.payload_record(&format!("variable '{}'", req.declared[var]), e))?;
    }

    let pick = |values: Vec<f64>| -> Vec<f64> {
        values
            .into_iter()
            .zip(&mask)
            .filter(|&(_, &keep)| keep)
            .map(|(v, _)| v)
            .collect()
    };
    let level_out: Vec<i32> = levels
        .into_iter()
        .zip(&mask)
        .filter(|&(_, &keep)| keep)
        .map(|(l, _)| l)
        .collect();

    let mut columns = vec![ColumnData::I32(level_out)];
    columns.extend(positions.into_iter().map(|p| ColumnData::F64(pick(p))));
    columns.push(ColumnData::I64(ids));
    columns.push(ColumnData::I8(family));
    columns.push(ColumnData::I8(tag));
    columns.extend(vars_out.into_iter().map(ColumnData::F64));
    Ok(columns)
}
