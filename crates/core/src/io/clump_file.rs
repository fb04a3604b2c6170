//! Clump catalog rank files
//!
//! Whitespace-separated text: a header line naming the columns, then one line per clump.
//! `peak_x`, `peak_y`, `peak_z` hold the clump position in code units.

use crate::core_types::DVec3;
use crate::dataset::ColumnData;
use crate::error::Result;
use crate::grid::indexing::point_in_box;
use crate::io::{FileContext, RankRequest};

/// Position columns every clump catalog must declare
pub(crate) const PEAK_COLUMNS: [&str; 3] = ["peak_x", "peak_y", "peak_z"];

/// Parse one catalog into `x, y, z` (fractions of the box) plus the selected variables
pub(crate) fn decode(
    text: &str,
    ctx: &FileContext<'_>,
    req: &RankRequest<'_>,
) -> Result<Vec<ColumnData>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| ctx.header("missing column header line"))?;
    let names: Vec<&str> = header.split_whitespace().collect();
    if names.len() != req.declared.len() {
        return Err(ctx.variable_count(req.declared.len(), names.len()));
    }
    if let Some((found, expected)) = names
        .iter()
        .zip(req.declared)
        .find(|(found, expected)| **found != expected.as_str())
    {
        return Err(ctx.header(format!(
            "column '{found}' where '{expected}' was declared"
        )));
    }
    let mut peak = [0_usize; 3];
    for (slot, column) in peak.iter_mut().zip(PEAK_COLUMNS) {
        *slot = names
            .iter()
            .position(|&n| n == column)
            .ok_or_else(|| ctx.header(format!("missing position column '{column}'")))?;
    }

    let mut xyz: [Vec<f64>; 3] = Default::default();
    let mut vars_out: Vec<Vec<f64>> = vec![Vec::new(); req.selected];
    let mut row = Vec::with_capacity(names.len());

    for (line_no, line) in lines {
        row.clear();
        for token in line.split_whitespace() {
            let value: f64 = token.parse().map_err(|_| {
                ctx.payload(format!("line {}: '{token}' is not a number", line_no + 1))
            })?;
            row.push(value);
        }
        if row.len() != names.len() {
            return Err(ctx.payload(format!(
                "line {}: {} values, header declares {}",
                line_no + 1,
                row.len(),
                names.len()
            )));
        }

        let position = DVec3::new(
            row[peak[0]] / req.box_length,
            row[peak[1]] / req.box_length,
            row[peak[2]] / req.box_length,
        );
        if !point_in_box(&position, req.range) {
            continue;
        }
        for (axis, column) in xyz.iter_mut().enumerate() {
            column.push(position[axis]);
        }
        for (var, slot) in req.slots.iter().enumerate() {
            if let Some(slot) = slot {
                vars_out[*slot].push(row[var]);
            }
        }
    }

    let mut columns: Vec<ColumnData> = xyz.into_iter().map(ColumnData::F64).collect();
    columns.extend(vars_out.into_iter().map(ColumnData::F64));
    Ok(columns)
}
