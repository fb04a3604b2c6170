//! Per-level summaries of a dataset

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{ColumnData, Dataset};

/// Range of one column within a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name
    pub name: String,
    /// Smallest value, widened to f64 (NaN values ignored)
    pub min: f64,
    /// Largest value, widened to f64 (NaN values ignored)
    pub max: f64,
}

/// Row count and column ranges of one refinement level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Refinement level, `None` for datasets without a level column (clumps)
    pub level: Option<i32>,
    /// Number of rows at this level
    pub rows: usize,
    /// Every column except `level`, in storage order
    pub columns: Vec<ColumnSummary>,
}

struct Accumulator {
    rows: usize,
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Accumulator {
    fn new(width: usize) -> Self {
        Self {
            rows: 0,
            min: vec![f64::INFINITY; width],
            max: vec![f64::NEG_INFINITY; width],
        }
    }
}

impl Dataset {
    /// Row counts and per-column min/max grouped by level, ascending
    ///
    /// Empty datasets give an empty overview.
    pub fn overview(&self) -> Vec<LevelSummary> {
        let level_column = match self.column("level") {
            Ok(ColumnData::I32(levels)) => Some(levels.as_slice()),
            _ => None,
        };
        let summarized: Vec<_> = self
            .columns()
            .iter()
            .filter(|c| c.name() != "level")
            .collect();

        let mut groups: FxHashMap<Option<i32>, Accumulator> = FxHashMap::default();
        for row in 0..self.len() {
            let key = level_column.map(|levels| levels[row]);
            let acc = groups
                .entry(key)
                .or_insert_with(|| Accumulator::new(summarized.len()));
            acc.rows += 1;
            for (slot, column) in summarized.iter().enumerate() {
                let value = column.data().value_f64(row);
                acc.min[slot] = acc.min[slot].min(value);
                acc.max[slot] = acc.max[slot].max(value);
            }
        }

        let mut out: Vec<LevelSummary> = groups
            .into_iter()
            .map(|(level, acc)| LevelSummary {
                level,
                rows: acc.rows,
                columns: summarized
                    .iter()
                    .enumerate()
                    .map(|(slot, column)| ColumnSummary {
                        name: column.name().to_string(),
                        min: acc.min[slot],
                        max: acc.max[slot],
                    })
                    .collect(),
            })
            .collect();
        out.sort_by_key(|summary| summary.level);
        out
    }
}
