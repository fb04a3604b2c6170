//! Fixture writer for per-rank output files
#![allow(dead_code)]

use amrscope_core::core_types::units::KPC_CM;
use amrscope_core::{FieldGroup, SimulationMetadata, UnitConversions};
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[ctor::ctor]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One AMR cell as written to a grid file
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub level: i32,
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
    pub vars: Vec<f64>,
}

impl Cell {
    pub fn new(level: i32, cx: i32, cy: i32, cz: i32, vars: Vec<f64>) -> Self {
        Self {
            level,
            cx,
            cy,
            cz,
            vars,
        }
    }
}

/// One particle; position in code units
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub pos: [f64; 3],
    pub level: i32,
    pub id: i64,
    pub family: i8,
    pub tag: i8,
    pub vars: Vec<f64>,
}

fn record(out: &mut Vec<u8>, payload: &[u8]) {
    let len = payload.len() as u32;
    out.write_u32::<LittleEndian>(len).unwrap();
    out.extend_from_slice(payload);
    out.write_u32::<LittleEndian>(len).unwrap();
}

fn i32s(out: &mut Vec<u8>, values: &[i32]) {
    let mut payload = Vec::new();
    for &v in values {
        payload.write_i32::<LittleEndian>(v).unwrap();
    }
    record(out, &payload);
}

fn i64s(out: &mut Vec<u8>, values: &[i64]) {
    let mut payload = Vec::new();
    for &v in values {
        payload.write_i64::<LittleEndian>(v).unwrap();
    }
    record(out, &payload);
}

fn f64s(out: &mut Vec<u8>, values: &[f64]) {
    let mut payload = Vec::new();
    for &v in values {
        payload.write_f64::<LittleEndian>(v).unwrap();
    }
    record(out, &payload);
}

fn i8s(out: &mut Vec<u8>, values: &[i8]) {
    record(out, &values.iter().map(|&v| v as u8).collect::<Vec<_>>());
}

/// Bytes of a hydro/gravity rank file; cells keep their order within each level
pub fn grid_bytes(ncpu: u32, rank: u32, nvar: usize, nlevelmax: i32, cells: &[Cell]) -> Vec<u8> {
    let mut out = Vec::new();
    i32s(&mut out, &[ncpu as i32, rank as i32]);
    i32s(&mut out, &[nvar as i32]);
    i32s(&mut out, &[nlevelmax]);
    for level in 1..=nlevelmax {
        let at_level: Vec<&Cell> = cells.iter().filter(|c| c.level == level).collect();
        i32s(&mut out, &[level, at_level.len() as i32]);
        if at_level.is_empty() {
            continue;
        }
        i32s(&mut out, &at_level.iter().map(|c| c.cx).collect::<Vec<_>>());
        i32s(&mut out, &at_level.iter().map(|c| c.cy).collect::<Vec<_>>());
        i32s(&mut out, &at_level.iter().map(|c| c.cz).collect::<Vec<_>>());
        for v in 0..nvar {
            f64s(&mut out, &at_level.iter().map(|c| c.vars[v]).collect::<Vec<_>>());
        }
    }
    out
}

/// Bytes of a particle rank file
pub fn particle_bytes(ncpu: u32, rank: u32, nvar: usize, particles: &[Particle]) -> Vec<u8> {
    let mut out = Vec::new();
    i32s(&mut out, &[ncpu as i32, rank as i32]);
    i32s(&mut out, &[nvar as i32]);
    i32s(&mut out, &[particles.len() as i32]);
    for axis in 0..3 {
        f64s(&mut out, &particles.iter().map(|p| p.pos[axis]).collect::<Vec<_>>());
    }
    i32s(&mut out, &particles.iter().map(|p| p.level).collect::<Vec<_>>());
    i64s(&mut out, &particles.iter().map(|p| p.id).collect::<Vec<_>>());
    i8s(&mut out, &particles.iter().map(|p| p.family).collect::<Vec<_>>());
    i8s(&mut out, &particles.iter().map(|p| p.tag).collect::<Vec<_>>());
    for v in 0..nvar {
        f64s(&mut out, &particles.iter().map(|p| p.vars[v]).collect::<Vec<_>>());
    }
    out
}

/// Text of a clump catalog
pub fn clump_text(columns: &[&str], rows: &[Vec<f64>]) -> String {
    let mut out = columns.join(" ");
    out.push('\n');
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| format!("{v:e}")).collect();
        out.push_str(&line.join("  "));
        out.push('\n');
    }
    out
}

/// Conversion scalars of a box whose code length unit is one kpc
pub fn kpc_units() -> UnitConversions {
    UnitConversions::from_ldt(KPC_CM, 1.0e-24, 3.15576e13)
}

/// Output 1 of a 48 kpc box, levels 1..=10, in a fresh temporary directory
pub struct Fixture {
    pub dir: TempDir,
    pub meta: SimulationMetadata,
}

impl Fixture {
    pub fn new(ncpu: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let meta = SimulationMetadata::new(dir.path(), 1, ncpu, 48.0, (1, 10), kpc_units())
            .with_time(13.8)
            .with_default_group(FieldGroup::Hydro)
            .with_default_group(FieldGroup::Gravity)
            .with_default_group(FieldGroup::Particles)
            .with_default_group(FieldGroup::Clumps);
        Self { dir, meta }
    }

    fn write(&self, group: FieldGroup, rank: u32, bytes: &[u8]) {
        let path = self.meta.rank_path(group, rank).unwrap();
        write_file(&path, bytes);
    }

    /// Write hydro rank files, one cell list per rank
    pub fn write_hydro(&self, ranks: &[Vec<Cell>]) {
        let nvar = FieldGroup::Hydro.default_variables().len();
        for (i, cells) in ranks.iter().enumerate() {
            let rank = i as u32 + 1;
            self.write(
                FieldGroup::Hydro,
                rank,
                &grid_bytes(self.meta.ncpu, rank, nvar, 10, cells),
            );
        }
    }

    /// Write particle rank files, one particle list per rank
    pub fn write_particles(&self, ranks: &[Vec<Particle>]) {
        let nvar = FieldGroup::Particles.default_variables().len();
        for (i, particles) in ranks.iter().enumerate() {
            let rank = i as u32 + 1;
            self.write(
                FieldGroup::Particles,
                rank,
                &particle_bytes(self.meta.ncpu, rank, nvar, particles),
            );
        }
    }

    /// Write clump catalogs with the default columns, one row list per rank
    pub fn write_clumps(&self, ranks: &[Vec<Vec<f64>>]) {
        let columns = FieldGroup::Clumps.default_variables();
        for (i, rows) in ranks.iter().enumerate() {
            self.write(
                FieldGroup::Clumps,
                i as u32 + 1,
                clump_text(columns, rows).as_bytes(),
            );
        }
    }

    /// Overwrite one rank file with raw bytes
    pub fn write_raw(&self, group: FieldGroup, rank: u32, bytes: &[u8]) {
        self.write(group, rank, bytes);
    }

    /// Delete one rank file
    pub fn remove(&self, group: FieldGroup, rank: u32) {
        fs::remove_file(self.meta.rank_path(group, rank).unwrap()).unwrap();
    }
}

fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

/// Hydro variables `[rho, vx, vy, vz, p]` derived from a single value
pub fn hydro_vars(value: f64) -> Vec<f64> {
    vec![value, 10.0 * value, -value, 0.5 * value, value * value]
}
