//! Particle and clump ingestion
mod common;

use amrscope_core::{
    subregion, CenterSpec, Error, FieldGroup, LoadOptions, LoadRequest, RangeSpec, Shape,
    Snapshot, Unit, VariableSelection,
};
use approx::assert_relative_eq;
use common::{clump_text, Fixture, Particle};

fn particle(x: f64, level: i32, id: i64, family: i8, mass: f64) -> Particle {
    Particle {
        pos: [x, 24.0, 24.0],
        level,
        id,
        family,
        tag: 0,
        vars: vec![1.0, 2.0, 3.0, mass, -1.0],
    }
}

#[test]
fn test_particles_filtered_by_range_and_level() {
    let fixture = Fixture::new(2);
    fixture.write_particles(&[
        vec![particle(4.0, 6, 1, 1, 0.5), particle(20.0, 9, 2, 1, 1.5)],
        vec![particle(30.0, 7, 3, 2, 2.5), particle(47.0, 5, 4, 1, 3.5)],
    ]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();

    let all = snap.load_particles(&LoadRequest::new()).unwrap();
    assert_eq!(all.i64_column("id").unwrap(), &[1, 2, 3, 4]);
    assert_eq!(
        all.column_names(),
        vec!["level", "x", "y", "z", "id", "family", "tag", "vx", "vy", "vz", "mass", "birth"]
    );
    assert_eq!(all.level_bounds(), Some((5, 9)));

    // 10..40 kpc along x, host level at most 8
    let request = LoadRequest::new()
        .ranges(RangeSpec::new().x([10.0, 40.0]).unit(Unit::Kpc))
        .variables(VariableSelection::one("mass"))
        .lmax(8);
    let ds = snap.load_particles(&request).unwrap();
    assert_eq!(ds.i64_column("id").unwrap(), &[3]);
    assert_eq!(ds.i8_column("family").unwrap(), &[2]);
    assert_eq!(ds.f64_column("mass").unwrap(), &[2.5]);
    assert_relative_eq!(ds.f64_column("x").unwrap()[0], 30.0 / 48.0);
    assert_relative_eq!(ds.positions(Unit::Kpc).unwrap()[0].x, 30.0, max_relative = 1e-12);
}

#[test]
fn test_particle_sphere_uses_positions() {
    let fixture = Fixture::new(1);
    fixture.write_particles(&[vec![
        particle(24.0, 6, 1, 1, 1.0),
        particle(30.0, 6, 2, 1, 1.0),
        particle(36.5, 6, 3, 1, 1.0),
    ]]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    let ds = snap.load_particles(&LoadRequest::new()).unwrap();

    let spec = RangeSpec::new()
        .center(CenterSpec::BoxCenter)
        .unit(Unit::Kpc);
    let out = subregion(
        &ds,
        &Shape::Sphere { radius: 12.0 },
        &spec,
        false,
        &LoadOptions::default(),
    )
    .unwrap();
    assert_eq!(out.i64_column("id").unwrap(), &[1, 2]);
}

#[test]
fn test_clump_catalogs() {
    let fixture = Fixture::new(2);
    // index lev parent ncell peak_x peak_y peak_z rho- rho+ rho_av mass_cl relevance
    fixture.write_clumps(&[
        vec![
            vec![1.0, 1.0, 1.0, 40.0, 12.0, 24.0, 24.0, 0.1, 9.0, 2.0, 1.0e3, 3.0],
            vec![2.0, 1.0, 2.0, 10.0, 36.0, 24.0, 24.0, 0.1, 4.0, 1.0, 2.0e2, 2.0],
        ],
        vec![],
    ]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();

    let all = snap.load_clumps(&LoadRequest::new()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(&all.column_names()[..4], &["x", "y", "z", "index"]);
    assert_eq!(all.f64_column("x").unwrap(), &[0.25, 0.75]);
    assert_eq!(all.level_bounds(), None);
    let x = all.variable("x", Unit::Kpc).unwrap();
    assert_relative_eq!(x[1], 36.0, max_relative = 1e-12);
    assert!(matches!(
        all.variable("mass_cl", Unit::Kpc),
        Err(Error::UnitMismatch { .. })
    ));

    let right = snap
        .load_clumps(
            &LoadRequest::new()
                .ranges(RangeSpec::new().x([0.5, 1.0]))
                .variables(VariableSelection::list(["mass_cl", "index"])),
        )
        .unwrap();
    assert_eq!(right.column_names(), vec!["x", "y", "z", "mass_cl", "index"]);
    assert_eq!(right.f64_column("index").unwrap(), &[2.0]);
    assert_eq!(right.level_bounds(), None);
    let mass = right.variable("mass_cl", Unit::Msun).unwrap();
    assert!(mass[0] > 0.0);
    // No level column: a single overview bucket
    assert_eq!(all.overview().len(), 1);
    assert_eq!(all.overview()[0].level, None);
}

#[test]
fn test_clump_header_must_match_declared_columns() {
    let fixture = Fixture::new(1);
    fixture.write_raw(
        FieldGroup::Clumps,
        1,
        clump_text(&["index", "peak_x", "peak_y", "peak_z"], &[vec![1.0, 1.0, 1.0, 1.0]])
            .as_bytes(),
    );
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    assert!(matches!(
        snap.load_clumps(&LoadRequest::new()),
        Err(Error::VariableCountMismatch {
            declared: 12,
            found: 4,
            ..
        })
    ));
}

#[test]
fn test_clump_metadata_without_positions_is_rejected() {
    let fixture = Fixture::new(1);
    let meta = fixture
        .meta
        .clone()
        .with_group(FieldGroup::Clumps, &["index", "mass_cl"]);
    let snap = Snapshot::new(meta).unwrap();
    let err = snap.load_clumps(&LoadRequest::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata(_)));
    assert!(err.is_configuration());
}
