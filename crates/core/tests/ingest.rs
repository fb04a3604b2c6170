//! Multi-file ingestion: determinism, range scenarios, selection and failure kinds
mod common;

use amrscope_core::{
    CenterSpec, Error, FieldGroup, LoadOptions, LoadRequest, RangeSpec, Snapshot, Unit,
    VariableRef, VariableSelection,
};
use approx::assert_relative_eq;
use common::{grid_bytes, hydro_vars, Cell, Fixture};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random cells at levels 3..=7, spread over `ncpu` ranks
fn random_ranks(ncpu: usize, per_rank: usize, seed: u64) -> Vec<Vec<Cell>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..ncpu)
        .map(|_| {
            (0..per_rank)
                .map(|_| {
                    let level = rng.random_range(3..=7);
                    let n = 1 << level;
                    Cell::new(
                        level,
                        rng.random_range(1..=n),
                        rng.random_range(1..=n),
                        rng.random_range(1..=n),
                        hydro_vars(rng.random_range(0.0..100.0)),
                    )
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_thread_count_does_not_change_output() {
    let fixture = Fixture::new(8);
    fixture.write_hydro(&random_ranks(8, 200, 7));

    let request = LoadRequest::new()
        .ranges(RangeSpec::new().x([0.1, 0.7]).z([0.25, 0.9]))
        .lmax(6);
    let serial = Snapshot::new(fixture.meta.clone())
        .unwrap()
        .with_options(LoadOptions::with_threads(1))
        .load_hydro(&request)
        .unwrap();
    let parallel = Snapshot::new(fixture.meta.clone())
        .unwrap()
        .with_options(LoadOptions::with_threads(4).show_progress(true))
        .load_hydro(&request)
        .unwrap();
    let default_pool = Snapshot::new(fixture.meta.clone())
        .unwrap()
        .load_hydro(&request)
        .unwrap();

    assert!(!serial.is_empty());
    assert_eq!(serial, parallel);
    assert_eq!(serial, default_pool);
}

#[test]
fn test_rows_follow_rank_order() {
    let fixture = Fixture::new(3);
    fixture.write_hydro(&[
        vec![Cell::new(2, 1, 1, 1, hydro_vars(1.0))],
        vec![],
        vec![
            Cell::new(3, 1, 1, 1, hydro_vars(3.0)),
            Cell::new(2, 4, 4, 4, hydro_vars(2.0)),
        ],
    ]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    let ds = snap.load_hydro(&LoadRequest::new()).unwrap();
    // Within a rank, rows follow the file's level blocks
    assert_eq!(ds.f64_column("rho").unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(ds.level_bounds(), Some((2, 3)));
    assert_eq!(ds.column_names(), vec!["level", "cx", "cy", "cz", "rho", "vx", "vy", "vz", "p"]);
}

/// Ten level-8 cells along x at the indices used by the range scenarios
fn ten_cells() -> Vec<Cell> {
    [1, 29, 51, 52, 128, 180, 205, 206, 230, 256]
        .iter()
        .map(|&cx| Cell::new(8, cx, 128, 128, hydro_vars(f64::from(cx))))
        .collect()
}

fn loaded_cx(snap: &Snapshot, ranges: RangeSpec) -> Vec<i32> {
    snap.load_hydro(&LoadRequest::new().ranges(ranges))
        .unwrap()
        .i32_column("cx")
        .unwrap()
        .to_vec()
}

#[test]
fn test_ten_cell_scenario_in_fractions_and_kpc() {
    let fixture = Fixture::new(1);
    fixture.write_hydro(&[ten_cells()]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();

    // [0.2, 0.8] overlaps indices 52..=205 at level 8
    let expected = vec![52, 128, 180, 205];
    assert_eq!(loaded_cx(&snap, RangeSpec::new().x([0.2, 0.8])), expected);
    assert_eq!(
        loaded_cx(&snap, RangeSpec::new().x([9.6, 38.4]).unit(Unit::Kpc)),
        expected
    );
    assert_eq!(
        loaded_cx(
            &snap,
            RangeSpec::new()
                .x([-0.3, 0.3])
                .center(CenterSpec::BoxCenter)
        ),
        expected
    );
    assert_eq!(
        loaded_cx(
            &snap,
            RangeSpec::new()
                .x([-14.4, 14.4])
                .center(CenterSpec::BoxCenter)
                .unit(Unit::Kpc)
        ),
        expected
    );

    let ds = snap
        .load_hydro(&LoadRequest::new().ranges(RangeSpec::new().x([9.6, 38.4]).unit(Unit::Kpc)))
        .unwrap();
    let extent = ds.extent(Unit::Kpc).unwrap();
    assert_relative_eq!(extent[0][0], 9.6, epsilon = 1e-9);
    assert_relative_eq!(extent[0][1], 38.4, epsilon = 1e-9);
    assert_relative_eq!(extent[1][1], 48.0, epsilon = 1e-9);
}

#[test]
fn test_out_of_domain_range_is_empty_not_error() {
    let fixture = Fixture::new(1);
    fixture.write_hydro(&[ten_cells()]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    let ds = snap
        .load_hydro(&LoadRequest::new().ranges(RangeSpec::new().x([2.0, 3.0])))
        .unwrap();
    assert!(ds.is_empty());
    assert_eq!(ds.column_names().len(), 9);
    assert_eq!(ds.range().bounds()[0], [2.0, 3.0]);

    for far in [[1e300, 2e300], [-2e300, -1e300]] {
        let ds = snap
            .load_hydro(&LoadRequest::new().ranges(RangeSpec::new().x(far)))
            .unwrap();
        assert!(ds.is_empty());
    }
}

#[test]
fn test_level_cap_and_variable_selection() {
    let fixture = Fixture::new(2);
    fixture.write_hydro(&[
        vec![
            Cell::new(3, 1, 1, 1, hydro_vars(1.0)),
            Cell::new(9, 1, 1, 1, hydro_vars(9.0)),
        ],
        vec![Cell::new(5, 1, 1, 1, hydro_vars(5.0))],
    ]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();

    let by_name = snap
        .load_hydro(
            &LoadRequest::new()
                .variables(VariableSelection::list(["p", "rho"]))
                .lmax(5),
        )
        .unwrap();
    assert_eq!(by_name.selected_variables(), &["p".to_string(), "rho".to_string()]);
    assert_eq!(by_name.column_names(), vec!["level", "cx", "cy", "cz", "p", "rho"]);
    assert_eq!(by_name.i32_column("level").unwrap(), &[3, 5]);
    assert_eq!(by_name.f64_column("p").unwrap(), &[1.0, 25.0]);
    assert_eq!(by_name.level_bounds(), Some((3, 5)));

    let by_number = snap
        .load_hydro(
            &LoadRequest::new()
                .variables(VariableSelection::List(vec![
                    VariableRef::Number(5),
                    VariableRef::from("var1"),
                ]))
                .lmax(5),
        )
        .unwrap();
    assert_eq!(by_number, by_name);
}

#[test]
fn test_variable_in_physical_units() {
    let fixture = Fixture::new(1);
    fixture.write_hydro(&[vec![Cell::new(4, 2, 3, 4, hydro_vars(2.0))]]);
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    let ds = snap.load_hydro(&LoadRequest::new()).unwrap();

    let rho = ds.variable("rho", Unit::GPerCm3).unwrap();
    assert_relative_eq!(rho[0], 2.0e-24, max_relative = 1e-12);
    let pos = ds.positions(Unit::Kpc).unwrap();
    assert_relative_eq!(pos[0].x, 1.5 / 16.0 * 48.0, max_relative = 1e-12);
    assert_relative_eq!(snap.time(Unit::Myr), 13.8, max_relative = 1e-12);
}

// ============================================================================
// FAILURE KINDS
// ============================================================================

#[test]
fn test_missing_rank_is_fatal() {
    let fixture = Fixture::new(4);
    fixture.write_hydro(&random_ranks(4, 20, 3));
    fixture.remove(FieldGroup::Hydro, 3);
    let snap = Snapshot::new(fixture.meta.clone())
        .unwrap()
        .with_options(LoadOptions::with_threads(4));

    match snap.load_hydro(&LoadRequest::new()) {
        Err(Error::MissingFile { group, rank, path }) => {
            assert_eq!(group, FieldGroup::Hydro);
            assert_eq!(rank, 3);
            assert!(path.ends_with("output_00001/hydro_00001.out00003"));
        }
        other => panic!("expected a missing file error, got {other:?}"),
    }
}

#[test]
fn test_variable_count_mismatch() {
    let fixture = Fixture::new(2);
    fixture.write_hydro(&random_ranks(2, 10, 5));
    fixture.write_raw(
        FieldGroup::Hydro,
        2,
        &grid_bytes(2, 2, 4, 10, &[Cell::new(1, 1, 1, 1, vec![0.0; 4])]),
    );
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();
    let err = snap.load_hydro(&LoadRequest::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::VariableCountMismatch {
            declared: 5,
            found: 4,
            ..
        }
    ));
    assert!(err.to_string().contains("hydro_00001.out00002"));
}

#[test]
fn test_malformed_header_and_corrupt_payload() {
    let fixture = Fixture::new(2);
    fixture.write_hydro(&random_ranks(2, 10, 11));
    let snap = Snapshot::new(fixture.meta.clone()).unwrap();

    // Rank 1 claims to be rank 2
    fixture.write_raw(FieldGroup::Hydro, 1, &grid_bytes(2, 2, 5, 10, &[]));
    assert!(matches!(
        snap.load_hydro(&LoadRequest::new()),
        Err(Error::MalformedHeader { .. })
    ));

    // Valid header, truncated cell payload
    let mut bytes = grid_bytes(2, 1, 5, 10, &[Cell::new(2, 1, 1, 1, hydro_vars(1.0))]);
    bytes.truncate(bytes.len() - 40);
    fixture.write_raw(FieldGroup::Hydro, 1, &bytes);
    assert!(matches!(
        snap.load_hydro(&LoadRequest::new()),
        Err(Error::CorruptPayload { .. })
    ));
}
