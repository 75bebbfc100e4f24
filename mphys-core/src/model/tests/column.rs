//! 1-D KiD column runs.

use super::doubles::CountingScheme;
use crate::column::{ColumnGrid, KidColumnDynamics, KidSettings};
use crate::drivers::run_1d_column;
use crate::dynamics::Dynamics;
use crate::errors::MPhysError;
use crate::output::PRESSURE;
use crate::thermo::{MoistureCategory, ThermodynamicState};

fn settings() -> KidSettings {
    KidSettings {
        z_delta: 50.0,
        z_max: 1000.0,
        timestep: 1.0,
        ..KidSettings::default()
    }
}

#[test]
fn column_run_records_every_level() {
    let mut dynamics = KidColumnDynamics::new(settings()).unwrap();
    let grid = *dynamics.grid();
    let initial = dynamics.initial_state().unwrap();
    let mut scheme = CountingScheme::default();

    let output =
        run_1d_column(&grid, 0.0, 60.0, 1.0, initial.clone(), &mut dynamics, &mut scheme).unwrap();

    assert_eq!(output.len(), 61);
    assert_eq!(output.ncells(), 20);
    assert_eq!(scheme.run_count, 60);
    assert_eq!(scheme.init_count, 1);
    assert_eq!(scheme.finalize_count, 1);

    let qvap = output.mixing_ratio(MoistureCategory::Vapour).unwrap();
    assert_eq!(qvap.dim(), (61, 20));

    // Moister air from below is carried upwards
    assert!(qvap[[60, 10]] > qvap[[0, 10]]);

    // Pressure is held at the hydrostatic profile
    let press = output.get(PRESSURE).unwrap().values().unwrap();
    assert_eq!(press.row(60), initial.pressure());
}

#[test]
fn no_forcing_after_t1() {
    let settings = KidSettings {
        t1: 10.0,
        ..settings()
    };
    let mut dynamics = KidColumnDynamics::new(settings).unwrap();
    let grid = *dynamics.grid();
    let initial = dynamics.initial_state().unwrap();
    let mut scheme = CountingScheme::default();

    let output =
        run_1d_column(&grid, 0.0, 30.0, 1.0, initial, &mut dynamics, &mut scheme).unwrap();

    let qvap = output.mixing_ratio(MoistureCategory::Vapour).unwrap();
    assert_ne!(qvap.row(10), qvap.row(0));
    assert_eq!(qvap.row(30), qvap.row(10));
}

#[test]
fn grid_must_match_dynamics() {
    let mut dynamics = KidColumnDynamics::new(settings()).unwrap();
    let initial = dynamics.initial_state().unwrap();
    // Same number of levels, different spacing
    let grid = ColumnGrid::new(100.0, 2000.0).unwrap();
    assert_eq!(grid.nlevels(), initial.ncells());
    let mut scheme = CountingScheme::default();

    let err = run_1d_column(&grid, 0.0, 10.0, 1.0, initial, &mut dynamics, &mut scheme)
        .unwrap_err();
    assert!(matches!(err, MPhysError::Configuration(_)));
    assert_eq!(scheme.init_count, 0);
}

#[test]
fn initial_state_must_match_grid() {
    let mut dynamics = KidColumnDynamics::new(settings()).unwrap();
    let grid = *dynamics.grid();
    let finer = KidColumnDynamics::new(KidSettings {
        z_delta: 25.0,
        ..settings()
    })
    .unwrap();
    let initial = finer.initial_state().unwrap();
    let mut scheme = CountingScheme::default();

    let err = run_1d_column(&grid, 0.0, 10.0, 1.0, initial, &mut dynamics, &mut scheme)
        .unwrap_err();
    assert!(matches!(err, MPhysError::Configuration(_)));
    assert_eq!(scheme.init_count, 0);
}

#[test]
fn timestep_must_match_dynamics() {
    let mut dynamics = KidColumnDynamics::new(settings()).unwrap();
    let grid = *dynamics.grid();
    let initial = dynamics.initial_state().unwrap();
    let mut scheme = CountingScheme::default();

    let err = run_1d_column(&grid, 0.0, 10.0, 2.0, initial, &mut dynamics, &mut scheme)
        .unwrap_err();
    assert!(matches!(err, MPhysError::Configuration(_)));
    assert_eq!(scheme.init_count, 0);
    assert_eq!(scheme.run_count, 0);
    assert_eq!(scheme.finalize_count, 0);
}

#[test]
fn parcel_state_is_rejected() {
    let mut dynamics = KidColumnDynamics::new(settings()).unwrap();
    let state = ThermodynamicState::parcel(288.0, 1.2, 1e5, [0.0; 6]).unwrap();

    let err = dynamics.run(0.0, 1.0, state).unwrap_err();
    assert!(matches!(err, MPhysError::Domain(_)));
}
