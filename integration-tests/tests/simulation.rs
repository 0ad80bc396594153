use approx::assert_relative_eq;

use integration_tests::test_modules::decay_system;
use phloem_core::{DynamicalSystem, TimeSpan};
use phloem_modules::ModuleRegistry;
use phloem_solve::{SolveError, SolverConfig, SolverRegistry};

fn config(step_size: f64) -> SolverConfig {
    SolverConfig {
        step_size,
        ..SolverConfig::default()
    }
}

#[test]
fn euler_converges_to_the_exponential_solution() {
    let solvers = SolverRegistry::new();
    let exact = (-0.5_f64 * 2.0).exp();

    let mut errors = Vec::new();
    for step_size in [0.1, 0.01, 0.001] {
        let solver = solvers.create("euler", config(step_size)).unwrap();
        let mut system = decay_system(0.5, 2.0).unwrap();

        let series = solver.integrate(&mut system).unwrap();
        let last = series.last().unwrap();

        assert_relative_eq!(last.time, 2.0);
        errors.push((last.get("y").unwrap() - exact).abs());
    }

    // First-order convergence: each tenfold step refinement shrinks the
    // error accordingly.
    assert!(errors[1] < errors[0] && errors[2] < errors[1]);
    assert!(errors[2] < 2e-4);
}

#[test]
fn dopri5_matches_the_closed_form_solution() {
    let solvers = SolverRegistry::new();
    let tight = SolverConfig {
        step_size: 0.1,
        rel_error_tolerance: 1e-8,
        abs_error_tolerance: 1e-8,
        ..SolverConfig::default()
    };
    let solver = solvers.create("dopri5", tight).unwrap();
    let mut system = decay_system(0.5, 2.0).unwrap();

    let series = solver.integrate(&mut system).unwrap();

    assert_relative_eq!(series.first().unwrap().time, 0.0);
    assert_relative_eq!(series.last().unwrap().time, 2.0, epsilon = 1e-9);
    assert_relative_eq!(
        series.last().unwrap().get("y").unwrap(),
        (-0.5_f64 * 2.0).exp(),
        epsilon = 1e-6
    );
}

#[test]
fn step_limit_is_a_failure_not_a_truncated_success() {
    let solvers = SolverRegistry::new();
    let limited = SolverConfig {
        step_size: 0.001,
        max_steps: 1,
        ..SolverConfig::default()
    };
    let solver = solvers.create("euler", limited).unwrap();
    let mut system = decay_system(0.5, 2.0).unwrap();

    assert_eq!(
        solver.integrate(&mut system),
        Err(SolveError::StepLimitExceeded { max_steps: 1 })
    );
}

#[test]
fn unknown_solver_is_reported_by_name() {
    let solvers = SolverRegistry::new();
    let error = solvers
        .create("DoesNotExist", SolverConfig::default())
        .unwrap_err();

    assert_eq!(
        error,
        SolveError::UnknownSolver {
            name: "DoesNotExist".to_string()
        }
    );
    assert!(error.to_string().contains("\"DoesNotExist\""));
}

/// Assembles a small crop model from registry modules: stomatal
/// conductance feeds leaf temperature (a steady chain), while thermal time
/// accumulates as the only state variable.
fn crop_system(hours: f64) -> DynamicalSystem {
    let modules = ModuleRegistry::new();

    DynamicalSystem::new(
        TimeSpan::new(0.0, hours).unwrap(),
        vec![("TTc".to_string(), 0.0)],
        vec![
            // Weather and development.
            ("temp".to_string(), 22.0),
            ("tbase".to_string(), 10.0),
            // Ball-Berry inputs.
            ("net_assimilation_rate".to_string(), 3.0e-5),
            ("Catm".to_string(), 4.0e-4),
            ("rh".to_string(), 0.65),
            ("b0".to_string(), 0.008),
            ("b1".to_string(), 9.0),
            ("gbw".to_string(), 1.2),
            // Penman-Monteith inputs not produced by other modules.
            ("slope_water_vapor".to_string(), 1.0e-4),
            ("psychrometric_parameter".to_string(), 7.2e-4),
            ("latent_heat_vaporization_of_water".to_string(), 2.45e6),
            ("leaf_boundary_layer_conductance".to_string(), 0.02),
            ("leaf_net_irradiance".to_string(), 300.0),
            ("vapor_density_deficit".to_string(), 1.0e-3),
        ],
        vec![
            // Supplied out of dependency order on purpose; the system
            // orders them topologically.
            modules.create("penman_monteith_leaf_temperature").unwrap(),
            modules.create("ball_berry").unwrap(),
            modules.create("thermal_time_linear").unwrap(),
        ],
    )
    .unwrap()
}

#[test]
fn crop_growth_pipeline_runs_end_to_end() {
    let solvers = SolverRegistry::new();

    // thermal_time_linear is clamped, so the system rejects adaptive
    // stepping and "auto" substitutes its fixed-step Euler loop.
    let mut system = crop_system(48.0);
    assert!(!system.is_adaptive_compatible());

    let solver = solvers.create("auto", config(1.0)).unwrap();
    let series = solver.integrate(&mut system).unwrap();

    // One snapshot per hour plus the initial state.
    assert_eq!(series.len(), 49);
    assert_eq!(system.ncalls(), 48);

    // Constant temperature makes thermal time exactly linear:
    // (22 - 10) / 24 deg. C day per hour, over 48 hours.
    let last = series.last().unwrap();
    assert_relative_eq!(last.get("TTc").unwrap(), 24.0, epsilon = 1e-9);

    // The steady chain ran: open stomata, and a sunlit leaf warmer than
    // the air.
    assert!(last.get("leaf_stomatal_conductance").unwrap() > 8.0);
    assert!(last.get("leaf_temperature").unwrap() > 22.0);
}

#[test]
fn explicit_adaptive_solver_refuses_a_clamped_system() {
    let solvers = SolverRegistry::new();
    let solver = solvers.create("dopri5", config(1.0)).unwrap();
    let mut system = crop_system(48.0);

    assert_eq!(
        solver.integrate(&mut system),
        Err(SolveError::AdaptiveIncompatible)
    );
}

#[test]
fn ten_layer_canopy_populates_the_quantity_store() {
    let modules = ModuleRegistry::new();

    let mut system = DynamicalSystem::new(
        TimeSpan::new(0.0, 24.0).unwrap(),
        vec![("TTc".to_string(), 0.0)],
        vec![
            ("temp".to_string(), 22.0),
            ("tbase".to_string(), 10.0),
            ("par_incident_direct".to_string(), 1500.0),
            ("par_incident_diffuse".to_string(), 300.0),
            ("lai".to_string(), 4.0),
            ("cosine_zenith_angle".to_string(), 0.8),
            ("kd".to_string(), 0.7),
            ("chil".to_string(), 1.0),
            ("heightf".to_string(), 3.0),
            ("rh".to_string(), 0.6),
            ("windspeed".to_string(), 2.5),
        ],
        vec![
            modules.create("ten_layer_canopy_properties").unwrap(),
            modules.create("thermal_time_linear").unwrap(),
        ],
    )
    .unwrap();

    let snapshot = system.snapshot(0.0, &[0.0]);

    // Sunlit leaves in every layer see more light than shaded leaves.
    for layer in 0..10 {
        let sunlit = snapshot
            .get(&format!("sunlit_incident_par_layer_{layer}"))
            .unwrap();
        let shaded = snapshot
            .get(&format!("shaded_incident_par_layer_{layer}"))
            .unwrap();
        assert!(sunlit > shaded);
    }

    // Wind attenuates from the canopy top to the floor.
    let wind_top = snapshot.get("windspeed_layer_0").unwrap();
    let wind_floor = snapshot.get("windspeed_layer_9").unwrap();
    assert!(wind_top < 2.5);
    assert!(wind_floor < wind_top);
}

#[test]
fn time_series_serializes_for_downstream_reporting() {
    let solvers = SolverRegistry::new();
    let solver = solvers.create("euler", config(1.0)).unwrap();
    let mut system = crop_system(2.0);

    let series = solver.integrate(&mut system).unwrap();
    let json = serde_json::to_string(&series).unwrap();

    assert!(json.contains("\"TTc\""));
    assert!(json.contains("\"leaf_temperature\""));
}
