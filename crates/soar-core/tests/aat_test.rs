//! AAT target optimisation and minimum-time range adjustment.

use soar_core::{
    optimise_target, AircraftState, GeoPoint, OptimiseFailure, OrderedTaskSettings,
    PointDefinition, TaskBehaviour, TaskDefinition, TaskError, TaskFactoryType, TaskManager,
    TaskPointFactoryType, Waypoint, Wind,
};

fn home() -> GeoPoint {
    GeoPoint::new(46.0, 7.0)
}

fn aat_definition() -> TaskDefinition {
    let point = |name: &str, location: GeoPoint, point_type| PointDefinition {
        waypoint: Waypoint::new(name, location, 400.0),
        point_type,
        zone: None,
        target: None,
        locked: false,
    };
    TaskDefinition {
        ruleset: TaskFactoryType::Aat,
        settings: Some(OrderedTaskSettings {
            aat_min_time_s: 6_300.0,
            ..OrderedTaskSettings::default()
        }),
        points: vec![
            point("Home", home(), TaskPointFactoryType::StartCylinder),
            point("North", home().offset(40_000.0, 0.0), TaskPointFactoryType::AatCylinder),
            point("SouthEast", home().offset(40_000.0, 120.0), TaskPointFactoryType::AatCylinder),
            point("Home", home(), TaskPointFactoryType::FinishCylinder),
        ],
    }
}

/// Manager with the task started and the aircraft just outside the start.
fn started_manager(wind: Wind) -> (TaskManager, AircraftState) {
    let mut manager = TaskManager::default();
    manager
        .set_task(aat_definition().build().expect("build"))
        .expect("valid task");
    manager.update(&AircraftState::new(home(), 2_000.0, 0.0).with_wind(wind));
    let state = AircraftState::new(home().offset(2_000.0, 0.0), 1_990.0, 60.0)
        .with_velocity(35.0, 0.0)
        .with_wind(wind);
    manager.update(&state);
    assert!(manager.task().is_started());
    (manager, state)
}

#[test]
fn test_optimised_target_no_worse_than_bounds() {
    let wind = Wind {
        speed_mps: 10.0,
        from_deg: 270.0,
    };
    let (manager, state) = started_manager(wind);
    let behaviour = TaskBehaviour::default();
    let polar = *manager.polar();

    let mut trial = manager.task().clone();
    let isoline = trial.isoline(1, &state).expect("isoline");
    let mut time_at = |p: f64| {
        trial.set_target(1, isoline.parametric(p)).expect("inside area");
        trial
            .solve_remaining(&state, &polar, &behaviour)
            .expect("solution")
            .time_elapsed_s
    };
    let low = time_at(0.02);
    let high = time_at(0.98);

    let mut task = manager.task().clone();
    let result = optimise_target(&mut task, 1, &state, &polar, &behaviour).expect("optimised");
    assert!((0.02..=0.98).contains(&result.parameter));
    assert!(result.time_remaining_s <= low + 1e-6);
    assert!(result.time_remaining_s <= high + 1e-6);
    assert_eq!(task.points()[1].target_location(), result.location);
}

#[test]
fn test_locked_and_reached_targets_are_left_alone() {
    let (manager, state) = started_manager(Wind::calm());
    let behaviour = TaskBehaviour::default();
    let polar = *manager.polar();

    let mut task = manager.task().clone();
    task.set_target_locked(1, true).expect("area point");
    let before = task.points()[1].target_location();
    assert_eq!(
        optimise_target(&mut task, 1, &state, &polar, &behaviour),
        Err(OptimiseFailure::TargetLocked(1))
    );
    assert_eq!(task.points()[1].target_location(), before);

    assert_eq!(
        optimise_target(&mut task, 0, &state, &polar, &behaviour),
        Err(OptimiseFailure::NotAreaPoint(0))
    );
}

#[test]
fn test_unreachable_task_keeps_prior_target() {
    // Westerly gale: the northbound leg has a cross wind above any cruise speed.
    let wind = Wind {
        speed_mps: 100.0,
        from_deg: 270.0,
    };
    let (manager, state) = started_manager(wind);
    let behaviour = TaskBehaviour::default();
    let polar = *manager.polar();

    let mut task = manager.task().clone();
    let before = task.points()[1].target_location();
    let result = optimise_target(&mut task, 1, &state, &polar, &behaviour);
    assert!(
        matches!(
            result,
            Err(OptimiseFailure::NoSolution | OptimiseFailure::NotConverged)
        ),
        "{result:?}"
    );
    assert_eq!(task.points()[1].target_location(), before);
}

#[test]
fn test_manager_optimises_every_free_area() {
    let (mut manager, _) = started_manager(Wind {
        speed_mps: 8.0,
        from_deg: 200.0,
    });
    let results = manager.optimise_targets();
    assert_eq!(results.len(), 2);
    for result in &results {
        let target = result.as_ref().expect("optimised");
        assert!((0.02..=0.98).contains(&target.parameter));
    }
}

#[test]
fn test_range_adjustment_meets_minimum_time() {
    let (mut manager, _) = started_manager(Wind::calm());
    let range = manager
        .adjust_aat_range()
        .expect("targets placed")
        .expect("range");
    assert!(range > 0.0 && range < 1.0, "range {range}");

    let goal = 6_300.0 + manager.behaviour().aat_time_margin_s;
    let planned = manager.stats().total.time_planned_s;
    assert!((planned - goal).abs() < 120.0, "planned {planned} vs {goal}");
    assert!(manager.stats().aat_time_remaining_s.is_some());
}

#[test]
fn test_target_range_errors_are_reported() {
    let (mut manager, _) = started_manager(Wind::calm());
    let task = manager.task_mut();
    assert!(matches!(
        task.set_target_range(0, 0.5),
        Err(TaskError::NotAreaPoint(0))
    ));
    assert!(matches!(
        task.set_target_range(9, 0.5),
        Err(TaskError::IndexOutOfRange { index: 9, .. })
    ));
    task.set_target_range(2, 1.0).expect("area point");
}
