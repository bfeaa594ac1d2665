//! End-to-end flight through a three-point racing task: start cylinder,
//! sector turnpoint and sector finish.
//!
//! Flies synthetic fixes out to a turnpoint, climbs there and glides home,
//! checking the transitions and the final glide status on every fix.

use soar_core::{
    AircraftState, GeoPoint, PointDefinition, TaskDefinition, TaskEvent, TaskFactoryType,
    TaskManager, TaskPointFactoryType, Waypoint,
};

const SPEED_MPS: f64 = 40.0;
const SINK_MPS: f64 = 0.8;
const STEP_S: f64 = 10.0;

fn home() -> GeoPoint {
    GeoPoint::new(46.0, 7.0)
}

fn turnpoint() -> GeoPoint {
    home().offset(30_000.0, 0.0)
}

fn build_manager() -> TaskManager {
    racing_manager(TaskPointFactoryType::FaiSector, TaskPointFactoryType::FinishSector)
}

fn racing_manager(turn_type: TaskPointFactoryType, finish_type: TaskPointFactoryType) -> TaskManager {
    let point = |name: &str, location: GeoPoint, point_type| PointDefinition {
        waypoint: Waypoint::new(name, location, 400.0),
        point_type,
        zone: None,
        target: None,
        locked: false,
    };
    let task = TaskDefinition {
        ruleset: TaskFactoryType::Racing,
        settings: None,
        points: vec![
            point("Home", home(), TaskPointFactoryType::StartCylinder),
            point("North", turnpoint(), turn_type),
            point("Home", home(), finish_type),
        ],
    }
    .build()
    .expect("build task");

    let mut manager = TaskManager::default();
    manager.set_task(task).expect("valid task");
    manager
}

struct Flight {
    manager: TaskManager,
    altitude_m: f64,
    time_s: f64,
    location: GeoPoint,
    events: Vec<TaskEvent>,
    active_indices: Vec<usize>,
    /// Zero-climb margin after each fix, with the events that fix produced
    margins: Vec<(f64, Vec<TaskEvent>)>,
}

impl Flight {
    fn new() -> Self {
        Self {
            manager: build_manager(),
            altitude_m: 1_200.0,
            time_s: 0.0,
            location: home(),
            events: Vec::new(),
            active_indices: Vec::new(),
            margins: Vec::new(),
        }
    }

    fn record(&mut self, state: AircraftState) {
        let events = self.manager.update(&state);
        let stats = self.manager.stats();
        if stats.final_glide {
            let solution = &stats.total.solution_remaining;
            assert!(solution.is_ok());
            assert!(solution.altitude_difference_m >= 0.0);
        }
        self.active_indices.push(stats.active_index);
        self.margins
            .push((stats.total.solution_remaining.altitude_difference_m, events.clone()));
        self.events.extend(events);
    }

    fn fly_to(&mut self, to: GeoPoint) {
        let from = self.location;
        let steps = (from.distance(&to) / (SPEED_MPS * STEP_S)).ceil() as usize;
        let track = from.bearing(&to);
        for i in 1..=steps {
            self.time_s += STEP_S;
            self.altitude_m -= SINK_MPS * STEP_S;
            self.location = from.interpolate(&to, i as f64 / steps as f64);
            let state = AircraftState::new(self.location, self.altitude_m, self.time_s)
                .with_velocity(SPEED_MPS, track);
            self.record(state);
        }
    }

    fn climb_to(&mut self, altitude_m: f64) {
        while self.altitude_m < altitude_m {
            self.time_s += STEP_S;
            self.altitude_m += 2.0 * STEP_S;
            let state = AircraftState::new(self.location, self.altitude_m, self.time_s);
            self.record(state);
        }
    }
}

#[test]
fn test_three_point_task_flight() {
    let mut flight = Flight::new();
    flight.record(AircraftState::new(home(), flight.altitude_m, 0.0));
    assert!(!flight.manager.stats().final_glide);

    flight.fly_to(turnpoint());
    flight.climb_to(2_500.0);
    flight.fly_to(home());

    let transitions: Vec<&TaskEvent> = flight
        .events
        .iter()
        .filter(|event| !matches!(event, TaskEvent::FinalGlideChanged { .. }))
        .collect();
    assert!(matches!(
        transitions.as_slice(),
        [
            TaskEvent::Started { .. },
            TaskEvent::TurnpointEntered { index: 1, .. },
            TaskEvent::Finished { .. }
        ]
    ));

    let glide_on = TaskEvent::FinalGlideChanged { final_glide: true };
    let switches: Vec<usize> = flight
        .margins
        .iter()
        .enumerate()
        .filter(|(_, (_, events))| events.contains(&glide_on))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(switches.len(), 1, "final glide switched on {switches:?}");
    let at = switches[0];
    assert!(at > 0);
    assert!(flight.margins[at - 1].0 < 0.0);
    assert!(flight.margins[at].0 >= 0.0);

    assert!(flight
        .active_indices
        .windows(2)
        .all(|pair| pair[0] <= pair[1]));

    let stats = flight.manager.stats();
    assert!(stats.task_finished);
    assert!(!stats.final_glide);
    // Start sample at the last fix inside the start (800 m out), the
    // turnpoint reference, and the finish sector entered at its reference.
    let scored = stats.distances.scored_m;
    assert!(scored > 59_100.0 && scored < 59_300.0, "scored {scored}");
    assert!(stats.total.time_elapsed_s > 0.0);
    assert!(stats.total.speed_travelled_mps > 0.0);
}

#[test]
fn test_restart_on_first_leg() {
    let mut flight = Flight::new();
    flight.record(AircraftState::new(home(), flight.altitude_m, 0.0));
    flight.fly_to(home().offset(5_000.0, 0.0));
    assert!(flight.manager.task().is_started());
    let first_start = flight.manager.task().start_time();

    flight.fly_to(home());
    assert!(!flight.manager.task().is_started());
    flight.fly_to(home().offset(5_000.0, 0.0));

    let starts = flight
        .events
        .iter()
        .filter(|event| matches!(event, TaskEvent::Started { .. }))
        .count();
    assert_eq!(starts, 2);
    assert!(flight
        .events
        .iter()
        .any(|event| matches!(event, TaskEvent::StartRearmed { .. })));
    assert!(flight.manager.task().start_time() > first_start);
}

#[test]
fn test_finish_scored_at_entry_fix() {
    let mut manager = racing_manager(
        TaskPointFactoryType::AstCylinder,
        TaskPointFactoryType::FinishCylinder,
    );
    let outbound = (0..=75).map(|i| (400.0 * i as f64, 0.0));
    let inbound = (1..=75).map(|i| (30_000.0 - 400.0 * i as f64, 180.0));

    let mut scored_before = 0.0;
    let mut finished_at = None;
    for (n, (distance_m, track)) in outbound.chain(inbound).enumerate() {
        let state = AircraftState::new(home().offset(distance_m, 0.0), 1_500.0, n as f64 * 10.0)
            .with_velocity(SPEED_MPS, track);
        let events = manager.update(&state);
        if events
            .iter()
            .any(|event| matches!(event, TaskEvent::Finished { .. }))
        {
            finished_at = Some(distance_m);
            break;
        }
        scored_before = manager.stats().distances.scored_m;
    }

    // 1 km finish cylinder: entered by the fix 800 m out
    let finished_at = finished_at.expect("task finished");
    assert!((finished_at - 800.0).abs() < 1.0);

    let finish = &manager.task().points()[2];
    assert_eq!(finish.sampled().len(), 1);

    let gained = manager.stats().distances.scored_m - scored_before;
    assert!((gained - 400.0).abs() < 50.0, "gained {gained}");
}
