//! Flight path implementations.

use soar_core::{AircraftState, GeoPoint, GlidePolar, OrderedTask, Wind};

/// How far past a fixed turnpoint the synthetic pilot flies into its zone.
const TURNPOINT_DIP_M: f64 = 1_000.0;

/// Trait for flight path implementations.
pub trait FlightPath: Send + Sync {
    /// Aircraft state at `t` seconds from the start of the path.
    fn state_at(&self, t: f64) -> AircraftState;

    /// Time needed to fly the whole path in seconds.
    fn duration_s(&self) -> f64;

    /// States every `step_s` seconds, always ending with the final state.
    fn sample(&self, step_s: f64) -> Vec<AircraftState> {
        let step = step_s.max(0.1);
        let duration = self.duration_s();
        let mut states = Vec::new();
        let mut t = 0.0;
        while t < duration {
            states.push(self.state_at(t));
            t += step;
        }
        states.push(self.state_at(duration));
        states
    }
}

/// How the synthetic pilot flies.
#[derive(Debug, Clone, Copy)]
pub struct FlightProfile {
    pub start_altitude_m: f64,
    /// Stop and climb when the altitude falls to this height
    pub floor_m: f64,
    /// Leave the thermal at this height
    pub ceiling_m: f64,
    pub climb_rate_mps: f64,
    /// Reported in every state; the path itself is not drifted
    pub wind: Wind,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            start_altitude_m: 1_500.0,
            floor_m: 900.0,
            ceiling_m: 2_200.0,
            climb_rate_mps: 2.0,
            wind: Wind::calm(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Cruise {
        from: GeoPoint,
        to: GeoPoint,
        start_s: f64,
        duration_s: f64,
        start_altitude_m: f64,
        sink_mps: f64,
        speed_mps: f64,
        track_deg: f64,
    },
    Climb {
        at: GeoPoint,
        start_s: f64,
        duration_s: f64,
        start_altitude_m: f64,
        rate_mps: f64,
    },
}

impl Phase {
    fn end_s(&self) -> f64 {
        match *self {
            Phase::Cruise {
                start_s,
                duration_s,
                ..
            }
            | Phase::Climb {
                start_s,
                duration_s,
                ..
            } => start_s + duration_s,
        }
    }
}

/// Cruise-and-climb flight along a route: glides at the polar's MacCready
/// speed and climbs at a fixed rate whenever it reaches the floor.
#[derive(Debug, Clone)]
pub struct TaskFlight {
    phases: Vec<Phase>,
    origin: GeoPoint,
    start_altitude_m: f64,
    start_time_s: f64,
    wind: Wind,
}

impl TaskFlight {
    /// Plan a flight along `route`. Returns `None` for an empty route.
    pub fn new(
        route: &[GeoPoint],
        polar: &GlidePolar,
        profile: FlightProfile,
        start_time_s: f64,
    ) -> Option<Self> {
        let origin = *route.first()?;
        let speed = polar.v_opt();
        let sink = polar.sink_rate(speed).max(0.0);
        let ceiling = profile.ceiling_m.max(profile.floor_m + 100.0);
        let climb_rate = profile.climb_rate_mps.max(0.1);

        let mut phases = Vec::new();
        let mut t = 0.0;
        let mut altitude = profile.start_altitude_m;

        for pair in route.windows(2) {
            let (mut from, to) = (pair[0], pair[1]);
            loop {
                let remaining = from.distance(&to);
                if remaining < 1.0 {
                    break;
                }
                let reach = if sink > 0.0 {
                    (altitude - profile.floor_m).max(0.0) / sink * speed
                } else {
                    f64::INFINITY
                };
                let leg = remaining.min(reach);
                if leg >= 1.0 {
                    let end = from.interpolate(&to, leg / remaining);
                    let duration = leg / speed;
                    phases.push(Phase::Cruise {
                        from,
                        to: end,
                        start_s: t,
                        duration_s: duration,
                        start_altitude_m: altitude,
                        sink_mps: sink,
                        speed_mps: speed,
                        track_deg: from.bearing(&to),
                    });
                    t += duration;
                    altitude -= sink * duration;
                    from = end;
                }
                if leg < remaining {
                    let duration = (ceiling - altitude).max(0.0) / climb_rate;
                    phases.push(Phase::Climb {
                        at: from,
                        start_s: t,
                        duration_s: duration,
                        start_altitude_m: altitude,
                        rate_mps: climb_rate,
                    });
                    t += duration;
                    altitude = ceiling;
                }
            }
        }

        Some(Self {
            phases,
            origin,
            start_altitude_m: profile.start_altitude_m,
            start_time_s,
            wind: profile.wind,
        })
    }

    /// Route through a task's targets with a lead-in before the start and a
    /// short run-out past the finish, so line zones are crossed. Fixed
    /// turnpoints are rounded through a point just inside their zone.
    pub fn route_for(task: &OrderedTask) -> Vec<GeoPoint> {
        let targets: Vec<GeoPoint> = task
            .points()
            .iter()
            .map(|p| {
                if p.is_start() || p.is_finish() || p.is_area() {
                    p.target_location()
                } else {
                    let zone = p.zone();
                    let depth = (zone.radius() / 2.0).min(TURNPOINT_DIP_M);
                    p.location().offset(depth, zone.bisector())
                }
            })
            .collect();
        let n = targets.len();
        if n < 2 {
            return targets;
        }
        let (first, last) = (targets[0], targets[n - 1]);

        let mut route = Vec::with_capacity(n + 2);
        route.push(first.offset(3_000.0, targets[1].bearing(&first)));
        route.extend(targets.iter().copied());
        route.push(last.offset(1_000.0, targets[n - 2].bearing(&last)));
        route
    }

    /// Number of thermals on the planned path.
    pub fn climbs(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| matches!(p, Phase::Climb { .. }))
            .count()
    }
}

impl FlightPath for TaskFlight {
    fn state_at(&self, t: f64) -> AircraftState {
        let t = t.clamp(0.0, self.duration_s());
        let Some(phase) = self
            .phases
            .iter()
            .find(|p| t <= p.end_s())
            .or(self.phases.last())
        else {
            return AircraftState::new(self.origin, self.start_altitude_m, self.start_time_s)
                .with_wind(self.wind);
        };

        let state = match *phase {
            Phase::Cruise {
                from,
                to,
                start_s,
                duration_s,
                start_altitude_m,
                sink_mps,
                speed_mps,
                track_deg,
            } => {
                let dt = (t - start_s).clamp(0.0, duration_s);
                let fraction = if duration_s > 0.0 { dt / duration_s } else { 1.0 };
                AircraftState::new(
                    from.interpolate(&to, fraction),
                    start_altitude_m - sink_mps * dt,
                    self.start_time_s + t,
                )
                .with_velocity(speed_mps, track_deg)
            }
            Phase::Climb {
                at,
                start_s,
                duration_s,
                start_altitude_m,
                rate_mps,
            } => {
                let dt = (t - start_s).clamp(0.0, duration_s);
                AircraftState::new(at, start_altitude_m + rate_mps * dt, self.start_time_s + t)
            }
        };
        state.with_wind(self.wind)
    }

    fn duration_s(&self) -> f64 {
        self.phases.last().map_or(0.0, Phase::end_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soar_core::PolarCoefficients;

    fn polar() -> GlidePolar {
        GlidePolar::new(PolarCoefficients::default(), 1.5)
    }

    #[test]
    fn test_short_route_is_pure_glide() {
        let home = GeoPoint::new(46.0, 7.0);
        let route = [home, home.offset(10_000.0, 90.0)];
        let flight = TaskFlight::new(&route, &polar(), FlightProfile::default(), 0.0).unwrap();
        assert_eq!(flight.climbs(), 0);

        let end = flight.state_at(flight.duration_s());
        assert!(end.location.distance(&route[1]) < 1.0);
        assert!(end.altitude_m < 1_500.0);
        assert!((end.track_deg - 90.0).abs() < 1.0);
    }

    #[test]
    fn test_long_route_climbs_and_stays_above_floor() {
        let home = GeoPoint::new(46.0, 7.0);
        let route = [home, home.offset(100_000.0, 0.0), home];
        let profile = FlightProfile::default();
        let flight = TaskFlight::new(&route, &polar(), profile, 100.0).unwrap();
        assert!(flight.climbs() > 0);

        let states = flight.sample(10.0);
        assert!(states
            .iter()
            .all(|s| s.altitude_m >= profile.floor_m - 1.0));
        assert!(states.windows(2).all(|w| w[0].time_s < w[1].time_s));
        assert_eq!(states.first().map(|s| s.time_s), Some(100.0));
        let last = states.last().unwrap();
        assert!(last.location.distance(&home) < 1.0);
    }

    #[test]
    fn test_empty_route_has_no_flight() {
        assert!(TaskFlight::new(&[], &polar(), FlightProfile::default(), 0.0).is_none());
    }
}
