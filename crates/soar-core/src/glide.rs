//! Glide polar, single-leg MacCready solver and multi-leg composition.

use crate::geo::{normalise_degrees, GeoVector};
use crate::state::Wind;
use serde::{Deserialize, Serialize};

/// Below this ground speed no forward progress is assumed.
const MIN_GROUND_SPEED_MPS: f64 = 0.5;
/// Legs shorter than this are treated as already reached.
const MIN_LEG_DISTANCE_M: f64 = 1.0;

/// Quadratic polar `sink(v) = a·v² + b·v + c` (sink positive, SI units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolarCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub v_min_mps: f64,
    pub v_max_mps: f64,
}

impl Default for PolarCoefficients {
    /// Standard-class glider, best glide about 43:1 near 107 km/h.
    fn default() -> Self {
        Self {
            a: 0.0015,
            b: -0.066,
            c: 1.326,
            v_min_mps: 20.0,
            v_max_mps: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlidePolar {
    coefficients: PolarCoefficients,
    mc_mps: f64,
}

impl GlidePolar {
    pub fn new(coefficients: PolarCoefficients, mc_mps: f64) -> Self {
        Self {
            coefficients,
            mc_mps: mc_mps.max(0.0),
        }
    }

    pub fn mc(&self) -> f64 {
        self.mc_mps
    }

    pub fn set_mc(&mut self, mc_mps: f64) {
        self.mc_mps = mc_mps.max(0.0);
    }

    pub fn coefficients(&self) -> &PolarCoefficients {
        &self.coefficients
    }

    pub fn sink_rate(&self, v_mps: f64) -> f64 {
        let p = &self.coefficients;
        p.a * v_mps * v_mps + p.b * v_mps + p.c
    }

    /// Speed to fly for the current MacCready setting.
    pub fn v_opt(&self) -> f64 {
        let p = &self.coefficients;
        if p.a <= 0.0 {
            return p.v_min_mps;
        }
        ((p.c + self.mc_mps) / p.a)
            .max(0.0)
            .sqrt()
            .clamp(p.v_min_mps, p.v_max_mps)
    }

    pub fn best_ld(&self) -> f64 {
        let v = GlidePolar::new(self.coefficients, 0.0).v_opt();
        let sink = self.sink_rate(v);
        if sink > 0.0 {
            v / sink
        } else {
            f64::INFINITY
        }
    }
}

/// Solver outcome, ordered from worst to best.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlideValidity {
    /// No forward progress possible (wind excessive)
    #[default]
    NoSolution,
    /// Height figures are usable but the climb cannot be timed
    Partial,
    Ok,
}

/// Inputs for one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlideState {
    pub vector: GeoVector,
    pub altitude_m: f64,
    pub min_arrival_altitude_m: f64,
    pub wind: Wind,
}

impl GlideState {
    pub fn new(vector: GeoVector, altitude_m: f64, min_arrival_altitude_m: f64, wind: Wind) -> Self {
        Self {
            vector,
            altitude_m,
            min_arrival_altitude_m,
            wind,
        }
    }

    pub fn altitude_difference(&self) -> f64 {
        self.altitude_m - self.min_arrival_altitude_m
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GlideResult {
    pub validity: GlideValidity,
    pub vector: GeoVector,
    pub start_altitude_m: f64,
    pub v_opt_mps: f64,
    pub cruise_track_bearing: f64,
    pub head_wind_mps: f64,
    pub time_elapsed_s: f64,
    pub height_climb_m: f64,
    /// Height lost gliding, including extra glide to recover climb drift
    pub height_glide_m: f64,
    /// Height lost gliding the straight leg
    pub pure_glide_height_m: f64,
    /// Margin above the minimum arrival altitude (negative = climb needed)
    pub altitude_difference_m: f64,
    pub pure_glide_altitude_difference_m: f64,
    pub min_arrival_altitude_m: f64,
    pub pure_glide_min_arrival_altitude_m: f64,
}

impl GlideResult {
    fn unsolved(state: &GlideState) -> Self {
        Self {
            validity: GlideValidity::NoSolution,
            vector: state.vector,
            start_altitude_m: state.altitude_m,
            cruise_track_bearing: state.vector.bearing,
            altitude_difference_m: state.altitude_difference(),
            pure_glide_altitude_difference_m: state.altitude_difference(),
            min_arrival_altitude_m: state.min_arrival_altitude_m,
            pure_glide_min_arrival_altitude_m: state.min_arrival_altitude_m,
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.validity == GlideValidity::Ok
    }

    pub fn is_defined(&self) -> bool {
        self.validity != GlideValidity::NoSolution
    }

    /// Altitude needed at the start of the leg, drift included.
    pub fn required_altitude_with_drift(&self) -> f64 {
        self.min_arrival_altitude_m + self.height_glide_m
    }

    pub fn required_altitude(&self) -> f64 {
        self.pure_glide_min_arrival_altitude_m + self.pure_glide_height_m
    }

    pub fn arrival_altitude_with_drift(&self, start_altitude_m: f64) -> f64 {
        start_altitude_m - self.height_glide_m
    }

    pub fn arrival_altitude(&self, start_altitude_m: f64) -> f64 {
        start_altitude_m - self.pure_glide_height_m
    }

    /// Expected arrival altitude at the end of the leg.
    pub fn arrival_altitude_now(&self) -> f64 {
        self.min_arrival_altitude_m + self.altitude_difference_m.max(0.0)
    }

    /// Absorb `next` as the following leg.
    pub fn add(&mut self, next: &GlideResult) {
        self.validity = self.validity.min(next.validity);
        self.vector.distance += next.vector.distance;

        if !self.is_defined() || !next.is_defined() {
            return;
        }

        absorb_leg(
            &mut self.min_arrival_altitude_m,
            &mut self.altitude_difference_m,
            next.required_altitude_with_drift(),
            next.height_glide_m,
            next.min_arrival_altitude_m,
        );
        absorb_leg(
            &mut self.pure_glide_min_arrival_altitude_m,
            &mut self.pure_glide_altitude_difference_m,
            next.required_altitude(),
            next.pure_glide_height_m,
            next.pure_glide_min_arrival_altitude_m,
        );

        self.time_elapsed_s += next.time_elapsed_s;
        self.height_glide_m += next.height_glide_m;
        self.pure_glide_height_m += next.pure_glide_height_m;
        self.height_climb_m += next.height_climb_m;
    }

    pub fn is_final_glide(&self) -> bool {
        self.is_ok() && self.altitude_difference_m >= 0.0 && self.height_climb_m <= 0.0
    }
}

/// Combine the safety-altitude bookkeeping of an accumulated chain with the
/// next leg.
///
/// If the next leg can be flown from the chain's minimum arrival altitude the
/// intermediate point is the "mountain top" and the final minimum arrival is
/// what remains after gliding the next leg from it. Otherwise the next leg
/// raises the requirement and the chain's margin shrinks by the difference.
fn absorb_leg(
    min_arrival_altitude: &mut f64,
    altitude_difference: &mut f64,
    next_required: f64,
    next_glide_height: f64,
    next_min_arrival: f64,
) {
    if next_required < *min_arrival_altitude {
        *min_arrival_altitude -= next_glide_height;
    } else {
        *altitude_difference -= next_required - *min_arrival_altitude;
        *min_arrival_altitude = next_min_arrival;
    }
}

/// Solve one leg at the polar's MacCready speed, with wind.
pub fn solve(polar: &GlidePolar, state: &GlideState) -> GlideResult {
    let v_opt = polar.v_opt();
    let sink = polar.sink_rate(v_opt);
    let distance = state.vector.distance.max(0.0);
    let available = state.altitude_difference();

    let mut result = GlideResult::unsolved(state);
    result.v_opt_mps = v_opt;

    let (tail_wind, cross_wind, wind_angle) = if state.wind.is_calm() {
        (0.0, 0.0, 0.0)
    } else {
        let angle =
            normalise_degrees(state.wind.from_deg + 180.0 - state.vector.bearing).to_radians();
        (
            state.wind.speed_mps * angle.cos(),
            state.wind.speed_mps * angle.sin(),
            angle,
        )
    };
    result.head_wind_mps = -tail_wind;

    let drift_ratio = wind_angle.sin() * state.wind.speed_mps / v_opt;
    if !state.wind.is_calm() && drift_ratio.abs() <= 1.0 {
        result.cruise_track_bearing =
            normalise_degrees(state.vector.bearing - drift_ratio.asin().to_degrees() / 2.0);
    }

    let (ground_speed, pure_glide_height) = if distance < MIN_LEG_DISTANCE_M {
        (v_opt, 0.0)
    } else {
        let along = v_opt * v_opt - cross_wind * cross_wind;
        if along <= 0.0 {
            return result;
        }
        let ground_speed = along.sqrt() + tail_wind;
        if ground_speed < MIN_GROUND_SPEED_MPS {
            return result;
        }
        (ground_speed, distance * sink / ground_speed)
    };

    result.pure_glide_height_m = pure_glide_height;
    let deficit = pure_glide_height - available;
    let mc = polar.mc();

    if deficit <= 0.0 {
        result.validity = GlideValidity::Ok;
        result.height_glide_m = pure_glide_height;
        result.time_elapsed_s = distance / ground_speed;
    } else if mc <= 0.0 {
        result.validity = GlideValidity::Partial;
        result.height_glide_m = pure_glide_height;
        result.height_climb_m = deficit;
        result.time_elapsed_s = distance / ground_speed;
    } else {
        // drift back while circling in a head wind must be glided again
        let head_wind = (-tail_wind).max(0.0);
        let drift_factor = head_wind * sink / (mc * ground_speed);
        if drift_factor >= 1.0 {
            return result;
        }
        let height_climb = deficit / (1.0 - drift_factor);
        let drift_distance = head_wind * height_climb / mc;
        result.validity = GlideValidity::Ok;
        result.height_climb_m = height_climb;
        result.height_glide_m = pure_glide_height + drift_factor * height_climb;
        result.time_elapsed_s = (distance + drift_distance) / ground_speed + height_climb / mc;
    }

    result.altitude_difference_m = available - result.height_glide_m;
    result.pure_glide_altitude_difference_m = available - pure_glide_height;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polar(mc: f64) -> GlidePolar {
        GlidePolar::new(PolarCoefficients::default(), mc)
    }

    fn leg(distance: f64, altitude: f64, min_arrival: f64) -> GlideState {
        GlideState::new(
            GeoVector {
                distance,
                bearing: 0.0,
            },
            altitude,
            min_arrival,
            Wind::calm(),
        )
    }

    #[test]
    fn v_opt_increases_with_mc() {
        assert!(polar(3.0).v_opt() > polar(1.0).v_opt());
        let best_ld = polar(1.0).best_ld();
        assert!(best_ld > 35.0 && best_ld < 50.0, "best L/D {best_ld}");
    }

    #[test]
    fn high_start_is_final_glide() {
        let result = solve(&polar(1.5), &leg(20_000.0, 2_000.0, 300.0));
        assert!(result.is_ok());
        assert_eq!(result.height_climb_m, 0.0);
        assert!(result.altitude_difference_m > 0.0);
        assert!(result.is_final_glide());
    }

    #[test]
    fn low_start_requires_climb() {
        let polar = polar(1.5);
        let result = solve(&polar, &leg(100_000.0, 1_000.0, 300.0));
        assert!(result.is_ok());
        assert!(result.height_climb_m > 0.0);
        assert!(!result.is_final_glide());
        let cruise = 100_000.0 / polar.v_opt();
        let climb = result.height_climb_m / 1.5;
        assert!((result.time_elapsed_s - (cruise + climb)).abs() < 1e-6);
    }

    #[test]
    fn zero_mc_with_deficit_is_partial() {
        let result = solve(&polar(0.0), &leg(100_000.0, 1_000.0, 300.0));
        assert_eq!(result.validity, GlideValidity::Partial);
        assert!(!result.is_final_glide());
    }

    #[test]
    fn head_wind_costs_height_and_time() {
        let calm = solve(&polar(1.5), &leg(50_000.0, 1_000.0, 300.0));
        let mut windy_state = leg(50_000.0, 1_000.0, 300.0);
        windy_state.wind = Wind {
            speed_mps: 10.0,
            from_deg: 0.0,
        };
        let windy = solve(&polar(1.5), &windy_state);
        assert!(windy.is_ok());
        assert!((windy.head_wind_mps - 10.0).abs() < 1e-9);
        assert!(windy.height_climb_m > calm.height_climb_m);
        assert!(windy.time_elapsed_s > calm.time_elapsed_s);
        assert!(windy.height_glide_m > windy.pure_glide_height_m);
    }

    #[test]
    fn excessive_wind_has_no_solution() {
        let mut state = leg(50_000.0, 1_000.0, 300.0);
        state.wind = Wind {
            speed_mps: 80.0,
            from_deg: 0.0,
        };
        let result = solve(&polar(1.5), &state);
        assert_eq!(result.validity, GlideValidity::NoSolution);
    }

    #[test]
    fn cross_wind_turns_cruise_track_into_wind() {
        let mut state = leg(50_000.0, 3_000.0, 300.0);
        state.wind = Wind {
            speed_mps: 10.0,
            from_deg: 90.0,
        };
        let result = solve(&polar(1.5), &state);
        assert!(result.cruise_track_bearing > 0.0 && result.cruise_track_bearing < 90.0);
    }

    fn three_legs() -> [GlideResult; 3] {
        let polar = polar(1.5);
        let a = solve(&polar, &leg(40_000.0, 1_200.0, 500.0));
        let b = solve(&polar, &leg(30_000.0, a.arrival_altitude_now(), 400.0));
        let c = solve(&polar, &leg(25_000.0, b.arrival_altitude_now(), 300.0));
        [a, b, c]
    }

    #[test]
    fn add_is_associative_for_distance_and_time() {
        let [a, b, c] = three_legs();

        let mut left = a;
        left.add(&b);
        left.add(&c);

        let mut tail = b;
        tail.add(&c);
        let mut right = a;
        right.add(&tail);

        assert!((left.vector.distance - right.vector.distance).abs() < 1e-6);
        assert!((left.time_elapsed_s - right.time_elapsed_s).abs() < 1e-6);
        assert!((left.vector.distance - 95_000.0).abs() < 1e-6);
    }

    #[test]
    fn composition_never_relaxes_safety_altitudes() {
        let [a, b, c] = three_legs();
        let mut total = a;
        total.add(&b);
        total.add(&c);
        assert!(total.min_arrival_altitude_m >= c.min_arrival_altitude_m - 1e-9);
        assert!(total.required_altitude_with_drift() >= a.required_altitude_with_drift() - 1e-9);
        assert!(total.required_altitude() >= a.required_altitude() - 1e-9);
    }

    #[test]
    fn mountain_top_in_the_middle_keeps_intermediate_requirement() {
        let polar = polar(1.5);
        // high intermediate turnpoint, then a short glide down to a low finish
        let first = solve(&polar, &leg(20_000.0, 2_500.0, 1_800.0));
        let second = solve(&polar, &leg(5_000.0, first.arrival_altitude_now(), 300.0));
        assert!(second.required_altitude_with_drift() < first.min_arrival_altitude_m);

        let mut total = first;
        total.add(&second);
        assert!(
            (total.min_arrival_altitude_m - (1_800.0 - second.height_glide_m)).abs() < 1e-9
        );
        assert!((total.altitude_difference_m - first.altitude_difference_m).abs() < 1e-9);
        assert!(total.min_arrival_altitude_m > second.min_arrival_altitude_m);
    }

    #[test]
    fn higher_later_requirement_reduces_margin() {
        let polar = polar(1.5);
        let first = solve(&polar, &leg(10_000.0, 2_000.0, 300.0));
        let second = solve(&polar, &leg(10_000.0, first.arrival_altitude_now(), 900.0));
        assert!(second.required_altitude_with_drift() >= first.min_arrival_altitude_m);

        let mut total = first;
        total.add(&second);
        let extra = second.required_altitude_with_drift() - 300.0;
        assert!((total.altitude_difference_m - (first.altitude_difference_m - extra)).abs() < 1e-9);
        assert_eq!(total.min_arrival_altitude_m, 900.0);
    }

    #[test]
    fn validity_downgrades_to_worst() {
        let ok = solve(&polar(1.5), &leg(10_000.0, 2_000.0, 300.0));
        let partial = solve(&polar(0.0), &leg(100_000.0, 500.0, 300.0));
        let mut total = ok;
        total.add(&partial);
        assert_eq!(total.validity, GlideValidity::Partial);
        assert!(!total.is_final_glide());
    }
}
