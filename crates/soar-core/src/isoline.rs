//! AAT isolines.
//!
//! All locations on an ellipse with foci at the previous and next task
//! locations give the same task distance through an area point. The target
//! optimiser slides the target along the part of that ellipse which lies
//! inside the area, so only the time (not the distance) changes.

use crate::geo::{FlatPoint, FlatProjection, GeoPoint};
use crate::zone::ObservationZone;
use std::f64::consts::PI;

const MIN_AXIS_M: f64 = 1.0;
/// Steps used to scan half the ellipse for the zone boundary.
const SCAN_STEPS: usize = 180;
const BISECT_ITERATIONS: usize = 32;
/// Parameter spans narrower than this leave nothing to optimise.
const MIN_SPAN_RAD: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AatIsoline {
    projection: FlatProjection,
    center: FlatPoint,
    semi_major: f64,
    semi_minor: f64,
    axis_rad: f64,
    t_start: f64,
    t_end: f64,
}

impl AatIsoline {
    /// Isoline through `target`, clipped to `zone`.
    ///
    /// Returns `None` when the ellipse degenerates, the target lies outside
    /// the zone or the clipped arc is too short to optimise over.
    pub fn new(
        previous: &GeoPoint,
        next: &GeoPoint,
        target: &GeoPoint,
        zone: &ObservationZone,
        projection: &FlatProjection,
    ) -> Option<Self> {
        if !zone.is_inside(target) {
            return None;
        }
        let p = projection.project(previous);
        let n = projection.project(next);
        let t = projection.project(target);

        let focal = p.distance(&n) / 2.0;
        let semi_major = (p.distance(&t) + t.distance(&n)) / 2.0;
        let minor_squared = semi_major * semi_major - focal * focal;
        if semi_major < MIN_AXIS_M || minor_squared < MIN_AXIS_M * MIN_AXIS_M {
            return None;
        }

        let delta = n - p;
        let axis_rad = if focal > MIN_AXIS_M / 2.0 {
            delta.y.atan2(delta.x)
        } else {
            0.0
        };
        let center = (p + n) * 0.5;
        let semi_minor = minor_squared.sqrt();
        let local = (t - center).rotate(-axis_rad);
        let t0 = (local.y / semi_minor).atan2(local.x / semi_major);

        let mut isoline = Self {
            projection: *projection,
            center,
            semi_major,
            semi_minor,
            axis_rad,
            t_start: t0,
            t_end: t0,
        };
        isoline.t_end = isoline.scan(zone, t0, 1.0);
        isoline.t_start = isoline.scan(zone, t0, -1.0);

        if isoline.t_end - isoline.t_start < MIN_SPAN_RAD {
            return None;
        }
        Some(isoline)
    }

    fn point_at(&self, t: f64) -> GeoPoint {
        let local = FlatPoint::new(self.semi_major * t.cos(), self.semi_minor * t.sin());
        self.projection
            .unproject(&(self.center + local.rotate(self.axis_rad)))
    }

    /// Walk from `t0` in `direction` until the ellipse leaves the zone and
    /// return the last parameter still inside.
    fn scan(&self, zone: &ObservationZone, t0: f64, direction: f64) -> f64 {
        let step = PI / SCAN_STEPS as f64;
        let mut inside = t0;
        for i in 1..=SCAN_STEPS {
            let t = t0 + direction * step * i as f64;
            if !zone.is_inside(&self.point_at(t)) {
                return self.bisect(zone, inside, t);
            }
            inside = t;
        }
        inside
    }

    fn bisect(&self, zone: &ObservationZone, mut inside: f64, mut outside: f64) -> f64 {
        for _ in 0..BISECT_ITERATIONS {
            let mid = (inside + outside) / 2.0;
            if zone.is_inside(&self.point_at(mid)) {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside
    }

    /// Location at `p` ∈ [0, 1] along the clipped arc.
    pub fn parametric(&self, p: f64) -> GeoPoint {
        self.point_at(self.t_start + p.clamp(0.0, 1.0) * (self.t_end - self.t_start))
    }

    /// Angular span of the clipped arc in radians.
    pub fn span(&self) -> f64 {
        self.t_end - self.t_start
    }
}
