//! Task points.
//!
//! A task point couples a waypoint with its observation zone and keeps three
//! search polygons: the samples recorded while inside the zone, the zone
//! boundary and the nominal reference. Which one scoring searches depends on
//! the point's [`ScoringPolicy`].

use crate::factory::TaskPointFactoryType;
use crate::geo::{angle_between, FlatGeoPoint, FlatProjection, GeoPoint};
use crate::search::{SearchPoint, SearchPointVector, MAX_SEARCH_POINTS};
use crate::state::{AircraftState, Waypoint};
use crate::zone::{ObservationZone, ZoneShape};
use serde::{Deserialize, Serialize};

/// Role of a point within the task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PointKind {
    Start,
    /// Assigned-speed turnpoint
    Turnpoint,
    Area(AreaTarget),
    Finish {
        /// Minimum finish altitude under FAI rules, set when the task starts
        fai_finish_height_m: f64,
    },
}

/// Movable target inside an area point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaTarget {
    pub location: GeoPoint,
    pub locked: bool,
}

/// How a point is scored and searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Boundary polygon is the zone outline (otherwise just the reference)
    pub boundary_scored: bool,
    /// Scoring always searches the boundary, ignoring samples
    pub search_boundary: bool,
    /// Nominal reference may stand in when no samples exist
    pub search_nominal: bool,
}

impl ScoringPolicy {
    pub fn for_kind(kind: &PointKind, start_boundary_scored: bool) -> Self {
        match kind {
            PointKind::Start => Self {
                boundary_scored: true,
                search_boundary: start_boundary_scored,
                search_nominal: true,
            },
            PointKind::Turnpoint => Self {
                boundary_scored: false,
                search_boundary: false,
                search_nominal: true,
            },
            PointKind::Area(_) => Self {
                boundary_scored: true,
                search_boundary: false,
                search_nominal: false,
            },
            PointKind::Finish { .. } => Self {
                boundary_scored: true,
                search_boundary: false,
                search_nominal: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionState {
    pub entered_at_s: Option<f64>,
    pub exited_at_s: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TaskPoint {
    factory_type: TaskPointFactoryType,
    waypoint: Waypoint,
    zone: ObservationZone,
    kind: PointKind,
    policy: ScoringPolicy,
    sampled: SearchPointVector,
    boundary: SearchPointVector,
    nominal: SearchPointVector,
    transition: TransitionState,
}

impl TaskPoint {
    pub fn new(
        factory_type: TaskPointFactoryType,
        waypoint: Waypoint,
        zone: ObservationZone,
        kind: PointKind,
        policy: ScoringPolicy,
    ) -> Self {
        let projection = FlatProjection::new(waypoint.location);
        let mut point = Self {
            factory_type,
            waypoint,
            zone,
            kind,
            policy,
            sampled: SearchPointVector::new(),
            boundary: SearchPointVector::new(),
            nominal: SearchPointVector::new(),
            transition: TransitionState::default(),
        };
        point.update_oz(&projection);
        point
    }

    pub fn factory_type(&self) -> TaskPointFactoryType {
        self.factory_type
    }

    pub fn waypoint(&self) -> &Waypoint {
        &self.waypoint
    }

    pub fn name(&self) -> &str {
        &self.waypoint.name
    }

    pub fn location(&self) -> GeoPoint {
        self.waypoint.location
    }

    pub fn elevation(&self) -> f64 {
        self.waypoint.elevation_m
    }

    pub fn zone(&self) -> &ObservationZone {
        &self.zone
    }

    pub fn kind(&self) -> &PointKind {
        &self.kind
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn transition(&self) -> &TransitionState {
        &self.transition
    }

    pub fn is_start(&self) -> bool {
        matches!(self.kind, PointKind::Start)
    }

    pub fn is_finish(&self) -> bool {
        matches!(self.kind, PointKind::Finish { .. })
    }

    pub fn is_area(&self) -> bool {
        matches!(self.kind, PointKind::Area(_))
    }

    /// Location the glide solver aims for.
    pub fn target_location(&self) -> GeoPoint {
        match self.kind {
            PointKind::Area(target) => target.location,
            _ => self.waypoint.location,
        }
    }

    pub fn area_target(&self) -> Option<&AreaTarget> {
        match &self.kind {
            PointKind::Area(target) => Some(target),
            _ => None,
        }
    }

    pub fn is_target_locked(&self) -> bool {
        self.area_target().is_some_and(|target| target.locked)
    }

    /// Move the area target. Returns false for non-area points or locations
    /// outside the zone.
    pub fn set_target(&mut self, location: GeoPoint) -> bool {
        if !self.zone.is_inside(&location) {
            return false;
        }
        match &mut self.kind {
            PointKind::Area(target) => {
                target.location = location;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn set_target_unchecked(&mut self, location: GeoPoint) {
        if let PointKind::Area(target) = &mut self.kind {
            target.location = location;
        }
    }

    /// No effect on points without a target.
    pub fn set_target_locked(&mut self, locked: bool) {
        if let PointKind::Area(target) = &mut self.kind {
            target.locked = locked;
        }
    }

    /// Boundary points giving the shortest and the longest path from
    /// `previous` to `next` through this point.
    pub fn min_max_boundary_locations(
        &self,
        previous: &GeoPoint,
        next: &GeoPoint,
    ) -> Option<(GeoPoint, GeoPoint)> {
        let path = |p: &SearchPoint| previous.distance(&p.location) + p.location.distance(next);
        let min = self
            .boundary
            .iter()
            .min_by(|a, b| path(a).total_cmp(&path(b)))?;
        let max = self
            .boundary
            .iter()
            .max_by(|a, b| path(a).total_cmp(&path(b)))?;
        Some((min.location, max.location))
    }

    /// Place the area target at `range` ∈ [0, 1] between the minimum- and
    /// maximum-distance boundary locations.
    pub fn set_target_range(&mut self, range: f64, previous: &GeoPoint, next: &GeoPoint) -> bool {
        if !self.is_area() {
            return false;
        }
        let Some((min, max)) = self.min_max_boundary_locations(previous, next) else {
            return false;
        };
        let candidate = min.interpolate(&max, range.clamp(0.0, 1.0));
        let location = if self.zone.is_inside(&candidate) {
            candidate
        } else {
            // chord leaves non-convex zones; use the closest boundary vertex
            self.boundary
                .iter()
                .min_by(|a, b| {
                    a.location
                        .distance(&candidate)
                        .total_cmp(&b.location.distance(&candidate))
                })
                .map(|p| p.location)
                .unwrap_or(candidate)
        };
        self.set_target_unchecked(location);
        true
    }

    pub(crate) fn set_fai_finish_height(&mut self, height_m: f64) {
        if let PointKind::Finish {
            fai_finish_height_m,
        } = &mut self.kind
        {
            *fai_finish_height_m = height_m.max(0.0);
        }
    }

    pub fn fai_finish_height(&self) -> Option<f64> {
        match self.kind {
            PointKind::Finish {
                fai_finish_height_m,
            } => Some(fai_finish_height_m),
            _ => None,
        }
    }

    /// Recompute leg-dependent zone geometry and every cached projection.
    pub fn update_geometry(
        &mut self,
        previous: Option<&GeoPoint>,
        next: Option<&GeoPoint>,
        projection: &FlatProjection,
    ) {
        self.zone.set_legs(previous, next);
        self.update_oz(projection);
        self.sampled.project(projection);
        self.nominal = SearchPointVector::single(self.waypoint.location, projection);
    }

    /// Rebuild the boundary polygon from the zone outline.
    pub fn update_oz(&mut self, projection: &FlatProjection) {
        self.boundary = if self.policy.boundary_scored {
            let mut boundary = SearchPointVector::from_locations(self.zone.boundary(), projection);
            boundary.prune_interior();
            boundary.thin_to_size(MAX_SEARCH_POINTS);
            if boundary.is_empty() {
                SearchPointVector::single(self.zone.reference(), projection)
            } else {
                boundary
            }
        } else {
            SearchPointVector::single(self.zone.reference(), projection)
        };
        self.nominal = SearchPointVector::single(self.waypoint.location, projection);
    }

    /// Add the aircraft location to the sample polygon if inside the zone.
    ///
    /// Returns true only when the hull vertex set changed.
    pub fn update_sample_near(&mut self, state: &AircraftState, projection: &FlatProjection) -> bool {
        if !self.zone.is_inside(&state.location) {
            return false;
        }
        let sample = SearchPoint::new(state.location, projection);
        if self.sampled.len() >= 3 && self.sampled.is_inside(&sample.flat) {
            return false;
        }

        let mut candidate = self.sampled.clone();
        candidate.push(sample);
        candidate.prune_interior();
        candidate.thin_to_size(MAX_SEARCH_POINTS);

        let before = self.sampled.flat_vertices();
        let after = candidate.flat_vertices();
        if same_vertex_set(&before, &after) {
            return false;
        }
        self.sampled = candidate;
        true
    }

    pub fn sampled(&self) -> &SearchPointVector {
        &self.sampled
    }

    pub fn boundary(&self) -> &SearchPointVector {
        &self.boundary
    }

    pub fn nominal(&self) -> &SearchPointVector {
        &self.nominal
    }

    /// Polygon used for scored distance searches.
    pub fn search_points(&self) -> &SearchPointVector {
        if self.policy.search_boundary {
            &self.boundary
        } else if !self.sampled.is_empty() {
            &self.sampled
        } else if self.policy.search_nominal {
            &self.nominal
        } else {
            &self.boundary
        }
    }

    pub fn is_in_zone(&self, location: &GeoPoint) -> bool {
        self.zone.is_inside(location)
    }

    /// True when the aircraft moved into the zone between two fixes.
    pub fn entered_zone(
        &self,
        previous: &AircraftState,
        current: &AircraftState,
        projection: &FlatProjection,
    ) -> bool {
        let was_in = self.zone.is_inside(&previous.location);
        let now_in = self.zone.is_inside(&current.location);
        if now_in && !was_in {
            return true;
        }
        self.line_crossed(previous, current, projection)
            && !self.on_zone_side(&previous.location)
            && self.on_zone_side(&current.location)
    }

    /// True when the aircraft moved out of the zone between two fixes.
    pub fn exited_zone(
        &self,
        previous: &AircraftState,
        current: &AircraftState,
        projection: &FlatProjection,
    ) -> bool {
        let was_in = self.zone.is_inside(&previous.location);
        let now_in = self.zone.is_inside(&current.location);
        if was_in && !now_in {
            return true;
        }
        self.line_crossed(previous, current, projection)
            && self.on_zone_side(&previous.location)
            && !self.on_zone_side(&current.location)
    }

    fn line_crossed(
        &self,
        previous: &AircraftState,
        current: &AircraftState,
        projection: &FlatProjection,
    ) -> bool {
        matches!(self.zone.shape(), ZoneShape::Line { .. })
            && self
                .zone
                .crosses_line(&previous.location, &current.location, projection)
    }

    fn on_zone_side(&self, location: &GeoPoint) -> bool {
        angle_between(
            self.zone.reference().bearing(location),
            self.zone.start_radial(),
            self.zone.end_radial(),
        )
    }

    pub fn has_entered(&self) -> bool {
        self.transition.entered_at_s.is_some()
    }

    pub fn has_exited(&self) -> bool {
        self.transition.exited_at_s.is_some()
    }

    pub(crate) fn set_entered(&mut self, time_s: f64) {
        if self.transition.entered_at_s.is_none() {
            self.transition.entered_at_s = Some(time_s);
        }
    }

    pub(crate) fn set_exited(&mut self, time_s: f64) {
        self.transition.exited_at_s = Some(time_s);
    }

    /// Forget transitions and samples; the samples restart from `last`.
    pub fn reset(&mut self, last: Option<&GeoPoint>, projection: &FlatProjection) {
        self.transition = TransitionState::default();
        self.sampled = match last {
            Some(location) => SearchPointVector::single(*location, projection),
            None => SearchPointVector::new(),
        };
    }

    /// Restart the samples from a single location.
    pub(crate) fn reset_samples(&mut self, location: &GeoPoint, projection: &FlatProjection) {
        self.sampled = SearchPointVector::single(*location, projection);
    }
}

fn same_vertex_set(a: &[FlatGeoPoint], b: &[FlatGeoPoint]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}
