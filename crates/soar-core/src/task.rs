//! Ordered task.
//!
//! Owns the task points in order, tracks the active point and the start and
//! finish times, and performs the per-fix work: transition detection, sample
//! updates, the remaining-task glide solution and the scored distances.

use crate::behaviour::{HeightReference, OrderedTaskSettings, TaskBehaviour, FAI_MAX_HEIGHT_LOSS_M};
use crate::error::TaskError;
use crate::factory::TaskFactoryType;
use crate::geo::{FlatProjection, GeoPoint};
use crate::glide::{self, GlidePolar, GlideResult, GlideState};
use crate::isoline::AatIsoline;
use crate::point::{PointKind, TaskPoint};
use crate::search::SearchPointVector;
use crate::state::AircraftState;
use crate::stats::{DistanceStat, ElementStat, TaskStats};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Something that happened to the task while processing a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TaskEvent {
    Started {
        time_s: f64,
        altitude_m: f64,
    },
    /// Start zone re-entered on the first leg; the next exit restarts the task
    StartRearmed {
        time_s: f64,
    },
    TurnpointEntered {
        index: usize,
        name: String,
        time_s: f64,
    },
    AreaExited {
        index: usize,
        name: String,
        time_s: f64,
    },
    Finished {
        time_s: f64,
        elapsed_s: f64,
    },
    FinalGlideChanged {
        final_glide: bool,
    },
}

#[derive(Debug, Clone)]
pub struct OrderedTask {
    factory: TaskFactoryType,
    settings: OrderedTaskSettings,
    points: Vec<TaskPoint>,
    active: usize,
    projection: FlatProjection,
    start_time_s: Option<f64>,
    finish_time_s: Option<f64>,
    last_state: Option<AircraftState>,
}

impl Default for OrderedTask {
    fn default() -> Self {
        Self::new(TaskFactoryType::default(), OrderedTaskSettings::default())
    }
}

impl OrderedTask {
    pub fn new(factory: TaskFactoryType, settings: OrderedTaskSettings) -> Self {
        Self {
            factory,
            settings,
            points: Vec::new(),
            active: 0,
            projection: FlatProjection::new(GeoPoint::new(0.0, 0.0)),
            start_time_s: None,
            finish_time_s: None,
            last_state: None,
        }
    }

    pub fn from_points(
        factory: TaskFactoryType,
        settings: OrderedTaskSettings,
        points: Vec<TaskPoint>,
    ) -> Self {
        let mut task = Self::new(factory, settings);
        task.points = points;
        task.update_geometry();
        task
    }

    pub fn factory_type(&self) -> TaskFactoryType {
        self.factory
    }

    pub fn settings(&self) -> &OrderedTaskSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: OrderedTaskSettings) {
        self.settings = settings;
    }

    pub fn points(&self) -> &[TaskPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&TaskPoint> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_point(&self) -> Option<&TaskPoint> {
        self.points.get(self.active)
    }

    pub fn projection(&self) -> &FlatProjection {
        &self.projection
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time_s
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time_s
    }

    pub fn is_started(&self) -> bool {
        self.start_time_s.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finish_time_s.is_some()
    }

    pub fn has_area_points(&self) -> bool {
        self.points.iter().any(TaskPoint::is_area)
    }

    fn check_index(&self, index: usize) -> Result<(), TaskError> {
        if index < self.points.len() {
            Ok(())
        } else {
            Err(TaskError::IndexOutOfRange {
                index,
                len: self.points.len(),
            })
        }
    }

    pub fn set_active_index(&mut self, index: usize) -> Result<(), TaskError> {
        self.check_index(index)?;
        self.active = index;
        Ok(())
    }

    pub fn append(&mut self, point: TaskPoint) {
        self.points.push(point);
        self.update_geometry();
    }

    pub fn insert(&mut self, index: usize, point: TaskPoint) -> Result<(), TaskError> {
        if index > self.points.len() {
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        self.points.insert(index, point);
        self.update_geometry();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<TaskPoint, TaskError> {
        self.check_index(index)?;
        let removed = self.points.remove(index);
        self.update_geometry();
        Ok(removed)
    }

    pub fn replace(&mut self, index: usize, point: TaskPoint) -> Result<TaskPoint, TaskError> {
        self.check_index(index)?;
        let previous = std::mem::replace(&mut self.points[index], point);
        self.update_geometry();
        Ok(previous)
    }

    /// Recompute the shared projection, zone radials and every polygon.
    ///
    /// Called after every structural edit.
    pub fn update_geometry(&mut self) {
        self.projection = FlatProjection::from_points(self.points.iter().map(|p| &p.waypoint().location))
            .unwrap_or_else(|| FlatProjection::new(GeoPoint::new(0.0, 0.0)));
        let locations: Vec<GeoPoint> = self.points.iter().map(TaskPoint::location).collect();
        for (i, point) in self.points.iter_mut().enumerate() {
            let previous = i.checked_sub(1).map(|j| &locations[j]);
            let next = locations.get(i + 1);
            point.update_geometry(previous, next, &self.projection);
            let target_outside = point
                .area_target()
                .is_some_and(|target| !point.is_in_zone(&target.location));
            if target_outside {
                point.set_target_unchecked(point.location());
            }
        }
        if self.active >= self.points.len() {
            self.active = self.points.len().saturating_sub(1);
        }
    }

    fn area_index(&self, index: usize) -> Result<(), TaskError> {
        self.check_index(index)?;
        if self.points[index].is_area() {
            Ok(())
        } else {
            Err(TaskError::NotAreaPoint(index))
        }
    }

    pub fn set_target(&mut self, index: usize, location: GeoPoint) -> Result<(), TaskError> {
        self.area_index(index)?;
        if self.points[index].set_target(location) {
            Ok(())
        } else {
            Err(TaskError::TargetOutsideZone(index))
        }
    }

    pub fn set_target_locked(&mut self, index: usize, locked: bool) -> Result<(), TaskError> {
        self.area_index(index)?;
        self.points[index].set_target_locked(locked);
        Ok(())
    }

    /// Place an area target at `range` ∈ [0, 1] between its minimum- and
    /// maximum-distance positions.
    pub fn set_target_range(&mut self, index: usize, range: f64) -> Result<(), TaskError> {
        self.area_index(index)?;
        let (previous, next) = self.neighbour_targets(index);
        if self.points[index].set_target_range(range, &previous, &next) {
            Ok(())
        } else {
            Err(TaskError::DegenerateZone(index))
        }
    }

    pub(crate) fn set_target_unchecked(&mut self, index: usize, location: GeoPoint) {
        if let Some(point) = self.points.get_mut(index) {
            point.set_target_unchecked(location);
        }
    }

    fn neighbour_targets(&self, index: usize) -> (GeoPoint, GeoPoint) {
        let here = self.points[index].location();
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.points.get(i))
            .map_or(here, TaskPoint::target_location);
        let next = self
            .points
            .get(index + 1)
            .map_or(here, TaskPoint::target_location);
        (previous, next)
    }

    /// Isoline of the area target at `index`, as seen from the aircraft.
    pub fn isoline(&self, index: usize, state: &AircraftState) -> Option<AatIsoline> {
        let point = self.points.get(index)?;
        let target = point.area_target()?;
        if point.has_entered() || index < self.active {
            return None;
        }
        let next = self.points.get(index + 1)?.target_location();
        let previous = if index == self.active {
            state.location
        } else {
            self.points.get(index.checked_sub(1)?)?.target_location()
        };
        AatIsoline::new(&previous, &next, &target.location, point.zone(), &self.projection)
    }

    /// Return every point to its initial state.
    ///
    /// Samples restart from the last known location where it lies inside the
    /// point's zone.
    pub fn reset(&mut self) {
        let last = self.last_state.map(|state| state.location);
        for point in &mut self.points {
            let keep = last.filter(|location| point.is_in_zone(location));
            point.reset(keep.as_ref(), &self.projection);
            point.set_fai_finish_height(0.0);
        }
        self.active = 0;
        self.start_time_s = None;
        self.finish_time_s = None;
        info!(points = self.points.len(), "task reset");
    }

    fn advance(&mut self) {
        if self.active + 1 < self.points.len() {
            self.active += 1;
        }
    }

    fn start_is_legal(&self, state: &AircraftState, behaviour: &TaskBehaviour) -> bool {
        let elevation = self.points.first().map_or(0.0, TaskPoint::elevation);
        let start = &self.settings.start;
        start.check_height(state.altitude_m, elevation, behaviour.start_max_height_margin_m)
            && start.check_speed(state.ground_speed_mps, behaviour.start_max_speed_margin_mps)
    }

    fn finish_height_ok(&self, state: &AircraftState) -> bool {
        let Some(finish) = self.points.last() else {
            return false;
        };
        let constraints = &self.settings.finish;
        if constraints.min_height_m > 0.0
            && constraints
                .min_height_ref
                .height(state.altitude_m, finish.elevation())
                < constraints.min_height_m
        {
            return false;
        }
        if constraints.fai_finish {
            if let Some(height) = finish.fai_finish_height() {
                return state.altitude_m >= height;
            }
        }
        true
    }

    /// Detect zone transitions between the previous fix and `state`.
    pub fn check_transitions(
        &mut self,
        state: &AircraftState,
        behaviour: &TaskBehaviour,
    ) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        let Some(previous) = self.last_state.replace(*state) else {
            return events;
        };
        if self.points.is_empty() || self.is_finished() {
            return events;
        }
        let projection = self.projection;

        if self.active == 1
            && self.points.len() > 1
            && !self.points[1].has_entered()
            && self.points[0].entered_zone(&previous, state, &projection)
        {
            self.active = 0;
            self.start_time_s = None;
            self.points[0].reset_samples(&state.location, &projection);
            info!(time_s = state.time_s, "start re-armed");
            events.push(TaskEvent::StartRearmed {
                time_s: state.time_s,
            });
            return events;
        }

        let index = self.active;
        let prior_entered = index == 0 || self.points[index - 1].has_entered();
        let entered = self.points[index].entered_zone(&previous, state, &projection);
        let exited = self.points[index].exited_zone(&previous, state, &projection);
        let name = self.points[index].name().to_string();

        let kind = *self.points[index].kind();
        match kind {
            PointKind::Start => {
                if entered {
                    self.points[index].set_entered(state.time_s);
                }
                if exited {
                    if self.start_is_legal(&previous, behaviour) {
                        let start = &mut self.points[index];
                        start.set_entered(previous.time_s);
                        start.set_exited(state.time_s);
                        start.reset_samples(&previous.location, &projection);
                        self.start_time_s = Some(state.time_s);
                        let fai_height = state.altitude_m - FAI_MAX_HEIGHT_LOSS_M;
                        if let Some(finish) = self.points.last_mut() {
                            finish.set_fai_finish_height(fai_height);
                        }
                        self.advance();
                        info!(
                            time_s = state.time_s,
                            altitude_m = state.altitude_m,
                            "task started"
                        );
                        events.push(TaskEvent::Started {
                            time_s: state.time_s,
                            altitude_m: state.altitude_m,
                        });
                    } else {
                        debug!(
                            altitude_m = previous.altitude_m,
                            ground_speed_mps = previous.ground_speed_mps,
                            "start exit outside start limits"
                        );
                    }
                }
            }
            PointKind::Turnpoint => {
                if prior_entered && entered {
                    self.points[index].set_entered(state.time_s);
                    self.advance();
                    info!(index, name = %name, "turnpoint entered");
                    events.push(TaskEvent::TurnpointEntered {
                        index,
                        name,
                        time_s: state.time_s,
                    });
                }
            }
            PointKind::Area(_) => {
                if !self.points[index].has_entered() {
                    if prior_entered && entered {
                        self.points[index].set_entered(state.time_s);
                        info!(index, name = %name, "area entered");
                        events.push(TaskEvent::TurnpointEntered {
                            index,
                            name,
                            time_s: state.time_s,
                        });
                    }
                } else if exited {
                    self.points[index].set_exited(state.time_s);
                    self.advance();
                    info!(index, name = %name, "area exited");
                    events.push(TaskEvent::AreaExited {
                        index,
                        name,
                        time_s: state.time_s,
                    });
                }
            }
            PointKind::Finish { .. } => {
                if prior_entered
                    && self.finish_height_ok(&previous)
                    && self.finish_height_ok(state)
                    && entered
                {
                    // sampling stops once finished; keep the finishing fix
                    if self.points[index].update_sample_near(state, &projection) {
                        debug!(index, "finish sample recorded");
                    }
                    self.points[index].set_entered(state.time_s);
                    self.finish_time_s = Some(state.time_s);
                    let elapsed_s = self
                        .start_time_s
                        .map_or(0.0, |start| state.time_s - start);
                    info!(time_s = state.time_s, elapsed_s, "task finished");
                    events.push(TaskEvent::Finished {
                        time_s: state.time_s,
                        elapsed_s,
                    });
                }
            }
        }
        events
    }

    /// Record the fix in the sample polygons of every point up to the active one.
    pub fn update_samples(&mut self, state: &AircraftState) -> bool {
        if self.is_finished() {
            return false;
        }
        let mut changed = false;
        let last = self.active.min(self.points.len().saturating_sub(1));
        for (index, point) in self.points.iter_mut().enumerate().take(last + 1) {
            if point.update_sample_near(state, &self.projection) {
                debug!(index, vertices = point.sampled().len(), "sample hull changed");
                changed = true;
            }
        }
        changed
    }

    /// Minimum arrival altitude at the point, safety height and finish
    /// limits included.
    pub fn min_arrival_altitude(&self, index: usize, behaviour: &TaskBehaviour) -> f64 {
        let Some(point) = self.points.get(index) else {
            return 0.0;
        };
        let mut altitude = point.elevation() + behaviour.safety_height_arrival_m;
        if point.is_finish() {
            let constraints = &self.settings.finish;
            if constraints.min_height_m > 0.0 {
                let limit = match constraints.min_height_ref {
                    HeightReference::Msl => constraints.min_height_m,
                    HeightReference::Agl => point.elevation() + constraints.min_height_m,
                };
                altitude = altitude.max(limit);
            }
            if constraints.fai_finish {
                if let Some(height) = point.fai_finish_height() {
                    altitude = altitude.max(height);
                }
            }
        }
        altitude
    }

    fn solve_range(
        &self,
        first: usize,
        last: usize,
        state: &AircraftState,
        polar: &GlidePolar,
        behaviour: &TaskBehaviour,
    ) -> Option<GlideResult> {
        let mut from = state.location;
        let mut altitude = state.altitude_m;
        let mut total: Option<GlideResult> = None;
        for index in first..=last.min(self.points.len().checked_sub(1)?) {
            let to = self.points[index].target_location();
            let leg = glide::solve(
                polar,
                &GlideState::new(
                    from.vector_to(&to),
                    altitude,
                    self.min_arrival_altitude(index, behaviour),
                    state.wind,
                ),
            );
            altitude = leg.arrival_altitude_now();
            from = to;
            match total.as_mut() {
                Some(total) => total.add(&leg),
                None => total = Some(leg),
            }
        }
        total
    }

    /// Glide solution from the aircraft through every remaining target.
    pub fn solve_remaining(
        &self,
        state: &AircraftState,
        polar: &GlidePolar,
        behaviour: &TaskBehaviour,
    ) -> Option<GlideResult> {
        if self.is_finished() {
            return None;
        }
        self.solve_range(self.active, usize::MAX, state, polar, behaviour)
    }

    /// Glide solution from the aircraft to the active point only.
    pub fn solve_current_leg(
        &self,
        state: &AircraftState,
        polar: &GlidePolar,
        behaviour: &TaskBehaviour,
    ) -> Option<GlideResult> {
        if self.is_finished() {
            return None;
        }
        self.solve_range(self.active, self.active, state, polar, behaviour)
    }

    pub fn distance_nominal(&self) -> f64 {
        path_length(self.points.iter().map(TaskPoint::location))
    }

    pub fn distance_planned(&self) -> f64 {
        path_length(self.points.iter().map(TaskPoint::target_location))
    }

    /// Shortest path through the zone boundaries.
    pub fn distance_min(&self) -> f64 {
        let layers: Vec<&SearchPointVector> = self.points.iter().map(TaskPoint::boundary).collect();
        layered_distance(&layers, false)
    }

    /// Longest path through the zone boundaries.
    pub fn distance_max(&self) -> f64 {
        let layers: Vec<&SearchPointVector> = self.points.iter().map(TaskPoint::boundary).collect();
        layered_distance(&layers, true)
    }

    /// Best distance achieved so far through the achieved points' search
    /// polygons and, while still flying, the aircraft's position.
    pub fn distance_scored(&self, state: &AircraftState) -> f64 {
        if !self.is_started() {
            return 0.0;
        }
        let achieved = self
            .points
            .iter()
            .take_while(|point| point.has_entered())
            .count();
        let aircraft = SearchPointVector::single(state.location, &self.projection);
        let mut layers: Vec<&SearchPointVector> = self.points[..achieved]
            .iter()
            .map(TaskPoint::search_points)
            .collect();
        if !self.is_finished() {
            layers.push(&aircraft);
        }
        layered_distance(&layers, true)
    }

    /// Distance from the aircraft through every remaining target.
    pub fn distance_remaining(&self, state: &AircraftState) -> f64 {
        if self.is_finished() {
            return 0.0;
        }
        let remaining = self.points[self.active.min(self.points.len())..]
            .iter()
            .map(TaskPoint::target_location);
        path_length(std::iter::once(state.location).chain(remaining))
    }

    pub fn compute_stats(
        &self,
        state: &AircraftState,
        polar: &GlidePolar,
        behaviour: &TaskBehaviour,
    ) -> TaskStats {
        let now = self.finish_time_s.unwrap_or(state.time_s);
        let elapsed = self.start_time_s.map_or(0.0, |start| (now - start).max(0.0));

        let mut total = ElementStat {
            solution_remaining: self
                .solve_remaining(state, polar, behaviour)
                .unwrap_or_default(),
            distance_remaining_m: self.distance_remaining(state),
            distance_travelled_m: self.distance_scored(state),
            time_elapsed_s: elapsed,
            ..ElementStat::default()
        };
        total.distance_planned_m = total.distance_travelled_m + total.distance_remaining_m;
        total.finish_timing();

        let mut current_leg = ElementStat::default();
        if let Some(point) = self.active_point().filter(|_| !self.is_finished()) {
            let leg_origin = self
                .active
                .checked_sub(1)
                .and_then(|i| self.points.get(i))
                .map_or(state.location, TaskPoint::target_location);
            let leg_started = self
                .active
                .checked_sub(1)
                .and_then(|i| self.points.get(i))
                .and_then(|p| p.transition().exited_at_s.or(p.transition().entered_at_s));
            current_leg.solution_remaining = self
                .solve_current_leg(state, polar, behaviour)
                .unwrap_or_default();
            current_leg.distance_remaining_m = state.location.distance(&point.target_location());
            current_leg.distance_planned_m = leg_origin.distance(&point.target_location());
            current_leg.distance_travelled_m =
                (current_leg.distance_planned_m - current_leg.distance_remaining_m).max(0.0);
            current_leg.time_elapsed_s = leg_started.map_or(0.0, |t| (state.time_s - t).max(0.0));
            current_leg.finish_timing();
        }

        let aat_time_remaining_s = (self.has_area_points() && self.settings.aat_min_time_s > 0.0)
            .then(|| (self.settings.aat_min_time_s - elapsed).max(0.0));

        TaskStats {
            active_index: self.active,
            task_started: self.is_started(),
            task_finished: self.is_finished(),
            start_time_s: self.start_time_s,
            finish_time_s: self.finish_time_s,
            final_glide: !self.is_finished() && total.solution_remaining.is_final_glide(),
            total,
            current_leg,
            distances: DistanceStat {
                nominal_m: self.distance_nominal(),
                min_m: self.distance_min(),
                max_m: self.distance_max(),
                planned_m: self.distance_planned(),
                scored_m: total.distance_travelled_m,
            },
            aat_time_remaining_s,
        }
    }
}

fn path_length(locations: impl IntoIterator<Item = GeoPoint>) -> f64 {
    let mut total = 0.0;
    let mut previous: Option<GeoPoint> = None;
    for location in locations {
        if let Some(previous) = previous {
            total += previous.distance(&location);
        }
        previous = Some(location);
    }
    total
}

/// Shortest or longest path visiting one point of each layer in order.
fn layered_distance(layers: &[&SearchPointVector], maximise: bool) -> f64 {
    let mut layers = layers.iter().filter(|layer| !layer.is_empty());
    let Some(first) = layers.next() else {
        return 0.0;
    };
    let mut best: Vec<(GeoPoint, f64)> = first.iter().map(|p| (p.location, 0.0)).collect();
    for layer in layers {
        best = layer
            .iter()
            .map(|point| {
                let candidates = best
                    .iter()
                    .map(|(location, distance)| distance + location.distance(&point.location));
                let value = if maximise {
                    candidates.fold(f64::MIN, f64::max)
                } else {
                    candidates.fold(f64::MAX, f64::min)
                };
                (point.location, value)
            })
            .collect();
    }
    let finals = best.iter().map(|(_, distance)| *distance);
    if maximise {
        finals.fold(0.0, f64::max)
    } else {
        finals.fold(f64::MAX, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::TaskPointFactoryType;
    use crate::point::ScoringPolicy;
    use crate::state::Waypoint;
    use crate::zone::ObservationZone;

    fn origin() -> GeoPoint {
        GeoPoint::new(46.0, 7.0)
    }

    fn point(kind: PointKind, name: &str, location: GeoPoint, zone: ObservationZone) -> TaskPoint {
        let factory_type = match kind {
            PointKind::Start => TaskPointFactoryType::StartCylinder,
            PointKind::Turnpoint => TaskPointFactoryType::AstCylinder,
            PointKind::Area(_) => TaskPointFactoryType::AatCylinder,
            PointKind::Finish { .. } => TaskPointFactoryType::FinishCylinder,
        };
        TaskPoint::new(
            factory_type,
            Waypoint::new(name, location, 400.0),
            zone,
            kind,
            ScoringPolicy::for_kind(&kind, false),
        )
    }

    /// Start and finish at the origin, one turnpoint 30 km north.
    fn out_and_return() -> OrderedTask {
        let home = origin();
        let tp = home.offset(30_000.0, 0.0);
        OrderedTask::from_points(
            TaskFactoryType::Racing,
            OrderedTaskSettings::default(),
            vec![
                point(PointKind::Start, "Home", home, ObservationZone::cylinder(home, 2_000.0)),
                point(PointKind::Turnpoint, "North", tp, ObservationZone::cylinder(tp, 500.0)),
                point(
                    PointKind::Finish {
                        fai_finish_height_m: 0.0,
                    },
                    "Home",
                    home,
                    ObservationZone::cylinder(home, 1_000.0),
                ),
            ],
        )
    }

    fn fix(location: GeoPoint, altitude_m: f64, time_s: f64) -> AircraftState {
        AircraftState::new(location, altitude_m, time_s).with_velocity(30.0, 0.0)
    }

    #[test]
    fn start_needs_an_exit_and_restarts_on_reentry() {
        let mut task = out_and_return();
        let behaviour = TaskBehaviour::default();
        let home = origin();

        assert!(task.check_transitions(&fix(home, 1_500.0, 0.0), &behaviour).is_empty());
        let events = task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_500.0, 60.0), &behaviour);
        assert!(matches!(events.as_slice(), [TaskEvent::Started { time_s, .. }] if *time_s == 60.0));
        assert_eq!(task.active_index(), 1);

        let events = task.check_transitions(&fix(home.offset(500.0, 0.0), 1_500.0, 120.0), &behaviour);
        assert!(matches!(events.as_slice(), [TaskEvent::StartRearmed { .. }]));
        assert_eq!(task.active_index(), 0);
        assert!(!task.is_started());

        let events = task.check_transitions(&fix(home.offset(2_500.0, 0.0), 1_500.0, 180.0), &behaviour);
        assert!(matches!(events.as_slice(), [TaskEvent::Started { time_s, .. }] if *time_s == 180.0));
    }

    #[test]
    fn start_above_height_limit_is_ignored() {
        let mut task = out_and_return();
        let mut settings = *task.settings();
        settings.start.max_height_m = Some(1_000.0);
        task.set_settings(settings);
        let behaviour = TaskBehaviour::default();
        let home = origin();

        task.check_transitions(&fix(home, 1_500.0, 0.0), &behaviour);
        let events = task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_500.0, 60.0), &behaviour);
        assert!(events.is_empty());
        assert!(!task.is_started());

        let margin = TaskBehaviour {
            start_max_height_margin_m: 600.0,
            ..TaskBehaviour::default()
        };
        task.check_transitions(&fix(home, 1_500.0, 120.0), &margin);
        let events = task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_500.0, 180.0), &margin);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn turnpoints_are_taken_in_order() {
        let mut task = out_and_return();
        let behaviour = TaskBehaviour::default();
        let home = origin();
        let north = home.offset(30_000.0, 0.0);

        task.check_transitions(&fix(home, 1_500.0, 0.0), &behaviour);
        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_500.0, 60.0), &behaviour);
        assert!(!task.points()[2].has_entered());

        task.check_transitions(&fix(north.offset(2_000.0, 180.0), 1_500.0, 900.0), &behaviour);
        let events = task.check_transitions(&fix(north, 1_400.0, 960.0), &behaviour);
        assert!(matches!(events.as_slice(), [TaskEvent::TurnpointEntered { index: 1, .. }]));
        assert_eq!(task.active_index(), 2);

        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 800.0, 1_800.0), &behaviour);
        let events = task.check_transitions(&fix(home, 700.0, 1_860.0), &behaviour);
        assert!(matches!(events.as_slice(), [TaskEvent::Finished { .. }]));
        assert!(task.is_finished());
        assert!(task.points().iter().all(TaskPoint::has_entered));
    }

    #[test]
    fn finish_requires_fai_height_on_both_fixes() {
        let mut task = out_and_return();
        let mut settings = *task.settings();
        settings.finish.fai_finish = true;
        task.set_settings(settings);
        let behaviour = TaskBehaviour::default();
        let home = origin();
        let north = home.offset(30_000.0, 0.0);

        task.check_transitions(&fix(home, 2_000.0, 0.0), &behaviour);
        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 2_000.0, 60.0), &behaviour);
        assert_eq!(task.points()[2].fai_finish_height(), Some(1_000.0));
        task.check_transitions(&fix(north.offset(2_000.0, 180.0), 1_500.0, 900.0), &behaviour);
        task.check_transitions(&fix(north, 1_500.0, 960.0), &behaviour);

        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 900.0, 1_800.0), &behaviour);
        task.check_transitions(&fix(home, 900.0, 1_860.0), &behaviour);
        assert!(!task.is_finished());

        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_100.0, 1_900.0), &behaviour);
        task.check_transitions(&fix(home, 1_100.0, 1_960.0), &behaviour);
        assert!(task.is_finished());
    }

    #[test]
    fn reset_returns_to_start() {
        let mut task = out_and_return();
        let behaviour = TaskBehaviour::default();
        let home = origin();
        task.check_transitions(&fix(home, 1_500.0, 0.0), &behaviour);
        task.check_transitions(&fix(home.offset(3_000.0, 0.0), 1_500.0, 60.0), &behaviour);
        assert!(task.is_started());

        task.reset();
        assert_eq!(task.active_index(), 0);
        assert!(!task.is_started());
        assert!(task.points().iter().all(|p| !p.has_entered()));
        // the last fix (3 km out) is outside every zone
        assert!(task.points().iter().all(|p| p.sampled().is_empty()));
    }

    #[test]
    fn transitions_are_idempotent_for_repeated_fix() {
        let mut task = out_and_return();
        let behaviour = TaskBehaviour::default();
        let state = fix(origin(), 1_500.0, 0.0);
        task.check_transitions(&state, &behaviour);
        assert!(task.check_transitions(&state, &behaviour).is_empty());
        task.update_samples(&state);
        assert!(!task.update_samples(&state));
    }

    #[test]
    fn distances_are_ordered() {
        let task = out_and_return();
        let nominal = task.distance_nominal();
        assert!((nominal - 60_000.0).abs() < 10.0);
        assert!(task.distance_min() < nominal);
        // turnpoints are scored at their reference, so the maximum only
        // grows through the start and finish boundaries
        assert!(task.distance_max() > nominal);
        assert!((task.distance_planned() - nominal).abs() < 1e-6);
    }

    #[test]
    fn remaining_solution_covers_every_leg() {
        let task = out_and_return();
        let polar = GlidePolar::new(Default::default(), 1.5);
        let behaviour = TaskBehaviour::default();
        let state = fix(origin(), 1_500.0, 0.0);
        let solution = task
            .solve_remaining(&state, &polar, &behaviour)
            .expect("solution");
        assert!((solution.vector.distance - 60_000.0).abs() < 10.0);
        assert!(solution.is_ok());
        assert!(solution.min_arrival_altitude_m >= 700.0 - 1e-9);
    }

    #[test]
    fn editing_recomputes_geometry() {
        let mut task = out_and_return();
        let before = task.distance_nominal();
        let east = origin().offset(20_000.0, 90.0);
        task.insert(
            2,
            point(PointKind::Turnpoint, "East", east, ObservationZone::cylinder(east, 500.0)),
        )
        .expect("insert");
        assert_eq!(task.len(), 4);
        assert!(task.distance_nominal() > before);
        assert!(matches!(
            task.remove(9),
            Err(TaskError::IndexOutOfRange { index: 9, len: 4 })
        ));
    }
}
