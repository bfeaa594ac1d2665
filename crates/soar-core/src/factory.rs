//! Task factories.
//!
//! A factory knows which point types a ruleset allows at each position, how
//! to build points with sensible default zones, how to mutate an illegal type
//! into a legal one and how to validate a finished task.

use crate::behaviour::OrderedTaskSettings;
use crate::error::TaskError;
use crate::geo::GeoPoint;
use crate::point::{AreaTarget, PointKind, ScoringPolicy, TaskPoint};
use crate::state::Waypoint;
use crate::task::OrderedTask;
use crate::zone::{ObservationZone, ZoneShape};
use serde::{Deserialize, Serialize};

/// Start and finish closer than this make a closed task.
const CLOSED_TASK_TOLERANCE_M: f64 = 1_000.0;
/// Shortest leg of an FAI triangle as a fraction of the total.
const FAI_TRIANGLE_MIN_LEG_RATIO: f64 = 0.28;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFactoryType {
    #[default]
    FaiGeneral,
    Racing,
    Aat,
    Touring,
}

impl TaskFactoryType {
    pub const ALL: [TaskFactoryType; 4] = [
        TaskFactoryType::FaiGeneral,
        TaskFactoryType::Racing,
        TaskFactoryType::Aat,
        TaskFactoryType::Touring,
    ];

    pub fn factory(self) -> TaskFactory {
        TaskFactory::new(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPointFactoryType {
    StartLine,
    StartCylinder,
    StartSector,
    FaiSector,
    AstCylinder,
    AatCylinder,
    AatSegment,
    AatAnnularSector,
    FinishLine,
    FinishCylinder,
    FinishSector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZoneFamily {
    Line,
    Cylinder,
    Sector,
}

impl TaskPointFactoryType {
    pub const ALL: [TaskPointFactoryType; 11] = [
        TaskPointFactoryType::StartLine,
        TaskPointFactoryType::StartCylinder,
        TaskPointFactoryType::StartSector,
        TaskPointFactoryType::FaiSector,
        TaskPointFactoryType::AstCylinder,
        TaskPointFactoryType::AatCylinder,
        TaskPointFactoryType::AatSegment,
        TaskPointFactoryType::AatAnnularSector,
        TaskPointFactoryType::FinishLine,
        TaskPointFactoryType::FinishCylinder,
        TaskPointFactoryType::FinishSector,
    ];

    fn family(self) -> ZoneFamily {
        use TaskPointFactoryType::*;
        match self {
            StartLine | FinishLine => ZoneFamily::Line,
            StartCylinder | AstCylinder | AatCylinder | FinishCylinder => ZoneFamily::Cylinder,
            StartSector | FaiSector | AatSegment | AatAnnularSector | FinishSector => {
                ZoneFamily::Sector
            }
        }
    }

    pub fn is_area(self) -> bool {
        matches!(
            self,
            TaskPointFactoryType::AatCylinder
                | TaskPointFactoryType::AatSegment
                | TaskPointFactoryType::AatAnnularSector
        )
    }

    pub fn default_shape(self) -> ZoneShape {
        use TaskPointFactoryType::*;
        match self {
            StartLine | FinishLine => ZoneShape::Line { length_m: 1_000.0 },
            StartCylinder | FinishCylinder => ZoneShape::Cylinder { radius_m: 1_000.0 },
            StartSector | FinishSector => ZoneShape::SymmetricSector {
                radius_m: 1_000.0,
                sector_angle: 90.0,
            },
            FaiSector => ZoneShape::SymmetricSector {
                radius_m: 10_000.0,
                sector_angle: 90.0,
            },
            AstCylinder => ZoneShape::Cylinder { radius_m: 500.0 },
            AatCylinder => ZoneShape::Cylinder { radius_m: 10_000.0 },
            AatSegment => ZoneShape::Sector {
                radius_m: 10_000.0,
                start_radial: 315.0,
                end_radial: 45.0,
            },
            AatAnnularSector => ZoneShape::AnnularSector {
                radius_m: 10_000.0,
                inner_radius_m: 5_000.0,
                start_radial: 0.0,
                end_radial: 0.0,
            },
        }
    }
}

/// Where in the task a point sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointPosition {
    Start,
    Intermediate,
    Finish,
}

impl PointPosition {
    pub fn of(index: usize, len: usize) -> Self {
        if index == 0 {
            PointPosition::Start
        } else if index + 1 >= len {
            PointPosition::Finish
        } else {
            PointPosition::Intermediate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConstraints {
    pub min_points: usize,
    pub max_points: usize,
    /// Start is scored on its zone boundary rather than where it was crossed
    pub start_boundary_scored: bool,
    pub fai_finish: bool,
    pub check_fai_triangle: bool,
    pub unique_turnpoints: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    EmptyTask,
    NoValidStart,
    NoValidFinish,
    UnderMinTurnpoints {
        count: usize,
        min: usize,
    },
    ExceedsMaxTurnpoints {
        count: usize,
        max: usize,
    },
    IncorrectPointType {
        index: usize,
        point_type: TaskPointFactoryType,
    },
    TurnpointsNotUnique {
        index: usize,
    },
    InvalidFaiTriangle {
        shortest_leg_ratio: f64,
    },
}

impl ValidationError {
    /// Advisory problems that do not block flying the task.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            ValidationError::TurnpointsNotUnique { .. } | ValidationError::InvalidFaiTriangle { .. }
        )
    }
}

/// True if any entry blocks the task.
pub fn has_blocking_errors(errors: &[ValidationError]) -> bool {
    errors.iter().any(|error| !error.is_warning())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskFactory {
    ruleset: TaskFactoryType,
    constraints: FactoryConstraints,
    start_types: &'static [TaskPointFactoryType],
    intermediate_types: &'static [TaskPointFactoryType],
    finish_types: &'static [TaskPointFactoryType],
}

impl TaskFactory {
    pub fn new(ruleset: TaskFactoryType) -> Self {
        use TaskPointFactoryType::*;
        match ruleset {
            TaskFactoryType::FaiGeneral => Self {
                ruleset,
                constraints: FactoryConstraints {
                    min_points: 2,
                    max_points: 13,
                    start_boundary_scored: false,
                    fai_finish: true,
                    check_fai_triangle: true,
                    unique_turnpoints: true,
                },
                start_types: &[StartSector, StartLine],
                intermediate_types: &[FaiSector, AstCylinder],
                finish_types: &[FinishSector, FinishLine],
            },
            TaskFactoryType::Racing => Self {
                ruleset,
                constraints: FactoryConstraints {
                    min_points: 2,
                    max_points: 13,
                    start_boundary_scored: false,
                    fai_finish: false,
                    check_fai_triangle: false,
                    unique_turnpoints: true,
                },
                start_types: &[StartLine, StartCylinder, StartSector],
                intermediate_types: &[AstCylinder, FaiSector],
                finish_types: &[FinishLine, FinishCylinder, FinishSector],
            },
            TaskFactoryType::Aat => Self {
                ruleset,
                constraints: FactoryConstraints {
                    min_points: 2,
                    max_points: 13,
                    start_boundary_scored: false,
                    fai_finish: false,
                    check_fai_triangle: false,
                    unique_turnpoints: true,
                },
                start_types: &[StartLine, StartCylinder, StartSector],
                intermediate_types: &[AatCylinder, AatSegment, AatAnnularSector, AstCylinder],
                finish_types: &[FinishLine, FinishCylinder, FinishSector],
            },
            TaskFactoryType::Touring => Self {
                ruleset,
                constraints: FactoryConstraints {
                    min_points: 2,
                    max_points: 10,
                    start_boundary_scored: true,
                    fai_finish: false,
                    check_fai_triangle: false,
                    unique_turnpoints: false,
                },
                start_types: &[StartCylinder, StartLine],
                intermediate_types: &[AstCylinder],
                finish_types: &[FinishCylinder, FinishLine],
            },
        }
    }

    pub fn ruleset(&self) -> TaskFactoryType {
        self.ruleset
    }

    pub fn constraints(&self) -> &FactoryConstraints {
        &self.constraints
    }

    pub fn legal_types(&self, position: PointPosition) -> &'static [TaskPointFactoryType] {
        match position {
            PointPosition::Start => self.start_types,
            PointPosition::Intermediate => self.intermediate_types,
            PointPosition::Finish => self.finish_types,
        }
    }

    pub fn is_valid_type(&self, point_type: TaskPointFactoryType, position: PointPosition) -> bool {
        self.legal_types(position).contains(&point_type)
    }

    /// Closest legal type for `position`: the type itself if legal, else the
    /// first legal type with the same zone family, else the first legal type.
    pub fn mutated_point_type(
        &self,
        point_type: TaskPointFactoryType,
        position: PointPosition,
    ) -> TaskPointFactoryType {
        let legal = self.legal_types(position);
        if legal.contains(&point_type) {
            return point_type;
        }
        legal
            .iter()
            .copied()
            .find(|candidate| candidate.family() == point_type.family())
            .or_else(|| legal.first().copied())
            .unwrap_or(point_type)
    }

    pub fn default_settings(&self) -> OrderedTaskSettings {
        let mut settings = OrderedTaskSettings::default();
        settings.finish.fai_finish = self.constraints.fai_finish;
        settings
    }

    pub fn create_point(
        &self,
        point_type: TaskPointFactoryType,
        waypoint: Waypoint,
        position: PointPosition,
    ) -> TaskPoint {
        let shape = point_type.default_shape();
        self.create_point_with_shape(point_type, waypoint, shape, position)
    }

    pub fn create_point_with_shape(
        &self,
        point_type: TaskPointFactoryType,
        waypoint: Waypoint,
        shape: ZoneShape,
        position: PointPosition,
    ) -> TaskPoint {
        let zone = ObservationZone::new(waypoint.location, shape);
        let kind = match position {
            PointPosition::Start => PointKind::Start,
            PointPosition::Finish => PointKind::Finish {
                fai_finish_height_m: 0.0,
            },
            PointPosition::Intermediate if point_type.is_area() => PointKind::Area(AreaTarget {
                location: waypoint.location,
                locked: false,
            }),
            PointPosition::Intermediate => PointKind::Turnpoint,
        };
        let policy = ScoringPolicy::for_kind(&kind, self.constraints.start_boundary_scored);
        TaskPoint::new(point_type, waypoint, zone, kind, policy)
    }

    /// Build a task from its definition. Point types must be legal for their
    /// positions; validation of the whole task is left to [`Self::validate`].
    pub fn build(&self, definition: &TaskDefinition) -> Result<OrderedTask, TaskError> {
        if definition.points.is_empty() {
            return Err(TaskError::EmptyTask);
        }
        let len = definition.points.len();
        let mut points = Vec::with_capacity(len);
        for (index, point) in definition.points.iter().enumerate() {
            let position = PointPosition::of(index, len);
            if !self.is_valid_type(point.point_type, position) {
                return Err(TaskError::IllegalPointType {
                    ruleset: self.ruleset,
                    point_type: point.point_type,
                    position,
                });
            }
            let shape = point
                .zone
                .unwrap_or_else(|| point.point_type.default_shape());
            if !shape.is_valid() {
                return Err(TaskError::InvalidZone(index));
            }
            points.push(self.create_point_with_shape(
                point.point_type,
                point.waypoint.clone(),
                shape,
                position,
            ));
        }

        let settings = definition
            .settings
            .unwrap_or_else(|| self.default_settings());
        let mut task = OrderedTask::from_points(self.ruleset, settings, points);
        for (index, point) in definition.points.iter().enumerate() {
            if let Some(target) = point.target {
                task.set_target(index, target)?;
            }
            if point.locked {
                task.set_target_locked(index, true)?;
            }
        }
        Ok(task)
    }

    /// Copy of `task` with every point mutated to a type legal under this
    /// ruleset. Zones are kept where the type did not change.
    pub fn conform_task(&self, task: &OrderedTask) -> OrderedTask {
        let len = task.len();
        let points = task
            .points()
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let position = PointPosition::of(index, len);
                let point_type = self.mutated_point_type(point.factory_type(), position);
                let shape = if point_type == point.factory_type() {
                    *point.zone().shape()
                } else {
                    point_type.default_shape()
                };
                let mut conformed =
                    self.create_point_with_shape(point_type, point.waypoint().clone(), shape, position);
                // targets outside the conformed zone fall back to the reference
                if let Some(target) = point.area_target() {
                    if conformed.set_target(target.location) {
                        conformed.set_target_locked(target.locked);
                    }
                }
                conformed
            })
            .collect();

        let mut settings = *task.settings();
        settings.finish.fai_finish |= self.constraints.fai_finish;
        OrderedTask::from_points(self.ruleset, settings, points)
    }

    /// Collect every structural problem. Entries with
    /// [`ValidationError::is_warning`] do not block the task.
    pub fn validate(&self, task: &OrderedTask) -> Vec<ValidationError> {
        let points = task.points();
        if points.is_empty() {
            return vec![ValidationError::EmptyTask];
        }
        let mut errors = Vec::new();
        let len = points.len();

        if !points[0].is_start() || !self.is_valid_type(points[0].factory_type(), PointPosition::Start)
        {
            errors.push(ValidationError::NoValidStart);
        }
        let last = &points[len - 1];
        if len < 2
            || !last.is_finish()
            || !self.is_valid_type(last.factory_type(), PointPosition::Finish)
        {
            errors.push(ValidationError::NoValidFinish);
        }
        for (index, point) in points.iter().enumerate().take(len.saturating_sub(1)).skip(1) {
            if !self.is_valid_type(point.factory_type(), PointPosition::Intermediate) {
                errors.push(ValidationError::IncorrectPointType {
                    index,
                    point_type: point.factory_type(),
                });
            }
        }

        if len < self.constraints.min_points {
            errors.push(ValidationError::UnderMinTurnpoints {
                count: len,
                min: self.constraints.min_points,
            });
        }
        if len > self.constraints.max_points {
            errors.push(ValidationError::ExceedsMaxTurnpoints {
                count: len,
                max: self.constraints.max_points,
            });
        }

        if self.constraints.unique_turnpoints {
            if let Some(index) = first_repeated_turnpoint(points) {
                errors.push(ValidationError::TurnpointsNotUnique { index });
            }
        }

        if self.constraints.check_fai_triangle {
            if let Some(ratio) = fai_triangle_shortest_leg_ratio(points) {
                if ratio < FAI_TRIANGLE_MIN_LEG_RATIO {
                    errors.push(ValidationError::InvalidFaiTriangle {
                        shortest_leg_ratio: ratio,
                    });
                }
            }
        }
        errors
    }
}

/// Index of the first point repeating the previous point or an earlier
/// intermediate turnpoint.
fn first_repeated_turnpoint(points: &[TaskPoint]) -> Option<usize> {
    let len = points.len();
    for index in 1..len {
        let location = points[index].location();
        if points[index - 1].location() == location {
            return Some(index);
        }
        if index + 1 < len
            && points[1..index]
                .iter()
                .any(|earlier| earlier.location() == location)
        {
            return Some(index);
        }
    }
    None
}

/// Shortest leg over total distance for a closed task with three legs.
fn fai_triangle_shortest_leg_ratio(points: &[TaskPoint]) -> Option<f64> {
    if points.len() != 4 {
        return None;
    }
    let start = points[0].location();
    let finish = points[3].location();
    if start.distance(&finish) > CLOSED_TASK_TOLERANCE_M {
        return None;
    }
    let corners = [start, points[1].location(), points[2].location()];
    let legs = [
        corners[0].distance(&corners[1]),
        corners[1].distance(&corners[2]),
        corners[2].distance(&corners[0]),
    ];
    let total: f64 = legs.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let shortest = legs.iter().copied().fold(f64::MAX, f64::min);
    Some(shortest / total)
}

/// One point of a serialised task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDefinition {
    pub waypoint: Waypoint,
    pub point_type: TaskPointFactoryType,
    /// Zone override; the type's default zone otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneShape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<GeoPoint>,
    #[serde(default)]
    pub locked: bool,
}

/// Serialisable task description built into an [`OrderedTask`] by a factory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    #[serde(default)]
    pub ruleset: TaskFactoryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<OrderedTaskSettings>,
    pub points: Vec<PointDefinition>,
}

impl TaskDefinition {
    pub fn from_json(json: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TaskError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_task(task: &OrderedTask) -> Self {
        Self {
            ruleset: task.factory_type(),
            settings: Some(*task.settings()),
            points: task
                .points()
                .iter()
                .map(|point| PointDefinition {
                    waypoint: point.waypoint().clone(),
                    point_type: point.factory_type(),
                    zone: Some(*point.zone().shape()),
                    target: point.area_target().map(|target| target.location),
                    locked: point.is_target_locked(),
                })
                .collect(),
        }
    }

    pub fn build(&self) -> Result<OrderedTask, TaskError> {
        self.ruleset.factory().build(self)
    }
}
