pub mod aat;
pub mod behaviour;
pub mod error;
pub mod factory;
pub mod geo;
pub mod glide;
pub mod isoline;
pub mod manager;
pub mod optimise;
pub mod point;
pub mod search;
pub mod state;
pub mod stats;
pub mod task;
pub mod zone;

pub use aat::{adjust_aat_range, optimise_target, optimise_targets, OptimisedTarget};
pub use behaviour::{
    FinishConstraints, HeightReference, OrderedTaskSettings, StartConstraints, TaskBehaviour,
};
pub use error::{OptimiseFailure, TaskError};
pub use factory::{
    has_blocking_errors, FactoryConstraints, PointDefinition, PointPosition, TaskDefinition,
    TaskFactory, TaskFactoryType, TaskPointFactoryType, ValidationError,
};
pub use geo::{haversine_distance, FlatGeoPoint, FlatPoint, FlatProjection, FlatRay, GeoPoint, GeoVector};
pub use glide::{GlidePolar, GlideResult, GlideState, GlideValidity, PolarCoefficients};
pub use manager::TaskManager;
pub use optimise::{find_zero, minimise, Minimum, TOLERANCE_OPT_TARGET};
pub use point::{AreaTarget, PointKind, ScoringPolicy, TaskPoint};
pub use search::{SearchPoint, SearchPointVector, MAX_SEARCH_POINTS};
pub use state::{AircraftState, Waypoint, Wind};
pub use stats::{DistanceStat, ElementStat, TaskStats};
pub use task::{OrderedTask, TaskEvent};
pub use zone::{ObservationZone, ZoneShape};
