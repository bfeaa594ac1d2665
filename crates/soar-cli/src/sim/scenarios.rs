//! Built-in demo tasks.

use clap::ValueEnum;
use soar_core::{
    GeoPoint, OrderedTaskSettings, PointDefinition, TaskDefinition, TaskFactoryType,
    TaskPointFactoryType, Waypoint, ZoneShape,
};

/// Home airfield of the demo tasks.
pub const DEMO_HOME: GeoPoint = GeoPoint::new(47.25, 8.5);
const DEMO_ELEVATION_M: f64 = 420.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// FAI triangle with sector turnpoints
    Triangle,
    /// Two-area AAT with a two and a half hour minimum time
    Aat,
}

impl Demo {
    pub fn definition(self) -> TaskDefinition {
        match self {
            Demo::Triangle => triangle(),
            Demo::Aat => aat(),
        }
    }
}

fn point(
    name: &str,
    location: GeoPoint,
    point_type: TaskPointFactoryType,
    zone: Option<ZoneShape>,
) -> PointDefinition {
    PointDefinition {
        waypoint: Waypoint::new(name, location, DEMO_ELEVATION_M),
        point_type,
        zone,
        target: None,
        locked: false,
    }
}

fn triangle() -> TaskDefinition {
    use TaskPointFactoryType::*;
    TaskDefinition {
        ruleset: TaskFactoryType::FaiGeneral,
        settings: None,
        points: vec![
            point("Home", DEMO_HOME, StartLine, None),
            point("West", DEMO_HOME.offset(35_000.0, 330.0), FaiSector, None),
            point("East", DEMO_HOME.offset(35_000.0, 30.0), FaiSector, None),
            point("Home", DEMO_HOME, FinishLine, None),
        ],
    }
}

fn aat() -> TaskDefinition {
    use TaskPointFactoryType::*;
    let area = Some(ZoneShape::Cylinder { radius_m: 15_000.0 });
    TaskDefinition {
        ruleset: TaskFactoryType::Aat,
        settings: Some(OrderedTaskSettings {
            aat_min_time_s: 2.5 * 3_600.0,
            ..OrderedTaskSettings::default()
        }),
        points: vec![
            point("Home", DEMO_HOME, StartCylinder, None),
            point("North", DEMO_HOME.offset(50_000.0, 0.0), AatCylinder, area),
            point("SouthWest", DEMO_HOME.offset(50_000.0, 240.0), AatCylinder, area),
            point("Home", DEMO_HOME, FinishCylinder, None),
        ],
    }
}
