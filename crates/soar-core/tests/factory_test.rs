//! Task definitions loaded from JSON, built, validated and conformed.

use soar_core::{
    GeoPoint, TaskDefinition, TaskError, TaskFactoryType, TaskManager, TaskPointFactoryType,
    ValidationError, ZoneShape,
};

fn point_json(name: &str, location: GeoPoint, point_type: &str, zone: Option<&str>) -> String {
    let zone = zone.map(|z| format!(r#", "zone": {z}"#)).unwrap_or_default();
    format!(
        r#"{{
            "waypoint": {{
                "name": "{name}",
                "location": {{ "lat": {}, "lon": {} }},
                "elevation_m": 450.0
            }},
            "point_type": "{point_type}"{zone}
        }}"#,
        location.lat, location.lon
    )
}

fn task_json(ruleset: &str, points: &[String]) -> String {
    format!(
        r#"{{ "ruleset": "{ruleset}", "points": [{}] }}"#,
        points.join(",")
    )
}

fn home() -> GeoPoint {
    GeoPoint::new(47.0, 8.0)
}

#[test]
fn test_fai_triangle_from_json() {
    let json = task_json(
        "fai_general",
        &[
            point_json("Home", home(), "start_line", None),
            point_json("North", home().offset(40_000.0, 0.0), "fai_sector", None),
            point_json(
                "East",
                home().offset(40_000.0, 60.0),
                "ast_cylinder",
                Some(r#"{ "shape": "cylinder", "radius_m": 3000.0 }"#),
            ),
            point_json("Home", home(), "finish_line", None),
        ],
    );
    let definition = TaskDefinition::from_json(&json).expect("parse");
    assert_eq!(definition.settings, None);

    let task = definition.build().expect("build");
    assert_eq!(task.len(), 4);
    assert!(task.settings().finish.fai_finish);
    assert_eq!(task.points()[2].zone().radius(), 3_000.0);
    assert!(TaskFactoryType::FaiGeneral.factory().validate(&task).is_empty());

    let nominal = task.distance_nominal();
    assert!((nominal - 120_000.0).abs() < 500.0, "nominal {nominal}");
    assert!(task.distance_min() < nominal);
    assert!(task.distance_max() > nominal);

    let saved = TaskDefinition::from_task(&task);
    assert_eq!(
        saved.points[2].zone,
        Some(ZoneShape::Cylinder { radius_m: 3_000.0 })
    );
}

#[test]
fn test_narrow_triangle_is_only_a_warning() {
    let json = task_json(
        "fai_general",
        &[
            point_json("Home", home(), "start_sector", None),
            point_json("Far", home().offset(50_000.0, 0.0), "fai_sector", None),
            point_json("Near", home().offset(52_000.0, 10.0), "fai_sector", None),
            point_json("Home", home(), "finish_sector", None),
        ],
    );
    let task = TaskDefinition::from_json(&json)
        .and_then(|definition| definition.build())
        .expect("build");

    let mut manager = TaskManager::default();
    let warnings = manager.set_task(task).expect("warnings do not block");
    assert!(matches!(
        warnings.as_slice(),
        [ValidationError::InvalidFaiTriangle { shortest_leg_ratio }] if *shortest_leg_ratio < 0.28
    ));
    assert_eq!(manager.task().len(), 4);
}

#[test]
fn test_illegal_point_type_rejected_at_build() {
    let json = task_json(
        "racing",
        &[
            point_json("Home", home(), "start_cylinder", None),
            point_json("Area", home().offset(30_000.0, 0.0), "aat_cylinder", None),
            point_json("Home", home(), "finish_cylinder", None),
        ],
    );
    let result = TaskDefinition::from_json(&json).expect("parse").build();
    assert!(matches!(
        result,
        Err(TaskError::IllegalPointType {
            point_type: TaskPointFactoryType::AatCylinder,
            ..
        })
    ));

    let unknown = task_json(
        "racing",
        &[point_json("Home", home(), "start_balloon", None)],
    );
    assert!(matches!(
        TaskDefinition::from_json(&unknown),
        Err(TaskError::Definition(_))
    ));
}

#[test]
fn test_conform_aat_task_to_fai() {
    let json = task_json(
        "aat",
        &[
            point_json("Home", home(), "start_cylinder", None),
            point_json("North", home().offset(40_000.0, 0.0), "aat_segment", None),
            point_json("East", home().offset(40_000.0, 60.0), "aat_cylinder", None),
            point_json("Home", home(), "finish_cylinder", None),
        ],
    );
    let aat = TaskDefinition::from_json(&json)
        .expect("parse")
        .build()
        .expect("build");
    assert!(aat.has_area_points());

    let fai = TaskFactoryType::FaiGeneral.factory();
    assert!(!fai.validate(&aat).is_empty());

    let conformed = fai.conform_task(&aat);
    let types: Vec<TaskPointFactoryType> =
        conformed.points().iter().map(|p| p.factory_type()).collect();
    assert_eq!(
        types,
        vec![
            TaskPointFactoryType::StartSector,
            TaskPointFactoryType::FaiSector,
            TaskPointFactoryType::AstCylinder,
            TaskPointFactoryType::FinishSector,
        ]
    );
    assert!(!conformed.has_area_points());
    assert!(conformed.settings().finish.fai_finish);
    assert!(fai.validate(&conformed).is_empty());
}
