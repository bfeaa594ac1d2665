//! Observation zone shapes.
//!
//! A zone is the airspace around a task point inside which the aircraft
//! counts as being "at" the point. Sector-like shapes whose orientation
//! depends on the course recompute their radials from the neighbouring legs.

use crate::geo::{
    angle_between, bisector, normalise_degrees, FlatProjection, FlatRay, GeoPoint,
};
use serde::{Deserialize, Serialize};

/// Arc resolution used when enumerating boundary points.
const ARC_STEP_DEG: f64 = 10.0;
/// Vertices used to approximate a full circle.
const CIRCLE_POINTS: usize = 36;
/// Locations closer than this to the reference are inside any sector.
const REFERENCE_SLOP_M: f64 = 1.0;

/// Shape parameters of an observation zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ZoneShape {
    Cylinder {
        radius_m: f64,
    },
    /// Sector with fixed radials.
    Sector {
        radius_m: f64,
        start_radial: f64,
        end_radial: f64,
    },
    /// Sector centred on the bisector of the adjoining legs.
    SymmetricSector {
        radius_m: f64,
        sector_angle: f64,
    },
    AnnularSector {
        radius_m: f64,
        inner_radius_m: f64,
        start_radial: f64,
        end_radial: f64,
    },
    /// Line perpendicular to the course, scored when crossed.
    Line {
        length_m: f64,
    },
}

impl ZoneShape {
    pub fn radius(&self) -> f64 {
        match *self {
            ZoneShape::Cylinder { radius_m }
            | ZoneShape::Sector { radius_m, .. }
            | ZoneShape::SymmetricSector { radius_m, .. }
            | ZoneShape::AnnularSector { radius_m, .. } => radius_m,
            ZoneShape::Line { length_m } => length_m / 2.0,
        }
    }

    /// Angular width of the zone in degrees.
    pub fn sector_angle(&self) -> f64 {
        match *self {
            ZoneShape::Cylinder { .. } => 360.0,
            ZoneShape::Sector {
                start_radial,
                end_radial,
                ..
            }
            | ZoneShape::AnnularSector {
                start_radial,
                end_radial,
                ..
            } => arc_width(start_radial, end_radial),
            ZoneShape::SymmetricSector { sector_angle, .. } => sector_angle,
            ZoneShape::Line { .. } => 180.0,
        }
    }

    /// Defining parameters, padded with zeros.
    fn parameters(&self) -> [f64; 4] {
        match *self {
            ZoneShape::Cylinder { radius_m } => [radius_m, 0.0, 0.0, 0.0],
            ZoneShape::Sector {
                radius_m,
                start_radial,
                end_radial,
            } => [radius_m, start_radial, end_radial, 0.0],
            ZoneShape::SymmetricSector {
                radius_m,
                sector_angle,
            } => [radius_m, sector_angle, 0.0, 0.0],
            ZoneShape::AnnularSector {
                radius_m,
                inner_radius_m,
                start_radial,
                end_radial,
            } => [radius_m, inner_radius_m, start_radial, end_radial],
            ZoneShape::Line { length_m } => [length_m, 0.0, 0.0, 0.0],
        }
    }

    /// Finite parameters with a positive size and, for annular sectors, an
    /// inner radius below the outer one.
    pub fn is_valid(&self) -> bool {
        let finite = self.parameters().iter().all(|v| v.is_finite());
        let sized = match *self {
            ZoneShape::AnnularSector {
                radius_m,
                inner_radius_m,
                ..
            } => inner_radius_m >= 0.0 && inner_radius_m < radius_m,
            ZoneShape::SymmetricSector { sector_angle, .. } => {
                sector_angle > 0.0 && sector_angle <= 360.0
            }
            _ => true,
        };
        finite && sized && self.radius() > 0.0
    }

    /// Whether the radials follow the course rather than being fixed.
    pub fn follows_legs(&self) -> bool {
        matches!(
            self,
            ZoneShape::SymmetricSector { .. } | ZoneShape::Line { .. }
        )
    }
}

/// Observation zone anchored at a reference point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObservationZone {
    reference: GeoPoint,
    shape: ZoneShape,
    start_radial: f64,
    end_radial: f64,
}

/// Equality compares the defining parameters only; radials derived from
/// neighbouring legs do not take part. Values compare by `total_cmp`, so
/// every zone equals itself.
impl PartialEq for ObservationZone {
    fn eq(&self, other: &Self) -> bool {
        let same = |a: f64, b: f64| a.total_cmp(&b).is_eq();
        same(self.reference.lat, other.reference.lat)
            && same(self.reference.lon, other.reference.lon)
            && std::mem::discriminant(&self.shape) == std::mem::discriminant(&other.shape)
            && self
                .shape
                .parameters()
                .iter()
                .zip(other.shape.parameters())
                .all(|(&a, b)| same(a, b))
    }
}

impl ObservationZone {
    pub fn new(reference: GeoPoint, shape: ZoneShape) -> Self {
        let (start_radial, end_radial) = match shape {
            ZoneShape::Sector {
                start_radial,
                end_radial,
                ..
            }
            | ZoneShape::AnnularSector {
                start_radial,
                end_radial,
                ..
            } => (normalise_degrees(start_radial), normalise_degrees(end_radial)),
            ZoneShape::SymmetricSector { sector_angle, .. } => {
                (normalise_degrees(-sector_angle / 2.0), normalise_degrees(sector_angle / 2.0))
            }
            ZoneShape::Line { .. } => (270.0, 90.0),
            ZoneShape::Cylinder { .. } => (0.0, 0.0),
        };
        Self {
            reference,
            shape,
            start_radial,
            end_radial,
        }
    }

    pub fn cylinder(reference: GeoPoint, radius_m: f64) -> Self {
        Self::new(reference, ZoneShape::Cylinder { radius_m })
    }

    pub fn symmetric_sector(reference: GeoPoint, radius_m: f64, sector_angle: f64) -> Self {
        Self::new(
            reference,
            ZoneShape::SymmetricSector {
                radius_m,
                sector_angle,
            },
        )
    }

    pub fn line(reference: GeoPoint, length_m: f64) -> Self {
        Self::new(reference, ZoneShape::Line { length_m })
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn shape(&self) -> &ZoneShape {
        &self.shape
    }

    pub fn radius(&self) -> f64 {
        self.shape.radius()
    }

    pub fn inner_radius(&self) -> f64 {
        match self.shape {
            ZoneShape::AnnularSector { inner_radius_m, .. } => inner_radius_m,
            _ => 0.0,
        }
    }

    pub fn start_radial(&self) -> f64 {
        self.start_radial
    }

    pub fn end_radial(&self) -> f64 {
        self.end_radial
    }

    pub fn sector_angle(&self) -> f64 {
        self.shape.sector_angle()
    }

    /// Copy of this zone moved to a new reference point.
    pub fn relocated(&self, reference: GeoPoint) -> Self {
        Self {
            reference,
            ..*self
        }
    }

    /// Recompute course-dependent radials from the neighbouring points.
    ///
    /// Must be called whenever this point or either neighbour moves.
    pub fn set_legs(&mut self, previous: Option<&GeoPoint>, next: Option<&GeoPoint>) {
        if !self.shape.follows_legs() {
            return;
        }
        let half_angle = self.shape.sector_angle() / 2.0;
        let centre = match (previous, next) {
            (Some(previous), Some(next)) => bisector(
                previous.bearing(&self.reference),
                self.reference.bearing(next),
            ),
            (Some(previous), None) => previous.bearing(&self.reference),
            (None, Some(next)) => next.bearing(&self.reference),
            (None, None) => 0.0,
        };
        self.start_radial = normalise_degrees(centre - half_angle);
        self.end_radial = normalise_degrees(centre + half_angle);
    }

    /// Direction the zone opens towards.
    pub fn bisector(&self) -> f64 {
        normalise_degrees(self.start_radial + arc_width(self.start_radial, self.end_radial) / 2.0)
    }

    pub fn is_inside(&self, location: &GeoPoint) -> bool {
        let distance = self.reference.distance(location);
        match self.shape {
            ZoneShape::Cylinder { radius_m } => distance <= radius_m,
            ZoneShape::AnnularSector {
                radius_m,
                inner_radius_m,
                ..
            } => {
                distance <= radius_m
                    && distance >= inner_radius_m
                    && self.in_radials(location, distance)
            }
            ZoneShape::Sector { .. } | ZoneShape::SymmetricSector { .. } | ZoneShape::Line { .. } => {
                distance <= self.radius() && self.in_radials(location, distance)
            }
        }
    }

    fn in_radials(&self, location: &GeoPoint, distance: f64) -> bool {
        if distance < REFERENCE_SLOP_M {
            return true;
        }
        angle_between(
            self.reference.bearing(location),
            self.start_radial,
            self.end_radial,
        )
    }

    /// True when the straight path `from → to` crosses a line zone.
    ///
    /// Fast aircraft can pass through the thin sector behind a line between two
    /// fixes, so line transitions are also detected geometrically.
    pub fn crosses_line(&self, from: &GeoPoint, to: &GeoPoint, projection: &FlatProjection) -> bool {
        if !matches!(self.shape, ZoneShape::Line { .. }) {
            return false;
        }
        let radius = self.radius();
        let left = projection.project(&self.reference.offset(radius, self.start_radial));
        let right = projection.project(&self.reference.offset(radius, self.end_radial));
        let line = FlatRay::new(left, right);
        let path = FlatRay::new(projection.project(from), projection.project(to));
        path.intersects(&line).is_some()
    }

    /// Points outlining the zone, used to build the boundary polygon.
    pub fn boundary(&self) -> Vec<GeoPoint> {
        match self.shape {
            ZoneShape::Cylinder { radius_m } => (0..CIRCLE_POINTS)
                .map(|i| {
                    self.reference
                        .offset(radius_m, i as f64 * 360.0 / CIRCLE_POINTS as f64)
                })
                .collect(),
            ZoneShape::Sector { radius_m, .. } | ZoneShape::SymmetricSector { radius_m, .. } => {
                let mut points = vec![self.reference];
                points.extend(self.arc(radius_m, false));
                points
            }
            ZoneShape::AnnularSector {
                radius_m,
                inner_radius_m,
                ..
            } => {
                let mut points = self.arc(radius_m, false);
                if inner_radius_m > 0.0 {
                    points.extend(self.arc(inner_radius_m, true));
                } else {
                    points.push(self.reference);
                }
                points
            }
            ZoneShape::Line { .. } => {
                let radius = self.radius();
                vec![
                    self.reference.offset(radius, self.start_radial),
                    self.reference,
                    self.reference.offset(radius, self.end_radial),
                ]
            }
        }
    }

    fn arc(&self, radius_m: f64, reversed: bool) -> Vec<GeoPoint> {
        let width = arc_width(self.start_radial, self.end_radial);
        let steps = ((width / ARC_STEP_DEG).ceil() as usize).max(1);
        let mut points: Vec<GeoPoint> = (0..=steps)
            .map(|i| {
                let angle = self.start_radial + width * i as f64 / steps as f64;
                self.reference.offset(radius_m, normalise_degrees(angle))
            })
            .collect();
        if reversed {
            points.reverse();
        }
        points
    }
}

/// Clockwise width of the arc from `start` to `end`; equal radials span the full circle.
fn arc_width(start: f64, end: f64) -> f64 {
    let width = normalise_degrees(end - start);
    if width == 0.0 {
        360.0
    } else {
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::signed_degrees;

    fn origin() -> GeoPoint {
        GeoPoint::new(46.0, 7.0)
    }

    #[test]
    fn symmetric_sector_is_centred_on_bisector() {
        let point = origin();
        let previous = point.offset(30_000.0, 200.0);
        let next = point.offset(40_000.0, 80.0);
        let mut zone = ObservationZone::symmetric_sector(point, 10_000.0, 90.0);
        zone.set_legs(Some(&previous), Some(&next));

        let expected = bisector(previous.bearing(&point), point.bearing(&next));
        let width = normalise_degrees(zone.end_radial() - zone.start_radial());
        assert!((width - 90.0).abs() < 1e-9);
        let mid = zone.start_radial() + width / 2.0;
        assert!(signed_degrees(mid - expected).abs() < 1e-9);
        assert!((0.0..360.0).contains(&zone.start_radial()));
        assert!((0.0..360.0).contains(&zone.end_radial()));
    }

    #[test]
    fn finish_sector_faces_away_from_previous() {
        let point = origin();
        let previous = point.offset(20_000.0, 180.0);
        let mut zone = ObservationZone::symmetric_sector(point, 1_000.0, 90.0);
        zone.set_legs(Some(&previous), None);
        assert!(signed_degrees(zone.bisector()).abs() < 0.1);
        assert!(zone.is_inside(&point.offset(500.0, 10.0)));
        assert!(!zone.is_inside(&point.offset(500.0, 180.0)));
    }

    #[test]
    fn isolated_zone_defaults_to_north() {
        let mut zone = ObservationZone::symmetric_sector(origin(), 1_000.0, 90.0);
        zone.set_legs(None, None);
        assert!((zone.start_radial() - 315.0).abs() < 1e-9);
        assert!((zone.end_radial() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn annular_sector_excludes_inner_disc() {
        let zone = ObservationZone::new(
            origin(),
            ZoneShape::AnnularSector {
                radius_m: 10_000.0,
                inner_radius_m: 4_000.0,
                start_radial: 0.0,
                end_radial: 90.0,
            },
        );
        assert!(zone.is_inside(&origin().offset(6_000.0, 45.0)));
        assert!(!zone.is_inside(&origin().offset(2_000.0, 45.0)));
        assert!(!zone.is_inside(&origin().offset(6_000.0, 135.0)));
    }

    #[test]
    fn zone_equality_ignores_derived_radials() {
        let a = ObservationZone::symmetric_sector(origin(), 1_000.0, 90.0);
        let mut b = a;
        b.set_legs(Some(&origin().offset(5_000.0, 90.0)), None);
        assert_eq!(a, b);
        assert_eq!(b, a);

        let c = ObservationZone::symmetric_sector(origin(), 1_000.0, 180.0);
        assert_ne!(a, c);
        let d = ObservationZone::symmetric_sector(origin(), 2_000.0, 90.0);
        assert_ne!(a, d);
        let e = ObservationZone::cylinder(origin(), 1_000.0);
        assert_ne!(a, e);
    }

    #[test]
    fn zone_equality_is_reflexive_for_non_finite_values() {
        let zone = ObservationZone::cylinder(origin(), f64::NAN);
        assert_eq!(zone, zone);
        assert_ne!(zone, ObservationZone::cylinder(origin(), 1_000.0));
    }

    #[test]
    fn shape_validity_rejects_degenerate_parameters() {
        assert!(ZoneShape::Cylinder { radius_m: 500.0 }.is_valid());
        assert!(!ZoneShape::Cylinder { radius_m: f64::NAN }.is_valid());
        assert!(!ZoneShape::Line { length_m: 0.0 }.is_valid());
        assert!(!ZoneShape::SymmetricSector {
            radius_m: 1_000.0,
            sector_angle: f64::INFINITY,
        }
        .is_valid());
        assert!(!ZoneShape::AnnularSector {
            radius_m: 5_000.0,
            inner_radius_m: 6_000.0,
            start_radial: 0.0,
            end_radial: 90.0,
        }
        .is_valid());
    }

    #[test]
    fn line_crossing_is_detected_between_sparse_fixes() {
        let point = origin();
        let previous = point.offset(20_000.0, 180.0);
        let mut zone = ObservationZone::line(point, 1_000.0);
        zone.set_legs(Some(&previous), None);
        let projection = FlatProjection::new(point);

        let before = point.offset(800.0, 180.0);
        let after = point.offset(800.0, 0.0);
        assert!(zone.crosses_line(&before, &after, &projection));
        let wide = point.offset(2_000.0, 90.0);
        assert!(!zone.crosses_line(&before, &wide.offset(800.0, 0.0), &projection));
    }

    #[test]
    fn cylinder_boundary_surrounds_reference() {
        let zone = ObservationZone::cylinder(origin(), 500.0);
        let boundary = zone.boundary();
        assert_eq!(boundary.len(), CIRCLE_POINTS);
        for point in boundary {
            assert!((origin().distance(&point) - 500.0).abs() < 0.5);
        }
    }
}
