//! Geodetic and flat-projected geometry primitives.
//!
//! Task geometry is evaluated on a local flat projection shared by every
//! point of a task. Bearings are in degrees, 0 = north, clockwise.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Tolerance for treating two flat rays as parallel.
const PARALLEL_EPSILON: f64 = 1e-9;

/// A point on the earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in metres.
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lon, other.lat, other.lon)
    }

    /// Initial bearing towards `other` in degrees [0, 360).
    pub fn bearing(&self, other: &GeoPoint) -> f64 {
        bearing(self.lat, self.lon, other.lat, other.lon)
    }

    pub fn vector_to(&self, other: &GeoPoint) -> GeoVector {
        GeoVector {
            distance: self.distance(other),
            bearing: self.bearing(other),
        }
    }

    /// Point reached by travelling `distance_m` along `bearing_deg`.
    pub fn offset(&self, distance_m: f64, bearing_deg: f64) -> GeoPoint {
        let (lat, lon) = offset_by_bearing(self.lat, self.lon, distance_m, bearing_deg);
        GeoPoint { lat, lon }
    }

    /// Point a `fraction` of the way along the great circle towards `other`.
    pub fn interpolate(&self, other: &GeoPoint, fraction: f64) -> GeoPoint {
        let vector = self.vector_to(other);
        self.offset(vector.distance * fraction, vector.bearing)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Distance and bearing between two points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoVector {
    pub distance: f64,
    pub bearing: f64,
}

/// Calculate distance between two points in meters using Haversine formula.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial bearing from point 1 to point 2 in degrees [0, 360).
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    normalise_degrees(x.atan2(y).to_degrees())
}

/// Offset a position by distance and bearing.
///
/// # Arguments
/// * `lat`, `lon` - Starting position in degrees
/// * `distance_m` - Distance in meters
/// * `bearing_deg` - Bearing in degrees (0 = north, 90 = east)
///
/// # Returns
/// (new_lat, new_lon) in degrees
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_deg: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let bearing_rad = bearing_deg.to_radians();
    let lat1 = lat.to_radians();
    let lon1 = lon.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lon2 = lon1 + y.atan2(x);
    lon2 =
        (lon2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lon2.to_degrees())
}

/// Normalise an angle to [0, 360).
pub fn normalise_degrees(angle: f64) -> f64 {
    let value = angle.rem_euclid(360.0);
    if value >= 360.0 {
        0.0
    } else {
        value
    }
}

/// Normalise an angle to (-180, 180].
pub fn signed_degrees(angle: f64) -> f64 {
    let value = normalise_degrees(angle);
    if value > 180.0 {
        value - 360.0
    } else {
        value
    }
}

/// Direction pointing to the outside of the turn formed by an incoming leg on
/// bearing `b1` and an outgoing leg on bearing `b2`.
///
/// This is the half angle between `b1` and the reciprocal of `b2`, taken on
/// the shorter arc.
pub fn bisector(b1: f64, b2: f64) -> f64 {
    let reverse_out = b2 + 180.0;
    let span = signed_degrees(reverse_out - b1);
    normalise_degrees(b1 + span / 2.0)
}

/// True if `angle` lies on the clockwise arc from `start` to `end`.
pub fn angle_between(angle: f64, start: f64, end: f64) -> bool {
    let width = normalise_degrees(end - start);
    if width == 0.0 {
        // a zero-width arc is taken to be the full circle
        return true;
    }
    normalise_degrees(angle - start) <= width
}

/// Continuous flat coordinates in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatPoint {
    pub x: f64,
    pub y: f64,
}

impl FlatPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn cross(&self, other: &FlatPoint) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn dot(&self, other: &FlatPoint) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &FlatPoint) -> f64 {
        (*other - *self).length()
    }

    pub fn rotate(&self, angle_rad: f64) -> FlatPoint {
        let (sin, cos) = angle_rad.sin_cos();
        FlatPoint::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for FlatPoint {
    type Output = FlatPoint;

    fn add(self, rhs: FlatPoint) -> FlatPoint {
        FlatPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for FlatPoint {
    type Output = FlatPoint;

    fn sub(self, rhs: FlatPoint) -> FlatPoint {
        FlatPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for FlatPoint {
    type Output = FlatPoint;

    fn mul(self, rhs: f64) -> FlatPoint {
        FlatPoint::new(self.x * rhs, self.y * rhs)
    }
}

/// Integer flat coordinates (whole metres) used for hull maintenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlatGeoPoint {
    pub x: i32,
    pub y: i32,
}

impl FlatGeoPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Z component of (a - self) x (b - self); positive when `b` is left of self→a.
    pub fn cross(&self, a: &FlatGeoPoint, b: &FlatGeoPoint) -> i64 {
        let ax = (a.x - self.x) as i64;
        let ay = (a.y - self.y) as i64;
        let bx = (b.x - self.x) as i64;
        let by = (b.y - self.y) as i64;
        ax * by - ay * bx
    }

    pub fn distance(&self, other: &FlatGeoPoint) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn to_flat(self) -> FlatPoint {
        FlatPoint::new(self.x as f64, self.y as f64)
    }
}

/// Local equirectangular projection about a task-wide origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatProjection {
    center: GeoPoint,
    meters_per_deg_lat: f64,
    meters_per_deg_lon: f64,
}

impl FlatProjection {
    pub fn new(center: GeoPoint) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M.to_radians();
        let meters_per_deg_lon =
            (meters_per_deg_lat * center.lat.to_radians().cos().abs()).max(1e-3);
        Self {
            center,
            meters_per_deg_lat,
            meters_per_deg_lon,
        }
    }

    /// Projection centred on the bounding-box centre of `points`.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min_lat, mut max_lat, mut min_lon, mut max_lon) =
            (first.lat, first.lat, first.lon, first.lon);
        for point in iter {
            min_lat = min_lat.min(point.lat);
            max_lat = max_lat.max(point.lat);
            min_lon = min_lon.min(point.lon);
            max_lon = max_lon.max(point.lon);
        }
        Some(Self::new(GeoPoint::new(
            (min_lat + max_lat) / 2.0,
            (min_lon + max_lon) / 2.0,
        )))
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn project(&self, point: &GeoPoint) -> FlatPoint {
        FlatPoint::new(
            (point.lon - self.center.lon) * self.meters_per_deg_lon,
            (point.lat - self.center.lat) * self.meters_per_deg_lat,
        )
    }

    pub fn project_integer(&self, point: &GeoPoint) -> FlatGeoPoint {
        let flat = self.project(point);
        FlatGeoPoint::new(flat.x.round() as i32, flat.y.round() as i32)
    }

    pub fn unproject(&self, point: &FlatPoint) -> GeoPoint {
        GeoPoint::new(
            self.center.lat + point.y / self.meters_per_deg_lat,
            self.center.lon + point.x / self.meters_per_deg_lon,
        )
    }

    pub fn unproject_integer(&self, point: &FlatGeoPoint) -> GeoPoint {
        self.unproject(&point.to_flat())
    }
}

/// Ray from `point` along `vector` on the flat plane, parametrised over [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRay {
    pub point: FlatPoint,
    pub vector: FlatPoint,
}

impl FlatRay {
    pub fn new(from: FlatPoint, to: FlatPoint) -> Self {
        Self {
            point: from,
            vector: to - from,
        }
    }

    pub fn parametric(&self, t: f64) -> FlatPoint {
        self.point + self.vector * t
    }

    /// Parameter along `self` where it crosses `other`, or `None` when the rays
    /// are parallel, coincident or do not meet within both segments.
    pub fn intersects(&self, other: &FlatRay) -> Option<f64> {
        let denom = self.vector.cross(&other.vector);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }
        let delta = other.point - self.point;
        let t = delta.cross(&other.vector) / denom;
        let u = delta.cross(&self.vector) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }
}
