//! Projected point polygons used for scoring and distance searches.

use crate::geo::{FlatGeoPoint, FlatProjection, GeoPoint};
use serde::{Deserialize, Serialize};

/// Upper bound on polygon vertices kept after pruning.
pub const MAX_SEARCH_POINTS: usize = 64;

/// A geodetic location with its cached flat projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchPoint {
    pub location: GeoPoint,
    #[serde(skip)]
    pub flat: FlatGeoPoint,
}

impl SearchPoint {
    pub fn new(location: GeoPoint, projection: &FlatProjection) -> Self {
        Self {
            location,
            flat: projection.project_integer(&location),
        }
    }
}

/// Ordered polygon of search points, counter-clockwise once pruned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPointVector {
    points: Vec<SearchPoint>,
}

impl SearchPointVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(location: GeoPoint, projection: &FlatProjection) -> Self {
        Self {
            points: vec![SearchPoint::new(location, projection)],
        }
    }

    pub fn from_locations(
        locations: impl IntoIterator<Item = GeoPoint>,
        projection: &FlatProjection,
    ) -> Self {
        Self {
            points: locations
                .into_iter()
                .map(|location| SearchPoint::new(location, projection))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SearchPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchPoint> {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn push(&mut self, point: SearchPoint) {
        self.points.push(point);
    }

    /// Recompute cached flat coordinates after the task projection changed.
    pub fn project(&mut self, projection: &FlatProjection) {
        for point in &mut self.points {
            point.flat = projection.project_integer(&point.location);
        }
    }

    pub fn flat_vertices(&self) -> Vec<FlatGeoPoint> {
        self.points.iter().map(|p| p.flat).collect()
    }

    /// Reduce to the convex hull. Returns true if any point was removed.
    pub fn prune_interior(&mut self) -> bool {
        let before = self.points.len();
        self.points = convex_hull(&self.points);
        self.points.len() != before
    }

    /// Drop the least significant vertices until at most `max_points` remain.
    ///
    /// Removing a vertex from a convex polygon keeps it convex, so the
    /// result stays simple.
    pub fn thin_to_size(&mut self, max_points: usize) -> bool {
        let max_points = max_points.max(1);
        if self.points.len() <= max_points {
            return false;
        }
        while self.points.len() > max_points {
            let n = self.points.len();
            let mut smallest = 0;
            let mut smallest_area = i64::MAX;
            for i in 0..n {
                let prev = self.points[(i + n - 1) % n].flat;
                let here = self.points[i].flat;
                let next = self.points[(i + 1) % n].flat;
                let area = prev.cross(&here, &next).abs();
                if area < smallest_area {
                    smallest_area = area;
                    smallest = i;
                }
            }
            self.points.remove(smallest);
        }
        true
    }

    /// Point-in-polygon test on the flat plane (polygon must be a pruned hull).
    pub fn is_inside(&self, point: &FlatGeoPoint) -> bool {
        match self.points.len() {
            0 => false,
            1 => self.points[0].flat == *point,
            2 => on_segment(&self.points[0].flat, &self.points[1].flat, point),
            n => (0..n).all(|i| {
                let a = self.points[i].flat;
                let b = self.points[(i + 1) % n].flat;
                a.cross(&b, point) >= 0
            }),
        }
    }

    /// Search point nearest to `location` by flat distance.
    pub fn nearest(&self, location: &FlatGeoPoint) -> Option<&SearchPoint> {
        self.points.iter().min_by(|a, b| {
            a.flat
                .distance(location)
                .total_cmp(&b.flat.distance(location))
        })
    }
}

fn on_segment(a: &FlatGeoPoint, b: &FlatGeoPoint, p: &FlatGeoPoint) -> bool {
    if a.cross(b, p) != 0 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Andrew's monotone chain over the cached flat coordinates.
///
/// Output is counter-clockwise starting from the lowest (x, y) vertex, with
/// duplicate and collinear points removed.
fn convex_hull(points: &[SearchPoint]) -> Vec<SearchPoint> {
    let mut sorted: Vec<SearchPoint> = points.to_vec();
    sorted.sort_by(|a, b| a.flat.cmp(&b.flat));
    sorted.dedup_by(|a, b| a.flat == b.flat);

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<SearchPoint> = Vec::with_capacity(sorted.len());
    for point in &sorted {
        while lower.len() >= 2
            && lower[lower.len() - 2]
                .flat
                .cross(&lower[lower.len() - 1].flat, &point.flat)
                <= 0
        {
            lower.pop();
        }
        lower.push(*point);
    }

    let mut upper: Vec<SearchPoint> = Vec::with_capacity(sorted.len());
    for point in sorted.iter().rev() {
        while upper.len() >= 2
            && upper[upper.len() - 2]
                .flat
                .cross(&upper[upper.len() - 1].flat, &point.flat)
                <= 0
        {
            upper.pop();
        }
        upper.push(*point);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> FlatProjection {
        FlatProjection::new(GeoPoint::new(45.0, 6.0))
    }

    fn square(size_m: f64) -> Vec<GeoPoint> {
        let origin = GeoPoint::new(45.0, 6.0);
        vec![
            origin,
            origin.offset(size_m, 90.0),
            origin.offset(size_m, 0.0).offset(size_m, 90.0),
            origin.offset(size_m, 0.0),
        ]
    }

    #[test]
    fn prune_interior_removes_inner_points() {
        let mut locations = square(1_000.0);
        locations.push(GeoPoint::new(45.0, 6.0).offset(700.0, 45.0));
        let mut polygon = SearchPointVector::from_locations(locations, &projection());
        assert!(polygon.prune_interior());
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn hull_contains_interior_points() {
        let mut polygon = SearchPointVector::from_locations(square(1_000.0), &projection());
        polygon.prune_interior();
        let inside = projection().project_integer(&GeoPoint::new(45.0, 6.0).offset(500.0, 45.0));
        let outside =
            projection().project_integer(&GeoPoint::new(45.0, 6.0).offset(2_000.0, 45.0));
        assert!(polygon.is_inside(&inside));
        assert!(!polygon.is_inside(&outside));
    }

    #[test]
    fn thinning_caps_vertex_count_and_keeps_convexity() {
        let origin = GeoPoint::new(45.0, 6.0);
        let circle: Vec<GeoPoint> = (0..200)
            .map(|i| origin.offset(5_000.0, i as f64 * 1.8))
            .collect();
        let mut polygon = SearchPointVector::from_locations(circle, &projection());
        polygon.prune_interior();
        assert!(polygon.len() > MAX_SEARCH_POINTS);
        assert!(polygon.thin_to_size(MAX_SEARCH_POINTS));
        assert_eq!(polygon.len(), MAX_SEARCH_POINTS);

        let vertices = polygon.flat_vertices();
        let n = vertices.len();
        for i in 0..n {
            let turn = vertices[i].cross(&vertices[(i + 1) % n], &vertices[(i + 2) % n]);
            assert!(turn > 0, "vertex {i} is not a left turn");
        }
    }

    #[test]
    fn degenerate_polygons_stay_non_empty() {
        let origin = GeoPoint::new(45.0, 6.0);
        let mut polygon =
            SearchPointVector::from_locations(vec![origin, origin, origin], &projection());
        polygon.prune_interior();
        assert_eq!(polygon.len(), 1);
        assert!(polygon.is_inside(&projection().project_integer(&origin)));
    }
}
