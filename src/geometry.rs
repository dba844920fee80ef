//! Spherical geometry helpers
//!
//! Great-circle distance, radius bounding boxes and the rectangle operations the
//! bounds engine uses to narrow down where a place can be.

use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

use crate::{Result, TrackError};

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6378.1;

const MIN_LAT: f64 = -std::f64::consts::FRAC_PI_2;
const MAX_LAT: f64 = std::f64::consts::FRAC_PI_2;
const MIN_LNG: f64 = -std::f64::consts::PI;
const MAX_LNG: f64 = std::f64::consts::PI;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject coordinates outside [-90, 90] x [-180, 180]
    pub fn validate(&self) -> Result<()> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lng_ok = self.lng.is_finite() && (-180.0..=180.0).contains(&self.lng);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(TrackError::validation(format!(
                "coordinates out of range: lat={}, lng={}",
                self.lat, self.lng
            )))
        }
    }

    /// Format as the `lat,lng` pair routing providers expect
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// A latitude/longitude rectangle given by two opposite corners.
///
/// The corners are not ordered; accessors normalise them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub corner1: Point,
    pub corner2: Point,
}

impl BoundingRegion {
    #[must_use]
    pub fn new(corner1: Point, corner2: Point) -> Self {
        Self { corner1, corner2 }
    }

    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.corner1.lat.min(self.corner2.lat)
    }

    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.corner1.lat.max(self.corner2.lat)
    }

    #[must_use]
    pub fn min_lng(&self) -> f64 {
        self.corner1.lng.min(self.corner2.lng)
    }

    #[must_use]
    pub fn max_lng(&self) -> f64 {
        self.corner1.lng.max(self.corner2.lng)
    }

    /// Strict containment: points on any edge are outside.
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.lat > self.min_lat()
            && point.lat < self.max_lat()
            && point.lng > self.min_lng()
            && point.lng < self.max_lng()
    }

    /// Overlap of both rectangles, `None` when they are disjoint
    #[must_use]
    pub fn try_intersect(&self, other: &BoundingRegion) -> Option<BoundingRegion> {
        let min_lat = self.min_lat().max(other.min_lat());
        let max_lat = self.max_lat().min(other.max_lat());
        let min_lng = self.min_lng().max(other.min_lng());
        let max_lng = self.max_lng().min(other.max_lng());

        if min_lat > max_lat || min_lng > max_lng {
            return None;
        }

        Some(BoundingRegion::new(
            Point::new(min_lat, min_lng),
            Point::new(max_lat, max_lng),
        ))
    }

    /// Intersection of `self` and `other`, or `other` unchanged when they do not overlap.
    #[must_use]
    pub fn intersect(&self, other: &BoundingRegion) -> BoundingRegion {
        self.try_intersect(other).unwrap_or(*other)
    }

    /// Uniformly sample a point inside the rectangle
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let lat = rng.random_range(self.min_lat()..=self.max_lat());
        let lng = rng.random_range(self.min_lng()..=self.max_lng());
        Point::new(lat, lng)
    }
}

/// Great-circle distance in km (spherical law of cosines)
#[must_use]
pub fn distance(p1: &Point, p2: &Point) -> f64 {
    if p1 == p2 {
        return 0.0;
    }

    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let delta_lng = (p1.lng - p2.lng).to_radians();

    let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * delta_lng.cos();
    EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
}

/// Rectangle enclosing every point within `radius_km` of `center`.
///
/// Caps that reach a pole or cross the antimeridian span the full longitude range.
pub fn bounding_region(center: &Point, radius_km: f64) -> Result<BoundingRegion> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(TrackError::validation(format!(
            "radius must be a non-negative distance, got {radius_km} km"
        )));
    }
    center.validate()?;

    let angular = radius_km / EARTH_RADIUS_KM;
    let lat = center.lat.to_radians();
    let lng = center.lng.to_radians();

    let min_lat = lat - angular;
    let max_lat = lat + angular;

    if min_lat > MIN_LAT && max_lat < MAX_LAT {
        let delta_lng = (angular.sin() / lat.cos()).asin();
        let min_lng = lng - delta_lng;
        let max_lng = lng + delta_lng;

        let (west, east) = if min_lng < MIN_LNG || max_lng > MAX_LNG {
            (-180.0, 180.0)
        } else {
            (min_lng.to_degrees(), max_lng.to_degrees())
        };

        return Ok(BoundingRegion::new(
            Point::new(min_lat.to_degrees(), west),
            Point::new(max_lat.to_degrees(), east),
        ));
    }

    // a pole is within the distance
    Ok(BoundingRegion::new(
        Point::new(min_lat.to_degrees().max(-90.0), -180.0),
        Point::new(max_lat.to_degrees().min(90.0), 180.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    fn region(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> BoundingRegion {
        BoundingRegion::new(Point::new(lat1, lng1), Point::new(lat2, lng2))
    }

    #[rstest]
    #[case(Point::new(38.72, -9.14))]
    #[case(Point::new(0.0, 0.0))]
    #[case(Point::new(-33.87, 151.21))]
    #[case(Point::new(89.9, 179.9))]
    fn test_distance_to_self_is_zero(#[case] p: Point) {
        assert_eq!(distance(&p, &p), 0.0);
    }

    #[rstest]
    #[case(Point::new(38.72, -9.14), Point::new(41.15, -8.61))]
    #[case(Point::new(51.5, -0.12), Point::new(40.71, -74.0))]
    #[case(Point::new(-33.87, 151.21), Point::new(35.68, 139.69))]
    fn test_distance_is_symmetric(#[case] a: Point, #[case] b: Point) {
        assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_known_distance() {
        // Lisbon to Porto is roughly 274 km
        let d = distance(&Point::new(38.7223, -9.1393), &Point::new(41.1579, -8.6291));
        assert!(d > 265.0 && d < 285.0, "Lisbon to Porto should be ~274km, got {d}");
    }

    #[rstest]
    #[case(Point::new(38.72, -9.14), 0.1)]
    #[case(Point::new(38.72, -9.14), 30.0)]
    #[case(Point::new(-45.0, 170.0), 250.0)]
    #[case(Point::new(0.0, 0.0), 1000.0)]
    fn test_bounding_region_contains_center(#[case] center: Point, #[case] radius: f64) {
        let bounds = bounding_region(&center, radius).unwrap();
        assert!(bounds.contains(&center));

        let half_diagonal = distance(&center, &bounds.corner1).max(distance(&center, &bounds.corner2));
        assert!(half_diagonal >= radius, "half diagonal {half_diagonal} < radius {radius}");
    }

    #[test]
    fn test_bounding_region_latitude_extent_matches_radius() {
        let center = Point::new(38.72, -9.14);
        let bounds = bounding_region(&center, 30.0).unwrap();
        let north = Point::new(bounds.max_lat(), center.lng);
        assert!((distance(&center, &north) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_region_near_pole_spans_all_longitudes() {
        let bounds = bounding_region(&Point::new(89.5, 10.0), 200.0).unwrap();
        assert_eq!(bounds.min_lng(), -180.0);
        assert_eq!(bounds.max_lng(), 180.0);
        assert_eq!(bounds.max_lat(), 90.0);
        assert!(bounds.min_lat() < 89.5);
    }

    #[test]
    fn test_bounding_region_across_antimeridian_spans_all_longitudes() {
        let bounds = bounding_region(&Point::new(0.0, 179.9), 50.0).unwrap();
        assert_eq!(bounds.min_lng(), -180.0);
        assert_eq!(bounds.max_lng(), 180.0);
        assert!(bounds.contains(&Point::new(0.0, 179.9)));
    }

    #[rstest]
    #[case(Point::new(91.0, 0.0), 1.0)]
    #[case(Point::new(0.0, -180.5), 1.0)]
    #[case(Point::new(0.0, 0.0), -1.0)]
    #[case(Point::new(0.0, 0.0), f64::NAN)]
    fn test_bounding_region_rejects_invalid_input(#[case] center: Point, #[case] radius: f64) {
        let result = bounding_region(&center, radius);
        assert!(matches!(result, Err(TrackError::Validation { .. })));
    }

    #[test]
    fn test_intersect_overlapping_is_within_both() {
        let a = region(38.0, -10.0, 40.0, -8.0);
        let b = region(39.0, -9.0, 41.0, -7.0);
        let result = a.intersect(&b);

        assert_eq!(result, region(39.0, -9.0, 40.0, -8.0));
        for r in [a, b] {
            assert!(result.min_lat() >= r.min_lat() && result.max_lat() <= r.max_lat());
            assert!(result.min_lng() >= r.min_lng() && result.max_lng() <= r.max_lng());
        }
    }

    #[test]
    fn test_intersect_disjoint_returns_second_operand() {
        let a = region(10.0, 10.0, 11.0, 11.0);
        let b = region(-5.0, -5.0, -4.0, -4.0);
        assert!(a.try_intersect(&b).is_none());
        assert_eq!(a.intersect(&b), b);
    }

    #[test]
    fn test_intersect_ignores_corner_order() {
        let a = region(40.0, -8.0, 38.0, -10.0);
        let b = region(39.0, -9.0, 41.0, -7.0);
        assert_eq!(a.intersect(&b), region(39.0, -9.0, 40.0, -8.0));
    }

    #[rstest]
    #[case(Point::new(38.0, -9.0))]
    #[case(Point::new(40.0, -9.0))]
    #[case(Point::new(39.0, -10.0))]
    #[case(Point::new(39.0, -8.0))]
    fn test_contains_excludes_edges(#[case] p: Point) {
        let bounds = region(38.0, -10.0, 40.0, -8.0);
        assert!(!bounds.contains(&p));
    }

    #[test]
    fn test_contains_interior_point() {
        let bounds = region(38.0, -10.0, 40.0, -8.0);
        assert!(bounds.contains(&Point::new(39.0, -9.0)));
        assert!(!bounds.contains(&Point::new(41.0, -9.0)));
    }

    #[test]
    fn test_random_point_stays_inside() {
        let bounds = region(38.7, -9.4, 39.0, -9.1);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = bounds.random_point(&mut rng);
            assert!(p.lat >= bounds.min_lat() && p.lat <= bounds.max_lat());
            assert!(p.lng >= bounds.min_lng() && p.lng <= bounds.max_lng());
        }
    }

    #[test]
    fn test_random_point_in_degenerate_region() {
        let p = Point::new(38.7, -9.1);
        let bounds = BoundingRegion::new(p, p);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(bounds.random_point(&mut rng), p);
    }

    #[test]
    fn test_point_query_format() {
        assert_eq!(Point::new(38.5, -9.25).to_query(), "38.5,-9.25");
    }
}
