//! # Geographic Utilities
//!
//! Distance and bounding-box helpers shared by the route, index and export
//! modules.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two waypoints |
//! | [`polyline_length`] | Total length of a route in meters |
//! | [`closest_approach`] | Shortest distance from a point to a polyline |
//! | [`compute_bounds`] | Bounding box of a route |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! ## Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).
//! Conversion to `geo` types swaps the axes: `geo` points are `(x = lng, y = lat)`.

use geo::{Closest, Distance, Haversine, HaversineClosestPoint, LineString, Point};

use crate::{Bounds, Waypoint};

// =============================================================================
// Conversions
// =============================================================================

/// Convert a waypoint to a `geo` point (x = longitude, y = latitude).
#[inline]
pub fn to_point(w: &Waypoint) -> Point<f64> {
    Point::new(w.longitude, w.latitude)
}

/// Convert a waypoint slice to a `geo` line string.
pub fn to_line_string(points: &[Waypoint]) -> LineString<f64> {
    points.iter().map(|w| (w.longitude, w.latitude)).collect()
}

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two waypoints in meters (Haversine formula).
///
/// ```rust
/// use trail_geometry::{Waypoint, geo_utils};
///
/// let busteni = Waypoint::new(45.4153, 25.5375);
/// let sinaia = Waypoint::new(45.3500, 25.5500);
///
/// let distance = geo_utils::haversine_distance(&busteni, &sinaia);
/// assert!((distance - 7_330.0).abs() < 200.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &Waypoint, p2: &Waypoint) -> f64 {
    Haversine::distance(to_point(p1), to_point(p2))
}

/// Total length of a polyline in meters. Empty or single-point routes return 0.0.
pub fn polyline_length(points: &[Waypoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Shortest great-circle distance in meters from `point` to the polyline
/// through `points`, measured to the nearest point on any segment.
///
/// Returns `None` for an empty polyline.
pub fn closest_approach(point: &Waypoint, points: &[Waypoint]) -> Option<f64> {
    match points {
        [] => None,
        [only] => Some(haversine_distance(point, only)),
        _ => {
            let target = to_point(point);
            match to_line_string(points).haversine_closest_point(&target) {
                Closest::Intersection(p) | Closest::SinglePoint(p) => {
                    Some(Haversine::distance(target, p))
                }
                // Degenerate geometry; fall back to the nearest vertex.
                Closest::Indeterminate => points
                    .iter()
                    .map(|w| haversine_distance(point, w))
                    .reduce(f64::min),
            }
        }
    }
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale at `latitude`, which is the larger of the two
/// degree counts, so a square box of this half-width always covers the
/// requested distance.
///
/// - At the equator, 1 degree ≈ 111,320 meters
/// - The cosine is floored at 0.1 so values stay bounded near the poles;
///   poleward of ~84.3° the result is smaller than the true longitude span,
///   so callers building search boxes there must widen them
///   (see `TrailIndex::suggest_in_area`)
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Bounding box of a route in a single linear scan.
///
/// For empty input the box is inverted (MIN/MAX sentinels); use
/// [`Bounds::from_points`] when emptiness matters.
///
/// ```rust
/// use trail_geometry::{Waypoint, geo_utils};
///
/// let route = vec![
///     Waypoint::new(45.30, 25.40),
///     Waypoint::new(45.35, 25.45),
///     Waypoint::new(45.32, 25.50),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&route);
/// assert_eq!(bounds.min_lat, 45.30);
/// assert_eq!(bounds.max_lng, 25.50);
/// ```
pub fn compute_bounds(points: &[Waypoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Unit Tests
// =============================================================================
