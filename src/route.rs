//! Trail routes and the geometry a map layer renders for them.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{geo_utils, smoothing, viewport, Bounds, GeometryConfig, Viewport, Waypoint};

/// An ordered sequence of raw GPS waypoints describing a trail's path.
///
/// Immutable once built: a new trail selection builds a new `Route`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }

    /// Build a route from `[lat, lng]` pairs.
    pub fn from_coords(coords: &[[f64; 2]]) -> Self {
        Self::new(coords.iter().copied().map(Waypoint::from).collect())
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn start(&self) -> Option<Waypoint> {
        self.waypoints.first().copied()
    }

    pub fn end(&self) -> Option<Waypoint> {
        self.waypoints.last().copied()
    }

    /// Bounding box, or `None` for an empty route.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.waypoints)
    }

    /// Length along the raw waypoints, in meters.
    pub fn length_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.waypoints)
    }

    /// Smoothed copy of the waypoints; the route itself is untouched.
    pub fn smoothed(&self, factor: u32) -> Vec<Waypoint> {
        smoothing::smooth_path(&self.waypoints, factor)
    }

    /// Viewport framing the route, or `fallback` at the base zoom if empty.
    pub fn viewport(&self, fallback: Waypoint) -> Viewport {
        viewport::fit_viewport(&self.waypoints, fallback)
    }

    pub fn into_waypoints(self) -> Vec<Waypoint> {
        self.waypoints
    }
}

impl From<Vec<Waypoint>> for Route {
    fn from(waypoints: Vec<Waypoint>) -> Self {
        Self::new(waypoints)
    }
}

/// Distance, climb and slope figures derived from an elevated route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub distance_km: f64,
    /// Meters, sum of positive steps.
    pub elevation_gain: i32,
    /// Meters, sum of negative steps.
    pub elevation_loss: i32,
    pub max_elevation: i32,
    /// Steepest single segment, percent.
    pub max_slope: f64,
    /// Gain over horizontal distance, percent.
    pub avg_slope: f64,
}

impl RouteMetrics {
    /// Compute metrics for `points` with `elevations[i]` as the altitude of
    /// `points[i]`. Samples past the shorter of the two slices are ignored.
    ///
    /// Zero-length segments never contribute to the maximum slope.
    pub fn compute(points: &[Waypoint], elevations: &[f64]) -> Self {
        let n = points.len().min(elevations.len());
        let (points, elevations) = (&points[..n], &elevations[..n]);

        let distance_m = geo_utils::polyline_length(points);

        let mut gain = 0.0;
        let mut loss = 0.0;
        let mut max_slope: f64 = 0.0;
        for i in 1..n {
            let dz = elevations[i] - elevations[i - 1];
            if dz > 0.0 {
                gain += dz;
            } else {
                loss -= dz;
            }

            let horizontal_m = geo_utils::haversine_distance(&points[i - 1], &points[i]);
            if horizontal_m > 0.0 {
                max_slope = max_slope.max(dz.abs() / horizontal_m * 100.0);
            }
        }

        let elevation_gain = gain as i32;
        let avg_slope = if distance_m > 0.0 {
            elevation_gain as f64 / distance_m * 100.0
        } else {
            0.0
        };

        Self {
            distance_km: distance_m / 1000.0,
            elevation_gain,
            elevation_loss: loss as i32,
            max_elevation: elevations.iter().copied().reduce(f64::max).unwrap_or(0.0) as i32,
            max_slope,
            avg_slope,
        }
    }
}

/// A route plus one elevation sample (meters) per waypoint.
///
/// `elevations` is empty when the source had no altitude data, or had it
/// for only some of the points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteProfile {
    pub route: Route,
    pub elevations: Vec<f64>,
}

impl RouteProfile {
    /// Pair a route with its elevations. A sample count that doesn't match
    /// the waypoint count drops the elevations.
    pub fn new(route: Route, elevations: Vec<f64>) -> Self {
        let elevations = if elevations.len() == route.len() {
            elevations
        } else {
            debug!(
                "[RouteProfile] {} elevations for {} waypoints, ignoring elevations",
                elevations.len(),
                route.len()
            );
            Vec::new()
        };
        Self { route, elevations }
    }

    pub fn has_elevation(&self) -> bool {
        !self.route.is_empty() && self.elevations.len() == self.route.len()
    }

    /// Metrics for the profile, or `None` without elevation data.
    pub fn metrics(&self) -> Option<RouteMetrics> {
        self.has_elevation()
            .then(|| RouteMetrics::compute(self.route.waypoints(), &self.elevations))
    }
}

/// Everything needed to draw a selected trail: the smoothed polyline and
/// the viewport that frames it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGeometry {
    pub smoothed: Vec<Waypoint>,
    pub viewport: Viewport,
}

impl RouteGeometry {
    /// Smooth the route and fit a viewport to its raw waypoints.
    ///
    /// The viewport is computed from the raw waypoints, not the smoothed
    /// path, so a spline overshoot at a sharp turn never changes the zoom.
    pub fn compute(route: &Route, fallback: Waypoint, config: &GeometryConfig) -> Self {
        let smoothed = route.smoothed(config.smoothing_factor);
        let viewport = route.viewport(fallback);

        debug!(
            "[RouteGeometry] {} waypoints -> {} smoothed, zoom {}",
            route.len(),
            smoothed.len(),
            viewport.zoom
        );

        Self { smoothed, viewport }
    }
}

/// Compute geometry for many routes in parallel. Output order matches input.
#[cfg(feature = "parallel")]
pub fn compute_geometries_parallel(
    routes: &[(Route, Waypoint)],
    config: &GeometryConfig,
) -> Vec<RouteGeometry> {
    use rayon::prelude::*;

    routes
        .par_iter()
        .map(|(route, fallback)| RouteGeometry::compute(route, *fallback, config))
        .collect()
}
