//! # Trail Geometry
//!
//! Route geometry for hiking-trail maps.
//!
//! This library provides:
//! - Waypoint smoothing with a clamped Catmull-Rom spline
//! - Viewport fitting (map center + discrete zoom) from a route's bounding box
//! - Trail records as served by the trail catalog, with difficulty inference
//! - Spatial trail suggestion, GeoJSON/GPX export and GPX import
//!
//! ## Features
//!
//! - **`parallel`** - Batch smoothing and geometry computation with rayon
//! - **`http`** - HTTP client for the trail catalog
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trail_geometry::{GeometryConfig, Route, RouteGeometry, Waypoint};
//!
//! let route = Route::from_coords(&[[45.30, 25.40], [45.35, 25.45], [45.32, 25.50]]);
//! let fallback = Waypoint::new(45.4, 25.5);
//! let geometry = RouteGeometry::compute(&route, fallback, &GeometryConfig::default());
//!
//! assert_eq!(geometry.smoothed.len(), 11);
//! assert_eq!(geometry.viewport.zoom, 14);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Result, TrailGeometryError};

pub mod geo_utils;

pub mod smoothing;
pub use smoothing::{catmull_rom_weights, smooth_path, DEFAULT_SMOOTHING_FACTOR};

pub mod viewport;
pub use viewport::{fit_viewport, zoom_for_extent, Viewport, BASE_ZOOM, ZOOM_LADDER};

pub mod route;
pub use route::{Route, RouteGeometry, RouteMetrics, RouteProfile};

#[cfg(feature = "parallel")]
pub use route::compute_geometries_parallel;

pub mod trail;
pub use trail::{
    classify_difficulty, compute_trail_geometries, estimate_duration_minutes, parse_trails,
    Difficulty, Trail,
};

pub mod index;
pub use index::{TrailIndex, TrailSuggestion, DEFAULT_SUGGEST_RADIUS_KM};

pub mod export;

// HTTP module for the trail catalog
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{TrailCatalogClient, TrailFetchResult};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrailGeometryRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude, in degrees.
///
/// Serializes as a `[lat, lng]` pair, the shape the trail catalog uses for
/// route waypoints.
///
/// # Example
/// ```
/// use trail_geometry::Waypoint;
/// let omu = Waypoint::new(45.4456, 25.4567); // Vârful Omu
/// let json = serde_json::to_string(&omu).unwrap();
/// assert_eq!(json, "[45.4456,25.4567]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    /// Create a new waypoint.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the waypoint has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<[f64; 2]> for Waypoint {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Waypoint> for [f64; 2] {
    fn from(w: Waypoint) -> Self {
        [w.latitude, w.longitude]
    }
}

/// Axis-aligned bounding box of a set of waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from waypoints in a single pass. `None` for empty input.
    pub fn from_points(points: &[Waypoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> Waypoint {
        Waypoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Larger of the latitude and longitude spans, in degrees.
    pub fn max_extent(&self) -> f64 {
        (self.max_lat - self.min_lat).max(self.max_lng - self.min_lng)
    }

    /// Grow the box by `degrees` on every side.
    pub fn expanded(&self, degrees: f64) -> Self {
        Self {
            min_lat: self.min_lat - degrees,
            max_lat: self.max_lat + degrees,
            min_lng: self.min_lng - degrees,
            max_lng: self.max_lng + degrees,
        }
    }
}

/// Configuration for route geometry computation.
///
/// Deserializable with every field optional, so a host can ship a partial
/// JSON config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryConfig {
    /// Subdivisions per original segment when smoothing.
    /// Default: 5 (8 gives visibly rounder turns on sparse routes)
    pub smoothing_factor: u32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl GeometryConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::info;

    /// Smooth a waypoint sequence.
    #[uniffi::export]
    pub fn ffi_smooth_path(points: Vec<Waypoint>, factor: u32) -> Vec<Waypoint> {
        init_logging();
        info!(
            "[TrailGeometryRust] smooth_path called with {} points (factor {})",
            points.len(),
            factor
        );
        smooth_path(&points, factor)
    }

    /// Fit a viewport to a waypoint sequence.
    #[uniffi::export]
    pub fn ffi_fit_viewport(points: Vec<Waypoint>, fallback: Waypoint) -> Viewport {
        init_logging();
        fit_viewport(&points, fallback)
    }

    /// Smoothed path plus viewport, as one record for the map layer.
    #[derive(Debug, Clone, uniffi::Record)]
    pub struct FfiRouteGeometry {
        pub smoothed: Vec<Waypoint>,
        pub viewport: Viewport,
    }

    /// Compute route geometry from a flat coordinate buffer.
    /// `coords` contains [lat1, lng1, lat2, lng2, ...]; a trailing odd value is ignored.
    /// This avoids the overhead of deserializing Waypoint objects.
    #[uniffi::export]
    pub fn ffi_trail_geometry_from_flat(
        coords: Vec<f64>,
        fallback: Waypoint,
        config: GeometryConfig,
    ) -> FfiRouteGeometry {
        init_logging();
        let points: Vec<Waypoint> = coords
            .chunks_exact(2)
            .map(|chunk| Waypoint::new(chunk[0], chunk[1]))
            .collect();

        let start = std::time::Instant::now();
        let geometry = RouteGeometry::compute(&Route::new(points), fallback, &config);
        info!(
            "[TrailGeometryRust] FLAT geometry: {} coords -> {} points, zoom {} in {:?}",
            coords.len() / 2,
            geometry.smoothed.len(),
            geometry.viewport.zoom,
            start.elapsed()
        );

        FfiRouteGeometry {
            smoothed: geometry.smoothed,
            viewport: geometry.viewport,
        }
    }

    /// Get default configuration.
    #[uniffi::export]
    pub fn default_config() -> GeometryConfig {
        init_logging();
        GeometryConfig::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
