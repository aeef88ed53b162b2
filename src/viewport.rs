//! # Viewport Fitting
//!
//! Picks a map center and a discrete zoom level that frame a whole route.
//!
//! The center is the midpoint of the route's bounding box. The zoom starts at
//! [`BASE_ZOOM`] and walks the [`ZOOM_LADDER`] in increasing order of extent:
//! every threshold the route's largest side exceeds overwrites the zoom, so
//! the last (coarsest) satisfied rung wins.
//!
//! ## Example
//!
//! ```rust
//! use trail_geometry::{Waypoint, viewport};
//!
//! let route = vec![
//!     Waypoint::new(45.30, 25.40),
//!     Waypoint::new(45.35, 25.45),
//!     Waypoint::new(45.32, 25.50),
//! ];
//!
//! let view = viewport::fit_viewport(&route, Waypoint::new(45.4, 25.5));
//! assert_eq!(view.zoom, 14);
//! assert!((view.center.latitude - 45.325).abs() < 1e-9);
//! ```

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Bounds, Waypoint};

/// Zoom used for an empty route and for routes smaller than every rung.
pub const BASE_ZOOM: u8 = 14;

/// `(limit, zoom)` rungs in increasing order of extent (degrees).
/// A route whose largest side is strictly greater than `limit` gets `zoom`,
/// unless a later rung also applies.
pub const ZOOM_LADDER: &[(f64, u8)] = &[(0.1, 13), (0.15, 12), (0.2, 11), (0.3, 10)];

/// Tolerance for the strict comparison against a rung's limit.
///
/// Extents come from subtracting decimal coordinates, so `25.50 - 25.40`
/// lands at `0.10000000000000142`; that must not count as exceeding `0.1`.
pub const EXTENT_EPSILON: f64 = 1e-9;

/// Map center and zoom level that frame a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub center: Waypoint,
    pub zoom: u8,
}

/// Zoom level for a route whose largest bounding-box side is `max_diff` degrees.
///
/// ```rust
/// use trail_geometry::viewport::zoom_for_extent;
///
/// assert_eq!(zoom_for_extent(0.05), 14);
/// assert_eq!(zoom_for_extent(0.25), 11);
/// assert_eq!(zoom_for_extent(0.35), 10);
/// ```
pub fn zoom_for_extent(max_diff: f64) -> u8 {
    ZOOM_LADDER
        .iter()
        .fold(BASE_ZOOM, |zoom, &(limit, rung)| {
            if max_diff > limit + EXTENT_EPSILON {
                rung
            } else {
                zoom
            }
        })
}

/// Fit a viewport to `points`, falling back to `fallback` at [`BASE_ZOOM`]
/// when there are no points.
pub fn fit_viewport(points: &[Waypoint], fallback: Waypoint) -> Viewport {
    let Some(bounds) = Bounds::from_points(points) else {
        debug!("[viewport] empty route, using fallback {:?}", fallback);
        return Viewport {
            center: fallback,
            zoom: BASE_ZOOM,
        };
    };

    let viewport = fit_bounds(&bounds);
    debug!(
        "[viewport] {} points -> center ({:.5}, {:.5}) zoom {}",
        points.len(),
        viewport.center.latitude,
        viewport.center.longitude,
        viewport.zoom
    );
    viewport
}

/// Fit a viewport to an already computed bounding box.
pub fn fit_bounds(bounds: &Bounds) -> Viewport {
    Viewport {
        center: bounds.center(),
        zoom: zoom_for_extent(bounds.max_extent()),
    }
}
