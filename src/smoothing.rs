//! # Waypoint Smoothing
//!
//! Densifies a sparse trail polyline with a clamped Catmull-Rom spline so the
//! rendered path reads as a continuous curve through every original waypoint.
//!
//! ## Algorithm
//!
//! For each segment `P[i] -> P[i+1]` the four control points are
//! `P[i-1], P[i], P[i+1], P[i+2]`, with indices clamped to the ends of the
//! sequence (the first and last segments reuse their endpoint as the missing
//! neighbour). The segment emits `P[i]` followed by `factor - 1` points at
//! `s = t / factor` for `t = 1..factor`, and the final waypoint is appended
//! once at the end.
//!
//! The original waypoints are copied through untouched, never recomputed
//! through the basis, so endpoints are bit-exact.
//!
//! ## Example
//!
//! ```rust
//! use trail_geometry::{Waypoint, smoothing};
//!
//! let raw = vec![
//!     Waypoint::new(45.30, 25.40),
//!     Waypoint::new(45.35, 25.45),
//!     Waypoint::new(45.32, 25.50),
//! ];
//!
//! let smoothed = smoothing::smooth_path(&raw, 5);
//! assert_eq!(smoothed.len(), 11);
//! assert_eq!(smoothed[0], raw[0]);
//! assert_eq!(smoothed[10], raw[2]);
//! ```

use log::debug;

use crate::Waypoint;

/// Subdivisions per segment used when the caller doesn't pick one.
pub const DEFAULT_SMOOTHING_FACTOR: u32 = 5;

// =============================================================================
// Basis
// =============================================================================

/// Catmull-Rom basis weights `[a0, a1, a2, a3]` at parameter `s`.
///
/// The weights sum to 1 for every `s`, so each interpolated point is an affine
/// combination of the four control points.
///
/// ```rust
/// use trail_geometry::smoothing::catmull_rom_weights;
///
/// let w = catmull_rom_weights(0.5);
/// assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// ```
#[inline]
pub fn catmull_rom_weights(s: f64) -> [f64; 4] {
    let s2 = s * s;
    let s3 = s2 * s;

    [
        -0.5 * s3 + s2 - 0.5 * s,
        1.5 * s3 - 2.5 * s2 + 1.0,
        -1.5 * s3 + 2.0 * s2 + 0.5 * s,
        0.5 * s3 - 0.5 * s2,
    ]
}

/// Evaluate one segment of the spline at parameter `s`, each axis independently.
#[inline]
fn interpolate(controls: [Waypoint; 4], s: f64) -> Waypoint {
    let [a0, a1, a2, a3] = catmull_rom_weights(s);
    let [p0, p1, p2, p3] = controls;

    Waypoint::new(
        a0 * p0.latitude + a1 * p1.latitude + a2 * p2.latitude + a3 * p3.latitude,
        a0 * p0.longitude + a1 * p1.longitude + a2 * p2.longitude + a3 * p3.longitude,
    )
}

// =============================================================================
// Control point selection
// =============================================================================

/// Index of the control point before segment `i`, clamped at the start.
#[inline]
fn prev_index(i: usize) -> usize {
    i.saturating_sub(1)
}

/// Index of the control point after segment `i`, clamped at the end.
#[inline]
fn next_next_index(i: usize, len: usize) -> usize {
    (i + 2).min(len - 1)
}

/// Control points `[P0, P1, P2, P3]` for the segment starting at `i`.
///
/// Caller guarantees `i + 1 < points.len()`.
fn segment_controls(points: &[Waypoint], i: usize) -> [Waypoint; 4] {
    let n = points.len();
    [
        points[prev_index(i)],
        points[i],
        points[i + 1],
        points[next_next_index(i, n)],
    ]
}

// =============================================================================
// Smoothing
// =============================================================================

/// Smooth a waypoint sequence with the clamped Catmull-Rom spline.
///
/// - Fewer than 2 points are returned unchanged.
/// - `factor` of 0 or 1 emits no interior points, returning the input as-is.
/// - Otherwise the output has `(n - 1) * (factor - 1) + n` points.
///
/// NaN or infinite coordinates are not rejected; they propagate through
/// the arithmetic.
pub fn smooth_path(points: &[Waypoint], factor: u32) -> Vec<Waypoint> {
    let n = points.len();
    if n < 2 {
        return points.to_vec();
    }

    let interior = factor.saturating_sub(1) as usize;
    let mut smoothed = Vec::with_capacity(smoothed_len(n, factor));

    for i in 0..n - 1 {
        smoothed.push(points[i]);

        if interior > 0 {
            let controls = segment_controls(points, i);
            for t in 1..=interior {
                let s = t as f64 / factor as f64;
                smoothed.push(interpolate(controls, s));
            }
        }
    }
    smoothed.push(points[n - 1]);

    debug!(
        "[smoothing] {} waypoints -> {} points (factor {})",
        n,
        smoothed.len(),
        factor
    );

    smoothed
}

/// Number of points [`smooth_path`] produces for `n` inputs at `factor`.
pub fn smoothed_len(n: usize, factor: u32) -> usize {
    if n < 2 {
        return n;
    }
    (n - 1) * factor.saturating_sub(1) as usize + n
}

/// Run many independent paths through [`smooth_path`] using rayon.
#[cfg(feature = "parallel")]
pub fn smooth_paths_parallel(paths: &[Vec<Waypoint>], factor: u32) -> Vec<Vec<Waypoint>> {
    use rayon::prelude::*;

    paths
        .par_iter()
        .map(|points| smooth_path(points, factor))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn bucegi_route() -> Vec<Waypoint> {
        vec![
            Waypoint::new(45.30, 25.40),
            Waypoint::new(45.35, 25.45),
            Waypoint::new(45.32, 25.50),
        ]
    }

    #[test]
    fn test_empty_and_single_unchanged() {
        assert!(smooth_path(&[], 5).is_empty());

        let single = vec![Waypoint::new(45.4, 25.5)];
        assert_eq!(smooth_path(&single, 5), single);
        assert_eq!(smooth_path(&single, 8), single);
    }

    #[test]
    fn test_length_law_example() {
        let smoothed = smooth_path(&bucegi_route(), 5);
        assert_eq!(smoothed.len(), 11);
        assert_eq!(smoothed_len(3, 5), 11);
    }

    #[test]
    fn test_original_points_at_segment_starts() {
        let raw = bucegi_route();
        let smoothed = smooth_path(&raw, 5);
        assert_eq!(smoothed[0], raw[0]);
        assert_eq!(smoothed[5], raw[1]);
        assert_eq!(smoothed[10], raw[2]);
    }

    #[test]
    fn test_factor_one_and_zero_return_input() {
        let raw = bucegi_route();
        assert_eq!(smooth_path(&raw, 1), raw);
        assert_eq!(smooth_path(&raw, 0), raw);
    }

    #[test]
    fn test_two_points_is_straight_line() {
        // Clamped controls on both sides: P0 == P1 and P3 == P2.
        let raw = vec![Waypoint::new(0.0, 0.0), Waypoint::new(1.0, 2.0)];
        let smoothed = smooth_path(&raw, 4);
        assert_eq!(smoothed.len(), 5);

        // With P0 == P1 and P3 == P2 the curve is monotone along the chord.
        for w in smoothed.windows(2) {
            assert!(w[1].latitude > w[0].latitude);
            assert!(w[1].longitude > w[0].longitude);
        }
        // Midpoint is exactly on the chord by symmetry.
        assert!(approx_eq(smoothed[2].latitude, 0.5, 1e-12));
        assert!(approx_eq(smoothed[2].longitude, 1.0, 1e-12));
    }

    #[test]
    fn test_interior_point_matches_basis() {
        let raw = bucegi_route();
        let smoothed = smooth_path(&raw, 5);

        // First interior point of segment 0: controls P0=P0 (clamped), P1, P2, P3=P2.
        let [a0, a1, a2, a3] = catmull_rom_weights(0.2);
        let lat = a0 * 45.30 + a1 * 45.30 + a2 * 45.35 + a3 * 45.32;
        let lng = a0 * 25.40 + a1 * 25.40 + a2 * 25.45 + a3 * 25.50;
        assert_eq!(smoothed[1].latitude, lat);
        assert_eq!(smoothed[1].longitude, lng);
    }

    #[test]
    fn test_weights_at_known_parameters() {
        assert_eq!(catmull_rom_weights(0.0), [0.0, 1.0, 0.0, 0.0]);
        let end = catmull_rom_weights(1.0);
        assert!(approx_eq(end[0], 0.0, 1e-12));
        assert!(approx_eq(end[1], 0.0, 1e-12));
        assert!(approx_eq(end[2], 1.0, 1e-12));
        assert!(approx_eq(end[3], 0.0, 1e-12));

        let mid = catmull_rom_weights(0.5);
        assert!(approx_eq(mid[0], -0.0625, 1e-12));
        assert!(approx_eq(mid[1], 0.5625, 1e-12));
        assert!(approx_eq(mid[2], 0.5625, 1e-12));
        assert!(approx_eq(mid[3], -0.0625, 1e-12));
    }

    #[test]
    fn test_nan_propagates() {
        let raw = vec![
            Waypoint::new(45.0, 25.0),
            Waypoint::new(f64::NAN, 25.1),
            Waypoint::new(45.2, 25.2),
        ];
        let smoothed = smooth_path(&raw, 3);
        assert_eq!(smoothed.len(), 7);
        assert!(smoothed[1].latitude.is_nan());
        assert!(!smoothed[1].longitude.is_nan());
    }

    #[test]
    fn test_clamped_indices() {
        assert_eq!(prev_index(0), 0);
        assert_eq!(prev_index(3), 2);
        assert_eq!(next_next_index(0, 2), 1);
        assert_eq!(next_next_index(1, 5), 3);
        assert_eq!(next_next_index(3, 5), 4);
    }

    fn waypoints_strategy() -> impl Strategy<Value = Vec<Waypoint>> {
        prop::collection::vec((-89.0f64..89.0, -179.0f64..179.0), 0..40)
            .prop_map(|v| v.into_iter().map(|(lat, lng)| Waypoint::new(lat, lng)).collect())
    }

    proptest! {
        #[test]
        fn prop_partition_of_unity(s in 0.0f64..=1.0) {
            let sum: f64 = catmull_rom_weights(s).iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_length_and_endpoints(points in waypoints_strategy(), factor in 1u32..12) {
            let smoothed = smooth_path(&points, factor);
            prop_assert_eq!(smoothed.len(), smoothed_len(points.len(), factor));

            if points.len() >= 2 {
                prop_assert_eq!(
                    smoothed.len(),
                    (points.len() - 1) * (factor as usize - 1) + points.len()
                );
                prop_assert_eq!(smoothed[0], points[0]);
                prop_assert_eq!(smoothed[smoothed.len() - 1], points[points.len() - 1]);
            } else {
                prop_assert_eq!(&smoothed, &points);
            }
        }

        #[test]
        fn prop_deterministic(points in waypoints_strategy(), factor in 1u32..12) {
            let a = smooth_path(&points, factor);
            let b = smooth_path(&points, factor);
            prop_assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b.iter()) {
                prop_assert_eq!(x.latitude.to_bits(), y.latitude.to_bits());
                prop_assert_eq!(x.longitude.to_bits(), y.longitude.to_bits());
            }
        }
    }
}
