//! Batch smoothing with rayon.
//!
//! Run with: cargo run --release --example batch_smoothing --features parallel

use std::time::Instant;

use trail_geometry::smoothing::{smooth_path, smooth_paths_parallel};
use trail_geometry::{compute_geometries_parallel, GeometryConfig, Route, Waypoint};

fn synthetic_route(seed: usize, len: usize) -> Vec<Waypoint> {
    (0..len)
        .map(|i| {
            let t = i as f64 / len as f64;
            Waypoint::new(
                45.0 + seed as f64 * 0.001 + t * 0.2,
                25.0 + (t * 12.0).sin() * 0.05,
            )
        })
        .collect()
}

fn main() {
    let paths: Vec<Vec<Waypoint>> = (0..1_000).map(|seed| synthetic_route(seed, 200)).collect();
    let factor = 8;

    let start = Instant::now();
    let sequential: Vec<Vec<Waypoint>> = paths.iter().map(|p| smooth_path(p, factor)).collect();
    let sequential_time = start.elapsed();

    let start = Instant::now();
    let parallel = smooth_paths_parallel(&paths, factor);
    let parallel_time = start.elapsed();

    assert_eq!(sequential, parallel);
    let total: usize = parallel.iter().map(Vec::len).sum();

    println!("Smoothed {} paths ({} output points)", paths.len(), total);
    println!("  sequential: {:?}", sequential_time);
    println!("  parallel:   {:?}", parallel_time);

    let routes: Vec<(Route, Waypoint)> = paths
        .into_iter()
        .map(|p| (Route::new(p), Waypoint::new(45.0, 25.0)))
        .collect();

    let start = Instant::now();
    let config = GeometryConfig { smoothing_factor: factor };
    let geometries = compute_geometries_parallel(&routes, &config);
    println!(
        "Computed {} route geometries in {:?} (first zoom: {})",
        geometries.len(),
        start.elapsed(),
        geometries.first().map(|g| g.viewport.zoom).unwrap_or_default()
    );
}
