//! Basic example: smooth a trail route and fit a map viewport to it.
//!
//! Run with: cargo run --example trail_geometry

use trail_geometry::{
    export, parse_trails, zoom_for_extent, GeometryConfig, TrailIndex, Waypoint,
};

const CATALOG: &str = r#"[
    {
        "name": "Sinaia - Cabana Piatra Arsă",
        "distance": 12.5,
        "elevationGain": 1100,
        "latitude": 45.35,
        "longitude": 25.55,
        "waypoints": [[45.30, 25.40], [45.35, 25.45], [45.32, 25.50]]
    },
    {
        "name": "Busteni - Vârful Omu",
        "distance": 14.0,
        "elevationGain": 1650,
        "maxSlope": 42.0,
        "latitude": 45.4456,
        "longitude": 25.4567,
        "waypoints": [[45.41, 25.53], [45.42, 25.50], [45.44, 25.46], [45.4456, 25.4567]]
    },
    {
        "name": "Babele",
        "latitude": 45.405,
        "longitude": 25.474
    }
]"#;

fn main() {
    let trails = parse_trails(CATALOG).expect("catalog JSON is valid");
    let config = GeometryConfig::default();

    println!("Trail Geometry Examples\n");
    println!("Config: smoothing_factor={}\n", config.smoothing_factor);

    for (i, trail) in trails.iter().enumerate() {
        let geometry = trail.geometry(&config);
        println!("{}. {}", i + 1, trail.name);
        println!(
            "   {} waypoints -> {} smoothed points",
            trail.route().len(),
            geometry.smoothed.len()
        );
        println!(
            "   Viewport: center ({:.4}, {:.4}), zoom {}",
            geometry.viewport.center.latitude,
            geometry.viewport.center.longitude,
            geometry.viewport.zoom
        );
        println!(
            "   Difficulty: {:?}, ~{} min\n",
            trail.effective_difficulty(),
            trail.effective_duration_minutes()
        );
    }

    println!("Zoom ladder:");
    for extent in [0.05, 0.12, 0.18, 0.25, 0.5] {
        println!("  extent {:.2} deg -> zoom {}", extent, zoom_for_extent(extent));
    }

    let index = TrailIndex::new(trails);
    let center = Waypoint::new(45.40, 25.48);
    println!("\nTrails within 5 km of ({}, {}):", center.latitude, center.longitude);
    for suggestion in index.suggest_in_area(center, 5.0, None) {
        println!("  {} ({:.0}m)", suggestion.trail.name, suggestion.distance_meters);
    }

    let collection = export::to_geojson_collection(index.trails(), &config);
    println!(
        "\nGeoJSON: {} bytes",
        serde_json::to_string(&collection).map(|s| s.len()).unwrap_or(0)
    );
}
