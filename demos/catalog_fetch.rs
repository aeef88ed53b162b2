//! Fetch trails from a running catalog service and compute their geometry.
//! Run with: cargo run --example catalog_fetch --features http -- http://localhost:8081

use std::sync::Arc;
use std::time::Instant;

use trail_geometry::http::ProgressCallback;
use trail_geometry::{GeometryConfig, TrailCatalogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8081".to_string());

    let client = TrailCatalogClient::new(&base_url)?;
    let config = GeometryConfig::default();

    let start = Instant::now();
    let trails = client.fetch_trails().await?;
    println!("Fetched {} trails from {} in {:?}", trails.len(), base_url, start.elapsed());

    let ids: Vec<String> = trails.iter().filter_map(|t| t.id.clone()).collect();
    let progress: ProgressCallback = Arc::new(|done, total| {
        if done == total || done % 10 == 0 {
            println!("  {}/{}", done, total);
        }
    });

    let start = Instant::now();
    let results = client.fetch_trail_geometries(ids, &config, Some(progress)).await;
    println!("Detail fetch took {:?}\n", start.elapsed());

    for result in &results {
        match (&result.geometry, &result.error) {
            (Some(geometry), _) => println!(
                "{:<40} {:>4} pts  zoom {}",
                result.name.as_deref().unwrap_or(&result.id),
                geometry.smoothed.len(),
                geometry.viewport.zoom
            ),
            (None, Some(err)) => println!("{:<40} FAILED: {}", result.id, err),
            (None, None) => {}
        }
    }

    Ok(())
}
