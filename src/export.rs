//! GeoJSON and GPX export, GPX import.
//!
//! GeoJSON carries the *smoothed* path (it is what a web map draws) along
//! with the fitted viewport; GPX carries the *raw* waypoints, since GPS
//! devices do their own interpolation.

use std::io::Read;

use geo::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint as GpxPoint};
use log::{debug, info};
use serde_json::{json, Map, Value};

use crate::{GeometryConfig, Result, Route, RouteProfile, Trail, TrailGeometryError, Waypoint};

const GPX_CREATOR: &str = "trail-geometry";

// ============================================================================
// GeoJSON
// ============================================================================

/// `[lng, lat]` position, GeoJSON axis order.
fn position(w: &Waypoint) -> Value {
    json!([w.longitude, w.latitude])
}

/// LineString of the smoothed path, or a Point when there is nothing to draw
/// a line through (a LineString needs two positions).
fn geometry_value(smoothed: &[Waypoint], anchor: Waypoint) -> Value {
    match smoothed {
        [] => json!({ "type": "Point", "coordinates": position(&anchor) }),
        [only] => json!({ "type": "Point", "coordinates": position(only) }),
        points => json!({
            "type": "LineString",
            "coordinates": points.iter().map(position).collect::<Vec<_>>(),
        }),
    }
}

fn insert_opt<T: Into<Value>>(props: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(v) = value {
        props.insert(key.to_string(), v.into());
    }
}

/// Export one trail as a GeoJSON `Feature`.
pub fn to_geojson_feature(trail: &Trail, config: &GeometryConfig) -> Value {
    let geometry = trail.geometry(config);

    let mut props = Map::new();
    insert_opt(&mut props, "id", trail.id.clone());
    props.insert("name".into(), trail.name.clone().into());
    insert_opt(&mut props, "description", trail.description.clone());
    insert_opt(&mut props, "distance", trail.distance);
    insert_opt(&mut props, "elevationGain", trail.elevation_gain);
    insert_opt(&mut props, "elevationLoss", trail.elevation_loss);
    insert_opt(&mut props, "maxSlope", trail.max_slope);
    insert_opt(&mut props, "avgSlope", trail.avg_slope);
    props.insert("difficulty".into(), trail.effective_difficulty().as_str().into());
    props.insert("durationMinutes".into(), trail.effective_duration_minutes().into());
    insert_opt(&mut props, "source", trail.source.clone());
    if !trail.terrain.is_empty() {
        props.insert("terrain".into(), trail.terrain.clone().into());
    }
    if !trail.hazards.is_empty() {
        props.insert("hazards".into(), trail.hazards.clone().into());
    }
    props.insert(
        "center".into(),
        json!([geometry.viewport.center.latitude, geometry.viewport.center.longitude]),
    );
    props.insert("zoom".into(), geometry.viewport.zoom.into());

    json!({
        "type": "Feature",
        "properties": props,
        "geometry": geometry_value(&geometry.smoothed, trail.anchor()),
    })
}

/// Export trails as a GeoJSON `FeatureCollection`.
pub fn to_geojson_collection(trails: &[Trail], config: &GeometryConfig) -> Value {
    let features: Vec<Value> = trails
        .iter()
        .map(|trail| to_geojson_feature(trail, config))
        .collect();

    debug!("[export] GeoJSON collection with {} features", features.len());

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

// ============================================================================
// GPX
// ============================================================================

fn gpx_point(w: &Waypoint) -> GpxPoint {
    GpxPoint::new(Point::new(w.longitude, w.latitude))
}

fn trail_track(trail: &Trail) -> Track {
    let waypoints = trail.route().waypoints();
    let elevations = (trail.elevations.len() == waypoints.len()).then_some(&trail.elevations);

    let mut segment = TrackSegment::new();
    segment.points = waypoints
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let mut point = gpx_point(w);
            point.elevation = elevations.map(|e| e[i]);
            point
        })
        .collect();

    let mut track = Track::new();
    track.name = Some(trail.name.clone());
    track.description = trail.description.clone();
    track.source = trail.source.clone();
    track.segments.push(segment);
    track
}

/// Export trails as a GPX 1.1 document: one track per trail over the raw
/// waypoints (with `<ele>` when the trail has elevations), plus a named
/// `<wpt>` at each trail's anchor.
pub fn to_gpx(trails: &[Trail]) -> Result<String> {
    let mut doc = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(GPX_CREATOR.to_string()),
        ..Default::default()
    };

    for trail in trails {
        doc.tracks.push(trail_track(trail));

        let mut anchor = gpx_point(&trail.anchor());
        anchor.name = Some(trail.name.clone());
        doc.waypoints.push(anchor);
    }

    let mut buf = Vec::new();
    gpx::write(&doc, &mut buf)?;

    info!("[export] GPX with {} tracks, {} bytes", doc.tracks.len(), buf.len());

    Ok(String::from_utf8(buf)?)
}

/// Read a route and its elevations from GPX: all segments of the first
/// track, concatenated. Documents without tracks fall back to the first
/// `<rte>`.
///
/// Elevations are kept only when every point carries `<ele>`.
pub fn profile_from_gpx<R: Read>(reader: R) -> Result<RouteProfile> {
    let doc = gpx::read(reader)?;

    let points: Vec<&GpxPoint> = if let Some(track) = doc.tracks.first() {
        track
            .segments
            .iter()
            .flat_map(|segment| segment.points.iter())
            .collect()
    } else if let Some(rte) = doc.routes.first() {
        rte.points.iter().collect()
    } else {
        Vec::new()
    };

    if points.is_empty() {
        return Err(TrailGeometryError::EmptyGpx);
    }

    let waypoints: Vec<Waypoint> = points
        .iter()
        .map(|p| {
            let point = p.point();
            Waypoint::new(point.y(), point.x())
        })
        .collect();
    let elevations: Vec<f64> = points.iter().map_while(|p| p.elevation).collect();

    debug!(
        "[export] Read {} points ({} with elevation) from GPX",
        waypoints.len(),
        elevations.len()
    );
    Ok(RouteProfile::new(Route::new(waypoints), elevations))
}

/// Read just the route from GPX; see [`profile_from_gpx`].
pub fn route_from_gpx<R: Read>(reader: R) -> Result<Route> {
    Ok(profile_from_gpx(reader)?.route)
}
