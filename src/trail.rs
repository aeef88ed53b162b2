//! Trail records as served by the trail catalog (`GET /api/v1/trails`),
//! plus difficulty inference and duration estimates.
//!
//! Only `name`, `latitude` and `longitude` are required; everything else the
//! catalog may omit. `latitude`/`longitude` is the trail's nominal anchor,
//! used to center the map when the trail has no waypoints.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{GeometryConfig, Result, Route, RouteGeometry, RouteMetrics, RouteProfile, Waypoint};

/// Average hiking speed on the flat, km/h.
const FLAT_SPEED_KMH: f64 = 3.0;
/// Extra minutes per `CLIMB_STEP_M` of ascent.
const CLIMB_PENALTY_MIN: f64 = 30.0;
const CLIMB_STEP_M: f64 = 300.0;

// ============================================================================
// Difficulty
// ============================================================================

/// Trail difficulty, aligned with OSM hiking route grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Alpine,
    Scrambling,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Alpine,
        Difficulty::Scrambling,
    ];

    /// Maximum slope for this grade, in percent.
    pub fn max_slope_threshold(self) -> f64 {
        match self {
            Difficulty::Easy => 10.0,
            Difficulty::Medium => 20.0,
            Difficulty::Hard => 30.0,
            Difficulty::Alpine => 40.0,
            Difficulty::Scrambling => 50.0,
        }
    }

    /// Maximum elevation gain for this grade, in meters.
    pub fn max_elevation_gain_threshold(self) -> i32 {
        match self {
            Difficulty::Easy => 500,
            Difficulty::Medium => 1500,
            Difficulty::Hard => 2500,
            Difficulty::Alpine => 3000,
            Difficulty::Scrambling => 3500,
        }
    }

    /// Catalog tag, as it appears in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "EASY",
            Difficulty::Medium => "MEDIUM",
            Difficulty::Hard => "HARD",
            Difficulty::Alpine => "ALPINE",
            Difficulty::Scrambling => "SCRAMBLING",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy - Minimal elevation, well-maintained paths",
            Difficulty::Medium => "Moderate - Some elevation, occasional rocky sections",
            Difficulty::Hard => "Hard - Significant elevation, exposed terrain",
            Difficulty::Alpine => "Alpine - High altitude, thin air, exposed ridges",
            Difficulty::Scrambling => "Scrambling - Hands required, technical terrain",
        }
    }

    /// Infer a grade from trail metrics when none is declared.
    ///
    /// Slope is checked before elevation gain: a short but steep trail is
    /// graded by its steepest part. Missing metrics give `Medium`.
    pub fn infer_from_metrics(elevation_gain: Option<i32>, max_slope: Option<f64>) -> Self {
        let (Some(gain), Some(slope)) = (elevation_gain, max_slope) else {
            return Difficulty::Medium;
        };

        if slope > Difficulty::Scrambling.max_slope_threshold() {
            return Difficulty::Scrambling;
        }
        if slope > Difficulty::Alpine.max_slope_threshold() {
            return Difficulty::Alpine;
        }
        if slope > Difficulty::Hard.max_slope_threshold() {
            return Difficulty::Hard;
        }

        if gain > Difficulty::Alpine.max_elevation_gain_threshold() {
            return Difficulty::Alpine;
        }
        if gain > Difficulty::Hard.max_elevation_gain_threshold() {
            return Difficulty::Hard;
        }
        if gain > Difficulty::Medium.max_elevation_gain_threshold() {
            return Difficulty::Medium;
        }

        Difficulty::Easy
    }

    /// Map an OSM `hiking:difficulty`-style tag. Unknown values give `Medium`.
    pub fn from_osm_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "easy" | "simple" => Difficulty::Easy,
            "moderate" | "medium" => Difficulty::Medium,
            "difficult" | "hard" => Difficulty::Hard,
            "very_difficult" | "alpine" => Difficulty::Alpine,
            "scrambling" | "rock_climbing" => Difficulty::Scrambling,
            _ => Difficulty::Medium,
        }
    }

    /// Whether both metrics are present and within this grade's limits.
    pub fn matches(self, elevation_gain: Option<i32>, max_slope: Option<f64>) -> bool {
        match (elevation_gain, max_slope) {
            (Some(gain), Some(slope)) => {
                gain <= self.max_elevation_gain_threshold() && slope <= self.max_slope_threshold()
            }
            _ => false,
        }
    }
}

// ============================================================================
// Terrain-aware classification
// ============================================================================

/// Terrain tags that make a trail `Scrambling` regardless of its numbers.
const CLIMBING_TERRAIN: &[&str] = &["scramble", "technical_climbing", "via_ferrata"];
/// Terrain tags that rule out `Easy`.
const NOT_EASY_TERRAIN: &[&str] = &["scramble", "exposed_ridge", "via_ferrata"];
/// Terrain tags that rule out `Medium`.
const NOT_MEDIUM_TERRAIN: &[&str] = &["via_ferrata", "technical_climbing"];
/// Max slope (percent) above which a trail is `Scrambling`.
const SCRAMBLING_SLOPE: f64 = 60.0;

/// Upper limits for one grade; `None` means the metric isn't checked.
struct GradeLimits {
    distance_km: f64,
    elevation_gain: i32,
    avg_slope: f64,
    max_slope: Option<f64>,
    forbidden_terrain: &'static [&'static str],
}

const EASY_LIMITS: GradeLimits = GradeLimits {
    distance_km: 15.0,
    elevation_gain: 500,
    avg_slope: 10.0,
    max_slope: None,
    forbidden_terrain: NOT_EASY_TERRAIN,
};

const MEDIUM_LIMITS: GradeLimits = GradeLimits {
    distance_km: 30.0,
    elevation_gain: 1200,
    avg_slope: 15.0,
    max_slope: Some(30.0),
    forbidden_terrain: NOT_MEDIUM_TERRAIN,
};

const HARD_LIMITS: GradeLimits = GradeLimits {
    distance_km: 50.0,
    elevation_gain: 2000,
    avg_slope: 20.0,
    max_slope: Some(50.0),
    forbidden_terrain: &[],
};

fn has_terrain(trail: &Trail, tags: &[&str]) -> bool {
    trail
        .terrain
        .iter()
        .any(|t| tags.iter().any(|tag| t.eq_ignore_ascii_case(tag)))
}

impl GradeLimits {
    /// Every checked metric must be known and within its limit.
    fn admits(&self, trail: &Trail) -> bool {
        let within = |value: Option<f64>, limit: f64| value.is_some_and(|v| v <= limit);

        within(trail.effective_distance_km(), self.distance_km)
            && trail.effective_elevation_gain().is_some_and(|g| g <= self.elevation_gain)
            && within(trail.effective_avg_slope(), self.avg_slope)
            && self.max_slope.map_or(true, |limit| within(trail.effective_max_slope(), limit))
            && !has_terrain(trail, self.forbidden_terrain)
    }
}

/// Grade a trail from its terrain tags and metrics.
///
/// Climbing terrain or a max slope over 60 % gives `Scrambling`. Otherwise
/// the most restrictive grade whose limits all hold wins, checked
/// `Easy`, `Medium`, `Hard` in turn; a trail that fits none (or lacks the
/// metrics to decide) is `Hard`. Never returns `Alpine`.
pub fn classify_difficulty(trail: &Trail) -> Difficulty {
    if has_terrain(trail, CLIMBING_TERRAIN)
        || trail.effective_max_slope().is_some_and(|s| s > SCRAMBLING_SLOPE)
    {
        return Difficulty::Scrambling;
    }

    [
        (Difficulty::Easy, &EASY_LIMITS),
        (Difficulty::Medium, &MEDIUM_LIMITS),
        (Difficulty::Hard, &HARD_LIMITS),
    ]
    .into_iter()
    .find(|(_, limits)| limits.admits(trail))
    .map_or(Difficulty::Hard, |(grade, _)| grade)
}

/// Estimated walking time in minutes: 3 km/h on the flat plus 30 minutes
/// per 300 m of ascent, truncated. Zero when the distance is unknown or zero.
pub fn estimate_duration_minutes(distance_km: Option<f64>, elevation_gain_m: Option<i32>) -> u32 {
    let distance = match distance_km {
        Some(d) if d > 0.0 => d,
        _ => return 0,
    };

    let base = distance / FLAT_SPEED_KMH * 60.0;
    let climb = match elevation_gain_m {
        Some(gain) if gain > 0 => gain as f64 / CLIMB_STEP_M * CLIMB_PENALTY_MIN,
        _ => 0.0,
    };

    (base + climb) as u32
}

// ============================================================================
// Trail
// ============================================================================

/// A trail record from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Length in kilometers, as declared by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_loss: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    /// Percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_slope: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_slope: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elevation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub terrain: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub hazards: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Route::is_empty")]
    pub waypoints: Route,
    /// Altitude in meters per waypoint; empty when unknown.
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub elevations: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The catalog sends `null` for absent collections as well as omitting them.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Trail {
    /// Minimal trail at an anchor point; remaining fields empty.
    pub fn new(name: impl Into<String>, anchor: Waypoint) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            distance: None,
            elevation_gain: None,
            elevation_loss: None,
            duration_minutes: None,
            max_slope: None,
            avg_slope: None,
            max_elevation: None,
            difficulty: None,
            terrain: Vec::new(),
            hazards: Vec::new(),
            latitude: anchor.latitude,
            longitude: anchor.longitude,
            waypoints: Route::default(),
            elevations: Vec::new(),
            source: None,
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.waypoints = route;
        self.elevations.clear();
        self
    }

    /// Set the route together with its elevation samples.
    pub fn with_profile(mut self, profile: RouteProfile) -> Self {
        self.waypoints = profile.route;
        self.elevations = profile.elevations;
        self
    }

    /// Nominal location, used as the viewport fallback.
    pub fn anchor(&self) -> Waypoint {
        Waypoint::new(self.latitude, self.longitude)
    }

    pub fn route(&self) -> &Route {
        &self.waypoints
    }

    /// Smoothed path and framing viewport for this trail.
    pub fn geometry(&self, config: &GeometryConfig) -> RouteGeometry {
        RouteGeometry::compute(&self.waypoints, self.anchor(), config)
    }

    /// Metrics from the route and its elevations, when every waypoint has one.
    pub fn route_metrics(&self) -> Option<RouteMetrics> {
        let elevated = !self.waypoints.is_empty() && self.elevations.len() == self.waypoints.len();
        elevated.then(|| RouteMetrics::compute(self.waypoints.waypoints(), &self.elevations))
    }

    /// Declared distance, else the length of the route (2+ waypoints).
    pub fn effective_distance_km(&self) -> Option<f64> {
        self.distance.or_else(|| {
            (self.waypoints.len() >= 2).then(|| self.waypoints.length_meters() / 1000.0)
        })
    }

    /// Declared elevation gain, else the gain along the elevated route.
    pub fn effective_elevation_gain(&self) -> Option<i32> {
        self.elevation_gain.or_else(|| self.route_metrics().map(|m| m.elevation_gain))
    }

    pub fn effective_max_slope(&self) -> Option<f64> {
        self.max_slope.or_else(|| self.route_metrics().map(|m| m.max_slope))
    }

    pub fn effective_avg_slope(&self) -> Option<f64> {
        self.avg_slope.or_else(|| self.route_metrics().map(|m| m.avg_slope))
    }

    /// Declared difficulty, or one inferred from elevation gain and slope.
    pub fn effective_difficulty(&self) -> Difficulty {
        self.difficulty.unwrap_or_else(|| {
            Difficulty::infer_from_metrics(
                self.effective_elevation_gain(),
                self.effective_max_slope(),
            )
        })
    }

    /// Declared duration, or the estimate from distance and ascent.
    pub fn effective_duration_minutes(&self) -> u32 {
        self.duration_minutes.unwrap_or_else(|| {
            estimate_duration_minutes(
                self.effective_distance_km(),
                self.effective_elevation_gain(),
            )
        })
    }
}

/// Parse a `GET /api/v1/trails` response body.
pub fn parse_trails(json: &str) -> Result<Vec<Trail>> {
    Ok(serde_json::from_str(json)?)
}

/// Geometry for every trail, in input order. Uses rayon when the
/// `parallel` feature is enabled.
pub fn compute_trail_geometries(trails: &[Trail], config: &GeometryConfig) -> Vec<RouteGeometry> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        trails.par_iter().map(|t| t.geometry(config)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        trails.iter().map(|t| t.geometry(config)).collect()
    }
}
