//! Spatial index over trails for "suggest trails in this area" queries.
//!
//! Each trail is indexed by the bounding box of its route (or its anchor
//! point when it has no waypoints). Area queries pre-filter by envelope
//! intersection in the R-tree, then measure the exact great-circle distance
//! from the query center to the nearest point of each candidate's route.

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

use crate::geo_utils::{closest_approach, haversine_distance, meters_to_degrees};
use crate::{Bounds, Difficulty, Trail, Waypoint};

/// Search radius used when the caller doesn't give one.
pub const DEFAULT_SUGGEST_RADIUS_KM: f64 = 5.0;

/// Poleward of this, `meters_to_degrees` underestimates longitude span, so
/// the search box covers every longitude.
const POLAR_LATITUDE: f64 = 84.0;

/// Bounding box of one indexed trail.
#[derive(Debug, Clone)]
struct TrailEnvelope {
    idx: usize,
    bounds: Bounds,
}

impl RTreeObject for TrailEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_envelope(&self.bounds)
    }
}

fn to_envelope(bounds: &Bounds) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [bounds.min_lng, bounds.min_lat],
        [bounds.max_lng, bounds.max_lat],
    )
}

/// A trail near the query point, with its closest approach in meters.
#[derive(Debug, Clone, Copy)]
pub struct TrailSuggestion<'a> {
    pub trail: &'a Trail,
    pub distance_meters: f64,
}

/// R-tree over a fixed set of trails.
pub struct TrailIndex {
    trails: Vec<Trail>,
    tree: RTree<TrailEnvelope>,
}

impl TrailIndex {
    pub fn new(trails: Vec<Trail>) -> Self {
        let envelopes: Vec<TrailEnvelope> = trails
            .iter()
            .enumerate()
            .map(|(idx, trail)| TrailEnvelope {
                idx,
                bounds: trail_bounds(trail),
            })
            .collect();

        debug!("[TrailIndex] Indexed {} trails", envelopes.len());

        Self {
            trails,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn trails(&self) -> &[Trail] {
        &self.trails
    }

    /// Trails passing within `radius_km` of `center`, nearest first.
    ///
    /// `difficulty` filters on [`Trail::effective_difficulty`].
    pub fn suggest_in_area(
        &self,
        center: Waypoint,
        radius_km: f64,
        difficulty: Option<Difficulty>,
    ) -> Vec<TrailSuggestion<'_>> {
        let radius_m = radius_km * 1000.0;
        let search = search_bounds(center, radius_m);

        let mut suggestions: Vec<TrailSuggestion<'_>> = self
            .tree
            .locate_in_envelope_intersecting(&to_envelope(&search))
            .map(|entry| &self.trails[entry.idx])
            .filter(|trail| difficulty.map_or(true, |d| trail.effective_difficulty() == d))
            .filter_map(|trail| {
                let distance_meters = distance_to_trail(&center, trail);
                (distance_meters <= radius_m).then_some(TrailSuggestion {
                    trail,
                    distance_meters,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));

        debug!(
            "[TrailIndex] {} trails within {:.1}km of ({:.4}, {:.4})",
            suggestions.len(),
            radius_km,
            center.latitude,
            center.longitude
        );

        suggestions
    }

    /// Trails whose bounding box intersects `bounds`, in insertion order.
    pub fn in_bounds(&self, bounds: &Bounds) -> Vec<&Trail> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_envelope(bounds))
            .map(|entry| entry.idx)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|idx| &self.trails[idx]).collect()
    }
}

/// Box around `center` that contains every point within `radius_m`.
fn search_bounds(center: Waypoint, radius_m: f64) -> Bounds {
    let mut bounds = Bounds {
        min_lat: center.latitude,
        max_lat: center.latitude,
        min_lng: center.longitude,
        max_lng: center.longitude,
    }
    .expanded(meters_to_degrees(radius_m, center.latitude));

    if center.latitude.abs() >= POLAR_LATITUDE {
        bounds.min_lng = -180.0;
        bounds.max_lng = 180.0;
    }
    bounds
}

fn trail_bounds(trail: &Trail) -> Bounds {
    trail.route().bounds().unwrap_or_else(|| {
        let anchor = trail.anchor();
        Bounds {
            min_lat: anchor.latitude,
            max_lat: anchor.latitude,
            min_lng: anchor.longitude,
            max_lng: anchor.longitude,
        }
    })
}

fn distance_to_trail(center: &Waypoint, trail: &Trail) -> f64 {
    closest_approach(center, trail.route().waypoints())
        .unwrap_or_else(|| haversine_distance(center, &trail.anchor()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Route;

    fn bucegi_trails() -> Vec<Trail> {
        let mut piatra_arsa = Trail::new("Piatra Arsă", Waypoint::new(45.35, 25.50)).with_route(
            Route::from_coords(&[[45.33, 25.48], [45.36, 25.50], [45.38, 25.52]]),
        );
        piatra_arsa.difficulty = Some(Difficulty::Medium);

        let mut omu = Trail::new("Vârful Omu", Waypoint::new(45.4456, 25.4567)).with_route(
            Route::from_coords(&[[45.42, 25.48], [45.44, 25.46], [45.4456, 25.4567]]),
        );
        omu.difficulty = Some(Difficulty::Hard);

        // No route: indexed at its anchor.
        let babele = Trail::new("Babele", Waypoint::new(45.405, 25.474));

        // Far away: Retezat.
        let retezat = Trail::new("Peleaga", Waypoint::new(45.36, 22.89))
            .with_route(Route::from_coords(&[[45.35, 22.88], [45.37, 22.90]]));

        vec![piatra_arsa, omu, babele, retezat]
    }

    #[test]
    fn test_suggest_nearest_first() {
        let index = TrailIndex::new(bucegi_trails());
        assert_eq!(index.len(), 4);

        let hits = index.suggest_in_area(Waypoint::new(45.40, 25.48), 10.0, None);
        let names: Vec<&str> = hits.iter().map(|s| s.trail.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"Babele"));
        assert!(names.contains(&"Vârful Omu"));
        assert!(names.contains(&"Piatra Arsă"));
        assert!(!names.contains(&"Peleaga"));

        for w in hits.windows(2) {
            assert!(w[0].distance_meters <= w[1].distance_meters);
        }
    }

    #[test]
    fn test_suggest_filters_difficulty() {
        let index = TrailIndex::new(bucegi_trails());
        let hits = index.suggest_in_area(Waypoint::new(45.40, 25.48), 10.0, Some(Difficulty::Hard));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].trail.name, "Vârful Omu");
    }

    #[test]
    fn test_suggest_radius_is_exact() {
        let index = TrailIndex::new(bucegi_trails());
        // Piatra Arsă passes through (45.36, 25.50); 1 km radius around it
        // must not pick up Omu (~7 km away).
        let hits = index.suggest_in_area(Waypoint::new(45.36, 25.50), 1.0, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].trail.name, "Piatra Arsă");
        assert!(hits[0].distance_meters < 1.0);
    }

    #[test]
    fn test_in_bounds() {
        let index = TrailIndex::new(bucegi_trails());
        let bucegi = Bounds { min_lat: 45.30, max_lat: 45.50, min_lng: 25.40, max_lng: 25.60 };
        let names: Vec<&str> = index.in_bounds(&bucegi).iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Piatra Arsă", "Vârful Omu", "Babele"]);
    }

    #[test]
    fn test_suggest_near_pole() {
        // Same parallel, 10° of longitude apart: ~97 km along the ground but
        // wider than the degree box a 100 km radius gives at 85°N.
        let index = TrailIndex::new(vec![Trail::new("Svalbard north", Waypoint::new(85.0, 0.0))]);
        let hits = index.suggest_in_area(Waypoint::new(85.0, 10.0), 100.0, None);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance_meters < 100_000.0);

        let search = search_bounds(Waypoint::new(-86.0, 40.0), 1_000.0);
        assert_eq!((search.min_lng, search.max_lng), (-180.0, 180.0));
        let search = search_bounds(Waypoint::new(45.0, 25.0), 1_000.0);
        assert!(search.max_lng - search.min_lng < 0.1);
    }

    #[test]
    fn test_empty_index() {
        let index = TrailIndex::new(Vec::new());
        assert!(index.is_empty());
        assert!(index
            .suggest_in_area(Waypoint::new(45.0, 25.0), DEFAULT_SUGGEST_RADIUS_KM, None)
            .is_empty());
    }
}
