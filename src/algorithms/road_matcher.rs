// src/algorithms/road_matcher.rs

use crate::geo;
use crate::models::RoadSegment;

/// Matches GPS positions to the nearest road segment.
///
/// Holds a snapshot of the road table; callers call [`RoadMatcher::load_roads`]
/// again whenever roads change.
#[derive(Debug, Default, Clone)]
pub struct RoadMatcher {
    roads: Vec<RoadSegment>,
}

impl RoadMatcher {
    pub fn new(roads: Vec<RoadSegment>) -> Self {
        Self { roads }
    }

    pub fn load_roads(&mut self, roads: Vec<RoadSegment>) {
        self.roads = roads;
    }

    pub fn roads(&self) -> &[RoadSegment] {
        &self.roads
    }

    pub fn distance_to_road(lng: f64, lat: f64, road: &RoadSegment) -> f64 {
        geo::point_to_segment_km(
            lng,
            lat,
            road.start_lng,
            road.start_lat,
            road.end_lng,
            road.end_lat,
        )
    }

    /// Closest road and its distance in km, or `None` when no roads are loaded.
    pub fn find_nearest_road(&self, lng: f64, lat: f64) -> Option<(&RoadSegment, f64)> {
        self.roads
            .iter()
            .map(|road| (road, Self::distance_to_road(lng, lat, road)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Nearest road within `tolerance_km`.
    pub fn match_road(&self, lng: f64, lat: f64, tolerance_km: f64) -> Option<&RoadSegment> {
        self.find_nearest_road(lng, lat)
            .filter(|(_, distance)| *distance <= tolerance_km)
            .map(|(road, _)| road)
    }

    pub fn find_roads_in_radius(&self, lng: f64, lat: f64, radius_km: f64) -> Vec<&RoadSegment> {
        self.roads
            .iter()
            .filter(|road| Self::distance_to_road(lng, lat, road) <= radius_km)
            .collect()
    }

    /// Heading of the road from its start to its end, degrees in `[0, 360)`.
    pub fn road_direction(road: &RoadSegment) -> f64 {
        geo::bearing_deg(road.start_lng, road.start_lat, road.end_lng, road.end_lat)
    }

    pub fn is_vehicle_on_road(lng: f64, lat: f64, road: &RoadSegment, tolerance_km: f64) -> bool {
        Self::distance_to_road(lng, lat, road) <= tolerance_km
    }
}
