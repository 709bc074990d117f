// src/services/road_service.rs

use crate::algorithms::{CongestionCalculator, RoadMatcher};
use crate::error::{Result, TrafficError};
use crate::models::{NearbyRoad, RoadSegment, RoadSegmentParams};
use crate::repositories::{GpsRepository, RoadRepository};
use crate::shared_data::{lock, read_lock, write_lock};
use std::sync::{Arc, Mutex, RwLock};

fn validate_coordinate(lng: f64, lat: f64, which: &str) -> Result<()> {
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(TrafficError::Validation(format!(
            "Road {which} point ({lng}, {lat}) is outside valid coordinates"
        )));
    }
    Ok(())
}

pub fn validate_road(params: &RoadSegmentParams) -> Result<()> {
    if params.name.trim().is_empty() {
        return Err(TrafficError::Validation("Road name cannot be empty".into()));
    }
    if params.max_speed == 0 {
        return Err(TrafficError::Validation("Road speed limit must be positive".into()));
    }
    if params.capacity == 0 {
        return Err(TrafficError::Validation("Road capacity must be positive".into()));
    }
    if matches!(params.length, Some(length) if !(length >= 0.0)) {
        return Err(TrafficError::Validation("Road length cannot be negative".into()));
    }
    validate_coordinate(params.start_lng, params.start_lat, "start")?;
    validate_coordinate(params.end_lng, params.end_lat, "end")
}

/// Road CRUD. Every change is pushed to the shared road matcher.
#[derive(Debug)]
pub struct RoadService {
    roads: Arc<RoadRepository>,
    gps: Arc<GpsRepository>,
    matcher: Arc<RwLock<RoadMatcher>>,
    congestion: Arc<Mutex<CongestionCalculator>>,
}

impl RoadService {
    pub fn new(
        roads: Arc<RoadRepository>,
        gps: Arc<GpsRepository>,
        matcher: Arc<RwLock<RoadMatcher>>,
        congestion: Arc<Mutex<CongestionCalculator>>,
    ) -> Self {
        let service = Self {
            roads,
            gps,
            matcher,
            congestion,
        };
        write_lock(&service.matcher).load_roads(service.roads.get_all());
        service
    }

    /// Runs a repository change with the matcher locked, then reloads it.
    /// Holding the lock across both keeps concurrent edits from installing
    /// a stale road list after a newer one.
    fn with_matcher<T>(&self, change: impl FnOnce(&RoadRepository) -> Result<T>) -> Result<T> {
        let mut matcher = write_lock(&self.matcher);
        let changed = change(&self.roads)?;
        matcher.load_roads(self.roads.get_all());
        Ok(changed)
    }

    pub fn list(&self) -> Vec<RoadSegment> {
        self.roads.get_all()
    }

    pub fn get(&self, id: u64) -> Result<RoadSegment> {
        self.roads.get_by_id(id)
    }

    pub fn create(&self, params: RoadSegmentParams) -> Result<RoadSegment> {
        validate_road(&params)?;
        let road = self.with_matcher(|roads| Ok(roads.create(params.into())))?;
        log::info!("Road {:?} '{}' created", road.id, road.name);
        Ok(road)
    }

    pub fn update(&self, id: u64, params: RoadSegmentParams) -> Result<RoadSegment> {
        validate_road(&params)?;
        let road = self.with_matcher(|roads| roads.update(id, params.into()))?;
        log::info!("Road {} updated", id);
        Ok(road)
    }

    /// Deletes the road and unlinks the samples that referenced it.
    pub fn delete(&self, id: u64) -> Result<()> {
        let road = self.with_matcher(|roads| roads.delete(id))?;
        let unlinked = self.gps.clear_road(id);
        lock(&self.congestion).forget(id);
        log::info!(
            "Road {} '{}' deleted, {} GPS samples unlinked",
            id,
            road.name,
            unlinked
        );
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.roads.count()
    }

    /// Roads within `radius_km` of the position, nearest first. `on_road`
    /// uses `tolerance_km`, the same distance ingestion matches with.
    pub fn nearby(
        &self,
        lng: f64,
        lat: f64,
        radius_km: f64,
        tolerance_km: f64,
    ) -> Result<Vec<NearbyRoad>> {
        validate_coordinate(lng, lat, "search")
            .map_err(|e| TrafficError::BadRequest(e.to_string()))?;
        if !(radius_km > 0.0) || !radius_km.is_finite() {
            return Err(TrafficError::BadRequest(format!(
                "radius must be a positive number of km, got {radius_km}"
            )));
        }

        let matcher = read_lock(&self.matcher);
        let mut found: Vec<NearbyRoad> = matcher
            .find_roads_in_radius(lng, lat, radius_km)
            .into_iter()
            .map(|road| {
                let (center_lng, center_lat) = road.center_point();
                NearbyRoad {
                    distance_km: RoadMatcher::distance_to_road(lng, lat, road),
                    direction: RoadMatcher::road_direction(road),
                    on_road: RoadMatcher::is_vehicle_on_road(lng, lat, road, tolerance_km),
                    within_bounds: road.contains_point(lng, lat),
                    length_km: road.length_km(),
                    center_lng,
                    center_lat,
                    road: road.clone(),
                }
            })
            .collect();
        found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(found)
    }
}
