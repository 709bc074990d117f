use crate::error::{Result, TrafficError};
use crate::models::RoadSegment;
use crate::shared_data::{now, read_lock, write_lock};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct RoadTable {
    roads: BTreeMap<u64, RoadSegment>,
    last_id: u64,
}

#[derive(Debug, Default)]
pub struct RoadRepository {
    table: RwLock<RoadTable>,
}

impl RoadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All roads ordered by id.
    pub fn get_all(&self) -> Vec<RoadSegment> {
        read_lock(&self.table).roads.values().cloned().collect()
    }

    pub fn get_by_id(&self, id: u64) -> Result<RoadSegment> {
        read_lock(&self.table)
            .roads
            .get(&id)
            .cloned()
            .ok_or_else(|| TrafficError::NotFound(format!("Road {}", id)))
    }

    /// Stores a new road, assigning its id and timestamps.
    pub fn create(&self, mut road: RoadSegment) -> RoadSegment {
        let mut table = write_lock(&self.table);
        table.last_id += 1;
        let id = table.last_id;
        let stamp = now();
        road.id = Some(id);
        road.created_at = Some(stamp);
        road.updated_at = Some(stamp);
        table.roads.insert(id, road.clone());
        road
    }

    /// Replaces the road with `id`, keeping its creation time.
    pub fn update(&self, id: u64, mut road: RoadSegment) -> Result<RoadSegment> {
        let mut table = write_lock(&self.table);
        let existing = table
            .roads
            .get_mut(&id)
            .ok_or_else(|| TrafficError::NotFound(format!("Road {}", id)))?;
        road.id = Some(id);
        road.created_at = existing.created_at;
        road.updated_at = Some(now());
        *existing = road.clone();
        Ok(road)
    }

    pub fn delete(&self, id: u64) -> Result<RoadSegment> {
        write_lock(&self.table)
            .roads
            .remove(&id)
            .ok_or_else(|| TrafficError::NotFound(format!("Road {}", id)))
    }

    pub fn count(&self) -> usize {
        read_lock(&self.table).roads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoadSegmentParams, RoadType};

    fn road(name: &str) -> RoadSegment {
        RoadSegmentParams {
            name: name.into(),
            start_lng: 116.30,
            start_lat: 39.90,
            end_lng: 116.40,
            end_lat: 39.90,
            max_speed: 60,
            capacity: 100,
            length: None,
            road_type: RoadType::Urban,
        }
        .into()
    }

    #[test]
    fn create_assigns_sequential_ids_and_timestamps() {
        let repo = RoadRepository::new();
        let a = repo.create(road("A"));
        let b = repo.create(road("B"));
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert!(a.created_at.is_some());
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(repo.count(), 2);
        assert_eq!(repo.get_all()[1].name, "B");
    }

    #[test]
    fn update_keeps_creation_time() {
        let repo = RoadRepository::new();
        let created = repo.create(road("A"));
        let updated = repo.update(1, road("A2")).unwrap();
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(repo.get_by_id(1).unwrap().name, "A2");
    }

    #[test]
    fn missing_ids_are_not_found() {
        let repo = RoadRepository::new();
        assert!(matches!(repo.get_by_id(5), Err(TrafficError::NotFound(_))));
        assert!(matches!(repo.update(5, road("x")), Err(TrafficError::NotFound(_))));
        assert!(matches!(repo.delete(5), Err(TrafficError::NotFound(_))));
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let repo = RoadRepository::new();
        repo.create(road("A"));
        repo.delete(1).unwrap();
        assert_eq!(repo.create(road("B")).id, Some(2));
    }
}
