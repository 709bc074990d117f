use crate::models::GpsData;
use crate::shared_data::{now, read_lock, write_lock};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::RwLock;

#[derive(Debug)]
struct GpsTable {
    records: VecDeque<GpsData>,
    last_id: u64,
    retention: usize,
}

/// GPS samples in arrival order, capped at `retention` records.
#[derive(Debug)]
pub struct GpsRepository {
    table: RwLock<GpsTable>,
}

impl GpsRepository {
    pub fn new(retention: usize) -> Self {
        Self {
            table: RwLock::new(GpsTable {
                records: VecDeque::new(),
                last_id: 0,
                retention: retention.max(1),
            }),
        }
    }

    /// Continues numbering after `last_id`, for ids already handed out by
    /// an earlier run sharing the same journal.
    pub fn resume_after(&self, last_id: u64) {
        let mut table = write_lock(&self.table);
        table.last_id = table.last_id.max(last_id);
    }

    pub fn create(&self, mut record: GpsData) -> GpsData {
        let mut table = write_lock(&self.table);
        table.last_id += 1;
        record.id = Some(table.last_id);
        record.created_at = Some(now());
        if table.records.len() == table.retention {
            table.records.pop_front();
        }
        table.records.push_back(record.clone());
        record
    }

    fn select<F>(&self, limit: Option<usize>, keep: F) -> Vec<GpsData>
    where
        F: Fn(&GpsData) -> bool,
    {
        let table = read_lock(&self.table);
        let mut found: Vec<GpsData> = table.records.iter().filter(|r| keep(r)).cloned().collect();
        // Newest first; ties broken by id so later arrivals come first.
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        found
    }

    pub fn find_recent(&self, limit: usize, since: DateTime<Utc>) -> Vec<GpsData> {
        self.select(Some(limit), |r| r.timestamp >= since)
    }

    pub fn find_by_vehicle(&self, vehicle_id: &str, limit: usize) -> Vec<GpsData> {
        self.select(Some(limit), |r| r.vehicle_id == vehicle_id)
    }

    pub fn find_by_road(&self, road_id: u64, since: DateTime<Utc>) -> Vec<GpsData> {
        self.select(None, |r| {
            r.road_segment_id == Some(road_id) && r.timestamp >= since
        })
    }

    pub fn find_since(&self, since: DateTime<Utc>) -> Vec<GpsData> {
        self.select(None, |r| r.timestamp >= since)
    }

    /// Drops road references to a deleted road. Returns how many samples changed.
    pub fn clear_road(&self, road_id: u64) -> usize {
        let mut table = write_lock(&self.table);
        let mut cleared = 0;
        for record in table.records.iter_mut() {
            if record.road_segment_id == Some(road_id) {
                record.road_segment_id = None;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn count(&self) -> usize {
        read_lock(&self.table).records.len()
    }
}
