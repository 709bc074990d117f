use crate::error::{Result, TrafficError};
use crate::models::{AlertType, Severity, TrafficAlert};
use crate::shared_data::{now, read_lock, write_lock};
use std::collections::VecDeque;
use std::sync::RwLock;

#[derive(Debug)]
struct AlertTable {
    alerts: VecDeque<TrafficAlert>,
    last_id: u64,
    retention: usize,
}

#[derive(Debug)]
pub struct AlertRepository {
    table: RwLock<AlertTable>,
}

impl AlertRepository {
    pub fn new(retention: usize) -> Self {
        Self {
            table: RwLock::new(AlertTable {
                alerts: VecDeque::new(),
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

    pub fn create(&self, mut alert: TrafficAlert) -> TrafficAlert {
        let mut table = write_lock(&self.table);
        table.last_id += 1;
        alert.id = Some(table.last_id);
        alert.created_at = Some(now());
        if table.alerts.len() == table.retention {
            table.alerts.pop_front();
        }
        table.alerts.push_back(alert.clone());
        alert
    }

    pub fn get_by_id(&self, id: u64) -> Result<TrafficAlert> {
        read_lock(&self.table)
            .alerts
            .iter()
            .find(|a| a.id == Some(id))
            .cloned()
            .ok_or_else(|| TrafficError::NotFound(format!("Alert {}", id)))
    }

    fn newest_first<F>(&self, keep: F) -> Vec<TrafficAlert>
    where
        F: Fn(&TrafficAlert) -> bool,
    {
        let table = read_lock(&self.table);
        let mut found: Vec<TrafficAlert> = table.alerts.iter().filter(|a| keep(a)).cloned().collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        found
    }

    /// Unresolved alerts, newest first.
    pub fn get_active(&self) -> Vec<TrafficAlert> {
        self.newest_first(|a| !a.resolved)
    }

    pub fn get_by_road(&self, road_id: u64) -> Vec<TrafficAlert> {
        self.newest_first(|a| !a.resolved && a.road_segment_id == road_id)
    }

    pub fn get_by_severity(&self, severity: Severity) -> Vec<TrafficAlert> {
        self.newest_first(|a| !a.resolved && a.severity == severity)
    }

    /// Newest alerts regardless of state.
    pub fn get_recent(&self, limit: usize) -> Vec<TrafficAlert> {
        let mut found = self.newest_first(|_| true);
        found.truncate(limit);
        found
    }

    pub fn resolve(&self, id: u64) -> Result<TrafficAlert> {
        let mut table = write_lock(&self.table);
        let alert = table
            .alerts
            .iter_mut()
            .find(|a| a.id == Some(id))
            .ok_or_else(|| TrafficError::NotFound(format!("Alert {}", id)))?;
        alert.resolve();
        Ok(alert.clone())
    }

    /// Whether an unresolved alert of this type exists for the vehicle and/or road.
    /// `None` filters match anything.
    pub fn has_unresolved(
        &self,
        alert_type: AlertType,
        vehicle_id: Option<&str>,
        road_id: Option<u64>,
    ) -> bool {
        read_lock(&self.table).alerts.iter().any(|a| {
            !a.resolved
                && a.alert_type == alert_type
                && vehicle_id.map_or(true, |v| a.vehicle_id.as_deref() == Some(v))
                && road_id.map_or(true, |r| a.road_segment_id == r)
        })
    }

    pub fn count(&self) -> usize {
        read_lock(&self.table).alerts.len()
    }

    pub fn count_active(&self) -> usize {
        read_lock(&self.table).alerts.iter().filter(|a| !a.resolved).count()
    }

    pub fn count_by_type(&self, alert_type: AlertType) -> usize {
        read_lock(&self.table)
            .alerts
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .count()
    }
}
