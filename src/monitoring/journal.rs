// src/monitoring/journal.rs
//! Append-only CSV journals of GPS samples and traffic alerts.

use crate::error::Result;
use crate::global_variables::{JOURNAL_GPS_DATA, JOURNAL_TRAFFIC_ALERTS};
use crate::models::{AlertType, GpsData, Severity, TrafficAlert, VehicleType};
use crate::shared_data::lock;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Flat CSV row of a GPS sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsRow {
    pub id: u64,
    pub vehicle_id: String,
    pub vehicle_type: VehicleType,
    pub longitude: f64,
    pub latitude: f64,
    pub speed: f64,
    pub direction: f64,
    pub road_segment_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl From<&GpsData> for GpsRow {
    fn from(gps: &GpsData) -> Self {
        Self {
            id: gps.id.unwrap_or_default(),
            vehicle_id: gps.vehicle_id.clone(),
            vehicle_type: gps.vehicle_type,
            longitude: gps.longitude,
            latitude: gps.latitude,
            speed: gps.speed,
            direction: gps.direction,
            road_segment_id: gps.road_segment_id,
            timestamp: gps.timestamp,
        }
    }
}

impl From<GpsRow> for GpsData {
    fn from(row: GpsRow) -> Self {
        GpsData {
            id: Some(row.id),
            vehicle_id: row.vehicle_id,
            longitude: row.longitude,
            latitude: row.latitude,
            speed: row.speed,
            direction: row.direction,
            timestamp: row.timestamp,
            road_segment_id: row.road_segment_id,
            vehicle_type: row.vehicle_type,
            created_at: None,
        }
    }
}

/// Flat CSV row of an alert. A resolved alert is journaled again with
/// `resolved` set, so the last row of an id is its current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub id: u64,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub vehicle_id: Option<String>,
    pub road_segment_id: u64,
    pub alert_value: Option<f64>,
    pub message: String,
    pub resolved: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&TrafficAlert> for AlertRow {
    fn from(alert: &TrafficAlert) -> Self {
        Self {
            id: alert.id.unwrap_or_default(),
            alert_type: alert.alert_type,
            severity: alert.severity,
            vehicle_id: alert.vehicle_id.clone(),
            road_segment_id: alert.road_segment_id,
            alert_value: alert.alert_value,
            message: alert.message.clone(),
            resolved: alert.resolved,
            timestamp: alert.timestamp,
        }
    }
}

impl From<AlertRow> for TrafficAlert {
    fn from(row: AlertRow) -> Self {
        TrafficAlert {
            id: Some(row.id),
            alert_type: row.alert_type,
            vehicle_id: row.vehicle_id,
            road_segment_id: row.road_segment_id,
            alert_value: row.alert_value,
            message: row.message,
            severity: row.severity,
            resolved: row.resolved,
            timestamp: row.timestamp,
            created_at: None,
        }
    }
}

fn log_to_csv<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let file_exists = path.exists();
    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

/// The pair of journal files under one directory.
#[derive(Debug)]
pub struct Journal {
    directory: PathBuf,
    // Serializes appends so the header check and the write stay together.
    write_guard: Mutex<()>,
}

impl Journal {
    /// Opens (creating when needed) the journal directory.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            write_guard: Mutex::new(()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn gps_path(&self) -> PathBuf {
        self.directory.join(JOURNAL_GPS_DATA)
    }

    pub fn alerts_path(&self) -> PathBuf {
        self.directory.join(JOURNAL_TRAFFIC_ALERTS)
    }

    pub fn append_gps(&self, gps: &GpsData) -> Result<()> {
        let _guard = lock(&self.write_guard);
        log_to_csv(&self.gps_path(), &GpsRow::from(gps))
    }

    pub fn append_alert(&self, alert: &TrafficAlert) -> Result<()> {
        let _guard = lock(&self.write_guard);
        log_to_csv(&self.alerts_path(), &AlertRow::from(alert))
    }

    /// Journaled samples in file order. A missing file reads as empty.
    pub fn read_gps(&self) -> Result<Vec<GpsData>> {
        let rows: Vec<GpsRow> = read_csv(&self.gps_path())?;
        Ok(rows.into_iter().map(GpsData::from).collect())
    }

    /// Highest sample id in the journal, 0 when empty.
    pub fn last_gps_id(&self) -> Result<u64> {
        let rows: Vec<GpsRow> = read_csv(&self.gps_path())?;
        Ok(rows.iter().map(|row| row.id).max().unwrap_or_default())
    }

    /// Highest alert id in the journal, 0 when empty.
    pub fn last_alert_id(&self) -> Result<u64> {
        let rows: Vec<AlertRow> = read_csv(&self.alerts_path())?;
        Ok(rows.iter().map(|row| row.id).max().unwrap_or_default())
    }

    /// Latest state of every journaled alert, ordered by id.
    pub fn read_alerts(&self) -> Result<Vec<TrafficAlert>> {
        let rows: Vec<AlertRow> = read_csv(&self.alerts_path())?;
        let latest: BTreeMap<u64, AlertRow> = rows.into_iter().map(|row| (row.id, row)).collect();
        Ok(latest.into_values().map(TrafficAlert::from).collect())
    }
}
