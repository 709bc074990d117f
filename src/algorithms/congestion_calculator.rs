// src/algorithms/congestion_calculator.rs

use crate::models::{CongestionBand, GpsData, RoadSegment};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Last computed traffic figures of one road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadStatistics {
    pub road_id: u64,
    /// Distinct vehicles seen in the window.
    pub vehicle_count: usize,
    pub sample_count: usize,
    pub average_speed: f64,
    pub max_speed: u32,
    pub capacity: u32,
    pub congestion_level: f64,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CongestionForecast {
    pub road_id: u64,
    pub level: CongestionBand,
    pub current: f64,
    pub minutes: u32,
    pub predicted: f64,
    /// Recorded scores, oldest first.
    pub trend: Vec<f64>,
}

/// Congestion scoring with a bounded per-road score history.
#[derive(Debug)]
pub struct CongestionCalculator {
    statistics: HashMap<u64, RoadStatistics>,
    history: HashMap<u64, VecDeque<f64>>,
    max_history: usize,
}

impl Default for CongestionCalculator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HISTORY)
    }
}

impl CongestionCalculator {
    pub const DEFAULT_HISTORY: usize = 60;
    const SPEED_WEIGHT: f64 = 0.7;
    const DENSITY_WEIGHT: f64 = 0.3;

    pub fn new(max_history: usize) -> Self {
        Self {
            statistics: HashMap::new(),
            history: HashMap::new(),
            max_history: max_history.max(1),
        }
    }

    /// Score in `[0, 1]` from the average speed against the limit and the
    /// vehicle count against the capacity.
    pub fn score(average_speed: f64, vehicle_count: usize, road: &RoadSegment) -> f64 {
        if average_speed <= 0.0 {
            return 1.0;
        }
        let speed_ratio = average_speed / f64::from(road.max_speed.max(1));
        let density_ratio = vehicle_count as f64 / f64::from(road.capacity.max(1));
        ((1.0 - speed_ratio) * Self::SPEED_WEIGHT + density_ratio * Self::DENSITY_WEIGHT)
            .clamp(0.0, 1.0)
    }

    /// Scores `road` from the samples of the current window and records the
    /// result. Without samples the score is 0 and nothing is recorded.
    pub fn calculate(&mut self, road: &RoadSegment, samples: &[GpsData], now: DateTime<Utc>) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let road_id = road.id.unwrap_or_default();
        let average_speed = samples.iter().map(|s| s.speed).sum::<f64>() / samples.len() as f64;
        let vehicle_count = samples
            .iter()
            .map(|s| s.vehicle_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let congestion_level = Self::score(average_speed, vehicle_count, road);

        self.statistics.insert(
            road_id,
            RoadStatistics {
                road_id,
                vehicle_count,
                sample_count: samples.len(),
                average_speed,
                max_speed: road.max_speed,
                capacity: road.capacity,
                congestion_level,
                last_update: now,
            },
        );

        let deque = self.history.entry(road_id).or_default();
        if deque.len() == self.max_history {
            deque.pop_front();
        }
        deque.push_back(congestion_level);

        congestion_level
    }

    pub fn level(&self, road_id: u64) -> CongestionBand {
        self.statistics
            .get(&road_id)
            .map_or(CongestionBand::Unknown, |s| {
                CongestionBand::from_score(s.congestion_level)
            })
    }

    pub fn road_statistics(&self, road_id: u64) -> Option<&RoadStatistics> {
        self.statistics.get(&road_id)
    }

    /// Every recorded road, ordered by id.
    pub fn all_statistics(&self) -> Vec<RoadStatistics> {
        let mut all: Vec<RoadStatistics> = self.statistics.values().cloned().collect();
        all.sort_by_key(|s| s.road_id);
        all
    }

    /// Vehicles per hour for `count` vehicles seen over `window`.
    pub fn traffic_flow(count: usize, window: Duration) -> f64 {
        let hours = window.num_seconds() as f64 / 3600.0;
        if hours <= 0.0 {
            return 0.0;
        }
        count as f64 / hours
    }

    /// Naive forecast: the current score grows 10 % per minute, capped at 1.
    pub fn predict(&self, road_id: u64, minutes: u32) -> f64 {
        self.statistics.get(&road_id).map_or(0.0, |s| {
            (s.congestion_level * (1.0 + 0.1 * f64::from(minutes))).min(1.0)
        })
    }

    /// Recorded scores, oldest first.
    pub fn trend(&self, road_id: u64) -> Vec<f64> {
        self.history
            .get(&road_id)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drops everything recorded for a deleted road.
    pub fn forget(&mut self, road_id: u64) {
        self.statistics.remove(&road_id);
        self.history.remove(&road_id);
    }
}
