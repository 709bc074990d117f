// simulation_engine/vehicles.rs
use crate::error::{Result, TrafficError};
use crate::geo;
use crate::models::{
    GpsDataParams, SimulationConfig, Vehicle, VehicleParams, VehicleStatus, VehicleType,
};
use crate::shared_data::{now, read_lock, write_lock};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use std::sync::RwLock;

/// Chance per tick that a vehicle picks a new heading.
const HEADING_CHANGE_P: f64 = 0.1;
/// Chance per tick that a vehicle changes speed.
const SPEED_CHANGE_P: f64 = 0.2;
/// Largest speed change in one tick, km/h.
const MAX_SPEED_CHANGE: f64 = 10.0;

/// Random vehicle somewhere inside the simulation area.
pub fn spawn_vehicle<R: Rng>(
    id: u64,
    vehicle_id: String,
    config: &SimulationConfig,
    rng: &mut R,
    at: DateTime<Utc>,
) -> Vehicle {
    let rand_val: f64 = rng.random_range(0.0..1.0);
    let vehicle_type = if rand_val < 0.50 {
        VehicleType::Car
    } else if rand_val < 0.81 {
        VehicleType::Truck
    } else {
        VehicleType::Bus
    };

    let (longitude, latitude) =
        config.point_at(rng.random_range(0.0..1.0), rng.random_range(0.0..1.0));
    let speed = rng.random_range(config.speed_min..=config.speed_max);

    Vehicle {
        id,
        vehicle_id,
        longitude,
        latitude,
        speed,
        direction: rng.random_range(0.0..360.0),
        vehicle_type,
        status: VehicleStatus::from_speed(speed),
        created_at: at,
        updated_at: at,
    }
}

fn wrap(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        max
    } else if value > max {
        min
    } else {
        value
    }
}

/// Moves the vehicle for `elapsed_secs` along its heading, wrapping at the
/// area edges, and lets heading and speed drift.
pub fn advance_vehicle<R: Rng>(
    vehicle: &mut Vehicle,
    config: &SimulationConfig,
    elapsed_secs: f64,
    rng: &mut R,
    at: DateTime<Utc>,
) {
    let distance_km = vehicle.speed * elapsed_secs / 3600.0;
    let (lng, lat) = geo::destination(
        vehicle.longitude,
        vehicle.latitude,
        vehicle.direction,
        distance_km,
    );
    vehicle.longitude = wrap(lng, config.area_lng_min, config.area_lng_max);
    vehicle.latitude = wrap(lat, config.area_lat_min, config.area_lat_max);

    if rng.random_bool(HEADING_CHANGE_P) {
        vehicle.direction = rng.random_range(0.0..360.0);
    }
    if rng.random_bool(SPEED_CHANGE_P) {
        let change = rng.random_range(-MAX_SPEED_CHANGE..=MAX_SPEED_CHANGE);
        vehicle.speed = (vehicle.speed + change).clamp(config.speed_min, config.speed_max);
    }

    vehicle.status = VehicleStatus::from_speed(vehicle.speed);
    vehicle.updated_at = at;
}

fn sample_of(vehicle: &Vehicle, at: DateTime<Utc>) -> GpsDataParams {
    GpsDataParams {
        vehicle_id: vehicle.vehicle_id.clone(),
        longitude: vehicle.longitude,
        latitude: vehicle.latitude,
        speed: vehicle.speed,
        direction: vehicle.direction,
        timestamp: Some(at),
        road_segment_id: None,
        vehicle_type: vehicle.vehicle_type,
    }
}

#[derive(Debug, Default)]
struct FleetTable {
    vehicles: Vec<Vehicle>,
    last_id: u64,
}

/// The simulated fleet. Vehicle ids (`vehicleId`) are unique.
#[derive(Debug, Default)]
pub struct Fleet {
    table: RwLock<FleetTable>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fleet seeded with three vehicles spread across the area.
    pub fn with_default_vehicles(config: &SimulationConfig) -> Self {
        let fleet = Self::new();
        let at = now();
        let defaults = [
            ("V001", VehicleType::Car, 45.0, 0.0, 0.2),
            ("V002", VehicleType::Truck, 85.0, 90.0, 0.4),
            ("V003", VehicleType::Bus, 35.0, 180.0, 0.6),
        ];
        {
            let mut table = write_lock(&fleet.table);
            for (vehicle_id, vehicle_type, speed, direction, f) in defaults {
                table.last_id += 1;
                let (longitude, latitude) = config.point_at(f, f);
                let vehicle = Vehicle {
                    id: table.last_id,
                    vehicle_id: vehicle_id.to_string(),
                    longitude,
                    latitude,
                    speed,
                    direction,
                    vehicle_type,
                    status: VehicleStatus::from_speed(speed),
                    created_at: at,
                    updated_at: at,
                };
                table.vehicles.push(vehicle);
            }
        }
        fleet
    }

    pub fn list(&self) -> Vec<Vehicle> {
        read_lock(&self.table).vehicles.clone()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.table).vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a vehicle; missing coordinates put it at the centre of the area.
    pub fn add(&self, params: VehicleParams, config: &SimulationConfig) -> Result<Vehicle> {
        let vehicle_id = params.vehicle_id.trim().to_string();
        if vehicle_id.is_empty() {
            return Err(TrafficError::Validation("Vehicle ID cannot be empty".into()));
        }
        if !(params.speed >= 0.0) {
            return Err(TrafficError::Validation("Speed cannot be negative".into()));
        }
        let (center_lng, center_lat) = config.center();
        let longitude = params.longitude.unwrap_or(center_lng);
        let latitude = params.latitude.unwrap_or(center_lat);
        if !(-180.0..=180.0).contains(&longitude) || !(-90.0..=90.0).contains(&latitude) {
            return Err(TrafficError::Validation(format!(
                "Position ({longitude}, {latitude}) is outside valid coordinates"
            )));
        }

        let mut table = write_lock(&self.table);
        if table.vehicles.iter().any(|v| v.vehicle_id == vehicle_id) {
            return Err(TrafficError::Conflict(format!(
                "Vehicle {} already exists",
                vehicle_id
            )));
        }
        table.last_id += 1;
        let at = now();
        let vehicle = Vehicle {
            id: table.last_id,
            vehicle_id,
            longitude,
            latitude,
            speed: params.speed,
            direction: params.direction.rem_euclid(360.0),
            vehicle_type: params.vehicle_type,
            status: VehicleStatus::from_speed(params.speed),
            created_at: at,
            updated_at: at,
        };
        table.vehicles.push(vehicle.clone());
        log::info!("Vehicle {} added to the fleet", vehicle.vehicle_id);
        Ok(vehicle)
    }

    pub fn remove(&self, vehicle_id: &str) -> Result<Vehicle> {
        let mut table = write_lock(&self.table);
        let index = table
            .vehicles
            .iter()
            .position(|v| v.vehicle_id == vehicle_id)
            .ok_or_else(|| TrafficError::NotFound(format!("Vehicle {}", vehicle_id)))?;
        log::info!("Vehicle {} removed from the fleet", vehicle_id);
        Ok(table.vehicles.remove(index))
    }

    /// Spawns random vehicles until the fleet has `config.vehicle_count`.
    /// Returns how many were added.
    pub fn top_up(&self, config: &SimulationConfig) -> usize {
        let mut rng = rand::rng();
        let at = now();
        let mut table = write_lock(&self.table);
        let target = config.vehicle_count as usize;
        let mut taken: HashSet<String> =
            table.vehicles.iter().map(|v| v.vehicle_id.clone()).collect();

        let mut added = 0;
        while table.vehicles.len() < target {
            table.last_id += 1;
            let id = table.last_id;
            let vehicle_id = format!("SIM{:03}", id);
            if !taken.insert(vehicle_id.clone()) {
                continue;
            }
            let vehicle = spawn_vehicle(id, vehicle_id, config, &mut rng, at);
            log::debug!(
                "Spawned {} {} at ({:.4}, {:.4})",
                vehicle.vehicle_type,
                vehicle.vehicle_id,
                vehicle.longitude,
                vehicle.latitude
            );
            table.vehicles.push(vehicle);
            added += 1;
        }
        added
    }

    /// Advances every vehicle and returns one GPS sample per vehicle.
    pub fn step(&self, config: &SimulationConfig, elapsed_secs: f64) -> Vec<GpsDataParams> {
        let mut rng = rand::rng();
        let at = now();
        let mut table = write_lock(&self.table);
        table
            .vehicles
            .iter_mut()
            .map(|vehicle| {
                advance_vehicle(vehicle, config, elapsed_secs, &mut rng, at);
                sample_of(vehicle, at)
            })
            .collect()
    }
}
