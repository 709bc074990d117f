// src/http/handlers.rs
//! One function per API endpoint. Each returns the envelope body or a
//! [`TrafficError`] that the router turns into an error envelope.

use crate::algorithms::AnomalyRule;
use crate::app_state::AppState;
use crate::error::{Result, TrafficError};
use crate::global_variables::{DEFAULT_NEARBY_RADIUS_KM, SERVICE_NAME};
use crate::models::{
    ApiResponse, GpsDataParams, HealthStatus, RoadSegmentParams, Severity, SimulationConfig,
    VehicleParams,
};
use crate::shared_data::{display_time, now};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::{Response, StatusCode, Uri};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type HttpResponse = Response<Full<Bytes>>;

fn with_body(status: StatusCode, content_type: &'static str, body: Vec<u8>) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn envelope<T: Serialize>(status: StatusCode, body: &ApiResponse<T>) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(json) => with_body(status, "application/json", json),
        Err(e) => {
            log::error!("Error serializing response: {}", e);
            with_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "application/json",
                br#"{"code":500,"message":"Response serialization failed","data":null}"#.to_vec(),
            )
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> Result<HttpResponse> {
    Ok(envelope(StatusCode::OK, &ApiResponse::success(data)))
}

fn ok_with<T: Serialize>(data: T, message: &str) -> Result<HttpResponse> {
    Ok(envelope(StatusCode::OK, &ApiResponse::with_message(data, message)))
}

pub fn error_response(err: &TrafficError) -> HttpResponse {
    let code = err.status_code();
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    envelope(status, &ApiResponse::error(code, err.to_string()))
}

pub fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

pub fn redirect(to: &'static str) -> HttpResponse {
    let mut response = empty(StatusCode::FOUND);
    response
        .headers_mut()
        .insert(LOCATION, HeaderValue::from_static(to));
    response
}

pub fn html(body: String) -> HttpResponse {
    with_body(StatusCode::OK, "text/html; charset=utf-8", body.into_bytes())
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(TrafficError::BadRequest("Request body is required".into()));
    }
    Ok(serde_json::from_slice(body)?)
}

fn parse_query<T: DeserializeOwned>(uri: &Uri) -> Result<T> {
    serde_html_form::from_str(uri.query().unwrap_or(""))
        .map_err(|e| TrafficError::BadRequest(format!("Invalid query string: {e}")))
}

pub fn parse_id(raw: &str, what: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| TrafficError::BadRequest(format!("Invalid {what} ID: {raw}")))
}

#[derive(Debug, Default, Deserialize)]
struct RecentQuery {
    limit: Option<usize>,
    minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct MinutesQuery {
    minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct ForecastQuery {
    minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lng: f64,
    lat: f64,
    /// km
    radius: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertQuery {
    severity: Option<Severity>,
    road_id: Option<u64>,
}

pub fn health(state: &AppState) -> Result<HttpResponse> {
    let at = now();
    ok(HealthStatus {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        timestamp: display_time(at),
        uptime_seconds: (at - state.started_at).num_seconds().max(0),
    })
}

// Roads

pub fn list_roads(state: &AppState) -> Result<HttpResponse> {
    ok(state.roads.list())
}

pub fn create_road(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let params: RoadSegmentParams = parse_body(body)?;
    ok_with(state.roads.create(params)?, "Road created successfully")
}

pub fn get_road(state: &AppState, id: u64) -> Result<HttpResponse> {
    ok(state.roads.get(id)?)
}

pub fn update_road(state: &AppState, id: u64, body: &Bytes) -> Result<HttpResponse> {
    let params: RoadSegmentParams = parse_body(body)?;
    ok_with(state.roads.update(id, params)?, "Road updated successfully")
}

pub fn delete_road(state: &AppState, id: u64) -> Result<HttpResponse> {
    state.roads.delete(id)?;
    ok_with((), "Road deleted successfully")
}

pub fn nearby_roads(state: &AppState, uri: &Uri) -> Result<HttpResponse> {
    let query: NearbyQuery = parse_query(uri)?;
    ok(state.roads.nearby(
        query.lng,
        query.lat,
        query.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_KM),
        state.config.detection.match_tolerance_km,
    )?)
}

// GPS

pub fn ingest_gps(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let params: GpsDataParams = parse_body(body)?;
    ok_with(state.gps.ingest(params)?, "GPS data created successfully")
}

pub fn recent_gps(state: &AppState, uri: &Uri) -> Result<HttpResponse> {
    let query: RecentQuery = parse_query(uri)?;
    ok(state.gps.recent(query.limit, query.minutes)?)
}

pub fn gps_by_road(state: &AppState, road_id: u64, uri: &Uri) -> Result<HttpResponse> {
    let query: MinutesQuery = parse_query(uri)?;
    ok(state.gps.by_road(road_id, query.minutes)?)
}

pub fn gps_by_vehicle(state: &AppState, vehicle_id: &str, uri: &Uri) -> Result<HttpResponse> {
    let query: LimitQuery = parse_query(uri)?;
    ok(state.gps.by_vehicle(vehicle_id, query.limit)?)
}

pub fn vehicle_speed(state: &AppState, vehicle_id: &str, uri: &Uri) -> Result<HttpResponse> {
    let query: MinutesQuery = parse_query(uri)?;
    ok(state.gps.speed_profile(vehicle_id, query.minutes)?)
}

pub fn road_overspeed(state: &AppState, road_id: u64, uri: &Uri) -> Result<HttpResponse> {
    let query: MinutesQuery = parse_query(uri)?;
    ok(state.gps.overspeed_statistics(road_id, query.minutes)?)
}

// Traffic

pub fn stats(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.real_time_stats())
}

pub fn realtime(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.summary())
}

pub fn traffic_alerts(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.recent_alerts())
}

pub fn traffic_stats(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.stats())
}

pub fn congestion(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.congestion())
}

pub fn flow(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.vehicle_flow())
}

pub fn congestion_forecast(state: &AppState, road_id: u64, uri: &Uri) -> Result<HttpResponse> {
    let query: ForecastQuery = parse_query(uri)?;
    ok(state.gps.congestion_forecast(road_id, query.minutes)?)
}

pub fn road_statistics(state: &AppState) -> Result<HttpResponse> {
    ok(state.gps.road_statistics())
}

// Anomaly rules

pub fn anomaly_rules(state: &AppState) -> Result<HttpResponse> {
    ok(state.gps.anomaly_rules())
}

pub fn add_anomaly_rule(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let rule: AnomalyRule = parse_body(body)?;
    ok_with(state.gps.add_anomaly_rule(rule)?, "Rule added")
}

pub fn update_anomaly_rule(state: &AppState, rule_id: &str, body: &Bytes) -> Result<HttpResponse> {
    let rule: AnomalyRule = parse_body(body)?;
    ok_with(state.gps.update_anomaly_rule(rule_id, rule)?, "Rule updated")
}

pub fn delete_anomaly_rule(state: &AppState, rule_id: &str) -> Result<HttpResponse> {
    ok_with(state.gps.delete_anomaly_rule(rule_id)?, "Rule deleted")
}

pub fn anomaly_statistics(state: &AppState, uri: &Uri) -> Result<HttpResponse> {
    let query: MinutesQuery = parse_query(uri)?;
    ok(state.gps.anomaly_statistics(query.minutes)?)
}

pub fn anomaly_history(state: &AppState, vehicle_id: &str) -> Result<HttpResponse> {
    ok(state.gps.anomaly_history(vehicle_id)?)
}

// Alerts

pub fn alerts(state: &AppState, uri: &Uri) -> Result<HttpResponse> {
    let query: AlertQuery = parse_query(uri)?;
    ok(state.traffic.active_alerts(query.severity, query.road_id))
}

pub fn resolve_alert(state: &AppState, id: u64) -> Result<HttpResponse> {
    ok_with(state.traffic.resolve_alert(id)?, "Alert resolved")
}

// Vehicles

pub fn vehicles(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.vehicles())
}

pub fn add_vehicle(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let params: VehicleParams = parse_body(body)?;
    ok_with(state.traffic.add_vehicle(params)?, "Vehicle added")
}

pub fn remove_vehicle(state: &AppState, vehicle_id: &str) -> Result<HttpResponse> {
    state.traffic.remove_vehicle(vehicle_id)?;
    ok_with((), "Vehicle removed")
}

// Simulation

pub fn start_simulation(state: &AppState) -> Result<HttpResponse> {
    ok_with(state.traffic.start_simulation(), "Simulation started")
}

pub fn stop_simulation(state: &AppState) -> Result<HttpResponse> {
    ok_with(state.traffic.stop_simulation(), "Simulation stopped")
}

pub fn simulation_status(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.simulation_status())
}

pub fn simulation_config(state: &AppState) -> Result<HttpResponse> {
    ok(state.traffic.simulation_config())
}

pub fn update_simulation_config(state: &AppState, body: &Bytes) -> Result<HttpResponse> {
    let config: SimulationConfig = parse_body(body)?;
    ok_with(
        state.traffic.update_simulation_config(config)?,
        "Simulation config updated",
    )
}
