// src/http/router.rs
//! Maps `(method, path)` onto the handlers. API paths go through a
//! `matchit` router; anything else is looked up in the dashboard route table.

use crate::app_state::AppState;
use crate::dashboard_routes::{self, RouteTarget};
use crate::error::{Result, TrafficError};
use crate::http::cors;
use crate::http::handlers::{self, parse_id, HttpResponse};
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use matchit::{Params, Router};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Roads,
    RoadsNearby,
    Road,
    Gps,
    GpsRecent,
    GpsByRoad,
    GpsByVehicle,
    VehicleSpeed,
    RoadOverspeed,
    Stats,
    TrafficRealtime,
    TrafficAlerts,
    TrafficStats,
    TrafficCongestion,
    TrafficFlow,
    CongestionForecast,
    RoadStatistics,
    AnomalyRules,
    AnomalyRule,
    AnomalyStatistics,
    AnomalyHistory,
    Alerts,
    ResolveAlert,
    Vehicles,
    Vehicle,
    SimulationStart,
    SimulationStop,
    SimulationStatus,
    SimulationConfig,
}

pub const API_ROUTES: [(&str, Route); 30] = [
    ("/api/health", Route::Health),
    ("/api/roads", Route::Roads),
    ("/api/roads/nearby", Route::RoadsNearby),
    ("/api/roads/{id}", Route::Road),
    ("/api/gps", Route::Gps),
    ("/api/gps/recent", Route::GpsRecent),
    ("/api/gps/road/{road_id}", Route::GpsByRoad),
    ("/api/gps/vehicle/{vehicle_id}", Route::GpsByVehicle),
    ("/api/gps/vehicle/{vehicle_id}/speed", Route::VehicleSpeed),
    ("/api/gps/road/{road_id}/overspeed", Route::RoadOverspeed),
    ("/api/stats", Route::Stats),
    ("/api/traffic/realtime", Route::TrafficRealtime),
    ("/api/traffic/alerts", Route::TrafficAlerts),
    ("/api/traffic/stats", Route::TrafficStats),
    ("/api/traffic/congestion", Route::TrafficCongestion),
    ("/api/traffic/flow", Route::TrafficFlow),
    ("/api/traffic/congestion/{road_id}/forecast", Route::CongestionForecast),
    ("/api/traffic/roads", Route::RoadStatistics),
    ("/api/anomaly/rules", Route::AnomalyRules),
    ("/api/anomaly/rules/{rule_id}", Route::AnomalyRule),
    ("/api/anomaly/statistics", Route::AnomalyStatistics),
    ("/api/anomaly/vehicle/{vehicle_id}", Route::AnomalyHistory),
    ("/api/alerts", Route::Alerts),
    ("/api/alerts/{id}/resolve", Route::ResolveAlert),
    ("/api/vehicles", Route::Vehicles),
    ("/api/vehicles/{vehicle_id}", Route::Vehicle),
    ("/api/simulation/start", Route::SimulationStart),
    ("/api/simulation/stop", Route::SimulationStop),
    ("/api/simulation/status", Route::SimulationStatus),
    ("/api/simulation/config", Route::SimulationConfig),
];

fn param<'p>(params: &'p Params<'_, '_>, name: &str) -> Result<&'p str> {
    params
        .get(name)
        .ok_or_else(|| TrafficError::BadRequest(format!("Missing path parameter {name}")))
}

/// The API bound to its application state.
pub struct Api {
    state: Arc<AppState>,
    router: Router<Route>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api").field("routes", &API_ROUTES.len()).finish()
    }
}

impl Api {
    pub fn new(state: Arc<AppState>) -> Result<Self> {
        let mut router = Router::new();
        for (path, route) in API_ROUTES {
            router
                .insert(path, route)
                .map_err(|e| TrafficError::Config(format!("route {path}: {e}")))?;
        }
        Ok(Self { state, router })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Answers one buffered request. Never fails: errors become envelopes.
    pub fn dispatch(&self, request: Request<Bytes>) -> HttpResponse {
        let response = if request.method() == Method::OPTIONS {
            handlers::empty(StatusCode::OK)
        } else if request.uri().path().starts_with("/api/") {
            self.api(&request).unwrap_or_else(|e| {
                if e.status_code() >= 500 {
                    log::error!("{} {}: {}", request.method(), request.uri().path(), e);
                } else {
                    log::debug!("{} {}: {}", request.method(), request.uri().path(), e);
                }
                handlers::error_response(&e)
            })
        } else {
            Self::page(&request).unwrap_or_else(|e| handlers::error_response(&e))
        };
        cors::apply(response)
    }

    fn page(request: &Request<Bytes>) -> Result<HttpResponse> {
        let path = request.uri().path();
        let route = dashboard_routes::find(path)
            .ok_or_else(|| TrafficError::RouteNotFound(path.to_string()))?;
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return Err(TrafficError::MethodNotAllowed {
                method: request.method().to_string(),
                path: path.to_string(),
            });
        }
        Ok(match route.target {
            RouteTarget::Redirect(to) => handlers::redirect(to),
            RouteTarget::Page(page) => handlers::html(dashboard_routes::page_shell(page)),
        })
    }

    fn api(&self, request: &Request<Bytes>) -> Result<HttpResponse> {
        let path = request.uri().path();
        let matched = self
            .router
            .at(path)
            .map_err(|_| TrafficError::RouteNotFound(path.to_string()))?;
        let params = &matched.params;
        let state = self.state.as_ref();
        let uri = request.uri();
        let body = request.body();

        match (*matched.value, request.method().clone()) {
            (Route::Health, Method::GET) => handlers::health(state),

            (Route::Roads, Method::GET) => handlers::list_roads(state),
            (Route::Roads, Method::POST) => handlers::create_road(state, body),
            (Route::RoadsNearby, Method::GET) => handlers::nearby_roads(state, uri),
            (Route::Road, Method::GET) => {
                handlers::get_road(state, parse_id(param(params, "id")?, "road")?)
            }
            (Route::Road, Method::PUT) => {
                handlers::update_road(state, parse_id(param(params, "id")?, "road")?, body)
            }
            (Route::Road, Method::DELETE) => {
                handlers::delete_road(state, parse_id(param(params, "id")?, "road")?)
            }

            (Route::Gps, Method::POST) => handlers::ingest_gps(state, body),
            (Route::GpsRecent, Method::GET) => handlers::recent_gps(state, uri),
            (Route::GpsByRoad, Method::GET) => {
                handlers::gps_by_road(state, parse_id(param(params, "road_id")?, "road")?, uri)
            }
            (Route::GpsByVehicle, Method::GET) => {
                handlers::gps_by_vehicle(state, param(params, "vehicle_id")?, uri)
            }
            (Route::VehicleSpeed, Method::GET) => {
                handlers::vehicle_speed(state, param(params, "vehicle_id")?, uri)
            }
            (Route::RoadOverspeed, Method::GET) => {
                handlers::road_overspeed(state, parse_id(param(params, "road_id")?, "road")?, uri)
            }

            (Route::Stats, Method::GET) => handlers::stats(state),
            (Route::TrafficRealtime, Method::GET) => handlers::realtime(state),
            (Route::TrafficAlerts, Method::GET) => handlers::traffic_alerts(state),
            (Route::TrafficStats, Method::GET) => handlers::traffic_stats(state),
            (Route::TrafficCongestion, Method::GET) => handlers::congestion(state),
            (Route::TrafficFlow, Method::GET) => handlers::flow(state),
            (Route::CongestionForecast, Method::GET) => handlers::congestion_forecast(
                state,
                parse_id(param(params, "road_id")?, "road")?,
                uri,
            ),
            (Route::RoadStatistics, Method::GET) => handlers::road_statistics(state),

            (Route::AnomalyRules, Method::GET) => handlers::anomaly_rules(state),
            (Route::AnomalyRules, Method::POST) => handlers::add_anomaly_rule(state, body),
            (Route::AnomalyRule, Method::PUT) => {
                handlers::update_anomaly_rule(state, param(params, "rule_id")?, body)
            }
            (Route::AnomalyRule, Method::DELETE) => {
                handlers::delete_anomaly_rule(state, param(params, "rule_id")?)
            }
            (Route::AnomalyStatistics, Method::GET) => handlers::anomaly_statistics(state, uri),
            (Route::AnomalyHistory, Method::GET) => {
                handlers::anomaly_history(state, param(params, "vehicle_id")?)
            }

            (Route::Alerts, Method::GET) => handlers::alerts(state, uri),
            (Route::ResolveAlert, Method::PUT) => {
                handlers::resolve_alert(state, parse_id(param(params, "id")?, "alert")?)
            }

            (Route::Vehicles, Method::GET) => handlers::vehicles(state),
            (Route::Vehicles, Method::POST) => handlers::add_vehicle(state, body),
            (Route::Vehicle, Method::DELETE) => {
                handlers::remove_vehicle(state, param(params, "vehicle_id")?)
            }

            (Route::SimulationStart, Method::POST) => handlers::start_simulation(state),
            (Route::SimulationStop, Method::POST) => handlers::stop_simulation(state),
            (Route::SimulationStatus, Method::GET) => handlers::simulation_status(state),
            (Route::SimulationConfig, Method::GET) => handlers::simulation_config(state),
            (Route::SimulationConfig, Method::PUT) => {
                handlers::update_simulation_config(state, body)
            }

            (_, method) => Err(TrafficError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn api() -> Api {
        Api::new(AppState::build(AppConfig::default()).unwrap()).unwrap()
    }

    fn request(method: Method, path: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn every_api_route_is_registered() {
        let api = api();
        for (path, route) in API_ROUTES {
            let concrete = path
                .replace("{id}", "1")
                .replace("{road_id}", "1")
                .replace("{vehicle_id}", "V001")
                .replace("{rule_id}", "low_speed");
            assert_eq!(*api.router.at(&concrete).unwrap().value, route);
        }
    }

    #[test]
    fn unknown_paths_and_methods() {
        let api = api();
        assert_eq!(api.dispatch(request(Method::GET, "/api/nope")).status(), 404);
        assert_eq!(api.dispatch(request(Method::PATCH, "/api/roads")).status(), 405);
        assert_eq!(api.dispatch(request(Method::POST, "/dashboard")).status(), 405);
        assert_eq!(api.dispatch(request(Method::GET, "/nowhere")).status(), 404);
    }

    #[test]
    fn options_is_answered_with_cors() {
        let response = api().dispatch(request(Method::OPTIONS, "/api/roads"));
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[test]
    fn root_redirects_and_pages_render() {
        let api = api();
        let response = api.dispatch(request(Method::GET, "/"));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/dashboard");
        let response = api.dispatch(request(Method::GET, "/alerts"));
        assert_eq!(response.status(), 200);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        let api = api();
        assert_eq!(api.dispatch(request(Method::GET, "/api/roads/abc")).status(), 400);
        assert_eq!(
            api.dispatch(request(Method::PUT, "/api/alerts/x/resolve")).status(),
            400
        );
    }
}
