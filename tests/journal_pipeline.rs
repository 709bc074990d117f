use pretty_assertions::assert_eq;
use traffic_monitor::models::{AlertType, GpsDataParams, RoadSegmentParams, RoadType, VehicleType};
use traffic_monitor::monitoring::traffic_monitoring_system::build_report;
use traffic_monitor::monitoring::Journal;
use traffic_monitor::{AppConfig, AppState};

fn road() -> RoadSegmentParams {
    RoadSegmentParams {
        name: "Airport Expressway".into(),
        start_lng: 116.40,
        start_lat: 39.95,
        end_lng: 116.50,
        end_lat: 39.95,
        max_speed: 100,
        capacity: 500,
        length: None,
        road_type: RoadType::Highway,
    }
}

fn sample(vehicle: &str, speed: f64) -> GpsDataParams {
    GpsDataParams {
        vehicle_id: vehicle.into(),
        longitude: 116.45,
        latitude: 39.95,
        speed,
        direction: 90.0,
        timestamp: None,
        road_segment_id: None,
        vehicle_type: VehicleType::Truck,
    }
}

#[test]
fn ingested_samples_and_alerts_are_journaled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.journal.directory = Some(dir.path().to_path_buf());
    let state = AppState::build(config).unwrap();

    let road = state.roads.create(road()).unwrap();
    state.gps.ingest(sample("T1", 80.0)).unwrap();
    state.gps.ingest(sample("T2", 160.0)).unwrap();

    let journal = Journal::open(dir.path()).unwrap();
    let samples = journal.read_gps().unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].road_segment_id, road.id);
    assert_eq!(samples[1].vehicle_id, "T2");

    let alerts = journal.read_alerts().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::Overspeed);
    assert_eq!(alerts[0].vehicle_id.as_deref(), Some("T2"));

    state.traffic.resolve_alert(alerts[0].id.unwrap()).unwrap();
    let report = build_report(&journal, chrono::Utc::now()).unwrap();
    assert_eq!(report.gps_records, 2);
    assert_eq!(report.alert_records, 1);
    assert_eq!(report.active_alerts, 0);
    assert_eq!(report.urgent_alerts, 0);
    assert_eq!(report.alerts_last_hour, 1);
    assert_eq!(report.speed_by_type, vec![(VehicleType::Truck, 120.0)]);
}

#[test]
fn deleting_a_road_unlinks_its_samples() {
    let state = AppState::build(AppConfig::default()).unwrap();
    let road = state.roads.create(road()).unwrap();
    let id = road.id.unwrap();
    state.gps.ingest(sample("T1", 60.0)).unwrap();
    assert_eq!(state.gps.by_road(id, None).unwrap().len(), 1);

    state.roads.delete(id).unwrap();
    assert!(state.gps.by_road(id, None).unwrap().is_empty());
    let recent = state.gps.recent(None, None).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].road_segment_id, None);
}
