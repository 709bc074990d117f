// src/monitoring/traffic_monitoring_system.rs
//! Admin tooling over the CSV journals: listings, a summary report and
//! charts drawn with plotters.

use crate::config::AmqpConfig;
use crate::error::{Result, TrafficError};
use crate::global_variables::{CHART_ALERTS_BY_SEVERITY, CHART_SPEED_BY_TYPE};
use crate::models::{AlertType, GpsData, Severity, TrafficAlert, VehicleType};
use crate::monitoring::alert_publisher::listen_traffic_alerts;
use crate::monitoring::journal::Journal;
use chrono::{DateTime, Utc};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};

fn chart_error<E: Display>(e: E) -> TrafficError {
    TrafficError::Chart(e.to_string())
}

/// Counts and breakdowns over both journals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JournalReport {
    pub gps_records: usize,
    pub alert_records: usize,
    pub active_alerts: usize,
    /// Unresolved alerts of high severity.
    pub urgent_alerts: usize,
    pub alerts_last_hour: usize,
    pub alerts_by_type: BTreeMap<String, usize>,
    pub alerts_by_severity: Vec<(Severity, usize)>,
    pub speed_by_type: Vec<(VehicleType, f64)>,
}

/// Mean speed per vehicle type; types without samples are left out.
pub fn average_speed_by_type(samples: &[GpsData]) -> Vec<(VehicleType, f64)> {
    VehicleType::ALL
        .iter()
        .filter_map(|vehicle_type| {
            let speeds: Vec<f64> = samples
                .iter()
                .filter(|s| s.vehicle_type == *vehicle_type)
                .map(|s| s.speed)
                .collect();
            if speeds.is_empty() {
                None
            } else {
                Some((*vehicle_type, speeds.iter().sum::<f64>() / speeds.len() as f64))
            }
        })
        .collect()
}

/// Alert count for every severity, low to high.
pub fn alerts_by_severity(alerts: &[TrafficAlert]) -> Vec<(Severity, usize)> {
    Severity::ALL
        .iter()
        .map(|severity| {
            let count = alerts.iter().filter(|a| a.severity == *severity).count();
            (*severity, count)
        })
        .collect()
}

/// Report as of `at`; "last hour" counts alerts raised in the hour before it.
pub fn build_report(journal: &Journal, at: DateTime<Utc>) -> Result<JournalReport> {
    let samples = journal.read_gps()?;
    let alerts = journal.read_alerts()?;

    let mut alerts_by_type = BTreeMap::new();
    for alert_type in [AlertType::Overspeed, AlertType::Congestion, AlertType::Accident] {
        let count = alerts.iter().filter(|a| a.alert_type == alert_type).count();
        alerts_by_type.insert(alert_type.to_string(), count);
    }

    Ok(JournalReport {
        gps_records: samples.len(),
        alert_records: alerts.len(),
        active_alerts: alerts.iter().filter(|a| !a.resolved).count(),
        urgent_alerts: alerts
            .iter()
            .filter(|a| !a.resolved && a.is_high_severity())
            .count(),
        alerts_last_hour: alerts.iter().filter(|a| a.is_recent(at)).count(),
        alerts_by_type,
        alerts_by_severity: alerts_by_severity(&alerts),
        speed_by_type: average_speed_by_type(&samples),
    })
}

/// Prints every journaled alert in its latest state.
pub fn show_alerts(journal: &Journal) -> Result<()> {
    let alerts = journal.read_alerts()?;
    println!("Traffic Alerts ({}):", alerts.len());
    for alert in alerts {
        println!(
            "#{} [{}] {} road {}{} - {}{}",
            alert.id.unwrap_or_default(),
            alert.severity,
            alert.alert_type,
            alert.road_segment_id,
            alert
                .vehicle_id
                .as_deref()
                .map(|v| format!(" vehicle {}", v))
                .unwrap_or_default(),
            alert.message,
            if alert.resolved { " (resolved)" } else { "" }
        );
    }
    Ok(())
}

/// Prints the last `limit` journaled GPS samples.
pub fn show_gps_data(journal: &Journal, limit: usize) -> Result<()> {
    let samples = journal.read_gps()?;
    let skip = samples.len().saturating_sub(limit);
    println!("GPS Data (last {} of {}):", samples.len() - skip, samples.len());
    for sample in &samples[skip..] {
        println!(
            "{} {} {} ({:.5}, {:.5}) {:.1} km/h road {}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
            sample.vehicle_id,
            sample.vehicle_type,
            sample.longitude,
            sample.latitude,
            sample.speed,
            sample
                .road_segment_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    Ok(())
}

pub fn generate_report(journal: &Journal) -> Result<()> {
    println!("Generating Report...");
    let report = build_report(journal, Utc::now())?;
    println!("Report Summary:");
    println!("GPS Data: {} records", report.gps_records);
    println!(
        "Traffic Alerts: {} records, {} active",
        report.alert_records, report.active_alerts
    );
    println!(
        "  {} urgent, {} raised in the last hour",
        report.urgent_alerts, report.alerts_last_hour
    );
    for (alert_type, count) in &report.alerts_by_type {
        println!("  {}: {}", alert_type, count);
    }
    for (severity, count) in &report.alerts_by_severity {
        println!("  {} severity: {}", severity, count);
    }
    for (vehicle_type, speed) in &report.speed_by_type {
        println!("Average {} speed: {:.1} km/h", vehicle_type, speed);
    }
    Ok(())
}

fn draw_bar_chart(
    path: &Path,
    caption: &str,
    y_desc: &str,
    bars: &[(String, f64)],
    color: RGBColor,
) -> Result<()> {
    let max_value = bars.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1.0);
    let labels: Vec<String> = bars.iter().map(|(label, _)| label.clone()).collect();

    let backend = BitMapBackend::new(path, (800, 600));
    let root = backend.into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..bars.len().max(1), 0.0..max_value * 1.1)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&|index| labels.get(*index).cloned().unwrap_or_default())
        .y_desc(y_desc)
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(bars.iter().enumerate().map(|(index, (_, value))| {
            Rectangle::new([(index, 0.0), (index + 1, *value)], color.filled())
        }))
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    Ok(())
}

/// Bar chart of the mean speed per vehicle type. Returns the image path.
pub fn plot_speed_by_type(journal: &Journal, out_dir: &Path) -> Result<PathBuf> {
    let samples = journal.read_gps()?;
    let bars: Vec<(String, f64)> = average_speed_by_type(&samples)
        .into_iter()
        .map(|(vehicle_type, speed)| (vehicle_type.to_string(), speed))
        .collect();
    let path = out_dir.join(CHART_SPEED_BY_TYPE);
    draw_bar_chart(&path, "Average Speed by Vehicle Type", "km/h", &bars, BLUE)?;
    Ok(path)
}

/// Bar chart of the journaled alerts per severity. Returns the image path.
pub fn plot_alerts_by_severity(journal: &Journal, out_dir: &Path) -> Result<PathBuf> {
    let alerts = journal.read_alerts()?;
    let bars: Vec<(String, f64)> = alerts_by_severity(&alerts)
        .into_iter()
        .map(|(severity, count)| (severity.to_string(), count as f64))
        .collect();
    let path = out_dir.join(CHART_ALERTS_BY_SEVERITY);
    draw_bar_chart(&path, "Traffic Alerts by Severity", "alerts", &bars, RED)?;
    Ok(path)
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    stdout().flush().ok()?;
    let mut input = String::new();
    match stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

/// Interactive admin menu over `journal`. With AMQP enabled, a listener
/// journals alerts arriving on the alert queue while the menu runs.
pub async fn run_cli(journal: Journal, amqp: AmqpConfig) {
    if amqp.enabled {
        let listener_journal = Journal::open(journal.directory());
        let (url, queue) = (amqp.url.clone(), amqp.queue.clone());
        tokio::spawn(async move {
            let listener_journal = match listener_journal {
                Ok(journal) => Some(journal),
                Err(e) => {
                    log::error!("Listener cannot open the journal: {}", e);
                    None
                }
            };
            match listen_traffic_alerts(url, queue, listener_journal).await {
                Ok(received) => log::info!("Alert listener stopped after {} alerts", received),
                Err(e) => eprintln!("Error in traffic alerts listener: {}", e),
            }
        });
    }

    loop {
        println!("\nTraffic Monitor Admin CLI");
        println!("1. Display Traffic Alerts");
        println!("2. Display GPS Data");
        println!("3. Generate Report");
        println!("4. Draw Charts");
        println!("5. Exit");
        let Some(input) = prompt("Enter your choice: ") else {
            break;
        };
        match input.parse::<u32>().unwrap_or(0) {
            1 => {
                if let Err(e) = show_alerts(&journal) {
                    eprintln!("Error displaying traffic alerts: {}", e);
                }
            }
            2 => {
                let limit = prompt("How many samples (default 20): ")
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(20);
                if let Err(e) = show_gps_data(&journal, limit) {
                    eprintln!("Error displaying GPS data: {}", e);
                }
            }
            3 => {
                if let Err(e) = generate_report(&journal) {
                    eprintln!("Error generating report: {}", e);
                }
            }
            4 => {
                match plot_speed_by_type(&journal, journal.directory()) {
                    Ok(path) => println!("Speed chart saved to {}", path.display()),
                    Err(e) => eprintln!("Error drawing speed chart: {}", e),
                }
                match plot_alerts_by_severity(&journal, journal.directory()) {
                    Ok(path) => println!("Alert chart saved to {}", path.display()),
                    Err(e) => eprintln!("Error drawing alert chart: {}", e),
                }
            }
            5 => {
                println!("Exiting CLI.");
                break;
            }
            _ => {
                println!("Invalid choice. Try again.");
            }
        }
    }
}
