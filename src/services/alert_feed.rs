// src/services/alert_feed.rs

use crate::error::Result;
use crate::models::TrafficAlert;
use crate::monitoring::alert_publisher::AlertPublisher;
use crate::monitoring::journal::Journal;
use crate::repositories::AlertRepository;
use std::sync::Arc;

/// Single entry point for raising and resolving alerts: stores them, then
/// journals and publishes them when those sinks are configured.
#[derive(Debug)]
pub struct AlertFeed {
    repo: Arc<AlertRepository>,
    journal: Option<Arc<Journal>>,
    publisher: Option<AlertPublisher>,
}

impl AlertFeed {
    pub fn new(
        repo: Arc<AlertRepository>,
        journal: Option<Arc<Journal>>,
        publisher: Option<AlertPublisher>,
    ) -> Self {
        Self {
            repo,
            journal,
            publisher,
        }
    }

    pub fn repository(&self) -> &AlertRepository {
        &self.repo
    }

    pub fn raise(&self, alert: TrafficAlert) -> TrafficAlert {
        let alert = self.repo.create(alert);
        log::info!(
            "Alert {:?} [{}] {} on road {}: {}",
            alert.id,
            alert.severity,
            alert.alert_type,
            alert.road_segment_id,
            alert.message
        );
        self.emit(&alert);
        alert
    }

    pub fn resolve(&self, id: u64) -> Result<TrafficAlert> {
        let alert = self.repo.resolve(id)?;
        log::info!("Alert {} resolved", id);
        self.emit(&alert);
        Ok(alert)
    }

    fn emit(&self, alert: &TrafficAlert) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.append_alert(alert) {
                log::error!("Error journaling alert {:?}: {}", alert.id, e);
            }
        }
        if let Some(publisher) = &self.publisher {
            publisher.publish(alert);
        }
    }
}
