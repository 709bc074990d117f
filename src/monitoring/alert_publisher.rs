// src/monitoring/alert_publisher.rs
//! RabbitMQ plumbing for traffic alerts: a publisher fed by the alert feed and
//! a consumer used by the admin CLI.

use crate::error::Result;
use crate::models::TrafficAlert;
use crate::monitoring::journal::Journal;
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish, QueueDeclareOptions,
};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

/// Hands alerts to a blocking thread that owns the AMQP connection.
#[derive(Debug, Clone)]
pub struct AlertPublisher {
    sender: UnboundedSender<TrafficAlert>,
}

impl AlertPublisher {
    /// Connects on a blocking thread and publishes every alert sent through
    /// the returned handle to `queue`. The thread ends when all handles drop.
    pub fn start(url: &str, queue: &str) -> (Self, JoinHandle<Result<()>>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<TrafficAlert>();
        let url = url.to_string();
        let queue = queue.to_string();

        let handle = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut connection = match Connection::insecure_open(&url) {
                Ok(connection) => connection,
                Err(e) => {
                    log::error!("Alert publisher cannot reach {}: {}", url, e);
                    // Alerts sent after this point are discarded.
                    while receiver.blocking_recv().is_some() {}
                    return Err(e.into());
                }
            };
            let channel = connection.open_channel(None)?;
            let exchange = Exchange::direct(&channel);
            channel.queue_declare(queue.as_str(), QueueDeclareOptions::default())?;
            log::info!("Publishing alerts to queue {}", queue);

            while let Some(alert) = receiver.blocking_recv() {
                let payload = serde_json::to_vec(&alert)?;
                if let Err(e) = exchange.publish(Publish::new(&payload, queue.as_str())) {
                    log::warn!("Failed to publish alert {:?}: {}", alert.id, e);
                }
            }
            connection.close()?;
            Ok(())
        });

        (Self { sender }, handle)
    }

    pub fn publish(&self, alert: &TrafficAlert) {
        if self.sender.send(alert.clone()).is_err() {
            log::warn!("Alert publisher stopped; dropping alert {:?}", alert.id);
        }
    }
}

/// Consumes alert JSON from `queue`, journaling each one when a journal is
/// given. Runs until the connection closes.
pub async fn listen_traffic_alerts(
    url: String,
    queue: String,
    journal: Option<Journal>,
) -> Result<usize> {
    tokio::task::spawn_blocking(move || -> Result<usize> {
        let mut connection = Connection::insecure_open(&url)?;
        let channel = connection.open_channel(None)?;
        let amqp_queue = channel.queue_declare(queue.as_str(), QueueDeclareOptions::default())?;
        let consumer = amqp_queue.consume(ConsumerOptions::default())?;
        println!("Listening for traffic alerts on {}...", queue);

        let mut received = 0;
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    match serde_json::from_slice::<TrafficAlert>(&delivery.body) {
                        Ok(alert) => {
                            received += 1;
                            println!(
                                "[{}] {} road {}: {}",
                                alert.severity, alert.alert_type, alert.road_segment_id, alert.message
                            );
                            if let Some(journal) = &journal {
                                if let Err(e) = journal.append_alert(&alert) {
                                    log::error!("Error journaling alert: {}", e);
                                }
                            }
                        }
                        Err(e) => log::warn!("Skipping malformed alert message: {}", e),
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    println!("Traffic alerts consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()?;
        Ok(received)
    })
    .await?
}
