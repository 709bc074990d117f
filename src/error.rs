//! Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by repositories, services and the HTTP layer.
#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Chart error: {0}")]
    Chart(String),

    #[error("AMQP error: {0}")]
    Amqp(#[from] amiquip::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl TrafficError {
    /// HTTP status the error is reported with; also used as the envelope `code`.
    pub fn status_code(&self) -> u16 {
        match self {
            TrafficError::Validation(_) | TrafficError::BadRequest(_) | TrafficError::Json(_) => {
                400
            }
            TrafficError::NotFound(_) | TrafficError::RouteNotFound(_) => 404,
            TrafficError::MethodNotAllowed { .. } => 405,
            TrafficError::Conflict(_) => 409,
            TrafficError::PayloadTooLarge(_) => 413,
            TrafficError::Config(_)
            | TrafficError::Csv(_)
            | TrafficError::Chart(_)
            | TrafficError::Amqp(_)
            | TrafficError::Http(_)
            | TrafficError::Io(_)
            | TrafficError::Task(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrafficError>;
