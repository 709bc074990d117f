// src/algorithms/mod.rs
pub mod anomaly_detector;
pub mod congestion_calculator;
pub mod road_matcher;
pub mod speed_detector;

pub use anomaly_detector::{
    AnomalyDetector, AnomalyKind, AnomalyRule, AnomalyStatistics, DetectionRecord,
};
pub use congestion_calculator::{CongestionCalculator, CongestionForecast, RoadStatistics};
pub use road_matcher::RoadMatcher;
pub use speed_detector::{OverspeedStatistics, SpeedDetector, SpeedPattern, SpeedProfile};
