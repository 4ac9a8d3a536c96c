use chrono::{DateTime, Utc};
use serde::Serialize;

/// Topocentric look angles of one satellite from one observer at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElevationSample {
    pub timestamp: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

impl ElevationSample {
    pub fn is_visible(&self, threshold_deg: f64) -> bool {
        self.elevation_deg >= threshold_deg
    }
}
