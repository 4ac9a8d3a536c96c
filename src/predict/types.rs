use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::predict::ElevationSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PassEventKind {
    Rise,
    MaxElevation,
    Set,
}

/// A threshold crossing or culmination seen from one observer.
///
/// `synthetic` marks a Rise/Set clamped to the search window boundary rather
/// than an actual crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassEvent {
    pub kind: PassEventKind,
    pub time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub synthetic: bool,
}

impl PassEvent {
    pub fn new(kind: PassEventKind, sample: &ElevationSample, synthetic: bool) -> Self {
        Self {
            kind,
            time: sample.timestamp,
            elevation_deg: sample.elevation_deg,
            azimuth_deg: sample.azimuth_deg,
            synthetic,
        }
    }
}

/// One contiguous above-threshold interval for one observer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    pub rise: DateTime<Utc>,
    pub set: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub max_elevation_time: DateTime<Utc>,
    pub rise_azimuth_deg: f64,
    pub set_azimuth_deg: f64,
    pub truncated_start: bool,
    pub truncated_end: bool,
}

impl Pass {
    pub fn duration(&self) -> Duration {
        self.set - self.rise
    }
}

/// Interval during which every participating observer sees the satellite.
///
/// Only built by [`crate::predict::WindowIntersector`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonWindow {
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) max_common_elevation_deg: f64,
    pub(crate) pass_indices: Vec<usize>,
}

impl CommonWindow {
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn max_common_elevation_deg(&self) -> f64 {
        self.max_common_elevation_deg
    }

    /// Index of the contributing pass in each observer's pass list, in
    /// observer order.
    pub fn pass_indices(&self) -> &[usize] {
        &self.pass_indices
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
