//! Fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::predict::elements::tle_checksum;
use crate::predict::{ElevationSample, Observer, OrbitalElementSet, PredictError, Propagator};

pub const ISS_LINE1: &str =
    "1 25544U 98067A   25278.49802050  .00011384  00000+0  20935-3 0  9990";
pub const ISS_LINE2: &str =
    "2 25544  51.6327 120.3420 0000884 206.2421 153.8523 15.49697304532279";

pub fn iss() -> OrbitalElementSet {
    OrbitalElementSet::from_lines(Some("ISS (ZARYA)"), ISS_LINE1, ISS_LINE2).unwrap()
}

pub fn elements() -> OrbitalElementSet {
    iss()
}

pub fn observer(name: &str) -> Observer {
    Observer::new(name, 0.0, 0.0, 0.0).unwrap()
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()
}

/// `HH:MM:SS` on the fixture day.
pub fn at(time: &str) -> DateTime<Utc> {
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").unwrap();
    day().and_time(time).and_utc()
}

/// Replace the checksum column of an edited TLE line.
pub fn with_checksum(line: &str) -> String {
    format!("{}{}", &line[..68], tle_checksum(line))
}

/// Parabolic elevation arc: `edge_deg` at `rise` and `set`, `peak_deg` at
/// `peak`, falling off quadratically outside.
#[derive(Debug, Clone, Copy)]
pub struct Hump {
    rise: DateTime<Utc>,
    set: DateTime<Utc>,
    peak: DateTime<Utc>,
    peak_deg: f64,
    edge_deg: f64,
}

pub fn hump(rise: &str, set: &str, peak: &str, peak_deg: f64) -> Hump {
    Hump {
        rise: at(rise),
        set: at(set),
        peak: at(peak),
        peak_deg,
        edge_deg: 0.0,
    }
}

impl Hump {
    /// Make the arc cross `edge_deg` (instead of 0) at rise and set.
    pub fn edge(mut self, edge_deg: f64) -> Self {
        self.edge_deg = edge_deg;
        self
    }

    fn elevation(&self, t: DateTime<Utc>) -> f64 {
        let half = if t <= self.peak {
            self.peak - self.rise
        } else {
            self.set - self.peak
        };
        let half_ms = half.num_milliseconds().max(1) as f64;
        let u = (t - self.peak).num_milliseconds() as f64 / half_ms;
        (self.peak_deg - (self.peak_deg - self.edge_deg) * u * u).max(-90.0)
    }
}

/// Synthetic propagator: each observer sees the highest of its humps.
pub struct HumpPropagator {
    humps: HashMap<String, Vec<Hump>>,
    flat_deg: Option<f64>,
    fail_after: Option<DateTime<Utc>>,
    calls: AtomicUsize,
}

impl HumpPropagator {
    pub fn new() -> Self {
        Self {
            humps: HashMap::new(),
            flat_deg: None,
            fail_after: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn flat(elevation_deg: f64) -> Self {
        Self {
            flat_deg: Some(elevation_deg),
            ..Self::new()
        }
    }

    pub fn with(mut self, observer: &str, hump: Hump) -> Self {
        self.humps.entry(observer.to_string()).or_default().push(hump);
        self
    }

    pub fn failing_after(mut self, at: DateTime<Utc>) -> Self {
        self.fail_after = Some(at);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn elevation(&self, observer: &str, t: DateTime<Utc>) -> f64 {
        if let Some(flat) = self.flat_deg {
            return flat;
        }
        self.humps
            .get(observer)
            .into_iter()
            .flatten()
            .map(|h| h.elevation(t))
            .fold(-90.0, f64::max)
    }
}

impl Propagator for HumpPropagator {
    fn sample(
        &self,
        _elements: &OrbitalElementSet,
        observer: &Observer,
        instant: DateTime<Utc>,
    ) -> Result<ElevationSample, PredictError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_after.is_some_and(|limit| instant > limit) {
            return Err(PredictError::Propagation {
                observer: observer.name().to_string(),
                at: instant,
                message: "synthetic failure".into(),
            });
        }
        Ok(ElevationSample {
            timestamp: instant,
            elevation_deg: self.elevation(observer.name(), instant),
            azimuth_deg: (instant.timestamp() as f64 / 10.0).rem_euclid(360.0),
            range_km: 1000.0,
        })
    }
}
