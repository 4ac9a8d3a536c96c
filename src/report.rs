use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::batch::{BatchOutcome, BatchUnit};
use crate::predict::{
    CommonOutcome, CommonWindow, DayReport, Freshness, OrbitalElementSet, Pass, PredictError,
};

const TIME_FORMAT: &str = "%H:%M:%S";

/// Table row for one pass, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRow {
    pub number: usize,
    pub date: NaiveDate,
    pub rise: String,
    pub set: String,
    pub max_elevation_deg: f64,
    pub duration_seconds: i64,
    pub duration_str: String,
    pub truncated: bool,
}

/// Table row for one common visibility window, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub number: usize,
    pub date: NaiveDate,
    pub start: String,
    pub end: String,
    pub max_common_elevation_deg: f64,
    pub duration_seconds: i64,
    pub duration_str: String,
}

pub fn pass_rows(passes: &[Pass]) -> Vec<PassRow> {
    passes
        .iter()
        .enumerate()
        .map(|(i, pass)| PassRow {
            number: i + 1,
            date: pass.rise.date_naive(),
            rise: clock(pass.rise),
            set: clock(pass.set),
            max_elevation_deg: round2(pass.max_elevation_deg),
            duration_seconds: pass.duration().num_seconds(),
            duration_str: format_duration(pass.duration()),
            truncated: pass.truncated_start || pass.truncated_end,
        })
        .collect()
}

pub fn window_rows(windows: &[CommonWindow]) -> Vec<WindowRow> {
    windows
        .iter()
        .enumerate()
        .map(|(i, window)| WindowRow {
            number: i + 1,
            date: window.start().date_naive(),
            start: clock(window.start()),
            end: clock(window.end()),
            max_common_elevation_deg: round2(window.max_common_elevation_deg()),
            duration_seconds: window.duration().num_seconds(),
            duration_str: format_duration(window.duration()),
        })
        .collect()
}

/// `"{m}m {s}s"`, or `"{h}h {m}m {s}s"` from one hour up. Sub-second
/// remainder dropped.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

fn clock(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
pub struct StationSection {
    pub name: String,
    pub passes: Vec<PassRow>,
    pub degenerate_windows: usize,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommonSection {
    NotRequested,
    Unavailable { reason: String },
    Windows { windows: Vec<WindowRow> },
}

/// Presentation form of a [`DayReport`], for text or JSON output.
#[derive(Debug, Serialize)]
pub struct ReportView {
    pub satellite: String,
    pub norad_id: u64,
    pub date: NaiveDate,
    pub min_elevation_deg: f64,
    pub freshness: Freshness,
    pub stations: Vec<StationSection>,
    pub common: CommonSection,
}

impl ReportView {
    pub fn new(elements: &OrbitalElementSet, report: &DayReport) -> Self {
        let stations = report
            .observers
            .iter()
            .map(|observer| match &observer.passes {
                Ok(list) => StationSection {
                    name: observer.name.clone(),
                    passes: pass_rows(&list.passes),
                    degenerate_windows: list.degenerate_windows,
                    error: None,
                },
                Err(e) => failed_station(observer.name.clone(), e.to_string()),
            })
            .collect();

        let common = match &report.common {
            CommonOutcome::NotRequested => CommonSection::NotRequested,
            CommonOutcome::Unavailable { reason } => CommonSection::Unavailable {
                reason: reason.clone(),
            },
            CommonOutcome::Windows(windows) => CommonSection::Windows {
                windows: window_rows(windows),
            },
        };

        Self {
            satellite: elements.name.clone(),
            norad_id: elements.norad_id,
            date: report.date,
            min_elevation_deg: report.threshold_deg,
            freshness: report.freshness.clone(),
            stations,
            common,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} ({}) on {}, minimum elevation {:.1}°\n",
            self.satellite, self.norad_id, self.date, self.min_elevation_deg
        );
        out.push_str(&format!(
            "Element set epoch {} ({:.1} days old, {})\n",
            self.freshness.epoch.format("%Y-%m-%d %H:%M:%S UTC"),
            self.freshness.age_days,
            self.freshness.status
        ));
        if let Some(warning) = &self.freshness.warning {
            out.push_str(&format!("WARNING: {}\n", warning));
        }

        for station in &self.stations {
            out.push_str(&format!("\n{}\n", station.name));
            match &station.error {
                Some(error) => out.push_str(&format!("  error: {}\n", error)),
                None if station.passes.is_empty() => out.push_str("  no passes\n"),
                None => out.push_str(&render_passes(&station.passes)),
            }
        }

        match &self.common {
            CommonSection::NotRequested => {}
            CommonSection::Unavailable { reason } => {
                out.push_str(&format!("\nCommon windows unavailable: {}\n", reason));
            }
            CommonSection::Windows { windows } if windows.is_empty() => {
                out.push_str("\nNo common visibility windows\n");
            }
            CommonSection::Windows { windows } => {
                out.push_str("\nCommon visibility windows\n");
                out.push_str(&render_windows(windows));
            }
        }
        out
    }
}

/// One station on one day of a multi-day schedule.
#[derive(Debug, Serialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub station: StationSection,
}

/// Presentation form of a batch of per-day pass computations.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub satellite: String,
    pub norad_id: u64,
    pub min_elevation_deg: f64,
    pub freshness: Freshness,
    /// Stations refused before any computation.
    pub rejected: Vec<StationSection>,
    pub entries: Vec<ScheduleEntry>,
}

impl ScheduleView {
    /// `outcomes` are in the order of `units`, as returned by the batch
    /// runner.
    pub fn new(
        elements: &OrbitalElementSet,
        freshness: Freshness,
        threshold_deg: f64,
        units: &[BatchUnit],
        outcomes: &[BatchOutcome],
    ) -> Self {
        let entries = units
            .iter()
            .zip(outcomes)
            .map(|(unit, outcome)| {
                let name = unit.observer.name().to_string();
                let station = match outcome {
                    BatchOutcome::Completed(Ok(list)) => StationSection {
                        name,
                        passes: pass_rows(&list.passes),
                        degenerate_windows: list.degenerate_windows,
                        error: None,
                    },
                    BatchOutcome::Completed(Err(e)) => failed_station(name, e.to_string()),
                    BatchOutcome::Cancelled => failed_station(name, "cancelled".to_string()),
                };
                ScheduleEntry {
                    date: unit.date,
                    station,
                }
            })
            .collect();

        Self {
            satellite: elements.name.clone(),
            norad_id: elements.norad_id,
            min_elevation_deg: threshold_deg,
            freshness,
            rejected: Vec::new(),
            entries,
        }
    }

    pub fn with_rejected(mut self, name: &str, error: &PredictError) -> Self {
        self.rejected.push(failed_station(name.to_string(), error.to_string()));
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.rejected.is_empty() || self.entries.iter().any(|e| e.station.error.is_some())
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} ({}), minimum elevation {:.1}°\n",
            self.satellite, self.norad_id, self.min_elevation_deg
        );
        out.push_str(&format!(
            "Element set epoch {} ({:.1} days old, {})\n",
            self.freshness.epoch.format("%Y-%m-%d %H:%M:%S UTC"),
            self.freshness.age_days,
            self.freshness.status
        ));
        if let Some(warning) = &self.freshness.warning {
            out.push_str(&format!("WARNING: {}\n", warning));
        }
        for station in &self.rejected {
            if let Some(error) = &station.error {
                out.push_str(&format!("\n{}\n  error: {}\n", station.name, error));
            }
        }

        for entry in &self.entries {
            out.push_str(&format!("\n{} {}\n", entry.date, entry.station.name));
            match &entry.station.error {
                Some(error) => out.push_str(&format!("  error: {}\n", error)),
                None if entry.station.passes.is_empty() => out.push_str("  no passes\n"),
                None => out.push_str(&render_passes(&entry.station.passes)),
            }
        }
        out
    }
}

fn failed_station(name: String, error: String) -> StationSection {
    StationSection {
        name,
        passes: Vec::new(),
        degenerate_windows: 0,
        error: Some(error),
    }
}

pub fn render_passes(rows: &[PassRow]) -> String {
    let mut out = format!(
        "  {:>3}  {:<10}  {:<8}  {:<8}  {:>8}  {:>9}\n",
        "Nr", "Date", "Rise", "Set", "Max El", "Duration"
    );
    for row in rows {
        out.push_str(&format!(
            "  {:>3}  {:<10}  {:<8}  {:<8}  {:>7.2}°  {:>9}{}\n",
            row.number,
            row.date,
            row.rise,
            row.set,
            row.max_elevation_deg,
            row.duration_str,
            if row.truncated { "  (truncated)" } else { "" }
        ));
    }
    out
}

pub fn render_windows(rows: &[WindowRow]) -> String {
    let mut out = format!(
        "  {:>3}  {:<10}  {:<8}  {:<8}  {:>8}  {:>9}\n",
        "Nr", "Date", "Start", "End", "Max El", "Duration"
    );
    for row in rows {
        out.push_str(&format!(
            "  {:>3}  {:<10}  {:<8}  {:<8}  {:>7.2}°  {:>9}\n",
            row.number,
            row.date,
            row.start,
            row.end,
            row.max_common_elevation_deg,
            row.duration_str
        ));
    }
    out
}
