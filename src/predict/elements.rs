use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::predict::error::PredictError;

const TLE_LINE_LENGTH: usize = 69;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Unclassified,
    Classified,
    Secret,
}

/// A validated two-line element set.
///
/// Values are immutable once built; a newer fetch produces a new value that
/// supersedes this one.
#[derive(Debug, Clone, Serialize)]
pub struct OrbitalElementSet {
    pub name: String,
    pub norad_id: u64,
    pub international_designator: Option<String>,
    pub classification: Classification,
    pub epoch: DateTime<Utc>,
    pub line1: String,
    pub line2: String,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub mean_motion_rev_per_day: f64,
    pub argument_of_perigee_deg: f64,
    pub raan_deg: f64,
    pub mean_anomaly_deg: f64,
    pub drag_term: f64,
    pub mean_motion_dot: f64,
    pub mean_motion_ddot: f64,
    pub revolution_number: u64,
    pub element_set_number: u64,
    #[serde(skip)]
    elements: sgp4::Elements,
    #[serde(skip)]
    constants: sgp4::Constants,
}

impl OrbitalElementSet {
    /// Validate and parse a named pair of TLE lines.
    pub fn from_lines(
        name: Option<&str>,
        line1: &str,
        line2: &str,
    ) -> Result<Self, PredictError> {
        let line1 = line1.trim_end();
        let line2 = line2.trim_end();
        let label = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| catalog_label(line1));

        validate_line(&label, line1, '1')?;
        validate_line(&label, line2, '2')?;
        if line1[2..7] != line2[2..7] {
            return Err(PredictError::invalid_elements(
                &label,
                format!(
                    "catalog number mismatch between lines ({} vs {})",
                    line1[2..7].trim(),
                    line2[2..7].trim()
                ),
            ));
        }

        let elements = sgp4::Elements::from_tle(
            Some(label.clone()),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|e| PredictError::invalid_elements(&label, e))?;
        let constants = sgp4::Constants::from_elements(&elements)
            .map_err(|e| PredictError::invalid_elements(&label, e))?;

        let classification = match line1.as_bytes()[7] {
            b'U' | b' ' => Classification::Unclassified,
            b'C' => Classification::Classified,
            b'S' => Classification::Secret,
            other => {
                return Err(PredictError::invalid_elements(
                    &label,
                    format!("unknown classification '{}'", other as char),
                ))
            }
        };

        Ok(Self {
            name: label,
            norad_id: elements.norad_id,
            international_designator: elements.international_designator.clone(),
            classification,
            epoch: elements.datetime.and_utc(),
            line1: line1.to_string(),
            line2: line2.to_string(),
            inclination_deg: elements.inclination,
            eccentricity: elements.eccentricity,
            mean_motion_rev_per_day: elements.mean_motion,
            argument_of_perigee_deg: elements.argument_of_perigee,
            raan_deg: elements.right_ascension,
            mean_anomaly_deg: elements.mean_anomaly,
            drag_term: elements.drag_term,
            mean_motion_dot: elements.mean_motion_dot,
            mean_motion_ddot: elements.mean_motion_ddot,
            revolution_number: elements.revolution_number,
            element_set_number: elements.element_set_number,
            elements,
            constants,
        })
    }

    /// Parse a single 2-line or 3-line (named) TLE block.
    pub fn parse(text: &str) -> Result<Self, PredictError> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        match lines.as_slice() {
            [line1, line2] => Self::from_lines(None, line1, line2),
            [name, line1, line2] => Self::from_lines(Some(*name), line1, line2),
            _ => Err(PredictError::invalid_elements(
                "<input>",
                format!("expected 2 or 3 non-empty lines, got {}", lines.len()),
            )),
        }
    }

    pub fn period_minutes(&self) -> f64 {
        1440.0 / self.mean_motion_rev_per_day
    }

    pub fn is_newer_than(&self, other: &OrbitalElementSet) -> bool {
        self.epoch > other.epoch
    }

    pub(crate) fn sgp4_elements(&self) -> &sgp4::Elements {
        &self.elements
    }

    pub(crate) fn sgp4_constants(&self) -> &sgp4::Constants {
        &self.constants
    }
}

/// Modulo-10 TLE checksum over the first 68 columns: digits count their
/// value, minus signs count one, everything else zero.
pub fn tle_checksum(line: &str) -> u32 {
    line.bytes()
        .take(TLE_LINE_LENGTH - 1)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

fn validate_line(label: &str, line: &str, number: char) -> Result<(), PredictError> {
    if !line.is_ascii() {
        return Err(PredictError::invalid_elements(
            label,
            format!("line {} contains non-ASCII characters", number),
        ));
    }
    if line.len() != TLE_LINE_LENGTH {
        return Err(PredictError::invalid_elements(
            label,
            format!(
                "line {} has {} columns, expected {}",
                number,
                line.len(),
                TLE_LINE_LENGTH
            ),
        ));
    }
    let mut prefix = line.chars();
    if prefix.next() != Some(number) || prefix.next() != Some(' ') {
        return Err(PredictError::invalid_elements(
            label,
            format!("line {} must start with \"{} \"", number, number),
        ));
    }

    let expected = line.as_bytes()[TLE_LINE_LENGTH - 1];
    if !expected.is_ascii_digit() {
        return Err(PredictError::invalid_elements(
            label,
            format!("line {} checksum column is not a digit", number),
        ));
    }
    let computed = tle_checksum(line);
    if computed != u32::from(expected - b'0') {
        return Err(PredictError::invalid_elements(
            label,
            format!(
                "line {} checksum mismatch (expected {}, computed {})",
                number,
                expected as char,
                computed
            ),
        ));
    }
    Ok(())
}

fn catalog_label(line1: &str) -> String {
    line1
        .get(2..7)
        .map(|id| format!("NORAD {}", id.trim()))
        .unwrap_or_else(|| "<unnamed>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::testing::{ISS_LINE1, ISS_LINE2};
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_named_block() {
        let text = format!("ISS (ZARYA)\n{}\n{}\n", ISS_LINE1, ISS_LINE2);
        let set = OrbitalElementSet::parse(&text).unwrap();

        assert_eq!(set.name, "ISS (ZARYA)");
        assert_eq!(set.norad_id, 25544);
        assert_eq!(set.classification, Classification::Unclassified);
        assert_eq!(set.epoch.year(), 2025);
        assert_eq!(set.epoch.ordinal(), 278);
        assert_eq!(set.epoch.hour(), 11);
        assert!((set.inclination_deg - 51.6327).abs() < 1e-9);
        assert!((set.eccentricity - 0.0000884).abs() < 1e-12);
        assert!((set.mean_motion_rev_per_day - 15.49697304).abs() < 1e-6);
        assert_eq!(set.revolution_number, 53227);
        assert_eq!(set.element_set_number, 999);
        assert!((set.period_minutes() - 92.92).abs() < 0.01);
    }

    #[test]
    fn propagation_constants_are_ready_at_construction() {
        let text = format!("ISS (ZARYA)\n{}\n{}\n", ISS_LINE1, ISS_LINE2);
        let set = OrbitalElementSet::parse(&text).unwrap();

        let prediction = set
            .sgp4_constants()
            .propagate(sgp4::MinutesSinceEpoch(0.0))
            .unwrap();
        let [x, y, z] = prediction.position;
        let radius_km = (x * x + y * y + z * z).sqrt();
        assert!((6_600.0..6_900.0).contains(&radius_km), "{}", radius_km);
    }

    #[test]
    fn unnamed_block_uses_catalog_label() {
        let text = format!("{}\n{}", ISS_LINE1, ISS_LINE2);
        let set = OrbitalElementSet::parse(&text).unwrap();
        assert_eq!(set.name, "NORAD 25544");
    }

    #[test]
    fn checksum_of_reference_lines() {
        assert_eq!(tle_checksum(ISS_LINE1), 0);
        assert_eq!(tle_checksum(ISS_LINE2), 9);
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let broken = format!("{}8", &ISS_LINE1[..68]);
        let err = OrbitalElementSet::from_lines(Some("ISS"), &broken, ISS_LINE2).unwrap_err();
        match err {
            PredictError::InvalidElementSet { name, message } => {
                assert_eq!(name, "ISS");
                assert!(message.contains("checksum"), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_short_line() {
        let err = OrbitalElementSet::from_lines(None, &ISS_LINE1[..60], ISS_LINE2).unwrap_err();
        assert!(matches!(err, PredictError::InvalidElementSet { .. }));
    }

    #[test]
    fn rejects_swapped_lines() {
        let err = OrbitalElementSet::from_lines(None, ISS_LINE2, ISS_LINE1).unwrap_err();
        assert!(matches!(err, PredictError::InvalidElementSet { .. }));
    }

    #[test]
    fn rejects_catalog_mismatch() {
        // Same checksum digit sum: 25544 -> 25553 keeps the total unchanged.
        let line2 = ISS_LINE2.replacen("25544", "25553", 1);
        let err = OrbitalElementSet::from_lines(None, ISS_LINE1, &line2).unwrap_err();
        match err {
            PredictError::InvalidElementSet { message, .. } => {
                assert!(message.contains("catalog number mismatch"), "{}", message)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_wrong_line_count() {
        assert!(OrbitalElementSet::parse(ISS_LINE1).is_err());
        assert!(OrbitalElementSet::parse("").is_err());
    }

    #[test]
    fn newer_epoch_supersedes() {
        let older = OrbitalElementSet::from_lines(None, ISS_LINE1, ISS_LINE2).unwrap();
        let newer_line1 = crate::predict::testing::with_checksum(
            &ISS_LINE1.replacen("25278.49802050", "25279.49802050", 1),
        );
        let newer = OrbitalElementSet::from_lines(None, &newer_line1, ISS_LINE2).unwrap();
        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
    }
}
