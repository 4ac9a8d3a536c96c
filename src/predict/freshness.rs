use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::predict::OrbitalElementSet;

pub const DEFAULT_FRESH_DAYS: f64 = 3.0;
pub const DEFAULT_ACCEPTABLE_DAYS: f64 = 7.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FreshnessStatus {
    Fresh,
    Acceptable,
    Stale,
}

/// Advisory age metadata for an element set. Never blocks a computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Freshness {
    pub epoch: DateTime<Utc>,
    pub age_days: f64,
    pub status: FreshnessStatus,
    pub is_fresh: bool,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct FreshnessEvaluator {
    fresh_days: f64,
    acceptable_days: f64,
}

impl Default for FreshnessEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FRESH_DAYS, DEFAULT_ACCEPTABLE_DAYS)
    }
}

impl FreshnessEvaluator {
    /// `acceptable_days` below `fresh_days` is raised to `fresh_days`.
    pub fn new(fresh_days: f64, acceptable_days: f64) -> Self {
        Self {
            fresh_days,
            acceptable_days: acceptable_days.max(fresh_days),
        }
    }

    pub fn evaluate(&self, elements: &OrbitalElementSet, now: DateTime<Utc>) -> Freshness {
        let age = now - elements.epoch;
        let age_days = age.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;

        let status = if age_days <= self.fresh_days {
            FreshnessStatus::Fresh
        } else if age_days <= self.acceptable_days {
            FreshnessStatus::Acceptable
        } else {
            FreshnessStatus::Stale
        };

        let warning = (status == FreshnessStatus::Stale).then(|| {
            format!(
                "Element set for {} is {:.1} days old (epoch {}); predictions may be inaccurate",
                elements.name,
                age_days,
                elements.epoch.format("%Y-%m-%d %H:%M:%S UTC")
            )
        });

        Freshness {
            epoch: elements.epoch,
            age_days,
            status,
            is_fresh: status == FreshnessStatus::Fresh,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::testing::iss;
    use chrono::Duration;

    #[test]
    fn stale_after_twenty_days() {
        let elements = iss();
        let freshness =
            FreshnessEvaluator::default().evaluate(&elements, elements.epoch + Duration::days(20));

        assert_eq!(freshness.status, FreshnessStatus::Stale);
        assert!(!freshness.is_fresh);
        assert!((freshness.age_days - 20.0).abs() < 1e-9);
        let warning = freshness.warning.unwrap();
        assert!(warning.contains("20.0 days"), "{}", warning);
    }

    #[test]
    fn classification_boundaries() {
        let elements = iss();
        let evaluator = FreshnessEvaluator::default();
        let status = |hours: i64| {
            evaluator
                .evaluate(&elements, elements.epoch + Duration::hours(hours))
                .status
        };

        assert_eq!(status(12), FreshnessStatus::Fresh);
        assert_eq!(status(72), FreshnessStatus::Fresh);
        assert_eq!(status(73), FreshnessStatus::Acceptable);
        assert_eq!(status(168), FreshnessStatus::Acceptable);
        assert_eq!(status(169), FreshnessStatus::Stale);
    }

    #[test]
    fn fractional_age_and_no_warning_when_fresh() {
        let elements = iss();
        let freshness =
            FreshnessEvaluator::default().evaluate(&elements, elements.epoch + Duration::hours(36));
        assert!((freshness.age_days - 1.5).abs() < 1e-9);
        assert!(freshness.is_fresh);
        assert!(freshness.warning.is_none());
    }

    #[test]
    fn custom_thresholds() {
        let elements = iss();
        let evaluator = FreshnessEvaluator::new(2.0, 14.0);
        let at = |days| evaluator.evaluate(&elements, elements.epoch + Duration::days(days));
        assert_eq!(at(3).status, FreshnessStatus::Acceptable);
        assert_eq!(at(14).status, FreshnessStatus::Acceptable);
        assert_eq!(at(15).status, FreshnessStatus::Stale);
        assert_eq!(FreshnessStatus::Acceptable.to_string(), "acceptable");
    }
}
