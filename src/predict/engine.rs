use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{info, warn};

use crate::predict::freshness::{
    Freshness, FreshnessEvaluator, DEFAULT_ACCEPTABLE_DAYS, DEFAULT_FRESH_DAYS,
};
use crate::predict::pass_assembler::DEFAULT_MIN_PASS_DURATION;
use crate::predict::types::CommonWindow;
use crate::predict::{
    EventFinder, Observer, ObserverInput, OrbitalElementSet, PassAssembler, PassList,
    PredictError, Propagator, SearchSettings, WindowIntersector,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub search: SearchSettings,
    pub min_pass_duration: Duration,
    pub fresh_days: f64,
    pub acceptable_days: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            min_pass_duration: DEFAULT_MIN_PASS_DURATION,
            fresh_days: DEFAULT_FRESH_DAYS,
            acceptable_days: DEFAULT_ACCEPTABLE_DAYS,
        }
    }
}

/// Result for one observer of a [`DayReport`].
#[derive(Debug)]
pub struct ObserverReport {
    pub name: String,
    pub observer: Option<Observer>,
    pub passes: Result<PassList, PredictError>,
}

#[derive(Debug)]
pub enum CommonOutcome {
    /// Fewer than two observers were requested.
    NotRequested,
    /// At least one observer failed, so no intersection is reported.
    Unavailable { reason: String },
    Windows(Vec<CommonWindow>),
}

#[derive(Debug)]
pub struct DayReport {
    pub date: NaiveDate,
    pub threshold_deg: f64,
    pub observers: Vec<ObserverReport>,
    pub common: CommonOutcome,
    pub freshness: Freshness,
}

/// Pass prediction and common-visibility engine over an injected propagator.
pub struct VisibilityEngine<P> {
    propagator: P,
    finder: EventFinder,
    assembler: PassAssembler,
    intersector: WindowIntersector,
    freshness: FreshnessEvaluator,
}

/// `[date 00:00, date + 1 00:00]` in UTC.
pub fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

impl<P: Propagator> VisibilityEngine<P> {
    pub fn new(propagator: P, settings: EngineSettings) -> Result<Self, PredictError> {
        if settings.min_pass_duration < Duration::zero() {
            return Err(PredictError::InvalidSettings(
                "minimum pass duration must not be negative".into(),
            ));
        }
        Ok(Self {
            propagator,
            finder: EventFinder::new(settings.search)?,
            assembler: PassAssembler::new(settings.min_pass_duration),
            intersector: WindowIntersector::new(),
            freshness: FreshnessEvaluator::new(settings.fresh_days, settings.acceptable_days),
        })
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    pub fn finder(&self) -> &EventFinder {
        &self.finder
    }

    pub fn passes_in_window(
        &self,
        elements: &OrbitalElementSet,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        threshold_deg: f64,
    ) -> Result<PassList, PredictError> {
        validate_threshold(threshold_deg)?;
        let events = self.finder.find_events(
            &self.propagator,
            elements,
            observer,
            start,
            end,
            threshold_deg,
        )?;
        Ok(self.assembler.assemble(&events))
    }

    pub fn passes_for_day(
        &self,
        elements: &OrbitalElementSet,
        observer: &Observer,
        date: NaiveDate,
        threshold_deg: f64,
    ) -> Result<PassList, PredictError> {
        let (start, end) = day_window(date);
        let list = self.passes_in_window(elements, observer, start, end, threshold_deg)?;
        info!(
            "{} over {} on {}: {} passes ({} degenerate windows discarded)",
            elements.name,
            observer.name(),
            date,
            list.len(),
            list.degenerate_windows
        );
        Ok(list)
    }

    pub fn common_windows(
        &self,
        elements: &OrbitalElementSet,
        observers: &[(&Observer, &PassList)],
    ) -> Result<Vec<CommonWindow>, PredictError> {
        self.intersector
            .common_windows(&self.propagator, &self.finder, elements, observers)
    }

    pub fn freshness(&self, elements: &OrbitalElementSet, now: DateTime<Utc>) -> Freshness {
        self.freshness.evaluate(elements, now)
    }

    /// Per-observer passes, common windows and freshness for one UTC day.
    ///
    /// An invalid observer or a propagation failure only affects that
    /// observer's entry.
    pub fn day_report(
        &self,
        elements: &OrbitalElementSet,
        inputs: &[ObserverInput],
        date: NaiveDate,
        threshold_deg: f64,
        now: DateTime<Utc>,
    ) -> DayReport {
        let freshness = self.freshness(elements, now);
        if let Some(warning) = &freshness.warning {
            warn!("{}", warning);
        }

        let observers: Vec<ObserverReport> = inputs
            .iter()
            .map(|input| match input.validate() {
                Ok(observer) => {
                    let passes = self.passes_for_day(elements, &observer, date, threshold_deg);
                    if let Err(e) = &passes {
                        warn!("Pass search failed for {}: {}", observer.name(), e);
                    }
                    ObserverReport {
                        name: input.name.clone(),
                        observer: Some(observer),
                        passes,
                    }
                }
                Err(e) => {
                    warn!("Rejected observer {}: {}", input.name, e);
                    ObserverReport {
                        name: input.name.clone(),
                        observer: None,
                        passes: Err(e),
                    }
                }
            })
            .collect();

        let common = self.common_outcome(elements, &observers);

        DayReport {
            date,
            threshold_deg,
            observers,
            common,
            freshness,
        }
    }

    fn common_outcome(
        &self,
        elements: &OrbitalElementSet,
        observers: &[ObserverReport],
    ) -> CommonOutcome {
        if observers.len() < 2 {
            return CommonOutcome::NotRequested;
        }

        let mut ready = Vec::with_capacity(observers.len());
        for report in observers {
            match (&report.observer, &report.passes) {
                (Some(observer), Ok(list)) => ready.push((observer, list)),
                (_, Err(e)) => {
                    return CommonOutcome::Unavailable {
                        reason: format!("{}: {}", report.name, e),
                    }
                }
                (None, Ok(_)) => {
                    return CommonOutcome::Unavailable {
                        reason: format!("{}: missing observer", report.name),
                    }
                }
            }
        }

        match self.common_windows(elements, &ready) {
            Ok(windows) => CommonOutcome::Windows(windows),
            Err(e) => CommonOutcome::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

fn validate_threshold(threshold_deg: f64) -> Result<(), PredictError> {
    if !threshold_deg.is_finite() || !(-90.0..=90.0).contains(&threshold_deg) {
        return Err(PredictError::InvalidSettings(format!(
            "minimum elevation {} outside -90..90",
            threshold_deg
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::testing::{at, day, elements, hump, observer, HumpPropagator};

    fn engine(propagator: HumpPropagator) -> VisibilityEngine<HumpPropagator> {
        VisibilityEngine::new(propagator, EngineSettings::default()).unwrap()
    }

    fn two_station_propagator() -> HumpPropagator {
        HumpPropagator::new()
            .with("A", hump("10:00:00", "10:08:00", "10:04:00", 45.0).edge(10.0))
            .with("A", hump("11:35:00", "11:44:00", "11:39:30", 25.0).edge(10.0))
            .with("B", hump("10:03:00", "10:11:00", "10:07:00", 30.0).edge(10.0))
            .with("B", hump("17:00:00", "17:06:00", "17:03:00", 15.0).edge(10.0))
    }

    fn input(name: &str, latitude_deg: f64) -> ObserverInput {
        ObserverInput {
            name: name.to_string(),
            latitude_deg,
            longitude_deg: 0.0,
            altitude_m: 0.0,
        }
    }

    #[test]
    fn day_window_is_midnight_to_midnight() {
        let (start, end) = day_window(day());
        assert_eq!(start, at("00:00:00"));
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn passes_satisfy_ordering_invariants() {
        let engine = engine(two_station_propagator());
        let list = engine
            .passes_for_day(&elements(), &observer("A"), day(), 10.0)
            .unwrap();

        assert_eq!(list.len(), 2);
        for pass in &list.passes {
            assert!(pass.rise <= pass.max_elevation_time);
            assert!(pass.max_elevation_time <= pass.set);
        }
        for pair in list.passes.windows(2) {
            assert!(pair[0].set < pair[1].rise);
        }
    }

    #[test]
    fn recomputation_is_identical() {
        let engine = engine(two_station_propagator());
        let first = engine.passes_for_day(&elements(), &observer("A"), day(), 10.0).unwrap();
        let second = engine.passes_for_day(&elements(), &observer("A"), day(), 10.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn raising_threshold_never_grows_visibility() {
        let engine = engine(two_station_propagator());
        let mut previous = None;
        for threshold in [0.0, 10.0, 10.5, 20.0, 26.0, 44.0, 46.0] {
            let total = engine
                .passes_for_day(&elements(), &observer("A"), day(), threshold)
                .unwrap()
                .total_duration();
            if let Some(previous) = previous {
                assert!(total <= previous, "threshold {threshold}: {total} > {previous}");
            }
            previous = Some(total);
        }
        assert_eq!(previous, Some(Duration::zero()));
    }

    #[test]
    fn concrete_two_station_scenario() {
        let engine = engine(two_station_propagator());
        let (a, b) = (observer("A"), observer("B"));
        let la = engine.passes_for_day(&elements(), &a, day(), 10.0).unwrap();
        let lb = engine.passes_for_day(&elements(), &b, day(), 10.0).unwrap();

        let windows = engine.common_windows(&elements(), &[(&a, &la), (&b, &lb)]).unwrap();

        assert_eq!(windows.len(), 1);
        let tolerance = Duration::seconds(1);
        assert!((windows[0].start() - at("10:03:00")).abs() <= tolerance);
        assert!((windows[0].end() - at("10:08:00")).abs() <= tolerance);
        assert!((windows[0].max_common_elevation_deg() - 30.0).abs() < 0.01);

        let [ia, ib] = [windows[0].pass_indices()[0], windows[0].pass_indices()[1]];
        assert_eq!(windows[0].start(), la.passes[ia].rise.max(lb.passes[ib].rise));
        assert_eq!(windows[0].end(), la.passes[ia].set.min(lb.passes[ib].set));
    }

    #[test]
    fn boundary_pass_is_truncated_at_window_start() {
        let propagator =
            HumpPropagator::new().with("A", hump("09:50:00", "10:20:00", "10:05:00", 40.0));
        let engine = engine(propagator);
        let list = engine
            .passes_in_window(&elements(), &observer("A"), at("10:00:00"), at("12:00:00"), 5.0)
            .unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list.passes[0].rise, at("10:00:00"));
        assert!(list.passes[0].truncated_start);
        assert!(!list.passes[0].truncated_end);
    }

    #[test]
    fn disjoint_stations_have_no_common_window() {
        let propagator = HumpPropagator::new()
            .with("A", hump("04:00:00", "04:10:00", "04:05:00", 50.0))
            .with("B", hump("16:00:00", "16:10:00", "16:05:00", 50.0));
        let engine = engine(propagator);
        let report = engine.day_report(
            &elements(),
            &[input("A", 0.0), input("B", 0.0)],
            day(),
            10.0,
            elements().epoch,
        );
        match report.common {
            CommonOutcome::Windows(windows) => assert!(windows.is_empty()),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn invalid_observer_only_affects_itself() {
        let engine = engine(two_station_propagator());
        let report = engine.day_report(
            &elements(),
            &[input("A", 0.0), input("B", 123.0)],
            day(),
            10.0,
            elements().epoch,
        );

        assert_eq!(report.observers.len(), 2);
        assert_eq!(report.observers[0].passes.as_ref().unwrap().len(), 2);
        assert!(matches!(
            report.observers[1].passes,
            Err(PredictError::InvalidObserver { .. })
        ));
        assert!(matches!(report.common, CommonOutcome::Unavailable { .. }));
    }

    #[test]
    fn single_observer_report_has_no_common_section() {
        let engine = engine(two_station_propagator());
        let now = elements().epoch + Duration::days(20);
        let report = engine.day_report(&elements(), &[input("A", 0.0)], day(), 10.0, now);

        assert!(matches!(report.common, CommonOutcome::NotRequested));
        assert!(!report.freshness.is_fresh);
        assert!(report.freshness.warning.is_some());
        // Stale data still produces passes.
        assert_eq!(report.observers[0].passes.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn propagation_failure_is_reported_not_hidden() {
        let propagator = two_station_propagator().failing_after(at("12:00:00"));
        let engine = engine(propagator);
        let err = engine
            .passes_for_day(&elements(), &observer("A"), day(), 10.0)
            .unwrap_err();
        assert!(matches!(err, PredictError::Propagation { .. }));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let engine = engine(two_station_propagator());
        assert!(engine
            .passes_for_day(&elements(), &observer("A"), day(), 91.0)
            .is_err());
        assert!(engine
            .passes_for_day(&elements(), &observer("A"), day(), f64::NAN)
            .is_err());
    }
}
