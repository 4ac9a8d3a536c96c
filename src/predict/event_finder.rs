use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::predict::types::{PassEvent, PassEventKind};
use crate::predict::{ElevationSample, Observer, OrbitalElementSet, PredictError, Propagator};

pub const DEFAULT_COARSE_STEP: Duration = Duration::seconds(60);
pub const DEFAULT_TOLERANCE: Duration = Duration::seconds(1);

const MIN_TOLERANCE: Duration = Duration::milliseconds(1);
const INV_PHI: f64 = 0.618_033_988_749_895;
const MAX_PEAK_ITERATIONS: usize = 64;

/// Sampling and refinement parameters of the event search.
///
/// Passes shorter than `coarse_step` that start and end between two coarse
/// samples are not detected; refined crossing and culmination times are
/// accurate to `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub coarse_step: Duration,
    pub tolerance: Duration,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            coarse_step: DEFAULT_COARSE_STEP,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), PredictError> {
        if self.coarse_step <= Duration::zero() {
            return Err(PredictError::InvalidSettings(
                "coarse step must be positive".into(),
            ));
        }
        if self.tolerance < MIN_TOLERANCE {
            return Err(PredictError::InvalidSettings(
                "tolerance must be at least 1ms".into(),
            ));
        }
        Ok(())
    }
}

/// Locates threshold crossings and culminations for one observer.
#[derive(Debug, Clone)]
pub struct EventFinder {
    settings: SearchSettings,
}

impl EventFinder {
    pub fn new(settings: SearchSettings) -> Result<Self, PredictError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Lazily sample `[start, end]` every coarse step; the last sample always
    /// lands exactly on `end`.
    pub fn coarse_samples<'a, P: Propagator + ?Sized>(
        &self,
        propagator: &'a P,
        elements: &'a OrbitalElementSet,
        observer: &'a Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CoarseSamples<'a, P> {
        CoarseSamples {
            propagator,
            elements,
            observer,
            cursor: (start <= end).then_some(start),
            end,
            step: self.settings.coarse_step,
        }
    }

    /// Ordered Rise/MaxElevation/Set events for every pass in the window.
    ///
    /// A satellite already above the threshold at `start` (or still above at
    /// `end`) yields a synthetic Rise (Set) on that boundary.
    pub fn find_events<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &OrbitalElementSet,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        threshold_deg: f64,
    ) -> Result<Vec<PassEvent>, PredictError> {
        if end < start {
            return Err(PredictError::InvalidSettings(format!(
                "window end {} is before start {}",
                end, start
            )));
        }

        let mut events = Vec::new();
        let mut prev: Option<ElevationSample> = None;
        let mut open: Option<OpenPass> = None;
        let mut samples = 0usize;

        for sample in self.coarse_samples(propagator, elements, observer, start, end) {
            let sample = sample?;
            samples += 1;
            let visible = sample.is_visible(threshold_deg);
            let was_visible = prev.map(|p| p.is_visible(threshold_deg));

            match was_visible {
                None if visible => open = Some(OpenPass::new(sample, true)),
                Some(false) if visible => {
                    let before = prev.unwrap_or(sample);
                    let rise = self.refine_crossing(
                        propagator,
                        elements,
                        observer,
                        before,
                        sample,
                        threshold_deg,
                    )?;
                    let mut pass = OpenPass::new(rise, false);
                    pass.consider(sample);
                    open = Some(pass);
                }
                Some(true) if visible => {
                    if let Some(pass) = open.as_mut() {
                        pass.consider(sample);
                    }
                }
                Some(true) => {
                    let before = prev.unwrap_or(sample);
                    let set = self.refine_crossing(
                        propagator,
                        elements,
                        observer,
                        before,
                        sample,
                        threshold_deg,
                    )?;
                    if let Some(mut pass) = open.take() {
                        pass.consider(set);
                        self.close_pass(
                            propagator,
                            elements,
                            observer,
                            pass,
                            set,
                            false,
                            &mut events,
                        )?;
                    }
                }
                _ => {}
            }

            prev = Some(sample);
        }

        if let Some(pass) = open.take() {
            let last = pass.last;
            self.close_pass(propagator, elements, observer, pass, last, true, &mut events)?;
        }

        debug!(
            "{}: {} events from {} coarse samples between {} and {} (threshold {:.2} deg)",
            observer.name(),
            events.len(),
            samples,
            start,
            end,
            threshold_deg
        );

        Ok(events)
    }

    /// Highest elevation reached inside `[start, end]`.
    pub fn peak_within<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &OrbitalElementSet,
        observer: &Observer,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ElevationSample, PredictError> {
        let mut best: Option<ElevationSample> = None;
        for sample in self.coarse_samples(propagator, elements, observer, start, end) {
            let sample = sample?;
            if best.map_or(true, |b| sample.elevation_deg > b.elevation_deg) {
                best = Some(sample);
            }
        }
        let best = match best {
            Some(best) => best,
            None => {
                return Err(PredictError::InvalidSettings(format!(
                    "empty interval {} .. {}",
                    start, end
                )))
            }
        };
        self.refine_peak(propagator, elements, observer, best, start, end)
    }

    #[allow(clippy::too_many_arguments)]
    fn close_pass<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &OrbitalElementSet,
        observer: &Observer,
        pass: OpenPass,
        set: ElevationSample,
        synthetic_set: bool,
        events: &mut Vec<PassEvent>,
    ) -> Result<(), PredictError> {
        let peak = self.refine_peak(
            propagator,
            elements,
            observer,
            pass.best,
            pass.rise.timestamp,
            set.timestamp,
        )?;

        events.push(PassEvent::new(PassEventKind::Rise, &pass.rise, pass.synthetic_rise));
        events.push(PassEvent::new(PassEventKind::MaxElevation, &peak, false));
        events.push(PassEvent::new(PassEventKind::Set, &set, synthetic_set));
        Ok(())
    }

    /// Bisect a bracket whose ends disagree on visibility down to the
    /// tolerance. Returns the visible end of the final bracket.
    fn refine_crossing<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &OrbitalElementSet,
        observer: &Observer,
        before: ElevationSample,
        after: ElevationSample,
        threshold_deg: f64,
    ) -> Result<ElevationSample, PredictError> {
        let mut low = before;
        let mut high = after;
        let low_visible = low.is_visible(threshold_deg);

        while high.timestamp - low.timestamp > self.settings.tolerance {
            let mid = low.timestamp + (high.timestamp - low.timestamp) / 2;
            let sample = propagator.sample(elements, observer, mid)?;
            if sample.is_visible(threshold_deg) == low_visible {
                low = sample;
            } else {
                high = sample;
            }
        }

        Ok(if low_visible { low } else { high })
    }

    /// Golden-section search for the culmination around the best coarse
    /// sample, clamped to `[lower, upper]`.
    fn refine_peak<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        elements: &OrbitalElementSet,
        observer: &Observer,
        coarse_best: ElevationSample,
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    ) -> Result<ElevationSample, PredictError> {
        let step = self.settings.coarse_step;
        let mut a = (coarse_best.timestamp - step).max(lower);
        let mut b = (coarse_best.timestamp + step).min(upper);
        let mut best = coarse_best;

        if b - a <= self.settings.tolerance {
            return Ok(best);
        }

        let mut c = lerp(a, b, 1.0 - INV_PHI);
        let mut d = lerp(a, b, INV_PHI);
        let mut fc = propagator.sample(elements, observer, c)?;
        let mut fd = propagator.sample(elements, observer, d)?;

        let mut iterations = 0;
        while b - a > self.settings.tolerance && iterations < MAX_PEAK_ITERATIONS {
            if fc.elevation_deg >= fd.elevation_deg {
                b = d;
                d = c;
                fd = fc;
                c = lerp(a, b, 1.0 - INV_PHI);
                fc = propagator.sample(elements, observer, c)?;
            } else {
                a = c;
                c = d;
                fc = fd;
                d = lerp(a, b, INV_PHI);
                fd = propagator.sample(elements, observer, d)?;
            }
            iterations += 1;
        }

        for candidate in [fc, fd] {
            if candidate.elevation_deg > best.elevation_deg {
                best = candidate;
            }
        }
        Ok(best)
    }
}

/// Finite, lazy sequence of samples across a window.
pub struct CoarseSamples<'a, P: ?Sized> {
    propagator: &'a P,
    elements: &'a OrbitalElementSet,
    observer: &'a Observer,
    cursor: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    step: Duration,
}

impl<P: Propagator + ?Sized> Iterator for CoarseSamples<'_, P> {
    type Item = Result<ElevationSample, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        let at = self.cursor?;
        self.cursor = if at >= self.end {
            None
        } else {
            Some((at + self.step).min(self.end))
        };
        Some(self.propagator.sample(self.elements, self.observer, at))
    }
}

struct OpenPass {
    rise: ElevationSample,
    synthetic_rise: bool,
    best: ElevationSample,
    last: ElevationSample,
}

impl OpenPass {
    fn new(rise: ElevationSample, synthetic_rise: bool) -> Self {
        Self {
            rise,
            synthetic_rise,
            best: rise,
            last: rise,
        }
    }

    fn consider(&mut self, sample: ElevationSample) {
        if sample.elevation_deg > self.best.elevation_deg {
            self.best = sample;
        }
        self.last = sample;
    }
}

fn lerp(a: DateTime<Utc>, b: DateTime<Utc>, fraction: f64) -> DateTime<Utc> {
    let span_ms = (b - a).num_milliseconds() as f64;
    a + Duration::milliseconds((span_ms * fraction).round() as i64)
}
