use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use chrono::NaiveDate;

use crate::predict::{
    Observer, OrbitalElementSet, PassCache, PassKey, PassList, PredictError, Propagator,
    VisibilityEngine,
};

/// Cooperative cancellation shared between the caller and the workers.
/// Units already being computed run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self, reason: impl Into<String>) {
        let mut guard = self
            .reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_none() {
            *guard = Some(reason.into());
        }
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reason(&self) -> Option<String> {
        self.reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// One pass computation: a satellite over one observer for one UTC day.
#[derive(Debug, Clone)]
pub struct BatchUnit {
    pub elements: OrbitalElementSet,
    pub observer: Observer,
    pub date: NaiveDate,
    pub threshold_deg: f64,
}

impl BatchUnit {
    /// Units for every observer on each of `days` consecutive UTC days from
    /// `start`, ordered by day and then by observer.
    pub fn schedule(
        elements: &OrbitalElementSet,
        observers: &[Observer],
        start: NaiveDate,
        days: u32,
        threshold_deg: f64,
    ) -> Vec<BatchUnit> {
        start
            .iter_days()
            .take(days as usize)
            .flat_map(|date| {
                observers.iter().map(move |observer| BatchUnit {
                    elements: elements.clone(),
                    observer: observer.clone(),
                    date,
                    threshold_deg,
                })
            })
            .collect()
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    Completed(Result<Arc<PassList>, PredictError>),
    /// Skipped because the token was cancelled before the unit started.
    Cancelled,
}

impl BatchOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BatchOutcome::Cancelled)
    }
}

pub struct BatchRunner {
    workers: usize,
    cache: Option<Arc<PassCache>>,
}

impl BatchRunner {
    /// `workers` is raised to at least one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<PassCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Compute every unit on a pool of scoped worker threads. Outcomes are
    /// returned in the order of `units`.
    pub fn run<P: Propagator>(
        &self,
        engine: &VisibilityEngine<P>,
        units: &[BatchUnit],
        cancel: &CancelToken,
    ) -> Vec<BatchOutcome> {
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        let workers = self.workers.min(units.len()).max(1);

        log::info!("Running {} pass computations on {} workers", units.len(), workers);

        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(unit) = units.get(index) else {
                        break;
                    };
                    let outcome = if cancel.is_cancelled() {
                        BatchOutcome::Cancelled
                    } else {
                        BatchOutcome::Completed(self.compute(engine, unit))
                    };
                    if tx.send((index, outcome)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut outcomes: Vec<Option<BatchOutcome>> = units.iter().map(|_| None).collect();
        for (index, outcome) in rx {
            outcomes[index] = Some(outcome);
        }

        if cancel.is_cancelled() {
            let skipped = outcomes
                .iter()
                .filter(|o| matches!(o, Some(BatchOutcome::Cancelled)))
                .count();
            log::warn!(
                "Batch cancelled ({}), {} of {} units skipped",
                cancel.reason().unwrap_or_default(),
                skipped,
                units.len()
            );
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or(BatchOutcome::Cancelled))
            .collect()
    }

    fn compute<P: Propagator>(
        &self,
        engine: &VisibilityEngine<P>,
        unit: &BatchUnit,
    ) -> Result<Arc<PassList>, PredictError> {
        let passes = || {
            engine.passes_for_day(&unit.elements, &unit.observer, unit.date, unit.threshold_deg)
        };
        match &self.cache {
            Some(cache) => {
                let key =
                    PassKey::new(&unit.elements, &unit.observer, unit.date, unit.threshold_deg);
                cache.get_or_compute(key, passes)
            }
            None => passes().map(Arc::new),
        }
    }
}
