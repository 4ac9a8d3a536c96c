mod cache;
mod elements;
mod engine;
mod error;
mod event_finder;
mod freshness;
mod intersect;
mod observer;
mod pass_assembler;
mod propagation;
mod sample;
mod tle_loader;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{PassCache, PassKey};
pub use elements::{tle_checksum, Classification, OrbitalElementSet};
pub use engine::{
    day_window, CommonOutcome, DayReport, EngineSettings, ObserverReport, VisibilityEngine,
};
pub use error::PredictError;
pub use event_finder::{
    CoarseSamples, EventFinder, SearchSettings, DEFAULT_COARSE_STEP, DEFAULT_TOLERANCE,
};
pub use freshness::{Freshness, FreshnessEvaluator, FreshnessStatus};
pub use intersect::WindowIntersector;
pub use observer::{Observer, ObserverInput};
pub use pass_assembler::{PassAssembler, PassList, DEFAULT_MIN_PASS_DURATION};
pub use propagation::{Propagator, Sgp4Propagator, DEFAULT_MAX_EPOCH_OFFSET};
pub use sample::ElevationSample;
pub use tle_loader::{parse_multi_tle, parse_tle_file, TleLoader};
pub use types::{CommonWindow, Pass, PassEvent, PassEventKind};
