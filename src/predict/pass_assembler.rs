use chrono::Duration;
use log::{debug, warn};
use serde::Serialize;

use crate::predict::types::{Pass, PassEvent, PassEventKind};

pub const DEFAULT_MIN_PASS_DURATION: Duration = Duration::seconds(10);

/// Passes of one observer, plus the number of above-threshold windows that
/// were too short (or malformed) to count as a pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PassList {
    pub passes: Vec<Pass>,
    pub degenerate_windows: usize,
}

impl PassList {
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn total_duration(&self) -> Duration {
        self.passes
            .iter()
            .fold(Duration::zero(), |acc, p| acc + p.duration())
    }
}

#[derive(Debug, Clone)]
pub struct PassAssembler {
    min_duration: Duration,
}

impl Default for PassAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PASS_DURATION)
    }
}

impl PassAssembler {
    pub fn new(min_duration: Duration) -> Self {
        Self { min_duration }
    }

    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }

    /// Pair Rise/MaxElevation/Set events into passes.
    pub fn assemble(&self, events: &[PassEvent]) -> PassList {
        let mut list = PassList::default();
        let mut i = 0;

        while i < events.len() {
            let triple = match events.get(i..i + 3) {
                Some([rise, peak, set])
                    if rise.kind == PassEventKind::Rise
                        && peak.kind == PassEventKind::MaxElevation
                        && set.kind == PassEventKind::Set =>
                {
                    (rise, peak, set)
                }
                _ => {
                    warn!(
                        "Skipping {} event at {}: not the start of a rise/peak/set sequence",
                        events[i].kind, events[i].time
                    );
                    list.degenerate_windows += 1;
                    i += 1;
                    // Resynchronise on the next Rise.
                    while i < events.len() && events[i].kind != PassEventKind::Rise {
                        i += 1;
                    }
                    continue;
                }
            };
            i += 3;

            let (rise, peak, set) = triple;
            if !(rise.time <= peak.time && peak.time <= set.time) {
                warn!(
                    "Discarding window {} .. {}: culmination {} outside the window",
                    rise.time, set.time, peak.time
                );
                list.degenerate_windows += 1;
                continue;
            }
            if set.time - rise.time < self.min_duration {
                debug!(
                    "Discarding degenerate window {} .. {} ({}s)",
                    rise.time,
                    set.time,
                    (set.time - rise.time).num_seconds()
                );
                list.degenerate_windows += 1;
                continue;
            }
            if let Some(previous) = list.passes.last() {
                if rise.time <= previous.set {
                    warn!(
                        "Discarding window {} .. {}: overlaps previous pass ending {}",
                        rise.time, set.time, previous.set
                    );
                    list.degenerate_windows += 1;
                    continue;
                }
            }

            list.passes.push(Pass {
                rise: rise.time,
                set: set.time,
                max_elevation_deg: peak.elevation_deg,
                max_elevation_time: peak.time,
                rise_azimuth_deg: rise.azimuth_deg,
                set_azimuth_deg: set.azimuth_deg,
                truncated_start: rise.synthetic,
                truncated_end: set.synthetic,
            });
        }

        list
    }
}
