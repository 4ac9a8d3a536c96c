use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::predict::types::{CommonWindow, Pass};
use crate::predict::{EventFinder, Observer, OrbitalElementSet, PassList, PredictError, Propagator};

/// Non-empty intersection of one span from each of two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlap {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    left: usize,
    right: usize,
}

/// Sorted-interval intersection of per-observer pass lists.
#[derive(Debug, Clone, Default)]
pub struct WindowIntersector;

impl WindowIntersector {
    pub fn new() -> Self {
        Self
    }

    /// Windows during which every observer sees the satellite.
    ///
    /// The common elevation of a window is the lowest of the observers'
    /// maxima inside it, so it is reachable by all of them at once. Each
    /// maximum is the pass culmination when it falls inside the window and is
    /// re-sampled over the window otherwise.
    pub fn common_windows<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        finder: &EventFinder,
        elements: &OrbitalElementSet,
        observers: &[(&Observer, &PassList)],
    ) -> Result<Vec<CommonWindow>, PredictError> {
        if observers.len() < 2 || observers.iter().any(|(_, list)| list.is_empty()) {
            return Ok(Vec::new());
        }

        let mut current: Vec<(DateTime<Utc>, DateTime<Utc>, Vec<usize>)> = observers[0]
            .1
            .passes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.rise, p.set, vec![i]))
            .collect();

        for (_, list) in &observers[1..] {
            let left: Vec<_> = current.iter().map(|(s, e, _)| (*s, *e)).collect();
            let right: Vec<_> = list.passes.iter().map(|p| (p.rise, p.set)).collect();
            current = merge_walk(&left, &right)
                .into_iter()
                .map(|o| {
                    let mut indices = current[o.left].2.clone();
                    indices.push(o.right);
                    (o.start, o.end, indices)
                })
                .collect();
            if current.is_empty() {
                break;
            }
        }

        let mut windows = Vec::with_capacity(current.len());
        for (start, end, pass_indices) in current {
            let mut common = f64::INFINITY;
            for ((observer, list), &index) in observers.iter().zip(&pass_indices) {
                let pass = &list.passes[index];
                let best = if (start..=end).contains(&pass.max_elevation_time) {
                    pass.max_elevation_deg
                } else {
                    finder
                        .peak_within(propagator, elements, observer, start, end)?
                        .elevation_deg
                };
                common = common.min(best);
            }
            windows.push(CommonWindow {
                start,
                end,
                max_common_elevation_deg: common,
                pass_indices,
            });
        }

        Ok(windows)
    }
}

/// Merge-walk two ordered, internally non-overlapping span lists.
/// Runs in O(|a| + |b|).
fn merge_walk(
    a: &[(DateTime<Utc>, DateTime<Utc>)],
    b: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<Overlap> {
    let mut overlaps = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        let start = a[i].0.max(b[j].0);
        let end = a[i].1.min(b[j].1);
        if start < end {
            overlaps.push(Overlap {
                start,
                end,
                left: i,
                right: j,
            });
        }

        match a[i].1.cmp(&b[j].1) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }

    overlaps
}
