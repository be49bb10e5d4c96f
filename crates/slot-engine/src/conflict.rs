//! Detect occurrences that collide with busy time.
//!
//! Adjacent intervals (one ends exactly when another starts) are NOT conflicts.

use serde::{Deserialize, Serialize};

use crate::interval::TimeInterval;
use crate::interval_set::IntervalSet;

/// One occurrence that collides with existing busy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Position of the occurrence in its series (0 for a single event).
    pub index: usize,
    pub occurrence: TimeInterval,
    /// The busy intervals it hits, in order.
    pub busy: Vec<TimeInterval>,
    /// Total minutes of the occurrence covered by busy time.
    pub overlap_minutes: i64,
}

impl Conflict {
    /// Describe how `occurrence` collides with `busy`, or `None` if it is free.
    pub fn detect(index: usize, occurrence: TimeInterval, busy: &IntervalSet) -> Option<Self> {
        let hits = busy.overlapping(&occurrence);
        if hits.is_empty() {
            return None;
        }
        Some(Self::against(index, occurrence, hits))
    }

    /// Build a conflict record without requiring an overlap; used for
    /// occurrences that could not be placed at all.
    pub(crate) fn against(index: usize, occurrence: TimeInterval, hits: &[TimeInterval]) -> Self {
        let overlap_minutes = hits
            .iter()
            .filter_map(|b| b.intersection(&occurrence))
            .map(|common| common.duration_minutes())
            .sum();
        Self {
            index,
            occurrence,
            busy: hits.to_vec(),
            overlap_minutes,
        }
    }
}

/// Find every occurrence that overlaps busy time.
///
/// Occurrences are tested independently; the result is ordered by `index`.
pub fn find_conflicts(occurrences: &[TimeInterval], busy: &IntervalSet) -> Vec<Conflict> {
    occurrences
        .iter()
        .enumerate()
        .filter_map(|(index, occurrence)| Conflict::detect(index, *occurrence, busy))
        .collect()
}
