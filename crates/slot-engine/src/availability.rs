//! Multi-calendar availability merging with privacy-preserving output.
//!
//! A user usually has several calendars (work, personal, shared). Each one is a
//! [`BusyStream`]; merging them gives the single busy set the engine schedules
//! against, plus a busy/free view for presenting availability.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::busy::{self, BusyPeriod};
use crate::interval::TimeInterval;
use crate::interval_set::IntervalSet;
use crate::slot::SlotFinder;

/// Busy periods from a single calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusyStream {
    /// Opaque identifier for this stream (e.g., "work-google", "personal-icloud").
    pub stream_id: String,
    pub busy: Vec<BusyPeriod>,
}

/// Privacy level for availability output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Show time ranges and source count per busy block.
    Full,
    /// Show only busy/free time ranges; `source_count` is 0 on every block.
    #[default]
    Opaque,
}

/// A merged busy block in the unified availability view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Number of streams that contributed to this block. 0 when privacy is `Opaque`.
    pub source_count: usize,
}

/// A free gap in the unified availability view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl From<TimeInterval> for FreeSlot {
    fn from(gap: TimeInterval) -> Self {
        Self {
            start: gap.start(),
            end: gap.end(),
            duration_minutes: gap.duration_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedAvailability {
    /// Merged busy blocks (sorted by start, non-overlapping).
    pub busy: Vec<BusyBlock>,
    /// Gaps between busy blocks within the window.
    pub free: Vec<FreeSlot>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub privacy: PrivacyLevel,
}

/// The merged busy set of all streams, clipped to `window`.
pub fn busy_set(streams: &[BusyStream], window: &TimeInterval, tz: Tz) -> IntervalSet {
    let all: Vec<BusyPeriod> = streams.iter().flat_map(|s| s.busy.iter().cloned()).collect();
    busy::normalize(&all, window, tz)
}

/// Merge N busy streams into unified availability within `window`.
///
/// When `privacy` is `Opaque`, `source_count` is 0 on all busy blocks, so
/// nothing about how many calendars contributed leaks through.
pub fn merge_availability(
    streams: &[BusyStream],
    window: &TimeInterval,
    tz: Tz,
    privacy: PrivacyLevel,
) -> UnifiedAvailability {
    // Each stream is expanded once; blocks are counted against these sets.
    let per_stream: Vec<IntervalSet> = streams
        .iter()
        .map(|stream| busy::normalize(&stream.busy, window, tz))
        .collect();
    let merged: IntervalSet = per_stream.iter().flat_map(|set| set.iter().copied()).collect();

    let busy = merged
        .iter()
        .map(|block| BusyBlock {
            start: block.start(),
            end: block.end(),
            source_count: match privacy {
                PrivacyLevel::Full => per_stream.iter().filter(|set| set.overlaps(block)).count(),
                PrivacyLevel::Opaque => 0,
            },
        })
        .collect();

    let free = merged.gaps(window).into_iter().map(FreeSlot::from).collect();

    UnifiedAvailability {
        busy,
        free,
        window_start: window.start(),
        window_end: window.end(),
        privacy,
    }
}

/// The first free slot of at least `duration` across all streams.
pub fn find_first_free_across(
    streams: &[BusyStream],
    window: &TimeInterval,
    tz: Tz,
    duration: Duration,
) -> Option<TimeInterval> {
    let merged = busy_set(streams, window, tz);
    SlotFinder::new().find_next(&merged, window, duration, window.start())
}
