//! Busy time as a sorted set of disjoint intervals.
//!
//! Intervals that overlap or touch are coalesced on insert, so the stored
//! sequence is always sorted by start with a strictly positive gap between
//! neighbours. Queries use half-open semantics: an interval ending at 10:00
//! does not overlap one starting at 10:00.

use serde::Serialize;

use crate::interval::TimeInterval;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntervalSet {
    intervals: Vec<TimeInterval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from intervals in any order.
    pub fn from_intervals<I: IntoIterator<Item = TimeInterval>>(intervals: I) -> Self {
        let mut sorted: Vec<TimeInterval> = intervals.into_iter().collect();
        sorted.sort();

        let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
        for interval in sorted {
            if let Some(last) = merged.last_mut() {
                if interval.start() <= last.end() {
                    // Overlapping or adjacent: extend the current interval.
                    if interval.end() > last.end() {
                        *last = TimeInterval::from_ordered(last.start(), interval.end());
                    }
                    continue;
                }
            }
            merged.push(interval);
        }

        let set = Self { intervals: merged };
        debug_assert!(set.invariants_hold());
        set
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeInterval> {
        self.intervals.iter()
    }

    pub fn as_slice(&self) -> &[TimeInterval] {
        &self.intervals
    }

    /// From the first busy start to the last busy end.
    pub fn span(&self) -> Option<TimeInterval> {
        let first = self.intervals.first()?;
        let last = self.intervals.last()?;
        Some(TimeInterval::from_ordered(first.start(), last.end()))
    }

    /// Insert a busy interval, merging it with every stored interval it
    /// overlaps or touches.
    pub fn insert(&mut self, interval: TimeInterval) {
        // First stored interval that could merge: its end reaches our start.
        let mut lo = self
            .intervals
            .partition_point(|existing| existing.end() < interval.start());
        // One past the last stored interval that could merge: its start is within our end.
        let hi = self
            .intervals
            .partition_point(|existing| existing.start() <= interval.end());

        if lo == hi {
            self.intervals.insert(lo, interval);
            debug_assert!(self.invariants_hold());
            return;
        }

        let merged_start = self.intervals[lo].start().min(interval.start());
        let merged_end = self.intervals[hi - 1].end().max(interval.end());
        self.intervals[lo] = TimeInterval::from_ordered(merged_start, merged_end);
        lo += 1;
        self.intervals.drain(lo..hi);
        debug_assert!(self.invariants_hold());
    }

    /// True if `interval` intersects any stored busy interval.
    pub fn overlaps(&self, interval: &TimeInterval) -> bool {
        !self.overlapping(interval).is_empty()
    }

    /// The stored intervals that intersect `interval`, in order.
    pub fn overlapping(&self, interval: &TimeInterval) -> &[TimeInterval] {
        let first = self
            .intervals
            .partition_point(|existing| existing.end() <= interval.start());
        let last = self
            .intervals
            .partition_point(|existing| existing.start() < interval.end());
        if first >= last {
            return &[];
        }
        &self.intervals[first..last]
    }

    /// Free intervals inside `within` that no stored interval covers.
    ///
    /// An empty set (or one with nothing inside `within`) yields `within` itself.
    pub fn gaps(&self, within: &TimeInterval) -> Vec<TimeInterval> {
        let mut gaps = Vec::new();
        let mut cursor = within.start();

        for busy in self.overlapping(within) {
            if cursor < busy.start() {
                gaps.push(TimeInterval::from_ordered(cursor, busy.start()));
            }
            cursor = cursor.max(busy.end());
        }

        // Trailing gap after the last busy interval.
        if cursor < within.end() {
            gaps.push(TimeInterval::from_ordered(cursor, within.end()));
        }

        gaps
    }

    fn invariants_hold(&self) -> bool {
        self.intervals
            .windows(2)
            .all(|pair| pair[0].end() < pair[1].start())
    }
}

impl<'a> IntoIterator for &'a IntervalSet {
    type Item = &'a TimeInterval;
    type IntoIter = std::slice::Iter<'a, TimeInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

impl FromIterator<TimeInterval> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = TimeInterval>>(iter: I) -> Self {
        Self::from_intervals(iter)
    }
}
