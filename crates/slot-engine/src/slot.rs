//! Free-slot search over an [`IntervalSet`].
//!
//! The finder walks the free gaps of a search window in order and places the
//! event at the earliest start that fits, so the tie-break is always
//! earliest-start-first. Two optional policies narrow the candidates:
//!
//! - a [`SnapGrid`], which rounds candidate starts *up* to the next grid line
//!   on the local clock before the duration check;
//! - [`WorkingHours`], which only admits slots lying entirely inside one
//!   day's working band.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Offset, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dst::{self, DstPolicy};
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;
use crate::interval_set::IntervalSet;

/// Slot starts snap to multiples of `minutes` past local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapGrid {
    minutes: u32,
    tz: Tz,
}

impl SnapGrid {
    pub fn new(minutes: u32, tz: Tz) -> Result<Self> {
        if minutes == 0 || minutes > 24 * 60 {
            return Err(SlotError::InvalidConfig(format!(
                "snap grid must be between 1 and 1440 minutes, got {}",
                minutes
            )));
        }
        Ok(Self { minutes, tz })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// The first grid line at or after `instant`.
    pub fn ceil(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let step = self.minutes as i64 * 60;
        let offset = instant.with_timezone(&self.tz).offset().fix().local_minus_utc() as i64;
        let nanos = instant.timestamp_subsec_nanos() as i64;
        let whole = instant - Duration::nanoseconds(nanos);

        let rem = (whole.timestamp() + offset).rem_euclid(step);
        if rem == 0 && nanos == 0 {
            return Some(instant);
        }
        let bump = if rem == 0 { step } else { step - rem };
        whole.checked_add_signed(Duration::seconds(bump))
    }
}

/// A daily local-time band in which events may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
    #[serde(default)]
    pub weekdays_only: bool,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            weekdays_only: false,
        }
    }
}

impl WorkingHours {
    pub fn validate(&self) -> Result<()> {
        if self.start_hour >= self.end_hour || self.end_hour > 24 {
            return Err(SlotError::InvalidConfig(format!(
                "invalid working hours {}:00-{}:00",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// The working bands in `tz` that intersect `range`, clipped to it, in order.
    pub fn bands(&self, tz: Tz, range: &TimeInterval) -> Vec<TimeInterval> {
        let first_day = range.start().with_timezone(&tz).date_naive();
        let last_day = range.end().with_timezone(&tz).date_naive();

        first_day
            .iter_days()
            .take_while(|day| *day <= last_day)
            .filter(|day| !self.weekdays_only || !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .filter_map(|day| self.band_on(tz, day))
            .filter_map(|band| band.intersection(range))
            .collect()
    }

    fn band_on(&self, tz: Tz, day: NaiveDate) -> Option<TimeInterval> {
        let start = day.and_time(NaiveTime::from_hms_opt(self.start_hour, 0, 0)?);
        let end = if self.end_hour == 24 {
            day.succ_opt()?.and_time(NaiveTime::from_hms_opt(0, 0, 0)?)
        } else {
            day.and_time(NaiveTime::from_hms_opt(self.end_hour, 0, 0)?)
        };
        TimeInterval::new(
            dst::resolve_local(tz, start, DstPolicy::WallClock)?,
            dst::resolve_local(tz, end, DstPolicy::WallClock)?,
        )
        .ok()
    }
}

/// Finds free slots given busy time, a window, and a duration.
#[derive(Debug, Clone, Default)]
pub struct SlotFinder {
    snap: Option<SnapGrid>,
    working_hours: Option<(WorkingHours, Tz)>,
}

impl SlotFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snap(mut self, snap: SnapGrid) -> Self {
        self.snap = Some(snap);
        self
    }

    pub fn with_working_hours(mut self, hours: WorkingHours, tz: Tz) -> Result<Self> {
        hours.validate()?;
        self.working_hours = Some((hours, tz));
        Ok(self)
    }

    /// The earliest free slot of length `duration` that starts at or after
    /// `after` and lies fully inside `window`.
    pub fn find_next(
        &self,
        busy: &IntervalSet,
        window: &TimeInterval,
        duration: Duration,
        after: DateTime<Utc>,
    ) -> Option<TimeInterval> {
        self.find_all_after(busy, window, duration, after, 1).into_iter().next()
    }

    /// Up to `max_results` non-overlapping slots, each searched from the end
    /// of the previous one, earliest first.
    pub fn find_all(
        &self,
        busy: &IntervalSet,
        window: &TimeInterval,
        duration: Duration,
        max_results: usize,
    ) -> Vec<TimeInterval> {
        self.find_all_after(busy, window, duration, window.start(), max_results)
    }

    /// [`SlotFinder::find_all`] starting the search at `after` instead of the window start.
    pub fn find_all_after(
        &self,
        busy: &IntervalSet,
        window: &TimeInterval,
        duration: Duration,
        after: DateTime<Utc>,
        max_results: usize,
    ) -> Vec<TimeInterval> {
        let mut slots = Vec::new();
        if max_results == 0 || duration <= Duration::zero() {
            return slots;
        }
        let Ok(search) = TimeInterval::new(after.max(window.start()), window.end()) else {
            return slots;
        };

        for free in self.free_ranges(busy, &search) {
            let mut cursor = free.start();
            while slots.len() < max_results {
                let Some(slot) = self.place(&free, cursor, duration) else {
                    break;
                };
                trace!(%slot, "slot found");
                cursor = slot.end();
                slots.push(slot);
            }
            if slots.len() >= max_results {
                break;
            }
        }
        slots
    }

    fn free_ranges(&self, busy: &IntervalSet, search: &TimeInterval) -> Vec<TimeInterval> {
        let gaps = busy.gaps(search);
        match &self.working_hours {
            None => gaps,
            Some((hours, tz)) => intersect_sorted(&gaps, &hours.bands(*tz, search)),
        }
    }

    fn place(&self, free: &TimeInterval, cursor: DateTime<Utc>, duration: Duration) -> Option<TimeInterval> {
        let start = match &self.snap {
            Some(grid) => grid.ceil(cursor)?,
            None => cursor,
        };
        let slot = TimeInterval::starting_at(start, duration).ok()?;
        free.contains(&slot).then_some(slot)
    }
}

/// Intersection of two sorted, disjoint interval lists.
fn intersect_sorted(a: &[TimeInterval], b: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersection(&b[j]) {
            out.push(common);
        }
        if a[i].end() <= b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}
