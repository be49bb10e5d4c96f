//! Normalize raw busy periods from the calendar collaborator into an [`IntervalSet`].
//!
//! Calendar APIs hand back whatever their users typed: zero-length entries,
//! inverted ranges, recurring masters with broken RRULEs. None of that should
//! sink a scheduling request, so bad entries are logged and dropped (or, for a
//! broken RRULE, reduced to their first instance).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::interval::TimeInterval;
use crate::interval_set::IntervalSet;
use crate::recurrence::MAX_OCCURRENCES;
use crate::rfc5545;

/// One busy entry as fetched from a calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// RFC 5545 RRULE when the entry is a recurring master.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
}

impl BusyPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            rrule: None,
        }
    }

    /// The busy intervals this entry contributes inside `lookahead`.
    pub fn intervals(&self, lookahead: &TimeInterval, tz: Tz) -> Vec<TimeInterval> {
        let first = match TimeInterval::new(self.start, self.end) {
            Ok(first) => first,
            Err(e) => {
                warn!(start = %self.start, end = %self.end, "dropping busy period: {}", e);
                return Vec::new();
            }
        };

        let Some(rrule) = self.rrule.as_deref() else {
            return first.intersection(lookahead).into_iter().collect();
        };

        match rfc5545::expand_busy_rrule(rrule, first, tz, *lookahead, MAX_OCCURRENCES as u16) {
            Ok(instances) => instances
                .iter()
                .filter_map(|instance| instance.intersection(lookahead))
                .collect(),
            Err(e) => {
                warn!(%first, "keeping only first instance of recurring busy period: {}", e);
                first.intersection(lookahead).into_iter().collect()
            }
        }
    }
}

/// Build the busy set for one scheduling request.
///
/// Everything is clipped to `lookahead`; recurring entries recur on the wall
/// clock of `tz`.
pub fn normalize(periods: &[BusyPeriod], lookahead: &TimeInterval, tz: Tz) -> IntervalSet {
    let set: IntervalSet = periods
        .iter()
        .flat_map(|period| period.intervals(lookahead, tz))
        .collect();
    debug!(
        raw = periods.len(),
        merged = set.len(),
        %lookahead,
        "normalized busy periods"
    );
    set
}
