//! Recurrence expansion -- turns a recurrence rule plus an anchor occurrence into
//! a bounded, lazy sequence of concrete occurrences.
//!
//! Occurrence `n` is always computed from the anchor (`anchor + n * interval`
//! units) on the wall clock of the caller's timezone, never from occurrence
//! `n - 1`. Two consequences:
//!
//! - Monthly rules anchored on a day the target month lacks clamp to that
//!   month's last day, and the next month returns to the anchor day
//!   (Jan 31 → Feb 28 → Mar 31), with no drift.
//! - A weekly 10:00 meeting stays at 10:00 local across a DST change; its
//!   absolute instant moves by the offset change.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Duration, Months, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dst::{self, DstPolicy};
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;

/// Hard cap on occurrences from a single rule, whatever the rule says.
pub const MAX_OCCURRENCES: usize = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the phrasings the intent parser produces ("every week", "Monthly", ...).
impl FromStr for Frequency {
    type Err = SlotError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "day" | "daily" | "every day" | "each day" => Ok(Frequency::Daily),
            "week" | "weekly" | "every week" | "each week" => Ok(Frequency::Weekly),
            "month" | "monthly" | "every month" | "each month" => Ok(Frequency::Monthly),
            _ => Err(SlotError::InvalidRule(format!(
                "unknown frequency '{}', expected one of 'daily', 'weekly', 'monthly'",
                value
            ))),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = SlotError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

fn default_interval() -> u32 {
    1
}

/// Every `interval` units of `frequency`, ending after `count` occurrences or at `until`.
///
/// Exactly one of `count` and `until` must be set; [`RecurrenceRule::validate`]
/// enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    pub fn with_count(frequency: Frequency, interval: u32, count: u32) -> Self {
        Self {
            frequency,
            interval,
            count: Some(count),
            until: None,
        }
    }

    pub fn with_until(frequency: Frequency, interval: u32, until: DateTime<Utc>) -> Self {
        Self {
            frequency,
            interval,
            count: None,
            until: Some(until),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(SlotError::InvalidRule("interval must be at least 1".to_string()));
        }
        match (self.count, self.until) {
            (Some(_), Some(_)) => Err(SlotError::InvalidRule(
                "count and until are mutually exclusive".to_string(),
            )),
            (None, None) => Err(SlotError::InvalidRule(
                "one of count or until is required".to_string(),
            )),
            (Some(0), None) => Err(SlotError::InvalidRule("count must be at least 1".to_string())),
            _ => Ok(()),
        }
    }

    /// Local start of step `n`, or `None` past the representable range.
    fn step(&self, anchor: NaiveDateTime, n: usize) -> Option<NaiveDateTime> {
        let units = u32::try_from(n).ok()?.checked_mul(self.interval)?;
        match self.frequency {
            Frequency::Daily => anchor.checked_add_days(Days::new(units as u64)),
            Frequency::Weekly => anchor.checked_add_days(Days::new(units as u64 * 7)),
            // chrono clamps to the last day of a shorter month.
            Frequency::Monthly => anchor.checked_add_months(Months::new(units)),
        }
    }
}

/// Expand `rule` from `anchor` on the UTC clock.
///
/// See [`expand_in`].
pub fn expand(rule: &RecurrenceRule, anchor: TimeInterval, limit: usize) -> Result<Occurrences> {
    expand_in(rule, anchor, limit, Tz::UTC, DstPolicy::default())
}

/// Expand `rule` from `anchor`, stepping on the wall clock of `tz`.
///
/// The first occurrence is the anchor itself. The sequence ends at the first of:
/// `limit` occurrences, the rule's `count`, an occurrence starting after the
/// rule's `until`, or [`MAX_OCCURRENCES`]. Occurrences dropped by
/// [`DstPolicy::Skip`] still count toward `count`.
///
/// # Errors
/// Returns `SlotError::InvalidRule` if the rule fails validation or `limit` is 0.
pub fn expand_in(
    rule: &RecurrenceRule,
    anchor: TimeInterval,
    limit: usize,
    tz: Tz,
    dst_policy: DstPolicy,
) -> Result<Occurrences> {
    rule.validate()?;
    if limit == 0 {
        return Err(SlotError::InvalidRule("expansion limit must be at least 1".to_string()));
    }

    let max_steps = rule
        .count
        .map(|c| c as usize)
        .unwrap_or(MAX_OCCURRENCES)
        .min(MAX_OCCURRENCES);

    Ok(Occurrences {
        rule: rule.clone(),
        anchor_start: anchor.start(),
        anchor_local: anchor.start().with_timezone(&tz).naive_local(),
        length: anchor.duration(),
        tz,
        dst_policy,
        step: 0,
        max_steps,
        produced: 0,
        limit: limit.min(MAX_OCCURRENCES),
        done: false,
    })
}

/// Lazy occurrence sequence produced by [`expand`] / [`expand_in`].
#[derive(Debug, Clone)]
pub struct Occurrences {
    rule: RecurrenceRule,
    anchor_start: DateTime<Utc>,
    anchor_local: NaiveDateTime,
    length: Duration,
    tz: Tz,
    dst_policy: DstPolicy,
    step: usize,
    max_steps: usize,
    produced: usize,
    limit: usize,
    done: bool,
}

impl Iterator for Occurrences {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<TimeInterval> {
        while !self.done && self.produced < self.limit && self.step < self.max_steps {
            let n = self.step;
            self.step += 1;

            let Some(local) = self.rule.step(self.anchor_local, n) else {
                self.done = true;
                break;
            };
            // The anchor is already an instant; re-resolving it could pick the
            // other side of an ambiguous hour.
            let resolved = if n == 0 {
                Some(self.anchor_start)
            } else {
                dst::resolve_local(self.tz, local, self.dst_policy)
            };
            let Some(start) = resolved else {
                trace!(step = n, %local, "occurrence skipped in DST gap");
                continue;
            };
            if self.rule.until.is_some_and(|until| start > until) {
                self.done = true;
                break;
            }
            let Ok(occurrence) = TimeInterval::starting_at(start, self.length) else {
                self.done = true;
                break;
            };

            self.produced += 1;
            return Some(occurrence);
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .limit
            .saturating_sub(self.produced)
            .min(self.max_steps.saturating_sub(self.step));
        (0, Some(if self.done { 0 } else { remaining }))
    }
}

impl std::iter::FusedIterator for Occurrences {}
