//! Structured event requests, as produced by the intent collaborator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;
use crate::recurrence::{Frequency, RecurrenceRule};

/// Bounds within which the event (or its first occurrence) must be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl Window {
    pub fn new(earliest: DateTime<Utc>, latest: DateTime<Utc>) -> Self {
        Self { earliest, latest }
    }

    pub fn to_interval(&self) -> Result<TimeInterval> {
        TimeInterval::new(self.earliest, self.latest).map_err(|_| {
            SlotError::InvalidRequest(format!(
                "window earliest {} must be before latest {}",
                self.earliest.to_rfc3339(),
                self.latest.to_rfc3339()
            ))
        })
    }
}

/// A request to place one event or a recurring series.
///
/// With `fixed_start` the engine only checks the requested time(s) for
/// conflicts; without it the engine searches `window` for a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub duration_minutes: i64,
    pub window: Window,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_start: Option<DateTime<Utc>>,
}

/// The checked parts of an [`EventRequest`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Validated {
    pub window: TimeInterval,
    pub duration: Duration,
    pub fixed: Option<DateTime<Utc>>,
}

impl EventRequest {
    pub fn new(title: impl Into<String>, duration_minutes: i64, window: Window) -> Self {
        Self {
            title: title.into(),
            description: None,
            location: None,
            duration_minutes,
            window,
            recurrence: None,
            fixed_start: None,
        }
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn with_fixed_start(mut self, start: DateTime<Utc>) -> Self {
        self.fixed_start = Some(start);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Structural checks. Whether the duration fits the window is left to the
    /// engine, which applies its too-long policy.
    pub(crate) fn validate(&self) -> Result<Validated> {
        if self.title.trim().is_empty() {
            return Err(SlotError::InvalidRequest("title must not be empty".to_string()));
        }
        if self.duration_minutes <= 0 {
            return Err(SlotError::InvalidRequest(format!(
                "duration must be positive, got {} minutes",
                self.duration_minutes
            )));
        }
        let duration = Duration::try_minutes(self.duration_minutes).ok_or_else(|| {
            SlotError::InvalidRequest(format!("duration of {} minutes is out of range", self.duration_minutes))
        })?;
        let window = self.window.to_interval()?;

        if let Some(rule) = &self.recurrence {
            rule.validate()?;
            if shortest_period(rule).is_some_and(|period| duration > period) {
                return Err(SlotError::InvalidRequest(format!(
                    "a {}-minute event recurring {} every {} would overlap itself",
                    self.duration_minutes, rule.frequency, rule.interval
                )));
            }
        }

        Ok(Validated {
            window,
            duration,
            fixed: self.fixed_start,
        })
    }
}

/// The shortest gap between two consecutive occurrence starts of `rule`, or
/// `None` when it is too long to represent (no event can be that long).
fn shortest_period(rule: &RecurrenceRule) -> Option<Duration> {
    let interval = rule.interval as i64;
    match rule.frequency {
        Frequency::Daily => Duration::try_days(interval),
        Frequency::Weekly => Duration::try_weeks(interval),
        // Clamping can pull a month-end occurrence as close as 28 days (Jan 31 → Feb 28).
        Frequency::Monthly => Duration::try_days(28 * interval),
    }
}
