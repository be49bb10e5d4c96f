//! RFC 5545 interop for the calendar collaborator.
//!
//! Two directions:
//!
//! - [`to_rrule`] renders a [`RecurrenceRule`] as an `RRULE` value so an accepted
//!   series can be created as one native recurring event. Month-end anchors are
//!   rendered with `BYSETPOS=-1` so the remote calendar clamps exactly like
//!   [`crate::recurrence`] does.
//! - [`expand_busy_rrule`] expands a recurring *busy* event, as fetched from the
//!   calendar, into concrete busy intervals. This wraps the `rrule` crate (v0.13).

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;
use crate::recurrence::{Frequency, RecurrenceRule};

/// Render `rule` as an RFC 5545 `RRULE` value (without the `RRULE:` prefix).
///
/// `anchor` is the first occurrence start seen on the wall clock of the series'
/// timezone; it only matters for monthly rules anchored on the 29th-31st.
pub fn to_rrule<T: TimeZone>(rule: &RecurrenceRule, anchor: &DateTime<T>) -> String {
    let freq = match rule.frequency {
        Frequency::Daily => "DAILY",
        Frequency::Weekly => "WEEKLY",
        Frequency::Monthly => "MONTHLY",
    };
    let mut parts = vec![format!("FREQ={}", freq), format!("INTERVAL={}", rule.interval)];

    let day = anchor.day();
    if rule.frequency == Frequency::Monthly && day > 28 {
        let days: Vec<String> = (28..=day).map(|d| d.to_string()).collect();
        parts.push(format!("BYMONTHDAY={}", days.join(",")));
        parts.push("BYSETPOS=-1".to_string());
    }

    if let Some(count) = rule.count {
        parts.push(format!("COUNT={}", count));
    } else if let Some(until) = rule.until {
        parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
    }

    parts.join(";")
}

/// Expand a recurring busy event into the busy intervals that touch `window`.
///
/// # Arguments
/// - `rrule` -- RRULE value, with or without the `RRULE:` prefix (e.g. "FREQ=WEEKLY;BYDAY=TU")
/// - `first` -- the first instance of the series; its length is used for every instance
/// - `tz` -- IANA timezone the series recurs in
/// - `window` -- only instances overlapping this window are returned
/// - `cap` -- maximum number of raw instances to generate
///
/// # Errors
/// Returns `SlotError::InvalidRRule` if the text is empty or the `rrule` crate rejects it.
pub fn expand_busy_rrule(
    rrule: &str,
    first: TimeInterval,
    tz: Tz,
    window: TimeInterval,
    cap: u16,
) -> Result<Vec<TimeInterval>> {
    let rule_text = rrule.trim().trim_start_matches("RRULE:");
    if rule_text.is_empty() {
        return Err(SlotError::InvalidRRule("empty RRULE string".to_string()));
    }

    let dtstart_local = first.start().with_timezone(&tz).naive_local();
    let rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        tz.name(),
        dtstart_local.format("%Y%m%dT%H%M%S"),
        rule_text
    );

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| SlotError::InvalidRRule(format!("{}", e)))?;

    // `after`/`before` are exclusive; widen by a second and filter exactly below.
    let length = first.duration();
    let bound_tz: rrule::Tz = Utc.into();
    let after = (window.start() - length - Duration::seconds(1)).with_timezone(&bound_tz);
    let before = (window.end() + Duration::seconds(1)).with_timezone(&bound_tz);

    let instances = rrule_set.after(after).before(before).all(cap);

    Ok(instances
        .dates
        .into_iter()
        .filter_map(|dt| TimeInterval::starting_at(dt.with_timezone(&Utc), length).ok())
        .filter(|instance| instance.overlaps(&window))
        .collect())
}
