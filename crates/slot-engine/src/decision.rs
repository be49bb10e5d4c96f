//! The outcome of one scheduling request.

use std::fmt;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::interval::TimeInterval;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchedulingDecision {
    /// Every occurrence is placed; persist these.
    Accepted { occurrences: Vec<TimeInterval> },
    /// At least one occurrence collides or cannot be placed.
    Conflict {
        conflicts: Vec<Conflict>,
        /// Suggested free slots, earliest first.
        alternatives: Vec<TimeInterval>,
        /// Set when searching and an occurrence found no slot in its window.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unplaceable_index: Option<usize>,
    },
    /// The request itself is malformed.
    Invalid { reason: String },
}

impl SchedulingDecision {
    pub fn invalid(reason: impl std::fmt::Display) -> Self {
        SchedulingDecision::Invalid {
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            SchedulingDecision::Accepted { .. } => "accepted",
            SchedulingDecision::Conflict { .. } => "conflict",
            SchedulingDecision::Invalid { .. } => "invalid",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SchedulingDecision::Accepted { .. })
    }

    /// The placed occurrences; empty unless accepted.
    pub fn occurrences(&self) -> &[TimeInterval] {
        match self {
            SchedulingDecision::Accepted { occurrences } => occurrences,
            _ => &[],
        }
    }

    /// Human-readable rendering, with times shown on the wall clock of `tz`.
    pub fn summary(&self, tz: Tz) -> String {
        self.display_in(tz).to_string()
    }

    /// [`SchedulingDecision::summary`] as a `Display` value, for writing
    /// straight into a formatter.
    pub fn display_in(&self, tz: Tz) -> Summary<'_> {
        Summary { decision: self, tz }
    }
}

/// See [`SchedulingDecision::display_in`].
pub struct Summary<'a> {
    decision: &'a SchedulingDecision,
    tz: Tz,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tz = self.tz;
        match self.decision {
            SchedulingDecision::Accepted { occurrences } => {
                writeln!(f, "Accepted: {} occurrence(s)", occurrences.len())?;
                for occurrence in occurrences {
                    writeln!(f, "  - {}", fmt_slot(occurrence, tz))?;
                }
            }
            SchedulingDecision::Conflict {
                conflicts,
                alternatives,
                unplaceable_index,
            } => {
                match unplaceable_index {
                    Some(index) => writeln!(f, "Conflict: occurrence #{} cannot be placed in its window", index + 1)?,
                    None => writeln!(f, "Conflict: {} occurrence(s) collide with busy time", conflicts.len())?,
                }
                for conflict in conflicts {
                    writeln!(
                        f,
                        "  - #{} {} ({} busy interval(s), {} min overlap)",
                        conflict.index + 1,
                        fmt_slot(&conflict.occurrence, tz),
                        conflict.busy.len(),
                        conflict.overlap_minutes
                    )?;
                }
                if alternatives.is_empty() {
                    writeln!(f, "No alternatives found")?;
                } else {
                    writeln!(f, "Alternatives:")?;
                    for alternative in alternatives {
                        writeln!(f, "  - {}", fmt_slot(alternative, tz))?;
                    }
                }
            }
            SchedulingDecision::Invalid { reason } => writeln!(f, "Invalid: {}", reason)?,
        }
        Ok(())
    }
}

/// "Mon 2026-03-02 10:00-11:00"
pub fn fmt_slot(slot: &TimeInterval, tz: Tz) -> String {
    let start = slot.start().with_timezone(&tz);
    let end = slot.end().with_timezone(&tz);
    if start.date_naive() == end.date_naive() {
        format!("{} {}-{}", start.format("%a %Y-%m-%d"), start.format("%H:%M"), end.format("%H:%M"))
    } else {
        format!("{} - {}", start.format("%a %Y-%m-%d %H:%M"), end.format("%a %Y-%m-%d %H:%M"))
    }
}
