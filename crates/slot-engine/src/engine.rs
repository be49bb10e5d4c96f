//! The scheduling engine: one structured request in, one decision out.
//!
//! Each request moves through `Received → Validated → (Expanding) → Checking →
//! Decided`. The engine is pure with respect to the busy set it is given: it
//! performs no I/O and never returns an error. Malformed input becomes
//! [`SchedulingDecision::Invalid`]; a missing slot becomes
//! [`SchedulingDecision::Conflict`].
//!
//! Recurring requests are checked occurrence by occurrence. Occurrence `n`
//! gets its own window: the request window moved by the same offset as the
//! occurrence (a Monday 09:00-17:00 window for a weekly series becomes the
//! following Monday 09:00-17:00, and so on).

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::config::{EngineConfig, TooLongPolicy};
use crate::conflict::{self, Conflict};
use crate::decision::SchedulingDecision;
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;
use crate::interval_set::IntervalSet;
use crate::recurrence;
use crate::request::EventRequest;
use crate::slot::{SlotFinder, SnapGrid};

#[derive(Debug, Clone)]
pub struct SchedulingEngine {
    config: EngineConfig,
    tz: Tz,
    finder: SlotFinder,
}

/// A validated request with its candidate occurrences.
struct Plan {
    window: TimeInterval,
    duration: Duration,
    fixed: bool,
    anchor: TimeInterval,
    occurrences: Vec<TimeInterval>,
    until: Option<DateTime<Utc>>,
}

impl Plan {
    /// The request window moved along with occurrence `occurrence`.
    fn window_for(&self, occurrence: &TimeInterval) -> TimeInterval {
        self.window
            .shifted(occurrence.start() - self.anchor.start())
            .unwrap_or(self.window)
    }

    /// The part of `window` where a placed occurrence still starts no later
    /// than the series' `until`. `None` when nothing of it is left.
    fn bounded(&self, window: TimeInterval) -> Option<TimeInterval> {
        let Some(until) = self.until else {
            return Some(window);
        };
        let last_end = until.checked_add_signed(self.duration)?.min(window.end());
        TimeInterval::new(window.start(), last_end).ok()
    }
}

impl SchedulingEngine {
    /// Build an engine from `config`.
    ///
    /// # Errors
    /// Returns `SlotError::InvalidTimezone` or `SlotError::InvalidConfig` when
    /// the configuration is unusable.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let tz = config.tz()?;

        let mut finder = SlotFinder::new();
        if let Some(minutes) = config.snap_minutes {
            finder = finder.with_snap(SnapGrid::new(minutes, tz)?);
        }
        if let Some(hours) = config.working_hours {
            finder = finder.with_working_hours(hours, tz)?;
        }

        Ok(Self { config, tz, finder })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn finder(&self) -> &SlotFinder {
        &self.finder
    }

    /// The span of busy time the caller should fetch for `request`: every
    /// occurrence window and every alternatives search range.
    ///
    /// Returns `None` for requests that will be rejected as invalid anyway.
    pub fn lookahead(&self, request: &EventRequest) -> Option<TimeInterval> {
        let plan = self.plan(request).ok()?;
        let first = plan.window_for(plan.occurrences.first()?);
        let last = plan.window_for(plan.occurrences.last()?);
        let horizon = self.horizon();
        TimeInterval::new(
            first.start().checked_sub_signed(horizon)?,
            last.end().max(last.start().checked_add_signed(horizon)?),
        )
        .ok()
    }

    /// Decide where (or whether) `request` fits into `busy`.
    pub fn schedule(&self, request: &EventRequest, busy: &IntervalSet) -> SchedulingDecision {
        debug!(title = %request.title, phase = "received", busy = busy.len());

        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(decision) => {
                debug!(title = %request.title, phase = "decided", status = decision.status());
                return decision;
            }
        };

        debug!(
            title = %request.title,
            phase = "checking",
            occurrences = plan.occurrences.len(),
            fixed = plan.fixed
        );
        let decision = if plan.fixed {
            self.check_fixed(&plan, busy)
        } else {
            self.place_all(&plan, busy)
        };

        debug!(title = %request.title, phase = "decided", status = decision.status());
        decision
    }

    /// `Received → Validated → Expanding`. Any failure is already the final decision.
    fn plan(&self, request: &EventRequest) -> std::result::Result<Plan, SchedulingDecision> {
        let validated = request.validate().map_err(SchedulingDecision::invalid)?;
        let window = validated.window;
        let duration = validated.duration;

        if duration > window.duration() {
            let reason = SlotError::InvalidRequest(format!(
                "duration of {} minutes does not fit a {}-minute window",
                duration.num_minutes(),
                window.duration_minutes()
            ));
            return Err(match self.config.too_long {
                TooLongPolicy::Invalid => SchedulingDecision::invalid(reason),
                TooLongPolicy::Conflict => SchedulingDecision::Conflict {
                    conflicts: Vec::new(),
                    alternatives: Vec::new(),
                    unplaceable_index: Some(0),
                },
            });
        }

        let anchor_start = validated.fixed.unwrap_or(window.start());
        let anchor =
            TimeInterval::starting_at(anchor_start, duration).map_err(SchedulingDecision::invalid)?;
        if validated.fixed.is_some() && !window.contains(&anchor) {
            return Err(SchedulingDecision::invalid(SlotError::InvalidRequest(format!(
                "fixed start {} does not fit inside the window",
                anchor
            ))));
        }
        debug!(title = %request.title, phase = "validated");

        let occurrences = match &request.recurrence {
            None => vec![anchor],
            Some(rule) => {
                debug!(title = %request.title, phase = "expanding", frequency = %rule.frequency);
                recurrence::expand_in(
                    rule,
                    anchor,
                    self.config.max_occurrences,
                    self.tz,
                    self.config.dst_policy,
                )
                .map_err(SchedulingDecision::invalid)?
                .collect()
            }
        };
        if occurrences.is_empty() {
            return Err(SchedulingDecision::invalid(SlotError::InvalidRule(
                "recurrence produces no occurrences".to_string(),
            )));
        }

        Ok(Plan {
            window,
            duration,
            fixed: validated.fixed.is_some(),
            anchor,
            occurrences,
            until: request.recurrence.as_ref().and_then(|rule| rule.until),
        })
    }

    /// Fixed-time mode: accept the requested occurrences as-is or report
    /// every collision with alternatives for each.
    fn check_fixed(&self, plan: &Plan, busy: &IntervalSet) -> SchedulingDecision {
        let conflicts = conflict::find_conflicts(&plan.occurrences, busy);
        if conflicts.is_empty() {
            return SchedulingDecision::Accepted {
                occurrences: plan.occurrences.clone(),
            };
        }
        debug!(conflicting = conflicts.len(), "fixed occurrences collide");

        // The occurrences that do fit stay booked while alternatives are sought.
        let mut committed = busy.clone();
        for (index, occurrence) in plan.occurrences.iter().enumerate() {
            if !conflicts.iter().any(|c| c.index == index) {
                committed.insert(*occurrence);
            }
        }

        let mut alternatives: Vec<TimeInterval> = conflicts
            .iter()
            .flat_map(|c| self.alternatives(plan, &committed, &c.occurrence))
            .collect();
        alternatives.sort();
        alternatives.dedup();

        SchedulingDecision::Conflict {
            conflicts,
            alternatives,
            unplaceable_index: None,
        }
    }

    /// Search mode: place each occurrence at the earliest free slot of its
    /// window, never before the end of the previous placement and never
    /// starting after the series' `until`.
    fn place_all(&self, plan: &Plan, busy: &IntervalSet) -> SchedulingDecision {
        let mut working = busy.clone();
        let mut placed = Vec::with_capacity(plan.occurrences.len());
        let mut after: DateTime<Utc> = plan.window.start();

        for (index, nominal) in plan.occurrences.iter().enumerate() {
            let window = plan.window_for(nominal);
            let from = after.max(window.start());
            let found = plan
                .bounded(window)
                .and_then(|bounded| self.finder.find_next(&working, &bounded, plan.duration, from));

            match found {
                Some(slot) => {
                    debug!(index, %slot, "occurrence placed");
                    working.insert(slot);
                    after = slot.end();
                    placed.push(slot);
                }
                None => {
                    debug!(index, %window, "no slot for occurrence");
                    let conflict = Conflict::against(index, *nominal, working.overlapping(&window));
                    let alternatives = self.alternatives(plan, &working, nominal);
                    return SchedulingDecision::Conflict {
                        conflicts: vec![conflict],
                        alternatives,
                        unplaceable_index: Some(index),
                    };
                }
            }
        }

        SchedulingDecision::Accepted { occurrences: placed }
    }

    /// Up to `alternatives` free slots near `occurrence`: from its window start
    /// (or one horizon before the occurrence, whichever is later) to one
    /// horizon after it (or its window end, whichever is later).
    fn alternatives(&self, plan: &Plan, busy: &IntervalSet, occurrence: &TimeInterval) -> Vec<TimeInterval> {
        let window = plan.window_for(occurrence);
        let horizon = self.horizon();
        let start = occurrence
            .start()
            .checked_sub_signed(horizon)
            .map_or(window.start(), |t| t.max(window.start()));
        let end = occurrence
            .start()
            .checked_add_signed(horizon)
            .map_or(window.end(), |t| t.max(window.end()));
        let Ok(search) = TimeInterval::new(start, end) else {
            return Vec::new();
        };
        self.finder
            .find_all(busy, &search, plan.duration, self.config.alternatives)
    }

    fn horizon(&self) -> Duration {
        Duration::days(self.config.horizon_days as i64)
    }
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            tz: Tz::UTC,
            finder: SlotFinder::new(),
        }
    }
}
