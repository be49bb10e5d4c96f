//! End-to-end tests for the scheduling engine: request in, decision out.

use chrono::{DateTime, TimeZone, Utc};
use slot_engine::{
    EngineConfig, EventRequest, Frequency, IntervalSet, RecurrenceRule, SchedulingDecision, SchedulingEngine,
    TimeInterval, TooLongPolicy, Window, WorkingHours,
};

fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, min, 0).unwrap()
}

fn iv(day: u32, sh: u32, eh: u32) -> TimeInterval {
    TimeInterval::new(at(day, sh, 0), at(day, eh, 0)).unwrap()
}

/// Monday 2026-03-02, 09:00-17:00.
fn monday_window() -> Window {
    Window::new(at(2, 9, 0), at(2, 17, 0))
}

/// Busy 09:00-10:00 and 11:00-12:00 on Monday 2026-03-02.
fn morning_busy() -> IntervalSet {
    IntervalSet::from_intervals([iv(2, 9, 10), iv(2, 11, 12)])
}

fn engine_with(config: EngineConfig) -> SchedulingEngine {
    SchedulingEngine::new(config).unwrap()
}

// ---------------------------------------------------------------------------
// Single events
// ---------------------------------------------------------------------------

#[test]
fn single_event_takes_first_free_slot() {
    let request = EventRequest::new("1:1", 60, monday_window());
    let decision = SchedulingEngine::default().schedule(&request, &morning_busy());

    assert_eq!(decision, SchedulingDecision::Accepted { occurrences: vec![iv(2, 10, 11)] });
}

#[test]
fn fixed_start_on_free_time_is_accepted() {
    let request = EventRequest::new("1:1", 60, monday_window()).with_fixed_start(at(2, 10, 0));
    let decision = SchedulingEngine::default().schedule(&request, &morning_busy());

    assert_eq!(decision.occurrences(), &[iv(2, 10, 11)]);
}

#[test]
fn fixed_start_collision_reports_alternatives() {
    let request = EventRequest::new("1:1", 60, monday_window()).with_fixed_start(at(2, 9, 0));
    let decision = SchedulingEngine::default().schedule(&request, &morning_busy());

    let SchedulingDecision::Conflict {
        conflicts,
        alternatives,
        unplaceable_index,
    } = decision
    else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].index, 0);
    assert_eq!(conflicts[0].busy, vec![iv(2, 9, 10)]);
    assert_eq!(unplaceable_index, None);
    assert_eq!(alternatives, vec![iv(2, 10, 11), iv(2, 12, 13), iv(2, 13, 14)]);
}

#[test]
fn alternatives_respect_configured_count() {
    let engine = engine_with(EngineConfig {
        alternatives: 1,
        ..EngineConfig::default()
    });
    let request = EventRequest::new("1:1", 60, monday_window()).with_fixed_start(at(2, 11, 0));
    let decision = engine.schedule(&request, &morning_busy());

    let SchedulingDecision::Conflict { alternatives, .. } = decision else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(alternatives, vec![iv(2, 10, 11)]);
}

#[test]
fn fixed_start_outside_window_is_invalid() {
    let request = EventRequest::new("1:1", 60, monday_window()).with_fixed_start(at(2, 16, 30));
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());
    assert_eq!(decision.status(), "invalid");
}

#[test]
fn full_window_in_search_mode_is_unplaceable() {
    let busy = IntervalSet::from_intervals([iv(2, 8, 18)]);
    let request = EventRequest::new("1:1", 30, monday_window());
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    let SchedulingDecision::Conflict {
        conflicts,
        alternatives,
        unplaceable_index,
    } = decision
    else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(unplaceable_index, Some(0));
    assert_eq!(conflicts[0].busy, vec![iv(2, 8, 18)]);
    // Alternatives come from the horizon after the window.
    assert_eq!(alternatives.first(), Some(&TimeInterval::new(at(2, 18, 0), at(2, 18, 30)).unwrap()));
    assert!(alternatives.iter().all(|a| !busy.overlaps(a)));
}

// ---------------------------------------------------------------------------
// Too-long requests
// ---------------------------------------------------------------------------

#[test]
fn duration_longer_than_window_is_invalid_by_default() {
    let request = EventRequest::new("Offsite", 10 * 60, monday_window());
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());

    let SchedulingDecision::Invalid { reason } = decision else {
        panic!("expected invalid, got {:?}", decision);
    };
    assert!(reason.contains("600 minutes"), "reason: {}", reason);
}

#[test]
fn duration_longer_than_window_can_be_a_conflict() {
    let engine = engine_with(EngineConfig {
        too_long: TooLongPolicy::Conflict,
        ..EngineConfig::default()
    });
    let request = EventRequest::new("Offsite", 10 * 60, monday_window());

    assert_eq!(
        engine.schedule(&request, &IntervalSet::new()),
        SchedulingDecision::Conflict {
            conflicts: Vec::new(),
            alternatives: Vec::new(),
            unplaceable_index: Some(0),
        }
    );
}

// ---------------------------------------------------------------------------
// Malformed requests
// ---------------------------------------------------------------------------

#[test]
fn malformed_requests_are_invalid_not_errors() {
    let engine = SchedulingEngine::default();
    let busy = IntervalSet::new();

    let blank = EventRequest::new("", 30, monday_window());
    let zero = EventRequest::new("Sync", 0, monday_window());
    let inverted = EventRequest::new("Sync", 30, Window::new(at(2, 17, 0), at(2, 9, 0)));
    let bad_rule =
        EventRequest::new("Sync", 30, monday_window()).with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 0, 4));
    let no_end = EventRequest::new("Sync", 30, monday_window()).with_recurrence(RecurrenceRule {
        frequency: Frequency::Weekly,
        interval: 1,
        count: None,
        until: None,
    });

    for request in [blank, zero, inverted, bad_rule, no_end] {
        assert_eq!(engine.schedule(&request, &busy).status(), "invalid", "{:?}", request);
    }
}

#[test]
fn until_before_anchor_is_invalid() {
    let request = EventRequest::new("Sync", 30, monday_window())
        .with_recurrence(RecurrenceRule::with_until(Frequency::Daily, 1, at(1, 0, 0)));
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());
    assert_eq!(decision.status(), "invalid");
}

// ---------------------------------------------------------------------------
// Recurring series
// ---------------------------------------------------------------------------

#[test]
fn weekly_fixed_series_is_accepted_seven_days_apart() {
    let request = EventRequest::new("Team Meeting", 60, monday_window())
        .with_fixed_start(at(2, 10, 0))
        .with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 4));
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());

    assert_eq!(
        decision.occurrences(),
        &[iv(2, 10, 11), iv(9, 10, 11), iv(16, 10, 11), iv(23, 10, 11)]
    );
}

#[test]
fn weekly_search_series_avoids_recurring_busy_time() {
    // Busy every Monday 09:00-10:00.
    let busy = IntervalSet::from_intervals([iv(2, 9, 10), iv(9, 9, 10), iv(16, 9, 10), iv(23, 9, 10)]);
    let request = EventRequest::new("Team Meeting", 60, monday_window())
        .with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 4));
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    assert_eq!(
        decision.occurrences(),
        &[iv(2, 10, 11), iv(9, 10, 11), iv(16, 10, 11), iv(23, 10, 11)]
    );
}

#[test]
fn fixed_series_reports_only_colliding_weeks() {
    let busy = IntervalSet::from_intervals([TimeInterval::new(at(9, 10, 0), at(9, 10, 30)).unwrap()]);
    let request = EventRequest::new("Team Meeting", 60, monday_window())
        .with_fixed_start(at(2, 10, 0))
        .with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 3));
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    let SchedulingDecision::Conflict {
        conflicts,
        alternatives,
        unplaceable_index,
    } = decision
    else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(unplaceable_index, None);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].index, 1);
    assert_eq!(conflicts[0].overlap_minutes, 30);
    // Alternatives are searched in the second week's window.
    assert_eq!(alternatives.first(), Some(&iv(9, 9, 10)));
    // The weeks that do fit stay booked.
    assert!(alternatives.iter().all(|a| !a.overlaps(&iv(16, 10, 11))));
}

#[test]
fn unplaceable_occurrence_is_identified() {
    // The third Monday is booked solid.
    let busy = IntervalSet::from_intervals([iv(16, 8, 18)]);
    let request = EventRequest::new("Team Meeting", 60, monday_window())
        .with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 3));
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    let SchedulingDecision::Conflict {
        conflicts,
        alternatives,
        unplaceable_index,
    } = decision
    else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(unplaceable_index, Some(2));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].index, 2);
    assert_eq!(alternatives.len(), 3);
    assert_eq!(alternatives[0], iv(16, 18, 19));
}

#[test]
fn series_never_double_books_itself() {
    // Window spans three days, so consecutive occurrence windows overlap.
    let window = Window::new(at(2, 9, 0), at(4, 17, 0));
    let busy = IntervalSet::from_intervals([TimeInterval::new(at(2, 10, 0), at(4, 9, 0)).unwrap()]);
    let request =
        EventRequest::new("Standup", 60, window).with_recurrence(RecurrenceRule::with_count(Frequency::Daily, 1, 3));
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    let occurrences = decision.occurrences();
    assert_eq!(occurrences, &[iv(2, 9, 10), iv(4, 9, 10), iv(4, 10, 11)]);
    for (i, a) in occurrences.iter().enumerate() {
        for b in &occurrences[i + 1..] {
            assert!(!a.overlaps(b), "{} overlaps {}", a, b);
        }
    }
}

#[test]
fn self_overlapping_series_is_invalid() {
    let request = EventRequest::new("Retreat", 26 * 60, Window::new(at(2, 0, 0), at(4, 0, 0)))
        .with_recurrence(RecurrenceRule::with_count(Frequency::Daily, 1, 3));
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());
    assert_eq!(decision.status(), "invalid");
}

#[test]
fn huge_monthly_interval_yields_only_the_anchor() {
    let request = EventRequest::new("Review", 60, monday_window())
        .with_recurrence(RecurrenceRule::with_count(Frequency::Monthly, u32::MAX, 2));
    let decision = SchedulingEngine::default().schedule(&request, &IntervalSet::new());

    assert_eq!(decision, SchedulingDecision::Accepted { occurrences: vec![iv(2, 9, 10)] });
}

#[test]
fn searched_occurrences_never_start_after_until() {
    // Mornings are booked through 15:00; the last occurrence may not slide
    // into the afternoon because that would start it past `until`.
    let busy = IntervalSet::from_intervals([iv(2, 9, 15), iv(3, 9, 15), iv(4, 9, 15)]);
    let until = at(4, 10, 0);
    let request = EventRequest::new("Standup", 60, monday_window())
        .with_recurrence(RecurrenceRule::with_until(Frequency::Daily, 1, until));
    let decision = SchedulingEngine::default().schedule(&request, &busy);

    let SchedulingDecision::Conflict {
        conflicts,
        unplaceable_index,
        ..
    } = decision
    else {
        panic!("expected conflict, got {:?}", decision);
    };
    assert_eq!(unplaceable_index, Some(2));
    assert_eq!(conflicts[0].occurrence, iv(4, 9, 10));

    // With room before `until`, the same series is placed in full.
    let open = IntervalSet::from_intervals([iv(2, 9, 15), iv(3, 9, 15), iv(4, 9, 10)]);
    let decision = SchedulingEngine::default().schedule(&request, &open);
    assert_eq!(decision.occurrences(), &[iv(2, 15, 16), iv(3, 15, 16), iv(4, 10, 11)]);
    assert!(decision.occurrences().iter().all(|o| o.start() <= until));
}

#[test]
fn max_occurrences_caps_the_series() {
    let engine = engine_with(EngineConfig {
        max_occurrences: 2,
        ..EngineConfig::default()
    });
    let request = EventRequest::new("Sync", 30, monday_window())
        .with_recurrence(RecurrenceRule::with_count(Frequency::Daily, 1, 10));
    assert_eq!(engine.schedule(&request, &IntervalSet::new()).occurrences().len(), 2);
}

#[test]
fn weekly_series_keeps_local_time_across_dst() {
    let engine = engine_with(EngineConfig {
        timezone: "America/Los_Angeles".to_string(),
        ..EngineConfig::default()
    });
    // Monday 09:00-17:00 PST; fixed at 10:00 PST (18:00Z).
    let window = Window::new(at(2, 17, 0), Utc.with_ymd_and_hms(2026, 3, 3, 1, 0, 0).unwrap());
    let request = EventRequest::new("Team Meeting", 60, window)
        .with_fixed_start(at(2, 18, 0))
        .with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 2));
    let decision = engine.schedule(&request, &IntervalSet::new());

    // After the change, 10:00 PDT is 17:00Z.
    assert_eq!(decision.occurrences(), &[iv(2, 18, 19), iv(9, 17, 18)]);
}

// ---------------------------------------------------------------------------
// Placement policies from configuration
// ---------------------------------------------------------------------------

#[test]
fn snapping_and_working_hours_from_config() {
    let engine = engine_with(EngineConfig {
        snap_minutes: Some(30),
        working_hours: Some(WorkingHours {
            start_hour: 13,
            end_hour: 17,
            weekdays_only: true,
        }),
        ..EngineConfig::default()
    });
    let busy = IntervalSet::from_intervals([TimeInterval::new(at(2, 12, 0), at(2, 13, 10)).unwrap()]);
    let request = EventRequest::new("Review", 45, monday_window());
    let decision = engine.schedule(&request, &busy);

    assert_eq!(
        decision.occurrences(),
        &[TimeInterval::new(at(2, 13, 30), at(2, 14, 15)).unwrap()]
    );
}

#[test]
fn invalid_config_is_rejected_up_front() {
    assert!(SchedulingEngine::new(EngineConfig {
        timezone: "Nowhere/Special".to_string(),
        ..EngineConfig::default()
    })
    .is_err());
    assert!(SchedulingEngine::new(EngineConfig {
        snap_minutes: Some(0),
        ..EngineConfig::default()
    })
    .is_err());
    assert!(SchedulingEngine::new(EngineConfig {
        max_occurrences: 1000,
        ..EngineConfig::default()
    })
    .is_err());
}

// ---------------------------------------------------------------------------
// Lookahead and output
// ---------------------------------------------------------------------------

#[test]
fn lookahead_covers_series_and_horizon() {
    let engine = SchedulingEngine::default();
    let single = EventRequest::new("1:1", 60, monday_window());
    assert_eq!(
        engine.lookahead(&single),
        Some(TimeInterval::new(Utc.with_ymd_and_hms(2026, 2, 23, 9, 0, 0).unwrap(), at(9, 9, 0)).unwrap())
    );

    let weekly = single.clone().with_recurrence(RecurrenceRule::with_count(Frequency::Weekly, 1, 3));
    let span = engine.lookahead(&weekly).unwrap();
    assert_eq!(span.end(), at(23, 9, 0));
    assert!(span.contains(&iv(16, 9, 17)));

    let invalid = EventRequest::new("", 60, monday_window());
    assert_eq!(engine.lookahead(&invalid), None);
}

#[test]
fn decision_serializes_with_status_tag() {
    let request = EventRequest::new("1:1", 60, monday_window());
    let decision = SchedulingEngine::default().schedule(&request, &morning_busy());
    let json = serde_json::to_value(&decision).unwrap();

    assert_eq!(json["status"], "accepted");
    assert_eq!(json["occurrences"][0]["start"], "2026-03-02T10:00:00Z");

    let back: SchedulingDecision = serde_json::from_value(json).unwrap();
    assert_eq!(back, decision);
}

#[test]
fn summary_renders_local_times() {
    let request = EventRequest::new("1:1", 60, monday_window()).with_fixed_start(at(2, 9, 0));
    let decision = SchedulingEngine::default().schedule(&request, &morning_busy());
    let summary = decision.summary(chrono_tz::Tz::UTC);

    assert!(summary.starts_with("Conflict: 1 occurrence(s) collide with busy time"));
    assert!(summary.contains("Mon 2026-03-02 09:00-10:00"));
    assert!(summary.contains("Alternatives:"));

    let accepted = SchedulingEngine::default().schedule(&request.with_fixed_start(at(2, 10, 0)), &morning_busy());
    assert_eq!(
        accepted.summary(chrono_tz::Tz::UTC),
        "Accepted: 1 occurrence(s)\n  - Mon 2026-03-02 10:00-11:00\n"
    );
}
