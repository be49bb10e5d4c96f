//! # slot-engine
//!
//! Free-slot search and recurring-event expansion for calendar scheduling agents.
//!
//! The engine takes busy time that a calendar client already fetched and an
//! event request that an intent parser already produced, and decides where the
//! event goes. It does no I/O, holds no global state, and never fails: every
//! outcome, including a malformed request, is a [`SchedulingDecision`].
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use slot_engine::{EventRequest, IntervalSet, SchedulingEngine, TimeInterval, Window};
//!
//! let at = |h| Utc.with_ymd_and_hms(2026, 3, 2, h, 0, 0).unwrap();
//! let busy = IntervalSet::from_intervals([
//!     TimeInterval::new(at(9), at(10)).unwrap(),
//!     TimeInterval::new(at(11), at(12)).unwrap(),
//! ]);
//! let request = EventRequest::new("1:1", 60, Window::new(at(9), at(17)));
//!
//! let decision = SchedulingEngine::default().schedule(&request, &busy);
//! assert_eq!(decision.occurrences(), &[TimeInterval::new(at(10), at(11)).unwrap()]);
//! ```
//!
//! ## Modules
//!
//! - [`interval`] — half-open `TimeInterval`
//! - [`interval_set`] — sorted, coalesced busy time
//! - [`busy`] — normalizing raw busy periods from a calendar
//! - [`availability`] — merging busy time from several calendars
//! - [`recurrence`] — daily/weekly/monthly expansion with month-end clamping
//! - [`rfc5545`] — RRULE rendering and recurring busy-event expansion
//! - [`dst`] — DST transition policies (skip, shift, etc.)
//! - [`slot`] — free-slot search, snapping, working hours
//! - [`conflict`] — occurrences that collide with busy time
//! - [`request`] — `EventRequest` as produced by the intent parser
//! - [`config`] — `EngineConfig`
//! - [`engine`] — the request → decision pipeline
//! - [`decision`] — `SchedulingDecision` and its text summary
//! - [`error`] — Error types

pub mod availability;
pub mod busy;
pub mod config;
pub mod conflict;
pub mod decision;
pub mod dst;
pub mod engine;
pub mod error;
pub mod interval;
pub mod interval_set;
pub mod recurrence;
pub mod request;
pub mod rfc5545;
pub mod slot;

pub use busy::BusyPeriod;
pub use config::{EngineConfig, TooLongPolicy};
pub use conflict::{find_conflicts, Conflict};
pub use decision::SchedulingDecision;
pub use dst::DstPolicy;
pub use engine::SchedulingEngine;
pub use error::SlotError;
pub use interval::TimeInterval;
pub use interval_set::IntervalSet;
pub use recurrence::{expand, expand_in, Frequency, RecurrenceRule, MAX_OCCURRENCES};
pub use request::{EventRequest, Window};
pub use slot::{SlotFinder, SnapGrid, WorkingHours};
