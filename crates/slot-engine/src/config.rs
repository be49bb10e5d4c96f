//! Engine configuration.
//!
//! Every knob the scheduling engine uses is an explicit field here, passed in
//! per engine instance. Nothing is read from the environment. All fields have
//! defaults, so an empty TOML/JSON document is a valid configuration.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{Result, SlotError};
use crate::recurrence::MAX_OCCURRENCES;
use crate::slot::WorkingHours;

/// What to do when the requested duration is longer than the whole window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooLongPolicy {
    /// Reject the request as malformed.
    #[default]
    Invalid,
    /// Report a conflict with no alternatives.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// IANA timezone for wall-clock recurrence, working hours, and snapping.
    pub timezone: String,
    /// Alternative slots suggested per conflicting occurrence.
    pub alternatives: usize,
    /// How far around a conflicting occurrence to look for alternatives, in days.
    pub horizon_days: u32,
    /// Cap on occurrences expanded from one request (at most 366).
    pub max_occurrences: usize,
    /// Round slot starts up to this grid, in minutes. Unset means no snapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
    pub dst_policy: DstPolicy,
    pub too_long: TooLongPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            alternatives: 3,
            horizon_days: 7,
            max_occurrences: MAX_OCCURRENCES,
            snap_minutes: None,
            working_hours: None,
            dst_policy: DstPolicy::default(),
            too_long: TooLongPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| SlotError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if self.max_occurrences == 0 || self.max_occurrences > MAX_OCCURRENCES {
            return Err(SlotError::InvalidConfig(format!(
                "max_occurrences must be between 1 and {}, got {}",
                MAX_OCCURRENCES, self.max_occurrences
            )));
        }
        if let Some(hours) = &self.working_hours {
            hours.validate()?;
        }
        Ok(())
    }
}
