//! DST transition policies for wall-clock times.
//!
//! Recurrence steps and working-hours bands are computed on the local wall
//! clock. A local time can fall into a spring-forward gap (it never happens)
//! or a fall-back overlap (it happens twice); this module turns it into one
//! absolute instant, or none.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for local times that fall into a DST gap.
///
/// Ambiguous (fall-back) times always resolve to the earlier instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Skip instances that fall in the DST gap (e.g., 2:30 AM during spring forward)
    Skip,
    /// Shift to the first valid time after the gap
    ShiftForward,
    /// Keep the pre-transition offset, which moves the instant forward by the gap length
    #[default]
    WallClock,
}

// No IANA zone has a gap longer than this.
const MAX_GAP_MINUTES: i64 = 180;

/// Resolve a local wall-clock time in `tz` to an absolute instant.
///
/// Returns `None` only for [`DstPolicy::Skip`] inside a gap.
pub fn resolve_local(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES).find_map(|minutes| {
                tz.from_local_datetime(&(local + Duration::minutes(minutes)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }),
            DstPolicy::WallClock => {
                let before = tz
                    .from_local_datetime(&(local - Duration::minutes(MAX_GAP_MINUTES)))
                    .earliest()?;
                let offset = before.offset().fix().local_minus_utc() as i64;
                Some(Utc.from_utc_datetime(&(local - Duration::seconds(offset))))
            }
        },
    }
}
