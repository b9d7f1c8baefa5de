//! Day boundaries in a user's local timezone.
//!
//! Every "today" comparison in the scheduler and the status calculations goes
//! through [`beginning_of_today`], never through UTC midnight.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Source of the current instant. Services take one so tests can pin "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Resolve a wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times inside
/// a DST gap are moved forward hour by hour until they exist.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = naive;
    for _ in 0..48 {
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return resolved.with_timezone(&Utc);
        }
        candidate = candidate + Duration::hours(1);
    }
    tracing::warn!(%tz, %naive, "local time never resolved, treating as UTC");
    Utc.from_utc_datetime(&naive)
}

/// Midnight of `date` in `tz`, as a UTC instant.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    localize(tz, date.and_time(NaiveTime::default()))
}

/// The calendar date `now` falls on for someone living in `tz`.
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Start of the user's current local day, converted back to UTC.
pub fn beginning_of_today(tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    local_midnight(tz, local_today(tz, now))
}
