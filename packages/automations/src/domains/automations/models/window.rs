//! Optional send window constraining when action steps may execute.
//!
//! Hours are local to the automation's timezone. A run that comes due outside
//! the window parks until the next opening instead of executing.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::super::errors::AutomationConfigError;

/// Local-hour window `[start_hour, end_hour)` in the automation's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ScheduleWindow {
    pub fn validate(&self) -> Result<(), AutomationConfigError> {
        if self.start_hour > 23 || self.end_hour > 24 || self.start_hour >= self.end_hour {
            return Err(AutomationConfigError::InvalidScheduleWindow);
        }
        Ok(())
    }

    fn contains_hour(&self, hour: u32) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    /// When `now` falls outside the window, the next opening as a UTC instant.
    /// Returns `None` when the window is currently open.
    pub fn next_open(&self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&tz);
        if self.contains_hour(local.hour()) {
            return None;
        }

        let today_open = local.date_naive().and_hms_opt(self.start_hour, 0, 0)?;
        let open = if local.hour() < self.start_hour {
            today_open
        } else {
            today_open + Duration::days(1)
        };

        resolve_local(tz, open).map(|dt| dt.with_timezone(&Utc))
    }
}

/// Resolve a naive local datetime in `tz`, biasing toward the earlier instant
/// for ambiguous times and skipping forward across DST gaps.
pub(crate) fn resolve_local(
    tz: Tz,
    local: chrono::NaiveDateTime,
) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        chrono::LocalResult::Single(dt) => Some(dt),
        chrono::LocalResult::Ambiguous(earlier, _) => Some(earlier),
        // Inside a spring-forward gap; an hour later always exists
        chrono::LocalResult::None => tz
            .from_local_datetime(&(local + Duration::hours(1)))
            .earliest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn chicago() -> Tz {
        "America/Chicago".parse().unwrap()
    }

    fn utc_at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
    }

    #[test]
    fn open_window_defers_nothing() {
        let window = ScheduleWindow {
            start_hour: 9,
            end_hour: 17,
        };
        // 2026-06-15 15:00 UTC = 10:00 in Chicago (CDT, UTC-5)
        let now = utc_at(2026, 6, 15, 15, 0);
        assert_eq!(window.next_open(now, chicago()), None);
    }

    #[test]
    fn early_morning_defers_to_same_day_opening() {
        let window = ScheduleWindow {
            start_hour: 9,
            end_hour: 17,
        };
        // 2026-06-15 11:00 UTC = 06:00 in Chicago
        let now = utc_at(2026, 6, 15, 11, 0);
        let open = window.next_open(now, chicago()).unwrap();
        // 09:00 CDT = 14:00 UTC
        assert_eq!(open, utc_at(2026, 6, 15, 14, 0));
    }

    #[test]
    fn late_evening_defers_to_next_day() {
        let window = ScheduleWindow {
            start_hour: 9,
            end_hour: 17,
        };
        // 2026-06-16 01:00 UTC = 2026-06-15 20:00 in Chicago
        let now = utc_at(2026, 6, 16, 1, 0);
        let open = window.next_open(now, chicago()).unwrap();
        assert_eq!(open, utc_at(2026, 6, 16, 14, 0));
    }

    #[test]
    fn validate_rejects_inverted_window() {
        assert!(ScheduleWindow {
            start_hour: 17,
            end_hour: 9
        }
        .validate()
        .is_err());
        assert!(ScheduleWindow {
            start_hour: 9,
            end_hour: 25
        }
        .validate()
        .is_err());
        assert!(ScheduleWindow {
            start_hour: 8,
            end_hour: 20
        }
        .validate()
        .is_ok());
    }
}
