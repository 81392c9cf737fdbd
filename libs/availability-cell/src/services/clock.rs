use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use tracing::warn;

use crate::services::occupancy::ElapsedCutoff;

/// Clinic wall clock at a fixed UTC offset.
///
/// Only valid for regions without DST; swap in a tz-database conversion otherwise.
#[derive(Debug, Clone, Copy)]
pub struct ClinicClock {
    offset: FixedOffset,
}

impl ClinicClock {
    pub fn new(utc_offset_hours: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .or_else(|| {
                warn!("Invalid clinic UTC offset {}h, falling back to UTC-3", utc_offset_hours);
                FixedOffset::west_opt(3 * 3600)
            })
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn local_now(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_now(now).date()
    }

    pub fn cutoff(&self, now: DateTime<Utc>, buffer_minutes: i32) -> ElapsedCutoff {
        ElapsedCutoff::new(self.local_now(now), buffer_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_day_lags_utc_near_midnight() {
        let clock = ClinicClock::new(-3);
        let now = Utc.with_ymd_and_hms(2024, 6, 4, 1, 30, 0).unwrap();

        assert_eq!(clock.today(now), NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(clock.local_now(now).format("%H:%M").to_string(), "22:30");
    }

    #[test]
    fn test_cutoff_uses_local_minutes() {
        let clock = ClinicClock::new(-3);
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let cutoff = clock.cutoff(now, 30);

        assert_eq!(cutoff.today, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        assert_eq!(cutoff.now_minutes, 9 * 60);
        assert_eq!(cutoff.buffer_minutes, 30);
    }

    #[test]
    fn test_out_of_range_offset_falls_back() {
        let clock = ClinicClock::new(99);
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        assert_eq!(clock.local_now(now).format("%H:%M").to_string(), "09:00");
    }
}
