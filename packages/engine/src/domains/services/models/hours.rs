//! Weekly operating-hours schedule.
//!
//! Windows are evaluated against the UTC clock. A service with no declared
//! windows and no 24/7 flag is treated as always open; schedules are
//! best-effort data supplied by managers.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// One open window on a given weekday. `close` is exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailyWindow {
    pub day: Weekday,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// Weekly schedule: a 24/7 flag or a list of per-day windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatingHours {
    #[serde(default)]
    pub is_24_7: bool,
    #[serde(default)]
    pub windows: Vec<DailyWindow>,
}

impl OperatingHours {
    pub fn always_open() -> Self {
        Self {
            is_24_7: true,
            windows: Vec::new(),
        }
    }

    pub fn with_windows(windows: Vec<DailyWindow>) -> Self {
        Self {
            is_24_7: false,
            windows,
        }
    }

    /// Whether the schedule says open at the given instant.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        if self.is_24_7 {
            return true;
        }
        // No declared hours: assume open
        if self.windows.is_empty() {
            return true;
        }
        let day = at.weekday();
        let time = at.time();
        self.windows
            .iter()
            .any(|w| w.day == day && w.open <= time && time < w.close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window(day: Weekday, open: &str, close: &str) -> DailyWindow {
        DailyWindow {
            day,
            open: open.parse().unwrap(),
            close: close.parse().unwrap(),
        }
    }

    #[test]
    fn test_24_7_is_always_open() {
        let hours = OperatingHours::always_open();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        assert!(hours.is_open_at(midnight));
    }

    #[test]
    fn test_no_declared_hours_assumes_open() {
        let hours = OperatingHours::default();
        let any = Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 0).unwrap();
        assert!(hours.is_open_at(any));
    }

    #[test]
    fn test_window_boundaries() {
        let hours =
            OperatingHours::with_windows(vec![window(Weekday::Mon, "09:00:00", "17:00:00")]);

        // 2024-03-04 is a Monday
        let at_open = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let before_open = Utc.with_ymd_and_hms(2024, 3, 4, 8, 59, 59).unwrap();
        let at_close = Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

        assert!(hours.is_open_at(at_open));
        assert!(!hours.is_open_at(before_open));
        assert!(!hours.is_open_at(at_close));
        assert!(!hours.is_open_at(tuesday));
    }

    #[test]
    fn test_multiple_windows_same_day() {
        let hours = OperatingHours::with_windows(vec![
            window(Weekday::Wed, "08:00:00", "12:00:00"),
            window(Weekday::Wed, "13:00:00", "18:00:00"),
        ]);

        // 2024-03-06 is a Wednesday
        let lunch = Utc.with_ymd_and_hms(2024, 3, 6, 12, 30, 0).unwrap();
        let afternoon = Utc.with_ymd_and_hms(2024, 3, 6, 14, 0, 0).unwrap();

        assert!(!hours.is_open_at(lunch));
        assert!(hours.is_open_at(afternoon));
    }
}
