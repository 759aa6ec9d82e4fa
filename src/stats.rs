//! Daily count series over a fixed trailing window
//!
//! The store only reports days that have at least one record. The series
//! served to clients always covers today and the preceding days with an
//! explicit zero wherever the store reported nothing.

use chrono::{Days, NaiveDate, Utc};
use std::collections::HashMap;

use crate::db::DailyCount;

/// Today plus the 31 days before it
pub const TRAILING_DAYS: u64 = 32;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Current calendar date in UTC, the same clock the store groups by
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Build the `days`-long series ending at `today`, oldest first.
/// Counts for days outside the window are ignored.
pub fn fill_trailing_window(counts: Vec<DailyCount>, today: NaiveDate, days: u64) -> Vec<DailyCount> {
    let by_day: HashMap<String, i64> = counts
        .into_iter()
        .map(|DailyCount { day, count }| (day, count))
        .collect();

    (0..days)
        .rev()
        .filter_map(|ago| today.checked_sub_days(Days::new(ago)))
        .map(|date| {
            let day = date.format(DAY_FORMAT).to_string();
            let count = by_day.get(&day).copied().unwrap_or(0);
            DailyCount::new(day, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DAY_FORMAT).unwrap()
    }

    #[test]
    fn fills_gaps_with_zero() {
        let counts = vec![DailyCount::new("2024-01-05", 3), DailyCount::new("2024-01-06", 1)];

        let series = fill_trailing_window(counts, date("2024-01-06"), TRAILING_DAYS);

        assert_eq!(series.len(), 32);
        assert_eq!(series[0], DailyCount::new("2023-12-06", 0));
        assert_eq!(series[30], DailyCount::new("2024-01-05", 3));
        assert_eq!(series[31], DailyCount::new("2024-01-06", 1));
        assert_eq!(series.iter().map(|c| c.count).sum::<i64>(), 4);
    }

    #[test]
    fn days_are_contiguous_and_end_today() {
        let today = date("2024-03-01");
        let series = fill_trailing_window(Vec::new(), today, TRAILING_DAYS);

        assert_eq!(series.first().unwrap().day, "2024-01-30");
        assert_eq!(series.last().unwrap().day, "2024-03-01");
        assert!(series.iter().any(|c| c.day == "2024-02-29"));

        let dates: Vec<NaiveDate> = series.iter().map(|c| date(&c.day)).collect();
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], chrono::Duration::days(1));
        }
        assert!(series.iter().all(|c| c.count == 0));
    }

    #[test]
    fn counts_outside_window_are_dropped() {
        let counts = vec![
            DailyCount::new("2023-12-05", 7), // one day too old
            DailyCount::new("2023-12-06", 2),
            DailyCount::new("2024-01-07", 9), // tomorrow
        ];

        let series = fill_trailing_window(counts, date("2024-01-06"), TRAILING_DAYS);

        assert_eq!(series.len(), 32);
        assert_eq!(series[0], DailyCount::new("2023-12-06", 2));
        assert_eq!(series.iter().map(|c| c.count).sum::<i64>(), 2);
    }

    #[test]
    fn spans_year_boundary() {
        let series = fill_trailing_window(vec![DailyCount::new("2023-12-31", 5)], date("2024-01-01"), 3);

        assert_eq!(
            series,
            vec![
                DailyCount::new("2023-12-30", 0),
                DailyCount::new("2023-12-31", 5),
                DailyCount::new("2024-01-01", 0),
            ]
        );
    }
}
