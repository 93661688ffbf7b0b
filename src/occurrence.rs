//! Next-occurrence and countdown calculation.
//!
//! Both functions are pure: the caller passes `now`, nothing reads the clock.

use chrono::{Days, NaiveDateTime, NaiveTime};

use crate::alarm::DaySet;

/// How far ahead the search looks. Today plus a full week always contains
/// every weekday at a time that is still in the future.
const SEARCH_DAYS: u64 = 7;

/// The first instant strictly after `now` at `time` on a day in `days`.
#[must_use]
pub fn next_occurrence(time: NaiveTime, days: &DaySet, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    (0..=SEARCH_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .map(|date| date.and_time(time))
        .find(|candidate| *candidate > now && days.includes(candidate.date()))
        // unreachable for a valid DaySet, keeps the function total
        .unwrap_or_else(|| now + chrono::Duration::days(1))
}

/// Time left until `next`, rounded up to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub hours: i64,
    pub minutes: i64,
}

impl Countdown {
    #[must_use]
    pub fn between(next: NaiveDateTime, now: NaiveDateTime) -> Self {
        let seconds = (next - now).num_seconds().max(0);
        // a partially elapsed minute still counts as one
        let total_minutes = (seconds + 59) / 60;
        Self {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// `"Alarm in 7 hours 1 minute"`, the hour part is left out when zero.
#[must_use]
pub fn countdown_text(next: NaiveDateTime, now: NaiveDateTime) -> String {
    let Countdown { hours, minutes } = Countdown::between(next, now);
    if hours == 0 {
        format!("Alarm in {}", plural(minutes, "minute"))
    } else {
        format!(
            "Alarm in {} {}",
            plural(hours, "hour"),
            plural(minutes, "minute")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    // 2024-01-01 is a Monday
    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_later_today() {
        let now = at(3, 6, 59, 59);
        let next = next_occurrence(time(7, 0), &DaySet::every_day(), now);
        assert_eq!(next, at(3, 7, 0, 0));
        assert_eq!(countdown_text(next, now), "Alarm in 1 minute");
    }

    #[test]
    fn test_exact_time_rolls_to_tomorrow() {
        let now = at(3, 7, 0, 0);
        let next = next_occurrence(time(7, 0), &DaySet::every_day(), now);
        assert_eq!(next, at(4, 7, 0, 0));
    }

    #[test]
    fn test_weekday_only_alarm_waits_for_next_week() {
        // Tuesday 08:00, alarm on Mondays only
        let now = at(2, 8, 0, 0);
        let days = DaySet::new([1]).unwrap();
        let next = next_occurrence(time(7, 0), &days, now);
        assert_eq!(next, at(8, 7, 0, 0));
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn test_same_weekday_after_time_passed() {
        // Monday 08:00, alarm Mondays 07:00 -> a week later
        let now = at(1, 8, 0, 0);
        let next = next_occurrence(time(7, 0), &DaySet::new([1]).unwrap(), now);
        assert_eq!(next, at(8, 7, 0, 0));
    }

    #[test]
    fn test_countdown_pluralization() {
        let now = at(1, 0, 0, 0);
        assert_eq!(countdown_text(at(1, 1, 1, 0), now), "Alarm in 1 hour 1 minute");
        assert_eq!(countdown_text(at(1, 2, 0, 0), now), "Alarm in 2 hours 0 minutes");
        assert_eq!(countdown_text(at(1, 0, 5, 0), now), "Alarm in 5 minutes");
    }

    #[test]
    fn test_countdown_rounds_up_partial_minutes() {
        let now = at(1, 6, 0, 30);
        assert_eq!(
            Countdown::between(at(1, 7, 0, 0), now),
            Countdown {
                hours: 1,
                minutes: 0
            }
        );
    }
}
