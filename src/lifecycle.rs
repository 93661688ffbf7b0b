//! What happens to an alarm when its ring cycle is resolved.
//!
//! Dismissing updates the streak, adapts the task difficulty and records the
//! completion. Snoozing only pushes the alarm back.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::{
    alarm::{Alarm, Difficulty, HistoryEntry, HISTORY_LIMIT},
    error::{ClockError, Result},
};

/// Solved faster than this (seconds) with few attempts makes tasks harder.
pub const FAST_COMPLETION_SECS: u32 = 20;
pub const FAST_MAX_ATTEMPTS: u32 = 2;
/// Slower than this (seconds) or with too many attempts makes tasks easier.
pub const SLOW_COMPLETION_SECS: u32 = 90;
pub const SLOW_MIN_ATTEMPTS: u32 = 5;

/// How the wake-up tasks went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStats {
    pub completion_time_seconds: u32,
    pub attempts: u32,
}

/// Streak after completing on `today`, given the previous completion date.
#[must_use]
pub fn next_streak(streak: u32, last_completed: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_completed {
        None => streak.saturating_add(1),
        Some(last) if Some(last) == today.pred_opt() => streak.saturating_add(1),
        Some(last) if last == today => streak,
        // a day was skipped
        Some(_) => 1,
    }
}

/// Moves the difficulty at most one level based on how the tasks went.
#[must_use]
pub const fn adjust_difficulty(current: Difficulty, stats: CompletionStats) -> Difficulty {
    if stats.completion_time_seconds < FAST_COMPLETION_SECS && stats.attempts <= FAST_MAX_ATTEMPTS
    {
        current.harder()
    } else if stats.completion_time_seconds > SLOW_COMPLETION_SECS
        || stats.attempts > SLOW_MIN_ATTEMPTS
    {
        current.easier()
    } else {
        current
    }
}

/// Applies a successful dismissal to `alarm`.
///
/// A history entry is only written when `stats` are known; it records the
/// difficulty the tasks were solved at, before adjustment.
pub fn dismiss(alarm: &mut Alarm, stats: Option<CompletionStats>, now: NaiveDateTime) {
    let today = now.date();
    alarm.streak = next_streak(alarm.streak, alarm.last_completed, today);

    if let Some(stats) = stats {
        alarm.history.push(HistoryEntry {
            date: now,
            completion_time: stats.completion_time_seconds,
            attempts: stats.attempts,
            snoozes_used: alarm.snooze_count,
            difficulty: alarm.task_difficulty,
        });
        let overflow = alarm.history.len().saturating_sub(HISTORY_LIMIT);
        alarm.history.drain(..overflow);
        alarm.task_difficulty = adjust_difficulty(alarm.task_difficulty, stats);
    }

    alarm.snoozed_until = None;
    alarm.snooze_count = 0;
    alarm.last_completed = Some(today);
}

/// Pushes the alarm back by its snooze duration.
///
/// Refuses once `snooze_limit` snoozes were used in this ring cycle.
pub fn snooze(alarm: &mut Alarm, now: NaiveDateTime) -> Result<NaiveDateTime> {
    if !alarm.can_snooze() {
        return Err(ClockError::SnoozeLimitExceeded {
            id: alarm.id,
            limit: alarm.snooze_limit,
        });
    }
    let until = now + Duration::minutes(i64::from(alarm.snooze_duration));
    alarm.snoozed_until = Some(until);
    alarm.snooze_count += 1;
    Ok(until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::NewAlarm;
    use chrono::NaiveTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    fn alarm(difficulty: Difficulty) -> Alarm {
        NewAlarm {
            task_difficulty: Some(difficulty),
            ..NewAlarm::at(NaiveTime::from_hms_opt(7, 0, 0).unwrap())
        }
        .build()
        .unwrap()
    }

    fn stats(secs: u32, attempts: u32) -> CompletionStats {
        CompletionStats {
            completion_time_seconds: secs,
            attempts,
        }
    }

    #[test]
    fn test_streak_rules() {
        assert_eq!(next_streak(0, None, day(5)), 1);
        assert_eq!(next_streak(4, Some(day(4)), day(5)), 5);
        assert_eq!(next_streak(4, Some(day(5)), day(5)), 4);
        assert_eq!(next_streak(4, Some(day(2)), day(5)), 1);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(next_streak(9, Some(jan31), feb1), 10);
    }

    #[test]
    fn test_fast_completion_makes_it_harder() {
        let mut medium = alarm(Difficulty::Medium);
        dismiss(&mut medium, Some(stats(15, 1)), at(1, 7, 1));
        assert_eq!(medium.task_difficulty, Difficulty::Hard);
        // the history keeps the level it was solved at
        assert_eq!(medium.history[0].difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_slow_completion_at_floor_stays_easy() {
        let mut easy = alarm(Difficulty::Easy);
        dismiss(&mut easy, Some(stats(120, 0)), at(1, 7, 3));
        assert_eq!(easy.task_difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_difficulty_adjustment_bands() {
        assert_eq!(adjust_difficulty(Difficulty::Hard, stats(10, 2)), Difficulty::Hard);
        assert_eq!(adjust_difficulty(Difficulty::Easy, stats(10, 3)), Difficulty::Easy);
        assert_eq!(adjust_difficulty(Difficulty::Hard, stats(30, 6)), Difficulty::Medium);
        assert_eq!(adjust_difficulty(Difficulty::Medium, stats(91, 1)), Difficulty::Easy);
        assert_eq!(adjust_difficulty(Difficulty::Medium, stats(20, 2)), Difficulty::Medium);
        assert_eq!(adjust_difficulty(Difficulty::Medium, stats(90, 5)), Difficulty::Medium);
    }

    #[test]
    fn test_dismiss_without_stats_keeps_difficulty_and_history() {
        let mut alarm = alarm(Difficulty::Medium);
        alarm.snooze_count = 2;
        alarm.snoozed_until = Some(at(1, 7, 10));
        dismiss(&mut alarm, None, at(1, 7, 12));
        assert_eq!(alarm.task_difficulty, Difficulty::Medium);
        assert!(alarm.history.is_empty());
        assert_eq!(alarm.snooze_count, 0);
        assert_eq!(alarm.snoozed_until, None);
        assert_eq!(alarm.last_completed, Some(day(1)));
        assert_eq!(alarm.streak, 1);
    }

    #[test]
    fn test_history_is_capped() {
        let mut alarm = alarm(Difficulty::Medium);
        for i in 0..40 {
            dismiss(&mut alarm, Some(stats(50 + i, 3)), at(1, 7, 0));
        }
        assert_eq!(alarm.history.len(), HISTORY_LIMIT);
        // oldest dropped first, newest last
        assert_eq!(alarm.history[0].completion_time, 60);
        assert_eq!(alarm.history[HISTORY_LIMIT - 1].completion_time, 89);
    }

    #[test]
    fn test_snoozes_used_recorded() {
        let mut alarm = alarm(Difficulty::Medium);
        snooze(&mut alarm, at(1, 7, 0)).unwrap();
        dismiss(&mut alarm, Some(stats(40, 3)), at(1, 7, 6));
        assert_eq!(alarm.history[0].snoozes_used, 1);
    }

    #[test]
    fn test_snooze_moves_alarm_back() {
        let mut alarm = alarm(Difficulty::Medium);
        let until = snooze(&mut alarm, at(1, 7, 0)).unwrap();
        assert_eq!(until, at(1, 7, 5));
        assert_eq!(alarm.snoozed_until, Some(until));
        assert_eq!(alarm.snooze_count, 1);
        assert_eq!(alarm.streak, 0);
        assert!(alarm.history.is_empty());
    }

    #[test]
    fn test_snooze_limit_is_enforced() {
        let mut alarm = alarm(Difficulty::Medium);
        alarm.snooze_limit = 1;
        snooze(&mut alarm, at(1, 7, 0)).unwrap();
        let err = snooze(&mut alarm, at(1, 7, 5)).unwrap_err();
        assert!(matches!(err, ClockError::SnoozeLimitExceeded { limit: 1, .. }));
        assert_eq!(alarm.snooze_count, 1);
    }
}
