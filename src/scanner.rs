//! Decides which alarm, if any, starts ringing on a scan tick.
//!
//! ```text
//! Idle --(snooze expired | scheduled minute matched)--> Ringing(id)
//! Ringing(id) --(dismiss | snooze | cancel)--> Idle
//! ```

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, warn};

use crate::alarm::{Alarm, AlarmId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RingState {
    #[default]
    Idle,
    Ringing(AlarmId),
}

impl RingState {
    #[must_use]
    pub const fn ringing(self) -> Option<AlarmId> {
        match self {
            Self::Idle => None,
            Self::Ringing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// the alarm's time of day came around
    Scheduled,
    /// a snooze ran out
    SnoozeExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub alarm_id: AlarmId,
    pub reason: TriggerReason,
}

/// Remembers which alarms already fired in the current minute.
#[derive(Debug, Default)]
pub struct TriggerScanner {
    /// date and minute the `fired` keys belong to
    current_minute: Option<(NaiveDate, u32, u32)>,
    fired: HashSet<String>,
}

fn minute_key(now: NaiveDateTime) -> String {
    now.format("%H:%M").to_string()
}

fn minute_of(now: NaiveDateTime) -> (NaiveDate, u32, u32) {
    (now.date(), now.hour(), now.minute())
}

impl TriggerScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the first qualifying alarm in collection order and marks it as
    /// fired for this minute. Only call while nothing is ringing.
    pub fn scan(&mut self, alarms: &[Alarm], now: NaiveDateTime) -> Option<Trigger> {
        let minute = minute_key(now);
        if self.current_minute != Some(minute_of(now)) {
            // keys from earlier minutes can never match again
            self.fired.clear();
            self.current_minute = Some(minute_of(now));
        }

        let trigger = alarms
            .iter()
            .filter(|alarm| alarm.enabled)
            .filter(|alarm| match alarm.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("skipping alarm {} during scan: {e}", alarm.id);
                    false
                }
            })
            .find_map(|alarm| self.qualifies(alarm, &minute, now))?;

        self.fired.insert(dedup_key(trigger.alarm_id, &minute));
        debug!("alarm {} triggered ({:?})", trigger.alarm_id, trigger.reason);
        Some(trigger)
    }

    fn qualifies(&self, alarm: &Alarm, minute: &str, now: NaiveDateTime) -> Option<Trigger> {
        if alarm.snoozed_until.is_some_and(|until| now >= until) {
            return Some(Trigger {
                alarm_id: alarm.id,
                reason: TriggerReason::SnoozeExpired,
            });
        }
        let scheduled = alarm.time_key() == minute
            && !self.fired.contains(&dedup_key(alarm.id, minute))
            && alarm.days.includes(now.date());
        scheduled.then_some(Trigger {
            alarm_id: alarm.id,
            reason: TriggerReason::Scheduled,
        })
    }
}

fn dedup_key(id: AlarmId, minute: &str) -> String {
    format!("{id}-{minute}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{DaySet, NewAlarm};
    use chrono::NaiveTime;

    // 2024-01-01 is a Monday
    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn alarm(h: u32, m: u32) -> Alarm {
        NewAlarm::at(NaiveTime::from_hms_opt(h, m, 0).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_fires_once_per_minute() {
        let alarms = vec![alarm(7, 0)];
        let mut scanner = TriggerScanner::new();
        assert_eq!(scanner.scan(&alarms, at(1, 6, 59, 59)), None);

        let trigger = scanner.scan(&alarms, at(1, 7, 0, 0)).unwrap();
        assert_eq!(trigger.alarm_id, alarms[0].id);
        assert_eq!(trigger.reason, TriggerReason::Scheduled);
        assert!(scanner.fired.contains(&dedup_key(alarms[0].id, "07:00")));

        assert_eq!(scanner.scan(&alarms, at(1, 7, 0, 1)), None);
        assert_eq!(scanner.scan(&alarms, at(1, 7, 0, 59)), None);
        assert_eq!(scanner.scan(&alarms, at(1, 7, 1, 0)), None);
    }

    #[test]
    fn test_fires_again_next_day() {
        let alarms = vec![alarm(7, 0)];
        let mut scanner = TriggerScanner::new();
        assert!(scanner.scan(&alarms, at(1, 7, 0, 0)).is_some());
        assert!(scanner.scan(&alarms, at(2, 7, 0, 0)).is_some());
    }

    #[test]
    fn test_disabled_alarm_never_fires() {
        let mut disabled = alarm(7, 0);
        disabled.enabled = false;
        let mut scanner = TriggerScanner::new();
        assert_eq!(scanner.scan(&[disabled], at(1, 7, 0, 0)), None);
    }

    #[test]
    fn test_weekday_filter() {
        let mut weekend = alarm(9, 0);
        weekend.days = DaySet::new([0, 6]).unwrap();
        let alarms = vec![weekend];
        let mut scanner = TriggerScanner::new();
        // Monday
        assert_eq!(scanner.scan(&alarms, at(1, 9, 0, 0)), None);
        // Saturday
        assert!(scanner.scan(&alarms, at(6, 9, 0, 0)).is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let alarms = vec![alarm(7, 0), alarm(7, 0)];
        let mut scanner = TriggerScanner::new();
        let first = scanner.scan(&alarms, at(1, 7, 0, 0)).unwrap();
        assert_eq!(first.alarm_id, alarms[0].id);
        // the second one is still due within the same minute
        let second = scanner.scan(&alarms, at(1, 7, 0, 5)).unwrap();
        assert_eq!(second.alarm_id, alarms[1].id);
    }

    #[test]
    fn test_snooze_expiry_triggers() {
        let mut snoozed = alarm(7, 0);
        snoozed.snoozed_until = Some(at(1, 7, 5, 0));
        snoozed.snooze_count = 1;
        let alarms = vec![snoozed];
        let mut scanner = TriggerScanner::new();
        assert_eq!(scanner.scan(&alarms, at(1, 7, 4, 59)), None);
        let trigger = scanner.scan(&alarms, at(1, 7, 5, 0)).unwrap();
        assert_eq!(trigger.reason, TriggerReason::SnoozeExpired);
    }

    #[test]
    fn test_invalid_alarm_is_skipped() {
        let mut broken = alarm(7, 0);
        broken.task_types.clear();
        let fine = alarm(7, 0);
        let alarms = vec![broken, fine];
        let mut scanner = TriggerScanner::new();
        let trigger = scanner.scan(&alarms, at(1, 7, 0, 0)).unwrap();
        assert_eq!(trigger.alarm_id, alarms[1].id);
    }
}
