//! Pre-sleep reminders: a nudge to go to bed a while before an alarm.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::{
    alarm::{Alarm, AlarmId},
    config::ReminderConfig,
    error::StorageError,
    storage::KeyValueStore,
};

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub alarm_id: AlarmId,
    pub title: String,
    pub message: String,
}

fn marker_key(id: AlarmId) -> String {
    format!("reminder-{id}")
}

fn minutes_of_day(hour: u32, minute: u32) -> i64 {
    i64::from(hour * 60 + minute)
}

/// Distance in minutes between two times of day, going around midnight.
fn circular_distance(a: i64, b: i64) -> i64 {
    let diff = (a - b).rem_euclid(MINUTES_PER_DAY);
    diff.min(MINUTES_PER_DAY - diff)
}

fn sent_on(store: &impl KeyValueStore, id: AlarmId) -> Option<NaiveDate> {
    match store.get(&marker_key(id)) {
        Ok(value) => value.and_then(|date| date.trim().parse().ok()),
        Err(e) => {
            log::warn!("couldn't read reminder marker for alarm {id}: {e}");
            None
        }
    }
}

/// Reminders that should show up at `now`. Reading only; call [`mark_sent`]
/// for each one that was shown.
pub fn due(
    alarms: &[Alarm],
    store: &impl KeyValueStore,
    settings: &ReminderConfig,
    now: NaiveDateTime,
) -> Vec<Reminder> {
    if !settings.enabled {
        return Vec::new();
    }
    let current = minutes_of_day(now.hour(), now.minute());
    let today = now.date();
    alarms
        .iter()
        .filter(|alarm| alarm.enabled)
        .filter(|alarm| {
            let reminder_at = minutes_of_day(alarm.time.hour(), alarm.time.minute())
                - i64::from(settings.lead_minutes);
            circular_distance(current, reminder_at) <= 1
        })
        .filter(|alarm| sent_on(store, alarm.id) != Some(today))
        .map(|alarm| Reminder {
            alarm_id: alarm.id,
            title: "Time to Sleep Soon".to_string(),
            message: reminder_message(alarm, settings.sleep_hours),
        })
        .collect()
}

/// Records that the reminder for `id` went out today.
pub fn mark_sent(
    store: &mut impl KeyValueStore,
    id: AlarmId,
    now: NaiveDateTime,
) -> Result<(), StorageError> {
    store.set(&marker_key(id), &now.date().to_string())
}

/// Drops the marker of a deleted alarm.
pub fn forget(store: &mut impl KeyValueStore, id: AlarmId) -> Result<(), StorageError> {
    store.remove(&marker_key(id))
}

fn reminder_message(alarm: &Alarm, sleep_hours: u32) -> String {
    let mut message = format!(
        "Sleep now to get {sleep_hours} hours of rest before your {} alarm",
        alarm.time_key()
    );
    if !alarm.label.is_empty() {
        message.push_str(" - ");
        message.push_str(&alarm.label);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alarm::NewAlarm, storage::MemoryStore};
    use chrono::NaiveTime;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn alarm(h: u32, m: u32, label: &str) -> Alarm {
        NewAlarm {
            label: Some(label.to_string()),
            ..NewAlarm::at(NaiveTime::from_hms_opt(h, m, 0).unwrap())
        }
        .build()
        .unwrap()
    }

    #[test]
    fn test_reminder_an_hour_before() {
        let alarms = vec![alarm(7, 0, "gym")];
        let store = MemoryStore::new();
        let settings = ReminderConfig::default();
        assert!(due(&alarms, &store, &settings, at(1, 5, 58)).is_empty());
        let reminders = due(&alarms, &store, &settings, at(1, 5, 59));
        assert_eq!(reminders.len(), 1);
        assert_eq!(
            reminders[0].message,
            "Sleep now to get 8 hours of rest before your 07:00 alarm - gym"
        );
        assert_eq!(due(&alarms, &store, &settings, at(1, 6, 1)).len(), 1);
    }

    #[test]
    fn test_reminder_once_per_day() {
        let alarms = vec![alarm(7, 0, "")];
        let mut store = MemoryStore::new();
        let settings = ReminderConfig::default();
        let reminders = due(&alarms, &store, &settings, at(1, 6, 0));
        assert_eq!(
            reminders[0].message,
            "Sleep now to get 8 hours of rest before your 07:00 alarm"
        );
        mark_sent(&mut store, alarms[0].id, at(1, 6, 0)).unwrap();
        assert!(due(&alarms, &store, &settings, at(1, 6, 1)).is_empty());
        assert_eq!(due(&alarms, &store, &settings, at(2, 6, 0)).len(), 1);
    }

    #[test]
    fn test_forget_clears_the_marker() {
        let alarms = vec![alarm(7, 0, "")];
        let mut store = MemoryStore::new();
        let settings = ReminderConfig::default();
        mark_sent(&mut store, alarms[0].id, at(1, 6, 0)).unwrap();
        forget(&mut store, alarms[0].id).unwrap();
        assert_eq!(store.get(&marker_key(alarms[0].id)).unwrap(), None);
        assert_eq!(due(&alarms, &store, &settings, at(1, 6, 1)).len(), 1);
    }

    #[test]
    fn test_reminder_wraps_around_midnight() {
        let alarms = vec![alarm(0, 30, "")];
        let store = MemoryStore::new();
        let settings = ReminderConfig::default();
        assert_eq!(due(&alarms, &store, &settings, at(1, 23, 30)).len(), 1);
    }

    #[test]
    fn test_disabled_alarms_and_settings() {
        let mut off = alarm(7, 0, "");
        off.enabled = false;
        let store = MemoryStore::new();
        assert!(due(&[off], &store, &ReminderConfig::default(), at(1, 6, 0)).is_empty());

        let settings = ReminderConfig {
            enabled: false,
            ..ReminderConfig::default()
        };
        assert!(due(&[alarm(7, 0, "")], &store, &settings, at(1, 6, 0)).is_empty());
    }
}
