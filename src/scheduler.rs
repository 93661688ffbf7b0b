//! The scheduler ties the store, the trigger scanner and the lifecycle rules
//! together behind a single `tick(now)` entry point.
//!
//! It does not use internal threads or timers. The host calls [`Scheduler::tick`]
//! about once a second and [`Scheduler::due_reminders`] about once a minute.
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = Scheduler::new(FileStore::new(dir));
//! loop {
//!     if let Some(Event::AlarmRinging { alarm_id, .. }) = scheduler.tick(now()) {
//!         // show the wake-up tasks, then
//!         scheduler.dismiss(Some(stats), now())?;
//!     }
//! }
//! ```

use chrono::NaiveDateTime;
use log::{info, warn};

use crate::{
    alarm::{Alarm, AlarmId, AlarmPatch, NewAlarm},
    error::{ClockError, Result},
    lifecycle::{self, CompletionStats},
    reminder::{self, Reminder},
    scanner::{RingState, TriggerReason, TriggerScanner},
    storage::KeyValueStore,
    store::AlarmStore,
};

/// What a tick or a lifecycle operation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AlarmRinging {
        alarm_id: AlarmId,
        reason: TriggerReason,
    },
    /// the ringing alarm was deleted, disabled or edited
    RingCancelled { alarm_id: AlarmId },
    AlarmDismissed { alarm_id: AlarmId, streak: u32 },
    AlarmSnoozed {
        alarm_id: AlarmId,
        until: NaiveDateTime,
    },
}

#[derive(Debug)]
pub struct Scheduler<S> {
    store: AlarmStore<S>,
    scanner: TriggerScanner,
    state: RingState,
}

impl<S: KeyValueStore> Scheduler<S> {
    pub fn new(backend: S) -> Self {
        Self {
            store: AlarmStore::open(backend),
            scanner: TriggerScanner::new(),
            state: RingState::Idle,
        }
    }


    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        self.store.alarms()
    }

    #[must_use]
    pub fn alarm(&self, id: AlarmId) -> Option<&Alarm> {
        self.store.get(id)
    }

    #[must_use]
    pub const fn state(&self) -> RingState {
        self.state
    }

    /// The alarm whose ring cycle is active, if any.
    #[must_use]
    pub fn ringing(&self) -> Option<&Alarm> {
        self.state.ringing().and_then(|id| self.store.get(id))
    }

    /// Whether the ringing alarm may still be snoozed.
    #[must_use]
    pub fn can_snooze(&self) -> bool {
        self.ringing().is_some_and(Alarm::can_snooze)
    }


    /// Re-reads the alarms from storage so edits made by another process
    /// show up. A ringing alarm that went away is cancelled on the next tick.
    pub fn reload(&mut self) {
        self.store.reload();
    }

    /// One scan step. At most one alarm starts ringing per tick and none while
    /// another one is still ringing.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<Event> {
        if let RingState::Ringing(id) = self.state {
            let still_valid = self.store.get(id).is_some_and(|alarm| alarm.enabled);
            if still_valid {
                return None;
            }
            warn!("ringing alarm {id} went away, ending its ring cycle");
            self.state = RingState::Idle;
            return Some(Event::RingCancelled { alarm_id: id });
        }

        let trigger = self.scanner.scan(self.store.alarms(), now)?;
        self.state = RingState::Ringing(trigger.alarm_id);
        info!("alarm {} is ringing ({:?})", trigger.alarm_id, trigger.reason);
        Some(Event::AlarmRinging {
            alarm_id: trigger.alarm_id,
            reason: trigger.reason,
        })
    }


    /// Ends the ring cycle after the wake-up tasks were solved.
    pub fn dismiss(
        &mut self,
        stats: Option<CompletionStats>,
        now: NaiveDateTime,
    ) -> Result<Event> {
        let id = self.state.ringing().ok_or(ClockError::NotRinging)?;
        let streak = self
            .store
            .modify(id, |alarm| {
                lifecycle::dismiss(alarm, stats, now);
                Ok(alarm.streak)
            })
            .inspect_err(|e| self.end_if_gone(id, e))?;
        self.state = RingState::Idle;
        info!("alarm {id} dismissed, streak {streak}");
        Ok(Event::AlarmDismissed {
            alarm_id: id,
            streak,
        })
    }

    /// Ends the ring cycle and schedules the alarm to ring again later.
    /// The alarm keeps ringing when the snooze limit is already used up.
    pub fn snooze(&mut self, now: NaiveDateTime) -> Result<Event> {
        let id = self.state.ringing().ok_or(ClockError::NotRinging)?;
        let until = self
            .store
            .modify(id, |alarm| lifecycle::snooze(alarm, now))
            .inspect_err(|e| self.end_if_gone(id, e))?;
        self.state = RingState::Idle;
        info!("alarm {id} snoozed until {until}");
        Ok(Event::AlarmSnoozed {
            alarm_id: id,
            until,
        })
    }


    pub fn add(&mut self, new_alarm: NewAlarm) -> Result<Alarm> {
        self.store.create(new_alarm)
    }

    /// Editing the ringing alarm ends its ring cycle.
    pub fn update(&mut self, id: AlarmId, patch: AlarmPatch) -> Result<(Alarm, Option<Event>)> {
        let alarm = self.store.update(id, patch)?;
        Ok((alarm, self.cancel_if_ringing(id)))
    }

    pub fn remove(&mut self, id: AlarmId) -> Result<(Alarm, Option<Event>)> {
        let alarm = self.store.delete(id)?;
        if let Err(e) = reminder::forget(self.store.backend_mut(), id) {
            warn!("couldn't drop reminder marker of alarm {id}: {e}");
        }
        Ok((alarm, self.cancel_if_ringing(id)))
    }

    /// Returns the new `enabled` value. Disabling the ringing alarm ends its ring cycle.
    pub fn toggle(&mut self, id: AlarmId) -> Result<(bool, Option<Event>)> {
        let enabled = self.store.toggle(id)?;
        let event = if enabled {
            None
        } else {
            self.cancel_if_ringing(id)
        };
        Ok((enabled, event))
    }

    /// A failed dismiss or snooze keeps the ring cycle going, unless the
    /// alarm itself is gone.
    fn end_if_gone(&mut self, id: AlarmId, error: &ClockError) {
        if matches!(error, ClockError::AlarmNotFound(_)) {
            warn!("ringing alarm {id} was removed elsewhere, ending its ring cycle");
            self.state = RingState::Idle;
        }
    }

    fn cancel_if_ringing(&mut self, id: AlarmId) -> Option<Event> {
        (self.state == RingState::Ringing(id)).then(|| {
            self.state = RingState::Idle;
            info!("ring cycle of alarm {id} cancelled");
            Event::RingCancelled { alarm_id: id }
        })
    }


    /// Pre-sleep reminders due at `now`; each alarm reminds at most once a day.
    pub fn due_reminders(
        &mut self,
        settings: &crate::config::ReminderConfig,
        now: NaiveDateTime,
    ) -> Vec<Reminder> {
        let due = reminder::due(self.store.alarms(), self.store.backend(), settings, now);
        for reminder in &due {
            if let Err(e) = reminder::mark_sent(self.store.backend_mut(), reminder.alarm_id, now) {
                warn!("couldn't record reminder for alarm {}: {e}", reminder.alarm_id);
            }
        }
        due
    }
}
