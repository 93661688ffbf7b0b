//! The alarm store owns the canonical alarm collection.
//!
//! Every mutation goes through here: it re-reads the persisted record, applies
//! the change to a copy and rewrites the whole record. The in-memory collection
//! only changes once the write went through. Nothing else holds a mutable
//! reference to an [`Alarm`].

use log::{error, info, warn};
use serde::Serialize;

use crate::{
    alarm::{Alarm, AlarmId, AlarmPatch, NewAlarm},
    error::{ClockError, Result, StorageError},
    storage::KeyValueStore,
};

/// Key the whole collection is stored under.
pub const ALARMS_KEY: &str = "alarms";

#[derive(Serialize)]
struct AlarmsDocument<'a> {
    alarms: &'a [Alarm],
}

#[derive(Debug)]
pub struct AlarmStore<S> {
    backend: S,
    alarms: Vec<Alarm>,
}

impl<S: KeyValueStore> AlarmStore<S> {
    /// Reads the collection once. Unreadable data never fails the load: the
    /// store starts empty (or without the broken records) and logs why.
    pub fn open(backend: S) -> Self {
        let alarms = load(&backend);
        info!("loaded {} alarm(s)", alarms.len());
        Self { backend, alarms }
    }

    /// Picks up changes another process wrote to the backend. A backend that
    /// can't be read keeps the collection as it is.
    pub fn reload(&mut self) {
        match self.backend.get(ALARMS_KEY) {
            Ok(Some(raw)) => self.alarms = parse_alarms(&raw),
            Ok(None) => self.alarms.clear(),
            Err(e) => warn!("couldn't reload stored alarms, keeping {}: {e}", self.alarms.len()),
        }
    }

    /// Snapshot of the collection in insertion order.
    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn create(&mut self, new_alarm: NewAlarm) -> Result<Alarm> {
        let alarm = new_alarm.build()?;
        self.reload();
        let mut alarms = self.alarms.clone();
        alarms.push(alarm.clone());
        self.commit(alarms)?;
        info!("created alarm {} at {}", alarm.id, alarm.time_key());
        Ok(alarm)
    }

    pub fn update(&mut self, id: AlarmId, patch: AlarmPatch) -> Result<Alarm> {
        self.reload();
        let index = self.index_of(id)?;
        let edited = patch.apply(&self.alarms[index])?;
        let mut alarms = self.alarms.clone();
        alarms[index] = edited.clone();
        self.commit(alarms)?;
        Ok(edited)
    }

    /// Hard delete, returns the removed alarm.
    pub fn delete(&mut self, id: AlarmId) -> Result<Alarm> {
        self.reload();
        let index = self.index_of(id)?;
        let mut alarms = self.alarms.clone();
        let removed = alarms.remove(index);
        self.commit(alarms)?;
        info!("deleted alarm {id}");
        Ok(removed)
    }

    /// Flips `enabled` and returns the new value.
    pub fn toggle(&mut self, id: AlarmId) -> Result<bool> {
        self.modify(id, |alarm| {
            alarm.enabled = !alarm.enabled;
            Ok(alarm.enabled)
        })
    }

    /// Runs `f` against the stored alarm and persists the result.
    /// If `f` fails, leaves the alarm invalid or the write fails, nothing changes.
    pub(crate) fn modify<T>(
        &mut self,
        id: AlarmId,
        f: impl FnOnce(&mut Alarm) -> Result<T>,
    ) -> Result<T> {
        self.reload();
        let index = self.index_of(id)?;
        let mut alarm = self.alarms[index].clone();
        let out = f(&mut alarm)?;
        alarm.validate()?;
        let mut alarms = self.alarms.clone();
        alarms[index] = alarm;
        self.commit(alarms)?;
        Ok(out)
    }

    pub(crate) fn backend(&self) -> &S {
        &self.backend
    }

    pub(crate) fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    fn index_of(&self, id: AlarmId) -> Result<usize> {
        self.alarms
            .iter()
            .position(|alarm| alarm.id == id)
            .ok_or(ClockError::AlarmNotFound(id))
    }

    /// Writes `alarms` and only then makes them the current collection.
    fn commit(&mut self, alarms: Vec<Alarm>) -> Result<()> {
        let document = toml::to_string(&AlarmsDocument { alarms: &alarms })
            .map_err(StorageError::from)?;
        self.backend.set(ALARMS_KEY, &document)?;
        self.alarms = alarms;
        Ok(())
    }
}

fn load(backend: &impl KeyValueStore) -> Vec<Alarm> {
    match backend.get(ALARMS_KEY) {
        Ok(Some(raw)) => parse_alarms(&raw),
        Ok(None) => Vec::new(),
        Err(e) => {
            error!("couldn't read stored alarms, starting empty: {e}");
            Vec::new()
        }
    }
}

/// Parses the stored document record by record so one bad alarm doesn't take
/// the others down with it.
fn parse_alarms(raw: &str) -> Vec<Alarm> {
    let mut table = match raw.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => {
            error!("stored alarms are corrupt, starting empty: {e}");
            return Vec::new();
        }
    };
    let Some(toml::Value::Array(records)) = table.remove(ALARMS_KEY) else {
        warn!("stored alarms have no '{ALARMS_KEY}' list, starting empty");
        return Vec::new();
    };
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match read_record(record) {
            Ok(alarm) => match alarm.validate() {
                Ok(()) => Some(alarm),
                Err(e) => {
                    warn!("skipping stored alarm #{i}: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("skipping unreadable stored alarm #{i}: {e}");
                None
            }
        })
        .collect()
}

/// Reads one `[[alarms]]` entry back through the document deserializer, which
/// is the one that hands TOML times to `toml_datetime_compat`.
fn read_record(record: toml::Value) -> std::result::Result<Alarm, String> {
    let toml::Value::Table(record) = record else {
        return Err("not a table".to_string());
    };
    let text = toml::to_string(&record).map_err(|e| e.to_string())?;
    toml::from_str(&text).map_err(|e| e.to_string())
}
