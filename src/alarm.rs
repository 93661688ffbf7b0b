//! The alarm record and the small value types it is built from.

use std::{collections::BTreeSet, fmt, path::PathBuf, str::FromStr};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// How many completions an alarm remembers.
pub const HISTORY_LIMIT: usize = 30;
pub const MAX_TASKS: usize = 3;
pub const MAX_SNOOZE_LIMIT: u8 = 3;
pub const SNOOZE_DURATIONS: [u32; 4] = [3, 5, 10, 15];

pub const DEFAULT_SOUND: &str = "default";
pub const DEFAULT_SNOOZE_DURATION: u32 = 5;
pub const DEFAULT_SNOOZE_LIMIT: u8 = 3;

pub type AlarmId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Math,
    Shake,
    Typing,
    /// anything a newer or older build wrote that we don't know about
    #[serde(other)]
    Unknown,
}

impl TaskKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Math => "math",
            Self::Shake => "shake",
            Self::Typing => "typing",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Self::Math),
            "shake" => Ok(Self::Shake),
            "typing" => Ok(Self::Typing),
            other => Err(ValidationError::TaskKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// One level harder, saturating at [`Difficulty::Hard`].
    #[must_use]
    pub const fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    /// One level easier, saturating at [`Difficulty::Easy`].
    #[must_use]
    pub const fn easier(self) -> Self {
        match self {
            Self::Hard => Self::Medium,
            Self::Medium | Self::Easy => Self::Easy,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        })
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ValidationError::Difficulty(other.to_string())),
        }
    }
}

/// Weekdays an alarm is active on, 0 = Sunday .. 6 = Saturday.
/// An empty set means every day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct DaySet {
    days: BTreeSet<u8>,
}

impl DaySet {
    #[must_use]
    pub fn every_day() -> Self {
        Self::default()
    }

    pub fn new(days: impl IntoIterator<Item = u8>) -> Result<Self, ValidationError> {
        let days = days.into_iter().collect::<BTreeSet<_>>();
        if let Some(bad) = days.iter().find(|day| **day > 6) {
            return Err(ValidationError::Weekday(*bad));
        }
        Ok(Self { days })
    }

    #[must_use]
    pub fn is_every_day(&self) -> bool {
        self.days.is_empty()
    }

    /// True when the alarm is active on the weekday of `date`.
    #[must_use]
    pub fn includes(&self, date: NaiveDate) -> bool {
        self.is_every_day() || self.days.contains(&weekday_index(date))
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.days.iter().copied()
    }
}

impl TryFrom<Vec<u8>> for DaySet {
    type Error = ValidationError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DaySet> for Vec<u8> {
    fn from(val: DaySet) -> Self {
        val.days.into_iter().collect()
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        if self.is_every_day() {
            return f.write_str("every day");
        }
        let names = self
            .iter()
            .map(|day| NAMES[usize::from(day)])
            .collect::<Vec<_>>();
        f.write_str(&names.join(", "))
    }
}

/// 0 = Sunday .. 6 = Saturday
#[must_use]
pub fn weekday_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always below 7
    date.weekday().num_days_from_sunday() as u8
}

/// Where the ringing sound comes from. Exactly one source is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoundSource {
    /// id into the built-in sound catalog
    BuiltIn { id: String },
    /// an audio file the user picked
    Uploaded { path: PathBuf },
    /// a message read out by the speech synthesizer
    Speech {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voice: Option<String>,
    },
}

impl Default for SoundSource {
    fn default() -> Self {
        Self::BuiltIn {
            id: DEFAULT_SOUND.to_string(),
        }
    }
}

impl SoundSource {
    /// The catalog id, or `"custom"` for uploads and speech.
    #[must_use]
    pub fn discriminator(&self) -> &str {
        match self {
            Self::BuiltIn { id } => id,
            Self::Uploaded { .. } | Self::Speech { .. } => "custom",
        }
    }
}

impl fmt::Display for SoundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BuiltIn { id } => write!(f, "{id}"),
            // for uploads shows the file path
            Self::Uploaded { path } => write!(f, "custom ({})", path.display()),
            Self::Speech { message, .. } => write!(f, "speech \"{message}\""),
        }
    }
}

/// One finished ring cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDateTime,
    pub completion_time: u32,
    pub attempts: u32,
    pub snoozes_used: u8,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
    #[serde(default)]
    pub label: String,
    #[serde(default = "crate::config::always_true")]
    pub enabled: bool,
    #[serde(default)]
    pub days: DaySet,
    #[serde(default)]
    pub sound: SoundSource,
    pub task_types: Vec<TaskKind>,
    #[serde(default)]
    pub task_difficulty: Difficulty,
    #[serde(default)]
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snoozed_until: Option<NaiveDateTime>,
    #[serde(default = "default_snooze_duration")]
    pub snooze_duration: u32,
    #[serde(default = "default_snooze_limit")]
    pub snooze_limit: u8,
    #[serde(default)]
    pub snooze_count: u8,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

const fn default_snooze_duration() -> u32 {
    DEFAULT_SNOOZE_DURATION
}

const fn default_snooze_limit() -> u8 {
    DEFAULT_SNOOZE_LIMIT
}

impl Alarm {
    /// Checks every invariant an alarm record has to hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_tasks(&self.task_types)?;
        validate_snooze(self.snooze_duration, self.snooze_limit)?;
        if self.snooze_count > self.snooze_limit {
            return Err(ValidationError::SnoozeCount {
                count: self.snooze_count,
                limit: self.snooze_limit,
            });
        }
        Ok(())
    }

    /// `HH:MM`, the form the trigger scanner compares against
    #[must_use]
    pub fn time_key(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            "alarm"
        } else {
            &self.label
        }
    }

    /// Whether another snooze is still allowed in this ring cycle.
    #[must_use]
    pub const fn can_snooze(&self) -> bool {
        self.snooze_count < self.snooze_limit
    }

    #[must_use]
    pub const fn snoozes_left(&self) -> u8 {
        self.snooze_limit.saturating_sub(self.snooze_count)
    }
}

pub(crate) fn validate_tasks(tasks: &[TaskKind]) -> Result<(), ValidationError> {
    if tasks.is_empty() || tasks.len() > MAX_TASKS {
        return Err(ValidationError::TaskCount(tasks.len()));
    }
    let mut seen = BTreeSet::new();
    for task in tasks {
        if !seen.insert(task) {
            return Err(ValidationError::DuplicateTask(task.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn validate_snooze(duration: u32, limit: u8) -> Result<(), ValidationError> {
    if !SNOOZE_DURATIONS.contains(&duration) {
        return Err(ValidationError::SnoozeDuration(duration));
    }
    if limit > MAX_SNOOZE_LIMIT {
        return Err(ValidationError::SnoozeLimit(limit));
    }
    Ok(())
}

/// Parses `HH:MM` (seconds are not allowed).
pub fn parse_time(input: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| ValidationError::Time(input.to_string()))
}

/// Drops seconds and sub-seconds, alarms only know hours and minutes.
#[must_use]
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Everything a user supplies when creating an alarm; omitted fields get defaults.
#[derive(Debug, Clone, Default)]
pub struct NewAlarm {
    pub time: NaiveTime,
    pub label: Option<String>,
    pub enabled: Option<bool>,
    pub days: Option<DaySet>,
    pub sound: Option<SoundSource>,
    pub task_types: Option<Vec<TaskKind>>,
    pub task_difficulty: Option<Difficulty>,
    pub snooze_duration: Option<u32>,
    pub snooze_limit: Option<u8>,
}

impl NewAlarm {
    #[must_use]
    pub fn at(time: NaiveTime) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    /// Applies defaults and assigns a fresh id.
    pub fn build(self) -> Result<Alarm, ValidationError> {
        let alarm = Alarm {
            id: Uuid::new_v4(),
            time: truncate_to_minute(self.time),
            label: self.label.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            days: self.days.unwrap_or_default(),
            sound: self.sound.unwrap_or_default(),
            task_types: self.task_types.unwrap_or_else(|| vec![TaskKind::Math]),
            task_difficulty: self.task_difficulty.unwrap_or_default(),
            streak: 0,
            last_completed: None,
            snoozed_until: None,
            snooze_duration: self.snooze_duration.unwrap_or(DEFAULT_SNOOZE_DURATION),
            snooze_limit: self.snooze_limit.unwrap_or(DEFAULT_SNOOZE_LIMIT),
            snooze_count: 0,
            history: Vec::new(),
        };
        alarm.validate()?;
        Ok(alarm)
    }
}

/// A partial edit, only the `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct AlarmPatch {
    pub time: Option<NaiveTime>,
    pub label: Option<String>,
    pub enabled: Option<bool>,
    pub days: Option<DaySet>,
    pub sound: Option<SoundSource>,
    pub task_types: Option<Vec<TaskKind>>,
    pub task_difficulty: Option<Difficulty>,
    pub snooze_duration: Option<u32>,
    pub snooze_limit: Option<u8>,
}

impl AlarmPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.time.is_none()
            && self.label.is_none()
            && self.enabled.is_none()
            && self.days.is_none()
            && self.sound.is_none()
            && self.task_types.is_none()
            && self.task_difficulty.is_none()
            && self.snooze_duration.is_none()
            && self.snooze_limit.is_none()
    }

    /// Applies the patch to a copy, so a rejected edit leaves `alarm` untouched.
    pub fn apply(self, alarm: &Alarm) -> Result<Alarm, ValidationError> {
        let mut edited = alarm.clone();
        if let Some(time) = self.time {
            edited.time = truncate_to_minute(time);
        }
        if let Some(label) = self.label {
            edited.label = label;
        }
        if let Some(enabled) = self.enabled {
            edited.enabled = enabled;
        }
        if let Some(days) = self.days {
            edited.days = days;
        }
        if let Some(sound) = self.sound {
            edited.sound = sound;
        }
        if let Some(task_types) = self.task_types {
            edited.task_types = task_types;
        }
        if let Some(difficulty) = self.task_difficulty {
            edited.task_difficulty = difficulty;
        }
        if let Some(duration) = self.snooze_duration {
            edited.snooze_duration = duration;
        }
        if let Some(limit) = self.snooze_limit {
            edited.snooze_limit = limit;
            // a lowered limit must not strand the count above it
            edited.snooze_count = edited.snooze_count.min(limit);
        }
        edited.validate()?;
        Ok(edited)
    }
}
