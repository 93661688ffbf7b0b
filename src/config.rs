use std::{collections::HashMap, fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    alarm::DEFAULT_SOUND,
    error::{ConfigError, Result},
};

const APP_NAME: &str = "wakeup_clock";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default = "default_sounds")]
    pub sounds: HashMap<String, Sound>,
    #[serde(default = "default_sound_name")]
    pub default_sound: String,
    #[serde(default)]
    pub volume: VolumeRampConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    /// used for the weather shown after an alarm is dismissed
    #[serde(default)]
    pub location: Option<Location>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            sounds: default_sounds(),
            default_sound: default_sound_name(),
            volume: VolumeRampConfig::default(),
            reminder: ReminderConfig::default(),
            speech: SpeechConfig::default(),
            location: None,
        }
    }
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_sound_name() -> String {
    DEFAULT_SOUND.to_string()
}

fn default_sounds() -> HashMap<String, Sound> {
    [
        Sound::default_alarm(),
        Sound::birds(),
        Sound::crickets(),
        Sound::rain(),
        Sound::piano(),
    ]
    .into_iter()
    .map(|sound| (sound.id.clone(), sound))
    .collect()
}

/// Alarms start quiet and get louder until they hit `cap`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct VolumeRampConfig {
    pub start: f32,
    pub step: f32,
    pub cap: f32,
    pub interval_ms: u64,
}

impl Default for VolumeRampConfig {
    fn default() -> Self {
        Self {
            start: 0.1,
            step: 0.02,
            cap: 0.7,
            interval_ms: 500,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    #[serde(default = "always_true")]
    pub enabled: bool,
    /// minutes before the alarm the reminder shows up
    pub lead_minutes: u32,
    pub sleep_hours: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lead_minutes: 60,
            sleep_hours: 8,
        }
    }
}

/// External program used to turn speech alarms into audio.
/// `{output}`, `{message}` and `{voice}` are replaced in `args`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            program: "espeak".to_string(),
            args: ["-w", "{output}", "-v", "{voice}", "{message}"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: PathBuf) -> Result<Self> {
        let config = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(toml::from_str(&config).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })?)
    }

    /// Loads the config file, falling back to the defaults when there is none.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: PathBuf) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let config = toml::to_string(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(&path, config).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
        directories::ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoProjectDirs("home"))
    }

    pub fn config_path() -> Result<PathBuf> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// Directory holding the persisted alarms and reminder markers.
    pub fn data_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    #[must_use]
    pub fn sounds_path() -> PathBuf {
        Self::project_dirs().map_or_else(
            |_| PathBuf::from("sounds"),
            |dirs| dirs.data_dir().join("sounds"),
        )
    }

    pub fn is_config_present() -> Result<bool> {
        Ok(Self::config_path()?.exists())
    }

    /// Looks up a built-in sound, falling back to the default one.
    #[must_use]
    pub fn sound(&self, id: &str) -> Sound {
        self.sounds
            .get(id)
            .or_else(|| self.sounds.get(&self.default_sound))
            .cloned()
            .unwrap_or_default()
    }
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Sound {
    pub id: String,
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.name,
            self.path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        )
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::default_alarm()
    }
}

impl Sound {
    #[must_use]
    pub fn new(id: &str, name: &str, file: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            path: Config::sounds_path().join(file),
        }
    }

    #[must_use]
    pub fn default_alarm() -> Self {
        Self::new(DEFAULT_SOUND, "Default Alarm", "default.wav")
    }

    #[must_use]
    pub fn birds() -> Self {
        Self::new("birds", "Birds Chirping", "birds_alarm.wav")
    }

    #[must_use]
    pub fn crickets() -> Self {
        Self::new("crickets", "Crickets", "crickets.wav")
    }

    #[must_use]
    pub fn rain() -> Self {
        Self::new("rain", "Rain Sound", "rain.wav")
    }

    #[must_use]
    pub fn piano() -> Self {
        Self::new("piano", "Piano Melody", "piano.mp3")
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let config = Config::default();
        for id in ["default", "birds", "crickets", "rain", "piano"] {
            assert!(config.sounds.contains_key(id), "missing {id}");
        }
        assert_eq!(config.sound("piano").name(), "Piano Melody");
    }

    #[test]
    fn test_unknown_sound_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(config.sound("trumpet").id, "default");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.location = Some(Location {
            latitude: 52.5,
            longitude: 13.4,
        });
        config.reminder.lead_minutes = 45;
        config.save(path.clone()).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.reminder.lead_minutes, 45);
        assert_eq!(loaded.location, config.location);
        assert_eq!(loaded.sounds.len(), 5);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("time_format = \"%I:%M %p\"").unwrap();
        assert_eq!(config.time_format, "%I:%M %p");
        assert_eq!(config.default_sound, "default");
        assert_eq!(config.volume, VolumeRampConfig::default());
        assert!(config.location.is_none());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path().join("absent.toml")).is_err());
    }
}
