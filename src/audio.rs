//! Alarm sound playback.
//!
//! Sounds play on their own thread, the clock loop talks to it with
//! [`Message`]s over an mpsc channel. The thread also resolves sounds, so a
//! slow speech program never holds up the clock. Every ringing alarm starts quiet and gets
//! louder following its [`VolumeRampConfig`].

use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::Command,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{error, info, warn};
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::{
    alarm::{AlarmId, SoundSource},
    communication::{Message, MessageType},
    config::{Config, SpeechConfig, VolumeRampConfig},
    error::{ClockError, Result},
};

/// Volume after `elapsed` time of ringing.
#[must_use]
pub fn level_at(ramp: &VolumeRampConfig, elapsed: Duration) -> f32 {
    if ramp.interval_ms == 0 {
        return ramp.cap;
    }
    let steps = elapsed.as_millis() / u128::from(ramp.interval_ms);
    #[allow(clippy::cast_precision_loss)]
    let level = (steps as f32).mul_add(ramp.step, ramp.start);
    level.min(ramp.cap)
}

/// Turns a text message into an audio file.
pub trait SpeechSynthesizer {
    fn synthesize(&self, message: &str, voice: Option<&str>) -> Result<PathBuf>;
}

/// Runs an external text to speech program, `espeak` unless configured
/// otherwise.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    config: SpeechConfig,
    output_dir: PathBuf,
}

impl CommandSynthesizer {
    #[must_use]
    pub const fn new(config: SpeechConfig, output_dir: PathBuf) -> Self {
        Self { config, output_dir }
    }

    /// Program arguments with the placeholders filled in. Without a voice,
    /// a lone `{voice}` argument is dropped together with the flag before it
    /// (`-v {voice}`), and any other argument mentioning `{voice}` is dropped.
    #[must_use]
    pub fn expand_args(&self, output: &Path, message: &str, voice: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = Vec::with_capacity(self.config.args.len());
        for arg in &self.config.args {
            if voice.is_none() && arg.contains("{voice}") {
                let dangling_flag = args.last().is_some_and(|flag| flag.starts_with('-'));
                if arg == "{voice}" && dangling_flag {
                    args.pop();
                }
                continue;
            }
            args.push(
                arg.replace("{output}", &output.to_string_lossy())
                    .replace("{message}", message)
                    .replace("{voice}", voice.unwrap_or_default()),
            );
        }
        args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn synthesize(&self, message: &str, voice: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let output = self.output_dir.join("speech.wav");
        let status = Command::new(&self.config.program)
            .args(self.expand_args(&output, message, voice))
            .status()
            .map_err(|e| ClockError::Speech(format!("{}: {e}", self.config.program)))?;
        if !status.success() {
            return Err(ClockError::Speech(format!(
                "{} exited with {status}",
                self.config.program
            )));
        }
        Ok(output)
    }
}

/// Path of the audio file to play for `source`. Missing uploads and failed
/// speech fall back to the default sound.
pub fn resolve_sound(
    source: &SoundSource,
    config: &Config,
    synthesizer: &dyn SpeechSynthesizer,
) -> PathBuf {
    let fallback = || config.sound(&config.default_sound).path;
    match source {
        SoundSource::BuiltIn { id } => config.sound(id).path,
        SoundSource::Uploaded { path } if path.exists() => path.clone(),
        SoundSource::Uploaded { path } => {
            warn!("uploaded sound {} is missing, using default", path.display());
            fallback()
        }
        SoundSource::Speech { message, voice } => {
            match synthesizer.synthesize(message, voice.as_deref()) {
                Ok(path) => path,
                Err(e) => {
                    warn!("{e}, using default sound");
                    fallback()
                }
            }
        }
    }
}

struct Playing {
    sink: Sink,
    ramp: VolumeRampConfig,
    started: Instant,
}

fn start_playing(handle: &rodio::OutputStreamHandle, path: &Path) -> Option<Sink> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!("couldn't open sound {}: {e}", path.display());
            return None;
        }
    };
    let source = match Decoder::new(BufReader::new(file)) {
        Ok(source) => source.repeat_infinite(),
        Err(e) => {
            error!("couldn't decode sound {}: {e}", path.display());
            return None;
        }
    };
    match Sink::try_new(handle) {
        Ok(sink) => {
            sink.append(source);
            sink.play();
            Some(sink)
        }
        Err(e) => {
            error!("couldn't create audio sink: {e}");
            None
        }
    }
}

/// Spawns the playback thread. It runs until every sender is dropped.
#[must_use]
pub fn spawn_player(
    config: Config,
    synthesizer: Box<dyn SpeechSynthesizer + Send>,
) -> (Sender<Message>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<Message>();
    let handle = thread::spawn(move || {
        // the stream has to stay alive for as long as anything plays
        let (_stream, stream_handle) = match OutputStream::try_default() {
            Ok(stream) => stream,
            Err(e) => {
                error!("no audio output, alarms will be silent: {e}");
                while rx.recv().is_ok() {}
                return;
            }
        };
        let mut playing: HashMap<AlarmId, Playing> = HashMap::new();
        loop {
            for alarm in playing.values() {
                alarm
                    .sink
                    .set_volume(level_at(&alarm.ramp, alarm.started.elapsed()));
            }
            match rx.recv_timeout(Duration::from_millis(50)) {
                Ok(Message {
                    kind: MessageType::AlarmTriggered { sound, ramp },
                    alarm_id,
                }) => {
                    let sound_path = resolve_sound(&sound, &config, synthesizer.as_ref());
                    info!("playing {} for alarm {alarm_id}", sound_path.display());
                    if let Some(sink) = start_playing(&stream_handle, &sound_path) {
                        sink.set_volume(ramp.start);
                        if let Some(old) = playing.insert(
                            alarm_id,
                            Playing {
                                sink,
                                ramp,
                                started: Instant::now(),
                            },
                        ) {
                            old.sink.stop();
                        }
                    }
                }
                Ok(Message {
                    kind: MessageType::AlarmStopped,
                    alarm_id,
                }) => {
                    if let Some(alarm) = playing.remove(&alarm_id) {
                        info!("alarm {alarm_id} stopped");
                        alarm.sink.stop();
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_starts_quiet_and_caps() {
        let ramp = VolumeRampConfig::default();
        assert!((level_at(&ramp, Duration::ZERO) - 0.1).abs() < 1e-6);
        assert!((level_at(&ramp, Duration::from_millis(499)) - 0.1).abs() < 1e-6);
        assert!((level_at(&ramp, Duration::from_millis(1000)) - 0.14).abs() < 1e-6);
        assert!((level_at(&ramp, Duration::from_secs(600)) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_zero_interval_plays_at_cap() {
        let ramp = VolumeRampConfig {
            interval_ms: 0,
            ..VolumeRampConfig::default()
        };
        assert!((level_at(&ramp, Duration::ZERO) - ramp.cap).abs() < 1e-6);
    }

    struct FixedSpeech(Option<PathBuf>);

    impl SpeechSynthesizer for FixedSpeech {
        fn synthesize(&self, _message: &str, _voice: Option<&str>) -> Result<PathBuf> {
            self.0
                .clone()
                .ok_or_else(|| ClockError::Speech("no engine".to_string()))
        }
    }

    #[test]
    fn test_resolve_builtin_and_unknown() {
        let config = Config::default();
        let speech = FixedSpeech(None);
        let rain = SoundSource::BuiltIn {
            id: "rain".to_string(),
        };
        assert_eq!(
            resolve_sound(&rain, &config, &speech),
            config.sound("rain").path
        );
        let unknown = SoundSource::BuiltIn {
            id: "trumpet".to_string(),
        };
        assert_eq!(
            resolve_sound(&unknown, &config, &speech),
            config.sound("default").path
        );
    }

    #[test]
    fn test_resolve_uploaded() {
        let config = Config::default();
        let speech = FixedSpeech(None);
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        std::fs::write(&song, b"not really audio").unwrap();

        let present = SoundSource::Uploaded { path: song.clone() };
        assert_eq!(resolve_sound(&present, &config, &speech), song);

        let missing = SoundSource::Uploaded {
            path: dir.path().join("gone.mp3"),
        };
        assert_eq!(
            resolve_sound(&missing, &config, &speech),
            config.sound("default").path
        );
    }

    #[test]
    fn test_failed_speech_falls_back_to_default() {
        let config = Config::default();
        let source = SoundSource::Speech {
            message: "wake up".to_string(),
            voice: None,
        };
        assert_eq!(
            resolve_sound(&source, &config, &FixedSpeech(None)),
            config.sound("default").path
        );
        let spoken = PathBuf::from("/tmp/speech.wav");
        assert_eq!(
            resolve_sound(&source, &config, &FixedSpeech(Some(spoken.clone()))),
            spoken
        );
    }

    #[test]
    fn test_expand_args() {
        let synthesizer = CommandSynthesizer::new(
            SpeechConfig {
                program: "say".to_string(),
                args: ["-v", "{voice}", "-o", "{output}", "{message}"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
            PathBuf::from("/tmp"),
        );
        let output = Path::new("/tmp/speech.wav");
        assert_eq!(
            synthesizer.expand_args(output, "good morning", Some("alex")),
            ["-v", "alex", "-o", "/tmp/speech.wav", "good morning"]
        );
        assert_eq!(
            synthesizer.expand_args(output, "good morning", None),
            ["-o", "/tmp/speech.wav", "good morning"]
        );
    }

    #[test]
    fn test_default_args_pass_the_voice() {
        let synthesizer = CommandSynthesizer::new(SpeechConfig::default(), PathBuf::from("/tmp"));
        let output = Path::new("/tmp/speech.wav");
        assert_eq!(
            synthesizer.expand_args(output, "rise", Some("en-us")),
            ["-w", "/tmp/speech.wav", "-v", "en-us", "rise"]
        );
        assert_eq!(
            synthesizer.expand_args(output, "rise", None),
            ["-w", "/tmp/speech.wav", "rise"]
        );
    }

    #[test]
    fn test_joined_voice_arg_is_dropped_without_voice() {
        let synthesizer = CommandSynthesizer::new(
            SpeechConfig {
                program: "tts".to_string(),
                args: ["--voice={voice}", "--out", "{output}", "{message}"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            },
            PathBuf::from("/tmp"),
        );
        let output = Path::new("/tmp/speech.wav");
        assert_eq!(
            synthesizer.expand_args(output, "hi", Some("anna")),
            ["--voice=anna", "--out", "/tmp/speech.wav", "hi"]
        );
        assert_eq!(
            synthesizer.expand_args(output, "hi", None),
            ["--out", "/tmp/speech.wav", "hi"]
        );
    }

    #[test]
    fn test_missing_program_is_a_speech_error() {
        let dir = tempfile::tempdir().unwrap();
        let synthesizer = CommandSynthesizer::new(
            SpeechConfig {
                program: "definitely-not-a-speech-program".to_string(),
                args: vec!["{message}".to_string()],
            },
            dir.path().to_path_buf(),
        );
        assert!(matches!(
            synthesizer.synthesize("hi", None),
            Err(ClockError::Speech(_))
        ));
    }
}
