use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use wakeup_clock::{
    alarm::{parse_time, AlarmId},
    audio::{self, CommandSynthesizer},
    clock,
    occurrence::{countdown_text, next_occurrence},
    AlarmPatch, Clock, Config, DaySet, Difficulty, FileStore, NewAlarm, Scheduler, SoundSource,
    TaskKind,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Writes the default config and creates the sounds folder
    Init {
        #[clap(long, short)]
        force: bool,
    },
    Add {
        /// HH:MM, 24 hour clock
        time: String,
        #[clap(flatten)]
        options: AlarmOptions,
    },
    Edit {
        id: AlarmId,
        #[clap(long)]
        time: Option<String>,
        #[clap(flatten)]
        options: AlarmOptions,
    },
    Remove {
        id: AlarmId,
    },
    /// Enables a disabled alarm and the other way around
    Toggle {
        id: AlarmId,
    },
    /// Lists alarms with the time left until each rings
    List,
    History {
        id: AlarmId,
    },
    /// Runs the clock (default)
    Run,
}

#[derive(clap::Args)]
struct AlarmOptions {
    #[clap(long, short)]
    label: Option<String>,
    /// weekdays, 0 = Sunday .. 6 = Saturday, e.g. `--days 1,2,3,4,5`; none means every day
    #[clap(long, value_delimiter = ',')]
    days: Option<Vec<u8>>,
    /// math, shake or typing; repeat for up to three tasks
    #[clap(long = "task")]
    tasks: Option<Vec<TaskKind>>,
    #[clap(long)]
    difficulty: Option<Difficulty>,
    /// minutes, one of 3, 5, 10 or 15
    #[clap(long)]
    snooze_duration: Option<u32>,
    #[clap(long)]
    snooze_limit: Option<u8>,
    /// id of a built-in sound
    #[clap(long, conflicts_with_all = ["sound_file", "speech"])]
    sound: Option<String>,
    #[clap(long, conflicts_with = "speech")]
    sound_file: Option<PathBuf>,
    /// text read out loud instead of a sound
    #[clap(long)]
    speech: Option<String>,
    #[clap(long, requires = "speech")]
    voice: Option<String>,
}

impl AlarmOptions {
    fn days(&self) -> Result<Option<DaySet>, Box<dyn Error>> {
        Ok(self.days.clone().map(DaySet::new).transpose()?)
    }

    fn sound(&self) -> Option<SoundSource> {
        if let Some(id) = &self.sound {
            Some(SoundSource::BuiltIn { id: id.clone() })
        } else if let Some(path) = &self.sound_file {
            Some(SoundSource::Uploaded { path: path.clone() })
        } else {
            self.speech.as_ref().map(|message| SoundSource::Speech {
                message: message.clone(),
                voice: self.voice.clone(),
            })
        }
    }

    fn into_new_alarm(self, time: &str) -> Result<NewAlarm, Box<dyn Error>> {
        Ok(NewAlarm {
            days: self.days()?,
            sound: self.sound(),
            label: self.label,
            task_types: self.tasks,
            task_difficulty: self.difficulty,
            snooze_duration: self.snooze_duration,
            snooze_limit: self.snooze_limit,
            ..NewAlarm::at(parse_time(time)?)
        })
    }

    fn into_patch(self, time: Option<&str>) -> Result<AlarmPatch, Box<dyn Error>> {
        Ok(AlarmPatch {
            time: time.map(parse_time).transpose()?,
            days: self.days()?,
            sound: self.sound(),
            label: self.label,
            task_types: self.tasks,
            task_difficulty: self.difficulty,
            snooze_duration: self.snooze_duration,
            snooze_limit: self.snooze_limit,
            enabled: None,
        })
    }
}

fn open_scheduler() -> Result<Scheduler<FileStore>, Box<dyn Error>> {
    Ok(Scheduler::new(FileStore::new(Config::data_path()?)))
}

fn init(force: bool) -> Result<(), Box<dyn Error>> {
    if force || !Config::is_config_present()? {
        Config::new().save(Config::config_path()?)?;
        std::fs::create_dir_all(Config::sounds_path())?;
        println!(
            "wrote {}, put alarm sounds in {}",
            Config::config_path()?.display(),
            Config::sounds_path().display()
        );
    } else {
        println!("config already exists, use --force to overwrite it");
    }
    Ok(())
}

fn list(config: &Config) -> Result<(), Box<dyn Error>> {
    let scheduler = open_scheduler()?;
    let now = chrono::Local::now().naive_local();
    if scheduler.alarms().is_empty() {
        println!("no alarms yet, add one with `add HH:MM`");
    }
    for alarm in scheduler.alarms() {
        let tasks = alarm
            .task_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let state = if alarm.enabled {
            countdown_text(next_occurrence(alarm.time, &alarm.days, now), now)
        } else {
            "off".to_string()
        };
        println!(
            "{} {} {} [{}] {tasks} ({}) sound: {} streak: {} - {state}",
            alarm.id,
            alarm.time.format(&config.time_format),
            alarm.display_name(),
            alarm.days,
            alarm.task_difficulty,
            alarm.sound,
            alarm.streak,
        );
    }
    Ok(())
}

fn history(id: AlarmId) -> Result<(), Box<dyn Error>> {
    let scheduler = open_scheduler()?;
    let alarm = scheduler
        .alarm(id)
        .ok_or(wakeup_clock::ClockError::AlarmNotFound(id))?;
    if alarm.history.is_empty() {
        println!("{} has no history yet", alarm.display_name());
    }
    for entry in &alarm.history {
        println!(
            "{} {}s, {} attempt(s), {} snooze(s), {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.completion_time,
            entry.attempts,
            entry.snoozes_used,
            entry.difficulty
        );
    }
    Ok(())
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let scheduler = open_scheduler()?;
    let synthesizer = CommandSynthesizer::new(
        config.speech.clone(),
        Config::data_path()?.join("speech"),
    );
    let (sender, player) = audio::spawn_player(config.clone(), Box::new(synthesizer));
    let input = clock::spawn_stdin_reader();
    println!("clock running, press ctrl-d to quit");
    // dropping the clock closes the audio channel and ends the player
    Clock::new(scheduler, config, sender).run(&input);
    player
        .join()
        .map_err(|_| "audio thread panicked".to_string())?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("wakeup_clock")
        .map_err(|e| format!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    if let Some(Command::Init { force }) = args.command {
        return init(force);
    }
    let config = Config::load_or_default()?;

    match args.command {
        Some(Command::Add { time, options }) => {
            let alarm = open_scheduler()?.add(options.into_new_alarm(&time)?)?;
            let now = chrono::Local::now().naive_local();
            println!(
                "added {} ({}), {}",
                alarm.id,
                alarm.display_name(),
                countdown_text(next_occurrence(alarm.time, &alarm.days, now), now)
            );
        }
        Some(Command::Edit { id, time, options }) => {
            let patch = options.into_patch(time.as_deref())?;
            if patch.is_empty() {
                println!("nothing to change");
            } else {
                let (alarm, _) = open_scheduler()?.update(id, patch)?;
                println!("updated {} ({})", alarm.id, alarm.display_name());
            }
        }
        Some(Command::Remove { id }) => {
            let (alarm, _) = open_scheduler()?.remove(id)?;
            println!("removed {}", alarm.display_name());
        }
        Some(Command::Toggle { id }) => {
            let (enabled, _) = open_scheduler()?.toggle(id)?;
            println!("alarm is now {}", if enabled { "on" } else { "off" });
        }
        Some(Command::List) => list(&config)?,
        Some(Command::History { id }) => history(id)?,
        Some(Command::Run) | None => run(config)?,
        Some(Command::Init { .. }) => {}
    }
    Ok(())
}
