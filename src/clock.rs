//! The terminal alarm clock.
//!
//! [`Clock`] owns the scheduler and drives it from wall clock time. Input
//! comes in as lines over a channel so the loop never blocks on stdin:
//! `snooze` snoozes the ringing alarm, three numbers (`x y z`) are an
//! accelerometer reading for shake tasks, anything else is an answer.

use std::{
    io::BufRead,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{error, info, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    alarm::{Alarm, AlarmId},
    challenge::{Acceleration, ChallengeRegistry, ChallengeSequence, Step, Submission},
    communication::Message,
    config::Config,
    error::ClockError,
    quotes,
    scheduler::{Event, Scheduler},
    storage::KeyValueStore,
    weather::{self, OpenMeteo, WeatherProvider},
};

pub struct Clock<S> {
    scheduler: Scheduler<S>,
    config: Config,
    sender: Sender<Message>,
    registry: ChallengeRegistry,
    weather: Option<Box<dyn WeatherProvider>>,
    challenge: Option<ChallengeSequence>,
    last_minute: Option<(NaiveDate, u32, u32)>,
    rng: StdRng,
}

impl<S: KeyValueStore> Clock<S> {
    pub fn new(scheduler: Scheduler<S>, config: Config, sender: Sender<Message>) -> Self {
        let weather = config.location.and_then(|location| {
            OpenMeteo::new(location)
                .map_err(|e| warn!("weather disabled: {e}"))
                .ok()
                .map(|provider| Box::new(provider) as Box<dyn WeatherProvider>)
        });
        Self {
            scheduler,
            config,
            sender,
            registry: ChallengeRegistry::default(),
            weather,
            challenge: None,
            last_minute: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the weather lookup, `None` turns it off.
    #[must_use]
    pub fn with_weather(mut self, weather: Option<Box<dyn WeatherProvider>>) -> Self {
        self.weather = weather;
        self
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<S> {
        &self.scheduler
    }

    #[must_use]
    pub const fn challenge(&self) -> Option<&ChallengeSequence> {
        self.challenge.as_ref()
    }

    fn send(&self, message: Message) {
        if self.sender.send(message).is_err() {
            warn!("audio thread is gone");
        }
    }

    /// Scans for alarms and swaps out failed puzzles. Returns what to print.
    pub fn on_tick(&mut self, now: NaiveDateTime) -> Vec<String> {
        let mut output = Vec::new();
        if let Some(challenge) = self.challenge.as_mut() {
            if challenge.poll(&self.registry, now) {
                output.extend(challenge.puzzle().map(ToString::to_string));
            }
        }
        match self.scheduler.tick(now) {
            Some(Event::AlarmRinging { alarm_id, .. }) => {
                output.extend(self.start_ringing(alarm_id, now));
            }
            Some(Event::RingCancelled { alarm_id }) => {
                self.stop_ringing(alarm_id);
                output.push("The ringing alarm was changed, stopping it.".to_string());
            }
            _ => {}
        }

        let minute = (now.date(), now.hour(), now.minute());
        if self.last_minute != Some(minute) {
            self.last_minute = Some(minute);
            output.extend(self.on_minute(now));
        }
        output
    }

    /// Picks up alarms edited from the command line and sends the pre-sleep
    /// reminders, once a minute.
    pub fn on_minute(&mut self, now: NaiveDateTime) -> Vec<String> {
        self.scheduler.reload();
        self.scheduler
            .due_reminders(&self.config.reminder, now)
            .into_iter()
            .map(|reminder| format!("{}: {}", reminder.title, reminder.message))
            .collect()
    }

    fn start_ringing(&mut self, alarm_id: AlarmId, now: NaiveDateTime) -> Vec<String> {
        let Some(alarm) = self.scheduler.alarm(alarm_id) else {
            return Vec::new();
        };
        let challenge = ChallengeSequence::start(alarm, &self.registry, now);
        let mut output = vec![ringing_banner(alarm, &self.config.time_format)];
        if alarm.can_snooze() {
            output.push(format!(
                "Type 'snooze' to snooze {} min ({} left)",
                alarm.snooze_duration,
                alarm.snoozes_left()
            ));
        }
        output.extend(challenge.puzzle().map(ToString::to_string));

        let sound = alarm.sound.clone();
        self.send(Message::triggered(alarm_id, sound, self.config.volume));
        self.challenge = Some(challenge);
        output
    }

    fn stop_ringing(&mut self, alarm_id: AlarmId) {
        self.send(Message::stopped(alarm_id));
        self.challenge = None;
    }

    /// Stops the sound when the scheduler gave up on the ring cycle of `ringing`.
    fn ring_cycle_ended(&mut self, ringing: Option<AlarmId>) -> bool {
        match ringing {
            Some(id) if self.scheduler.state().ringing().is_none() => {
                self.stop_ringing(id);
                true
            }
            _ => false,
        }
    }

    /// Handles one line typed by the user.
    pub fn on_input(&mut self, line: &str, now: NaiveDateTime) -> Vec<String> {
        let line = line.trim();
        if self.challenge.is_none() {
            return if line.is_empty() {
                Vec::new()
            } else {
                vec!["No alarm is ringing.".to_string()]
            };
        }
        if self.challenge.as_ref().is_some_and(ChallengeSequence::is_solved) {
            // solved but not saved yet
            return self.finish(now);
        }
        if line.eq_ignore_ascii_case("snooze") {
            return self.snooze(now);
        }

        let submission = parse_motion(line).map_or_else(
            || Submission::Answer(line.to_string()),
            Submission::Motion,
        );
        let Some(challenge) = self.challenge.as_mut() else {
            return Vec::new();
        };
        match challenge.submit(&self.registry, &submission, now) {
            Step::Ignored if challenge.is_cooling_down() => {
                vec!["Hold on, a new task is coming...".to_string()]
            }
            Step::Ignored => Vec::new(),
            Step::Incorrect { retry_at: Some(_) } => {
                vec!["Wrong answer! Try the new one...".to_string()]
            }
            Step::Incorrect { retry_at: None } => vec!["Not quite, keep going.".to_string()],
            Step::Progress { done, required } => vec![format!("{done} / {required}")],
            Step::TaskCompleted { next } => {
                let mut output = vec![format!("Task done! Next up: {next}")];
                output.extend(challenge.puzzle().map(ToString::to_string));
                output
            }
            Step::Solved => self.finish(now),
        }
    }

    fn snooze(&mut self, now: NaiveDateTime) -> Vec<String> {
        let ringing = self.scheduler.state().ringing();
        match self.scheduler.snooze(now) {
            Ok(Event::AlarmSnoozed { alarm_id, until }) => {
                self.stop_ringing(alarm_id);
                vec![format!(
                    "Snoozed until {}",
                    until.format(&self.config.time_format)
                )]
            }
            Ok(_) => Vec::new(),
            Err(ClockError::SnoozeLimitExceeded { limit, .. }) => {
                vec![format!("No snoozes left ({limit} used), finish the tasks!")]
            }
            Err(e) => {
                error!("couldn't snooze: {e}");
                self.ring_cycle_ended(ringing);
                vec![format!("Couldn't snooze: {e}")]
            }
        }
    }

    fn finish(&mut self, now: NaiveDateTime) -> Vec<String> {
        let Some((ringing, stats)) = self
            .challenge
            .as_ref()
            .map(|challenge| (challenge.alarm_id(), challenge.stats(now)))
        else {
            return Vec::new();
        };
        match self.scheduler.dismiss(Some(stats), now) {
            Ok(Event::AlarmDismissed { alarm_id, streak }) => {
                self.stop_ringing(alarm_id);
                let weather = weather::weather_or_fallback(self.weather.as_deref());
                info!("alarm {alarm_id} solved in {}s", stats.completion_time_seconds);
                vec![
                    quotes::success_message(stats.completion_time_seconds, stats.attempts)
                        .to_string(),
                    quotes::random_quote(&mut self.rng).to_string(),
                    format!(
                        "Finished in {}s with {} attempt(s). Streak: {streak} day(s)",
                        stats.completion_time_seconds, stats.attempts
                    ),
                    format!("Today: {weather}"),
                ]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                error!("couldn't dismiss alarm: {e}");
                if self.ring_cycle_ended(Some(ringing)) {
                    return vec![format!("Couldn't dismiss alarm: {e}")];
                }
                vec![format!(
                    "Couldn't dismiss alarm: {e}. Press enter to try again."
                )]
            }
        }
    }

    /// Runs until `input` closes, printing to stdout.
    pub fn run(mut self, input: &Receiver<String>) {
        info!("clock started with {} alarm(s)", self.scheduler.alarms().len());
        loop {
            let now = chrono::Local::now().naive_local();
            print_all(self.on_tick(now));
            match input.recv_timeout(Duration::from_secs(1)) {
                Ok(line) => {
                    let now = chrono::Local::now().naive_local();
                    print_all(self.on_input(&line, now));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        if let Some(id) = self.scheduler.state().ringing() {
            self.send(Message::stopped(id));
        }
    }
}

fn print_all(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn ringing_banner(alarm: &Alarm, time_format: &str) -> String {
    let tasks = alarm
        .task_types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Alarm {} ({}) is ringing! Tasks: {tasks} [{}]",
        alarm.display_name(),
        alarm.time.format(time_format),
        alarm.task_difficulty
    )
}

/// `x y z` as an accelerometer reading.
fn parse_motion(line: &str) -> Option<Acceleration> {
    let values = line
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match values.as_slice() {
        [x, y, z] => Some(Acceleration::new(*x, *y, *z)),
        _ => None,
    }
}

/// Forwards stdin lines to a channel, closing it at end of input.
#[must_use]
pub fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("couldn't read input: {e}");
                    break;
                }
            }
        }
    });
    rx
}
