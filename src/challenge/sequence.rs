//! Progress through an alarm's wake-up tasks during one ring cycle.

use chrono::{Duration, NaiveDateTime};
use rand::{rngs::StdRng, SeedableRng};

use super::{ChallengeRegistry, Puzzle, Submission, Verdict};
use crate::{
    alarm::{Alarm, AlarmId, Difficulty, TaskKind},
    lifecycle::CompletionStats,
};

/// Seconds a wrong answer stays on screen before a new puzzle replaces it.
pub const REGENERATE_DELAY_SECS: i64 = 1;

/// Result of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// nothing changed, e.g. input while waiting for a new puzzle
    Ignored,
    /// counted as a failed attempt, a new puzzle shows up at `retry_at`
    Incorrect { retry_at: Option<NaiveDateTime> },
    Progress { done: u32, required: u32 },
    /// the active task is done and `next` is up
    TaskCompleted { next: TaskKind },
    /// every task is done, the alarm can be dismissed
    Solved,
}

/// Tasks are completed strictly in order; the cycle is solved once each one
/// completed exactly once.
#[derive(Debug)]
pub struct ChallengeSequence {
    alarm_id: AlarmId,
    tasks: Vec<TaskKind>,
    difficulty: Difficulty,
    index: usize,
    puzzle: Option<Puzzle>,
    failed_attempts: u32,
    started_at: NaiveDateTime,
    regenerate_at: Option<NaiveDateTime>,
    rng: StdRng,
}

impl ChallengeSequence {
    pub fn start(alarm: &Alarm, registry: &ChallengeRegistry, now: NaiveDateTime) -> Self {
        Self::with_rng(alarm, registry, now, StdRng::from_entropy())
    }

    pub fn with_rng(
        alarm: &Alarm,
        registry: &ChallengeRegistry,
        now: NaiveDateTime,
        rng: StdRng,
    ) -> Self {
        let mut sequence = Self {
            alarm_id: alarm.id,
            tasks: alarm.task_types.clone(),
            difficulty: alarm.task_difficulty,
            index: 0,
            puzzle: None,
            failed_attempts: 0,
            started_at: now,
            regenerate_at: None,
            rng,
        };
        sequence.puzzle = sequence.generate(registry);
        sequence
    }

    fn generate(&mut self, registry: &ChallengeRegistry) -> Option<Puzzle> {
        let kind = *self.tasks.get(self.index)?;
        Some(registry.resolve(kind).generate(self.difficulty, &mut self.rng))
    }

    #[must_use]
    pub const fn alarm_id(&self) -> AlarmId {
        self.alarm_id
    }

    /// Kind of the task being worked on, `None` once solved.
    #[must_use]
    pub fn active_kind(&self, registry: &ChallengeRegistry) -> Option<TaskKind> {
        self.tasks
            .get(self.index)
            .map(|kind| registry.resolve(*kind).kind())
    }

    #[must_use]
    pub const fn puzzle(&self) -> Option<&Puzzle> {
        self.puzzle.as_ref()
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.index >= self.tasks.len()
    }

    /// True while a wrong answer is waiting to be replaced.
    #[must_use]
    pub const fn is_cooling_down(&self) -> bool {
        self.regenerate_at.is_some()
    }

    pub fn submit(
        &mut self,
        registry: &ChallengeRegistry,
        submission: &Submission,
        now: NaiveDateTime,
    ) -> Step {
        self.poll(registry, now);
        if self.is_solved() || self.regenerate_at.is_some() {
            return Step::Ignored;
        }
        let (Some(kind), Some(puzzle)) = (self.tasks.get(self.index).copied(), self.puzzle.as_mut())
        else {
            return Step::Ignored;
        };
        let challenge = registry.resolve(kind);

        match challenge.verify(puzzle, submission) {
            Verdict::Ignored => Step::Ignored,
            Verdict::Progress { done, required } => Step::Progress { done, required },
            Verdict::Incorrect => {
                self.failed_attempts += 1;
                let retry_at = challenge
                    .regenerates_on_failure()
                    .then(|| now + Duration::seconds(REGENERATE_DELAY_SECS));
                self.regenerate_at = retry_at;
                Step::Incorrect { retry_at }
            }
            Verdict::Solved => self.advance(registry),
        }
    }

    fn advance(&mut self, registry: &ChallengeRegistry) -> Step {
        self.index += 1;
        self.puzzle = self.generate(registry);
        match self.active_kind(registry) {
            Some(next) => Step::TaskCompleted { next },
            None => Step::Solved,
        }
    }

    /// Replaces a failed puzzle once its delay is over. Returns true when a
    /// new puzzle was generated.
    pub fn poll(&mut self, registry: &ChallengeRegistry, now: NaiveDateTime) -> bool {
        match self.regenerate_at {
            Some(at) if now >= at => {
                self.regenerate_at = None;
                self.puzzle = self.generate(registry);
                true
            }
            _ => false,
        }
    }

    /// Stats handed to dismissal; the successful try counts as an attempt.
    #[must_use]
    pub fn stats(&self, now: NaiveDateTime) -> CompletionStats {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        CompletionStats {
            completion_time_seconds: u32::try_from(elapsed).unwrap_or(u32::MAX),
            attempts: self.failed_attempts + 1,
        }
    }
}
