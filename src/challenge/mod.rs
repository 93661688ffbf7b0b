//! Wake-up tasks.
//!
//! Every task kind implements [`Challenge`]: it generates a [`Puzzle`] for a
//! difficulty and verifies what the user submitted against it. The
//! [`ChallengeRegistry`] maps a [`TaskKind`] to its implementation, so adding a
//! new kind never touches the ring cycle code in [`sequence`].

use std::{collections::HashMap, fmt};

use rand::RngCore;

use crate::alarm::{Difficulty, TaskKind};

mod math;
mod sequence;
mod shake;
mod typing;

pub use math::{MathChallenge, MathProblem};
pub use sequence::{ChallengeSequence, Step, REGENERATE_DELAY_SECS};
pub use shake::{Acceleration, ShakeChallenge, ShakeProgress, SHAKE_THRESHOLD};
pub use typing::{TypingChallenge, PHRASES};

/// A generated task instance, owned by whoever shows it.
#[derive(Debug, Clone, PartialEq)]
pub enum Puzzle {
    Math(MathProblem),
    Shake(ShakeProgress),
    Typing { phrase: String },
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Math(problem) => write!(f, "Solve to stop alarm: {} = ?", problem.question),
            Self::Shake(progress) => write!(
                f,
                "Shake your device to stop alarm: {} / {}",
                progress.count, progress.required
            ),
            Self::Typing { phrase } => write!(f, "Type this phrase to stop alarm: \"{phrase}\""),
        }
    }
}

/// Input from the user for the active puzzle.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Answer(String),
    Motion(Acceleration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Solved,
    Incorrect,
    /// progress toward a count based puzzle
    Progress { done: u32, required: u32 },
    /// the submission doesn't apply to this puzzle
    Ignored,
}

pub trait Challenge {
    fn kind(&self) -> TaskKind;

    fn generate(&self, difficulty: Difficulty, rng: &mut dyn RngCore) -> Puzzle;

    /// Checks `submission`. Puzzles that track progress are updated in place.
    fn verify(&self, puzzle: &mut Puzzle, submission: &Submission) -> Verdict;

    /// Whether a wrong answer replaces the puzzle with a fresh one.
    fn regenerates_on_failure(&self) -> bool {
        true
    }
}

/// Maps task kinds to implementations, anything unknown gets math.
pub struct ChallengeRegistry {
    challenges: HashMap<TaskKind, Box<dyn Challenge>>,
    fallback: Box<dyn Challenge>,
}

impl fmt::Debug for ChallengeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeRegistry")
            .field("kinds", &self.challenges.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for ChallengeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MathChallenge));
        registry.register(Box::new(ShakeChallenge));
        registry.register(Box::new(TypingChallenge));
        registry
    }
}

impl ChallengeRegistry {
    /// Only the math fallback, nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            challenges: HashMap::new(),
            fallback: Box::new(MathChallenge),
        }
    }

    /// Adds or replaces the implementation for its kind.
    pub fn register(&mut self, challenge: Box<dyn Challenge>) {
        self.challenges.insert(challenge.kind(), challenge);
    }

    #[must_use]
    pub fn resolve(&self, kind: TaskKind) -> &dyn Challenge {
        match self.challenges.get(&kind) {
            Some(challenge) => challenge.as_ref(),
            None => {
                log::warn!("no challenge for task '{kind}', falling back to math");
                self.fallback.as_ref()
            }
        }
    }
}
