use rand::{seq::SliceRandom, RngCore};

use super::{Challenge, Puzzle, Submission, Verdict};
use crate::alarm::{Difficulty, TaskKind};

/// Phrases to type, longer ones for harder alarms.
pub static PHRASES: [(Difficulty, [&str; 5]); 3] = [
    (
        Difficulty::Easy,
        [
            "I am awake",
            "Time to wake up",
            "Good morning",
            "Rise and shine",
            "Start the day",
        ],
    ),
    (
        Difficulty::Medium,
        [
            "I will not hit snooze",
            "Today is a great day",
            "I am ready to start",
            "Wake up and be awesome",
            "Seize the day ahead",
        ],
    ),
    (
        Difficulty::Hard,
        [
            "I promise to get out of bed immediately",
            "Today I will accomplish my goals",
            "I am grateful for this new day",
            "Success comes from consistent action",
            "I choose to be productive today",
        ],
    ),
];

fn phrases(difficulty: Difficulty) -> &'static [&'static str] {
    PHRASES
        .iter()
        .find(|(level, _)| *level == difficulty)
        .map(|(_, phrases)| phrases.as_slice())
        .unwrap_or_default()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypingChallenge;

impl Challenge for TypingChallenge {
    fn kind(&self) -> TaskKind {
        TaskKind::Typing
    }

    fn generate(&self, difficulty: Difficulty, rng: &mut dyn RngCore) -> Puzzle {
        let phrase = phrases(difficulty)
            .choose(rng)
            .copied()
            .unwrap_or("I am awake");
        Puzzle::Typing {
            phrase: phrase.to_string(),
        }
    }

    fn verify(&self, puzzle: &mut Puzzle, submission: &Submission) -> Verdict {
        let (Puzzle::Typing { phrase }, Submission::Answer(input)) = (puzzle, submission) else {
            return Verdict::Ignored;
        };
        if normalize(input) == normalize(phrase) {
            Verdict::Solved
        } else {
            Verdict::Incorrect
        }
    }
}
