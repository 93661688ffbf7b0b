use rand::RngCore;

use super::{Challenge, Puzzle, Submission, Verdict};
use crate::alarm::{Difficulty, TaskKind};

/// Summed per-axis change between two samples that counts as one shake.
pub const SHAKE_THRESHOLD: f64 = 15.0;

/// One accelerometer reading, gravity included.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn delta(self, other: Self) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShakeProgress {
    pub required: u32,
    pub count: u32,
    last: Acceleration,
}

impl ShakeProgress {
    #[must_use]
    pub fn new(required: u32) -> Self {
        Self {
            required,
            count: 0,
            last: Acceleration::default(),
        }
    }

    /// Feeds one sample, returns true when it counted as a shake.
    pub fn record(&mut self, sample: Acceleration) -> bool {
        let shaken = sample.delta(self.last) > SHAKE_THRESHOLD;
        if shaken {
            self.count += 1;
        }
        self.last = sample;
        shaken
    }

    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.count >= self.required
    }
}

#[must_use]
pub const fn required_shakes(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 10,
        Difficulty::Medium => 20,
        Difficulty::Hard => 30,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ShakeChallenge;

impl Challenge for ShakeChallenge {
    fn kind(&self) -> TaskKind {
        TaskKind::Shake
    }

    fn generate(&self, difficulty: Difficulty, _rng: &mut dyn RngCore) -> Puzzle {
        Puzzle::Shake(ShakeProgress::new(required_shakes(difficulty)))
    }

    /// Shaking can't be wrong, it only makes progress.
    fn verify(&self, puzzle: &mut Puzzle, submission: &Submission) -> Verdict {
        let (Puzzle::Shake(progress), Submission::Motion(sample)) = (puzzle, submission) else {
            return Verdict::Ignored;
        };
        if progress.is_done() {
            return Verdict::Solved;
        }
        progress.record(*sample);
        if progress.is_done() {
            Verdict::Solved
        } else {
            Verdict::Progress {
                done: progress.count,
                required: progress.required,
            }
        }
    }

    fn regenerates_on_failure(&self) -> bool {
        false
    }
}
