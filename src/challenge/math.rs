use rand::{seq::SliceRandom, Rng, RngCore};

use super::{Challenge, Puzzle, Submission, Verdict};
use crate::alarm::{Difficulty, TaskKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathProblem {
    pub question: String,
    pub answer: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    const fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
        }
    }

    const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '×',
        }
    }
}

fn pick(ops: &[Op], rng: &mut dyn RngCore) -> Op {
    ops.choose(rng).copied().unwrap_or(Op::Add)
}

/// A single binary operation; subtraction operands are swapped so the
/// result never goes negative.
fn binary(mut a: i64, mut b: i64, op: Op) -> MathProblem {
    if op == Op::Sub && b > a {
        std::mem::swap(&mut a, &mut b);
    }
    MathProblem {
        question: format!("{a} {} {b}", op.symbol()),
        answer: op.apply(a, b),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MathChallenge;

impl MathChallenge {
    #[must_use]
    pub fn problem(difficulty: Difficulty, rng: &mut dyn RngCore) -> MathProblem {
        match difficulty {
            Difficulty::Easy => {
                let op = pick(&[Op::Add, Op::Sub], rng);
                binary(rng.gen_range(1..=20), rng.gen_range(1..=20), op)
            }
            Difficulty::Medium => {
                let op = pick(&[Op::Add, Op::Sub, Op::Mul], rng);
                binary(rng.gen_range(10..=59), rng.gen_range(1..=20), op)
            }
            Difficulty::Hard => {
                let a = rng.gen_range(20..=119);
                let b = rng.gen_range(5..=34);
                let c = rng.gen_range(1..=20);
                let first = pick(&[Op::Add, Op::Sub, Op::Mul], rng);
                let second = pick(&[Op::Add, Op::Sub], rng);
                MathProblem {
                    question: format!("({a} {} {b}) {} {c}", first.symbol(), second.symbol()),
                    answer: second.apply(first.apply(a, b), c),
                }
            }
        }
    }
}

impl Challenge for MathChallenge {
    fn kind(&self) -> TaskKind {
        TaskKind::Math
    }

    fn generate(&self, difficulty: Difficulty, rng: &mut dyn RngCore) -> Puzzle {
        Puzzle::Math(Self::problem(difficulty, rng))
    }

    fn verify(&self, puzzle: &mut Puzzle, submission: &Submission) -> Verdict {
        let (Puzzle::Math(problem), Submission::Answer(answer)) = (puzzle, submission) else {
            return Verdict::Ignored;
        };
        match answer.trim().parse::<i64>() {
            Ok(value) if value == problem.answer => Verdict::Solved,
            _ => Verdict::Incorrect,
        }
    }
}
