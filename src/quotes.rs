use rand::{seq::SliceRandom, RngCore};

pub const QUOTES: [&str; 10] = [
    "Great job! Every morning is a fresh start.",
    "You did it! Today is going to be amazing.",
    "Well done! You're building great habits.",
    "Excellent! Your discipline is impressive.",
    "You're unstoppable! Keep up the momentum.",
    "Success! Another day, another victory.",
    "Fantastic! You're making progress every day.",
    "Amazing! Your dedication is paying off.",
    "Outstanding! You're crushing your goals.",
    "Brilliant! You're one step closer to greatness.",
];

#[must_use]
pub fn random_quote(rng: &mut dyn RngCore) -> &'static str {
    QUOTES.choose(rng).copied().unwrap_or(QUOTES[0])
}

/// Praise depending on how quickly and cleanly the tasks were finished.
#[must_use]
pub const fn success_message(finish_seconds: u32, attempts: u32) -> &'static str {
    if finish_seconds < 30 {
        "Lightning fast! You're a morning champion!"
    } else if finish_seconds < 60 {
        "Great speed! You're ready to conquer the day!"
    } else if attempts <= 2 {
        "Excellent focus! Your dedication shows!"
    } else {
        "You made it! Every step counts. Keep going!"
    }
}
