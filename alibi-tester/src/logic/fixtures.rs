//! Scripted story model producing deterministic generation payloads.
//!
//! The scripted model plays the part of the text-generation service: same
//! seed, same case file. Payloads are wrapped in prose on purpose so the
//! engine's balanced-JSON extraction is exercised on every run.

use std::cell::RefCell;
use std::convert::Infallible;

use alibi_game::{Difficulty, StoryModel};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde_json::json;

const STORY_SALT: u64 = 0x5354_4F52;
const QUESTION_SALT: u64 = 0x5155_4553;

const CONVERGENCE: [&str; 5] = [
    "Hospital",
    "Central Park",
    "Metro Station",
    "Shopping Mall",
    "Public Library",
];

const OPTION_PAIRS: [(&str, &str); 8] = [
    ("Make coffee at home", "Grab a cup on the way"),
    ("Take the metro", "Walk the long way"),
    ("Answer the phone", "Let it ring"),
    ("Eat at the diner", "Skip lunch"),
    ("Browse the stacks", "Sit by the window"),
    ("Buy the paper", "Borrow yesterday's"),
    ("Head straight back", "Detour through the park"),
    ("Turn in early", "One more walk"),
];

const LOCATION_PAIRS: [(&str, &str); 8] = [
    ("Home", "Coffee Stand"),
    ("Metro Station", "Riverside"),
    ("Home", "Office"),
    ("Diner", "Office"),
    ("Public Library", "Public Library"),
    ("Newsstand", "Home"),
    ("Home", "Central Park"),
    ("Home", "Harbor Walk"),
];

const ANSWER_BANK: [&str; 8] = [
    "07:30", "09:15", "Just after noon", "Around four", "The blue line", "On foot",
    "The corner booth", "By the window",
];

const fn dilemma_times(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Easy => &["07:00", "10:30", "14:00", "17:30"],
        Difficulty::Medium => &["07:00", "09:30", "12:00", "14:30", "17:00", "19:30"],
        Difficulty::Hard => &[
            "07:00", "09:00", "11:00", "13:00", "15:00", "17:00", "19:00", "21:00",
        ],
    }
}

/// Deterministic stand-in for the generation service.
#[derive(Debug)]
pub struct ScriptedModel {
    difficulty: Difficulty,
    story_rng: RefCell<ChaCha20Rng>,
    question_rng: RefCell<ChaCha20Rng>,
}

impl ScriptedModel {
    #[must_use]
    pub fn new(seed: u64, difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            story_rng: RefCell::new(ChaCha20Rng::seed_from_u64(seed ^ STORY_SALT)),
            question_rng: RefCell::new(ChaCha20Rng::seed_from_u64(seed ^ QUESTION_SALT)),
        }
    }

    fn story_payload(&self) -> String {
        let mut rng = self.story_rng.borrow_mut();
        let convergence = CONVERGENCE[rng.gen_range(0..CONVERGENCE.len())];
        let times = dilemma_times(self.difficulty);

        let dilemmas: Vec<serde_json::Value> = times
            .iter()
            .enumerate()
            .map(|(i, time)| {
                let pick = rng.gen_range(0..OPTION_PAIRS.len());
                let (a, b) = OPTION_PAIRS[pick];
                let (la, lb) = LOCATION_PAIRS[pick];
                // One side of a mid-day dilemma routes through the
                // convergence location.
                let (la, lb) = if i == times.len() / 2 {
                    (convergence, lb)
                } else {
                    (la, lb)
                };
                json!({
                    "time": time,
                    "player": (i % 2) + 1,
                    "question": format!("It is {time}. What do you do?"),
                    "options": [a, b],
                    "locations": [la, lb],
                })
            })
            .collect();

        let killer = rng.gen_range(1..=2);
        let body = json!({
            "convergenceLocation": convergence,
            "dilemmas": dilemmas,
            "killerPlayer": killer,
            "finalExplanation": format!(
                "Both of you crossed {convergence} without noticing; only one of you meant to."
            ),
        });
        format!("Here is the case file you asked for:\n{body}\nGood luck out there.")
    }

    fn question_payload(&self) -> String {
        let mut rng = self.question_rng.borrow_mut();
        let extra_critical = rng.gen_range(1..10usize);

        let questions: Vec<serde_json::Value> = (0..10)
            .map(|i| {
                let correct = ANSWER_BANK[rng.gen_range(0..ANSWER_BANK.len())];
                let mut options = vec![correct.to_string()];
                while options.len() < 4 {
                    let distractor = ANSWER_BANK[rng.gen_range(0..ANSWER_BANK.len())];
                    if !options.iter().any(|o| o == distractor) {
                        options.push(distractor.to_string());
                    }
                }
                let swap = rng.gen_range(0..options.len());
                options.swap(0, swap);
                let impact = -(10 + rng.gen_range(0..=10));
                // Question zero is always critical; one more lands by draw.
                let critical = i == 0 || i == extra_critical;
                json!({
                    "question": format!("Question {i}: what do you remember?"),
                    "targetPlayer": (i % 2) + 1,
                    "correctAnswer": correct,
                    "options": options,
                    "suspicionImpact": impact,
                    "isCritical": critical,
                })
            })
            .collect();

        let body = json!({ "questions": questions });
        format!("The detective leans in.\n{body}")
    }
}

impl StoryModel for ScriptedModel {
    type Error = Infallible;

    fn complete(&self, prompt: &str) -> Result<String, Self::Error> {
        if prompt.contains("interrogating") {
            Ok(self.question_payload())
        } else {
            Ok(self.story_payload())
        }
    }
}
