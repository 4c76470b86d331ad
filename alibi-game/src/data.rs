use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::{
    DAY_END_LABEL, DAY_START_LABEL, MIN_DILEMMA_OPTIONS, QUESTIONS_PER_SEAT, QUESTIONS_TOTAL,
};
use crate::state::{Difficulty, Seat};

/// Choice log capacity matching the largest dilemma count without spilling.
pub type ChoiceLog = SmallVec<[Choice; 8]>;

const FINGERPRINT_SEED: u64 = 0x414C_4942;

static TIME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").expect("time label pattern"));

/// A recorded daily decision, appended once per resolved dilemma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub time: String,
    pub question: String,
    pub selected: String,
    pub location: String,
}

/// A timed daily-choice prompt owned by one seat.
///
/// `options` and `locations` are index-aligned: picking option `i` implies
/// visiting `locations[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dilemma {
    pub time: String,
    pub player: Seat,
    pub question: String,
    pub options: Vec<String>,
    pub locations: Vec<String>,
}

impl Dilemma {
    /// Build the choice recorded when `option_index` is picked.
    #[must_use]
    pub fn choice(&self, option_index: usize) -> Option<Choice> {
        let selected = self.options.get(option_index)?.clone();
        let location = self.locations.get(option_index)?.clone();
        Some(Choice {
            time: self.time.clone(),
            question: self.question.clone(),
            selected,
            location,
        })
    }

    /// Validate the structural invariants of a single dilemma.
    ///
    /// # Errors
    ///
    /// Returns an error when the option and location lists are misaligned,
    /// the option list is too short, or the time label is malformed.
    pub fn validate(&self) -> Result<(), DataError> {
        // HH:MM labels compare correctly as strings, so the day window is a
        // lexicographic range check.
        if !TIME_LABEL.is_match(&self.time)
            || self.time.as_str() < DAY_START_LABEL
            || self.time.as_str() > DAY_END_LABEL
        {
            return Err(DataError::BadTimeLabel(self.time.clone()));
        }
        if self.options.len() < MIN_DILEMMA_OPTIONS {
            return Err(DataError::TooFewOptions {
                prompt: self.time.clone(),
                count: self.options.len(),
            });
        }
        if self.options.len() != self.locations.len() {
            return Err(DataError::MisalignedLocations {
                time: self.time.clone(),
                options: self.options.len(),
                locations: self.locations.len(),
            });
        }
        Ok(())
    }
}

/// A complete story scenario. Created once per session and immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub convergence_location: String,
    pub dilemmas: Vec<Dilemma>,
    pub killer_player: Seat,
    pub final_explanation: String,
}

impl Scenario {
    /// Decode a scenario from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid scenario.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the scenario shape against the chosen difficulty.
    ///
    /// # Errors
    ///
    /// Returns an error when the dilemma count does not match the difficulty
    /// or any dilemma fails its own validation.
    pub fn validate(&self, difficulty: Difficulty) -> Result<(), DataError> {
        let expected = difficulty.dilemma_count();
        if self.dilemmas.len() != expected {
            return Err(DataError::WrongDilemmaCount {
                expected,
                actual: self.dilemmas.len(),
            });
        }
        if self.convergence_location.trim().is_empty() {
            return Err(DataError::MissingConvergenceLocation);
        }
        for dilemma in &self.dilemmas {
            dilemma.validate()?;
        }
        Ok(())
    }
}

/// A memory-recall interrogation question. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub target_player: Seat,
    pub correct_answer: String,
    pub options: Vec<String>,
    pub suspicion_impact: i32,
    pub is_critical: bool,
}

impl Question {
    /// Validate that the correct answer is one of the offered options.
    ///
    /// # Errors
    ///
    /// Returns an error when the correct answer is missing from the options
    /// or the option list is too short.
    pub fn validate(&self) -> Result<(), DataError> {
        if self.options.len() < MIN_DILEMMA_OPTIONS {
            return Err(DataError::TooFewOptions {
                prompt: self.question.clone(),
                count: self.options.len(),
            });
        }
        if !self.options.contains(&self.correct_answer) {
            return Err(DataError::CorrectAnswerMissing {
                question: self.question.clone(),
            });
        }
        Ok(())
    }
}

/// Validate a full interrogation set: ten questions, five per seat.
///
/// # Errors
///
/// Returns an error when the set size or per-seat split is wrong, or any
/// question fails its own validation.
pub fn validate_question_set(questions: &[Question]) -> Result<(), DataError> {
    if questions.len() != QUESTIONS_TOTAL {
        return Err(DataError::WrongQuestionCount {
            expected: QUESTIONS_TOTAL,
            actual: questions.len(),
        });
    }
    let seat_one = questions
        .iter()
        .filter(|q| q.target_player == Seat::One)
        .count();
    if seat_one != QUESTIONS_PER_SEAT {
        return Err(DataError::UnbalancedTargets {
            seat_one,
            seat_two: questions.len() - seat_one,
        });
    }
    for question in questions {
        question.validate()?;
    }
    Ok(())
}

/// Stable content fingerprint over a scenario and its question set, used by
/// the archive to reject duplicate entries.
#[must_use]
pub fn content_fingerprint(scenario: &Scenario, questions: &[Question]) -> u64 {
    let mut bytes = serde_json::to_vec(scenario).unwrap_or_default();
    bytes.extend(serde_json::to_vec(questions).unwrap_or_default());
    XxHash64::oneshot(FINGERPRINT_SEED, &bytes)
}

/// Structural validation failures for generated content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("dilemma at {time} offers {options} options but {locations} locations")]
    MisalignedLocations {
        time: String,
        options: usize,
        locations: usize,
    },
    #[error("'{prompt}' offers only {count} options")]
    TooFewOptions { prompt: String, count: usize },
    #[error("malformed time label: {0}")]
    BadTimeLabel(String),
    #[error("scenario has no convergence location")]
    MissingConvergenceLocation,
    #[error("expected {expected} dilemmas, got {actual}")]
    WrongDilemmaCount { expected: usize, actual: usize },
    #[error("expected {expected} questions, got {actual}")]
    WrongQuestionCount { expected: usize, actual: usize },
    #[error("question set targets seat one {seat_one} times and seat two {seat_two} times")]
    UnbalancedTargets { seat_one: usize, seat_two: usize },
    #[error("correct answer missing from options for '{question}'")]
    CorrectAnswerMissing { question: String },
}
