//! Machine-opponent answer simulation for solo tables.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    OPPONENT_ERROR_RATE_EASY, OPPONENT_ERROR_RATE_HARD, OPPONENT_ERROR_RATE_MEDIUM,
    OPPONENT_THINK_BASE_EASY_MS, OPPONENT_THINK_BASE_HARD_MS, OPPONENT_THINK_BASE_MEDIUM_MS,
    OPPONENT_THINK_JITTER_MS,
};
use crate::state::Difficulty;

/// Display name for the machine-held seat.
pub const MACHINE_NAME: &str = "The Silhouette";

/// A synthetic answer from the machine opponent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineReply {
    pub answer: String,
    pub is_correct: bool,
    /// Cosmetic think time; carries no scoring effect.
    pub think_ms: u64,
}

/// Probability that the machine answers a question wrongly at this tier.
#[must_use]
pub const fn error_rate(difficulty: Difficulty) -> f32 {
    match difficulty {
        Difficulty::Easy => OPPONENT_ERROR_RATE_EASY,
        Difficulty::Medium => OPPONENT_ERROR_RATE_MEDIUM,
        Difficulty::Hard => OPPONENT_ERROR_RATE_HARD,
    }
}

const fn think_base_ms(difficulty: Difficulty) -> u64 {
    match difficulty {
        Difficulty::Easy => OPPONENT_THINK_BASE_EASY_MS,
        Difficulty::Medium => OPPONENT_THINK_BASE_MEDIUM_MS,
        Difficulty::Hard => OPPONENT_THINK_BASE_HARD_MS,
    }
}

/// Produce the machine's answer to one interrogation question.
///
/// Draws an error against the difficulty rate; on an error the reply is
/// picked uniformly among the non-correct options, otherwise it is the
/// correct answer. A question with no wrong options is always answered
/// correctly.
pub fn respond<R: Rng>(
    correct_answer: &str,
    options: &[String],
    difficulty: Difficulty,
    rng: &mut R,
) -> MachineReply {
    let wrong: Vec<&String> = options.iter().filter(|o| *o != correct_answer).collect();
    let makes_error = !wrong.is_empty() && rng.gen_range(0.0_f32..1.0) < error_rate(difficulty);

    let (answer, is_correct) = if makes_error {
        (wrong[rng.gen_range(0..wrong.len())].clone(), false)
    } else {
        (correct_answer.to_string(), true)
    };

    let think_ms = think_base_ms(difficulty) + rng.gen_range(0..=OPPONENT_THINK_JITTER_MS);

    MachineReply {
        answer,
        is_correct,
        think_ms,
    }
}
