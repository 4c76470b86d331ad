//! Scripted answer policies used to drive sessions through every path.

use std::fmt;
use std::str::FromStr;

use alibi_game::{Dilemma, Question};
use rand::Rng;

/// What a policy does with the current day dilemma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayAction {
    Pick(usize),
    /// Let the countdown expire; the engine forces option zero.
    Wait,
}

/// What a policy does with the current interrogation question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerAction {
    Answer(String),
    /// Let the countdown expire; the engine applies the timeout penalty.
    Wait,
}

/// How a scripted seat plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPolicy {
    /// Always correct, always on time.
    Sharp,
    /// Random options, right or wrong.
    Scattered,
    /// Half the time frozen, otherwise correct.
    Hesitant,
    /// Never answers anything.
    Silent,
    /// Deliberately wrong on critical questions, frozen otherwise.
    Guilty,
}

impl AnswerPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sharp => "sharp",
            Self::Scattered => "scattered",
            Self::Hesitant => "hesitant",
            Self::Silent => "silent",
            Self::Guilty => "guilty",
        }
    }

    /// Resolve the current dilemma.
    pub fn day_action<R: Rng>(self, dilemma: &Dilemma, rng: &mut R) -> DayAction {
        match self {
            Self::Sharp => DayAction::Pick(0),
            Self::Scattered | Self::Guilty => {
                DayAction::Pick(rng.gen_range(0..dilemma.options.len()))
            }
            Self::Hesitant => {
                if rng.gen_range(0.0_f32..1.0) < 0.5 {
                    DayAction::Wait
                } else {
                    DayAction::Pick(rng.gen_range(0..dilemma.options.len()))
                }
            }
            Self::Silent => DayAction::Wait,
        }
    }

    /// Resolve the current interrogation question.
    pub fn answer_action<R: Rng>(self, question: &Question, rng: &mut R) -> AnswerAction {
        match self {
            Self::Sharp => AnswerAction::Answer(question.correct_answer.clone()),
            Self::Scattered => {
                let pick = rng.gen_range(0..question.options.len());
                AnswerAction::Answer(question.options[pick].clone())
            }
            Self::Hesitant => {
                if rng.gen_range(0.0_f32..1.0) < 0.5 {
                    AnswerAction::Wait
                } else {
                    AnswerAction::Answer(question.correct_answer.clone())
                }
            }
            Self::Silent => AnswerAction::Wait,
            Self::Guilty => {
                if question.is_critical {
                    let wrong = question
                        .options
                        .iter()
                        .find(|o| **o != question.correct_answer)
                        .cloned()
                        .unwrap_or_else(|| question.correct_answer.clone());
                    AnswerAction::Answer(wrong)
                } else {
                    AnswerAction::Wait
                }
            }
        }
    }
}

impl fmt::Display for AnswerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sharp" => Ok(Self::Sharp),
            "scattered" => Ok(Self::Scattered),
            "hesitant" => Ok(Self::Hesitant),
            "silent" => Ok(Self::Silent),
            "guilty" => Ok(Self::Guilty),
            _ => Err(()),
        }
    }
}
