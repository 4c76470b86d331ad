//! Scenario and question acquisition against the text-generation service.
//!
//! The transport is abstracted behind [`StoryModel`]; this module owns the
//! prompts, the balanced-JSON extraction, and the schema-validated decode
//! that fails closed on malformed payloads. No retry anywhere: a failed
//! request surfaces a single typed error and the caller restarts the phase.

use serde::Deserialize;
use thiserror::Error;

use crate::data::{self, Choice, DataError, Question, Scenario};
use crate::state::Difficulty;

/// Transport seam to the text-generation service.
///
/// Platform-specific implementations provide this; the engine only ever
/// sends one prompt and reads one completion per acquisition.
pub trait StoryModel {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a prompt and return the raw completion text.
    ///
    /// # Errors
    ///
    /// Returns an error when the service call fails.
    fn complete(&self, prompt: &str) -> Result<String, Self::Error>;
}

/// Parameters for a story generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryRequest {
    pub player1_name: String,
    pub player2_name: String,
    pub player1_avatar: String,
    pub player2_avatar: String,
    pub difficulty: Difficulty,
}

impl StoryRequest {
    /// Reject missing required parameters before any network call.
    ///
    /// # Errors
    ///
    /// Returns a bad-request class error naming the first missing field.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.player1_name.trim().is_empty() {
            return Err(GenerateError::MissingParameter("player1Name"));
        }
        if self.player2_name.trim().is_empty() {
            return Err(GenerateError::MissingParameter("player2Name"));
        }
        Ok(())
    }
}

/// Parameters for a question generation call. The choice lists are carried
/// exactly as recorded during the day phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub player1_name: String,
    pub player2_name: String,
    pub player1_choices: Vec<Choice>,
    pub player2_choices: Vec<Choice>,
}

impl QuestionRequest {
    /// Reject missing required parameters before any network call.
    ///
    /// # Errors
    ///
    /// Returns a bad-request class error naming the first missing field.
    pub fn validate(&self) -> Result<(), GenerateError> {
        if self.player1_name.trim().is_empty() {
            return Err(GenerateError::MissingParameter("player1Name"));
        }
        if self.player2_name.trim().is_empty() {
            return Err(GenerateError::MissingParameter("player2Name"));
        }
        Ok(())
    }
}

/// Coarse classification mirroring the two visible failure surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected before the service was called.
    BadRequest,
    /// The service failed or returned an unusable payload.
    Upstream,
}

/// Acquisition failures. None of these are retried.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("story model call failed: {0}")]
    Upstream(String),
    #[error("no JSON object found in model response")]
    NoJsonObject,
    #[error("model response failed to decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("model response failed validation: {0}")]
    Payload(#[from] DataError),
}

impl GenerateError {
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::MissingParameter(_) => FailureKind::BadRequest,
            Self::Upstream(_) | Self::NoJsonObject | Self::Decode(_) | Self::Payload(_) => {
                FailureKind::Upstream
            }
        }
    }
}

const CONVERGENCE_LOCATIONS: &str =
    "Hospital, Central Park, Metro Station, Shopping Mall, Public Library";

const fn dilemma_interval(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "3-4 hours",
        Difficulty::Medium => "2 hours",
        Difficulty::Hard => "every hour",
    }
}

/// Build the story generation prompt.
#[must_use]
pub fn story_prompt(req: &StoryRequest) -> String {
    let count = req.difficulty.dilemma_count();
    let interval = dilemma_interval(req.difficulty);
    format!(
        "You are a psychological thriller writer.\n\n\
         TASK: Create a noir detective story for two strangers: \
         \"{p1}\" ({a1}) and \"{p2}\" ({a2}).\n\n\
         RULES:\n\
         1. Generate {count} completely mundane dilemmas between 07:00 and 23:30, \
         spaced roughly {interval} apart, alternating ownership between players 1 and 2\n\
         2. Dilemmas are simple daily choices with two options each, and every option \
         implies a location\n\
         3. Secretly route both players through the SAME location at the SAME time \
         without either noticing\n\
         4. Pick one player (1 or 2) as the real killer\n\
         5. Write a final explanation connecting the killer's mundane choices to the crime\n\n\
         CONVERGENCE LOCATIONS (choose one): {locations}\n\n\
         OUTPUT FORMAT (JSON):\n\
         {{\n\
           \"convergenceLocation\": \"exact location name\",\n\
           \"dilemmas\": [\n\
             {{\"time\": \"07:00\", \"player\": 1, \"question\": \"You wake up and...\", \
         \"options\": [\"Option A\", \"Option B\"], \
         \"locations\": [\"Location if A\", \"Location if B\"]}}\n\
           ],\n\
           \"killerPlayer\": 1,\n\
           \"finalExplanation\": \"how the killer's day led to the crime\"\n\
         }}\n\n\
         Return ONLY valid JSON, no markdown.",
        p1 = req.player1_name,
        a1 = req.player1_avatar,
        p2 = req.player2_name,
        a2 = req.player2_avatar,
        count = count,
        interval = interval,
        locations = CONVERGENCE_LOCATIONS,
    )
}

fn choice_lines(choices: &[Choice]) -> String {
    choices
        .iter()
        .map(|c| format!("{}: {} -> {}", c.time, c.question, c.selected))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the interrogation question prompt from both recorded days.
#[must_use]
pub fn question_prompt(req: &QuestionRequest) -> String {
    format!(
        "You are a manipulative detective interrogating two suspects.\n\n\
         SUSPECTS:\n- Player 1: {p1}\n- Player 2: {p2}\n\n\
         PLAYER 1 CHOICES:\n{c1}\n\nPLAYER 2 CHOICES:\n{c2}\n\n\
         TASK: Generate 10 memory-recall questions about specific details of \
         their day, 5 per player, each with 3-4 plausible options and exactly \
         one correct answer.\n\n\
         RULES:\n\
         1. suspicionImpact for a correct answer is -10 to -20\n\
         2. Mark 2-3 questions as critical\n\n\
         OUTPUT FORMAT (JSON):\n\
         {{\n\
           \"questions\": [\n\
             {{\"question\": \"What time did you leave the house?\", \"targetPlayer\": 1, \
         \"correctAnswer\": \"07:30\", \"options\": [\"07:00\", \"07:30\", \"08:00\"], \
         \"suspicionImpact\": -15, \"isCritical\": false}}\n\
           ]\n\
         }}\n\n\
         Return ONLY valid JSON, no markdown.",
        p1 = req.player1_name,
        p2 = req.player2_name,
        c1 = choice_lines(&req.player1_choices),
        c2 = choice_lines(&req.player2_choices),
    )
}

/// Extract the first balanced `{...}` region from a raw completion.
///
/// Models wrap their JSON in prose or code fences often enough that the
/// payload has to be carved out before decoding. String literals are
/// honored so braces inside values cannot unbalance the scan.
///
/// # Errors
///
/// Returns an error when no balanced object exists in the text.
pub fn extract_json(raw: &str) -> Result<&str, GenerateError> {
    let start = raw.find('{').ok_or(GenerateError::NoJsonObject)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    Err(GenerateError::NoJsonObject)
}

#[derive(Debug, Deserialize)]
struct QuestionsPayload {
    questions: Vec<Question>,
}

/// Generate a fresh story scenario.
///
/// # Errors
///
/// Returns a bad-request error on missing parameters, or an upstream-class
/// error when the service fails or its payload does not decode/validate.
pub fn generate_story<M: StoryModel>(
    model: &M,
    req: &StoryRequest,
) -> Result<Scenario, GenerateError> {
    req.validate()?;
    let raw = model
        .complete(&story_prompt(req))
        .map_err(|e| GenerateError::Upstream(e.to_string()))?;
    let scenario = Scenario::from_json(extract_json(&raw)?)?;
    scenario.validate(req.difficulty)?;
    Ok(scenario)
}

/// Generate the interrogation question set from both recorded days.
///
/// # Errors
///
/// Returns a bad-request error on missing parameters, or an upstream-class
/// error when the service fails or its payload does not decode/validate.
pub fn generate_questions<M: StoryModel>(
    model: &M,
    req: &QuestionRequest,
) -> Result<Vec<Question>, GenerateError> {
    req.validate()?;
    let raw = model
        .complete(&question_prompt(req))
        .map_err(|e| GenerateError::Upstream(e.to_string()))?;
    let payload: QuestionsPayload = serde_json::from_str(extract_json(&raw)?)?;
    data::validate_question_set(&payload.questions)?;
    Ok(payload.questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Seat;
    use std::convert::Infallible;

    struct CannedModel(String);

    impl StoryModel for CannedModel {
        type Error = Infallible;

        fn complete(&self, _prompt: &str) -> Result<String, Self::Error> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug, Error)]
    #[error("service unavailable")]
    struct Unavailable;

    struct DownModel;

    impl StoryModel for DownModel {
        type Error = Unavailable;

        fn complete(&self, _prompt: &str) -> Result<String, Self::Error> {
            Err(Unavailable)
        }
    }

    fn story_request() -> StoryRequest {
        StoryRequest {
            player1_name: "Vera".to_string(),
            player2_name: "Marlow".to_string(),
            player1_avatar: "tired archivist".to_string(),
            player2_avatar: "night-shift nurse".to_string(),
            difficulty: Difficulty::Easy,
        }
    }

    fn easy_story_json() -> String {
        let dilemma = |time: &str, player: u8| {
            format!(
                r#"{{"time": "{time}", "player": {player}, "question": "Choose",
                    "options": ["A", "B"], "locations": ["Hospital", "Home"]}}"#
            )
        };
        format!(
            r#"{{"convergenceLocation": "Hospital",
                 "dilemmas": [{}, {}, {}, {}],
                 "killerPlayer": 2,
                 "finalExplanation": "The corridor saw it all."}}"#,
            dilemma("07:00", 1),
            dilemma("10:00", 2),
            dilemma("13:00", 1),
            dilemma("16:00", 2),
        )
    }

    #[test]
    fn extracts_balanced_object_from_wrapped_text() {
        let raw = "Sure! Here is the story:\n```json\n{\"a\": {\"b\": 1}, \"c\": \"}\"}\n```\nEnjoy.";
        let json = extract_json(raw).unwrap();
        assert_eq!(json, "{\"a\": {\"b\": 1}, \"c\": \"}\"}");
    }

    #[test]
    fn extraction_fails_closed_on_unbalanced_text() {
        assert!(matches!(
            extract_json("no object here"),
            Err(GenerateError::NoJsonObject)
        ));
        assert!(matches!(
            extract_json("{\"unterminated\": true"),
            Err(GenerateError::NoJsonObject)
        ));
    }

    #[test]
    fn story_generation_decodes_and_validates() {
        let model = CannedModel(format!("prefix {} suffix", easy_story_json()));
        let scenario = generate_story(&model, &story_request()).unwrap();
        assert_eq!(scenario.convergence_location, "Hospital");
        assert_eq!(scenario.killer_player, Seat::Two);
        assert_eq!(scenario.dilemmas.len(), 4);
    }

    #[test]
    fn story_generation_rejects_wrong_dilemma_count() {
        let model = CannedModel(easy_story_json());
        let mut req = story_request();
        req.difficulty = Difficulty::Hard;
        let err = generate_story(&model, &req).unwrap_err();
        assert!(matches!(err, GenerateError::Payload(_)));
        assert_eq!(err.kind(), FailureKind::Upstream);
    }

    #[test]
    fn missing_name_is_rejected_before_the_call() {
        let model = DownModel;
        let mut req = story_request();
        req.player2_name = "  ".to_string();
        let err = generate_story(&model, &req).unwrap_err();
        assert!(matches!(err, GenerateError::MissingParameter("player2Name")));
        assert_eq!(err.kind(), FailureKind::BadRequest);
    }

    #[test]
    fn upstream_failure_carries_the_raw_message() {
        let err = generate_story(&DownModel, &story_request()).unwrap_err();
        match err {
            GenerateError::Upstream(msg) => assert_eq!(msg, "service unavailable"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn question_prompt_carries_choices_verbatim() {
        let choice = Choice {
            time: "07:00".to_string(),
            question: "Q".to_string(),
            selected: "A".to_string(),
            location: "Cafe".to_string(),
        };
        let req = QuestionRequest {
            player1_name: "Vera".to_string(),
            player2_name: "Marlow".to_string(),
            player1_choices: vec![choice.clone()],
            player2_choices: Vec::new(),
        };
        assert_eq!(req.player1_choices[0], choice);
        let prompt = question_prompt(&req);
        assert!(prompt.contains("07:00: Q -> A"));
    }

    #[test]
    fn question_generation_validates_the_set() {
        let make = |seat: u8| {
            format!(
                r#"{{"question": "Q", "targetPlayer": {seat}, "correctAnswer": "a",
                    "options": ["a", "b"], "suspicionImpact": -10, "isCritical": false}}"#
            )
        };
        let questions: Vec<String> = (0..5)
            .map(|_| make(1))
            .chain((0..5).map(|_| make(2)))
            .collect();
        let body = format!(r#"{{"questions": [{}]}}"#, questions.join(","));
        let model = CannedModel(body);
        let req = QuestionRequest {
            player1_name: "Vera".to_string(),
            player2_name: "Marlow".to_string(),
            player1_choices: Vec::new(),
            player2_choices: Vec::new(),
        };
        let set = generate_questions(&model, &req).unwrap();
        assert_eq!(set.len(), 10);

        let short = CannedModel(r#"{"questions": []}"#.to_string());
        assert!(matches!(
            generate_questions(&short, &req),
            Err(GenerateError::Payload(DataError::WrongQuestionCount { .. }))
        ));
    }
}
