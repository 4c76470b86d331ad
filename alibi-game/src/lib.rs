//! Alibi Game Engine
//!
//! Platform-agnostic core game logic for Alibi, the noir memory party game.
//! This crate provides the session state machine, the phase controllers, the
//! machine opponent, and the scenario acquisition policy, without UI or
//! platform-specific dependencies.

pub mod archive;
pub mod clock;
pub mod constants;
pub mod data;
pub mod day;
pub mod generate;
pub mod interrogation;
pub mod opponent;
pub mod result;
pub mod rng;
pub mod seed;
pub mod session;
pub mod state;

use std::rc::Rc;

use thiserror::Error;

// Re-export commonly used types
pub use archive::{
    ArchivedScenario, MemoryRoomStore, MemoryScenarioStore, NewScenario, Room, RoomStatus,
    RoomStore, ScenarioStore, archive_rating, maybe_reuse, new_room_code,
};
pub use clock::{TimerHandle, VirtualClock};
pub use data::{Choice, ChoiceLog, DataError, Dilemma, Question, Scenario, validate_question_set};
pub use day::{DayError, DayInput, DayOutcome, DayStep, resolve_dilemma};
pub use generate::{
    FailureKind, GenerateError, QuestionRequest, StoryModel, StoryRequest, generate_questions,
    generate_story,
};
pub use interrogation::{
    AnswerOutcome, AnswerVerdict, InterrogationError, InterrogationStep, Reply,
    resolve_machine_question, resolve_question,
};
pub use opponent::{MACHINE_NAME, MachineReply, respond};
pub use result::{CaseSummary, Verdict, case_summary, select_verdict};
pub use rng::RngBundle;
pub use seed::{WORD_LIST, decode_to_seed, encode_friendly, generate_code_from_entropy};
pub use session::{GameSession, SessionError, SessionEvent};
pub use state::{
    Difficulty, GameMode, GamePhase, PlayerRecord, Seat, SessionState, Suspicion,
};

use constants::{LOG_SCENARIO_FRESH, LOG_SCENARIO_REUSED};
use rand::Rng as _;

/// Avatar descriptor used for the machine-held seat.
pub const MACHINE_AVATAR: &str = "a still figure in a grey coat, face lost to static";

/// Everything needed to open a new case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseSetup {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub seed: u64,
    pub player1_name: String,
    pub player1_avatar: String,
    pub player2_name: String,
    pub player2_avatar: String,
}

impl CaseSetup {
    fn seat_two_identity(&self) -> (String, String) {
        if self.mode == GameMode::Solo {
            (MACHINE_NAME.to_string(), MACHINE_AVATAR.to_string())
        } else {
            (self.player2_name.clone(), self.player2_avatar.clone())
        }
    }
}

/// Failures surfaced by the engine's acquisition steps.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Composition root binding the story model and the scenario archive.
///
/// Acquisition order per session: the archive's admission policy first,
/// fresh generation as the fallback. Both network-shaped steps are the only
/// suspend points in a play-through and run sequentially, never
/// concurrently per phase.
pub struct GameEngine<M, S>
where
    M: StoryModel,
    S: ScenarioStore,
{
    model: M,
    store: S,
}

impl<M, S> GameEngine<M, S>
where
    M: StoryModel,
    S: ScenarioStore,
{
    /// Create a new engine with the provided story model and archive.
    pub const fn new(model: M, store: S) -> Self {
        Self { model, store }
    }

    /// Open a case: acquire a scenario (archive first, generation as the
    /// fallback) and bind a fresh session to it.
    ///
    /// # Errors
    ///
    /// Returns an error when required parameters are missing or fresh
    /// generation fails. Archive failures are not errors; they fall back
    /// to generation.
    pub fn open_case(&self, setup: &CaseSetup) -> Result<GameSession, EngineError> {
        let (p2_name, p2_avatar) = setup.seat_two_identity();
        let request = StoryRequest {
            player1_name: setup.player1_name.clone(),
            player2_name: p2_name.clone(),
            player1_avatar: setup.player1_avatar.clone(),
            player2_avatar: p2_avatar.clone(),
            difficulty: setup.difficulty,
        };
        request.validate()?;

        let rng = Rc::new(RngBundle::from_user_seed(setup.seed));
        let reused = {
            let mut archive_rng = rng.archive();
            maybe_reuse(&self.store, setup.difficulty, &mut *archive_rng)
        };
        let (scenario, reused) = match reused {
            Some(row) => {
                // Reused scenarios are re-cast: the archived killer belongs
                // to another table's night.
                let killer = if rng.casting().gen_range(0.0_f32..1.0) < 0.5 {
                    Seat::One
                } else {
                    Seat::Two
                };
                (row.to_scenario(killer), true)
            }
            None => (generate_story(&self.model, &request)?, false),
        };

        let mut state = SessionState::new(setup.mode, setup.difficulty, setup.seed).with_players(
            PlayerRecord::named(&setup.player1_name, &setup.player1_avatar),
            PlayerRecord::named(&p2_name, &p2_avatar),
        );
        state.push_journal(if reused {
            LOG_SCENARIO_REUSED
        } else {
            LOG_SCENARIO_FRESH
        });

        Ok(GameSession::new(state, scenario, rng))
    }

    /// Generate the interrogation set from both recorded days and install
    /// it on the session.
    ///
    /// # Errors
    ///
    /// Returns an error when generation fails or the session rejects the
    /// set (empty data, double install).
    pub fn interrogate(&self, session: &mut GameSession) -> Result<(), EngineError> {
        let state = session.state();
        let request = QuestionRequest {
            player1_name: state.player(Seat::One).name.clone(),
            player2_name: state.player(Seat::Two).name.clone(),
            player1_choices: session.choices(Seat::One).to_vec(),
            player2_choices: session.choices(Seat::Two).to_vec(),
        };
        let questions = generate_questions(&self.model, &request)?;
        session.install_questions(questions)?;
        Ok(())
    }

    /// Persist the played scenario if the post-game rating clears the bar.
    ///
    /// # Errors
    ///
    /// Returns an error when the archive cannot be written.
    pub fn rate(&self, session: &GameSession, rating: u8) -> Result<bool, S::Error> {
        let scenario = session.scenario();
        let entry = NewScenario {
            difficulty: session.state().difficulty,
            convergence_location: scenario.convergence_location.clone(),
            dilemmas: scenario.dilemmas.clone(),
            questions: session.questions().unwrap_or_default().to_vec(),
            rating,
        };
        archive_rating(&self.store, entry)
    }

    /// Borrow the underlying archive.
    pub const fn store(&self) -> &S {
        &self.store
    }
}
