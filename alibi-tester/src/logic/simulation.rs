//! Full-session simulation on the virtual clock.

use std::convert::Infallible;
use std::rc::Rc;

use alibi_game::{
    ArchivedScenario, CaseSetup, Difficulty, GameEngine, GameMode, GamePhase,
    MemoryScenarioStore, NewScenario, ScenarioStore, Seat, SessionEvent,
};
use anyhow::{Context, Result, ensure};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use super::fixtures::ScriptedModel;
use super::policy::{AnswerAction, AnswerPolicy, DayAction};

const POLICY_SALT: u64 = 0x504F_4C49;
const STEP_MS: u64 = 1_000;
const MAX_STEPS: usize = 10_000;

/// Cloneable handle over one archive shared by many simulated cases.
#[derive(Debug, Clone, Default)]
pub struct SharedStore(pub Rc<MemoryScenarioStore>);

impl ScenarioStore for SharedStore {
    type Error = Infallible;

    fn candidates(&self, difficulty: Difficulty) -> Result<Vec<ArchivedScenario>, Self::Error> {
        self.0.candidates(difficulty)
    }

    fn record_play(&self, id: u64) -> Result<(), Self::Error> {
        self.0.record_play(id)
    }

    fn save(&self, entry: NewScenario) -> Result<bool, Self::Error> {
        self.0.save(entry)
    }
}

/// One scripted case to play out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub seed: u64,
    pub policy: AnswerPolicy,
    /// Post-game rating to submit, if any.
    pub rate: Option<u8>,
}

impl SimConfig {
    #[must_use]
    pub const fn new(mode: GameMode, difficulty: Difficulty, seed: u64, policy: AnswerPolicy) -> Self {
        Self {
            mode,
            difficulty,
            seed,
            policy,
            rate: None,
        }
    }
}

/// Everything measured over one finished case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseMetrics {
    pub mode: String,
    pub difficulty: String,
    pub policy: String,
    pub seed: u64,
    pub verdict: String,
    pub winner: u8,
    pub culprit: u8,
    pub arrested: Option<u8>,
    pub final_suspicion: [i32; 2],
    pub strikes: [u8; 2],
    pub dilemmas_resolved: usize,
    pub day_timeouts: usize,
    pub questions_scored: usize,
    pub answer_timeouts: usize,
    pub machine_correct: usize,
    pub machine_wrong: usize,
    pub reused_scenario: bool,
    /// Simulated time the whole case took, in milliseconds.
    pub sim_ms: u64,
}

/// Play one case against a fresh, empty archive.
///
/// # Errors
///
/// Returns an error when the session wedges or any engine call fails.
pub fn run_case(cfg: &SimConfig) -> Result<CaseMetrics> {
    run_case_in(cfg, &Rc::new(MemoryScenarioStore::new()))
}

/// Play one case against a shared archive.
///
/// # Errors
///
/// Returns an error when the session wedges or any engine call fails.
pub fn run_case_in(cfg: &SimConfig, store: &Rc<MemoryScenarioStore>) -> Result<CaseMetrics> {
    let engine = GameEngine::new(
        ScriptedModel::new(cfg.seed, cfg.difficulty),
        SharedStore(Rc::clone(store)),
    );
    let setup = CaseSetup {
        mode: cfg.mode,
        difficulty: cfg.difficulty,
        seed: cfg.seed,
        player1_name: "Vera".to_string(),
        player1_avatar: "tired archivist".to_string(),
        player2_name: "Marlow".to_string(),
        player2_avatar: "night-shift nurse".to_string(),
    };
    let mut session = engine.open_case(&setup).context("opening case")?;
    session.start().context("starting session")?;

    let mut policy_rng = ChaCha20Rng::seed_from_u64(cfg.seed ^ POLICY_SALT);
    let mut dilemmas_resolved = 0;
    let mut day_timeouts = 0;
    let mut questions_scored = 0;
    let mut answer_timeouts = 0;
    let mut machine_correct = 0;
    let mut machine_wrong = 0;
    let mut summary = None;

    let mut steps = 0;
    while session.phase() != GamePhase::Results {
        steps += 1;
        ensure!(steps <= MAX_STEPS, "session did not terminate");

        if session.is_awaiting_choice() {
            let dilemma = session.scenario().dilemmas[session.day_index()].clone();
            if let DayAction::Pick(option) = cfg.policy.day_action(&dilemma, &mut policy_rng) {
                session.choose(option).context("choosing option")?;
            }
        } else if session.is_awaiting_answer() {
            let question = session
                .questions()
                .context("awaiting answer without questions")?[session.question_index()]
            .clone();
            if let AnswerAction::Answer(text) =
                cfg.policy.answer_action(&question, &mut policy_rng)
            {
                session.answer(&text).context("answering question")?;
            }
        } else if session.phase() == GamePhase::Interrogation && session.questions().is_none() {
            engine
                .interrogate(&mut session)
                .context("generating questions")?;
        }

        for event in session.tick(STEP_MS) {
            match event {
                SessionEvent::ChoiceRecorded { timed_out, .. } => {
                    dilemmas_resolved += 1;
                    if timed_out {
                        day_timeouts += 1;
                    }
                }
                SessionEvent::AnswerScored { outcome, .. } => {
                    questions_scored += 1;
                    if outcome.verdict == alibi_game::AnswerVerdict::TimedOut {
                        answer_timeouts += 1;
                    }
                }
                SessionEvent::MachineAnswered { reply, .. } => {
                    if reply.is_correct {
                        machine_correct += 1;
                    } else {
                        machine_wrong += 1;
                    }
                }
                SessionEvent::CaseClosed { summary: s } => summary = Some(s),
                _ => {}
            }
        }
    }

    if let Some(rating) = cfg.rate {
        engine.rate(&session, rating).context("rating scenario")?;
    }

    let summary = summary.context("session closed without a summary")?;
    let sim_ms = session.now_ms();
    let state = session.into_state();
    let reused = state.journal.iter().any(|k| k == "log.scenario.reused");

    Ok(CaseMetrics {
        mode: cfg.mode.to_string(),
        difficulty: cfg.difficulty.to_string(),
        policy: cfg.policy.to_string(),
        seed: cfg.seed,
        verdict: summary.verdict.to_string(),
        winner: summary.winner.number(),
        culprit: summary.culprit.number(),
        arrested: summary.arrested.map(Seat::number),
        final_suspicion: summary.suspicion,
        strikes: summary.strikes,
        dilemmas_resolved,
        day_timeouts,
        questions_scored,
        answer_timeouts,
        machine_correct,
        machine_wrong,
        reused_scenario: reused,
        sim_ms,
    })
}
