//! Centralized balance and tuning constants for Alibi game logic.
//!
//! These values define the deterministic rules for the session state machine.
//! Keeping them together ensures that gameplay can only be adjusted via code
//! changes reviewed in version control, rather than through external assets.

// Journal keys --------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "ALIBI_DEBUG_LOGS";
pub(crate) const LOG_DAY_CHOICE: &str = "log.day.choice";
pub(crate) const LOG_DAY_TIMEOUT: &str = "log.day.timeout";
pub(crate) const LOG_DAY_COMPLETE: &str = "log.day.complete";
pub(crate) const LOG_ANSWER_CORRECT: &str = "log.interrogation.correct";
pub(crate) const LOG_ANSWER_WRONG: &str = "log.interrogation.wrong";
pub(crate) const LOG_ANSWER_STRIKE: &str = "log.interrogation.strike";
pub(crate) const LOG_ANSWER_TIMEOUT: &str = "log.interrogation.timeout";
pub(crate) const LOG_ARRESTED: &str = "log.interrogation.arrested";
pub(crate) const LOG_CASE_CLOSED: &str = "log.case.closed";
pub(crate) const LOG_SCENARIO_REUSED: &str = "log.scenario.reused";
pub(crate) const LOG_SCENARIO_FRESH: &str = "log.scenario.fresh";

// Countdown budgets (milliseconds of simulated time) ------------------------
pub(crate) const DAY_CHOICE_BUDGET_MS: u64 = 10_000;
pub(crate) const ANSWER_BUDGET_MS: u64 = 15_000;
pub(crate) const CHOICE_REVEAL_DELAY_MS: u64 = 2_000;
pub(crate) const ANSWER_REVEAL_DELAY_MS: u64 = 3_000;
pub(crate) const PHASE_HANDOFF_DELAY_MS: u64 = 2_000;
pub(crate) const MACHINE_THINK_DELAY_MS: u64 = 1_000;

// Suspicion and arrest ------------------------------------------------------
pub(crate) const SUSPICION_MIN: i32 = 0;
pub(crate) const SUSPICION_MAX: i32 = 100;
pub(crate) const SUSPICION_START: i32 = 100;
pub(crate) const ARREST_SUSPICION_FLOOR: i32 = 100;
pub(crate) const ARREST_STRIKE_FLOOR: u8 = 1;
pub(crate) const STRIKE_CAP: u8 = 2;

// Opponent tuning -----------------------------------------------------------
pub(crate) const OPPONENT_ERROR_RATE_EASY: f32 = 0.35;
pub(crate) const OPPONENT_ERROR_RATE_MEDIUM: f32 = 0.18;
pub(crate) const OPPONENT_ERROR_RATE_HARD: f32 = 0.05;
pub(crate) const OPPONENT_THINK_BASE_EASY_MS: u64 = 3_000;
pub(crate) const OPPONENT_THINK_BASE_MEDIUM_MS: u64 = 2_000;
pub(crate) const OPPONENT_THINK_BASE_HARD_MS: u64 = 1_200;
pub(crate) const OPPONENT_THINK_JITTER_MS: u64 = 1_000;

// Scenario shape ------------------------------------------------------------
pub(crate) const DILEMMAS_EASY: usize = 4;
pub(crate) const DILEMMAS_MEDIUM: usize = 6;
pub(crate) const DILEMMAS_HARD: usize = 8;
pub(crate) const QUESTIONS_TOTAL: usize = 10;
pub(crate) const QUESTIONS_PER_SEAT: usize = 5;
pub(crate) const MIN_DILEMMA_OPTIONS: usize = 2;
pub(crate) const DAY_START_LABEL: &str = "07:00";
pub(crate) const DAY_END_LABEL: &str = "23:30";

// Archive admission ---------------------------------------------------------
pub(crate) const ARCHIVE_MIN_RATING: u8 = 3;
pub(crate) const ARCHIVE_MIN_CANDIDATES: usize = 10;
pub(crate) const ARCHIVE_REUSE_CHANCE: f32 = 0.40;
pub(crate) const ARCHIVE_PERSIST_MIN_RATING: u8 = 3;
pub(crate) const ARCHIVE_INITIAL_PLAY_COUNT: u32 = 1;
pub(crate) const RATING_MAX: u8 = 5;

// Lobby ---------------------------------------------------------------------
pub(crate) const ROOM_CODE_MIN: u16 = 1_000;
pub(crate) const ROOM_CODE_SPAN: u16 = 9_000;
