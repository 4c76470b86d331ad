use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::constants::{
    ARREST_STRIKE_FLOOR, ARREST_SUSPICION_FLOOR, DAY_START_LABEL, DEBUG_ENV_VAR, DILEMMAS_EASY,
    DILEMMAS_HARD, DILEMMAS_MEDIUM, STRIKE_CAP, SUSPICION_MAX, SUSPICION_MIN, SUSPICION_START,
};
use crate::data::{Choice, ChoiceLog};

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// Difficulty tier selected before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Number of day-phase dilemmas generated for this tier.
    #[must_use]
    pub const fn dilemma_count(self) -> usize {
        match self {
            Self::Easy => DILEMMAS_EASY,
            Self::Medium => DILEMMAS_MEDIUM,
            Self::Hard => DILEMMAS_HARD,
        }
    }

    /// Wire label used by the generation service and the archive.
    #[must_use]
    pub const fn wire_label(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("easy") {
            Ok(Self::Easy)
        } else if s.eq_ignore_ascii_case("medium") {
            Ok(Self::Medium)
        } else if s.eq_ignore_ascii_case("hard") {
            Ok(Self::Hard)
        } else {
            Err(())
        }
    }
}

/// How the two seats are occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Both players share one device, passing it between dilemmas.
    #[default]
    Local,
    /// Two devices joined through a lobby row; each keeps its own seat.
    Online,
    /// Seat two is held by the machine opponent.
    Solo,
}

impl GameMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Online => "online",
            Self::Solo => "solo",
        }
    }

    /// Whether the given seat is machine-held in this mode.
    #[must_use]
    pub const fn machine_holds(self, seat: Seat) -> bool {
        matches!(self, Self::Solo) && matches!(seat, Seat::Two)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("local") {
            Ok(Self::Local)
        } else if s.eq_ignore_ascii_case("online") {
            Ok(Self::Online)
        } else if s.eq_ignore_ascii_case("solo") {
            Ok(Self::Solo)
        } else {
            Err(())
        }
    }
}

/// Session lifecycle: setup, the simulated day, the interrogation, the reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Setup,
    Day,
    Interrogation,
    Results,
}

impl GamePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Day => "day",
            Self::Interrogation => "interrogation",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a wire payload names a player number other than 1 or 2.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("player number must be 1 or 2, got {0}")]
pub struct SeatOutOfRange(pub u8);

/// One of the two player seats. Serialized as the player number (1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Zero-based index into the session's player array.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// One-based player number as shown to players and sent on the wire.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.number()
    }
}

impl TryFrom<u8> for Seat {
    type Error = SeatOutOfRange;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(SeatOutOfRange(other)),
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player {}", self.number())
    }
}

/// Suspicion score, always clamped to the `[0, 100]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Suspicion(i32);

impl Suspicion {
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(clamp_suspicion(value))
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Apply a signed delta, clamping the result into range.
    #[must_use]
    pub const fn apply(self, delta: i32) -> Self {
        Self(clamp_suspicion(self.0.saturating_add(delta)))
    }

    #[must_use]
    pub const fn is_maxed(self) -> bool {
        self.0 >= ARREST_SUSPICION_FLOOR
    }
}

impl Default for Suspicion {
    fn default() -> Self {
        Self(SUSPICION_START)
    }
}

const fn clamp_suspicion(value: i32) -> i32 {
    if value < SUSPICION_MIN {
        SUSPICION_MIN
    } else if value > SUSPICION_MAX {
        SUSPICION_MAX
    } else {
        value
    }
}

impl fmt::Display for Suspicion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Everything the session tracks about one seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlayerRecord {
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub choices: ChoiceLog,
    #[serde(default)]
    pub suspicion: Suspicion,
    #[serde(default)]
    pub strikes: u8,
    #[serde(default)]
    pub is_culprit: bool,
}

impl PlayerRecord {
    #[must_use]
    pub fn named(name: &str, avatar: &str) -> Self {
        Self {
            name: name.to_string(),
            avatar: avatar.to_string(),
            ..Self::default()
        }
    }

    /// Append a resolved day choice. Choices are never mutated afterwards.
    pub fn record_choice(&mut self, choice: Choice) {
        self.choices.push(choice);
    }

    /// Strike counters hold 0, 1, or 2; further misses no longer matter.
    pub fn add_strike(&mut self) {
        self.strikes = self.strikes.saturating_add(1).min(STRIKE_CAP);
    }

    /// The arrest rule: maxed suspicion and at least one strike, together.
    #[must_use]
    pub const fn arrest_due(&self) -> bool {
        self.suspicion.is_maxed() && self.strikes >= ARREST_STRIKE_FLOOR
    }
}

/// The full mutable state of one play-through, threaded through each
/// controller step and returned anew rather than shared globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: GameMode,
    pub phase: GamePhase,
    pub difficulty: Difficulty,
    pub seed: u64,
    pub active: Seat,
    /// Simulated time-of-day label, HH:MM between 07:00 and 23:30.
    pub clock_label: String,
    pub players: [PlayerRecord; 2],
    pub arrested: Option<Seat>,
    pub journal: Vec<String>,
}

impl SessionState {
    #[must_use]
    pub fn new(mode: GameMode, difficulty: Difficulty, seed: u64) -> Self {
        Self {
            mode,
            phase: GamePhase::Setup,
            difficulty,
            seed,
            active: Seat::One,
            clock_label: DAY_START_LABEL.to_string(),
            players: [PlayerRecord::default(), PlayerRecord::default()],
            arrested: None,
            journal: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_players(mut self, one: PlayerRecord, two: PlayerRecord) -> Self {
        self.players = [one, two];
        self
    }

    #[must_use]
    pub fn player(&self, seat: Seat) -> &PlayerRecord {
        &self.players[seat.index()]
    }

    pub fn player_mut(&mut self, seat: Seat) -> &mut PlayerRecord {
        &mut self.players[seat.index()]
    }

    /// Flag the culprit seat from scenario data. Set once per session.
    pub fn assign_culprit(&mut self, culprit: Seat) {
        self.players[culprit.index()].is_culprit = true;
        self.players[culprit.other().index()].is_culprit = false;
    }

    /// The culprit seat as recorded on the player records.
    #[must_use]
    pub fn culprit(&self) -> Option<Seat> {
        if self.players[Seat::One.index()].is_culprit {
            Some(Seat::One)
        } else if self.players[Seat::Two.index()].is_culprit {
            Some(Seat::Two)
        } else {
            None
        }
    }

    pub fn push_journal(&mut self, key: &str) {
        if debug_log_enabled() {
            println!("journal | {} {}", self.clock_label, key);
        }
        self.journal.push(key.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspicion_clamps_both_directions() {
        let low = Suspicion::new(40).apply(-200);
        assert_eq!(low.get(), 0);
        let high = Suspicion::new(40).apply(500);
        assert_eq!(high.get(), 100);
        assert_eq!(Suspicion::new(-3).get(), 0);
        assert_eq!(Suspicion::new(250).get(), 100);
    }

    #[test]
    fn arrest_requires_both_conditions() {
        let mut record = PlayerRecord::default();
        record.suspicion = Suspicion::new(100);
        record.strikes = 0;
        assert!(!record.arrest_due());

        record.suspicion = Suspicion::new(99);
        record.strikes = 2;
        assert!(!record.arrest_due());

        record.suspicion = Suspicion::new(100);
        record.strikes = 1;
        assert!(record.arrest_due());
    }

    #[test]
    fn seat_round_trips_through_player_numbers() {
        assert_eq!(Seat::try_from(1).unwrap(), Seat::One);
        assert_eq!(Seat::try_from(2).unwrap(), Seat::Two);
        assert_eq!(Seat::try_from(3), Err(SeatOutOfRange(3)));
        assert_eq!(Seat::One.other(), Seat::Two);
        assert_eq!(u8::from(Seat::Two), 2);

        let json = serde_json::to_string(&Seat::Two).unwrap();
        assert_eq!(json, "2");
        let back: Seat = serde_json::from_str("1").unwrap();
        assert_eq!(back, Seat::One);
    }

    #[test]
    fn difficulty_maps_to_dilemma_count() {
        assert_eq!(Difficulty::Easy.dilemma_count(), 4);
        assert_eq!(Difficulty::Medium.dilemma_count(), 6);
        assert_eq!(Difficulty::Hard.dilemma_count(), 8);
        assert_eq!(
            serde_json::to_string(&Difficulty::Hard).unwrap(),
            "\"HARD\""
        );
        assert_eq!("Easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
    }

    #[test]
    fn culprit_assignment_is_exclusive() {
        let mut state = SessionState::new(GameMode::Local, Difficulty::Easy, 7);
        state.assign_culprit(Seat::Two);
        assert_eq!(state.culprit(), Some(Seat::Two));
        assert!(!state.player(Seat::One).is_culprit);

        state.assign_culprit(Seat::One);
        assert_eq!(state.culprit(), Some(Seat::One));
        assert!(!state.player(Seat::Two).is_culprit);
    }

    #[test]
    fn new_session_starts_at_dawn_in_setup() {
        let state = SessionState::new(GameMode::Solo, Difficulty::Medium, 99);
        assert_eq!(state.phase, GamePhase::Setup);
        assert_eq!(state.clock_label, "07:00");
        assert_eq!(state.active, Seat::One);
        assert_eq!(state.player(Seat::One).suspicion.get(), 100);
        assert!(state.arrested.is_none());
    }
}
