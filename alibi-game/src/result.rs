//! End-of-case result calculation.

use serde::{Deserialize, Serialize};

use crate::constants::LOG_CASE_CLOSED;
use crate::data::Scenario;
use crate::state::{Seat, SessionState};

/// How the session ended, in strict priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The session was cut short by an arrest.
    Arrested,
    /// Every question was asked and answered.
    Completed,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Arrested => write!(f, "arrested"),
            Verdict::Completed => write!(f, "completed"),
        }
    }
}

/// Complete summary of a finished case for the reveal screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub verdict: Verdict,
    pub winner: Seat,
    pub culprit: Seat,
    pub arrested: Option<Seat>,
    /// Final suspicion per seat, index-aligned with the player array.
    pub suspicion: [i32; 2],
    pub strikes: [u8; 2],
    pub convergence_location: String,
    pub explanation: String,
    pub headline_key: String,
}

/// Select the verdict in strict priority order: an arrest outranks a
/// completed interrogation.
#[must_use]
pub const fn select_verdict(state: &SessionState) -> Verdict {
    if state.arrested.is_some() {
        Verdict::Arrested
    } else {
        Verdict::Completed
    }
}

/// Derive the reveal summary once both controllers have finished.
///
/// The winner is the seat with strictly lower final suspicion; an exact tie
/// resolves to seat two. The culprit comes from scenario casting and is
/// independent of who won.
#[must_use]
pub fn case_summary(state: &SessionState, scenario: &Scenario) -> CaseSummary {
    let one = state.player(Seat::One);
    let two = state.player(Seat::Two);
    let winner = if one.suspicion.get() < two.suspicion.get() {
        Seat::One
    } else {
        Seat::Two
    };
    let culprit = state.culprit().unwrap_or(scenario.killer_player);
    let verdict = select_verdict(state);
    let headline_key = match verdict {
        Verdict::Arrested => "result.headline.arrest",
        Verdict::Completed => "result.headline.closed",
    };

    CaseSummary {
        verdict,
        winner,
        culprit,
        arrested: state.arrested,
        suspicion: [one.suspicion.get(), two.suspicion.get()],
        strikes: [one.strikes, two.strikes],
        convergence_location: scenario.convergence_location.clone(),
        explanation: scenario.final_explanation.clone(),
        headline_key: headline_key.to_string(),
    }
}

/// Journal key recorded when the reveal is shown.
#[must_use]
pub const fn closing_log_key() -> &'static str {
    LOG_CASE_CLOSED
}
