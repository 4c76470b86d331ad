//! Day phase controller: one pure step per resolved dilemma.

use thiserror::Error;

use crate::constants::{LOG_DAY_CHOICE, LOG_DAY_COMPLETE, LOG_DAY_TIMEOUT};
use crate::data::{Choice, Scenario};
use crate::state::{GameMode, GamePhase, Seat, SessionState};

/// How the current dilemma was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayInput {
    /// The active player picked an option by index.
    Pick(usize),
    /// The countdown ran out; the first option is forced. This is a
    /// timer-driven transition, not a suspicion penalty.
    Timeout,
}

/// Result of one day step: the next session state plus what happened.
#[derive(Debug, Clone)]
pub struct DayStep {
    pub state: SessionState,
    pub outcome: DayOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOutcome {
    /// Seat whose choice log received the recorded choice.
    pub seat: Seat,
    pub recorded: Choice,
    pub timed_out: bool,
    /// True when the resolved dilemma was the last of the day.
    pub finished: bool,
    pub next_index: Option<usize>,
}

/// Failures of the day step. An out-of-range option is a caller bug: the
/// surrounding layer only ever submits indices offered by the dilemma.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DayError {
    #[error("day step taken during {0} phase")]
    WrongPhase(GamePhase),
    #[error("no dilemma at index {0}")]
    DilemmaOutOfRange(usize),
    #[error("option {option} out of range for dilemma at {time} ({count} options)")]
    OptionOutOfRange {
        time: String,
        option: usize,
        count: usize,
    },
}

/// Resolve the dilemma at `index`, returning a new session state.
///
/// Appends a [`Choice`] to the owning seat's log, advances the simulated
/// clock to the next dilemma's time label, and in local mode hands the
/// active seat to the next dilemma's owner.
///
/// # Errors
///
/// Returns an error when called outside the day phase, when `index` does
/// not name a dilemma, or when a picked option is out of range.
pub fn resolve_dilemma(
    state: &SessionState,
    scenario: &Scenario,
    index: usize,
    input: DayInput,
) -> Result<DayStep, DayError> {
    if state.phase != GamePhase::Day {
        return Err(DayError::WrongPhase(state.phase));
    }
    let dilemma = scenario
        .dilemmas
        .get(index)
        .ok_or(DayError::DilemmaOutOfRange(index))?;

    let (option_index, timed_out) = match input {
        DayInput::Pick(option) => (option, false),
        DayInput::Timeout => (0, true),
    };
    let recorded = dilemma
        .choice(option_index)
        .ok_or_else(|| DayError::OptionOutOfRange {
            time: dilemma.time.clone(),
            option: option_index,
            count: dilemma.options.len(),
        })?;

    let mut next = state.clone();
    next.player_mut(dilemma.player).record_choice(recorded.clone());
    next.push_journal(if timed_out {
        LOG_DAY_TIMEOUT
    } else {
        LOG_DAY_CHOICE
    });

    let next_index = index + 1;
    let finished = next_index >= scenario.dilemmas.len();
    if finished {
        next.push_journal(LOG_DAY_COMPLETE);
    } else {
        let upcoming = &scenario.dilemmas[next_index];
        next.clock_label = upcoming.time.clone();
        if next.mode == GameMode::Local {
            next.active = upcoming.player;
        }
    }

    Ok(DayStep {
        state: next,
        outcome: DayOutcome {
            seat: dilemma.player,
            recorded,
            timed_out,
            finished,
            next_index: (!finished).then_some(next_index),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dilemma;
    use crate::state::Difficulty;

    fn scenario() -> Scenario {
        let dilemma = |time: &str, player, a: &str, b: &str| Dilemma {
            time: time.to_string(),
            player,
            question: format!("At {time}?"),
            options: vec![a.to_string(), b.to_string()],
            locations: vec![format!("{a} St"), format!("{b} St")],
        };
        Scenario {
            convergence_location: "Metro Station".to_string(),
            dilemmas: vec![
                dilemma("07:00", Seat::One, "Coffee", "Tea"),
                dilemma("09:00", Seat::Two, "Bus", "Walk"),
                dilemma("11:00", Seat::One, "Desk", "Meeting"),
                dilemma("13:00", Seat::Two, "Lunch", "Skip"),
            ],
            killer_player: Seat::One,
            final_explanation: "Coffee did it.".to_string(),
        }
    }

    fn day_state(mode: GameMode) -> SessionState {
        let mut state = SessionState::new(mode, Difficulty::Easy, 1);
        state.phase = GamePhase::Day;
        state
    }

    #[test]
    fn pick_appends_choice_to_owning_seat() {
        let state = day_state(GameMode::Online);
        let step = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(1)).unwrap();

        let log = &step.state.player(Seat::One).choices;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].selected, "Tea");
        assert_eq!(log[0].location, "Tea St");
        assert_eq!(log[0].time, "07:00");
        assert!(step.state.player(Seat::Two).choices.is_empty());
        assert!(!step.outcome.timed_out);
        assert!(!step.outcome.finished);
        assert_eq!(step.outcome.next_index, Some(1));
    }

    #[test]
    fn advancing_updates_clock_label() {
        let state = day_state(GameMode::Online);
        let step = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(0)).unwrap();
        assert_eq!(step.state.clock_label, "09:00");
    }

    #[test]
    fn local_mode_hands_seat_to_next_owner() {
        let state = day_state(GameMode::Local);
        let step = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(0)).unwrap();
        assert_eq!(step.state.active, Seat::Two);

        let online = day_state(GameMode::Online);
        let step = resolve_dilemma(&online, &scenario(), 0, DayInput::Pick(0)).unwrap();
        assert_eq!(step.state.active, Seat::One);
    }

    #[test]
    fn timeout_forces_first_option_without_penalty() {
        let state = day_state(GameMode::Solo);
        let before = state.player(Seat::One).suspicion;
        let step = resolve_dilemma(&state, &scenario(), 0, DayInput::Timeout).unwrap();

        assert!(step.outcome.timed_out);
        assert_eq!(step.outcome.recorded.selected, "Coffee");
        assert_eq!(step.state.player(Seat::One).suspicion, before);
        assert_eq!(step.state.player(Seat::One).strikes, 0);
        assert!(
            step.state
                .journal
                .iter()
                .any(|key| key == LOG_DAY_TIMEOUT)
        );
    }

    #[test]
    fn last_dilemma_finishes_the_day() {
        let state = day_state(GameMode::Local);
        let step = resolve_dilemma(&state, &scenario(), 3, DayInput::Pick(0)).unwrap();
        assert!(step.outcome.finished);
        assert_eq!(step.outcome.next_index, None);
        assert!(
            step.state
                .journal
                .iter()
                .any(|key| key == LOG_DAY_COMPLETE)
        );
    }

    #[test]
    fn out_of_range_option_is_a_fatal_error() {
        let state = day_state(GameMode::Local);
        let err = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(5)).unwrap_err();
        assert_eq!(
            err,
            DayError::OptionOutOfRange {
                time: "07:00".to_string(),
                option: 5,
                count: 2,
            }
        );
    }

    #[test]
    fn wrong_phase_is_rejected() {
        let state = SessionState::new(GameMode::Local, Difficulty::Easy, 1);
        let err = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(0)).unwrap_err();
        assert_eq!(err, DayError::WrongPhase(GamePhase::Setup));
    }

    #[test]
    fn original_state_is_untouched() {
        let state = day_state(GameMode::Local);
        let _ = resolve_dilemma(&state, &scenario(), 0, DayInput::Pick(1)).unwrap();
        assert!(state.player(Seat::One).choices.is_empty());
        assert_eq!(state.clock_label, "07:00");
    }
}
