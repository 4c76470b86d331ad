//! Interrogation phase controller: scoring, strikes, and the arrest rule.

use rand::Rng;
use thiserror::Error;

use crate::constants::{
    LOG_ANSWER_CORRECT, LOG_ANSWER_STRIKE, LOG_ANSWER_TIMEOUT, LOG_ANSWER_WRONG, LOG_ARRESTED,
};
use crate::data::Question;
use crate::opponent::{self, MachineReply};
use crate::state::{GamePhase, Seat, SessionState};

/// A player's response to the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    /// The 15-second budget ran out. Hesitation is suspicious: the absolute
    /// value of the question's impact is applied as a penalty, unlike a
    /// wrong answer which costs nothing.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
    Correct,
    Wrong,
    TimedOut,
}

/// Result of one interrogation step: next state plus what was scored.
#[derive(Debug, Clone)]
pub struct InterrogationStep {
    pub state: SessionState,
    pub outcome: AnswerOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Seat whose suspicion the question targets.
    pub seat: Seat,
    pub verdict: AnswerVerdict,
    pub suspicion_delta: i32,
    pub suspicion_after: i32,
    pub strike_added: bool,
    pub arrested: bool,
    /// True when the session leaves the interrogation after this step,
    /// either by arrest or because the question list is exhausted.
    pub finished: bool,
    pub next_index: Option<usize>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterrogationError {
    #[error("interrogation step taken during {0} phase")]
    WrongPhase(GamePhase),
    #[error("no question at index {0}")]
    QuestionOutOfRange(usize),
    #[error("{0} is not machine-held in this mode")]
    NotMachineSeat(Seat),
}

/// Score the question at `index` against `reply`, returning a new state.
///
/// A correct answer applies the question's signed suspicion impact; a wrong
/// answer applies nothing but adds a strike when the question is critical;
/// a timeout applies `abs(impact)` as a penalty and never adds a strike.
/// The arrest rule is the exact conjunction `suspicion >= 100 && strikes
/// >= 1`, checked after the update.
///
/// # Errors
///
/// Returns an error when called outside the interrogation phase or when
/// `index` does not name a question.
pub fn resolve_question(
    state: &SessionState,
    questions: &[Question],
    index: usize,
    reply: &Reply,
) -> Result<InterrogationStep, InterrogationError> {
    if state.phase != GamePhase::Interrogation {
        return Err(InterrogationError::WrongPhase(state.phase));
    }
    let question = questions
        .get(index)
        .ok_or(InterrogationError::QuestionOutOfRange(index))?;
    let seat = question.target_player;

    let (verdict, delta) = match reply {
        Reply::Answer(text) if *text == question.correct_answer => {
            (AnswerVerdict::Correct, question.suspicion_impact)
        }
        Reply::Answer(_) => (AnswerVerdict::Wrong, 0),
        Reply::Timeout => (AnswerVerdict::TimedOut, question.suspicion_impact.abs()),
    };

    let mut next = state.clone();
    let strike_added = verdict == AnswerVerdict::Wrong && question.is_critical;
    {
        let target = next.player_mut(seat);
        target.suspicion = target.suspicion.apply(delta);
        if strike_added {
            target.add_strike();
        }
    }
    next.push_journal(match verdict {
        AnswerVerdict::Correct => LOG_ANSWER_CORRECT,
        AnswerVerdict::Wrong => LOG_ANSWER_WRONG,
        AnswerVerdict::TimedOut => LOG_ANSWER_TIMEOUT,
    });
    if strike_added {
        next.push_journal(LOG_ANSWER_STRIKE);
    }

    let arrested = next.player(seat).arrest_due();
    if arrested {
        next.arrested = Some(seat);
        next.push_journal(LOG_ARRESTED);
    }

    let exhausted = index + 1 >= questions.len();
    let finished = arrested || exhausted;
    let suspicion_after = next.player(seat).suspicion.get();

    Ok(InterrogationStep {
        outcome: AnswerOutcome {
            seat,
            verdict,
            suspicion_delta: delta,
            suspicion_after,
            strike_added,
            arrested,
            finished,
            next_index: (!finished).then(|| index + 1),
        },
        state: next,
    })
}

/// Resolve a machine-held seat's question through the opponent simulator.
///
/// The machine answers through the same scoring rules as a human seat,
/// strikes and arrest included; it never times out.
///
/// # Errors
///
/// Returns an error when the question targets a seat that is not
/// machine-held, plus every error `resolve_question` can raise.
pub fn resolve_machine_question<R: Rng>(
    state: &SessionState,
    questions: &[Question],
    index: usize,
    rng: &mut R,
) -> Result<(InterrogationStep, MachineReply), InterrogationError> {
    let question = questions
        .get(index)
        .ok_or(InterrogationError::QuestionOutOfRange(index))?;
    let seat = question.target_player;
    if !state.mode.machine_holds(seat) {
        return Err(InterrogationError::NotMachineSeat(seat));
    }
    let reply = opponent::respond(
        &question.correct_answer,
        &question.options,
        state.difficulty,
        rng,
    );
    let step = resolve_question(state, questions, index, &Reply::Answer(reply.answer.clone()))?;
    Ok((step, reply))
}
