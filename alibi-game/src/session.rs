//! Session driver binding session state, timers, and the phase controllers.
//!
//! All progression runs on the virtual clock: countdowns, reveal delays,
//! phase hand-offs, and the machine opponent's think delay are scheduled
//! timers, so a whole session can be played deterministically by advancing
//! simulated time. Every fired countdown re-checks the session's guard
//! flags; a deadline that lost the race against a manual answer is dropped
//! without effect.

use std::rc::Rc;
use thiserror::Error;

use crate::clock::{TimerHandle, VirtualClock};
use crate::constants::{
    ANSWER_BUDGET_MS, ANSWER_REVEAL_DELAY_MS, CHOICE_REVEAL_DELAY_MS, DAY_CHOICE_BUDGET_MS,
    MACHINE_THINK_DELAY_MS, PHASE_HANDOFF_DELAY_MS,
};
use crate::data::{Choice, Question, Scenario};
use crate::day::{self, DayError, DayInput};
use crate::interrogation::{self, AnswerOutcome, InterrogationError, Reply};
use crate::opponent::MachineReply;
use crate::result::{self, CaseSummary, closing_log_key};
use crate::rng::RngBundle;
use crate::state::{GameMode, GamePhase, Seat, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    DayDeadline { index: usize },
    DayReveal { index: usize, finished: bool },
    InterrogationHandoff,
    AnswerDeadline { index: usize },
    AnswerReveal { index: usize, finished: bool },
    MachineThink { index: usize },
    ResultsHandoff,
}

/// Observable session progress, drained after each call into the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DilemmaPresented {
        index: usize,
        seat: Seat,
    },
    ChoiceRecorded {
        seat: Seat,
        choice: Choice,
        timed_out: bool,
    },
    DayComplete,
    QuestionPresented {
        index: usize,
        seat: Seat,
        critical: bool,
    },
    MachineAnswered {
        index: usize,
        reply: MachineReply,
    },
    AnswerScored {
        index: usize,
        outcome: AnswerOutcome,
    },
    Arrested {
        seat: Seat,
    },
    CaseClosed {
        summary: CaseSummary,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Day(#[from] DayError),
    #[error(transparent)]
    Interrogation(#[from] InterrogationError),
    #[error("session already started")]
    AlreadyStarted,
    #[error("scenario has no dilemmas")]
    ScenarioUnavailable,
    #[error("no interrogation data available")]
    QuestionsUnavailable,
    #[error("questions already installed")]
    QuestionsAlreadyInstalled,
    #[error("no choice is awaited")]
    NotAwaitingChoice,
    #[error("no answer is awaited")]
    NotAwaitingAnswer,
}

/// One play-through: state machine, timers, and RNG streams in lockstep.
#[derive(Debug)]
pub struct GameSession {
    state: SessionState,
    scenario: Scenario,
    questions: Option<Vec<Question>>,
    clock: VirtualClock<TimerEvent>,
    rng: Rc<RngBundle>,
    day_index: usize,
    question_index: usize,
    awaiting_choice: bool,
    awaiting_answer: bool,
    interrogation_ready: bool,
    interrogation_started: bool,
    countdown: Option<TimerHandle>,
    events: Vec<SessionEvent>,
}

impl GameSession {
    /// Bind a fresh session to its scenario. The culprit flag is set once
    /// here, from scenario casting.
    #[must_use]
    pub fn new(mut state: SessionState, scenario: Scenario, rng: Rc<RngBundle>) -> Self {
        state.assign_culprit(scenario.killer_player);
        Self {
            state,
            scenario,
            questions: None,
            clock: VirtualClock::new(),
            rng,
            day_index: 0,
            question_index: 0,
            awaiting_choice: false,
            awaiting_answer: false,
            interrogation_ready: false,
            interrogation_started: false,
            countdown: None,
            events: Vec::new(),
        }
    }

    /// Enter the day phase and present the first dilemma.
    ///
    /// # Errors
    ///
    /// Returns an error when the session already started or the scenario
    /// carries no dilemmas.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state.phase != GamePhase::Setup {
            return Err(SessionError::AlreadyStarted);
        }
        let first = self
            .scenario
            .dilemmas
            .first()
            .ok_or(SessionError::ScenarioUnavailable)?;
        self.state.phase = GamePhase::Day;
        self.state.clock_label = first.time.clone();
        if self.state.mode == GameMode::Local {
            self.state.active = first.player;
        }
        self.present_dilemma(0);
        Ok(())
    }

    /// Resolve the current dilemma with a manually picked option.
    ///
    /// # Errors
    ///
    /// Returns an error when no choice is awaited or the pick is invalid.
    pub fn choose(&mut self, option_index: usize) -> Result<(), SessionError> {
        if !self.awaiting_choice {
            return Err(SessionError::NotAwaitingChoice);
        }
        let step = day::resolve_dilemma(
            &self.state,
            &self.scenario,
            self.day_index,
            DayInput::Pick(option_index),
        )?;
        self.apply_day_step(step);
        Ok(())
    }

    /// Install the generated interrogation questions. The first question is
    /// presented once both the questions and the phase hand-off are in.
    ///
    /// # Errors
    ///
    /// Returns an error when the set is empty or already installed.
    pub fn install_questions(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if questions.is_empty() {
            return Err(SessionError::QuestionsUnavailable);
        }
        if self.questions.is_some() {
            return Err(SessionError::QuestionsAlreadyInstalled);
        }
        self.questions = Some(questions);
        self.maybe_begin_interrogation();
        Ok(())
    }

    /// Answer the current question for a human-held seat.
    ///
    /// # Errors
    ///
    /// Returns an error when no answer is awaited.
    pub fn answer(&mut self, text: &str) -> Result<(), SessionError> {
        if !self.awaiting_answer {
            return Err(SessionError::NotAwaitingAnswer);
        }
        let questions = self
            .questions
            .as_ref()
            .ok_or(SessionError::QuestionsUnavailable)?;
        let step = interrogation::resolve_question(
            &self.state,
            questions,
            self.question_index,
            &Reply::Answer(text.to_string()),
        )?;
        self.apply_answer_step(step.state, step.outcome);
        Ok(())
    }

    /// Advance simulated time, firing every timer that comes due, and
    /// return the session events produced along the way.
    ///
    /// Timers are fired at their own due times, so a transition scheduled by
    /// an earlier firing lands inside the same tick when the window covers
    /// it. One large tick therefore plays out exactly like many small ones.
    pub fn tick(&mut self, delta_ms: u64) -> Vec<SessionEvent> {
        let target = self.clock.now_ms().saturating_add(delta_ms);
        while let Some(due) = self.clock.next_due_in_ms() {
            if self.clock.now_ms().saturating_add(due) > target {
                break;
            }
            for (_, event) in self.clock.advance(due) {
                self.dispatch(event);
            }
        }
        let rest = target.saturating_sub(self.clock.now_ms());
        for (_, event) in self.clock.advance(rest) {
            self.dispatch(event);
        }
        self.drain_events()
    }

    /// Take the buffered session events.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    #[must_use]
    pub fn questions(&self) -> Option<&[Question]> {
        self.questions.as_deref()
    }

    #[must_use]
    pub const fn phase(&self) -> GamePhase {
        self.state.phase
    }

    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Simulated time until the next scheduled transition, if any.
    #[must_use]
    pub fn next_due_in_ms(&self) -> Option<u64> {
        self.clock.next_due_in_ms()
    }

    #[must_use]
    pub const fn is_awaiting_choice(&self) -> bool {
        self.awaiting_choice
    }

    #[must_use]
    pub const fn is_awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    #[must_use]
    pub const fn day_index(&self) -> usize {
        self.day_index
    }

    #[must_use]
    pub const fn question_index(&self) -> usize {
        self.question_index
    }

    /// Recorded choices for one seat, in day order.
    #[must_use]
    pub fn choices(&self, seat: Seat) -> &[Choice] {
        &self.state.player(seat).choices
    }

    /// Consume the session, returning the final state.
    #[must_use]
    pub fn into_state(self) -> SessionState {
        self.state
    }

    fn present_dilemma(&mut self, index: usize) {
        self.day_index = index;
        let seat = self.scenario.dilemmas[index].player;
        self.events
            .push(SessionEvent::DilemmaPresented { index, seat });
        self.countdown = Some(
            self.clock
                .schedule(DAY_CHOICE_BUDGET_MS, TimerEvent::DayDeadline { index }),
        );
        self.awaiting_choice = true;
    }

    fn apply_day_step(&mut self, step: day::DayStep) {
        if let Some(handle) = self.countdown.take() {
            let _ = self.clock.cancel(handle);
        }
        self.awaiting_choice = false;
        self.state = step.state;
        let outcome = step.outcome;
        self.events.push(SessionEvent::ChoiceRecorded {
            seat: outcome.seat,
            choice: outcome.recorded,
            timed_out: outcome.timed_out,
        });
        self.clock.schedule(
            CHOICE_REVEAL_DELAY_MS,
            TimerEvent::DayReveal {
                index: self.day_index,
                finished: outcome.finished,
            },
        );
    }

    fn maybe_begin_interrogation(&mut self) {
        if self.interrogation_started || !self.interrogation_ready || self.questions.is_none() {
            return;
        }
        self.interrogation_started = true;
        self.present_question(0);
    }

    fn present_question(&mut self, index: usize) {
        self.question_index = index;
        let Some(questions) = self.questions.as_ref() else {
            return;
        };
        let question = &questions[index];
        let seat = question.target_player;
        self.events.push(SessionEvent::QuestionPresented {
            index,
            seat,
            critical: question.is_critical,
        });
        if self.state.mode.machine_holds(seat) {
            self.awaiting_answer = false;
            self.clock
                .schedule(MACHINE_THINK_DELAY_MS, TimerEvent::MachineThink { index });
        } else {
            self.countdown = Some(
                self.clock
                    .schedule(ANSWER_BUDGET_MS, TimerEvent::AnswerDeadline { index }),
            );
            self.awaiting_answer = true;
        }
    }

    fn apply_answer_step(&mut self, state: SessionState, outcome: AnswerOutcome) {
        if let Some(handle) = self.countdown.take() {
            let _ = self.clock.cancel(handle);
        }
        self.awaiting_answer = false;
        self.state = state;
        let arrested = outcome.arrested;
        let finished = outcome.finished;
        let seat = outcome.seat;
        self.events.push(SessionEvent::AnswerScored {
            index: self.question_index,
            outcome,
        });
        if arrested {
            self.events.push(SessionEvent::Arrested { seat });
            self.clock
                .schedule(ANSWER_REVEAL_DELAY_MS, TimerEvent::ResultsHandoff);
        } else {
            self.clock.schedule(
                ANSWER_REVEAL_DELAY_MS,
                TimerEvent::AnswerReveal {
                    index: self.question_index,
                    finished,
                },
            );
        }
    }

    fn dispatch(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::DayDeadline { index } => {
                // Guard: a stale deadline that lost to a manual choice.
                if !self.awaiting_choice || index != self.day_index {
                    return;
                }
                if let Ok(step) = day::resolve_dilemma(
                    &self.state,
                    &self.scenario,
                    self.day_index,
                    DayInput::Timeout,
                ) {
                    self.apply_day_step(step);
                }
            }
            TimerEvent::DayReveal { index, finished } => {
                if finished {
                    self.events.push(SessionEvent::DayComplete);
                    self.clock
                        .schedule(PHASE_HANDOFF_DELAY_MS, TimerEvent::InterrogationHandoff);
                } else {
                    self.present_dilemma(index + 1);
                }
            }
            TimerEvent::InterrogationHandoff => {
                self.state.phase = GamePhase::Interrogation;
                self.interrogation_ready = true;
                self.maybe_begin_interrogation();
            }
            TimerEvent::AnswerDeadline { index } => {
                // Guard: a stale deadline that lost to a manual answer.
                if !self.awaiting_answer || index != self.question_index {
                    return;
                }
                let Some(questions) = self.questions.as_ref() else {
                    return;
                };
                if let Ok(step) = interrogation::resolve_question(
                    &self.state,
                    questions,
                    self.question_index,
                    &Reply::Timeout,
                ) {
                    self.apply_answer_step(step.state, step.outcome);
                }
            }
            TimerEvent::AnswerReveal { index, finished } => {
                if finished {
                    self.clock
                        .schedule(PHASE_HANDOFF_DELAY_MS, TimerEvent::ResultsHandoff);
                } else {
                    self.present_question(index + 1);
                }
            }
            TimerEvent::MachineThink { index } => {
                if index != self.question_index || self.state.phase != GamePhase::Interrogation {
                    return;
                }
                let rng = Rc::clone(&self.rng);
                let resolved = {
                    let Some(questions) = self.questions.as_ref() else {
                        return;
                    };
                    let mut opponent_rng = rng.opponent();
                    interrogation::resolve_machine_question(
                        &self.state,
                        questions,
                        index,
                        &mut *opponent_rng,
                    )
                };
                if let Ok((step, reply)) = resolved {
                    self.events.push(SessionEvent::MachineAnswered { index, reply });
                    self.apply_answer_step(step.state, step.outcome);
                }
            }
            TimerEvent::ResultsHandoff => {
                self.state.phase = GamePhase::Results;
                self.state.push_journal(closing_log_key());
                let summary = result::case_summary(&self.state, &self.scenario);
                self.events.push(SessionEvent::CaseClosed { summary });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dilemma;
    use crate::state::{Difficulty, Suspicion};

    fn two_dilemma_scenario() -> Scenario {
        let dilemma = |time: &str, player, a: &str, b: &str| Dilemma {
            time: time.to_string(),
            player,
            question: format!("At {time}?"),
            options: vec![a.to_string(), b.to_string()],
            locations: vec![format!("{a} Ave"), format!("{b} Ave")],
        };
        Scenario {
            convergence_location: "Public Library".to_string(),
            dilemmas: vec![
                dilemma("07:00", Seat::One, "Coffee", "Tea"),
                dilemma("12:00", Seat::Two, "Walk", "Bus"),
            ],
            killer_player: Seat::Two,
            final_explanation: "The stacks keep secrets.".to_string(),
        }
    }

    fn question(seat: Seat, impact: i32, critical: bool) -> Question {
        Question {
            question: "What did you pick?".to_string(),
            target_player: seat,
            correct_answer: "Coffee".to_string(),
            options: vec!["Coffee".to_string(), "Tea".to_string()],
            suspicion_impact: impact,
            is_critical: critical,
        }
    }

    fn session(mode: GameMode) -> GameSession {
        let state = SessionState::new(mode, Difficulty::Easy, 77);
        GameSession::new(
            state,
            two_dilemma_scenario(),
            Rc::new(RngBundle::from_user_seed(77)),
        )
    }

    fn run_day(session: &mut GameSession) {
        session.start().unwrap();
        session.drain_events();
        session.choose(0).unwrap();
        session.tick(2_000);
        session.choose(1).unwrap();
        session.tick(4_000);
        assert_eq!(session.phase(), GamePhase::Interrogation);
    }

    #[test]
    fn start_presents_first_dilemma_and_sets_culprit() {
        let mut session = session(GameMode::Solo);
        session.start().unwrap();
        let events = session.drain_events();
        assert!(matches!(
            events[0],
            SessionEvent::DilemmaPresented { index: 0, seat: Seat::One }
        ));
        assert_eq!(session.phase(), GamePhase::Day);
        assert_eq!(session.state().culprit(), Some(Seat::Two));
        assert!(session.is_awaiting_choice());
        assert!(session.start().is_err());
    }

    #[test]
    fn manual_choice_cancels_the_countdown() {
        let mut session = session(GameMode::Solo);
        session.start().unwrap();
        session.choose(1).unwrap();
        // Run far past the abandoned deadline; no second record may appear.
        session.tick(60_000);
        assert_eq!(session.choices(Seat::One).len(), 1);
        assert_eq!(session.choices(Seat::One)[0].selected, "Tea");
    }

    #[test]
    fn countdown_expiry_forces_the_first_option() {
        let mut session = session(GameMode::Solo);
        session.start().unwrap();
        session.drain_events();
        let events = session.tick(10_000);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::ChoiceRecorded {
                timed_out: true,
                ..
            }
        )));
        assert_eq!(session.choices(Seat::One)[0].selected, "Coffee");
        assert!(session.choose(0).is_err(), "choice window closed");
    }

    #[test]
    fn day_runs_to_interrogation_handoff() {
        let mut session = session(GameMode::Solo);
        session.start().unwrap();
        session.choose(0).unwrap();
        let events = session.tick(2_000);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::DilemmaPresented { index: 1, seat: Seat::Two }
        )));
        assert_eq!(session.state().clock_label, "12:00");

        session.choose(1).unwrap();
        let events = session.tick(2_000);
        assert!(events.iter().any(|e| matches!(e, SessionEvent::DayComplete)));
        assert_eq!(session.phase(), GamePhase::Day);

        session.tick(2_000);
        assert_eq!(session.phase(), GamePhase::Interrogation);
    }

    #[test]
    fn questions_install_before_or_after_handoff() {
        // Installed first: the hand-off presents question zero.
        let mut early = session(GameMode::Local);
        early.start().unwrap();
        early.choose(0).unwrap();
        early.tick(2_000);
        early.choose(0).unwrap();
        early.tick(2_000);
        early
            .install_questions(vec![question(Seat::One, -10, false)])
            .unwrap();
        let events = early.tick(2_000);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::QuestionPresented { index: 0, .. }
        )));

        // Installed after: presentation waits for the install.
        let mut late = session(GameMode::Local);
        run_day(&mut late);
        assert!(!late.is_awaiting_answer());
        late.install_questions(vec![question(Seat::One, -10, false)])
            .unwrap();
        let events = late.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::QuestionPresented { index: 0, .. }
        )));
        assert!(late.is_awaiting_answer());
    }

    #[test]
    fn empty_question_set_is_rejected() {
        let mut session = session(GameMode::Local);
        run_day(&mut session);
        assert!(matches!(
            session.install_questions(Vec::new()),
            Err(SessionError::QuestionsUnavailable)
        ));
    }

    #[test]
    fn answer_timeout_applies_the_penalty() {
        let mut session = session(GameMode::Local);
        run_day(&mut session);
        session
            .install_questions(vec![
                question(Seat::One, -20, false),
                question(Seat::One, -10, false),
            ])
            .unwrap();
        session.drain_events();
        session.state.player_mut(Seat::One).suspicion = Suspicion::new(40);

        let events = session.tick(15_000);
        let scored = events.iter().find_map(|e| match e {
            SessionEvent::AnswerScored { outcome, .. } => Some(outcome.clone()),
            _ => None,
        });
        let outcome = scored.expect("timeout scored");
        assert_eq!(outcome.suspicion_delta, 20);
        assert_eq!(session.state().player(Seat::One).suspicion.get(), 60);
    }

    #[test]
    fn machine_question_resolves_after_think_delay() {
        let mut session = session(GameMode::Solo);
        run_day(&mut session);
        session
            .install_questions(vec![
                question(Seat::Two, -10, false),
                question(Seat::One, -10, false),
            ])
            .unwrap();
        session.drain_events();
        assert!(!session.is_awaiting_answer(), "machine seat takes no input");

        let events = session.tick(1_000);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::MachineAnswered { index: 0, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::AnswerScored { index: 0, .. }
        )));

        // Reveal delay, then the human question goes live.
        let events = session.tick(3_000);
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::QuestionPresented { index: 1, .. }
        )));
        assert!(session.is_awaiting_answer());
    }

    #[test]
    fn arrest_cuts_the_interrogation_short() {
        let mut session = session(GameMode::Local);
        run_day(&mut session);
        session
            .install_questions(vec![
                question(Seat::One, -10, true),
                question(Seat::One, -10, false),
            ])
            .unwrap();
        session.state.player_mut(Seat::One).suspicion = Suspicion::new(100);
        session.state.player_mut(Seat::One).strikes = 0;
        session.drain_events();

        // Wrong answer on a critical question: strike lands at max suspicion.
        session.answer("Tea").unwrap();
        let mut events = session.drain_events();
        events.extend(session.tick(3_000));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Arrested { seat: Seat::One }
        )));
        let closed = events.iter().find_map(|e| match e {
            SessionEvent::CaseClosed { summary } => Some(summary.clone()),
            _ => None,
        });
        let summary = closed.expect("case closes after an arrest");
        assert_eq!(summary.arrested, Some(Seat::One));
        assert_eq!(session.phase(), GamePhase::Results);
    }

    #[test]
    fn completed_interrogation_reaches_the_reveal() {
        let mut session = session(GameMode::Local);
        run_day(&mut session);
        session
            .install_questions(vec![question(Seat::One, -15, false)])
            .unwrap();
        session.drain_events();
        session.answer("Coffee").unwrap();

        // Reveal delay plus hand-off delay.
        let events = session.tick(5_000);
        let closed = events.iter().find_map(|e| match e {
            SessionEvent::CaseClosed { summary } => Some(summary.clone()),
            _ => None,
        });
        let summary = closed.expect("case closed");
        assert_eq!(summary.suspicion[0], 85);
        assert_eq!(summary.culprit, Seat::Two);
        assert!(summary.arrested.is_none());
    }

    #[test]
    fn one_large_tick_equals_many_small_ones() {
        let mut fast = session(GameMode::Solo);
        fast.start().unwrap();
        // Never touch it again: timeouts play the whole day out.
        let mut fast_events = Vec::new();
        fast_events.extend(fast.tick(60_000));

        let mut slow = session(GameMode::Solo);
        slow.start().unwrap();
        let mut slow_events = Vec::new();
        for _ in 0..60 {
            slow_events.extend(slow.tick(1_000));
        }

        assert_eq!(fast_events, slow_events);
        assert_eq!(fast.state().players, slow.state().players);
        assert_eq!(fast.phase(), slow.phase());
    }
}
