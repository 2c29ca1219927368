//! Quiz session state machine
//!
//! This module contains the [`Game`] struct that drives one presentation of
//! a quiz: slide navigation, the per-question countdown, answer reveal,
//! scoring and the automatic advance after feedback. All deferred work is
//! expressed as [`AlarmMessage`]s handed to a scheduling closure; every
//! alarm carries the epoch it was scheduled for and is dropped when the
//! session moved on in the meantime.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use web_time::Duration;

use crate::{
    AlarmMessage,
    config::Options,
    constants,
    quiz::{
        config::{Quiz, Round},
        question::{OptionLabel, Question},
    },
    scoring::{self, Evaluation, Outcome, Submission},
    session::{Cue, FeedbackSink},
    store::{Persistence, QuizContentStore},
    timer::{Tick, Timer},
};

/// The slide currently shown by the presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Slide {
    /// Landing slide before a quiz starts
    #[default]
    Home,
    /// Choosing a round
    RoundSelect,
    /// Choosing a question of the current round
    QuestionSelect,
    /// A question is shown and can be answered
    Question,
    /// The answer given was correct
    FeedbackCorrect,
    /// The answer given was wrong
    FeedbackWrong,
    /// Time ran out before an answer was given
    Timeout,
    /// Every question of the current round was played
    RoundComplete,
    /// Every round was played
    Complete,
    /// Quiz content is being edited
    Edit,
}

impl Slide {
    /// Whether this slide shows the result of a question
    pub fn is_feedback(self) -> bool {
        matches!(
            self,
            Self::FeedbackCorrect | Self::FeedbackWrong | Self::Timeout
        )
    }

    /// Whether a question (asked or already answered) is on screen
    fn shows_question(self) -> bool {
        self == Self::Question || self.is_feedback()
    }

    fn of(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Correct => Self::FeedbackCorrect,
            Outcome::Wrong => Self::FeedbackWrong,
            Outcome::TimedOut => Self::Timeout,
        }
    }
}

/// Position of a question within the quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionKey {
    /// Round index
    pub round: usize,
    /// Question index within the round
    pub question: usize,
}

/// Errors returned for navigation requests the session cannot honor
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No round exists at the index
    #[error("round {0} does not exist")]
    RoundOutOfRange(usize),
    /// No question exists at the index within the round
    #[error("question {question} does not exist in round {round}")]
    QuestionOutOfRange {
        /// Round index
        round: usize,
        /// Question index
        question: usize,
    },
    /// The request makes no sense on the current slide
    #[error("not allowed on the {0:?} slide")]
    NotAllowed(Slide),
}

/// Everything the presentation needs to render the session
///
/// The state is owned by [`Game`] and only handed out by reference.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    round_index: usize,
    question_index: usize,
    slide: Slide,
    score: u64,
    correct_answers: usize,
    selected_answer: Option<OptionLabel>,
    answer_revealed: bool,
    is_correct: Option<bool>,
    last_result: Option<Evaluation>,
    answered: BTreeSet<QuestionKey>,
    timer: Timer,
}

impl SessionState {
    /// Fresh state whose timer epochs continue after `timer_epoch`
    fn new(timer_warning_at: u64, timer_epoch: u64) -> Self {
        Self {
            round_index: 0,
            question_index: 0,
            slide: Slide::Home,
            score: 0,
            correct_answers: 0,
            selected_answer: None,
            answer_revealed: false,
            is_correct: None,
            last_result: None,
            answered: BTreeSet::new(),
            timer: Timer::new(constants::question::DEFAULT_TIME_LIMIT, timer_warning_at)
                .with_epoch(timer_epoch),
        }
    }

    /// Clears everything tied to the current question
    fn clear_question(&mut self) {
        self.selected_answer = None;
        self.answer_revealed = false;
        self.is_correct = None;
        self.last_result = None;
    }

    /// Index of the current round
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// Index of the current question within the current round
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    /// Position of the current question
    pub fn key(&self) -> QuestionKey {
        QuestionKey {
            round: self.round_index,
            question: self.question_index,
        }
    }

    /// The slide being shown
    pub fn slide(&self) -> Slide {
        self.slide
    }

    /// Cumulative score, never negative
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Number of questions answered correctly
    pub fn correct_answers(&self) -> usize {
        self.correct_answers
    }

    /// The option picked for the current question, `None` before an answer
    /// and after a timeout
    pub fn selected_answer(&self) -> Option<OptionLabel> {
        self.selected_answer
    }

    /// Whether the current question was answered or timed out
    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    /// Whether the current question was answered correctly, `None` until
    /// revealed
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    /// Scoring of the last revealed question, cleared when moving on
    pub fn last_result(&self) -> Option<&Evaluation> {
        self.last_result.as_ref()
    }

    /// Questions answered or timed out since the quiz started
    pub fn answered(&self) -> &BTreeSet<QuestionKey> {
        &self.answered
    }

    /// The question countdown
    pub fn timer(&self) -> &Timer {
        &self.timer
    }
}

/// A quiz presentation session
///
/// The game owns the quiz content, the session state and the feedback
/// sink. Hosts call the navigation methods in response to user input and
/// feed scheduled alarms back through [`Game::receive_alarm`].
#[derive(Debug)]
pub struct Game<P, F> {
    store: QuizContentStore<P>,
    feedback: F,
    options: Options,
    state: SessionState,
    /// Bumped on every slide change, tags reveal and auto-advance alarms
    slide_epoch: u64,
}

impl<P: Persistence, F: FeedbackSink> Game<P, F> {
    /// Creates a session on the home slide
    ///
    /// # Arguments
    ///
    /// * `store` - Quiz content and its persistence
    /// * `options` - Session timings
    /// * `feedback` - Receiver of presentation cues
    pub fn new(store: QuizContentStore<P>, options: Options, feedback: F) -> Self {
        Self {
            store,
            feedback,
            state: SessionState::new(options.timer_warning_at(), 0),
            options,
            slide_epoch: 0,
        }
    }

    /// Read-only view of the session
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The slide being shown
    pub fn slide(&self) -> Slide {
        self.state.slide
    }

    /// Session timings
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The quiz being played
    pub fn content(&self) -> &Quiz {
        self.store.quiz()
    }

    /// The content store
    pub fn store(&self) -> &QuizContentStore<P> {
        &self.store
    }

    /// The current round, `None` if it no longer exists
    pub fn current_round(&self) -> Option<&Round> {
        self.content().round(self.state.round_index)
    }

    /// The current question, `None` if it no longer exists
    pub fn current_question(&self) -> Option<&Question> {
        self.content()
            .question(self.state.round_index, self.state.question_index)
    }

    /// Number of questions over all rounds
    pub fn total_questions(&self) -> usize {
        self.content().total_questions()
    }

    /// Points available over all rounds
    pub fn total_points(&self) -> u64 {
        self.content().total_points()
    }

    /// Points available in the round at `round_index`
    pub fn round_points(&self, round_index: usize) -> Option<u64> {
        self.content().round(round_index).map(Round::total_points)
    }

    /// One-based position of the current question over all rounds
    pub fn overall_question_number(&self) -> usize {
        self.content()
            .rounds
            .iter()
            .take(self.state.round_index)
            .map(Round::len)
            .sum::<usize>()
            + self.state.question_index
            + 1
    }

    /// Whether the question was answered or timed out
    pub fn is_answered(&self, round_index: usize, question_index: usize) -> bool {
        self.state.answered.contains(&QuestionKey {
            round: round_index,
            question: question_index,
        })
    }

    /// Runs an edit against the content store
    ///
    /// Indices pointing past the edited content fall back to the first
    /// question of the first round, and answered questions that no longer
    /// exist are forgotten.
    pub fn edit<T>(&mut self, f: impl FnOnce(&mut QuizContentStore<P>) -> T) -> T {
        let result = f(&mut self.store);
        self.revalidate();
        result
    }

    fn revalidate(&mut self) {
        let quiz = self.store.quiz();
        match quiz.round(self.state.round_index) {
            None => {
                self.state.round_index = 0;
                self.state.question_index = 0;
            }
            Some(round) if self.state.question_index >= round.len() => {
                self.state.question_index = 0;
            }
            Some(_) => {}
        }
        self.state
            .answered
            .retain(|key| quiz.question(key.round, key.question).is_some());
    }

    /// Replaces the session state, keeping timer epochs monotonic so ticks
    /// of the abandoned session stay stale
    fn renew_state(&mut self) {
        let timer_epoch = self.state.timer.epoch() + 1;
        self.state = SessionState::new(self.options.timer_warning_at(), timer_epoch);
    }

    /// Changes the slide, invalidating pending reveal and auto-advance
    /// alarms; the countdown only runs on the question slide
    fn set_slide(&mut self, slide: Slide) {
        tracing::debug!(from = ?self.state.slide, to = ?slide, "slide transition");
        self.state.slide = slide;
        self.slide_epoch += 1;
        if slide != Slide::Question {
            self.state.timer.pause();
        }
    }

    /// Attempts to transition from one slide to another
    ///
    /// # Returns
    ///
    /// `true` if the transition was made, `false` if the current slide
    /// didn't match
    fn change_slide(&mut self, before: Slide, after: Slide) -> bool {
        if self.state.slide == before {
            self.set_slide(after);
            true
        } else {
            false
        }
    }

    fn reject(&self, error: Error) -> Error {
        tracing::warn!(%error, slide = ?self.state.slide, "navigation rejected");
        error
    }

    fn awaiting_answer(&self) -> bool {
        self.state.slide == Slide::Question
            && !self.state.answer_revealed
            && self.current_question().is_some()
    }

    /// Starts the countdown and schedules its first tick
    fn start_ticking<S: FnMut(AlarmMessage, Duration)>(&mut self, schedule: &mut S) -> bool {
        if !self.awaiting_answer() || !self.state.timer.start() {
            return false;
        }
        schedule(
            AlarmMessage::Tick {
                epoch: self.state.timer.epoch(),
            },
            self.options.tick_interval(),
        );
        true
    }

    /// Makes the question at the indices current and shows it
    fn enter_question<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        round_index: usize,
        question_index: usize,
        schedule: &mut S,
    ) {
        self.state.round_index = round_index;
        self.state.question_index = question_index;
        self.state.clear_question();

        let time_limit = self.current_question().map_or(
            constants::question::DEFAULT_TIME_LIMIT,
            |question| question.time_limit().as_secs(),
        );
        self.state.timer.reset(time_limit);
        self.set_slide(Slide::Question);
        self.feedback.cue(Cue::Transition);

        if self.options.auto_start_timer() {
            self.start_ticking(schedule);
        }
    }

    /// Starts a new quiz from the home slide
    ///
    /// # Returns
    ///
    /// `true` if the quiz was started
    pub fn start_quiz(&mut self) -> bool {
        if self.state.slide != Slide::Home {
            return false;
        }
        tracing::info!(
            rounds = self.content().len(),
            questions = self.total_questions(),
            "starting quiz"
        );
        self.renew_state();
        self.set_slide(Slide::RoundSelect);
        true
    }

    /// Opens the question overview of a round
    ///
    /// # Errors
    ///
    /// Returns an error outside the selection slides or if the round does
    /// not exist; the state is left untouched.
    pub fn select_round(&mut self, round_index: usize) -> Result<(), Error> {
        if !matches!(
            self.state.slide,
            Slide::RoundSelect | Slide::QuestionSelect
        ) {
            return Err(self.reject(Error::NotAllowed(self.state.slide)));
        }
        if round_index >= self.content().len() {
            return Err(self.reject(Error::RoundOutOfRange(round_index)));
        }

        self.state.round_index = round_index;
        self.state.question_index = 0;
        self.state.clear_question();
        self.set_slide(Slide::QuestionSelect);
        Ok(())
    }

    /// Shows a question, resetting the countdown to its time limit
    ///
    /// # Errors
    ///
    /// Returns an error on the home and edit slides or if the question
    /// does not exist; the state is left untouched.
    pub fn select_question<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        round_index: usize,
        question_index: usize,
        mut schedule: S,
    ) -> Result<(), Error> {
        if matches!(self.state.slide, Slide::Home | Slide::Edit) {
            return Err(self.reject(Error::NotAllowed(self.state.slide)));
        }
        let Some(round) = self.content().round(round_index) else {
            return Err(self.reject(Error::RoundOutOfRange(round_index)));
        };
        if question_index >= round.len() {
            return Err(self.reject(Error::QuestionOutOfRange {
                round: round_index,
                question: question_index,
            }));
        }

        self.enter_question(round_index, question_index, &mut schedule);
        Ok(())
    }

    /// Answers the current question
    ///
    /// The answer is scored and revealed immediately; the feedback slide
    /// follows after the configured reveal delay.
    ///
    /// # Returns
    ///
    /// The evaluation, or `None` if no question is awaiting an answer
    pub fn submit_answer<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        label: OptionLabel,
        mut schedule: S,
    ) -> Option<Evaluation> {
        if !self.awaiting_answer() {
            return None;
        }
        self.feedback.cue(Cue::Select);
        self.resolve(Submission::Answer(label), &mut schedule)
    }

    /// Ends the current question without an answer
    ///
    /// Called when the countdown expires. Calling it earlier forces the
    /// expiry: the remaining time is set to zero before scoring.
    ///
    /// # Returns
    ///
    /// The evaluation, or `None` if no question is awaiting an answer
    pub fn timeout<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        mut schedule: S,
    ) -> Option<Evaluation> {
        self.resolve(Submission::Timeout, &mut schedule)
    }

    fn resolve<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        submission: Submission,
        schedule: &mut S,
    ) -> Option<Evaluation> {
        if !self.awaiting_answer() {
            return None;
        }
        let evaluation = scoring::evaluate(self.current_question()?, submission);
        let outcome = Outcome::of(submission, &evaluation);

        if submission == Submission::Timeout {
            self.state.timer.set_remaining(0);
        }
        self.state.selected_answer = submission.label();
        self.state.score = scoring::apply(self.state.score, &evaluation);
        if evaluation.is_correct {
            self.state.correct_answers += 1;
        }
        self.state.is_correct = Some(evaluation.is_correct);
        self.state.last_result = Some(evaluation);
        let key = self.state.key();
        self.state.answered.insert(key);
        self.state.timer.pause();
        self.state.answer_revealed = true;

        tracing::info!(
            round = key.round,
            question = key.question,
            ?outcome,
            score = self.state.score,
            "question resolved"
        );

        let reveal_delay = self.options.reveal_delay();
        if reveal_delay.is_zero() {
            self.show_feedback(outcome, schedule);
        } else {
            schedule(
                AlarmMessage::Reveal {
                    epoch: self.slide_epoch,
                },
                reveal_delay,
            );
        }

        Some(evaluation)
    }

    /// Outcome of a question that was resolved but is still on screen
    fn pending_outcome(&self) -> Option<Outcome> {
        if self.state.slide != Slide::Question || !self.state.answer_revealed {
            return None;
        }
        Some(match (self.state.selected_answer, self.state.is_correct) {
            (None, _) => Outcome::TimedOut,
            (Some(_), Some(true)) => Outcome::Correct,
            (Some(_), _) => Outcome::Wrong,
        })
    }

    fn show_feedback<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        outcome: Outcome,
        schedule: &mut S,
    ) {
        self.set_slide(Slide::of(outcome));
        self.feedback.cue(if outcome == Outcome::Correct {
            Cue::Correct
        } else {
            Cue::Incorrect
        });

        if let Some(delay) = self.options.auto_advance(outcome) {
            schedule(
                AlarmMessage::AutoAdvance {
                    epoch: self.slide_epoch,
                },
                delay,
            );
        }
    }

    fn finish_round(&mut self) {
        tracing::info!(
            round = self.state.round_index,
            score = self.state.score,
            "round complete"
        );
        self.set_slide(Slide::RoundComplete);
        self.feedback.cue(Cue::RoundComplete);
    }

    fn finish_quiz(&mut self) {
        tracing::info!(
            score = self.state.score,
            correct_answers = self.state.correct_answers,
            "quiz complete"
        );
        self.set_slide(Slide::Complete);
        self.feedback.cue(Cue::RoundComplete);
    }

    /// Leaves a feedback slide for the next question of the round, or for
    /// the round summary after the last one
    ///
    /// # Returns
    ///
    /// `true` if a feedback slide was left
    pub fn continue_after_feedback<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        mut schedule: S,
    ) -> bool {
        if !self.state.slide.is_feedback() {
            return false;
        }
        self.state.last_result = None;

        let next = self.state.question_index + 1;
        if self
            .current_round()
            .is_some_and(|round| next < round.len())
        {
            self.enter_question(self.state.round_index, next, &mut schedule);
        } else {
            self.finish_round();
        }
        true
    }

    /// Leaves the round summary for the first question of the next round,
    /// or for the final slide after the last round
    ///
    /// # Returns
    ///
    /// `true` if the round summary was left
    pub fn go_to_next_round<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) -> bool {
        if self.state.slide != Slide::RoundComplete {
            return false;
        }

        let next = self.state.round_index + 1;
        if next < self.content().len() {
            self.enter_question(next, 0, &mut schedule);
        } else {
            self.finish_quiz();
        }
        true
    }

    /// Shows the current question again as if it had never been answered
    ///
    /// Score, correct answers and the answered set are kept.
    ///
    /// # Returns
    ///
    /// `true` if a question or feedback slide was reset
    pub fn reset_question<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) -> bool {
        if !self.state.slide.shows_question() {
            return false;
        }
        self.enter_question(
            self.state.round_index,
            self.state.question_index,
            &mut schedule,
        );
        true
    }

    /// Abandons the session and returns to the home slide
    pub fn reset_quiz(&mut self) {
        tracing::info!(score = self.state.score, "resetting quiz");
        self.renew_state();
        self.set_slide(Slide::Home);
    }

    /// Switches between the home slide and content editing
    ///
    /// # Returns
    ///
    /// `true` if the mode was switched
    pub fn toggle_edit_mode(&mut self) -> bool {
        self.change_slide(Slide::Home, Slide::Edit) || self.change_slide(Slide::Edit, Slide::Home)
    }

    /// Returns to the round selection
    ///
    /// # Returns
    ///
    /// `true` if the round selection is shown
    pub fn back_to_rounds(&mut self) -> bool {
        if matches!(self.state.slide, Slide::Home | Slide::Edit) {
            return false;
        }
        self.state.clear_question();
        self.set_slide(Slide::RoundSelect);
        true
    }

    /// Returns to the question overview of the current round
    ///
    /// # Returns
    ///
    /// `true` if the question overview is shown
    pub fn back_to_questions(&mut self) -> bool {
        if !(self.state.slide.shows_question() || self.state.slide == Slide::RoundComplete) {
            return false;
        }
        self.state.clear_question();
        self.set_slide(Slide::QuestionSelect);
        true
    }

    /// Moves to the following question, crossing into the next non-empty
    /// round; past the last question the quiz is complete
    ///
    /// # Returns
    ///
    /// `true` if the session moved
    pub fn next_question<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) -> bool {
        if !self.state.slide.shows_question() {
            return false;
        }
        let QuestionKey { round, question } = self.state.key();
        let quiz = self.content();

        let next = if quiz.round(round).is_some_and(|r| question + 1 < r.len()) {
            Some((round, question + 1))
        } else {
            (round + 1..quiz.len())
                .find(|index| quiz.round(*index).is_some_and(|r| !r.is_empty()))
                .map(|index| (index, 0))
        };

        match next {
            Some((round, question)) => self.enter_question(round, question, &mut schedule),
            None => self.finish_quiz(),
        }
        true
    }

    /// Moves to the preceding question, crossing into the previous
    /// non-empty round
    ///
    /// # Returns
    ///
    /// `true` if the session moved, `false` on the very first question
    pub fn previous_question<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) -> bool {
        if !self.state.slide.shows_question() {
            return false;
        }
        let QuestionKey { round, question } = self.state.key();
        let quiz = self.content();

        let previous = if question > 0 {
            Some((round, question - 1))
        } else {
            (0..round).rev().find_map(|index| {
                quiz.round(index)
                    .filter(|r| !r.is_empty())
                    .map(|r| (index, r.len() - 1))
            })
        };

        match previous {
            Some((round, question)) => {
                self.enter_question(round, question, &mut schedule);
                true
            }
            None => false,
        }
    }

    /// Starts the countdown of an unanswered question
    ///
    /// # Returns
    ///
    /// `true` if the countdown was started
    pub fn start_timer<S: FnMut(AlarmMessage, Duration)>(&mut self, mut schedule: S) -> bool {
        self.start_ticking(&mut schedule)
    }

    /// Pauses the countdown
    ///
    /// # Returns
    ///
    /// `true` if the countdown was running
    pub fn pause_timer(&mut self) -> bool {
        self.state.slide == Slide::Question && self.state.timer.pause()
    }

    /// Resets the countdown of an unanswered question to `seconds` and
    /// pauses it
    ///
    /// # Returns
    ///
    /// `true` if the countdown was reset
    pub fn reset_timer(&mut self, seconds: u64) -> bool {
        if !self.awaiting_answer() {
            return false;
        }
        self.state.timer.reset(seconds);
        true
    }

    /// Overrides the remaining seconds of an unanswered question
    ///
    /// A running countdown keeps running; at zero it holds without a timeout
    /// and counts down again once a new value is set.
    ///
    /// # Returns
    ///
    /// `true` if the value was changed
    pub fn set_time_remaining(&mut self, seconds: u64) -> bool {
        if !self.awaiting_answer() {
            return false;
        }
        self.state.timer.set_remaining(seconds);
        true
    }

    /// Handles a previously scheduled alarm
    ///
    /// Alarms scheduled before the session moved on are dropped.
    ///
    /// # Arguments
    ///
    /// * `message` - The alarm that fired
    /// * `schedule` - Function to schedule follow-up alarms
    pub fn receive_alarm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        mut schedule: S,
    ) {
        match message {
            AlarmMessage::Tick { epoch } if epoch == self.state.timer.epoch() => {
                match self.state.timer.tick() {
                    Tick::Ignored if self.state.timer.running() => {
                        schedule(
                            AlarmMessage::Tick {
                                epoch: self.state.timer.epoch(),
                            },
                            self.options.tick_interval(),
                        );
                    }
                    Tick::Ignored => {}
                    tick @ (Tick::Counted(_) | Tick::Warning(_)) => {
                        if let Tick::Warning(remaining) = tick {
                            tracing::debug!(remaining, "timer warning");
                            self.feedback.cue(Cue::TimerWarning);
                        }
                        schedule(
                            AlarmMessage::Tick {
                                epoch: self.state.timer.epoch(),
                            },
                            self.options.tick_interval(),
                        );
                    }
                    Tick::Expired => {
                        tracing::debug!("timer expired");
                        self.timeout(&mut schedule);
                    }
                }
            }
            AlarmMessage::Reveal { epoch } if epoch == self.slide_epoch => {
                if let Some(outcome) = self.pending_outcome() {
                    self.show_feedback(outcome, &mut schedule);
                }
            }
            AlarmMessage::AutoAdvance { epoch } if epoch == self.slide_epoch => {
                self.continue_after_feedback(schedule);
            }
            AlarmMessage::Tick { .. }
            | AlarmMessage::Reveal { .. }
            | AlarmMessage::AutoAdvance { .. } => {
                tracing::trace!(?message, "dropping stale alarm");
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        constants::session,
        quiz::question::AnswerOption,
        store::MemoryPersistence,
    };

    type Alarms = Vec<(AlarmMessage, Duration)>;

    #[derive(Debug, Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Cue>>>);

    impl FeedbackSink for Recorder {
        fn cue(&self, cue: Cue) {
            self.0.borrow_mut().push(cue);
        }
    }

    impl Recorder {
        fn cues(&self) -> Vec<Cue> {
            self.0.borrow().clone()
        }

        fn count(&self, cue: Cue) -> usize {
            self.0.borrow().iter().filter(|c| **c == cue).count()
        }
    }

    fn capture(alarms: &mut Alarms) -> impl FnMut(AlarmMessage, Duration) + '_ {
        move |message, delay| alarms.push((message, delay))
    }

    fn ignore(_: AlarmMessage, _: Duration) {}

    fn create_test_game_with(
        quiz: &Quiz,
        options: Options,
    ) -> (Game<MemoryPersistence, Recorder>, Recorder) {
        let recorder = Recorder::default();
        let store = QuizContentStore::load(MemoryPersistence::with_quiz(quiz).unwrap());
        (Game::new(store, options, recorder.clone()), recorder)
    }

    fn create_test_game(options: Options) -> (Game<MemoryPersistence, Recorder>, Recorder) {
        create_test_game_with(&Quiz::built_in(), options)
    }

    fn create_test_question(points: u64, negative_points: u64, seconds: u64) -> Question {
        Question::new(
            "Pick A",
            vec![
                AnswerOption::new(OptionLabel::A, "this one"),
                AnswerOption::new(OptionLabel::B, "not this one"),
            ],
            OptionLabel::A,
            points,
        )
        .with_negative_points(negative_points)
        .with_time_limit(Duration::from_secs(seconds))
    }

    /// Replays alarms until none are left
    fn drain(game: &mut Game<MemoryPersistence, Recorder>, alarms: &mut Alarms) -> usize {
        let mut fired = 0;
        while let Some((message, _)) = alarms.pop() {
            fired += 1;
            game.receive_alarm(message, capture(alarms));
        }
        fired
    }

    fn enter(game: &mut Game<MemoryPersistence, Recorder>, round: usize, question: usize) {
        assert!(game.start_quiz());
        game.select_round(round).unwrap();
        game.select_question(round, question, ignore).unwrap();
    }

    #[test]
    fn test_new_game_starts_home() {
        let (game, _) = create_test_game(Options::default());
        assert_eq!(game.slide(), Slide::Home);
        assert_eq!(game.state().score(), 0);
        assert_eq!(game.state().timer().remaining(), 60);
        assert!(!game.state().timer().running());
    }

    #[test]
    fn test_correct_answer_flow() {
        let (mut game, recorder) = create_test_game(Options::default());
        assert!(game.start_quiz());
        assert_eq!(game.slide(), Slide::RoundSelect);
        game.select_round(0).unwrap();
        assert_eq!(game.slide(), Slide::QuestionSelect);
        game.select_question(0, 0, ignore).unwrap();
        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().timer().remaining(), 60);
        assert!(game.state().timer().running());

        let evaluation = game.submit_answer(OptionLabel::C, ignore).unwrap();

        assert!(evaluation.is_correct);
        assert_eq!(game.slide(), Slide::FeedbackCorrect);
        assert_eq!(game.state().score(), 10);
        assert_eq!(game.state().correct_answers(), 1);
        assert_eq!(game.state().selected_answer(), Some(OptionLabel::C));
        assert_eq!(game.state().is_correct(), Some(true));
        assert!(game.state().answer_revealed());
        assert_eq!(game.state().last_result(), Some(&evaluation));
        assert!(game.is_answered(0, 0));
        assert!(!game.state().timer().running());
        assert_eq!(
            recorder.cues(),
            vec![Cue::Transition, Cue::Select, Cue::Correct]
        );
    }

    #[test]
    fn test_double_submission_is_ignored() {
        let (mut game, recorder) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        assert!(game.submit_answer(OptionLabel::A, ignore).is_some());
        let state = game.state().clone();

        assert!(game.submit_answer(OptionLabel::C, ignore).is_none());
        assert!(game.timeout(ignore).is_none());
        assert_eq!(game.state(), &state);
        assert_eq!(recorder.count(Cue::Select), 1);
    }

    #[test]
    fn test_two_questions_end_in_round_complete() {
        let (mut game, recorder) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        game.submit_answer(OptionLabel::C, ignore);
        assert!(game.continue_after_feedback(ignore));
        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().question_index(), 1);
        assert_eq!(game.state().last_result(), None);
        assert_eq!(game.state().selected_answer(), None);
        assert!(!game.state().answer_revealed());

        game.submit_answer(OptionLabel::A, ignore);
        assert_eq!(game.slide(), Slide::FeedbackWrong);
        assert_eq!(game.state().score(), 10);
        assert_eq!(game.state().correct_answers(), 1);

        assert!(game.continue_after_feedback(ignore));
        assert_eq!(game.slide(), Slide::RoundComplete);
        assert_eq!(recorder.cues().last(), Some(&Cue::RoundComplete));
        assert_eq!(game.state().answered().len(), 2);
    }

    #[test]
    fn test_timeout_with_negative_points_floors_score() {
        let quiz = Quiz::new(vec![Round::new(
            "Round 1",
            "Penalties",
            vec![
                create_test_question(3, 0, 30),
                create_test_question(20, 5, 5),
            ],
        )]);
        let (mut game, recorder) = create_test_game_with(&quiz, Options::default());
        enter(&mut game, 0, 0);
        game.submit_answer(OptionLabel::A, ignore);
        assert_eq!(game.state().score(), 3);

        let mut alarms = Alarms::new();
        assert!(game.continue_after_feedback(capture(&mut alarms)));
        assert_eq!(game.state().timer().remaining(), 5);

        let fired = drain(&mut game, &mut alarms);

        assert_eq!(fired, 5);
        assert_eq!(game.slide(), Slide::Timeout);
        assert_eq!(game.state().score(), 0);
        assert_eq!(game.state().is_correct(), Some(false));
        assert_eq!(game.state().selected_answer(), None);
        assert_eq!(
            game.state().last_result(),
            Some(&Evaluation {
                awarded_points: 0,
                is_correct: false,
                deducted_points: 5,
            })
        );
        assert!(game.is_answered(0, 1));
        assert_eq!(recorder.cues().last(), Some(&Cue::Incorrect));
    }

    #[test]
    fn test_reset_question_after_wrong_answer() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        game.submit_answer(OptionLabel::B, ignore);
        assert_eq!(game.slide(), Slide::FeedbackWrong);

        assert!(game.reset_question(ignore));
        assert_eq!(game.slide(), Slide::Question);
        assert!(!game.state().answer_revealed());
        assert_eq!(game.state().selected_answer(), None);
        assert_eq!(game.state().is_correct(), None);
        assert_eq!(game.state().timer().remaining(), 60);
        assert!(game.is_answered(0, 0));

        let evaluation = game.submit_answer(OptionLabel::C, ignore).unwrap();
        assert!(evaluation.is_correct);
        assert_eq!(game.state().score(), 10);
    }

    #[test]
    fn test_invalid_indices_leave_state_untouched() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        let state = game.state().clone();

        assert_eq!(game.select_round(5), Err(Error::RoundOutOfRange(5)));
        assert_eq!(
            game.select_question(0, 9, ignore),
            Err(Error::QuestionOutOfRange {
                round: 0,
                question: 9
            })
        );
        assert_eq!(
            game.select_question(7, 0, ignore),
            Err(Error::RoundOutOfRange(7))
        );
        assert_eq!(game.state(), &state);
    }

    #[test]
    fn test_navigation_outside_its_slides_is_rejected() {
        let (mut game, _) = create_test_game(Options::default());
        assert_eq!(game.select_round(0), Err(Error::NotAllowed(Slide::Home)));
        assert_eq!(
            game.select_question(0, 0, ignore),
            Err(Error::NotAllowed(Slide::Home))
        );
        assert!(game.submit_answer(OptionLabel::A, ignore).is_none());
        assert!(!game.continue_after_feedback(ignore));
        assert!(!game.go_to_next_round(ignore));
        assert!(!game.reset_question(ignore));
        assert_eq!(game.slide(), Slide::Home);
    }

    #[test]
    fn test_correct_feedback_auto_advances() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        game.submit_answer(OptionLabel::C, capture(&mut alarms));
        let (message, delay) = alarms.pop().unwrap();
        assert!(matches!(message, AlarmMessage::AutoAdvance { .. }));
        assert_eq!(delay, Duration::from_millis(2500));

        game.receive_alarm(message, ignore);
        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().question_index(), 1);
    }

    #[test]
    fn test_wrong_feedback_never_auto_advances() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        game.submit_answer(OptionLabel::A, capture(&mut alarms));
        assert!(alarms.is_empty());
        assert_eq!(game.slide(), Slide::FeedbackWrong);
    }

    #[test]
    fn test_timeout_auto_advance_is_configurable() {
        let options = Options::default().with_auto_advance(
            Outcome::TimedOut,
            Some(Duration::from_millis(session::TIMEOUT_AUTO_ADVANCE_MILLIS)),
        );
        let (mut game, _) = create_test_game(options);
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        game.timeout(capture(&mut alarms));
        assert_eq!(game.slide(), Slide::Timeout);
        let (message, delay) = alarms.pop().unwrap();
        assert_eq!(delay, Duration::from_millis(3500));

        game.receive_alarm(message, ignore);
        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().question_index(), 1);
    }

    #[test]
    fn test_competing_transition_cancels_auto_advance() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        game.submit_answer(OptionLabel::C, capture(&mut alarms));
        let (message, _) = alarms.pop().unwrap();

        assert!(game.reset_question(ignore));
        game.receive_alarm(message, ignore);

        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().question_index(), 0);
    }

    #[test]
    fn test_reveal_delay_defers_feedback() {
        let options = Options::default().with_reveal_delay(Duration::from_millis(800));
        let (mut game, recorder) = create_test_game(options);
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        let evaluation = game.submit_answer(OptionLabel::C, capture(&mut alarms));
        assert!(evaluation.is_some());
        assert_eq!(game.slide(), Slide::Question);
        assert!(game.state().answer_revealed());
        assert_eq!(game.state().score(), 10);
        assert!(game.submit_answer(OptionLabel::A, ignore).is_none());

        let (message, delay) = alarms.pop().unwrap();
        assert!(matches!(message, AlarmMessage::Reveal { .. }));
        assert_eq!(delay, Duration::from_millis(800));

        game.receive_alarm(message, capture(&mut alarms));
        assert_eq!(game.slide(), Slide::FeedbackCorrect);
        assert_eq!(recorder.cues().last(), Some(&Cue::Correct));
        assert!(matches!(
            alarms.pop(),
            Some((AlarmMessage::AutoAdvance { .. }, _))
        ));
    }

    #[test]
    fn test_reset_question_drops_pending_reveal() {
        let options = Options::default().with_reveal_delay(Duration::from_millis(800));
        let (mut game, _) = create_test_game(options);
        enter(&mut game, 0, 0);

        let mut alarms = Alarms::new();
        game.submit_answer(OptionLabel::A, capture(&mut alarms));
        let (message, _) = alarms.pop().unwrap();

        assert!(game.reset_question(ignore));
        game.receive_alarm(message, ignore);

        assert_eq!(game.slide(), Slide::Question);
        assert!(!game.state().answer_revealed());
    }

    #[test]
    fn test_countdown_expires_into_timeout() {
        let (mut game, recorder) = create_test_game(Options::default());
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].1, Duration::from_secs(1));

        let fired = drain(&mut game, &mut alarms);

        assert_eq!(fired, 60);
        assert_eq!(game.slide(), Slide::Timeout);
        assert_eq!(game.state().timer().remaining(), 0);
        assert_eq!(game.state().score(), 0);
        assert_eq!(recorder.count(Cue::TimerWarning), 1);
        assert_eq!(
            recorder.cues(),
            vec![Cue::Transition, Cue::TimerWarning, Cue::Incorrect]
        );
    }

    #[test]
    fn test_ticks_after_answer_are_dropped() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        let (tick, _) = alarms.pop().unwrap();
        game.receive_alarm(tick, capture(&mut alarms));
        assert_eq!(game.state().timer().remaining(), 59);

        game.submit_answer(OptionLabel::B, ignore);
        let before = game.state().clone();
        drain(&mut game, &mut alarms);
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_pause_drops_scheduled_tick() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        assert!(game.pause_timer());
        assert!(!game.pause_timer());

        drain(&mut game, &mut alarms);
        assert_eq!(game.state().timer().remaining(), 60);

        assert!(game.start_timer(capture(&mut alarms)));
        assert!(!game.start_timer(capture(&mut alarms)));
        assert_eq!(alarms.len(), 1);
        let (tick, _) = alarms.pop().unwrap();
        game.receive_alarm(tick, ignore);
        assert_eq!(game.state().timer().remaining(), 59);
    }

    #[test]
    fn test_timer_controls() {
        let options = Options::default().with_auto_start_timer(false);
        let (mut game, _) = create_test_game(options);
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        assert!(alarms.is_empty());
        assert!(!game.state().timer().running());

        assert!(game.set_time_remaining(15));
        assert_eq!(game.state().timer().remaining(), 15);
        assert!(game.reset_timer(30));
        assert_eq!(game.state().timer().remaining(), 30);

        game.submit_answer(OptionLabel::C, ignore);
        assert!(!game.reset_timer(30));
        assert!(!game.set_time_remaining(3));
        assert!(!game.start_timer(ignore));
    }

    #[test]
    fn test_tick_from_abandoned_session_is_stale() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        let (abandoned, _) = alarms.pop().unwrap();

        game.reset_quiz();
        assert!(game.start_quiz());
        game.select_round(0).unwrap();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        let (current, _) = alarms.pop().unwrap();
        assert_ne!(abandoned, current);

        game.receive_alarm(abandoned, capture(&mut alarms));
        assert_eq!(game.state().timer().remaining(), 60);
        assert!(alarms.is_empty());

        game.receive_alarm(current, capture(&mut alarms));
        assert_eq!(game.state().timer().remaining(), 59);
        assert_eq!(alarms.len(), 1);
    }

    #[test]
    fn test_countdown_resumes_after_holding_at_zero() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        game.select_round(0).unwrap();

        let mut alarms = Alarms::new();
        game.select_question(0, 0, capture(&mut alarms)).unwrap();
        assert!(game.set_time_remaining(0));

        let (tick, _) = alarms.pop().unwrap();
        game.receive_alarm(tick, capture(&mut alarms));
        assert_eq!(game.slide(), Slide::Question);
        assert!(game.state().timer().running());
        assert_eq!(game.state().timer().remaining(), 0);
        assert_eq!(alarms.len(), 1);

        assert!(game.set_time_remaining(20));
        let (tick, _) = alarms.pop().unwrap();
        game.receive_alarm(tick, capture(&mut alarms));
        assert_eq!(game.state().timer().remaining(), 19);
        assert_eq!(alarms.len(), 1);
    }

    #[test]
    fn test_early_timeout_forces_expiry() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);
        assert_eq!(game.state().timer().remaining(), 60);

        assert!(game.timeout(ignore).is_some());

        assert_eq!(game.slide(), Slide::Timeout);
        assert_eq!(game.state().timer().remaining(), 0);
        assert!(!game.state().timer().running());
    }

    #[test]
    fn test_rounds_then_complete() {
        let (mut game, recorder) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        game.submit_answer(OptionLabel::C, ignore);
        game.continue_after_feedback(ignore);
        game.submit_answer(OptionLabel::B, ignore);
        game.continue_after_feedback(ignore);
        assert_eq!(game.slide(), Slide::RoundComplete);

        assert!(game.go_to_next_round(ignore));
        assert_eq!(game.slide(), Slide::Question);
        assert_eq!(game.state().key(), QuestionKey { round: 1, question: 0 });

        game.submit_answer(OptionLabel::C, ignore);
        game.continue_after_feedback(ignore);
        assert_eq!(game.slide(), Slide::RoundComplete);

        assert!(game.go_to_next_round(ignore));
        assert_eq!(game.slide(), Slide::Complete);
        assert_eq!(game.state().score(), 40);
        assert_eq!(game.state().correct_answers(), 3);
        assert_eq!(recorder.count(Cue::RoundComplete), 3);
    }

    #[test]
    fn test_reset_quiz_clears_session() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);
        game.submit_answer(OptionLabel::C, ignore);

        game.reset_quiz();

        assert_eq!(game.slide(), Slide::Home);
        assert_eq!(game.state().score(), 0);
        assert_eq!(game.state().correct_answers(), 0);
        assert!(game.state().answered().is_empty());
        assert_eq!(game.state().key(), QuestionKey { round: 0, question: 0 });
    }

    #[test]
    fn test_start_quiz_resets_previous_results() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);
        game.submit_answer(OptionLabel::C, ignore);
        assert!(!game.start_quiz());

        game.reset_quiz();
        assert!(game.start_quiz());
        assert_eq!(game.state().score(), 0);
        assert!(!game.is_answered(0, 0));
    }

    #[test]
    fn test_toggle_edit_mode() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.toggle_edit_mode());
        assert_eq!(game.slide(), Slide::Edit);
        assert!(!game.start_quiz());
        assert!(game.toggle_edit_mode());
        assert_eq!(game.slide(), Slide::Home);

        assert!(game.start_quiz());
        assert!(!game.toggle_edit_mode());
        assert_eq!(game.slide(), Slide::RoundSelect);
    }

    #[test]
    fn test_progress_queries() {
        let (mut game, _) = create_test_game(Options::default());
        assert_eq!(game.total_questions(), 3);
        assert_eq!(game.total_points(), 40);
        assert_eq!(game.round_points(1), Some(20));
        assert_eq!(game.round_points(2), None);

        enter(&mut game, 1, 0);
        assert_eq!(game.overall_question_number(), 3);
        assert_eq!(game.current_round().map(|r| r.theme.as_str()), Some("Cybersecurity"));
        assert_eq!(
            game.current_question().map(Question::negative_points),
            Some(5)
        );
    }

    #[test]
    fn test_free_navigation_crosses_rounds() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 0);

        assert!(!game.previous_question(ignore));
        assert!(game.next_question(ignore));
        assert_eq!(game.state().key(), QuestionKey { round: 0, question: 1 });
        assert!(game.next_question(ignore));
        assert_eq!(game.state().key(), QuestionKey { round: 1, question: 0 });
        assert_eq!(game.state().timer().remaining(), 60);

        assert!(game.previous_question(ignore));
        assert_eq!(game.state().key(), QuestionKey { round: 0, question: 1 });

        assert!(game.next_question(ignore));
        assert!(game.next_question(ignore));
        assert_eq!(game.slide(), Slide::Complete);
    }

    #[test]
    fn test_back_navigation() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 0, 1);
        assert!(game.state().timer().running());

        assert!(game.back_to_questions());
        assert_eq!(game.slide(), Slide::QuestionSelect);
        assert!(!game.state().timer().running());
        assert!(!game.back_to_questions());

        assert!(game.back_to_rounds());
        assert_eq!(game.slide(), Slide::RoundSelect);
        game.select_round(1).unwrap();
        assert_eq!(game.state().key(), QuestionKey { round: 1, question: 0 });
    }

    #[test]
    fn test_edit_revalidates_indices() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 1, 0);
        game.submit_answer(OptionLabel::C, ignore);
        assert!(game.is_answered(1, 0));

        let deleted = game.edit(|store| store.delete_round(1));

        assert!(deleted.is_ok());
        assert_eq!(game.state().key(), QuestionKey { round: 0, question: 0 });
        assert!(game.state().answered().is_empty());
        assert_eq!(game.total_questions(), 2);
    }

    #[test]
    fn test_missing_question_is_a_no_op() {
        let (mut game, _) = create_test_game(Options::default());
        enter(&mut game, 1, 0);
        game.edit(|store| store.delete_question(1, 0)).unwrap();

        assert!(game.current_question().is_none());
        assert!(game.submit_answer(OptionLabel::C, ignore).is_none());
        assert!(game.timeout(ignore).is_none());
        assert!(!game.start_timer(ignore));
        assert_eq!(game.state().score(), 0);
    }

    #[test]
    fn test_state_snapshot_serialization() {
        let (mut game, _) = create_test_game(Options::default());
        assert!(game.start_quiz());
        let json = serde_json::to_value(game.state()).unwrap();
        assert_eq!(json["slide"], "round-select");
        assert_eq!(json["score"], 0);
        assert!(json.get("selected_answer").is_none());
    }
}
