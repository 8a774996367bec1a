//! Question-by-question state machine shared by quizzes and exams.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use tracing::debug;

use drill_core::grading::answers_match;
use drill_core::time::Deadline;

use crate::error::SessionError;
use crate::question::Question;

//
// ─── PUBLIC VALUES ─────────────────────────────────────────────────────────────
//

/// Lifecycle of a running session.
///
/// `Finished` and `Aborted` are terminal. `Resting` only occurs in exams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Ready,
    AwaitingAnswer,
    Feedback,
    Resting,
    Finished,
    Aborted,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }
}

/// A learner's submission for the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Index into the question's options.
    Choice(usize),
    /// Free text; blank text is ignored.
    Text(String),
}

/// Result of scoring one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub correct: bool,
    pub expected: String,
    /// What was submitted; `None` when the timer ran out.
    pub given: Option<String>,
    pub timed_out: bool,
}

/// Where `advance` moved the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Now awaiting the answer to this question index.
    Next(usize),
    /// Rest checkpoint with this 1-based number; call `resume` to continue.
    Checkpoint(usize),
    Finished,
}

/// What a timer tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    TimedOut(Feedback),
    Advanced(Advance),
}

/// One scored question, kept for review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub index: usize,
    pub given: Option<String>,
    pub correct: bool,
    pub timed_out: bool,
}

/// Read-only view for presenters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub index: usize,
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub question: Option<Question>,
    pub feedback: Option<Feedback>,
    /// Time left on the question timer while awaiting an answer.
    pub time_remaining: Option<Duration>,
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub(crate) struct Runner {
    questions: Vec<Question>,
    state: SessionState,
    current: usize,
    correct: usize,
    records: Vec<AnswerRecord>,
    timer: Option<Deadline>,
    feedback: Option<Feedback>,
    question_time: Duration,
    feedback_delay: Duration,
    checkpoint_every: Option<usize>,
    checkpoints_shown: BTreeSet<usize>,
    finished_at: Option<DateTime<Utc>>,
}

impl Runner {
    pub(crate) fn new(
        questions: Vec<Question>,
        question_time: Duration,
        feedback_delay: Duration,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            questions,
            state: SessionState::Ready,
            current: 0,
            correct: 0,
            records: Vec::new(),
            timer: None,
            feedback: None,
            question_time,
            feedback_delay,
            checkpoint_every: None,
            checkpoints_shown: BTreeSet::new(),
            finished_at: None,
        })
    }

    pub(crate) fn with_checkpoints(mut self, every: usize) -> Self {
        self.checkpoint_every = (every > 0).then_some(every);
        self
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub(crate) fn index(&self) -> usize {
        self.current
    }

    pub(crate) fn total(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn correct(&self) -> usize {
        self.correct
    }

    pub(crate) fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub(crate) fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// The question being answered, shown as feedback, or next after a rest.
    pub(crate) fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::AwaitingAnswer | SessionState::Feedback | SessionState::Resting => {
                self.questions.get(self.current)
            }
            _ => None,
        }
    }

    pub(crate) fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != SessionState::Ready {
            return false;
        }
        self.current = 0;
        self.correct = 0;
        self.records.clear();
        self.await_answer(now);
        true
    }

    /// Scores the current question. Out-of-state calls, blank text and
    /// out-of-range choices are ignored.
    pub(crate) fn submit(&mut self, answer: Answer, now: DateTime<Utc>) -> Option<Feedback> {
        if self.state != SessionState::AwaitingAnswer {
            return None;
        }
        if self.timer.is_some_and(|timer| timer.is_expired(now)) {
            return Some(self.score(None, false, now));
        }
        let question = self.questions.get(self.current)?;
        let (given, correct) = match answer {
            Answer::Choice(idx) => {
                let option = question.options.get(idx)?;
                (option.clone(), *option == question.expected)
            }
            Answer::Text(text) => {
                if text.trim().is_empty() {
                    return None;
                }
                let correct = answers_match(&text, &question.expected);
                (text, correct)
            }
        };
        Some(self.score(Some(given), correct, now))
    }

    pub(crate) fn tick(&mut self, now: DateTime<Utc>) -> Option<Tick> {
        let expired = self.timer.is_some_and(|timer| timer.is_expired(now));
        if !expired {
            return None;
        }
        match self.state {
            SessionState::AwaitingAnswer => Some(Tick::TimedOut(self.score(None, false, now))),
            SessionState::Feedback => self.advance(now).map(Tick::Advanced),
            _ => None,
        }
    }

    pub(crate) fn advance(&mut self, now: DateTime<Utc>) -> Option<Advance> {
        if self.state != SessionState::Feedback {
            return None;
        }
        self.feedback = None;
        let next = self.current + 1;
        if next >= self.questions.len() {
            self.state = SessionState::Finished;
            self.timer = None;
            self.finished_at = Some(now);
            debug!(correct = self.correct, total = self.questions.len(), "session finished");
            return Some(Advance::Finished);
        }
        self.current = next;
        if let Some(every) = self.checkpoint_every {
            let block = next / every;
            if next % every == 0 && self.checkpoints_shown.insert(block) {
                self.state = SessionState::Resting;
                self.timer = None;
                return Some(Advance::Checkpoint(block));
            }
        }
        self.await_answer(now);
        Some(Advance::Next(next))
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != SessionState::Resting {
            return false;
        }
        self.await_answer(now);
        true
    }

    /// Disarms every timer and discards progress. Returns false once the
    /// session is terminal; a finished session keeps its result.
    pub(crate) fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Aborted;
        self.timer = None;
        self.feedback = None;
        true
    }

    pub(crate) fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        let time_remaining = match (self.state, self.timer) {
            (SessionState::AwaitingAnswer, Some(timer)) => Some(timer.remaining(now)),
            _ => None,
        };
        SessionSnapshot {
            state: self.state,
            index: self.current,
            total: self.questions.len(),
            answered: self.records.len(),
            correct: self.correct,
            question: self.current_question().cloned(),
            feedback: self.feedback.clone(),
            time_remaining,
        }
    }

    fn await_answer(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::AwaitingAnswer;
        self.timer = Some(Deadline::after(now, self.question_time));
    }

    fn score(&mut self, given: Option<String>, correct: bool, now: DateTime<Utc>) -> Feedback {
        let timed_out = given.is_none();
        if correct {
            self.correct += 1;
        }
        self.records.push(AnswerRecord {
            index: self.current,
            given: given.clone(),
            correct,
            timed_out,
        });
        let feedback = Feedback {
            correct,
            expected: self
                .questions
                .get(self.current)
                .map(|q| q.expected.clone())
                .unwrap_or_default(),
            given,
            timed_out,
        };
        self.feedback = Some(feedback.clone());
        self.state = SessionState::Feedback;
        self.timer = Some(Deadline::after(now, self.feedback_delay));
        feedback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::time::fixed_now;

    fn runner(n: usize) -> Runner {
        let questions = (0..n)
            .map(|i| Question::typed(format!("q{i}"), format!("el a{i}")))
            .collect();
        Runner::new(questions, Duration::seconds(20), Duration::milliseconds(1500)).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        fixed_now() + Duration::seconds(n)
    }

    #[test]
    fn empty_question_list_is_rejected() {
        let err = Runner::new(Vec::new(), Duration::seconds(1), Duration::seconds(1)).unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn submit_is_scored_once_per_question() {
        let mut r = runner(2);
        assert!(r.start(fixed_now()));
        let first = r.submit(Answer::Text("a0".into()), secs(1)).unwrap();
        assert!(first.correct);
        assert!(r.submit(Answer::Text("a0".into()), secs(1)).is_none());
        assert!(r.submit(Answer::Text("a0".into()), secs(2)).is_none());
        assert_eq!(r.correct(), 1);
        assert_eq!(r.records().len(), 1);
    }

    #[test]
    fn blank_text_and_bad_choice_are_ignored() {
        let mut r = runner(1);
        r.start(fixed_now());
        assert!(r.submit(Answer::Text("   ".into()), secs(1)).is_none());
        assert!(r.submit(Answer::Choice(0), secs(1)).is_none());
        assert_eq!(r.state(), SessionState::AwaitingAnswer);
    }

    #[test]
    fn timeout_scores_incorrect_then_feedback_delay_advances() {
        let mut r = runner(2);
        r.start(fixed_now());
        assert!(r.tick(secs(19)).is_none());

        let Some(Tick::TimedOut(feedback)) = r.tick(secs(20)) else {
            panic!("expected timeout");
        };
        assert!(feedback.timed_out);
        assert!(!feedback.correct);
        assert_eq!(feedback.expected, "el a0");

        assert!(r.tick(secs(21)).is_none());
        assert_eq!(
            r.tick(secs(22)),
            Some(Tick::Advanced(Advance::Next(1)))
        );
        assert_eq!(r.state(), SessionState::AwaitingAnswer);
    }

    #[test]
    fn late_submit_counts_as_timeout() {
        let mut r = runner(1);
        r.start(fixed_now());
        let feedback = r.submit(Answer::Text("a0".into()), secs(25)).unwrap();
        assert!(feedback.timed_out);
        assert_eq!(r.correct(), 0);
    }

    #[test]
    fn finishes_after_last_question_and_stays_terminal() {
        let mut r = runner(1);
        r.start(fixed_now());
        r.submit(Answer::Text("el a0".into()), secs(1));
        assert_eq!(r.advance(secs(2)), Some(Advance::Finished));
        assert_eq!(r.state(), SessionState::Finished);
        assert_eq!(r.finished_at(), Some(secs(2)));
        assert!(r.advance(secs(3)).is_none());
        assert!(r.submit(Answer::Text("a0".into()), secs(3)).is_none());
        assert!(!r.start(secs(3)));
    }

    #[test]
    fn checkpoints_rest_once_per_block() {
        let mut r = runner(5).with_checkpoints(2);
        r.start(fixed_now());
        let mut checkpoints = Vec::new();
        let mut now = fixed_now();
        while !r.state().is_terminal() {
            now += Duration::seconds(1);
            r.submit(Answer::Text("x".into()), now);
            match r.advance(now) {
                Some(Advance::Checkpoint(n)) => {
                    checkpoints.push(n);
                    assert_eq!(r.state(), SessionState::Resting);
                    assert!(r.snapshot(now).time_remaining.is_none());
                    assert!(r.resume(now));
                }
                Some(_) => {}
                None => panic!("advance ignored"),
            }
        }
        assert_eq!(checkpoints, vec![1, 2]);
        assert_eq!(r.records().len(), 5);
    }

    #[test]
    fn abort_is_idempotent_and_disarms_timer() {
        let mut r = runner(3);
        r.start(fixed_now());
        assert!(r.abort());
        assert!(!r.abort());
        assert!(r.tick(secs(100)).is_none());
        assert!(r.snapshot(secs(1)).question.is_none());
    }

    #[test]
    fn abort_after_finish_is_ignored() {
        let mut r = runner(1);
        r.start(fixed_now());
        r.submit(Answer::Text("el a0".into()), secs(1));
        assert_eq!(r.advance(secs(2)), Some(Advance::Finished));
        assert!(!r.abort());
        assert_eq!(r.state(), SessionState::Finished);
        assert_eq!(r.correct(), 1);
    }
}
