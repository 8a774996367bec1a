use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use drill_core::model::{
    Category, ExerciseId, LearnerId, ScoreSlot, Unit, UnitId, VocabItem, percentage_of,
};

use crate::error::SessionError;
use crate::question::{PresentationMode, Question};
use crate::runner::{Advance, Answer, Feedback, Runner, SessionSnapshot, SessionState, Tick};
use crate::sampling::{distractors, options_with, sample};
use crate::settings::DrillSettings;

use super::result::QuizResult;

//
// ─── SESSION KIND ────────────────────────────────────────────────────────────────
//

/// What a session drills. The tag decides where its result is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// A vocabulary category at one difficulty tier and length.
    Vocabulary { category: Category, slot: ScoreSlot },
    /// Every question of one grammar exercise, in order.
    Grammar { exercise: ExerciseId },
}

impl SessionKind {
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Vocabulary { .. } => "quiz",
            Self::Grammar { .. } => "grammar-exercise",
        }
    }
}

/// Everything needed to (re)start a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuizSpec {
    pub unit: UnitId,
    pub kind: SessionKind,
}

impl QuizSpec {
    #[must_use]
    pub fn vocabulary(unit: UnitId, category: Category, slot: ScoreSlot) -> Self {
        Self {
            unit,
            kind: SessionKind::Vocabulary { category, slot },
        }
    }

    #[must_use]
    pub fn grammar(unit: UnitId, exercise: ExerciseId) -> Self {
        Self {
            unit,
            kind: SessionKind::Grammar { exercise },
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed quiz attempt for one learner.
///
/// Built in `Ready`; `start` shows question 0 and arms its timer. Finishing
/// makes exactly one [`QuizResult`] available through [`QuizSession::take_result`].
/// Aborting discards everything.
#[derive(Debug, Clone)]
pub struct QuizSession {
    learner: LearnerId,
    spec: QuizSpec,
    runner: Runner,
    result_taken: bool,
}

impl QuizSession {
    /// Samples questions for `spec` from `unit`.
    ///
    /// Vocabulary sessions draw `slot.count` distinct items (fewer if the pool
    /// is smaller); grammar sessions use every question of the exercise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownUnit` if `unit` is not the spec's unit,
    /// `SessionError::UnknownExercise` for a missing grammar exercise, and
    /// `SessionError::Empty` when there is nothing to ask.
    pub fn prepare<R: Rng + ?Sized>(
        learner: LearnerId,
        spec: QuizSpec,
        unit: &Unit,
        settings: &DrillSettings,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        if unit.id != spec.unit {
            return Err(SessionError::UnknownUnit(spec.unit));
        }
        let questions = match &spec.kind {
            SessionKind::Vocabulary { category, slot } => {
                let mode = PresentationMode::for_tier(slot.tier);
                let pool = unit.pool(*category);
                sample(pool, slot.count.get(), rng)
                    .iter()
                    .map(|item| vocabulary_question(item, pool, mode, settings.distractors(), rng))
                    .collect()
            }
            SessionKind::Grammar { exercise } => {
                let found = unit
                    .exercise(exercise)
                    .ok_or_else(|| SessionError::UnknownExercise(exercise.clone()))?;
                found
                    .questions
                    .iter()
                    .map(|q| Question::grammar(q, &found.hint))
                    .collect()
            }
        };
        let runner = Runner::new(
            questions,
            settings.quiz_question_time(),
            settings.feedback_delay(),
        )?;
        debug!(kind = spec.kind.tag(), unit = %spec.unit, questions = runner.total(), "quiz prepared");
        Ok(Self {
            learner,
            spec,
            runner,
            result_taken: false,
        })
    }

    #[must_use]
    pub fn learner(&self) -> LearnerId {
        self.learner
    }

    #[must_use]
    pub fn spec(&self) -> &QuizSpec {
        &self.spec
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.runner.state()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.runner.questions()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.runner.total()
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.runner.correct()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.runner.current_question()
    }

    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        self.runner.snapshot(now)
    }

    /// `Ready` to `AwaitingAnswer`. Ignored in any other state.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        self.runner.start(now)
    }

    /// Scores the current question at most once; see [`Answer`] for what is ignored.
    pub fn submit_answer(&mut self, answer: Answer, now: DateTime<Utc>) -> Option<Feedback> {
        self.runner.submit(answer, now)
    }

    /// Fires whichever timer has expired: question timeout or feedback delay.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Tick> {
        self.runner.tick(now)
    }

    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<Advance> {
        self.runner.advance(now)
    }

    /// Discards an unfinished attempt. Safe to call repeatedly; a finished
    /// session keeps its result.
    pub fn abort(&mut self) -> bool {
        let aborted = self.runner.abort();
        if aborted {
            debug!(kind = self.spec.kind.tag(), unit = %self.spec.unit, "quiz aborted");
        }
        aborted
    }

    /// The final score, once the session is `Finished`. Later calls return `None`.
    pub fn take_result(&mut self) -> Option<QuizResult> {
        if self.result_taken || self.runner.state() != SessionState::Finished {
            return None;
        }
        let finished_at = self.runner.finished_at()?;
        self.result_taken = true;
        let total = self.runner.total();
        let correct = self.runner.correct();
        Some(QuizResult {
            learner: self.learner,
            spec: self.spec.clone(),
            correct,
            total,
            percentage: percentage_of(correct, total),
            finished_at,
        })
    }
}

fn vocabulary_question<R: Rng + ?Sized>(
    item: &VocabItem,
    pool: &[VocabItem],
    mode: PresentationMode,
    distractor_count: usize,
    rng: &mut R,
) -> Question {
    let options = match mode {
        PresentationMode::ChooseTranslation => {
            let wrong = distractors(
                &item.target_text,
                pool.iter().map(|other| other.target_text.as_str()),
                distractor_count,
                rng,
            );
            options_with(&item.target_text, wrong, rng)
        }
        PresentationMode::ChooseWord => {
            let wrong = distractors(
                &item.source_text,
                pool.iter().map(|other| other.source_text.as_str()),
                distractor_count,
                rng,
            );
            options_with(&item.source_text, wrong, rng)
        }
        PresentationMode::TypeWord => Vec::new(),
    };
    Question::vocabulary(item, mode, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{DifficultyTier, GrammarExercise, GrammarQuestion, QuestionCount};
    use drill_core::time::fixed_now;
    use chrono::Duration;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unit(words: usize) -> Unit {
        let items = (0..words)
            .map(|i| VocabItem::new(format!("la palabra{i}"), format!("слово{i}"), ""))
            .collect();
        Unit::new(UnitId::new("unidad_1"))
            .with_category(Category::Sustantivos, items)
            .with_exercise(GrammarExercise {
                id: ExerciseId::new("articulos"),
                title: "Artículos".into(),
                hint: "el / la".into(),
                questions: vec![
                    GrammarQuestion {
                        sentence: "___ casa".into(),
                        answer: "la".into(),
                    },
                    GrammarQuestion {
                        sentence: "___ perro".into(),
                        answer: "el".into(),
                    },
                ],
            })
    }

    fn vocab_spec(tier: DifficultyTier, count: QuestionCount) -> QuizSpec {
        QuizSpec::vocabulary(
            UnitId::new("unidad_1"),
            Category::Sustantivos,
            ScoreSlot::new(tier, count),
        )
    }

    fn prepare(spec: QuizSpec, words: usize) -> QuizSession {
        let mut rng = StdRng::seed_from_u64(42);
        QuizSession::prepare(
            LearnerId::random(),
            spec,
            &unit(words),
            &DrillSettings::default(),
            &mut rng,
        )
        .unwrap()
    }

    fn answer_all_correctly(session: &mut QuizSession) {
        let mut now = fixed_now();
        session.start(now);
        while session.state() == SessionState::AwaitingAnswer {
            now += Duration::seconds(2);
            let expected = session.current_question().unwrap().expected.clone();
            session.submit_answer(Answer::Text(expected), now).unwrap();
            session.advance(now);
        }
    }

    #[test]
    fn samples_distinct_items_up_to_count() {
        let session = prepare(vocab_spec(DifficultyTier::Hard, QuestionCount::Ten), 30);
        assert_eq!(session.total(), 10);
        let mut prompts: Vec<&str> = session.questions().iter().map(|q| q.prompt.as_str()).collect();
        prompts.sort_unstable();
        prompts.dedup();
        assert_eq!(prompts.len(), 10);
    }

    #[test]
    fn small_pool_serves_what_exists() {
        let session = prepare(vocab_spec(DifficultyTier::Easy, QuestionCount::TwentyFive), 6);
        assert_eq!(session.total(), 6);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = QuizSpec::vocabulary(
            UnitId::new("unidad_1"),
            Category::Verbos,
            ScoreSlot::new(DifficultyTier::Easy, QuestionCount::Ten),
        );
        let err = QuizSession::prepare(LearnerId::random(), spec, &unit(5), &DrillSettings::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn easy_questions_offer_four_distinct_options() {
        let session = prepare(vocab_spec(DifficultyTier::Easy, QuestionCount::Ten), 12);
        for question in session.questions() {
            assert_eq!(question.mode, PresentationMode::ChooseTranslation);
            assert_eq!(question.options.len(), 4);
            assert!(question.options.contains(&question.expected));
            assert!(question.expected.starts_with("слово"));
        }
    }

    #[test]
    fn medium_choices_are_source_words() {
        let session = prepare(vocab_spec(DifficultyTier::Medium, QuestionCount::Ten), 12);
        let question = &session.questions()[0];
        assert!(question.prompt.starts_with("слово"));
        assert!(question.options.iter().all(|o| o.starts_with("la palabra")));
    }

    #[test]
    fn choosing_the_right_option_scores() {
        let mut session = prepare(vocab_spec(DifficultyTier::Easy, QuestionCount::Ten), 12);
        session.start(fixed_now());
        let question = session.current_question().unwrap().clone();
        let idx = question.options.iter().position(|o| *o == question.expected).unwrap();
        let feedback = session.submit_answer(Answer::Choice(idx), fixed_now()).unwrap();
        assert!(feedback.correct);
        assert_eq!(session.correct(), 1);
    }

    #[test]
    fn finished_session_yields_one_result() {
        let mut session = prepare(vocab_spec(DifficultyTier::Hard, QuestionCount::Ten), 10);
        answer_all_correctly(&mut session);
        assert_eq!(session.state(), SessionState::Finished);

        let result = session.take_result().unwrap();
        assert_eq!(result.percentage, 100);
        assert_eq!((result.correct, result.total), (10, 10));
        assert!(session.take_result().is_none());
    }

    #[test]
    fn aborted_session_yields_nothing() {
        let mut session = prepare(vocab_spec(DifficultyTier::Hard, QuestionCount::Ten), 10);
        session.start(fixed_now());
        session.submit_answer(Answer::Text("x".into()), fixed_now());
        assert!(session.abort());
        assert!(!session.abort());
        assert!(session.take_result().is_none());
    }

    #[test]
    fn grammar_session_uses_exercise_in_order() {
        let spec = QuizSpec::grammar(UnitId::new("unidad_1"), ExerciseId::new("articulos"));
        let mut session = prepare(spec, 3);
        assert_eq!(session.spec().kind.tag(), "grammar-exercise");
        assert_eq!(session.questions()[0].prompt, "___ casa");
        assert_eq!(session.questions()[0].context.as_deref(), Some("el / la"));

        answer_all_correctly(&mut session);
        assert_eq!(session.take_result().unwrap().percentage, 100);
    }

    #[test]
    fn unknown_exercise_is_reported() {
        let mut rng = StdRng::seed_from_u64(1);
        let spec = QuizSpec::grammar(UnitId::new("unidad_1"), ExerciseId::new("nope"));
        let err = QuizSession::prepare(LearnerId::random(), spec, &unit(3), &DrillSettings::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownExercise(ExerciseId::new("nope")));
    }

    #[test]
    fn partial_score_rounds_half_up() {
        let mut session = prepare(vocab_spec(DifficultyTier::Hard, QuestionCount::Ten), 8);
        let mut now = fixed_now();
        session.start(now);
        let mut n = 0;
        while session.state() == SessionState::AwaitingAnswer {
            now += Duration::seconds(1);
            let answer = if n < 5 {
                session.current_question().unwrap().expected.clone()
            } else {
                "mal".to_string()
            };
            session.submit_answer(Answer::Text(answer), now);
            session.advance(now);
            n += 1;
        }
        // 5 of 8 = 62.5%
        assert_eq!(session.take_result().unwrap().percentage, 63);
    }
}
