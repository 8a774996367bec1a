use chrono::{DateTime, Utc};
use tracing::debug;

use drill_core::model::{LearnerId, UnitId, percentage_of};

use crate::error::SessionError;
use crate::question::Question;
use crate::quiz::ResultBand;
use crate::runner::{Advance, Answer, Feedback, Runner, SessionSnapshot, SessionState, Tick};
use crate::settings::DrillSettings;

use super::assembler::{ExamBlueprint, ExamItem, SourceKind};

/// One row of the post-exam review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub index: usize,
    pub prompt: String,
    pub expected: String,
    pub given: Option<String>,
    pub correct: bool,
    pub timed_out: bool,
    pub source: SourceKind,
    pub cluster_label: String,
}

/// Outcome of a finished exam. Exams never write mastery scores.
#[derive(Debug, PartialEq, Eq)]
pub struct ExamResult {
    pub learner: LearnerId,
    pub unit: UnitId,
    pub correct: usize,
    pub answered: usize,
    pub percentage: u8,
    pub finished_at: DateTime<Utc>,
    entries: Vec<ReviewEntry>,
    page_size: usize,
}

impl ExamResult {
    #[must_use]
    pub fn band(&self) -> ResultBand {
        ResultBand::for_percentage(self.percentage)
    }

    #[must_use]
    pub fn entries(&self) -> &[ReviewEntry] {
        &self.entries
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.page_size)
    }

    /// Zero-based review page; empty past the end.
    #[must_use]
    pub fn page(&self, page: usize) -> &[ReviewEntry] {
        let start = page.saturating_mul(self.page_size).min(self.entries.len());
        let end = start.saturating_add(self.page_size).min(self.entries.len());
        &self.entries[start..end]
    }
}

/// A timed exam over a frozen blueprint, with rest checkpoints.
#[derive(Debug, Clone)]
pub struct ExamSession {
    learner: LearnerId,
    unit: UnitId,
    items: Vec<ExamItem>,
    runner: Runner,
    page_size: usize,
    result_taken: bool,
}

impl ExamSession {
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the blueprint has no questions.
    pub fn new(
        learner: LearnerId,
        blueprint: ExamBlueprint,
        settings: &DrillSettings,
    ) -> Result<Self, SessionError> {
        let (unit, items) = blueprint.into_parts();
        let questions = items
            .iter()
            .map(|item| Question::typed(item.payload.clone(), item.expected.clone()))
            .collect();
        let runner = Runner::new(
            questions,
            settings.exam_question_time(),
            settings.feedback_delay(),
        )?
        .with_checkpoints(settings.exam_checkpoint_every());
        debug!(unit = %unit, questions = items.len(), "exam prepared");
        Ok(Self {
            learner,
            unit,
            items,
            runner,
            page_size: settings.review_page_size(),
            result_taken: false,
        })
    }

    #[must_use]
    pub fn learner(&self) -> LearnerId {
        self.learner
    }

    #[must_use]
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    #[must_use]
    pub fn items(&self) -> &[ExamItem] {
        &self.items
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.runner.state()
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&ExamItem> {
        self.runner
            .current_question()
            .and_then(|_| self.items.get(self.runner.index()))
    }

    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        self.runner.snapshot(now)
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        self.runner.start(now)
    }

    pub fn submit_answer(&mut self, answer: Answer, now: DateTime<Utc>) -> Option<Feedback> {
        self.runner.submit(answer, now)
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Tick> {
        self.runner.tick(now)
    }

    /// Moves on; may stop at a rest checkpoint, which is shown once.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Option<Advance> {
        self.runner.advance(now)
    }

    /// Leaves a rest checkpoint and arms the next question's timer.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        self.runner.resume(now)
    }

    pub fn abort(&mut self) -> bool {
        self.runner.abort()
    }

    /// The graded exam, once `Finished`. Later calls return `None`.
    pub fn take_result(&mut self) -> Option<ExamResult> {
        if self.result_taken || self.runner.state() != SessionState::Finished {
            return None;
        }
        let finished_at = self.runner.finished_at()?;
        self.result_taken = true;

        let entries: Vec<ReviewEntry> = self
            .runner
            .records()
            .iter()
            .filter_map(|record| {
                let item = self.items.get(record.index)?;
                Some(ReviewEntry {
                    index: record.index,
                    prompt: item.payload.clone(),
                    expected: item.expected.clone(),
                    given: record.given.clone(),
                    correct: record.correct,
                    timed_out: record.timed_out,
                    source: item.source,
                    cluster_label: item.cluster_label.clone(),
                })
            })
            .collect();
        let answered = entries.len();
        let correct = entries.iter().filter(|entry| entry.correct).count();

        Some(ExamResult {
            learner: self.learner,
            unit: self.unit.clone(),
            correct,
            answered,
            percentage: percentage_of(correct, answered),
            finished_at,
            entries,
            page_size: self.page_size.max(1),
        })
    }
}
