use chrono::Duration;

use crate::error::SettingsError;

/// Fixed timing and sizing constants for quizzes and exams.
///
/// Values are chosen when the services are built and never change while a
/// session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillSettings {
    quiz_secs_per_question: u32,
    exam_secs_per_question: u32,
    feedback_delay_ms: u32,
    exam_checkpoint_every: usize,
    review_page_size: usize,
    exam_items_per_category: usize,
    cluster_target: usize,
    per_exercise_cap: usize,
    distractors: usize,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            quiz_secs_per_question: 20,
            exam_secs_per_question: 12,
            feedback_delay_ms: 1500,
            exam_checkpoint_every: 10,
            review_page_size: 10,
            exam_items_per_category: 10,
            cluster_target: 5,
            per_exercise_cap: 2,
            distractors: 3,
        }
    }
}

impl DrillSettings {
    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a timer is out of range, the exam timer is
    /// not shorter than the quiz timer, or any size is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quiz_secs_per_question: u32,
        exam_secs_per_question: u32,
        feedback_delay_ms: u32,
        exam_checkpoint_every: usize,
        review_page_size: usize,
        exam_items_per_category: usize,
        cluster_target: usize,
        per_exercise_cap: usize,
        distractors: usize,
    ) -> Result<Self, SettingsError> {
        if !(5..=600).contains(&quiz_secs_per_question) {
            return Err(SettingsError::InvalidQuizTimer);
        }
        if !(5..=600).contains(&exam_secs_per_question) {
            return Err(SettingsError::InvalidExamTimer);
        }
        if exam_secs_per_question >= quiz_secs_per_question {
            return Err(SettingsError::ExamTimerNotStricter {
                quiz: quiz_secs_per_question,
                exam: exam_secs_per_question,
            });
        }
        if !(100..=10_000).contains(&feedback_delay_ms) {
            return Err(SettingsError::InvalidFeedbackDelay);
        }
        if exam_checkpoint_every == 0 {
            return Err(SettingsError::InvalidCheckpointInterval);
        }
        if review_page_size == 0 {
            return Err(SettingsError::InvalidPageSize);
        }
        if exam_items_per_category == 0 {
            return Err(SettingsError::InvalidExamItems);
        }
        if cluster_target == 0 {
            return Err(SettingsError::InvalidClusterTarget);
        }
        if per_exercise_cap == 0 {
            return Err(SettingsError::InvalidExerciseCap);
        }

        Ok(Self {
            quiz_secs_per_question,
            exam_secs_per_question,
            feedback_delay_ms,
            exam_checkpoint_every,
            review_page_size,
            exam_items_per_category,
            cluster_target,
            per_exercise_cap,
            distractors,
        })
    }

    #[must_use]
    pub fn quiz_question_time(&self) -> Duration {
        Duration::seconds(i64::from(self.quiz_secs_per_question))
    }

    #[must_use]
    pub fn exam_question_time(&self) -> Duration {
        Duration::seconds(i64::from(self.exam_secs_per_question))
    }

    /// How long answer feedback stays up before the next question.
    #[must_use]
    pub fn feedback_delay(&self) -> Duration {
        Duration::milliseconds(i64::from(self.feedback_delay_ms))
    }

    /// A rest checkpoint is inserted before every question whose index is a
    /// non-zero multiple of this value.
    #[must_use]
    pub fn exam_checkpoint_every(&self) -> usize {
        self.exam_checkpoint_every
    }

    #[must_use]
    pub fn review_page_size(&self) -> usize {
        self.review_page_size
    }

    #[must_use]
    pub fn exam_items_per_category(&self) -> usize {
        self.exam_items_per_category
    }

    #[must_use]
    pub fn cluster_target(&self) -> usize {
        self.cluster_target
    }

    #[must_use]
    pub fn per_exercise_cap(&self) -> usize {
        self.per_exercise_cap
    }

    /// Wrong options shown next to the right one in multiple-choice questions.
    #[must_use]
    pub fn distractors(&self) -> usize {
        self.distractors
    }
}
