//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{Category, ExerciseId, LearnerId, ProfileError, ScoreSlot, UnitId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted while validating `DrillSettings`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("quiz seconds per question must be between 5 and 600")]
    InvalidQuizTimer,
    #[error("exam seconds per question must be between 5 and 600")]
    InvalidExamTimer,
    #[error("exam timer ({exam}s) must be shorter than the quiz timer ({quiz}s)")]
    ExamTimerNotStricter { quiz: u32, exam: u32 },
    #[error("feedback delay must be between 100 and 10000 ms")]
    InvalidFeedbackDelay,
    #[error("checkpoint interval must be > 0")]
    InvalidCheckpointInterval,
    #[error("review page size must be > 0")]
    InvalidPageSize,
    #[error("exam items per category must be > 0")]
    InvalidExamItems,
    #[error("cluster target must be > 0")]
    InvalidClusterTarget,
    #[error("per-exercise cap must be > 0")]
    InvalidExerciseCap,
}

/// Errors emitted when a quiz, exam or drill cannot be started.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("unknown unit: {0}")]
    UnknownUnit(UnitId),
    #[error("unknown grammar exercise: {0}")]
    UnknownExercise(ExerciseId),
    #[error("unit {0} is locked")]
    UnitLocked(UnitId),
    #[error("{category} {slot} is locked")]
    SlotLocked { category: Category, slot: ScoreSlot },
    #[error("exam requires 80% average progress over unlocked units")]
    ExamLocked,
}

/// Errors emitted by `ProfileManager`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error("no active profile")]
    NoActiveProfile,
    #[error("unknown profile: {0}")]
    UnknownProfile(LearnerId),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the drill services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Profiles(#[from] ProfileServiceError),
}
