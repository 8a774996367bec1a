mod catalog;
mod ids;
mod profile;
mod progress;
mod score;

pub use ids::{ExerciseId, LearnerId, ParseIdError, UnitId};

pub use catalog::{
    Category, CatalogError, ContentCatalog, GrammarCluster, GrammarExercise, GrammarQuestion,
    PRONOUNS, Tense, Unit, VerbTable, VocabItem,
};
pub use profile::{LearnerProfile, MAX_DISPLAY_NAME_CHARS, ProfileBook, ProfileError};
pub use progress::UnitProgress;
pub use score::{
    CategoryProgress, DifficultyTier, MAX_PERCENT, ParseScoreError, QuestionCount, ScoreSlot,
    normalize_percentage, percentage_of, rounded_mean,
};
