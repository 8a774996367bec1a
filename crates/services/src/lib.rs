#![forbid(unsafe_code)]

pub mod app_services;
pub mod conjugation;
pub mod error;
pub mod exam;
pub mod profiles;
pub mod question;
pub mod quiz;
mod runner;
pub mod sampling;
pub mod settings;
pub mod sync;

pub use drill_core::Clock;

pub use app_services::{AppConfig, AppServices};
pub use conjugation::{ConjugationDrill, ConjugationResult, ConjugationRow};
pub use error::{BootstrapError, ProfileServiceError, SessionError, SettingsError};
pub use exam::{ExamAssembler, ExamBlueprint, ExamItem, ExamResult, ExamSession, ReviewEntry, SourceKind};
pub use profiles::{CategoryOverview, ProfileManager, SlotOverview, UnitOverview};
pub use question::{PresentationMode, Question};
pub use quiz::{QuizResult, QuizSession, QuizSpec, ResultBand, SessionKind};
pub use runner::{Advance, Answer, AnswerRecord, Feedback, SessionSnapshot, SessionState, Tick};
pub use settings::DrillSettings;
pub use sync::{CountingSync, NoopSync, SyncHook};
