mod result;
mod session;

pub use result::{QuizResult, ResultBand};
pub use session::{QuizSession, QuizSpec, SessionKind};
