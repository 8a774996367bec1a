mod assembler;
mod session;

pub use assembler::{ExamAssembler, ExamBlueprint, ExamItem, SourceKind};
pub use session::{ExamResult, ExamSession, ReviewEntry};
