#![forbid(unsafe_code)]

pub mod error;
pub mod grading;
pub mod mastery;
pub mod model;
pub mod time;
pub mod unlock;

pub use error::Error;
pub use mastery::{MasteryStore, RecordOutcome};
pub use time::Clock;
pub use unlock::{PrerequisiteGraph, UnlockEngine, UnlockState};
