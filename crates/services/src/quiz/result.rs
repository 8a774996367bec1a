use chrono::{DateTime, Utc};

use drill_core::model::LearnerId;

use super::session::QuizSpec;

/// Coarse verdict shown with a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultBand {
    Excellent,
    Good,
    KeepTrying,
}

impl ResultBand {
    #[must_use]
    pub fn for_percentage(percentage: u8) -> Self {
        match percentage {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            _ => Self::KeepTrying,
        }
    }
}

/// Final score of a finished quiz, handed out exactly once.
///
/// Not `Clone`: recording it consumes it, so a result cannot be written twice.
#[derive(Debug, PartialEq, Eq)]
pub struct QuizResult {
    pub learner: LearnerId,
    pub spec: QuizSpec,
    pub correct: usize,
    pub total: usize,
    pub percentage: u8,
    pub finished_at: DateTime<Utc>,
}

impl QuizResult {
    #[must_use]
    pub fn band(&self) -> ResultBand {
        ResultBand::for_percentage(self.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(ResultBand::for_percentage(100), ResultBand::Excellent);
        assert_eq!(ResultBand::for_percentage(80), ResultBand::Excellent);
        assert_eq!(ResultBand::for_percentage(79), ResultBand::Good);
        assert_eq!(ResultBand::for_percentage(60), ResultBand::Good);
        assert_eq!(ResultBand::for_percentage(59), ResultBand::KeepTrying);
        assert_eq!(ResultBand::for_percentage(0), ResultBand::KeepTrying);
    }
}
