//! Six-pronoun verb conjugation practice. Never writes mastery.

use rand::Rng;
use rand::seq::IndexedRandom;

use drill_core::grading::normalize;
use drill_core::model::{PRONOUNS, Tense, Unit, VerbTable};

use crate::error::SessionError;

/// Grading of one pronoun's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjugationRow {
    pub pronoun: &'static str,
    pub given: String,
    pub expected: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjugationResult {
    pub rows: Vec<ConjugationRow>,
    pub correct: usize,
}

impl ConjugationResult {
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows.len()
    }
}

/// One verb to conjugate in one tense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjugationDrill {
    verb: VerbTable,
}

impl ConjugationDrill {
    /// Picks a random verb table of `tense` from `unit`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the unit has no verbs in that tense.
    pub fn pick<R: Rng + ?Sized>(unit: &Unit, tense: Tense, rng: &mut R) -> Result<Self, SessionError> {
        let verbs = unit.verbs_for(tense);
        let verb = verbs.choose(rng).ok_or(SessionError::Empty)?;
        Ok(Self {
            verb: (*verb).clone(),
        })
    }

    #[must_use]
    pub fn infinitive(&self) -> &str {
        &self.verb.infinitive
    }

    #[must_use]
    pub fn tense(&self) -> Tense {
        self.verb.tense
    }

    #[must_use]
    pub fn pronouns(&self) -> [&'static str; 6] {
        PRONOUNS
    }

    /// Grades answers in pronoun order; missing answers count as blank.
    ///
    /// Comparison ignores case and surrounding whitespace but not accents.
    #[must_use]
    pub fn check<S: AsRef<str>>(&self, answers: &[S]) -> ConjugationResult {
        let rows: Vec<ConjugationRow> = PRONOUNS
            .iter()
            .zip(&self.verb.conjugations)
            .enumerate()
            .map(|(idx, (pronoun, expected))| {
                let given = answers.get(idx).map_or("", |a| a.as_ref()).trim().to_owned();
                let correct = !given.is_empty() && normalize(&given) == normalize(expected);
                ConjugationRow {
                    pronoun: *pronoun,
                    given,
                    expected: expected.clone(),
                    correct,
                }
            })
            .collect();
        let correct = rows.iter().filter(|row| row.correct).count();
        ConjugationResult { rows, correct }
    }
}
