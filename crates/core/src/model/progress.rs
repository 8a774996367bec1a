use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::catalog::{Category, Unit};
use crate::model::ids::ExerciseId;
use crate::model::score::{CategoryProgress, ScoreSlot, rounded_mean};

/// Best scores of one learner inside one unit.
///
/// Categories and grammar entries are materialized on first write; reads of
/// anything missing see zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProgress {
    #[serde(flatten)]
    categories: BTreeMap<Category, CategoryProgress>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    grammar: BTreeMap<ExerciseId, u8>,
}

impl UnitProgress {
    /// A progress record with all three categories present and zeroed.
    #[must_use]
    pub fn skeleton() -> Self {
        let mut progress = Self::default();
        progress.fill_missing_categories();
        progress
    }

    pub(crate) fn fill_missing_categories(&mut self) {
        for category in Category::ALL {
            self.categories.entry(category).or_default();
        }
    }

    #[must_use]
    pub fn category(&self, category: Category) -> CategoryProgress {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    /// Raises the slot if `percentage` beats the stored best.
    ///
    /// Returns the previous best on improvement.
    pub fn raise(&mut self, category: Category, slot: ScoreSlot, percentage: u8) -> Option<u8> {
        self.categories
            .entry(category)
            .or_default()
            .raise(slot, percentage)
    }

    #[must_use]
    pub fn grammar_best(&self, exercise: &ExerciseId) -> u8 {
        self.grammar.get(exercise).copied().unwrap_or(0)
    }

    /// Raises the exercise best if `percentage` beats it.
    ///
    /// Returns the previous best on improvement.
    pub fn raise_grammar(&mut self, exercise: &ExerciseId, percentage: u8) -> Option<u8> {
        let current = self.grammar.entry(exercise.clone()).or_insert(0);
        if percentage > *current {
            let previous = *current;
            *current = percentage;
            Some(previous)
        } else {
            None
        }
    }

    /// Rounded mean of the six slots of `category`.
    #[must_use]
    pub fn category_progress(&self, category: Category) -> u8 {
        self.category(category).mean()
    }

    /// Rounded mean of `exercises`' best scores, unattempted exercises counting as 0.
    #[must_use]
    pub fn grammar_mean(&self, exercises: &[ExerciseId]) -> u8 {
        let scores: Vec<u8> = exercises.iter().map(|id| self.grammar_best(id)).collect();
        rounded_mean(&scores)
    }

    /// Unit-level mastery.
    ///
    /// Mean of the three category progresses, plus the grammar mean as a
    /// fourth term when the unit has grammar exercises.
    #[must_use]
    pub fn unit_progress(&self, unit: Option<&Unit>) -> u8 {
        let mut terms: Vec<u8> = Category::ALL
            .iter()
            .map(|category| self.category_progress(*category))
            .collect();
        if let Some(unit) = unit.filter(|unit| unit.has_grammar()) {
            terms.push(self.grammar_mean(&unit.exercise_ids()));
        }
        rounded_mean(&terms)
    }
}
