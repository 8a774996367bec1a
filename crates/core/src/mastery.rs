//! Per-learner best-score ledger.
//!
//! `MasteryStore` owns every [`LearnerProfile`] and is the only place their
//! progress changes. Each mutator records the score and recomputes unlocks
//! before returning, so callers never observe one without the other.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{
    Category, CategoryProgress, ContentCatalog, ExerciseId, LearnerId, LearnerProfile,
    ProfileBook, ScoreSlot, UnitId, normalize_percentage,
};
use crate::unlock::{UnlockEngine, UnlockState};

/// What a record call did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The new score beat the stored best.
    Improved { previous: u8, best: u8 },
    /// The stored best was equal or higher; only activity time moved.
    Kept { best: u8 },
    /// Unknown learner or unit; nothing changed.
    Ignored,
}

impl RecordOutcome {
    #[must_use]
    pub fn is_improved(self) -> bool {
        matches!(self, Self::Improved { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MasteryStore {
    book: ProfileBook,
    catalog: Arc<ContentCatalog>,
    engine: UnlockEngine,
}

impl MasteryStore {
    /// Wraps a loaded profile book. Skeletons and unlocks are brought up to
    /// date with `catalog` immediately.
    #[must_use]
    pub fn new(book: ProfileBook, catalog: Arc<ContentCatalog>, engine: UnlockEngine) -> Self {
        let mut store = Self {
            book,
            catalog,
            engine,
        };
        let ids: Vec<LearnerId> = store.book.iter().map(LearnerProfile::id).collect();
        for id in ids {
            store.ensure_skeleton(&id);
        }
        store
    }

    #[must_use]
    pub fn book(&self) -> &ProfileBook {
        &self.book
    }

    #[must_use]
    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn engine(&self) -> &UnlockEngine {
        &self.engine
    }

    #[must_use]
    pub fn profile(&self, learner: &LearnerId) -> Option<&LearnerProfile> {
        self.book.get(learner)
    }

    /// Adds a profile, makes it active and gives it a skeleton for every catalog unit.
    pub fn insert_profile(&mut self, profile: LearnerProfile) {
        let id = profile.id();
        self.book.insert(profile);
        self.ensure_skeleton(&id);
    }

    /// Makes `learner` active and touches its activity time.
    /// Returns false when the learner does not exist.
    pub fn select(&mut self, learner: &LearnerId, at: DateTime<Utc>) -> bool {
        if !self.book.set_active(*learner) {
            return false;
        }
        if let Some(profile) = self.book.get_mut(learner) {
            profile.touch(at);
        }
        true
    }

    pub fn touch(&mut self, learner: &LearnerId, at: DateTime<Utc>) -> bool {
        match self.book.get_mut(learner) {
            Some(profile) => {
                profile.touch(at);
                true
            }
            None => false,
        }
    }

    /// Materializes progress records for every catalog unit and refreshes unlocks.
    pub fn ensure_skeleton(&mut self, learner: &LearnerId) {
        let Some(profile) = self.book.get_mut(learner) else {
            return;
        };
        for unit in self.catalog.unit_ids() {
            profile.ensure_unit(unit);
        }
        self.refresh_unlocks(learner);
    }

    //
    // ─── MUTATORS ──────────────────────────────────────────────────────────────
    //

    /// Records a vocabulary drill result.
    ///
    /// `percentage` is clamped to `[0, 100]` and rounded. The slot only moves
    /// up. Activity time is updated either way; unknown learners or units are
    /// ignored.
    pub fn record_score(
        &mut self,
        learner: &LearnerId,
        unit: &UnitId,
        category: Category,
        slot: ScoreSlot,
        percentage: f64,
        at: DateTime<Utc>,
    ) -> RecordOutcome {
        let score = normalize_percentage(percentage);
        if self.catalog.unit(unit).is_none() {
            return RecordOutcome::Ignored;
        }
        let Some(profile) = self.book.get_mut(learner) else {
            return RecordOutcome::Ignored;
        };
        let Some(progress) = profile.unit_progress_mut(unit) else {
            return RecordOutcome::Ignored;
        };
        let outcome = match progress.raise(category, slot, score) {
            Some(previous) => RecordOutcome::Improved {
                previous,
                best: score,
            },
            None => RecordOutcome::Kept {
                best: progress.category(category).best(slot),
            },
        };
        profile.touch(at);
        self.refresh_unlocks(learner);
        outcome
    }

    /// Records a grammar exercise result under the same monotonic-best rule.
    ///
    /// Exercises the catalog unit does not define are ignored.
    pub fn record_grammar_score(
        &mut self,
        learner: &LearnerId,
        unit: &UnitId,
        exercise: &ExerciseId,
        percentage: f64,
        at: DateTime<Utc>,
    ) -> RecordOutcome {
        let score = normalize_percentage(percentage);
        let known = self
            .catalog
            .unit(unit)
            .is_some_and(|unit| unit.exercise(exercise).is_some());
        if !known {
            return RecordOutcome::Ignored;
        }
        let Some(profile) = self.book.get_mut(learner) else {
            return RecordOutcome::Ignored;
        };
        let Some(progress) = profile.unit_progress_mut(unit) else {
            return RecordOutcome::Ignored;
        };
        let outcome = match progress.raise_grammar(exercise, score) {
            Some(previous) => RecordOutcome::Improved {
                previous,
                best: score,
            },
            None => RecordOutcome::Kept {
                best: progress.grammar_best(exercise),
            },
        };
        profile.touch(at);
        self.refresh_unlocks(learner);
        outcome
    }

    /// Marks every catalog unit unlocked.
    pub fn unlock_all(&mut self, learner: &LearnerId) -> bool {
        let Some(profile) = self.book.get_mut(learner) else {
            return false;
        };
        let mut unlocks = profile.unlocks().clone();
        for unit in self.catalog.unit_ids() {
            unlocks.insert(unit.clone(), true);
        }
        profile.replace_unlocks(unlocks);
        true
    }

    /// Raises every slot and grammar score in the catalog to 100.
    pub fn fill_progress(&mut self, learner: &LearnerId, at: DateTime<Utc>) -> bool {
        let Some(profile) = self.book.get_mut(learner) else {
            return false;
        };
        for unit in self.catalog.units() {
            profile.ensure_unit(&unit.id);
            if let Some(progress) = profile.unit_progress_mut(&unit.id) {
                for category in Category::ALL {
                    for slot in ScoreSlot::ALL {
                        progress.raise(category, slot, 100);
                    }
                }
                for exercise in &unit.grammar {
                    progress.raise_grammar(&exercise.id, 100);
                }
            }
        }
        profile.touch(at);
        self.refresh_unlocks(learner);
        true
    }

    fn refresh_unlocks(&mut self, learner: &LearnerId) {
        let Some(profile) = self.book.get(learner) else {
            return;
        };
        let previous = UnlockState::from(profile.unlocks().clone());
        let next = self.engine.recompute(self.catalog.unit_ids(), &previous, |unit| {
            unit_progress_of(profile, &self.catalog, unit)
        });
        if let Some(profile) = self.book.get_mut(learner) {
            profile.replace_unlocks(next.into_map());
        }
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    /// Slot values for a category; zeros when anything is missing.
    #[must_use]
    pub fn category_scores(
        &self,
        learner: &LearnerId,
        unit: &UnitId,
        category: Category,
    ) -> CategoryProgress {
        self.book
            .get(learner)
            .and_then(|profile| profile.unit_progress(unit))
            .map(|progress| progress.category(category))
            .unwrap_or_default()
    }

    /// Rounded mean of the category's six slots.
    #[must_use]
    pub fn category_progress(&self, learner: &LearnerId, unit: &UnitId, category: Category) -> u8 {
        self.category_scores(learner, unit, category).mean()
    }

    /// Unit mastery; 0 for unknown learners or units.
    #[must_use]
    pub fn unit_progress(&self, learner: &LearnerId, unit: &UnitId) -> u8 {
        self.book
            .get(learner)
            .map_or(0, |profile| unit_progress_of(profile, &self.catalog, unit))
    }

    #[must_use]
    pub fn grammar_best(&self, learner: &LearnerId, unit: &UnitId, exercise: &ExerciseId) -> u8 {
        self.book
            .get(learner)
            .and_then(|profile| profile.unit_progress(unit))
            .map_or(0, |progress| progress.grammar_best(exercise))
    }

    #[must_use]
    pub fn unlocks(&self, learner: &LearnerId) -> UnlockState {
        self.book
            .get(learner)
            .map(|profile| UnlockState::from(profile.unlocks().clone()))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_unit_unlocked(&self, learner: &LearnerId, unit: &UnitId) -> bool {
        self.book
            .get(learner)
            .is_some_and(|profile| profile.is_unlocked(unit))
    }

    #[must_use]
    pub fn is_slot_unlocked(
        &self,
        learner: &LearnerId,
        unit: &UnitId,
        category: Category,
        slot: ScoreSlot,
    ) -> bool {
        let scores = self.category_scores(learner, unit, category);
        self.engine.is_slot_unlocked(&scores, slot)
    }

    /// Exam gate over the learner's unlocked catalog units. Stored unlocks
    /// for units the catalog no longer has are left out of the average.
    #[must_use]
    pub fn is_exam_eligible(&self, learner: &LearnerId) -> bool {
        let Some(profile) = self.book.get(learner) else {
            return false;
        };
        let unlocks: UnlockState = profile
            .unlocks()
            .iter()
            .filter(|(unit, _)| self.catalog.unit(unit).is_some())
            .map(|(unit, unlocked)| (unit.clone(), *unlocked))
            .collect::<BTreeMap<_, _>>()
            .into();
        self.engine.is_exam_eligible(&unlocks, |unit| {
            unit_progress_of(profile, &self.catalog, unit)
        })
    }
}

/// 0 for units missing from either the catalog or the profile.
fn unit_progress_of(profile: &LearnerProfile, catalog: &ContentCatalog, unit: &UnitId) -> u8 {
    let Some(content) = catalog.unit(unit) else {
        return 0;
    };
    profile
        .unit_progress(unit)
        .map_or(0, |progress| progress.unit_progress(Some(content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DifficultyTier, GrammarExercise, GrammarQuestion, QuestionCount, Unit, VocabItem,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    fn slot(tier: DifficultyTier, count: QuestionCount) -> ScoreSlot {
        ScoreSlot::new(tier, count)
    }

    fn catalog() -> Arc<ContentCatalog> {
        let words = vec![VocabItem::new("el libro", "книга", "Leo ___")];
        let unit = |id: &str| {
            Category::ALL
                .iter()
                .fold(Unit::new(UnitId::new(id)), |unit, category| {
                    unit.with_category(*category, words.clone())
                })
        };
        let unit_3 = unit("unidad_3").with_exercise(GrammarExercise {
            id: ExerciseId::new("ser_estar"),
            title: "Ser y estar".into(),
            hint: String::new(),
            questions: vec![GrammarQuestion {
                sentence: "Yo ___ cansado".into(),
                answer: "estoy".into(),
            }],
        });
        Arc::new(ContentCatalog::new(vec![unit("unidad_1"), unit_3, unit("unidad_4")]).unwrap())
    }

    fn store_with_learner() -> (MasteryStore, LearnerId) {
        let mut store = MasteryStore::new(ProfileBook::new(), catalog(), UnlockEngine::default());
        let profile = LearnerProfile::new(LearnerId::random(), "Ana", fixed_now()).unwrap();
        let id = profile.id();
        store.insert_profile(profile);
        (store, id)
    }

    fn unidad(n: u8) -> UnitId {
        UnitId::new(format!("unidad_{n}"))
    }

    fn max_out_unit(store: &mut MasteryStore, learner: &LearnerId, unit: &UnitId) {
        for category in Category::ALL {
            for slot in ScoreSlot::ALL {
                store.record_score(learner, unit, category, slot, 100.0, fixed_now());
            }
        }
    }

    #[test]
    fn stored_value_is_max_ever_submitted() {
        let (mut store, learner) = store_with_learner();
        let easy10 = slot(DifficultyTier::Easy, QuestionCount::Ten);
        let mut max = 0;
        for score in [12.0, 70.4, 55.0, 70.6, 3.0, 99.5, 20.0] {
            store.record_score(&learner, &unidad(1), Category::Verbos, easy10, score, fixed_now());
            max = max.max(normalize_percentage(score));
            let stored = store.category_scores(&learner, &unidad(1), Category::Verbos).best(easy10);
            assert_eq!(stored, max);
        }
        assert_eq!(max, 100);
    }

    #[test]
    fn record_reports_improvement_and_touches_activity() {
        let (mut store, learner) = store_with_learner();
        let easy10 = slot(DifficultyTier::Easy, QuestionCount::Ten);
        let later = fixed_now() + Duration::minutes(10);

        let first = store.record_score(&learner, &unidad(1), Category::Adjetivos, easy10, 60.0, fixed_now());
        assert_eq!(first, RecordOutcome::Improved { previous: 0, best: 60 });

        let second = store.record_score(&learner, &unidad(1), Category::Adjetivos, easy10, 40.0, later);
        assert_eq!(second, RecordOutcome::Kept { best: 60 });
        assert_eq!(store.profile(&learner).unwrap().last_active_at(), later);
    }

    #[test]
    fn unknown_learner_or_unit_is_ignored() {
        let (mut store, learner) = store_with_learner();
        let easy10 = slot(DifficultyTier::Easy, QuestionCount::Ten);
        let before = store.book().clone();

        let outcome = store.record_score(&LearnerId::random(), &unidad(1), Category::Verbos, easy10, 90.0, fixed_now());
        assert_eq!(outcome, RecordOutcome::Ignored);
        let outcome = store.record_score(&learner, &UnitId::new("unidad_9"), Category::Verbos, easy10, 90.0, fixed_now());
        assert_eq!(outcome, RecordOutcome::Ignored);

        assert_eq!(store.book(), &before);
        assert_eq!(store.unit_progress(&learner, &UnitId::new("unidad_9")), 0);
    }

    #[test]
    fn worked_example_verbos() {
        let (mut store, learner) = store_with_learner();
        let verbos = Category::Verbos;
        store.record_score(&learner, &unidad(1), verbos, slot(DifficultyTier::Easy, QuestionCount::Ten), 85.0, fixed_now());
        store.record_score(&learner, &unidad(1), verbos, slot(DifficultyTier::Easy, QuestionCount::TwentyFive), 90.0, fixed_now());

        assert_eq!(store.category_progress(&learner, &unidad(1), verbos), 29);
        assert!(store.is_slot_unlocked(&learner, &unidad(1), verbos, slot(DifficultyTier::Medium, QuestionCount::Ten)));
        assert!(!store.is_slot_unlocked(&learner, &unidad(1), verbos, slot(DifficultyTier::Medium, QuestionCount::TwentyFive)));
    }

    #[test]
    fn mastering_a_unit_unlocks_the_next() {
        let (mut store, learner) = store_with_learner();
        assert!(store.is_unit_unlocked(&learner, &unidad(1)));
        assert!(!store.is_unit_unlocked(&learner, &unidad(3)));

        max_out_unit(&mut store, &learner, &unidad(1));
        assert!(store.is_unit_unlocked(&learner, &unidad(3)));
        assert!(!store.is_unit_unlocked(&learner, &unidad(4)));
    }

    #[test]
    fn grammar_counts_toward_unit_progress() {
        let (mut store, learner) = store_with_learner();
        max_out_unit(&mut store, &learner, &unidad(3));
        // grammar never attempted: (100 * 3 + 0) / 4
        assert_eq!(store.unit_progress(&learner, &unidad(3)), 75);
        assert!(!store.is_unit_unlocked(&learner, &unidad(4)));

        let exercise = ExerciseId::new("ser_estar");
        store.record_grammar_score(&learner, &unidad(3), &exercise, 100.0, fixed_now());
        assert_eq!(store.unit_progress(&learner, &unidad(3)), 100);
        assert!(store.is_unit_unlocked(&learner, &unidad(4)));
    }

    #[test]
    fn exam_eligibility_tracks_unlocked_units() {
        let (mut store, learner) = store_with_learner();
        assert!(!store.is_exam_eligible(&learner));

        max_out_unit(&mut store, &learner, &unidad(1));
        // unidad_3 is now unlocked at 0%, so the mean is 50
        assert!(!store.is_exam_eligible(&learner));

        store.fill_progress(&learner, fixed_now());
        assert!(store.is_exam_eligible(&learner));
    }

    #[test]
    fn unlock_all_opens_every_unit() {
        let (mut store, learner) = store_with_learner();
        assert!(store.unlock_all(&learner));
        for n in [1, 3, 4] {
            assert!(store.is_unit_unlocked(&learner, &unidad(n)));
        }
        assert!(!store.unlock_all(&LearnerId::random()));
    }

    fn catalog_without_unidad_4() -> Arc<ContentCatalog> {
        let units = catalog()
            .units()
            .iter()
            .filter(|unit| unit.id != unidad(4))
            .cloned()
            .collect();
        Arc::new(ContentCatalog::new(units).unwrap())
    }

    #[test]
    fn graph_units_without_content_stay_locked() {
        let mut store = MasteryStore::new(
            ProfileBook::new(),
            catalog_without_unidad_4(),
            UnlockEngine::default(),
        );
        let profile = LearnerProfile::new(LearnerId::random(), "Ana", fixed_now()).unwrap();
        let learner = profile.id();
        store.insert_profile(profile);

        store.fill_progress(&learner, fixed_now());
        assert!(store.is_unit_unlocked(&learner, &unidad(3)));
        assert!(!store.is_unit_unlocked(&learner, &unidad(4)));
        assert!(store.is_exam_eligible(&learner));

        store.unlock_all(&learner);
        assert!(!store.is_unit_unlocked(&learner, &unidad(4)));
    }

    #[test]
    fn units_dropped_from_the_catalog_read_as_zero() {
        let (mut store, learner) = store_with_learner();
        store.fill_progress(&learner, fixed_now());
        assert!(store.is_unit_unlocked(&learner, &unidad(4)));

        let mut reloaded = MasteryStore::new(
            store.book().clone(),
            catalog_without_unidad_4(),
            UnlockEngine::default(),
        );
        assert!(reloaded.profile(&learner).unwrap().unit_progress(&unidad(4)).is_some());
        assert_eq!(reloaded.unit_progress(&learner, &unidad(4)), 0);
        assert!(reloaded.is_exam_eligible(&learner));

        let easy10 = slot(DifficultyTier::Easy, QuestionCount::Ten);
        let outcome = reloaded.record_score(&learner, &unidad(4), Category::Verbos, easy10, 50.0, fixed_now());
        assert_eq!(outcome, RecordOutcome::Ignored);
    }

    #[test]
    fn grammar_for_unknown_exercise_is_ignored() {
        let (mut store, learner) = store_with_learner();
        let before = store.book().clone();
        let bogus = ExerciseId::new("subjuntivo");

        let outcome = store.record_grammar_score(&learner, &unidad(3), &bogus, 90.0, fixed_now());
        assert_eq!(outcome, RecordOutcome::Ignored);
        let outcome = store.record_grammar_score(&learner, &unidad(1), &ExerciseId::new("ser_estar"), 90.0, fixed_now());
        assert_eq!(outcome, RecordOutcome::Ignored);

        assert_eq!(store.book(), &before);
        assert_eq!(store.grammar_best(&learner, &unidad(3), &bogus), 0);
    }

    #[test]
    fn new_store_materializes_skeletons_for_loaded_profiles() {
        let mut book = ProfileBook::new();
        let profile = LearnerProfile::new(LearnerId::random(), "Ana", fixed_now()).unwrap();
        let id = profile.id();
        book.insert(profile);

        let store = MasteryStore::new(book, catalog(), UnlockEngine::default());
        let loaded = store.profile(&id).unwrap();
        assert!(loaded.unit_progress(&unidad(4)).is_some());
        assert!(loaded.is_unlocked(&unidad(1)));
    }
}
