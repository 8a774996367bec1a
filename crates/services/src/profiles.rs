//! Orchestration: the active learner, session start gates and the single
//! write path from finished sessions into mastery and storage.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{info, warn};

use drill_core::model::{
    Category, ContentCatalog, LearnerId, LearnerProfile, ScoreSlot, Tense, Unit, UnitId,
};
use drill_core::{Clock, MasteryStore, RecordOutcome, UnlockEngine};
use storage::ProfileDocuments;

use crate::conjugation::ConjugationDrill;
use crate::error::{ProfileServiceError, SessionError};
use crate::exam::{ExamAssembler, ExamResult, ExamSession};
use crate::quiz::{QuizResult, QuizSession, QuizSpec, SessionKind};
use crate::settings::DrillSettings;
use crate::sync::{NoopSync, SyncHook};

/// Per-unit line of the home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOverview {
    pub unit: UnitId,
    pub unlocked: bool,
    pub progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOverview {
    pub slot: ScoreSlot,
    pub best: u8,
    pub unlocked: bool,
}

/// The six slots of one category plus their mean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOverview {
    pub unit: UnitId,
    pub category: Category,
    pub slots: Vec<SlotOverview>,
    pub progress: u8,
}

/// Owns the mastery store and persists it after every change.
///
/// Persistence failures leave the in-memory state as it was after the change
/// and are returned to the caller; [`ProfileManager::flush`] retries.
pub struct ProfileManager {
    clock: Clock,
    settings: DrillSettings,
    store: MasteryStore,
    documents: ProfileDocuments,
    sync: Arc<dyn SyncHook>,
    rng: StdRng,
    dirty: bool,
}

impl ProfileManager {
    #[must_use]
    pub fn new(clock: Clock, store: MasteryStore, documents: ProfileDocuments) -> Self {
        Self {
            clock,
            settings: DrillSettings::default(),
            store,
            documents,
            sync: Arc::new(NoopSync),
            rng: StdRng::from_rng(&mut rand::rng()),
            dirty: false,
        }
    }

    /// Loads the stored profile book and wraps it for `catalog`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the document cannot be read
    /// or decoded.
    pub async fn load(
        clock: Clock,
        catalog: Arc<ContentCatalog>,
        engine: UnlockEngine,
        documents: ProfileDocuments,
    ) -> Result<Self, ProfileServiceError> {
        let book = documents.load().await?;
        info!(profiles = book.len(), key = documents.key(), "profiles loaded");
        let store = MasteryStore::new(book, catalog, engine);
        Ok(Self::new(clock, store, documents))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: DrillSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: Arc<dyn SyncHook>) -> Self {
        self.sync = sync;
        self
    }

    /// Seeds sampling for reproducible sessions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn settings(&self) -> &DrillSettings {
        &self.settings
    }

    #[must_use]
    pub fn store(&self) -> &MasteryStore {
        &self.store
    }

    /// True when the last save failed and memory is ahead of storage.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    //
    // ─── PROFILES ──────────────────────────────────────────────────────────────
    //

    /// Profiles, most recently active first.
    #[must_use]
    pub fn profiles(&self) -> Vec<&LearnerProfile> {
        self.store.book().by_recent_activity()
    }

    #[must_use]
    pub fn active(&self) -> Option<&LearnerProfile> {
        self.store.book().active()
    }

    /// Creates a profile, makes it active and saves.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Profile` for an invalid nickname, or
    /// `ProfileServiceError::Storage` if the save fails (the profile is kept).
    pub async fn create_profile(&mut self, nickname: &str) -> Result<LearnerId, ProfileServiceError> {
        let profile = LearnerProfile::new(LearnerId::random(), nickname, self.clock.now())?;
        let id = profile.id();
        info!(learner = %id, name = profile.display_name(), "profile created");
        self.store.insert_profile(profile);
        self.persist().await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::UnknownProfile` if `id` does not exist.
    pub async fn select_profile(&mut self, id: LearnerId) -> Result<(), ProfileServiceError> {
        if !self.store.select(&id, self.clock.now()) {
            return Err(ProfileServiceError::UnknownProfile(id));
        }
        self.store.ensure_skeleton(&id);
        self.persist().await
    }

    //
    // ─── VIEWS ─────────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ProfileServiceError::NoActiveProfile` without an active learner.
    pub fn unit_overview(&self) -> Result<Vec<UnitOverview>, ProfileServiceError> {
        let learner = self.active_id()?;
        Ok(self
            .store
            .catalog()
            .unit_ids()
            .map(|unit| UnitOverview {
                unit: unit.clone(),
                unlocked: self.store.is_unit_unlocked(&learner, unit),
                progress: self.store.unit_progress(&learner, unit),
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::NoActiveProfile` without an active learner.
    pub fn category_overview(
        &self,
        unit: &UnitId,
        category: Category,
    ) -> Result<CategoryOverview, ProfileServiceError> {
        let learner = self.active_id()?;
        let scores = self.store.category_scores(&learner, unit, category);
        let slots = ScoreSlot::ALL
            .into_iter()
            .map(|slot| SlotOverview {
                slot,
                best: scores.best(slot),
                unlocked: self.store.engine().is_slot_unlocked(&scores, slot),
            })
            .collect();
        Ok(CategoryOverview {
            unit: unit.clone(),
            category,
            slots,
            progress: scores.mean(),
        })
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::NoActiveProfile` without an active learner.
    pub fn exam_eligible(&self) -> Result<bool, ProfileServiceError> {
        let learner = self.active_id()?;
        Ok(self.store.is_exam_eligible(&learner))
    }

    //
    // ─── SESSIONS ──────────────────────────────────────────────────────────────
    //

    /// Prepares and starts a quiz for the active learner.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` (wrapped) when the unit is unknown or locked,
    /// the slot is locked, or there is nothing to ask.
    pub fn start_quiz(&mut self, spec: QuizSpec) -> Result<QuizSession, ProfileServiceError> {
        let learner = self.active_id()?;
        let unit = unlocked_unit(&self.store, &learner, &spec.unit)?;
        if let SessionKind::Vocabulary { category, slot } = spec.kind {
            if !self.store.is_slot_unlocked(&learner, &spec.unit, category, slot) {
                return Err(SessionError::SlotLocked { category, slot }.into());
            }
        }
        let mut session = QuizSession::prepare(learner, spec, unit, &self.settings, &mut self.rng)?;
        session.start(self.clock.now());
        Ok(session)
    }

    /// Writes a finished quiz through to mastery, then saves.
    ///
    /// Vocabulary results go to their score slot, grammar results to their
    /// exercise. The result is consumed, so it can only be recorded once.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the save fails; the score is
    /// still recorded in memory.
    pub async fn complete_quiz(
        &mut self,
        result: QuizResult,
    ) -> Result<RecordOutcome, ProfileServiceError> {
        let QuizResult {
            learner,
            spec,
            percentage,
            ..
        } = result;
        let at = self.clock.now();
        let outcome = match &spec.kind {
            SessionKind::Vocabulary { category, slot } => self.store.record_score(
                &learner,
                &spec.unit,
                *category,
                *slot,
                f64::from(percentage),
                at,
            ),
            SessionKind::Grammar { exercise } => self.store.record_grammar_score(
                &learner,
                &spec.unit,
                exercise,
                f64::from(percentage),
                at,
            ),
        };
        if let RecordOutcome::Improved { previous, best } = outcome {
            info!(
                learner = %learner,
                unit = %spec.unit,
                kind = spec.kind.tag(),
                previous,
                best,
                "best score improved"
            );
        }
        if outcome != RecordOutcome::Ignored {
            self.persist().await?;
        }
        Ok(outcome)
    }

    /// Builds and starts an exam on `unit`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ExamLocked` until the learner is eligible, plus
    /// the same unit errors as [`ProfileManager::start_quiz`].
    pub fn start_exam(&mut self, unit: &UnitId) -> Result<ExamSession, ProfileServiceError> {
        let learner = self.active_id()?;
        if !self.store.is_exam_eligible(&learner) {
            return Err(SessionError::ExamLocked.into());
        }
        let content = unlocked_unit(&self.store, &learner, unit)?;
        let blueprint = ExamAssembler::new(&self.settings).build(content, &mut self.rng);
        let mut session = ExamSession::new(learner, blueprint, &self.settings)?;
        session.start(self.clock.now());
        Ok(session)
    }

    /// Records exam activity. Exams do not change mastery.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the save fails.
    pub async fn complete_exam(&mut self, result: ExamResult) -> Result<(), ProfileServiceError> {
        info!(
            learner = %result.learner,
            unit = %result.unit,
            percentage = result.percentage,
            "exam finished"
        );
        if self.store.touch(&result.learner, self.clock.now()) {
            self.persist().await?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Empty` (wrapped) if the unit has no verbs in `tense`.
    pub fn conjugation_drill(
        &mut self,
        unit: &UnitId,
        tense: Tense,
    ) -> Result<ConjugationDrill, ProfileServiceError> {
        let learner = self.active_id()?;
        let content = unlocked_unit(&self.store, &learner, unit)?;
        Ok(ConjugationDrill::pick(content, tense, &mut self.rng)?)
    }

    //
    // ─── DEVELOPER TOOLS ───────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Returns `ProfileServiceError::NoActiveProfile` or a storage error.
    pub async fn unlock_all(&mut self) -> Result<(), ProfileServiceError> {
        let learner = self.active_id()?;
        self.store.unlock_all(&learner);
        warn!(learner = %learner, "all units unlocked by developer tool");
        self.persist().await
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::NoActiveProfile` or a storage error.
    pub async fn fill_progress(&mut self) -> Result<(), ProfileServiceError> {
        let learner = self.active_id()?;
        self.store.fill_progress(&learner, self.clock.now());
        warn!(learner = %learner, "progress filled by developer tool");
        self.persist().await
    }

    //
    // ─── PERSISTENCE ───────────────────────────────────────────────────────────
    //

    /// Saves the current in-memory book, e.g. after an earlier failure.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the save fails again.
    pub async fn flush(&mut self) -> Result<(), ProfileServiceError> {
        self.persist().await
    }

    async fn persist(&mut self) -> Result<(), ProfileServiceError> {
        match self.documents.save(self.store.book(), self.clock.now()).await {
            Ok(()) => {
                self.dirty = false;
                self.sync.state_changed(self.store.book());
                Ok(())
            }
            Err(err) => {
                self.dirty = true;
                warn!(error = %err, key = self.documents.key(), "failed to save profiles");
                Err(err.into())
            }
        }
    }

    fn active_id(&self) -> Result<LearnerId, ProfileServiceError> {
        self.store
            .book()
            .active_id()
            .ok_or(ProfileServiceError::NoActiveProfile)
    }
}

fn unlocked_unit<'a>(
    store: &'a MasteryStore,
    learner: &LearnerId,
    unit: &UnitId,
) -> Result<&'a Unit, ProfileServiceError> {
    let content = store
        .catalog()
        .unit(unit)
        .ok_or_else(|| SessionError::UnknownUnit(unit.clone()))?;
    if !store.is_unit_unlocked(learner, unit) {
        return Err(SessionError::UnitLocked(unit.clone()).into());
    }
    Ok(content)
}
