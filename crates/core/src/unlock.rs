//! Access gating derived from mastery.
//!
//! Nothing here stores state of its own: every answer is a function of the
//! learner's progress plus the previous unlock map (to keep unlocks sticky).

use std::collections::BTreeMap;

use crate::model::{CategoryProgress, DifficultyTier, QuestionCount, ScoreSlot, UnitId};

/// Mastery percentage at which the next rung or unit opens.
pub const DEFAULT_MASTERY_THRESHOLD: u8 = 80;

//
// ─── PREREQUISITE GRAPH ────────────────────────────────────────────────────────
//

/// Maps each unit to its single prerequisite, or none for root units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteGraph {
    edges: BTreeMap<UnitId, Option<UnitId>>,
}

impl PrerequisiteGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain where each unit requires the one before it.
    #[must_use]
    pub fn linear<I, U>(units: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UnitId>,
    {
        let mut graph = Self::new();
        let mut previous: Option<UnitId> = None;
        for unit in units {
            let unit = unit.into();
            graph.edges.insert(unit.clone(), previous.take());
            previous = Some(unit);
        }
        graph
    }

    /// The `unidad_1 → unidad_3 → unidad_4` chain of the Spanish course.
    #[must_use]
    pub fn course_default() -> Self {
        Self::linear(["unidad_1", "unidad_3", "unidad_4"])
    }

    #[must_use]
    pub fn with_edge(mut self, unit: UnitId, prerequisite: Option<UnitId>) -> Self {
        self.edges.insert(unit, prerequisite);
        self
    }

    /// The unit's prerequisite; units missing from the graph have none.
    #[must_use]
    pub fn prerequisite(&self, unit: &UnitId) -> Option<&UnitId> {
        self.edges.get(unit).and_then(Option::as_ref)
    }
}

//
// ─── UNLOCK STATE ──────────────────────────────────────────────────────────────
//

/// Which units are accessible. Derived; rebuilt by [`UnlockEngine::recompute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockState {
    units: BTreeMap<UnitId, bool>,
}

impl UnlockState {
    #[must_use]
    pub fn is_unlocked(&self, unit: &UnitId) -> bool {
        self.units.get(unit).copied().unwrap_or(false)
    }

    pub fn unlocked_units(&self) -> impl Iterator<Item = &UnitId> {
        self.units
            .iter()
            .filter_map(|(unit, unlocked)| unlocked.then_some(unit))
    }

    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<UnitId, bool> {
        &self.units
    }

    #[must_use]
    pub fn into_map(self) -> BTreeMap<UnitId, bool> {
        self.units
    }
}

impl From<BTreeMap<UnitId, bool>> for UnlockState {
    fn from(units: BTreeMap<UnitId, bool>) -> Self {
        Self { units }
    }
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Computes unit unlocks, tier gating and exam eligibility.
#[derive(Debug, Clone)]
pub struct UnlockEngine {
    graph: PrerequisiteGraph,
    threshold: u8,
}

impl Default for UnlockEngine {
    fn default() -> Self {
        Self::new(PrerequisiteGraph::course_default())
    }
}

impl UnlockEngine {
    #[must_use]
    pub fn new(graph: PrerequisiteGraph) -> Self {
        Self {
            graph,
            threshold: DEFAULT_MASTERY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &PrerequisiteGraph {
        &self.graph
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Rebuilds the unlock map for `units`.
    ///
    /// A unit is unlocked when it has no prerequisite, when its prerequisite's
    /// unit progress reaches the threshold, or when `previous` already had it
    /// unlocked. Units are never re-locked. Graph units not listed in `units`
    /// are left as `previous` had them.
    pub fn recompute<'a, F>(
        &self,
        units: impl IntoIterator<Item = &'a UnitId>,
        previous: &UnlockState,
        unit_progress: F,
    ) -> UnlockState
    where
        F: Fn(&UnitId) -> u8,
    {
        let mut next = previous.clone();
        for unit in units {
            let unlocked = previous.is_unlocked(unit)
                || match self.graph.prerequisite(unit) {
                    None => true,
                    Some(prerequisite) => unit_progress(prerequisite) >= self.threshold,
                };
            next.units.insert(unit.clone(), unlocked);
        }
        next
    }

    /// Tier ladder within a category.
    ///
    /// `easy/10` is always open; every other rung needs the rung(s) below it
    /// at or above the threshold.
    #[must_use]
    pub fn is_slot_unlocked(&self, progress: &CategoryProgress, slot: ScoreSlot) -> bool {
        let passed = |tier, count| progress.best(ScoreSlot::new(tier, count)) >= self.threshold;
        match (slot.tier, slot.count) {
            (DifficultyTier::Easy, QuestionCount::Ten) => true,
            (DifficultyTier::Easy, QuestionCount::TwentyFive) => {
                passed(DifficultyTier::Easy, QuestionCount::Ten)
            }
            (DifficultyTier::Medium, QuestionCount::Ten) => {
                passed(DifficultyTier::Easy, QuestionCount::Ten)
                    && passed(DifficultyTier::Easy, QuestionCount::TwentyFive)
            }
            (DifficultyTier::Medium, QuestionCount::TwentyFive) => {
                passed(DifficultyTier::Medium, QuestionCount::Ten)
            }
            (DifficultyTier::Hard, QuestionCount::Ten) => {
                passed(DifficultyTier::Medium, QuestionCount::Ten)
                    && passed(DifficultyTier::Medium, QuestionCount::TwentyFive)
            }
            (DifficultyTier::Hard, QuestionCount::TwentyFive) => {
                passed(DifficultyTier::Hard, QuestionCount::Ten)
            }
        }
    }

    /// Exam gate: the exact mean unit progress over all unlocked units meets
    /// the threshold. The mean is not rounded, so 79.5 does not pass 80.
    ///
    /// False when nothing is unlocked.
    pub fn is_exam_eligible<F>(&self, unlocks: &UnlockState, unit_progress: F) -> bool
    where
        F: Fn(&UnitId) -> u8,
    {
        let (count, sum) = unlocks
            .unlocked_units()
            .fold((0u64, 0u64), |(count, sum), unit| {
                (count + 1, sum + u64::from(unit_progress(unit)))
            });
        count > 0 && sum >= u64::from(self.threshold) * count
    }
}
