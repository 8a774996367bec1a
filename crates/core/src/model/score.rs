use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest value a stored percentage may take.
pub const MAX_PERCENT: u8 = 100;

//
// ─── TIER & COUNT ──────────────────────────────────────────────────────────────
//

/// Difficulty level of a vocabulary drill.
///
/// The tier alone decides how questions are presented:
/// - `Easy`: source-language prompt, target-language choices
/// - `Medium`: target-language prompt, source-language choices
/// - `Hard`: target-language prompt, free-text source-language answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 3] = [Self::Easy, Self::Medium, Self::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Number of questions in a drill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuestionCount {
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "25")]
    TwentyFive,
}

impl QuestionCount {
    pub const ALL: [QuestionCount; 2] = [Self::Ten, Self::TwentyFive];

    #[must_use]
    pub fn get(self) -> usize {
        match self {
            Self::Ten => 10,
            Self::TwentyFive => 25,
        }
    }
}

/// Error returned when a tier, count or slot label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {raw}")]
pub struct ParseScoreError {
    kind: &'static str,
    raw: String,
}

impl FromStr for DifficultyTier {
    type Err = ParseScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(ParseScoreError {
                kind: "tier",
                raw: s.to_owned(),
            }),
        }
    }
}

impl FromStr for QuestionCount {
    type Err = ParseScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "10" => Ok(Self::Ten),
            "25" => Ok(Self::TwentyFive),
            _ => Err(ParseScoreError {
                kind: "question count",
                raw: s.to_owned(),
            }),
        }
    }
}

//
// ─── SCORE SLOT ────────────────────────────────────────────────────────────────
//

/// One (tier, count) combination; six of them make up a category's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScoreSlot {
    pub tier: DifficultyTier,
    pub count: QuestionCount,
}

impl ScoreSlot {
    /// All six slots in ladder order.
    pub const ALL: [ScoreSlot; 6] = [
        Self::new(DifficultyTier::Easy, QuestionCount::Ten),
        Self::new(DifficultyTier::Easy, QuestionCount::TwentyFive),
        Self::new(DifficultyTier::Medium, QuestionCount::Ten),
        Self::new(DifficultyTier::Medium, QuestionCount::TwentyFive),
        Self::new(DifficultyTier::Hard, QuestionCount::Ten),
        Self::new(DifficultyTier::Hard, QuestionCount::TwentyFive),
    ];

    #[must_use]
    pub const fn new(tier: DifficultyTier, count: QuestionCount) -> Self {
        Self { tier, count }
    }
}

impl fmt::Display for ScoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tier.as_str(), self.count.get())
    }
}

impl FromStr for ScoreSlot {
    type Err = ParseScoreError;

    /// Parses the compact `easy10` / `hard25` form used in stored documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ParseScoreError {
                kind: "score slot",
                raw: s.to_owned(),
            })?;
        let (tier, count) = trimmed.split_at(split);
        Ok(Self::new(tier.parse()?, count.parse()?))
    }
}

//
// ─── CATEGORY PROGRESS ─────────────────────────────────────────────────────────
//

/// Best percentage per score slot for one category.
///
/// All six slots are always present; slots missing from a stored document
/// deserialize as 0. Values only ever move up through [`CategoryProgress::raise`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryProgress {
    easy10: u8,
    easy25: u8,
    medium10: u8,
    medium25: u8,
    hard10: u8,
    hard25: u8,
}

impl CategoryProgress {
    /// Best recorded percentage for the slot.
    #[must_use]
    pub fn best(&self, slot: ScoreSlot) -> u8 {
        *self.slot_ref(slot)
    }

    /// Stores `percentage` when it beats the current best.
    ///
    /// Returns the previous best when the slot improved, `None` otherwise.
    pub fn raise(&mut self, slot: ScoreSlot, percentage: u8) -> Option<u8> {
        let percentage = percentage.min(MAX_PERCENT);
        let current = self.slot_mut(slot);
        if percentage > *current {
            let previous = *current;
            *current = percentage;
            Some(previous)
        } else {
            None
        }
    }

    /// The six slot values in ladder order.
    #[must_use]
    pub fn values(&self) -> [u8; 6] {
        ScoreSlot::ALL.map(|slot| self.best(slot))
    }

    /// Rounded mean of the six slot values.
    #[must_use]
    pub fn mean(&self) -> u8 {
        rounded_mean(&self.values())
    }

    fn slot_ref(&self, slot: ScoreSlot) -> &u8 {
        match (slot.tier, slot.count) {
            (DifficultyTier::Easy, QuestionCount::Ten) => &self.easy10,
            (DifficultyTier::Easy, QuestionCount::TwentyFive) => &self.easy25,
            (DifficultyTier::Medium, QuestionCount::Ten) => &self.medium10,
            (DifficultyTier::Medium, QuestionCount::TwentyFive) => &self.medium25,
            (DifficultyTier::Hard, QuestionCount::Ten) => &self.hard10,
            (DifficultyTier::Hard, QuestionCount::TwentyFive) => &self.hard25,
        }
    }

    fn slot_mut(&mut self, slot: ScoreSlot) -> &mut u8 {
        match (slot.tier, slot.count) {
            (DifficultyTier::Easy, QuestionCount::Ten) => &mut self.easy10,
            (DifficultyTier::Easy, QuestionCount::TwentyFive) => &mut self.easy25,
            (DifficultyTier::Medium, QuestionCount::Ten) => &mut self.medium10,
            (DifficultyTier::Medium, QuestionCount::TwentyFive) => &mut self.medium25,
            (DifficultyTier::Hard, QuestionCount::Ten) => &mut self.hard10,
            (DifficultyTier::Hard, QuestionCount::TwentyFive) => &mut self.hard25,
        }
    }
}

//
// ─── PERCENT HELPERS ───────────────────────────────────────────────────────────
//

/// Clamps to `[0, 100]` and rounds half-up. NaN counts as 0.
#[must_use]
pub fn normalize_percentage(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    let clamped = raw.clamp(0.0, f64::from(MAX_PERCENT));
    // clamped is non-negative, so `floor(x + 0.5)` is round-half-up
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = (clamped + 0.5).floor() as u8;
    rounded.min(MAX_PERCENT)
}

/// `round(correct / total * 100)` using integer half-up rounding.
///
/// Returns 0 when `total` is 0.
#[must_use]
pub fn percentage_of(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    let value = (correct * 200 + total) / (2 * total);
    u8::try_from(value).unwrap_or(MAX_PERCENT)
}

/// Arithmetic mean of percentages, rounded half-up. Empty input yields 0.
#[must_use]
pub fn rounded_mean(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let sum: u64 = values.iter().map(|v| u64::from(*v)).sum();
    let n = values.len() as u64;
    let value = (sum * 2 + n) / (2 * n);
    u8::try_from(value).unwrap_or(MAX_PERCENT)
}
