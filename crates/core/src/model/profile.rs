use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{LearnerId, UnitId};
use crate::model::progress::UnitProgress;

/// Longest accepted display name, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 24;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyName,

    #[error("display name is too long ({len} characters, max {max})")]
    NameTooLong { len: usize, max: usize },
}

//
// ─── LEARNER PROFILE ───────────────────────────────────────────────────────────
//

/// A learner and everything the core tracks about them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    id: LearnerId,
    #[serde(alias = "nickname")]
    display_name: String,
    created_at: DateTime<Utc>,
    #[serde(alias = "lastSeenAt")]
    last_active_at: DateTime<Utc>,
    #[serde(default)]
    progress: BTreeMap<UnitId, UnitProgress>,
    #[serde(default)]
    unlocks: BTreeMap<UnitId, bool>,
}

impl LearnerProfile {
    /// Creates a new profile with no progress.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the trimmed name is empty or longer than
    /// [`MAX_DISPLAY_NAME_CHARS`].
    pub fn new(
        id: LearnerId,
        display_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        let display_name = validate_display_name(display_name)?;
        Ok(Self {
            id,
            display_name,
            created_at,
            last_active_at: created_at,
            progress: BTreeMap::new(),
            unlocks: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    /// Moves `last_active_at` forward; earlier timestamps are ignored.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_active_at {
            self.last_active_at = at;
        }
    }

    #[must_use]
    pub fn unit_progress(&self, unit: &UnitId) -> Option<&UnitProgress> {
        self.progress.get(unit)
    }

    pub fn unit_progress_mut(&mut self, unit: &UnitId) -> Option<&mut UnitProgress> {
        self.progress.get_mut(unit)
    }

    pub fn units(&self) -> impl Iterator<Item = (&UnitId, &UnitProgress)> {
        self.progress.iter()
    }

    /// Ensures a progress record exists for `unit`, with all categories present.
    pub fn ensure_unit(&mut self, unit: &UnitId) {
        self.progress
            .entry(unit.clone())
            .or_insert_with(UnitProgress::skeleton)
            .fill_missing_categories();
    }

    #[must_use]
    pub fn unlocks(&self) -> &BTreeMap<UnitId, bool> {
        &self.unlocks
    }

    #[must_use]
    pub fn is_unlocked(&self, unit: &UnitId) -> bool {
        self.unlocks.get(unit).copied().unwrap_or(false)
    }

    pub(crate) fn replace_unlocks(&mut self, unlocks: BTreeMap<UnitId, bool>) {
        self.unlocks = unlocks;
    }
}

fn validate_display_name(raw: &str) -> Result<String, ProfileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    let len = trimmed.chars().count();
    if len > MAX_DISPLAY_NAME_CHARS {
        return Err(ProfileError::NameTooLong {
            len,
            max: MAX_DISPLAY_NAME_CHARS,
        });
    }
    Ok(trimmed.to_owned())
}

//
// ─── PROFILE BOOK ──────────────────────────────────────────────────────────────
//

/// Every profile on the device plus the active selection. This is the
/// persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBook {
    #[serde(default)]
    active_profile_id: Option<LearnerId>,
    #[serde(default)]
    profiles: BTreeMap<LearnerId, LearnerProfile>,
}

impl ProfileBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<LearnerId> {
        self.active_profile_id
            .filter(|id| self.profiles.contains_key(id))
    }

    #[must_use]
    pub fn active(&self) -> Option<&LearnerProfile> {
        self.active_id().and_then(|id| self.profiles.get(&id))
    }

    /// Selects `id` as the active profile. Returns false if it does not exist.
    pub fn set_active(&mut self, id: LearnerId) -> bool {
        if self.profiles.contains_key(&id) {
            self.active_profile_id = Some(id);
            true
        } else {
            false
        }
    }

    /// Adds (or replaces) a profile and makes it active.
    pub fn insert(&mut self, profile: LearnerProfile) {
        let id = profile.id();
        self.profiles.insert(id, profile);
        self.active_profile_id = Some(id);
    }

    #[must_use]
    pub fn get(&self, id: &LearnerId) -> Option<&LearnerProfile> {
        self.profiles.get(id)
    }

    pub fn get_mut(&mut self, id: &LearnerId) -> Option<&mut LearnerProfile> {
        self.profiles.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LearnerProfile> {
        self.profiles.values()
    }

    /// Profiles ordered most recently active first.
    #[must_use]
    pub fn by_recent_activity(&self) -> Vec<&LearnerProfile> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| {
            b.last_active_at()
                .cmp(&a.last_active_at())
                .then_with(|| a.display_name().cmp(b.display_name()))
        });
        profiles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn new_profile_trims_name() {
        let profile = LearnerProfile::new(LearnerId::random(), "  Ana  ", fixed_now()).unwrap();
        assert_eq!(profile.display_name(), "Ana");
        assert_eq!(profile.last_active_at(), fixed_now());
    }

    #[test]
    fn rejects_blank_and_long_names() {
        let err = LearnerProfile::new(LearnerId::random(), "   ", fixed_now()).unwrap_err();
        assert_eq!(err, ProfileError::EmptyName);

        let long = "x".repeat(25);
        let err = LearnerProfile::new(LearnerId::random(), &long, fixed_now()).unwrap_err();
        assert_eq!(err, ProfileError::NameTooLong { len: 25, max: 24 });

        let exact = "ñ".repeat(24);
        assert!(LearnerProfile::new(LearnerId::random(), &exact, fixed_now()).is_ok());
    }

    #[test]
    fn touch_never_moves_backwards() {
        let mut profile = LearnerProfile::new(LearnerId::random(), "Ana", fixed_now()).unwrap();
        profile.touch(fixed_now() - Duration::hours(1));
        assert_eq!(profile.last_active_at(), fixed_now());
        profile.touch(fixed_now() + Duration::hours(1));
        assert_eq!(profile.last_active_at(), fixed_now() + Duration::hours(1));
    }

    #[test]
    fn book_orders_by_recent_activity() {
        let mut book = ProfileBook::new();
        let mut older = LearnerProfile::new(LearnerId::random(), "Older", fixed_now()).unwrap();
        let mut newer = LearnerProfile::new(LearnerId::random(), "Newer", fixed_now()).unwrap();
        older.touch(fixed_now() + Duration::minutes(1));
        newer.touch(fixed_now() + Duration::minutes(5));
        book.insert(older);
        book.insert(newer);

        let names: Vec<_> = book
            .by_recent_activity()
            .iter()
            .map(|p| p.display_name())
            .collect();
        assert_eq!(names, ["Newer", "Older"]);
    }

    #[test]
    fn active_id_ignores_dangling_selection() {
        let mut book = ProfileBook::new();
        assert!(!book.set_active(LearnerId::random()));
        assert!(book.active().is_none());

        let profile = LearnerProfile::new(LearnerId::random(), "Ana", fixed_now()).unwrap();
        let id = profile.id();
        book.insert(profile);
        assert_eq!(book.active_id(), Some(id));
    }

    #[test]
    fn document_accepts_legacy_field_names() {
        let id = LearnerId::random();
        let raw = format!(
            r#"{{
                "activeProfileId": "{id}",
                "profiles": {{
                    "{id}": {{
                        "id": "{id}",
                        "nickname": "Ana",
                        "createdAt": "2023-11-14T22:13:20Z",
                        "lastSeenAt": "2023-11-14T22:13:20Z",
                        "progress": {{ "unidad_1": {{ "verbos": {{ "easy10": 85 }} }} }},
                        "unlocks": {{ "unidad_3": false }}
                    }}
                }}
            }}"#
        );
        let book: ProfileBook = serde_json::from_str(&raw).unwrap();
        let profile = book.active().unwrap();
        assert_eq!(profile.display_name(), "Ana");
        let unit = profile.unit_progress(&UnitId::new("unidad_1")).unwrap();
        assert_eq!(unit.category_progress(crate::model::Category::Verbos), 14);
    }
}
