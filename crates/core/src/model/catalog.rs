use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ExerciseId, UnitId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unit id cannot be empty")]
    EmptyUnitId,

    #[error("duplicate unit id: {0}")]
    DuplicateUnit(UnitId),

    #[error("unit {unit} declares exercise {exercise} twice")]
    DuplicateExercise { unit: UnitId, exercise: ExerciseId },

    #[error("unrecognized category: {0}")]
    UnknownCategory(String),
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Vocabulary category within a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sustantivos,
    Adjetivos,
    Verbos,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Sustantivos, Self::Adjetivos, Self::Verbos];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sustantivos => "sustantivos",
            Self::Adjetivos => "adjetivos",
            Self::Verbos => "verbos",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sustantivos" | "nouns" => Ok(Self::Sustantivos),
            "adjetivos" | "adjectives" => Ok(Self::Adjetivos),
            "verbos" | "verbs" => Ok(Self::Verbos),
            _ => Err(CatalogError::UnknownCategory(s.to_owned())),
        }
    }
}

//
// ─── CONTENT ITEMS ─────────────────────────────────────────────────────────────
//

/// A single vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabItem {
    #[serde(alias = "spanish", alias = "source")]
    pub source_text: String,
    #[serde(alias = "ru", alias = "target")]
    pub target_text: String,
    #[serde(alias = "sentence", alias = "example", default)]
    pub example_sentence: String,
}

impl VocabItem {
    #[must_use]
    pub fn new(
        source_text: impl Into<String>,
        target_text: impl Into<String>,
        example_sentence: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            target_text: target_text.into(),
            example_sentence: example_sentence.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarQuestion {
    pub sentence: String,
    pub answer: String,
}

/// An ordered set of fill-in questions practicing one grammar point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarExercise {
    pub id: ExerciseId,
    pub title: String,
    #[serde(default)]
    pub hint: String,
    pub questions: Vec<GrammarQuestion>,
}

/// A named group of exercises sampled together when assembling an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarCluster {
    pub label: String,
    pub exercise_ids: Vec<ExerciseId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tense {
    Presente,
    Preterito,
}

/// Grammatical persons in conjugation order.
pub const PRONOUNS: [&str; 6] = ["yo", "tú", "él/ella", "nosotros", "vosotros", "ellos/ellas"];

/// Six conjugated forms of one verb in one tense, ordered as [`PRONOUNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbTable {
    pub infinitive: String,
    pub tense: Tense,
    pub conjugations: [String; 6],
}

//
// ─── UNIT ──────────────────────────────────────────────────────────────────────
//

/// One content module: three vocabulary pools plus its grammar material.
///
/// Every part except the id may be absent in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(default)]
    pub categories: BTreeMap<Category, Vec<VocabItem>>,
    #[serde(default)]
    pub grammar: Vec<GrammarExercise>,
    #[serde(default)]
    pub clusters: Vec<GrammarCluster>,
    #[serde(default)]
    pub verbs: Vec<VerbTable>,
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId) -> Self {
        Self {
            id,
            categories: BTreeMap::new(),
            grammar: Vec::new(),
            clusters: Vec::new(),
            verbs: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: Category, items: Vec<VocabItem>) -> Self {
        self.categories.insert(category, items);
        self
    }

    #[must_use]
    pub fn with_exercise(mut self, exercise: GrammarExercise) -> Self {
        self.grammar.push(exercise);
        self
    }

    #[must_use]
    pub fn with_cluster(mut self, cluster: GrammarCluster) -> Self {
        self.clusters.push(cluster);
        self
    }

    #[must_use]
    pub fn with_verb(mut self, verb: VerbTable) -> Self {
        self.verbs.push(verb);
        self
    }

    /// Vocabulary pool for a category; empty when the category is absent.
    #[must_use]
    pub fn pool(&self, category: Category) -> &[VocabItem] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn exercise(&self, id: &ExerciseId) -> Option<&GrammarExercise> {
        self.grammar.iter().find(|exercise| &exercise.id == id)
    }

    #[must_use]
    pub fn exercise_ids(&self) -> Vec<ExerciseId> {
        self.grammar.iter().map(|exercise| exercise.id.clone()).collect()
    }

    #[must_use]
    pub fn has_grammar(&self) -> bool {
        !self.grammar.is_empty()
    }

    /// Clusters used for exam assembly.
    ///
    /// A unit that declares no clusters gets one single-exercise cluster per exercise.
    #[must_use]
    pub fn effective_clusters(&self) -> Vec<GrammarCluster> {
        if !self.clusters.is_empty() {
            return self.clusters.clone();
        }
        self.grammar
            .iter()
            .map(|exercise| GrammarCluster {
                label: exercise.title.clone(),
                exercise_ids: vec![exercise.id.clone()],
            })
            .collect()
    }

    #[must_use]
    pub fn verbs_for(&self, tense: Tense) -> Vec<&VerbTable> {
        self.verbs.iter().filter(|verb| verb.tense == tense).collect()
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.id.as_str().trim().is_empty() {
            return Err(CatalogError::EmptyUnitId);
        }
        for (idx, exercise) in self.grammar.iter().enumerate() {
            if self.grammar[..idx].iter().any(|other| other.id == exercise.id) {
                return Err(CatalogError::DuplicateExercise {
                    unit: self.id.clone(),
                    exercise: exercise.id.clone(),
                });
            }
        }
        Ok(())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only content definition, in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentCatalog {
    units: Vec<Unit>,
}

impl ContentCatalog {
    /// Builds a catalog from already-loaded units.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` on empty or duplicate unit ids and duplicate exercise ids.
    pub fn new(units: Vec<Unit>) -> Result<Self, CatalogError> {
        for (idx, unit) in units.iter().enumerate() {
            unit.validate()?;
            if units[..idx].iter().any(|other| other.id == unit.id) {
                return Err(CatalogError::DuplicateUnit(unit.id.clone()));
            }
        }
        Ok(Self { units })
    }

    /// Parses a JSON document holding either a list of units or a single unit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Malformed` when the document does not match the
    /// unit shape, or a validation error from [`ContentCatalog::new`].
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Document {
            Many(Vec<Unit>),
            Wrapped { units: Vec<Unit> },
            One(Unit),
        }

        let units = match serde_json::from_str::<Document>(raw)? {
            Document::Many(units) | Document::Wrapped { units } => units,
            Document::One(unit) => vec![unit],
        };
        Self::new(units)
    }

    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| &unit.id == id)
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = &UnitId> {
        self.units.iter().map(|unit| &unit.id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIDAD_1: &str = r#"
    {
        "id": "unidad_1",
        "categories": {
            "sustantivos": [
                { "spanish": "el libro", "ru": "книга", "sentence": "Leo ___ todos los días" },
                { "spanish": "la casa", "ru": "дом", "sentence": "Mi ___ es grande" }
            ],
            "verbos": [
                { "source": "hablar", "target": "говорить" }
            ]
        }
    }
    "#;

    #[test]
    fn parses_single_unit_with_legacy_field_names() {
        let catalog = ContentCatalog::from_json(UNIDAD_1).unwrap();
        let unit = catalog.unit(&UnitId::new("unidad_1")).unwrap();

        let nouns = unit.pool(Category::Sustantivos);
        assert_eq!(nouns.len(), 2);
        assert_eq!(nouns[0].source_text, "el libro");
        assert_eq!(nouns[0].target_text, "книга");
        assert_eq!(unit.pool(Category::Verbos)[0].example_sentence, "");
        assert!(unit.pool(Category::Adjetivos).is_empty());
        assert!(!unit.has_grammar());
    }

    #[test]
    fn parses_unit_lists() {
        let raw = r#"[{ "id": "unidad_1" }, { "id": "unidad_3" }]"#;
        let catalog = ContentCatalog::from_json(raw).unwrap();
        let ids: Vec<_> = catalog.unit_ids().map(UnitId::as_str).collect();
        assert_eq!(ids, ["unidad_1", "unidad_3"]);

        let wrapped = r#"{ "units": [{ "id": "unidad_4" }] }"#;
        assert_eq!(ContentCatalog::from_json(wrapped).unwrap().units().len(), 1);
    }

    #[test]
    fn rejects_duplicate_units() {
        let raw = r#"[{ "id": "unidad_1" }, { "id": "unidad_1" }]"#;
        let err = ContentCatalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateUnit(id) if id.as_str() == "unidad_1"));
    }

    #[test]
    fn rejects_duplicate_exercises() {
        let exercise = GrammarExercise {
            id: ExerciseId::new("ser"),
            title: "Ser".into(),
            hint: String::new(),
            questions: Vec::new(),
        };
        let unit = Unit::new(UnitId::new("unidad_1"))
            .with_exercise(exercise.clone())
            .with_exercise(exercise);
        let err = ContentCatalog::new(vec![unit]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateExercise { .. }));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = ContentCatalog::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn clusters_default_to_one_per_exercise() {
        let unit = Unit::new(UnitId::new("unidad_1"))
            .with_exercise(GrammarExercise {
                id: ExerciseId::new("ser"),
                title: "Ser".into(),
                hint: String::new(),
                questions: Vec::new(),
            })
            .with_exercise(GrammarExercise {
                id: ExerciseId::new("estar"),
                title: "Estar".into(),
                hint: String::new(),
                questions: Vec::new(),
            });

        let clusters = unit.effective_clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1].label, "Estar");
        assert_eq!(clusters[1].exercise_ids, vec![ExerciseId::new("estar")]);
    }

    #[test]
    fn category_parses_english_aliases() {
        assert_eq!("nouns".parse::<Category>().unwrap(), Category::Sustantivos);
        assert_eq!("Verbos".parse::<Category>().unwrap(), Category::Verbos);
        assert!("adverbios".parse::<Category>().is_err());
    }
}
