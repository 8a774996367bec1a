use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use drill_core::model::{Category, GrammarCluster, GrammarQuestion, Unit, UnitId};

use crate::sampling::sample;
use crate::settings::DrillSettings;

/// Where an exam question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Vocabulary(Category),
    Grammar,
}

/// One exam question: a prompt with its expected free-text answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamItem {
    pub payload: String,
    pub expected: String,
    pub source: SourceKind,
    /// Category name for vocabulary, cluster label for grammar.
    pub cluster_label: String,
}

/// Frozen question list for one exam attempt: vocabulary first, then grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamBlueprint {
    unit: UnitId,
    items: Vec<ExamItem>,
}

impl ExamBlueprint {
    #[must_use]
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    #[must_use]
    pub fn items(&self) -> &[ExamItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn into_parts(self) -> (UnitId, Vec<ExamItem>) {
        (self.unit, self.items)
    }
}

/// Samples an exam from a unit's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExamAssembler {
    items_per_category: usize,
    cluster_target: usize,
    per_exercise_cap: usize,
}

impl ExamAssembler {
    #[must_use]
    pub fn new(settings: &DrillSettings) -> Self {
        Self {
            items_per_category: settings.exam_items_per_category(),
            cluster_target: settings.cluster_target(),
            per_exercise_cap: settings.per_exercise_cap(),
        }
    }

    /// Builds a blueprint for `unit`.
    ///
    /// Each category contributes up to `items_per_category` distinct items.
    /// Each grammar cluster contributes up to `cluster_target` distinct
    /// questions; a multi-exercise cluster takes at most `per_exercise_cap`
    /// from each member, so it may come up short. Pools smaller than their
    /// target yield fewer questions, never more.
    pub fn build<R: Rng + ?Sized>(&self, unit: &Unit, rng: &mut R) -> ExamBlueprint {
        let mut items = Vec::new();

        for category in Category::ALL {
            for word in sample(unit.pool(category), self.items_per_category, rng) {
                items.push(ExamItem {
                    payload: word.target_text,
                    expected: word.source_text,
                    source: SourceKind::Vocabulary(category),
                    cluster_label: category.as_str().to_owned(),
                });
            }
        }

        for cluster in unit.effective_clusters() {
            let picked = self.sample_cluster(unit, &cluster, rng);
            if picked.len() < self.cluster_target {
                debug!(
                    unit = %unit.id,
                    cluster = %cluster.label,
                    picked = picked.len(),
                    target = self.cluster_target,
                    "cluster under-filled"
                );
            }
            items.extend(picked.into_iter().map(|question| ExamItem {
                payload: question.sentence,
                expected: question.answer,
                source: SourceKind::Grammar,
                cluster_label: cluster.label.clone(),
            }));
        }

        ExamBlueprint {
            unit: unit.id.clone(),
            items,
        }
    }

    fn sample_cluster<R: Rng + ?Sized>(
        &self,
        unit: &Unit,
        cluster: &GrammarCluster,
        rng: &mut R,
    ) -> Vec<GrammarQuestion> {
        let exercises: Vec<_> = cluster
            .exercise_ids
            .iter()
            .filter_map(|id| {
                let found = unit.exercise(id);
                if found.is_none() {
                    warn!(unit = %unit.id, exercise = %id, "cluster names unknown exercise");
                }
                found
            })
            .collect();

        match exercises.as_slice() {
            [] => Vec::new(),
            [single] => sample(&single.questions, self.cluster_target, rng),
            many => {
                let mut pooled: Vec<GrammarQuestion> = many
                    .iter()
                    .flat_map(|exercise| sample(&exercise.questions, self.per_exercise_cap, rng))
                    .collect();
                pooled.shuffle(rng);
                pooled.truncate(self.cluster_target);
                pooled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{ExerciseId, GrammarExercise, VocabItem};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn words(prefix: &str, n: usize) -> Vec<VocabItem> {
        (0..n)
            .map(|i| VocabItem::new(format!("{prefix}{i}"), format!("ru-{prefix}{i}"), ""))
            .collect()
    }

    fn exercise(id: &str, n: usize) -> GrammarExercise {
        GrammarExercise {
            id: ExerciseId::new(id),
            title: id.to_uppercase(),
            hint: String::new(),
            questions: (0..n)
                .map(|i| GrammarQuestion {
                    sentence: format!("{id} ___ {i}"),
                    answer: format!("{id}{i}"),
                })
                .collect(),
        }
    }

    fn unit_with(sizes: [usize; 3]) -> Unit {
        Unit::new(UnitId::new("unidad_3"))
            .with_category(Category::Sustantivos, words("s", sizes[0]))
            .with_category(Category::Adjetivos, words("a", sizes[1]))
            .with_category(Category::Verbos, words("v", sizes[2]))
    }

    fn assembler() -> ExamAssembler {
        ExamAssembler::new(&DrillSettings::default())
    }

    #[test]
    fn full_pools_yield_thirty_five_questions() {
        let unit = unit_with([20, 20, 20]).with_exercise(exercise("ser", 12));
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(5));

        assert_eq!(blueprint.len(), 35);
        let grammar = blueprint
            .items()
            .iter()
            .filter(|item| item.source == SourceKind::Grammar)
            .count();
        assert_eq!(grammar, 5);
    }

    #[test]
    fn vocabulary_precedes_grammar_in_category_order() {
        let unit = unit_with([12, 12, 12]).with_exercise(exercise("ser", 12));
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(9));
        let labels: Vec<&str> = blueprint
            .items()
            .iter()
            .map(|item| item.cluster_label.as_str())
            .collect();

        assert!(labels[..10].iter().all(|l| *l == "sustantivos"));
        assert!(labels[10..20].iter().all(|l| *l == "adjetivos"));
        assert!(labels[20..30].iter().all(|l| *l == "verbos"));
        assert!(labels[30..].iter().all(|l| *l == "SER"));
    }

    #[test]
    fn short_pools_under_fill_without_duplicates() {
        let unit = unit_with([4, 0, 10]).with_exercise(exercise("ser", 3));
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(1));

        assert_eq!(blueprint.len(), 4 + 10 + 3);
        let mut payloads: Vec<&str> = blueprint.items().iter().map(|i| i.payload.as_str()).collect();
        payloads.sort_unstable();
        payloads.dedup();
        assert_eq!(payloads.len(), blueprint.len());
    }

    #[test]
    fn multi_exercise_cluster_respects_cap_and_target() {
        let unit = unit_with([0, 0, 0])
            .with_exercise(exercise("ser", 10))
            .with_exercise(exercise("estar", 10))
            .with_exercise(exercise("haber", 10))
            .with_cluster(GrammarCluster {
                label: "verbos auxiliares".into(),
                exercise_ids: vec![
                    ExerciseId::new("ser"),
                    ExerciseId::new("estar"),
                    ExerciseId::new("haber"),
                ],
            });
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(3));

        assert_eq!(blueprint.len(), 5);
        for prefix in ["ser", "estar", "haber"] {
            let from_exercise = blueprint
                .items()
                .iter()
                .filter(|item| item.expected.starts_with(prefix))
                .count();
            assert!(from_exercise <= 2, "{prefix} contributed {from_exercise}");
        }
    }

    #[test]
    fn two_exercise_cluster_under_fills_to_cap_total() {
        let unit = unit_with([0, 0, 0])
            .with_exercise(exercise("ser", 10))
            .with_exercise(exercise("estar", 1))
            .with_cluster(GrammarCluster {
                label: "ser y estar".into(),
                exercise_ids: vec![ExerciseId::new("ser"), ExerciseId::new("estar"), ExerciseId::new("falta")],
            });
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(11));
        assert_eq!(blueprint.len(), 3);
    }

    #[test]
    fn unit_without_grammar_is_vocabulary_only() {
        let unit = unit_with([10, 10, 10]);
        let blueprint = assembler().build(&unit, &mut StdRng::seed_from_u64(2));
        assert_eq!(blueprint.len(), 30);
        assert!(blueprint
            .items()
            .iter()
            .all(|item| matches!(item.source, SourceKind::Vocabulary(_))));
    }
}
