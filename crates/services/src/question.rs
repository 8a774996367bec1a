use drill_core::model::{DifficultyTier, GrammarQuestion, VocabItem};

/// How a question is shown and answered. A pure function of the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationMode {
    /// Source word shown; pick its translation.
    ChooseTranslation,
    /// Translation shown; pick the source word.
    ChooseWord,
    /// Translation or sentence shown; type the source-language answer.
    TypeWord,
}

impl PresentationMode {
    #[must_use]
    pub fn for_tier(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => Self::ChooseTranslation,
            DifficultyTier::Medium => Self::ChooseWord,
            DifficultyTier::Hard => Self::TypeWord,
        }
    }

    #[must_use]
    pub fn is_multiple_choice(self) -> bool {
        !matches!(self, Self::TypeWord)
    }
}

/// One prepared question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub expected: String,
    /// Shuffled options, empty for typed answers.
    pub options: Vec<String>,
    pub mode: PresentationMode,
    /// Example sentence or grammar hint, when the content has one.
    pub context: Option<String>,
}

impl Question {
    /// Vocabulary question; `options` is ignored for typed mode.
    #[must_use]
    pub fn vocabulary(item: &VocabItem, mode: PresentationMode, options: Vec<String>) -> Self {
        let (prompt, expected) = match mode {
            PresentationMode::ChooseTranslation => (&item.source_text, &item.target_text),
            PresentationMode::ChooseWord | PresentationMode::TypeWord => {
                (&item.target_text, &item.source_text)
            }
        };
        Self {
            prompt: prompt.clone(),
            expected: expected.clone(),
            options: if mode.is_multiple_choice() {
                options
            } else {
                Vec::new()
            },
            mode,
            context: non_empty(&item.example_sentence),
        }
    }

    #[must_use]
    pub fn grammar(question: &GrammarQuestion, hint: &str) -> Self {
        Self {
            prompt: question.sentence.clone(),
            expected: question.answer.clone(),
            options: Vec::new(),
            mode: PresentationMode::TypeWord,
            context: non_empty(hint),
        }
    }

    /// Typed question with no extra context, as used by exams.
    #[must_use]
    pub fn typed(prompt: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            expected: expected.into(),
            options: Vec::new(),
            mode: PresentationMode::TypeWord,
            context: None,
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
