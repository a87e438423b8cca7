use crate::text_stats::{compute_statistics, TextStatistics};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Difficulty tier of a passage
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Map a complexity score onto a tier: `<5` easy, `<10` medium, `<20` hard, else expert.
    pub fn from_complexity(score: f64) -> Self {
        if score < 5.0 {
            Difficulty::Easy
        } else if score < 10.0 {
            Difficulty::Medium
        } else if score < 20.0 {
            Difficulty::Hard
        } else {
            Difficulty::Expert
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    General,
    Programming,
    Science,
    Literature,
    Quotes,
    Technology,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassageError {
    #[error("passage text is empty")]
    EmptyText,

    #[error("passage source is empty")]
    EmptySource,
}

/// On-disk shape of a passage, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct PassageRecord {
    pub text: String,
    pub source: String,
    pub difficulty: Difficulty,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated practice passage.
///
/// Length and statistics are derived once at construction, so a `Passage`
/// never changes after it exists.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "PassageRecord")]
pub struct Passage {
    text: String,
    source: String,
    difficulty: Difficulty,
    category: Category,
    tags: Vec<String>,
    length: usize,
    stats: TextStatistics,
}

impl Passage {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        difficulty: Difficulty,
        category: Category,
        tags: Vec<String>,
    ) -> Result<Self, PassageError> {
        let text = text.into();
        let source = source.into();

        if text.is_empty() {
            return Err(PassageError::EmptyText);
        }
        if source.is_empty() {
            return Err(PassageError::EmptySource);
        }

        let mut tags = tags;
        tags.sort();
        tags.dedup();

        Ok(Self {
            length: text.chars().count(),
            stats: compute_statistics(&text),
            text,
            source,
            difficulty,
            category,
            tags,
        })
    }

    /// Wrap a quote from the external provider
    pub fn quote(content: impl Into<String>, author: impl Into<String>) -> Result<Self, PassageError> {
        Self::new(
            content,
            author,
            Difficulty::Medium,
            Category::Quotes,
            vec!["quote".to_string()],
        )
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Character count of the text
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn stats(&self) -> &TextStatistics {
        &self.stats
    }

    pub fn word_count(&self) -> usize {
        self.stats.word_count
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl TryFrom<PassageRecord> for Passage {
    type Error = PassageError;

    fn try_from(record: PassageRecord) -> Result<Self, Self::Error> {
        Passage::new(
            record.text,
            record.source,
            record.difficulty,
            record.category,
            record.tags,
        )
    }
}
