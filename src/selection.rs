use crate::catalog::Catalog;
use crate::passage::{Category, Difficulty, Passage};
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Fraction of the target word count a passage may deviate by
pub const TARGET_RATE_TOLERANCE: f64 = 0.2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no passage matches difficulty {difficulty:?} / category {category:?}")]
    NoMatchingPassage {
        difficulty: Option<Difficulty>,
        category: Option<Category>,
    },
}

/// Narrowing options for a catalog query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassageFilter {
    pub difficulty: Option<Difficulty>,
    pub category: Option<Category>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Passage must carry at least one of these
    pub tags: Vec<String>,
    /// Passage must carry none of these
    pub exclude_tags: Vec<String>,
}

impl PassageFilter {
    pub fn difficulty(difficulty: Difficulty) -> Self {
        Self {
            difficulty: Some(difficulty),
            ..Self::default()
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    pub fn matches(&self, passage: &Passage) -> bool {
        self.difficulty.map_or(true, |d| passage.difficulty() == d)
            && self.category.map_or(true, |c| passage.category() == c)
            && self.min_length.map_or(true, |min| passage.length() >= min)
            && self.max_length.map_or(true, |max| passage.length() <= max)
            && (self.tags.is_empty() || self.tags.iter().any(|t| passage.has_tag(t)))
            && !self.exclude_tags.iter().any(|t| passage.has_tag(t))
    }

    fn no_match(&self) -> SelectionError {
        SelectionError::NoMatchingPassage {
            difficulty: self.difficulty,
            category: self.category,
        }
    }
}

impl Catalog {
    /// Uniform pick, optionally restricted to one difficulty
    pub fn select_random<R: Rng + ?Sized>(
        &self,
        difficulty: Option<Difficulty>,
        rng: &mut R,
    ) -> Result<&Passage, SelectionError> {
        let filter = PassageFilter {
            difficulty,
            ..PassageFilter::default()
        };
        self.select_matching(&filter, rng)
    }

    pub fn select_matching<R: Rng + ?Sized>(
        &self,
        filter: &PassageFilter,
        rng: &mut R,
    ) -> Result<&Passage, SelectionError> {
        self.filter(filter)
            .choose(rng)
            .copied()
            .ok_or_else(|| filter.no_match())
    }

    /// Like `select_random`, but widens to the whole catalog when the tier is empty
    pub fn select_random_or_any<R: Rng + ?Sized>(
        &self,
        difficulty: Option<Difficulty>,
        rng: &mut R,
    ) -> &Passage {
        match self.select_random(difficulty, rng) {
            Ok(passage) => passage,
            Err(e) => {
                warn!("{e}; selecting from the whole catalog");
                // Catalog is never empty
                let idx = rng.gen_range(0..self.len());
                &self.passages()[idx]
            }
        }
    }

    /// Order-preserving filter
    pub fn filter(&self, filter: &PassageFilter) -> Vec<&Passage> {
        self.iter().filter(|p| filter.matches(p)).collect()
    }

    pub fn select_by_category(&self, category: Category) -> Vec<&Passage> {
        self.filter(&PassageFilter::category(category))
    }

    pub fn select_by_difficulty(&self, difficulty: Difficulty) -> Vec<&Passage> {
        self.filter(&PassageFilter::difficulty(difficulty))
    }

    /// Case-insensitive substring match over text, source and tags
    pub fn search(&self, query: &str) -> Vec<&Passage> {
        let query = query.to_lowercase();
        self.iter()
            .filter(|p| {
                p.text().to_lowercase().contains(&query)
                    || p.source().to_lowercase().contains(&query)
                    || p.tags().iter().any(|t| t.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Pick a passage whose word count is within 20% of what a typist at
    /// `target_wpm` covers in `duration_minutes`; otherwise any passage.
    pub fn select_for_target_rate<R: Rng + ?Sized>(
        &self,
        target_wpm: f64,
        duration_minutes: f64,
        rng: &mut R,
    ) -> &Passage {
        let target_words = target_word_count(target_wpm, duration_minutes);
        let tolerance = target_words as f64 * TARGET_RATE_TOLERANCE;

        let suitable = self
            .iter()
            .filter(|p| (p.word_count() as f64 - target_words as f64).abs() <= tolerance)
            .collect::<Vec<_>>();

        match suitable.choose(rng) {
            Some(passage) => *passage,
            None => self.select_random_or_any(None, rng),
        }
    }
}

pub fn target_word_count(target_wpm: f64, duration_minutes: f64) -> usize {
    let words = (target_wpm * duration_minutes).ceil();
    if words.is_finite() && words > 0.0 {
        words as usize
    } else {
        0
    }
}
