//! Lexical statistics and the complexity score used to grade passages.

use crate::passage::Difficulty;
use crate::util::{ratio, round2};

/// Vocabulary that marks a word as technical for the complexity score
pub const TECHNICAL_TERMS: &[&str] = &[
    "algorithm",
    "quantum",
    "neural",
    "optimization",
    "microservice",
    "architecture",
    "implementation",
    "hyperparameter",
    "backpropagation",
    "superposition",
    "gradient",
    "matrix",
    "vector",
    "probability",
    "statistical",
    "computational",
];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextStatistics {
    pub word_count: usize,
    pub char_count: usize,
    pub sentence_count: usize,
    pub special_char_count: usize,
    /// Mean word length with non-word characters stripped, 2 decimals
    pub avg_word_length: f64,
    /// Weighted complexity score, 2 decimals
    pub complexity: f64,
}

/// Breakdown of the inputs behind a complexity score
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DifficultyMetrics {
    pub avg_word_length: f64,
    pub sentence_complexity: f64,
    pub special_characters: usize,
    pub technical_terms: usize,
    pub score: f64,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_special_char(c: char) -> bool {
    !c.is_ascii_alphanumeric() && !c.is_whitespace()
}

fn stripped_len(word: &str) -> usize {
    word.chars().filter(|&c| is_word_char(c)).count()
}

fn is_technical(word: &str) -> bool {
    let normalized: String = word
        .to_lowercase()
        .chars()
        .filter(|&c| is_word_char(c))
        .collect();
    TECHNICAL_TERMS.contains(&normalized.as_str())
}

/// Raw counts shared by the statistics and the metrics breakdown
struct Tokens<'a> {
    words: Vec<&'a str>,
    sentence_count: usize,
    char_count: usize,
    special_char_count: usize,
}

impl<'a> Tokens<'a> {
    fn scan(text: &'a str) -> Self {
        let words = text.split_whitespace().collect::<Vec<_>>();
        let sentence_count = text
            .split(&['.', '!', '?'][..])
            .filter(|fragment| !fragment.trim().is_empty())
            .count();

        Self {
            words,
            sentence_count,
            char_count: text.chars().count(),
            special_char_count: text.chars().filter(|&c| is_special_char(c)).count(),
        }
    }

    fn avg_word_length(&self) -> f64 {
        let letters = self.words.iter().map(|w| stripped_len(w)).sum::<usize>();
        ratio(letters, self.words.len())
    }

    fn technical_terms(&self) -> usize {
        self.words.iter().filter(|w| is_technical(w)).count()
    }

    fn complexity(&self) -> f64 {
        let avg_words_per_sentence = ratio(self.words.len(), self.sentence_count);
        let special_char_ratio = ratio(self.special_char_count, self.char_count);
        let tech_term_ratio = ratio(self.technical_terms(), self.words.len());

        avg_words_per_sentence * 0.3
            + self.avg_word_length() * 0.3
            + special_char_ratio * 100.0 * 0.2
            + tech_term_ratio * 100.0 * 0.2
    }
}

pub fn compute_statistics(text: &str) -> TextStatistics {
    let tokens = Tokens::scan(text);

    TextStatistics {
        word_count: tokens.words.len(),
        char_count: tokens.char_count,
        sentence_count: tokens.sentence_count,
        special_char_count: tokens.special_char_count,
        avg_word_length: round2(tokens.avg_word_length()),
        complexity: round2(tokens.complexity()),
    }
}

pub fn difficulty_metrics(text: &str) -> DifficultyMetrics {
    let tokens = Tokens::scan(text);
    let stats = compute_statistics(text);

    DifficultyMetrics {
        avg_word_length: stats.avg_word_length,
        sentence_complexity: ratio(stats.word_count, stats.sentence_count),
        special_characters: stats.special_char_count,
        technical_terms: tokens.technical_terms(),
        score: stats.complexity,
    }
}

/// Grade arbitrary text by its rounded complexity score
pub fn classify_difficulty(text: &str) -> Difficulty {
    Difficulty::from_complexity(difficulty_metrics(text).score)
}
