use crate::passage::{Category, Difficulty, Passage};
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use log::debug;
use serde_json::from_str;
use std::path::Path;
use thiserror::Error;

static CATALOG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/catalog/data");

/// Embedded catalog files, in catalog order
const CATALOG_FILES: &[&str] = &[
    "easy.json",
    "medium.json",
    "hard.json",
    "expert.json",
    "literature.json",
];

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog contains no passages")]
    Empty,

    #[error("catalog file not found: {0}")]
    MissingFile(String),

    #[error("unable to parse catalog {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to read catalog: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only, non-empty collection of passages
#[derive(Debug, Clone)]
pub struct Catalog {
    passages: Vec<Passage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats {
    pub total_texts: usize,
    pub categories: Vec<(Category, usize)>,
    pub difficulties: Vec<(Difficulty, usize)>,
    pub total_words: usize,
    pub average_length: usize,
}

impl Catalog {
    /// The passages bundled with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut passages = Vec::new();
        for name in CATALOG_FILES {
            passages.extend(read_catalog_file(name)?);
        }
        debug!("loaded builtin catalog: {} passages", passages.len());
        Self::from_passages(passages)
    }

    pub fn from_passages(passages: Vec<Passage>) -> Result<Self, CatalogError> {
        if passages.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { passages })
    }

    /// Parse a JSON array of passage records
    pub fn from_json(name: &str, json: &str) -> Result<Self, CatalogError> {
        let passages = from_str::<Vec<Passage>>(json).map_err(|source| CatalogError::Parse {
            name: name.to_string(),
            source,
        })?;
        Self::from_passages(passages)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&path.display().to_string(), &json)
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passage> {
        self.passages.iter()
    }

    pub fn collection_stats(&self) -> CollectionStats {
        let categories = self
            .iter()
            .map(Passage::category)
            .unique()
            .map(|category| {
                let count = self.iter().filter(|p| p.category() == category).count();
                (category, count)
            })
            .collect();

        let difficulties = self
            .iter()
            .map(Passage::difficulty)
            .unique()
            .map(|difficulty| {
                let count = self.iter().filter(|p| p.difficulty() == difficulty).count();
                (difficulty, count)
            })
            .collect();

        let total_chars = self.iter().map(Passage::length).sum::<usize>();

        CollectionStats {
            total_texts: self.len(),
            categories,
            difficulties,
            total_words: self.iter().map(Passage::word_count).sum(),
            average_length: (total_chars as f64 / self.len() as f64).round() as usize,
        }
    }
}

fn read_catalog_file(name: &str) -> Result<Vec<Passage>, CatalogError> {
    let contents = CATALOG_DIR
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| CatalogError::MissingFile(name.to_string()))?;

    from_str(contents).map_err(|source| CatalogError::Parse {
        name: name.to_string(),
        source,
    })
}
