use crate::catalog::Catalog;
use crate::passage::{Category, Difficulty, Passage};
use crate::quote::{fetch_external_quote, QuoteProvider};
use crate::selection::PassageFilter;
use log::warn;
use rand::{Rng, RngCore};
use std::sync::Arc;

/// Share of new-passage requests served from the local catalog
pub const DEFAULT_CATALOG_SHARE: f64 = 0.4;

/// Strategy for producing the next passage to type
pub trait PassageSource: Send + Sync {
    fn next_passage(&self, rng: &mut dyn RngCore) -> Passage;
}

/// Uniform pick from the catalog, honouring difficulty and category
#[derive(Debug, Clone)]
pub struct CatalogSource {
    catalog: Arc<Catalog>,
    difficulty: Difficulty,
    category: Option<Category>,
}

impl CatalogSource {
    pub fn new(catalog: Arc<Catalog>, difficulty: Difficulty, category: Option<Category>) -> Self {
        Self {
            catalog,
            difficulty,
            category,
        }
    }
}

impl PassageSource for CatalogSource {
    fn next_passage(&self, rng: &mut dyn RngCore) -> Passage {
        let filter = PassageFilter {
            difficulty: Some(self.difficulty),
            category: self.category,
            ..PassageFilter::default()
        };

        match self.catalog.select_matching(&filter, rng) {
            Ok(passage) => passage.clone(),
            Err(e) => {
                warn!("{e}; ignoring category");
                self.catalog
                    .select_random_or_any(Some(self.difficulty), rng)
                    .clone()
            }
        }
    }
}

/// External quote with local fallback
#[derive(Clone)]
pub struct QuoteSource {
    provider: Arc<dyn QuoteProvider>,
    catalog: Arc<Catalog>,
}

impl QuoteSource {
    pub fn new(provider: Arc<dyn QuoteProvider>, catalog: Arc<Catalog>) -> Self {
        Self { provider, catalog }
    }
}

impl PassageSource for QuoteSource {
    fn next_passage(&self, rng: &mut dyn RngCore) -> Passage {
        fetch_external_quote(self.provider.as_ref(), &self.catalog, rng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    Catalog,
    Quote,
}

/// Random split between catalog passages and external quotes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMix {
    catalog_share: f64,
}

impl SourceMix {
    /// `catalog_share` is clamped to `[0, 1]`; NaN means quotes only
    pub fn new(catalog_share: f64) -> Self {
        let catalog_share = if catalog_share.is_nan() {
            0.0
        } else {
            catalog_share.clamp(0.0, 1.0)
        };
        Self { catalog_share }
    }

    pub fn catalog_share(&self) -> f64 {
        self.catalog_share
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> SourceKind {
        if rng.gen_bool(self.catalog_share) {
            SourceKind::Catalog
        } else {
            SourceKind::Quote
        }
    }
}

impl Default for SourceMix {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_SHARE)
    }
}
