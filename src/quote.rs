use crate::catalog::Catalog;
use crate::passage::{Difficulty, Passage};
use log::{debug, warn};
use rand::Rng;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUOTE_URL: &str = "https://api.quotable.io/random";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("quote request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed quote payload: {0}")]
    Malformed(String),

    #[error("quote provider is offline")]
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quote {
    pub content: String,
    pub author: String,
}

/// Some quote endpoints answer with a single object, others with a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuotePayload {
    One(Quote),
    Many(Vec<Quote>),
}

impl QuotePayload {
    fn into_quote(self) -> Result<Quote, ProviderError> {
        let quote = match self {
            QuotePayload::One(quote) => quote,
            QuotePayload::Many(quotes) => quotes
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::Malformed("empty quote list".into()))?,
        };

        if quote.content.trim().is_empty() || quote.author.trim().is_empty() {
            return Err(ProviderError::Malformed("missing content or author".into()));
        }
        Ok(quote)
    }
}

/// Source of third-party quotes
pub trait QuoteProvider: Send + Sync {
    fn fetch(&self) -> Result<Quote, ProviderError>;
}

/// Fetches quotes over HTTP
#[derive(Debug, Clone)]
pub struct HttpQuoteProvider {
    client: Client,
    url: String,
}

impl HttpQuoteProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl QuoteProvider for HttpQuoteProvider {
    fn fetch(&self) -> Result<Quote, ProviderError> {
        let payload = self
            .client
            .get(&self.url)
            .send()?
            .error_for_status()?
            .json::<QuotePayload>()?;
        payload.into_quote()
    }
}

/// Provider that never answers; every request takes the local fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl QuoteProvider for OfflineProvider {
    fn fetch(&self) -> Result<Quote, ProviderError> {
        Err(ProviderError::Offline)
    }
}

/// Fetch a quote as a passage. Never fails: any provider error, or a quote that
/// does not make a valid passage, falls back to a random medium catalog passage.
pub fn fetch_external_quote<R: Rng + ?Sized>(
    provider: &dyn QuoteProvider,
    catalog: &Catalog,
    rng: &mut R,
) -> Passage {
    let passage = provider
        .fetch()
        .and_then(|quote| {
            Passage::quote(quote.content, quote.author)
                .map_err(|e| ProviderError::Malformed(e.to_string()))
        });

    match passage {
        Ok(passage) => {
            debug!("fetched quote from {}", passage.source());
            passage
        }
        Err(e) => {
            warn!("{e}; falling back to catalog");
            catalog
                .select_random_or_any(Some(Difficulty::Medium), rng)
                .clone()
        }
    }
}
