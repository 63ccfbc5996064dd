//! Point-in-time price observations.
//!
//! A [`Snapshot`] maps product names to a [`PriceQuote`]. Product names are
//! non-empty and unique, prices are finite and non-negative. Encounter order is
//! preserved so that reports list products the way the upstream listed them.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a snapshot entry violates the model invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    /// The product name was empty after trimming.
    #[error("product name cannot be empty")]
    EmptyName,

    /// The price was negative, NaN or infinite.
    #[error("invalid price {price} for product {name:?}")]
    InvalidPrice {
        /// Product the price belongs to.
        name: String,
        /// The rejected price.
        price: f64,
    },
}

/// One product's price at the moment it was observed.
///
/// Persisted as `{"price": <number>, "timestamp": <RFC 3339>}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Observed price.
    pub price: f64,
    /// When the provider observed it (UTC).
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote.
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }
}

/// Mapping of product name to [`PriceQuote`], in encounter order.
///
/// Equality ignores order: two snapshots are equal when they hold the same
/// products with the same quotes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "IndexMap<String, PriceQuote>",
    into = "IndexMap<String, PriceQuote>"
)]
pub struct Snapshot {
    quotes: IndexMap<String, PriceQuote>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product's quote.
    ///
    /// The name is stored as given; a blank name is rejected. Returns the
    /// previous quote for that name, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        quote: PriceQuote,
    ) -> Result<Option<PriceQuote>, SnapshotError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SnapshotError::EmptyName);
        }
        if !quote.price.is_finite() || quote.price < 0.0 {
            return Err(SnapshotError::InvalidPrice {
                name,
                price: quote.price,
            });
        }
        Ok(self.quotes.insert(name, quote))
    }

    /// Overlay `other` on top of `self`: quotes from `other` win on name collision,
    /// names only in `self` keep their quote.
    pub fn extend_from(&mut self, other: &Snapshot) {
        for (name, quote) in &other.quotes {
            self.quotes.insert(name.clone(), *quote);
        }
    }

    /// Quote for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&PriceQuote> {
        self.quotes.get(name)
    }

    /// Whether `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.quotes.contains_key(name)
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// True when no product is recorded.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Iterate `(name, quote)` in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceQuote)> {
        self.quotes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Product names in encounter order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.quotes.keys().map(String::as_str)
    }
}

impl TryFrom<IndexMap<String, PriceQuote>> for Snapshot {
    type Error = SnapshotError;

    fn try_from(raw: IndexMap<String, PriceQuote>) -> Result<Self, Self::Error> {
        let mut snapshot = Snapshot::new();
        for (name, quote) in raw {
            snapshot.insert(name, quote)?;
        }
        Ok(snapshot)
    }
}

impl From<Snapshot> for IndexMap<String, PriceQuote> {
    fn from(snapshot: Snapshot) -> Self {
        snapshot.quotes
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a PriceQuote);
    type IntoIter = indexmap::map::Iter<'a, String, PriceQuote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}
