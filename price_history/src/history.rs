//! The date-keyed price archive.
//!
//! [`PriceHistory`] maps calendar dates to the [`Snapshot`] recorded that day.
//! It only ever grows: dates are never removed, and merging into an existing
//! date overlays the incoming quotes on the recorded ones.
//!
//! Persisted form (one JSON object):
//!
//! ```json
//! {
//!   "2024-01-01": { "A": { "price": 10.0, "timestamp": "2024-01-01T08:00:00Z" } },
//!   "2024-01-02": { "A": { "price": 12.0, "timestamp": "2024-01-02T08:00:00Z" } }
//! }
//! ```
//!
//! [`HistoryStore`] loads and saves that record through a
//! [`BlobStore`](crate::store::BlobStore).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    models::Snapshot,
    store::{BlobStore, StoreError, load_json, save_json},
};

/// Snapshots keyed by the calendar day they were recorded on.
///
/// Dates are typed, so every key is a valid calendar date; iteration is always
/// ascending regardless of the order dates were merged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    days: BTreeMap<NaiveDate, Snapshot>,
}

impl PriceHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded days.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// True when no day is recorded.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The most recent recorded date.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    /// Snapshot recorded on `date`.
    pub fn snapshot_on(&self, date: NaiveDate) -> Option<&Snapshot> {
        self.days.get(&date)
    }

    /// Snapshot of the most recent recorded date.
    pub fn latest_snapshot(&self) -> Option<&Snapshot> {
        self.days.values().next_back()
    }

    /// Recorded dates, ascending.
    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// `(date, snapshot)` pairs, ascending by date.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &Snapshot)> {
        self.days.iter().map(|(d, s)| (*d, s))
    }

    /// Merge `snapshot` into the day `date`, in place.
    ///
    /// Quotes in `snapshot` replace same-named quotes already recorded for
    /// `date`; products missing from `snapshot` keep their recorded quote.
    /// Other dates are not touched.
    pub fn merge(&mut self, date: NaiveDate, snapshot: &Snapshot) {
        self.days.entry(date).or_default().extend_from(snapshot);
    }

    /// Like [`merge`](Self::merge) but returns a new history and leaves `self` as is.
    pub fn merged(&self, date: NaiveDate, snapshot: &Snapshot) -> Self {
        let mut next = self.clone();
        next.merge(date, snapshot);
        next
    }
}

impl FromIterator<(NaiveDate, Snapshot)> for PriceHistory {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, Snapshot)>>(iter: I) -> Self {
        let mut history = PriceHistory::new();
        for (date, snapshot) in iter {
            history.merge(date, &snapshot);
        }
        history
    }
}

/// Persistence for [`PriceHistory`] under a single blob key.
#[derive(Debug, Clone)]
pub struct HistoryStore<B> {
    blobs: B,
    key: String,
}

impl<B: BlobStore> HistoryStore<B> {
    /// History persisted under `key` in `blobs`.
    pub fn new(blobs: B, key: impl Into<String>) -> Self {
        Self {
            blobs,
            key: key.into(),
        }
    }

    /// Blob key the history lives under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the full history.
    ///
    /// A missing record is an empty history. A record that exists but cannot be
    /// decoded is an error, so a later save never overwrites data it failed to read.
    pub fn load(&self) -> Result<PriceHistory, StoreError> {
        match load_json::<PriceHistory, _>(&self.blobs, &self.key)? {
            Some(history) => {
                debug!(key = %self.key, days = history.len(), "history loaded");
                Ok(history)
            }
            None => {
                info!(key = %self.key, "no history recorded yet, starting empty");
                Ok(PriceHistory::new())
            }
        }
    }

    /// Replace the persisted history with `history`.
    pub fn save(&self, history: &PriceHistory) -> Result<(), StoreError> {
        save_json(&self.blobs, &self.key, history)?;
        info!(
            key = %self.key,
            days = history.len(),
            latest = ?history.latest_date(),
            "history saved"
        );
        Ok(())
    }
}
