//! The published dataset: a denormalized read model of the whole history.
//!
//! Persisted as
//! `{lastUpdated, latestPrices, productHistories: {product: [{date, price, timestamp}]}, allDates}`.
//! Rebuilt from scratch on every run.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{history::PriceHistory, models::Snapshot};

/// One dated observation of a product in the published dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Day the price was recorded under.
    pub date: NaiveDate,
    /// Recorded price.
    pub price: f64,
    /// Observation time, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Read model published for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportModel {
    /// When the projection was made.
    pub last_updated: DateTime<Utc>,
    /// Snapshot of the most recent recorded day; empty when nothing is recorded.
    pub latest_prices: Snapshot,
    /// Per product, one point per recorded day it appears on, ascending.
    pub product_histories: IndexMap<String, Vec<HistoryPoint>>,
    /// Every recorded day, ascending.
    pub all_dates: Vec<NaiveDate>,
}

/// Project `history` into the published read model.
///
/// Pure: the only input besides the history is the `last_updated` stamp.
/// Products are listed in the order they first appear when walking the days in
/// ascending order.
pub fn project(history: &PriceHistory, last_updated: DateTime<Utc>) -> ExportModel {
    let all_dates: Vec<NaiveDate> = history.dates().collect();
    let latest_prices = history.latest_snapshot().cloned().unwrap_or_default();

    let mut product_histories: IndexMap<String, Vec<HistoryPoint>> = IndexMap::new();
    for (date, snapshot) in history.iter() {
        for (name, quote) in snapshot.iter() {
            product_histories
                .entry(name.to_string())
                .or_default()
                .push(HistoryPoint {
                    date,
                    price: quote.price,
                    timestamp: Some(quote.observed_at),
                });
        }
    }

    ExportModel {
        last_updated,
        latest_prices,
        product_histories,
        all_dates,
    }
}
