//! Day-over-day price change detection.
//!
//! A new snapshot is compared against the snapshot recorded for the calendar
//! day immediately before the run's reference date. Only products present on
//! both sides with a different price count as changes: a first observation is
//! not a change and a product that disappeared is not reported.
//!
//! Prices are compared with exact inequality; no tolerance is applied.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    history::PriceHistory,
    models::{PriceDelta, Snapshot},
};

/// Deltas between `current` and `prior`, in `current`'s encounter order.
pub fn detect_changes(current: &Snapshot, prior: &Snapshot) -> Vec<PriceDelta> {
    current
        .iter()
        .filter_map(|(name, quote)| {
            let old = prior.get(name)?;
            (old.price != quote.price).then(|| PriceDelta {
                product_name: name.to_string(),
                old_price: old.price,
                new_price: quote.price,
                observed_at: quote.observed_at,
            })
        })
        .collect()
}

/// The calendar day before `reference`.
pub fn prior_day(reference: NaiveDate) -> Option<NaiveDate> {
    reference.pred_opt()
}

/// Compare `current` against what `history` recorded for the day before
/// `reference`.
///
/// When that day is missing from the history (a gap, or a fresh history) the
/// report is empty: the latest recorded day is deliberately not used instead.
pub fn detect_for_date(
    history: &PriceHistory,
    current: &Snapshot,
    reference: NaiveDate,
) -> ChangeReport {
    let compared_with = prior_day(reference);
    let deltas = compared_with
        .and_then(|day| history.snapshot_on(day))
        .map(|prior| detect_changes(current, prior))
        .unwrap_or_default();

    ChangeReport {
        reference_date: reference,
        compared_with,
        deltas,
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    /// Date the new snapshot is recorded under.
    pub reference_date: NaiveDate,
    /// Day the snapshot was compared against.
    pub compared_with: Option<NaiveDate>,
    /// Detected changes, in snapshot order.
    pub deltas: Vec<PriceDelta>,
}

impl ChangeReport {
    /// True if no product changed price.
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deltas.is_empty() {
            return write!(f, "No changes");
        }
        let title = match self.compared_with {
            Some(prev) => format!("Price changes {prev} -> {}", self.reference_date),
            None => format!("Price changes on {}", self.reference_date),
        };
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "-".repeat(title.chars().count()))?;
        for (i, delta) in self.deltas.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{delta}")?;
        }
        Ok(())
    }
}
