//! Period aggregation: per-product price series over a date range, their
//! trends, and the weekly digest built from them.
//!
//! Ranges are half-open, `[start, end)`. The digest's default period is the
//! seven days before the reference date, excluding the reference date itself.
//!
//! A trend whose first price is zero, or whose ratio overflows, has no percent
//! change. That product is still reported (with its absolute change); one
//! degenerate series never blocks the rest of the digest.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Days, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    history::PriceHistory,
    models::{PeriodSeries, Trend},
};

/// Length of the default digest period, in days.
pub const DIGEST_PERIOD_DAYS: u64 = 7;

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// First day included.
    pub start: NaiveDate,
    /// First day excluded.
    pub end: NaiveDate,
}

impl Period {
    /// `[start, end)`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days immediately before `reference`: `[reference - days, reference)`.
    pub fn ending_before(reference: NaiveDate, days: u64) -> Option<Self> {
        let start = reference.checked_sub_days(Days::new(days))?;
        Some(Self::new(start, reference))
    }

    /// Default digest period for `reference`.
    pub fn digest(reference: NaiveDate) -> Option<Self> {
        Self::ending_before(reference, DIGEST_PERIOD_DAYS)
    }

    /// True if no day falls inside the range.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Every calendar day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    /// Last day inside the range.
    pub fn last_day(&self) -> Option<NaiveDate> {
        if self.is_empty() {
            None
        } else {
            self.end.pred_opt()
        }
    }
}

/// Build one series per product from the days of `history` inside `[start, end)`.
///
/// Walks the range day by day; a day missing from the history contributes no
/// point, and a product missing on a recorded day contributes no point for
/// that day. Products appear in the order they are first encountered.
pub fn aggregate(
    history: &PriceHistory,
    start: NaiveDate,
    end: NaiveDate,
) -> IndexMap<String, PeriodSeries> {
    let mut out: IndexMap<String, PeriodSeries> = IndexMap::new();
    for day in Period::new(start, end).days() {
        let Some(snapshot) = history.snapshot_on(day) else {
            continue;
        };
        for (name, quote) in snapshot.iter() {
            out.entry(name.to_string())
                .or_default()
                .push(day, quote.price);
        }
    }
    out
}

/// Trend of `series` from its first to its last point; `None` if it is empty.
pub fn trend(series: &PeriodSeries) -> Option<Trend> {
    series.trend()
}

/// Trends for every non-empty series.
///
/// Series whose percent change is undefined (zero first price, or a ratio too
/// large to represent) keep their absolute change and get no percent change;
/// each one is logged.
pub fn trends(series: &IndexMap<String, PeriodSeries>) -> IndexMap<String, Trend> {
    let mut out = IndexMap::with_capacity(series.len());
    for (name, s) in series {
        let Some(t) = trend(s) else { continue };
        if t.percent_change.is_none() {
            warn!(
                product = %name,
                first_price = t.first_price,
                last_price = t.last_price,
                "percent change undefined for period"
            );
        }
        out.insert(name.clone(), t);
    }
    out
}

/// The weekly report: prices per product and day over a period.
///
/// Persisted as `{generatedAt, periodStart, periodEnd, data}` where
/// `periodEnd` is the last day included and `data` maps product -> date -> price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDigest {
    /// When the digest was built.
    pub generated_at: DateTime<Utc>,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period (inclusive).
    pub period_end: NaiveDate,
    /// Product -> date -> price.
    pub data: IndexMap<String, BTreeMap<NaiveDate, f64>>,
    /// Product -> trend over the period. Derived, not persisted.
    #[serde(skip)]
    pub trends: IndexMap<String, Trend>,
}

impl WeeklyDigest {
    /// Build the digest of `history` over `period`.
    pub fn build(history: &PriceHistory, period: Period, generated_at: DateTime<Utc>) -> Self {
        let series = aggregate(history, period.start, period.end);
        let trends = trends(&series);
        let data = series
            .into_iter()
            .map(|(name, s)| {
                let by_day = s.points().iter().map(|p| (p.date, p.price)).collect();
                (name, by_day)
            })
            .collect();

        Self {
            generated_at,
            period_start: period.start,
            period_end: period.last_day().unwrap_or(period.start),
            data,
            trends,
        }
    }

    /// Build the digest for the default period before `reference`.
    ///
    /// `None` only if `reference` is too close to the start of the calendar for
    /// the period to exist.
    pub fn for_reference_date(
        history: &PriceHistory,
        reference: NaiveDate,
        generated_at: DateTime<Utc>,
    ) -> Option<Self> {
        Period::digest(reference).map(|p| Self::build(history, p, generated_at))
    }

    /// True if no price was recorded in the period.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for WeeklyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!(
            "Weekly price report {} .. {}",
            self.period_start, self.period_end
        );
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "-".repeat(title.chars().count()))?;

        if self.data.is_empty() {
            writeln!(f, "No prices recorded in this period.")?;
        }
        for (name, by_day) in &self.data {
            writeln!(f)?;
            writeln!(f, "{name}")?;
            for (day, price) in by_day {
                writeln!(f, "  {day}  {price}")?;
            }
            if let Some(t) = self.trends.get(name) {
                match t.percent_change {
                    Some(pct) => writeln!(f, "  change: {:+} ({pct:+.2}%)", t.absolute_change)?,
                    None => writeln!(f, "  change: {:+} (n/a)", t.absolute_change)?,
                }
            }
        }

        writeln!(f)?;
        write!(
            f,
            "Generated at {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}
