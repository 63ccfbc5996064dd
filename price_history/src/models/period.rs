//! Per-product series over a date range and the trend summarizing it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One dated price inside a [`PeriodSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Calendar day of the observation.
    pub date: NaiveDate,
    /// Price recorded for that day.
    pub price: f64,
}

/// Sparse, date-ordered price points for one product.
///
/// Days without an observation contribute no point; nothing is forward-filled.
/// Points are kept sorted by date and a date appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeriodSeries {
    points: Vec<PricePoint>,
}

impl PeriodSeries {
    /// An empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point, keeping date order. A second point for the same date
    /// replaces the first.
    pub fn push(&mut self, date: NaiveDate, price: f64) {
        match self.points.binary_search_by(|p| p.date.cmp(&date)) {
            Ok(i) => self.points[i].price = price,
            Err(i) => self.points.insert(i, PricePoint { date, price }),
        }
    }

    /// Points in ascending date order.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the series holds no point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Summarize the series by its first and last points.
    ///
    /// `None` for an empty series.
    pub fn trend(&self) -> Option<Trend> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some(Trend::between(first.price, last.price))
    }
}

impl FromIterator<(NaiveDate, f64)> for PeriodSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        let mut series = PeriodSeries::new();
        for (date, price) in iter {
            series.push(date, price);
        }
        series
    }
}

/// Change between the first and last price of a period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    /// Price at the earliest point.
    pub first_price: f64,
    /// Price at the latest point.
    pub last_price: f64,
    /// `last_price - first_price`.
    pub absolute_change: f64,
    /// `absolute_change / first_price * 100`.
    ///
    /// `None` when `first_price` is zero or the ratio overflows: a
    /// non-finite ratio is reported as absent.
    pub percent_change: Option<f64>,
}

impl Trend {
    /// Trend from `first` to `last`.
    pub fn between(first: f64, last: f64) -> Self {
        let absolute_change = last - first;
        let percent_change = if first == 0.0 {
            None
        } else {
            Some(absolute_change / first * 100.0).filter(|p| p.is_finite())
        };
        Self {
            first_price: first,
            last_price: last,
            absolute_change,
            percent_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn push_keeps_points_sorted_and_unique() {
        let mut s = PeriodSeries::new();
        s.push(d(3), 3.0);
        s.push(d(1), 1.0);
        s.push(d(2), 2.0);
        s.push(d(1), 1.5);
        let dates: Vec<_> = s.points().iter().map(|p| (p.date, p.price)).collect();
        assert_eq!(dates, vec![(d(1), 1.5), (d(2), 2.0), (d(3), 3.0)]);
    }

    #[test]
    fn single_point_has_no_change() {
        let s: PeriodSeries = [(d(5), 42.0)].into_iter().collect();
        let t = s.trend().unwrap();
        assert_eq!(t.first_price, t.last_price);
        assert_eq!(t.absolute_change, 0.0);
        assert_eq!(t.percent_change, Some(0.0));
    }

    #[test]
    fn empty_series_has_no_trend() {
        assert!(PeriodSeries::new().trend().is_none());
    }

    #[test]
    fn zero_first_price_has_no_percent() {
        let t = Trend::between(0.0, 5.0);
        assert_eq!(t.absolute_change, 5.0);
        assert_eq!(t.percent_change, None);
        assert_eq!(
            serde_json::to_value(t).unwrap()["percentChange"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn overflowing_ratio_has_no_percent() {
        for (first, last) in [(1.0, 1e307), (5e-324, 1.0)] {
            let t = Trend::between(first, last);
            assert_eq!(t.percent_change, None, "{first} -> {last}");
            assert!(t.absolute_change.is_finite());
        }

        let s: PeriodSeries = [(d(1), 1.0), (d(2), 1e307)].into_iter().collect();
        assert_eq!(s.trend().unwrap().percent_change, None);
    }

    #[test]
    fn percent_change_is_relative_to_first_price() {
        let t = Trend::between(10.0, 12.0);
        assert_eq!(t.absolute_change, 2.0);
        let pct = t.percent_change.unwrap();
        assert!((pct - 20.0).abs() < 1e-9);
        assert_eq!(format!("{pct:.2}"), "20.00");
    }
}
