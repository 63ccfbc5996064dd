#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use price_history::history::PriceHistory;
use price_history::models::{PriceQuote, Snapshot};

pub fn d(s: &str) -> NaiveDate {
    s.parse().expect("date")
}

pub fn at(day: &str) -> DateTime<Utc> {
    let date = d(day);
    Utc.from_utc_datetime(&date.and_hms_opt(8, 0, 0).expect("time"))
}

/// Snapshot observed at 08:00 UTC on `day`.
pub fn snap_on(day: &str, items: &[(&str, f64)]) -> Snapshot {
    let mut s = Snapshot::new();
    for (name, price) in items {
        s.insert(*name, PriceQuote::new(*price, at(day))).expect("valid quote");
    }
    s
}

/// {2024-01-01: A=10, 2024-01-02: A=12}
pub fn two_day_history() -> PriceHistory {
    PriceHistory::new()
        .merged(d("2024-01-01"), &snap_on("2024-01-01", &[("A", 10.0)]))
        .merged(d("2024-01-02"), &snap_on("2024-01-02", &[("A", 12.0)]))
}
