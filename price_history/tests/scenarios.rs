mod common;
use common::{d, snap_on, two_day_history};

use chrono::TimeZone;
use price_history::aggregator::{Period, WeeklyDigest, aggregate, trend};
use price_history::detector::detect_for_date;
use price_history::export::project;

#[test]
fn unchanged_price_against_prior_day_is_not_reported() {
    let history = two_day_history();
    let current = snap_on("2024-01-03", &[("A", 12.0)]);

    let report = detect_for_date(&history, &current, d("2024-01-03"));

    assert_eq!(report.compared_with, Some(d("2024-01-02")));
    assert!(report.deltas.is_empty());
}

#[test]
fn changed_price_against_prior_day_is_reported_once() {
    let history = two_day_history();
    let current = snap_on("2024-01-03", &[("A", 15.0)]);

    let report = detect_for_date(&history, &current, d("2024-01-03"));

    assert_eq!(report.deltas.len(), 1);
    let delta = &report.deltas[0];
    assert_eq!(delta.product_name, "A");
    assert_eq!(delta.old_price, 12.0);
    assert_eq!(delta.new_price, 15.0);
    assert_eq!(delta.observed_at, common::at("2024-01-03"));
}

#[test]
fn two_day_aggregate_and_trend() {
    let series = aggregate(&two_day_history(), d("2024-01-01"), d("2024-01-03"));

    let a = &series["A"];
    let points: Vec<_> = a.points().iter().map(|p| (p.date, p.price)).collect();
    assert_eq!(
        points,
        vec![(d("2024-01-01"), 10.0), (d("2024-01-02"), 12.0)]
    );

    let t = trend(a).expect("non-empty series");
    assert_eq!(t.absolute_change, 2.0);
    assert_eq!(format!("{:.2}", t.percent_change.unwrap()), "20.00");
}

#[test]
fn full_day_cycle_detect_merge_digest_export() {
    let mut history = two_day_history();
    let today = d("2024-01-08");

    // Gap on 01-07: nothing to compare against.
    let current = snap_on("2024-01-08", &[("A", 20.0), ("B", 5.0)]);
    assert!(detect_for_date(&history, &current, today).is_empty());

    history.merge(today, &current);

    let generated = chrono::Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
    let digest = WeeklyDigest::for_reference_date(&history, today, generated).unwrap();
    assert_eq!(digest.period_start, d("2024-01-01"));
    assert_eq!(digest.period_end, d("2024-01-07"));
    // today's prices are outside the digest period
    assert!(!digest.data.contains_key("B"));
    assert_eq!(digest.data["A"].len(), 2);

    let model = project(&history, generated);
    assert_eq!(model.all_dates.len(), 3);
    assert_eq!(model.latest_prices, current);
    assert_eq!(model.product_histories["B"].len(), 1);
    assert_eq!(model.product_histories["A"].len(), 3);
}

#[test]
fn explicit_period_helpers_agree_with_aggregate() {
    let history = two_day_history();
    let period = Period::new(d("2024-01-02"), d("2024-01-02"));
    assert!(period.is_empty());
    assert!(aggregate(&history, period.start, period.end).is_empty());
}
