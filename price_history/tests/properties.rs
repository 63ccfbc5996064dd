//! Property tests for merge, detection, aggregation and projection.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use price_history::aggregator::aggregate;
use price_history::detector::detect_changes;
use price_history::export::project;
use price_history::history::PriceHistory;
use price_history::models::{PeriodSeries, PriceQuote, Snapshot};
use proptest::prelude::*;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    proptest::collection::vec(("[a-e]{1,2}", 0u32..500), 0..6).prop_map(|items| {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut s = Snapshot::new();
        for (name, cents) in items {
            s.insert(name, PriceQuote::new(f64::from(cents) / 100.0, ts))
                .unwrap();
        }
        s
    })
}

fn history_strategy() -> impl Strategy<Value = PriceHistory> {
    proptest::collection::vec((0u64..20, snapshot_strategy()), 0..8).prop_map(|days| {
        days.into_iter()
            .map(|(offset, snap)| (base_date() + Days::new(offset), snap))
            .collect()
    })
}

proptest! {
    #[test]
    fn merge_is_idempotent(
        history in history_strategy(),
        offset in 0u64..20,
        snap in snapshot_strategy(),
    ) {
        let day = base_date() + Days::new(offset);
        let once = history.merged(day, &snap);
        let twice = once.merged(day, &snap);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merging_distinct_products_commutes(
        history in history_strategy(),
        offset in 0u64..20,
        price_a in 0u32..1000,
        price_b in 0u32..1000,
    ) {
        let day = base_date() + Days::new(offset);
        let ts = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut a = Snapshot::new();
        a.insert("only-a", PriceQuote::new(f64::from(price_a), ts)).unwrap();
        let mut b = Snapshot::new();
        b.insert("only-b", PriceQuote::new(f64::from(price_b), ts)).unwrap();

        let ab = history.merged(day, &a).merged(day, &b);
        let ba = history.merged(day, &b).merged(day, &a);
        prop_assert_eq!(&ab, &ba);

        let merged_day = ab.snapshot_on(day).unwrap();
        prop_assert!(merged_day.contains("only-a"));
        prop_assert!(merged_day.contains("only-b"));
    }

    #[test]
    fn merge_leaves_other_dates_alone(
        history in history_strategy(),
        offset in 0u64..20,
        snap in snapshot_strategy(),
    ) {
        let day = base_date() + Days::new(offset);
        let next = history.merged(day, &snap);
        for (date, recorded) in history.iter().filter(|(date, _)| *date != day) {
            prop_assert_eq!(next.snapshot_on(date), Some(recorded));
        }
    }

    #[test]
    fn identical_snapshots_never_change(snap in snapshot_strategy()) {
        prop_assert!(detect_changes(&snap, &snap).is_empty());
    }

    #[test]
    fn deltas_only_name_products_known_on_both_sides(
        current in snapshot_strategy(),
        prior in snapshot_strategy(),
    ) {
        for delta in detect_changes(&current, &prior) {
            prop_assert!(prior.contains(&delta.product_name));
            prop_assert!(current.contains(&delta.product_name));
            prop_assert_ne!(delta.old_price, delta.new_price);
        }
    }

    #[test]
    fn projection_latest_prices_match_latest_day(history in history_strategy()) {
        let model = project(&history, Utc::now());
        match history.latest_date() {
            Some(latest) => prop_assert_eq!(Some(&model.latest_prices), history.snapshot_on(latest)),
            None => prop_assert!(model.latest_prices.is_empty()),
        }
        let sorted = model.all_dates.windows(2).all(|w| w[0] < w[1]);
        prop_assert!(sorted);
    }

    #[test]
    fn empty_range_has_no_points(history in history_strategy(), offset in 0u64..20) {
        let day = base_date() + Days::new(offset);
        let series = aggregate(&history, day, day);
        prop_assert!(series.values().all(PeriodSeries::is_empty));
    }

    #[test]
    fn single_point_trend_is_flat(price in 0u32..10_000) {
        let series: PeriodSeries = [(base_date(), f64::from(price))].into_iter().collect();
        let t = series.trend().unwrap();
        prop_assert_eq!(t.absolute_change, 0.0);
    }
}
