#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use price_history::models::{PriceQuote, Snapshot};
use price_monitor::{
    notify::{Notification, Notifier, NotifyError},
    providers::{ApiSnafu, ProviderError, SnapshotProvider},
    run::RunContext,
};

pub fn d(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

/// 08:00 UTC on `day`.
pub fn at(day: &str) -> DateTime<Utc> {
    let day = d(day);
    Utc.from_utc_datetime(&day.and_hms_opt(8, 0, 0).expect("valid time"))
}

pub fn ctx(day: &str) -> RunContext {
    RunContext {
        today: d(day),
        now: at(day),
    }
}

pub fn snap_on(day: &str, items: &[(&str, f64)]) -> Snapshot {
    let mut s = Snapshot::new();
    for (name, price) in items {
        s.insert(*name, PriceQuote::new(*price, at(day)))
            .expect("valid quote");
    }
    s
}

/// Returns a fixed snapshot, or an API error when built with [`StubProvider::failing`].
pub struct StubProvider {
    snapshot: Option<Snapshot>,
}

impl StubProvider {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
        }
    }

    pub fn failing() -> Self {
        Self { snapshot: None }
    }
}

#[async_trait]
impl SnapshotProvider for StubProvider {
    async fn fetch(&self) -> Result<Snapshot, ProviderError> {
        match &self.snapshot {
            Some(s) => Ok(s.clone()),
            None => ApiSnafu {
                code: 500,
                message: "upstream down",
            }
            .fail(),
        }
    }
}

/// Records every notification it is given; optionally fails each delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().iter().map(Notification::subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        if self.fail {
            let source = "not an address"
                .parse::<lettre::Address>()
                .expect_err("invalid address");
            return Err(NotifyError::Address {
                address: "not an address".into(),
                source,
            });
        }
        Ok(())
    }
}
