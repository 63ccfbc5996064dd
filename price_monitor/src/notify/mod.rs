//! Notification sinks.
//!
//! A [`Notification`] is rendered to a subject line and a plain-text body; a
//! [`Notifier`] delivers it. Delivery failures are reported to the caller but
//! never affect the persisted records: the orchestrator logs them and moves on.

mod log;
mod smtp;

use async_trait::async_trait;
use price_history::{aggregator::WeeklyDigest, detector::ChangeReport};
use thiserror::Error;

pub use log::LogNotifier;
pub use smtp::SmtpNotifier;

/// Something worth telling a human about.
#[derive(Debug, Clone)]
pub enum Notification {
    /// Prices that moved since the prior day.
    PriceChanges {
        report: ChangeReport,
        /// Shop page linked at the bottom of the message.
        site_url: Option<String>,
    },
    /// The weekly report.
    WeeklyDigest(WeeklyDigest),
}

impl Notification {
    /// Short name used in logs and run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::PriceChanges { .. } => "price_changes",
            Notification::WeeklyDigest(_) => "weekly_digest",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::PriceChanges { report, .. } => {
                let n = report.deltas.len();
                let noun = if n == 1 { "product" } else { "products" };
                format!("Price change: {n} {noun} on {}", report.reference_date)
            }
            Notification::WeeklyDigest(digest) => format!(
                "Weekly price report {} .. {}",
                digest.period_start, digest.period_end
            ),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::PriceChanges { report, site_url } => match site_url {
                Some(url) => format!("{report}\nShop: {url}\n"),
                None => report.to_string(),
            },
            Notification::WeeklyDigest(digest) => format!("{digest}\n"),
        }
    }
}

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address {address:?}: {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for Box<N> {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        (**self).notify(notification).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use price_history::{
        aggregator::Period,
        history::PriceHistory,
        models::{PriceDelta, PriceQuote, Snapshot},
    };

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn report() -> ChangeReport {
        ChangeReport {
            reference_date: d("2024-01-03"),
            compared_with: Some(d("2024-01-02")),
            deltas: vec![PriceDelta {
                product_name: "A".into(),
                old_price: 12.0,
                new_price: 15.0,
                observed_at: Utc.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap(),
            }],
        }
    }

    #[test]
    fn change_mail_links_the_shop() {
        let n = Notification::PriceChanges {
            report: report(),
            site_url: Some("https://shop.example/".into()),
        };
        assert_eq!(n.kind(), "price_changes");
        assert_eq!(n.subject(), "Price change: 1 product on 2024-01-03");
        let body = n.body();
        assert!(body.starts_with("Price changes 2024-01-02 -> 2024-01-03\n"));
        assert!(body.contains("  old price: 12\n  new price: 15\n"));
        assert!(body.ends_with("\nShop: https://shop.example/\n"));
    }

    #[test]
    fn change_mail_without_site_is_just_the_report() {
        let n = Notification::PriceChanges {
            report: report(),
            site_url: None,
        };
        assert_eq!(n.body(), report().to_string());
    }

    #[test]
    fn digest_subject_names_the_period() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut snap = Snapshot::new();
        snap.insert("A", PriceQuote::new(1.0, ts)).unwrap();
        let history = PriceHistory::new().merged(d("2024-01-02"), &snap);
        let digest = WeeklyDigest::build(
            &history,
            Period::new(d("2024-01-01"), d("2024-01-08")),
            ts,
        );
        let n = Notification::WeeklyDigest(digest);
        assert_eq!(n.subject(), "Weekly price report 2024-01-01 .. 2024-01-07");
        assert!(n.body().contains("  2024-01-02  1\n"));
        assert!(n.body().ends_with('\n'));
    }
}
