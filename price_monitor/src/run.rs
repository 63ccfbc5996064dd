//! The daily run: fetch, detect, notify, record, digest, publish.
//!
//! A run is strictly sequential and every step that touches a record goes
//! through the blob store's atomic put, so an interrupted run leaves each
//! record either at its previous content or at its new content.
//!
//! Failure policy:
//! - fetch failures abort before anything is read or written
//! - notification failures are logged and collected in the report
//! - store failures abort the run; records written before the failure stay
//!
//! The reference date and the clock are inputs ([`RunContext`]), never read
//! from the system inside this module.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use price_history::{
    aggregator::{Period, WeeklyDigest},
    detector::{ChangeReport, detect_for_date},
    export::{ExportModel, project},
    history::{HistoryStore, PriceHistory},
    store::{BlobStore, StoreError, save_json},
};
use serde::Serialize;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu, ensure};
use tracing::{info, warn};

use crate::{
    config::MonitorConfig,
    notify::{Notification, Notifier},
    providers::{ProviderError, SnapshotProvider},
};

/// Errors that end a run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunError {
    #[snafu(display("Failed to fetch prices: {source}"))]
    Fetch {
        #[snafu(backtrace)]
        source: ProviderError,
    },

    #[snafu(display("Price list for {date} is empty, refusing to record it"))]
    EmptySnapshot { date: NaiveDate, backtrace: Backtrace },

    #[snafu(display("Failed to load price history: {source}"))]
    LoadHistory {
        #[snafu(backtrace)]
        source: StoreError,
    },

    #[snafu(display("Failed to save price history: {source}"))]
    SaveHistory {
        #[snafu(backtrace)]
        source: StoreError,
    },

    #[snafu(display("Failed to save weekly digest: {source}"))]
    SaveDigest {
        #[snafu(backtrace)]
        source: StoreError,
    },

    #[snafu(display("Failed to save published dataset: {source}"))]
    SaveExport {
        #[snafu(backtrace)]
        source: StoreError,
    },

    #[snafu(display("No digest period ends before {reference}"))]
    NoDigestPeriod {
        reference: NaiveDate,
        backtrace: Backtrace,
    },
}

/// Where "today" is and what time it is, for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// Date the fetched snapshot is recorded under.
    pub today: NaiveDate,
    /// Timestamp stamped on the digest and the published dataset.
    pub now: DateTime<Utc>,
}

impl RunContext {
    /// Context for the current moment, dated in UTC.
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            today: now.date_naive(),
            now,
        }
    }

    /// Context for an explicit date, keeping the current clock.
    pub fn on(today: NaiveDate) -> Self {
        Self {
            today,
            now: Utc::now(),
        }
    }
}

/// Switches for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Build the digest even when today is not the digest weekday.
    pub force_digest: bool,
    /// Deliver notifications; when false they are only logged as skipped.
    pub notify: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force_digest: false,
            notify: true,
        }
    }
}

/// Blob keys and scheduling used by [`Monitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub history_key: String,
    pub digest_key: String,
    pub export_key: String,
    pub digest_weekday: Weekday,
    pub site_url: Option<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            history_key: "data/price-history.json".into(),
            digest_key: "data/weekly-report.json".into(),
            export_key: "docs/price-data.json".into(),
            digest_weekday: Weekday::Mon,
            site_url: None,
        }
    }
}

impl MonitorSettings {
    pub fn from_config(cfg: &MonitorConfig) -> Self {
        Self {
            history_key: cfg.storage.history.clone(),
            digest_key: cfg.storage.digest.clone(),
            export_key: cfg.storage.export.clone(),
            digest_weekday: cfg.digest.weekday,
            site_url: cfg.source.site_url.clone(),
        }
    }
}

/// A notification that could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationFailure {
    pub kind: &'static str,
    pub message: String,
}

/// What a completed run did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub reference_date: NaiveDate,
    /// Products in the fetched snapshot.
    pub products: usize,
    pub changes: ChangeReport,
    /// Recorded days after the merge.
    pub history_days: usize,
    /// Present when the digest was built this run.
    pub digest: Option<WeeklyDigest>,
    pub notification_failures: Vec<NotificationFailure>,
}

/// Result of a standalone digest build.
#[derive(Debug, Clone)]
pub struct DigestOutcome {
    pub digest: WeeklyDigest,
    pub notification_failures: Vec<NotificationFailure>,
}

/// Runs the job against one blob store and one notifier.
pub struct Monitor<B> {
    blobs: B,
    notifier: Box<dyn Notifier>,
    settings: MonitorSettings,
}

impl<B: BlobStore> Monitor<B> {
    pub fn new(blobs: B, notifier: Box<dyn Notifier>, settings: MonitorSettings) -> Self {
        Self {
            blobs,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    fn history_store(&self) -> HistoryStore<&B> {
        HistoryStore::new(&self.blobs, self.settings.history_key.as_str())
    }

    /// True if a run dated `day` builds the digest without being forced.
    pub fn is_digest_day(&self, day: NaiveDate) -> bool {
        day.weekday() == self.settings.digest_weekday
    }

    /// One full run.
    pub async fn run(
        &self,
        provider: &dyn SnapshotProvider,
        ctx: RunContext,
        opts: RunOptions,
    ) -> Result<RunReport, RunError> {
        info!(date = %ctx.today, "run started");

        let snapshot = provider.fetch().await.context(FetchSnafu)?;
        ensure!(!snapshot.is_empty(), EmptySnapshotSnafu { date: ctx.today });

        let store = self.history_store();
        let mut history = store.load().context(LoadHistorySnafu)?;

        let mut failures = Vec::new();
        let changes = detect_for_date(&history, &snapshot, ctx.today);
        if changes.is_empty() {
            info!(compared_with = ?changes.compared_with, "no price changes");
        } else {
            info!(changes = changes.deltas.len(), "price changes detected");
            let notification = Notification::PriceChanges {
                report: changes.clone(),
                site_url: self.settings.site_url.clone(),
            };
            self.deliver(&notification, opts.notify, &mut failures).await;
        }

        history.merge(ctx.today, &snapshot);
        store.save(&history).context(SaveHistorySnafu)?;

        let digest = if opts.force_digest || self.is_digest_day(ctx.today) {
            Some(self.publish_digest(&history, ctx, opts.notify, &mut failures).await?)
        } else {
            None
        };

        self.publish_export(&history, ctx.now)?;

        info!(
            products = snapshot.len(),
            changes = changes.deltas.len(),
            digest = digest.is_some(),
            notification_failures = failures.len(),
            "run finished"
        );
        Ok(RunReport {
            reference_date: ctx.today,
            products: snapshot.len(),
            changes,
            history_days: history.len(),
            digest,
            notification_failures: failures,
        })
    }

    /// Build, optionally send, and persist the digest for the week before
    /// `ctx.today` from the stored history alone.
    pub async fn digest(&self, ctx: RunContext, notify: bool) -> Result<DigestOutcome, RunError> {
        let history = self.history_store().load().context(LoadHistorySnafu)?;
        let mut failures = Vec::new();
        let digest = self.publish_digest(&history, ctx, notify, &mut failures).await?;
        Ok(DigestOutcome {
            digest,
            notification_failures: failures,
        })
    }

    /// Re-project the published dataset from the stored history.
    pub fn export(&self, now: DateTime<Utc>) -> Result<ExportModel, RunError> {
        let history = self.history_store().load().context(LoadHistorySnafu)?;
        self.publish_export(&history, now)
    }

    async fn publish_digest(
        &self,
        history: &PriceHistory,
        ctx: RunContext,
        notify: bool,
        failures: &mut Vec<NotificationFailure>,
    ) -> Result<WeeklyDigest, RunError> {
        let period = Period::digest(ctx.today).context(NoDigestPeriodSnafu {
            reference: ctx.today,
        })?;
        let digest = WeeklyDigest::build(history, period, ctx.now);
        if digest.is_empty() {
            warn!(start = %digest.period_start, end = %digest.period_end, "no prices recorded for digest period");
        }

        let notification = Notification::WeeklyDigest(digest.clone());
        self.deliver(&notification, notify, failures).await;

        save_json(&self.blobs, &self.settings.digest_key, &digest).context(SaveDigestSnafu)?;
        info!(
            key = %self.settings.digest_key,
            start = %digest.period_start,
            end = %digest.period_end,
            products = digest.data.len(),
            "weekly digest saved"
        );
        Ok(digest)
    }

    fn publish_export(
        &self,
        history: &PriceHistory,
        now: DateTime<Utc>,
    ) -> Result<ExportModel, RunError> {
        let model = project(history, now);
        save_json(&self.blobs, &self.settings.export_key, &model).context(SaveExportSnafu)?;
        info!(
            key = %self.settings.export_key,
            products = model.product_histories.len(),
            dates = model.all_dates.len(),
            "dataset published"
        );
        Ok(model)
    }

    async fn deliver(
        &self,
        notification: &Notification,
        enabled: bool,
        failures: &mut Vec<NotificationFailure>,
    ) {
        if !enabled {
            info!(kind = notification.kind(), "notifications disabled, skipping");
            return;
        }
        if let Err(e) = self.notifier.notify(notification).await {
            warn!(kind = notification.kind(), error = %e, "notification failed");
            failures.push(NotificationFailure {
                kind: notification.kind(),
                message: e.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use price_history::store::MemoryBlobStore;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn monitor() -> Monitor<MemoryBlobStore> {
        Monitor::new(
            MemoryBlobStore::new(),
            Box::new(LogNotifier),
            MonitorSettings::default(),
        )
    }

    #[test]
    fn digest_day_follows_configured_weekday() {
        let mut m = monitor();
        // 2024-01-08 is a Monday
        assert!(m.is_digest_day(d("2024-01-08")));
        assert!(!m.is_digest_day(d("2024-01-07")));

        m.settings.digest_weekday = Weekday::Sun;
        assert!(m.is_digest_day(d("2024-01-07")));
    }

    #[test]
    fn export_of_empty_store_publishes_empty_dataset() {
        let m = monitor();
        let now = Utc::now();
        let model = m.export(now).unwrap();
        assert!(model.all_dates.is_empty());
        assert_eq!(m.blobs().keys(), vec!["docs/price-data.json".to_string()]);
    }

    #[tokio::test]
    async fn standalone_digest_is_persisted() {
        let m = monitor();
        let outcome = m.digest(RunContext::on(d("2024-01-10")), true).await.unwrap();
        assert!(outcome.digest.is_empty());
        assert!(outcome.notification_failures.is_empty());
        assert_eq!(outcome.digest.period_start, d("2024-01-03"));
        assert_eq!(outcome.digest.period_end, d("2024-01-09"));
        assert_eq!(m.blobs().keys(), vec!["data/weekly-report.json".to_string()]);
    }
}
