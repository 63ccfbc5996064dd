use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use price_history::store::FsBlobStore;
use price_monitor::{
    config::{EnvOverrides, MonitorConfig, load_config_path},
    logging::init_tracing,
    notify::{LogNotifier, Notifier, SmtpNotifier},
    providers::shop_rest::provider::ShopRestProvider,
    run::{Monitor, MonitorSettings, RunContext, RunOptions},
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Price monitor: change alerts, weekly digest and published dataset")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, value_name = "FILE", default_value = "price-monitor.toml")]
    config: PathBuf,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log one JSON object per line
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Fetch prices, alert on changes, record them, and publish the dataset
    Run {
        /// Record under this date instead of today (UTC)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        /// Build the weekly digest even if today is not the digest day
        #[arg(long)]
        force_digest: bool,
        /// Log notifications instead of sending them
        #[arg(long)]
        skip_notify: bool,
    },
    /// Build the weekly digest from the stored history
    Digest {
        /// Digest the seven days before this date
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        /// Send the digest
        #[arg(long)]
        notify: bool,
    },
    /// Rebuild the published dataset from the stored history
    Export,
}

fn context_for(date: Option<NaiveDate>) -> RunContext {
    match date {
        Some(day) => RunContext::on(day),
        None => RunContext::current(),
    }
}

fn build_notifier(cfg: &MonitorConfig, send: bool) -> Result<Box<dyn Notifier>> {
    match (&cfg.mail, send) {
        (Some(mail), true) => Ok(Box::new(
            SmtpNotifier::new(mail).context("failed to set up mail transport")?,
        )),
        _ => Ok(Box::new(LogNotifier)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    let mut cfg = load_config_path(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    cfg.apply_overrides(EnvOverrides::from_env()?);

    let blobs = FsBlobStore::new(&cfg.storage.root);
    let settings = MonitorSettings::from_config(&cfg);

    match cli.cmd {
        Cmd::Run {
            date,
            force_digest,
            skip_notify,
        } => {
            let provider =
                ShopRestProvider::new(&cfg.source).context("failed to set up price provider")?;
            let monitor = Monitor::new(blobs, build_notifier(&cfg, !skip_notify)?, settings);
            let opts = RunOptions {
                force_digest,
                notify: true,
            };
            let report = monitor.run(&provider, context_for(date), opts).await?;
            for failure in &report.notification_failures {
                warn!(kind = failure.kind, error = %failure.message, "notification not delivered");
            }
            if report.changes.is_empty() {
                println!("{}: {} products, no changes", report.reference_date, report.products);
            } else {
                println!("{}", report.changes);
            }
        }
        Cmd::Digest { date, notify } => {
            let monitor = Monitor::new(blobs, build_notifier(&cfg, notify)?, settings);
            let outcome = monitor.digest(context_for(date), notify).await?;
            println!("{}", outcome.digest);
            if !outcome.notification_failures.is_empty() {
                warn!(failures = outcome.notification_failures.len(), "digest not delivered");
            }
        }
        Cmd::Export => {
            let monitor = Monitor::new(blobs, Box::new(LogNotifier), settings);
            let model = monitor.export(chrono::Utc::now())?;
            info!(
                products = model.product_histories.len(),
                dates = model.all_dates.len(),
                "export rebuilt"
            );
        }
    }

    Ok(())
}
