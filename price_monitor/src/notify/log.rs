use async_trait::async_trait;
use tracing::info;

use super::{Notification, Notifier, NotifyError};

/// Writes notifications to the log instead of sending them anywhere.
///
/// Used when no mail transport is configured and for `--skip-notify` style dry
/// runs where the rendered text is still worth seeing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            kind = notification.kind(),
            subject = %notification.subject(),
            body = %notification.body(),
            "notification"
        );
        Ok(())
    }
}
