use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::ExposeSecret;
use tracing::{debug, info};

use super::{Notification, Notifier, NotifyError};
use crate::config::MailCfg;

/// Sends notifications as plain-text mail over SMTP.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// Builds the transport from `cfg`.
    ///
    /// `secure` selects implicit TLS; otherwise the connection is upgraded with
    /// STARTTLS. Credentials are only sent when both user and password are set.
    pub fn new(cfg: &MailCfg) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&cfg.from)?;
        let to = cfg
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;

        let builder = if cfg.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?
        };
        let mut builder = builder.port(cfg.port());
        if let (Some(user), Some(password)) = (&cfg.user, &cfg.password) {
            builder = builder.credentials(Credentials::new(
                user.clone(),
                password.expose_secret().to_string(),
            ));
        }
        debug!(host = %cfg.host, port = cfg.port(), secure = cfg.secure, "smtp transport ready");

        Ok(Self {
            transport: builder.build(),
            from,
            to,
        })
    }

    /// Builds the message without sending it.
    pub fn message(&self, notification: &Notification) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN);
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        Ok(builder.body(notification.body())?)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let message = self.message(notification)?;
        self.transport.send(message).await?;
        info!(
            kind = notification.kind(),
            recipients = self.to.len(),
            "mail sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_str;
    use chrono::{NaiveDate, TimeZone, Utc};
    use price_history::{detector::ChangeReport, models::PriceDelta};

    fn mail_cfg(to: &str) -> MailCfg {
        let toml = format!(
            "[source]\nendpoint = \"https://x\"\n[mail]\nfrom = \"Monitor <monitor@example.com>\"\nto = [{to}]\nhost = \"smtp.example.com\"\nuser = \"u\"\npassword = \"p\"\n"
        );
        load_config_str(&toml).unwrap().mail.unwrap()
    }

    fn notification() -> Notification {
        let day: NaiveDate = "2024-01-03".parse().unwrap();
        Notification::PriceChanges {
            report: ChangeReport {
                reference_date: day,
                compared_with: day.pred_opt(),
                deltas: vec![PriceDelta {
                    product_name: "A".into(),
                    old_price: 12.0,
                    new_price: 15.0,
                    observed_at: Utc.with_ymd_and_hms(2024, 1, 3, 8, 0, 0).unwrap(),
                }],
            },
            site_url: None,
        }
    }

    #[tokio::test]
    async fn message_is_addressed_to_every_recipient() {
        let notifier = SmtpNotifier::new(&mail_cfg("\"a@example.com\", \"b@example.com\"")).unwrap();
        let message = notifier.message(&notification()).unwrap();
        let to: Vec<String> = message
            .envelope()
            .to()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(to, vec!["a@example.com", "b@example.com"]);

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Price change: 1 product on 2024-01-03"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[tokio::test]
    async fn bad_recipient_is_rejected_up_front() {
        let err = SmtpNotifier::new(&mail_cfg("\"not an address\"")).err().unwrap();
        assert!(matches!(err, NotifyError::Address { .. }));
    }
}
