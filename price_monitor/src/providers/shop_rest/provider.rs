use async_trait::async_trait;
use chrono::Utc;
use price_history::models::Snapshot;
use reqwest::{Client, header};
use secrecy::ExposeSecret;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    config::SourceCfg,
    providers::{
        ClientBuildSnafu, HttpStatusSnafu, InvalidHeaderSnafu, ProviderError, ProviderInitError,
        SnapshotProvider, shop_rest::response::ShopResponse,
    },
};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/126.0 Safari/537.36";
const ACCEPT: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// The cookie value is only exposed into a header marked sensitive.
pub(crate) fn default_headers(cfg: &SourceCfg) -> Result<header::HeaderMap, ProviderInitError> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    if let Some(site) = &cfg.site_url {
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_str(site).context(InvalidHeaderSnafu { header: "Referer" })?,
        );
    }
    if let Some(cookie) = &cfg.cookie {
        let mut value = header::HeaderValue::from_str(cookie.expose_secret())
            .context(InvalidHeaderSnafu { header: "Cookie" })?;
        value.set_sensitive(true);
        headers.insert(header::COOKIE, value);
    }
    Ok(headers)
}

pub struct ShopRestProvider {
    client: Client,
    endpoint: String,
}

impl ShopRestProvider {
    /// Creates a provider for `cfg.endpoint`.
    ///
    /// Browser-style headers, the configured cookie and `Referer` (the site
    /// URL) are sent with every request; the whole request is bounded by
    /// `cfg.timeout_secs`.
    pub fn new(cfg: &SourceCfg) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .default_headers(default_headers(cfg)?)
            .timeout(cfg.timeout())
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SnapshotProvider for ShopRestProvider {
    async fn fetch(&self) -> Result<Snapshot, ProviderError> {
        debug!(endpoint = %self.endpoint, "requesting price list");
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return HttpStatusSnafu {
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let shop_response = response.json::<ShopResponse>().await?;
        let snapshot = shop_response.into_snapshot(Utc::now())?;

        info!(products = snapshot.len(), "fetched price list");
        Ok(snapshot)
    }
}
