use chrono::{DateTime, Utc};
use price_history::models::{PriceQuote, Snapshot};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::debug;

use crate::providers::{ApiSnafu, InvalidQuoteSnafu, MalformedSnafu, ProviderError};

/// Envelope returned by the price list endpoint: `{code, msg?, data: [...]}`.
#[derive(Deserialize, Debug)]
pub struct ShopResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<ShopProduct>>,
}

#[derive(Deserialize, Debug)]
pub struct ShopProduct {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<RawPrice>,
}

/// Prices arrive either as JSON numbers or as numeric strings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    pub fn value(&self) -> Option<f64> {
        match self {
            RawPrice::Number(n) => Some(*n),
            RawPrice::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl ShopResponse {
    /// Turn the envelope into a snapshot whose quotes are all stamped `observed_at`.
    ///
    /// A non-zero `code` or a missing `data` list is an API error. Names are
    /// trimmed; a duplicated product name keeps the last listed price.
    pub fn into_snapshot(self, observed_at: DateTime<Utc>) -> Result<Snapshot, ProviderError> {
        let message = self.msg.unwrap_or_else(|| "unknown error".to_string());
        ensure!(
            self.code == 0,
            ApiSnafu {
                code: self.code,
                message: message.clone(),
            }
        );
        let products = self.data.context(ApiSnafu {
            code: self.code,
            message: format!("response has no data ({message})"),
        })?;

        let mut snapshot = Snapshot::new();
        for (index, product) in products.into_iter().enumerate() {
            let name = product
                .name
                .context(MalformedSnafu {
                    index,
                    message: "missing name",
                })?
                .trim()
                .to_string();
            let raw = product.price.context(MalformedSnafu {
                index,
                message: format!("missing price for {name:?}"),
            })?;
            let price = raw.value().context(MalformedSnafu {
                index,
                message: format!("unparsable price {raw:?} for {name:?}"),
            })?;

            let replaced = snapshot
                .insert(name.clone(), PriceQuote::new(price, observed_at))
                .context(InvalidQuoteSnafu { index })?;
            if let Some(previous) = replaced {
                debug!(product = %name, previous = previous.price, price, "duplicate product, keeping last");
            }
        }
        Ok(snapshot)
    }
}
