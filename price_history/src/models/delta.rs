use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product whose price differs from the one recorded on the prior day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDelta {
    /// Product name as it appears in the snapshot.
    pub product_name: String,
    /// Price recorded on the prior day.
    pub old_price: f64,
    /// Price in the new snapshot.
    pub new_price: f64,
    /// Observation time of the new price.
    pub observed_at: DateTime<Utc>,
}

impl PriceDelta {
    /// `new_price - old_price`.
    pub fn change(&self) -> f64 {
        self.new_price - self.old_price
    }
}

impl fmt::Display for PriceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.product_name)?;
        writeln!(f, "  old price: {}", self.old_price)?;
        writeln!(f, "  new price: {}", self.new_price)?;
        write!(
            f,
            "  observed:  {}",
            self.observed_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}
