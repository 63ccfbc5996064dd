//! Value types shared by the history, detector, aggregator and export modules.

pub mod delta;
pub mod period;
pub mod snapshot;

pub use delta::PriceDelta;
pub use period::{PeriodSeries, PricePoint, Trend};
pub use snapshot::{PriceQuote, Snapshot, SnapshotError};
