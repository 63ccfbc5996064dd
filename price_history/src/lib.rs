//! Core of the price monitor: an append-only, date-keyed archive of price
//! snapshots and the views derived from it.
//!
//! - [`history`]: the [`PriceHistory`](history::PriceHistory) archive and its
//!   persisted form, [`HistoryStore`](history::HistoryStore).
//! - [`detector`]: day-over-day change detection.
//! - [`aggregator`]: per-product period series, trends and the weekly digest.
//! - [`export`]: the denormalized dataset published for external readers.
//! - [`store`]: the blob store the persisted records live in.
//!
//! Every function that depends on "today" takes the reference date as an
//! argument; nothing in this crate reads the wall clock.

#![warn(missing_docs)]

pub mod aggregator;
pub mod detector;
pub mod export;
pub mod history;
pub mod models;
pub mod store;
