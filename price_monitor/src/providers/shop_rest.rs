//! Provider for the shop's JSON price list endpoint.

pub mod provider;
pub mod response;
