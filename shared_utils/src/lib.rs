//! Small helpers shared across the price monitor workspace.

pub mod env;
