//! Utility functions for formatting and time.

pub mod formatting;
pub mod helpers;

pub use formatting::{format_amount, truncate_id};
pub use helpers::{current_timestamp, current_timestamp_millis};
