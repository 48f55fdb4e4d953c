//! Utility functions for the facilitator core.

pub mod payment_id;

pub use payment_id::generate_payment_id;
