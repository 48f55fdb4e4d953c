//! Payment correlation ids.
//!
//! Ids are `pay_<unix millis>_<8 hex chars>`. They only correlate a build with
//! the later submit and carry no authority on the ledger.

use facilitator_types::current_timestamp_millis;

/// Generates a new payment id.
pub fn generate_payment_id() -> String {
	let suffix = uuid::Uuid::new_v4().simple().to_string();
	format!("pay_{}_{}", current_timestamp_millis(), &suffix[..8])
}
