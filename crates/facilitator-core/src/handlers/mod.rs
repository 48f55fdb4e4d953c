//! Request handlers for the settlement engine.
//!
//! Each handler owns one operation: building unsigned transactions,
//! settling signed ones, resolving signature status and issuing or verifying
//! x402 payment intents.

pub mod create;
pub mod intent;
pub mod status;
pub mod submit;

pub use create::PaymentTransactionBuilder;
pub use intent::IntentHandler;
pub use status::StatusResolver;
pub use submit::TransactionSubmitter;

use facilitator_ledger::LedgerError;

use crate::SettlementError;

/// Maps a ledger failure outside of submission to the caller taxonomy.
pub(crate) fn upstream(error: LedgerError) -> SettlementError {
	SettlementError::UpstreamUnavailable(error.to_string())
}
