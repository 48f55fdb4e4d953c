//! Payment settlement engine for the facilitator.
//!
//! This crate builds unsigned payment transactions for priced services,
//! settles the payer-signed result on the ledger, answers status queries and
//! issues and verifies x402 payment intents. [`FacilitatorBuilder`] wires the
//! configured ledger, pricing and storage implementations into a
//! [`FacilitatorEngine`].

use facilitator_types::{APIError, Signature};
use thiserror::Error;

pub mod binding;
pub mod builder;
pub mod decoder;
pub mod engine;
pub mod handlers;
pub mod state;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::{BuilderError, FacilitatorBuilder, FacilitatorFactories};
pub use engine::FacilitatorEngine;

/// Outcomes of an engine operation that are reported to the caller.
///
/// Every variant is an expected result rather than a defect. On-chain
/// failures carry the ledger's own error shape.
#[derive(Debug, Error)]
pub enum SettlementError {
	/// Missing or malformed input.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// The service identifier is not priced.
	#[error("Service not found: {0}")]
	ServiceNotFound(String),
	/// The ledger or a backing store could not be reached.
	#[error("Upstream unavailable: {0}")]
	UpstreamUnavailable(String),
	/// The signed payload matches no supported transaction encoding.
	#[error("Deserialization failed: {0}")]
	DeserializationFailed(String),
	/// The transaction reached the ledger and was rejected there.
	#[error("Transaction failed on-chain: {error}")]
	OnChainFailed {
		signature: Option<Signature>,
		slot: Option<u64>,
		error: serde_json::Value,
	},
	/// The block reference expired before the transaction was confirmed.
	#[error("Transaction expired")]
	Expired {
		signature: Option<Signature>,
		last_valid_block_height: Option<u64>,
	},
	/// The submitted transaction does not match the payment it names.
	#[error("Payment mismatch: {0}")]
	PaymentMismatch(String),
	/// An x402 payment intent failed verification.
	#[error("{0}")]
	IntentRejected(String),
}

impl From<SettlementError> for APIError {
	fn from(err: SettlementError) -> Self {
		match err {
			SettlementError::InvalidRequest(message) => APIError::BadRequest {
				error: "Invalid request".to_string(),
				message: Some(message),
				details: None,
			},
			SettlementError::ServiceNotFound(id) => APIError::NotFound {
				error: "Agent not found".to_string(),
				message: format!("No priced service with id '{}'", id),
			},
			SettlementError::UpstreamUnavailable(message) => APIError::InternalServerError {
				error: "Upstream unavailable".to_string(),
				message,
			},
			SettlementError::DeserializationFailed(message) => APIError::InternalServerError {
				error: "Failed to deserialize transaction".to_string(),
				message,
			},
			SettlementError::OnChainFailed {
				signature,
				slot,
				error,
			} => APIError::BadRequest {
				error: "Transaction failed on-chain".to_string(),
				message: signature.map(|signature| match slot {
					Some(slot) => format!("Transaction {} failed in slot {}", signature, slot),
					None => format!("Transaction {} was rejected", signature),
				}),
				details: Some(error),
			},
			SettlementError::Expired {
				signature,
				last_valid_block_height,
			} => APIError::BadRequest {
				error: "Transaction expired".to_string(),
				message: Some(
					"Block reference expired before confirmation; build a new transaction"
						.to_string(),
				),
				details: Some(serde_json::json!({
					"signature": signature.map(|s| s.to_string()),
					"lastValidBlockHeight": last_valid_block_height,
				})),
			},
			SettlementError::PaymentMismatch(message) => APIError::Conflict {
				error: "Payment mismatch".to_string(),
				message,
			},
			SettlementError::IntentRejected(error) => APIError::BadRequest {
				error,
				message: None,
				details: None,
			},
		}
	}
}
