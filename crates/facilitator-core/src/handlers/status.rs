//! Status resolver.
//!
//! A read-only view of a signature's state on the ledger. An unseen or
//! pruned signature is reported as `not_found` rather than as an error.

use crate::handlers::upstream;
use crate::SettlementError;
use facilitator_ledger::LedgerService;
use facilitator_types::{truncate_id, PaymentStatus, Signature, StatusRecord};
use std::sync::Arc;

pub struct StatusResolver {
	ledger: Arc<LedgerService>,
}

impl StatusResolver {
	pub fn new(ledger: Arc<LedgerService>) -> Self {
		Self { ledger }
	}

	/// Resolves the caller-facing status of `signature`.
	pub async fn status(&self, signature: &str) -> Result<StatusRecord, SettlementError> {
		let signature: Signature = signature.trim().parse().map_err(|e| {
			SettlementError::InvalidRequest(format!("Invalid transaction signature: {}", e))
		})?;

		let Some(status) = self
			.ledger
			.signature_status(&signature)
			.await
			.map_err(upstream)?
		else {
			tracing::debug!(signature = %truncate_id(&signature.to_string()), "Signature not found");
			return Ok(StatusRecord::not_found(signature));
		};

		let level = status.level();
		Ok(StatusRecord {
			signature,
			status: if status.err.is_some() {
				PaymentStatus::Failed
			} else {
				PaymentStatus::Confirmed
			},
			slot: Some(status.slot),
			confirmations: status.confirmations,
			confirmation_level: Some(level),
			error: status.err,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::ledger_service;
	use facilitator_ledger::{LedgerError, MockLedgerInterface};
	use facilitator_types::{ConfirmationLevel, SignatureStatus};

	fn signature() -> String {
		Signature::new_from_array([5; 64]).to_string()
	}

	#[tokio::test]
	async fn test_unknown_signature_is_not_found() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status().returning(|_| Ok(None));

		let record = StatusResolver::new(ledger_service(mock))
			.status(&signature())
			.await
			.unwrap();

		assert_eq!(record.status, PaymentStatus::NotFound);
		assert!(record.slot.is_none());
	}

	#[tokio::test]
	async fn test_status_is_stable_across_calls() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status().times(2).returning(|_| {
			Ok(Some(SignatureStatus {
				slot: 900,
				confirmations: None,
				err: None,
				confirmation_status: Some(ConfirmationLevel::Finalized),
			}))
		});
		let resolver = StatusResolver::new(ledger_service(mock));

		let first = resolver.status(&signature()).await.unwrap();
		let second = resolver.status(&signature()).await.unwrap();

		assert_eq!(first.status, PaymentStatus::Confirmed);
		assert_eq!(first.confirmation_level, Some(ConfirmationLevel::Finalized));
		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_error_field_marks_failed() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status().returning(|_| {
			Ok(Some(SignatureStatus {
				slot: 12,
				confirmations: Some(0),
				err: Some(serde_json::json!("AccountInUse")),
				confirmation_status: Some(ConfirmationLevel::Processed),
			}))
		});

		let record = StatusResolver::new(ledger_service(mock))
			.status(&signature())
			.await
			.unwrap();

		assert_eq!(record.status, PaymentStatus::Failed);
		assert_eq!(record.error, Some(serde_json::json!("AccountInUse")));
		assert_eq!(record.slot, Some(12));
	}

	#[tokio::test]
	async fn test_bad_signature_and_upstream_errors() {
		let resolver = StatusResolver::new(ledger_service(MockLedgerInterface::new()));
		assert!(matches!(
			resolver.status("not-a-signature").await,
			Err(SettlementError::InvalidRequest(_))
		));

		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status()
			.returning(|_| Err(LedgerError::Network("refused".into())));
		assert!(matches!(
			StatusResolver::new(ledger_service(mock))
				.status(&signature())
				.await,
			Err(SettlementError::UpstreamUnavailable(_))
		));
	}
}
