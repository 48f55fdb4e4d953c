//! Ledger network client for the payment facilitator.
//!
//! The facilitator talks to the ledger through a narrow interface: fetch the
//! latest block reference, read an account, submit raw transaction bytes and
//! poll signature status. [`LedgerService`] adds the confirmation wait on top
//! of that interface, bounded by the block reference's expiry height.

use async_trait::async_trait;
use facilitator_types::{
	AccountInfo, Address, BlockReference, ConfigSchema, ConfirmationLevel, Hash,
	ImplementationRegistry, Signature, SignatureStatus,
};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod solana_rpc;
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
	/// Error that occurs when the ledger cannot be reached.
	#[error("Network error: {0}")]
	Network(String),
	/// Error returned by the ledger's RPC endpoint.
	#[error("RPC error {code}: {message}")]
	Rpc {
		code: i64,
		message: String,
		data: Option<serde_json::Value>,
	},
	/// The ledger refused the transaction during preflight simulation.
	#[error("Transaction rejected: {0}")]
	TransactionRejected(serde_json::Value),
	/// The transaction's block hash is no longer accepted.
	#[error("Blockhash expired")]
	BlockhashExpired,
	/// The ledger answered with a body that could not be interpreted.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the narrow client interface to the ledger network.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Latest block hash and the last block height at which it is valid.
	async fn get_latest_blockhash(&self) -> Result<BlockReference, LedgerError>;

	/// Reads an account; `None` when it does not exist.
	async fn get_account_info(&self, address: &Address)
		-> Result<Option<AccountInfo>, LedgerError>;

	/// Submits a signed transaction with preflight simulation.
	async fn send_raw_transaction(&self, tx: &[u8]) -> Result<Signature, LedgerError>;

	/// Current status of a signature; `None` when the ledger has no record.
	async fn get_signature_status(
		&self,
		signature: &Signature,
	) -> Result<Option<SignatureStatus>, LedgerError>;

	async fn get_block_height(&self) -> Result<u64, LedgerError>;

	async fn is_blockhash_valid(&self, blockhash: &Hash) -> Result<bool, LedgerError>;
}

/// Type alias for ledger factory functions.
pub type LedgerFactory = fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError>;

/// Registry trait for ledger implementations.
pub trait LedgerRegistry: ImplementationRegistry<Factory = LedgerFactory> {}

/// Get all registered ledger implementations.
pub fn get_all_implementations() -> Vec<(&'static str, LedgerFactory)> {
	use implementations::solana_rpc;

	vec![(solana_rpc::Registry::NAME, solana_rpc::Registry::factory())]
}

/// How a confirmation wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
	/// Reached at least `confirmed` without an error.
	Confirmed {
		slot: u64,
		level: ConfirmationLevel,
	},
	/// Reached at least `confirmed` carrying an on-chain error.
	Failed {
		slot: u64,
		error: serde_json::Value,
	},
	/// The block reference expired before the transaction was confirmed.
	Expired { last_valid_block_height: Option<u64> },
}

/// Service wrapping the configured ledger client.
pub struct LedgerService {
	implementation: Box<dyn LedgerInterface>,
	poll_interval: Duration,
}

impl LedgerService {
	pub fn new(implementation: Box<dyn LedgerInterface>, poll_interval: Duration) -> Self {
		Self {
			implementation,
			poll_interval,
		}
	}

	pub async fn latest_block_reference(&self) -> Result<BlockReference, LedgerError> {
		self.implementation.get_latest_blockhash().await
	}

	pub async fn get_account_info(
		&self,
		address: &Address,
	) -> Result<Option<AccountInfo>, LedgerError> {
		self.implementation.get_account_info(address).await
	}

	pub async fn send_transaction(&self, tx: &[u8]) -> Result<Signature, LedgerError> {
		self.implementation.send_raw_transaction(tx).await
	}

	pub async fn signature_status(
		&self,
		signature: &Signature,
	) -> Result<Option<SignatureStatus>, LedgerError> {
		self.implementation.get_signature_status(signature).await
	}

	pub async fn is_blockhash_valid(&self, blockhash: &Hash) -> Result<bool, LedgerError> {
		self.implementation.is_blockhash_valid(blockhash).await
	}

	/// Waits until `signature` reaches the `confirmed` level or its block
	/// reference expires.
	///
	/// Expiry is judged by block height when `last_valid_block_height` is
	/// known, otherwise by asking whether `blockhash` is still valid. A final
	/// status check runs before expiry is reported.
	pub async fn confirm_transaction(
		&self,
		signature: &Signature,
		blockhash: &Hash,
		last_valid_block_height: Option<u64>,
	) -> Result<ConfirmationOutcome, LedgerError> {
		loop {
			if let Some(outcome) = self.check_confirmed(signature).await? {
				return Ok(outcome);
			}

			let expired = match last_valid_block_height {
				Some(limit) => self.implementation.get_block_height().await? > limit,
				None => !self.implementation.is_blockhash_valid(blockhash).await?,
			};
			if expired {
				if let Some(outcome) = self.check_confirmed(signature).await? {
					return Ok(outcome);
				}
				tracing::debug!(
					signature = %signature,
					last_valid_block_height = ?last_valid_block_height,
					"Block reference expired before confirmation"
				);
				return Ok(ConfirmationOutcome::Expired {
					last_valid_block_height,
				});
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn check_confirmed(
		&self,
		signature: &Signature,
	) -> Result<Option<ConfirmationOutcome>, LedgerError> {
		let Some(status) = self.implementation.get_signature_status(signature).await? else {
			return Ok(None);
		};
		let level = status.level();
		if level < ConfirmationLevel::Confirmed {
			return Ok(None);
		}
		Ok(Some(match status.err {
			Some(error) => ConfirmationOutcome::Failed {
				slot: status.slot,
				error,
			},
			None => ConfirmationOutcome::Confirmed {
				slot: status.slot,
				level,
			},
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	fn status(level: ConfirmationLevel, err: Option<serde_json::Value>) -> SignatureStatus {
		SignatureStatus {
			slot: 42,
			confirmations: Some(1),
			err,
			confirmation_status: Some(level),
		}
	}

	fn service(mock: MockLedgerInterface) -> LedgerService {
		LedgerService::new(Box::new(mock), Duration::from_millis(1))
	}

	#[tokio::test]
	async fn test_confirms_after_processed() {
		let mut mock = MockLedgerInterface::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		mock.expect_get_signature_status().returning(move |_| {
			Ok(match counter.fetch_add(1, Ordering::SeqCst) {
				0 => None,
				1 => Some(status(ConfirmationLevel::Processed, None)),
				_ => Some(status(ConfirmationLevel::Confirmed, None)),
			})
		});
		mock.expect_get_block_height().returning(|| Ok(100));

		let outcome = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), Some(200))
			.await
			.unwrap();

		assert_eq!(
			outcome,
			ConfirmationOutcome::Confirmed {
				slot: 42,
				level: ConfirmationLevel::Confirmed
			}
		);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_on_chain_error_is_failed() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status().returning(|_| {
			Ok(Some(status(
				ConfirmationLevel::Finalized,
				Some(serde_json::json!({"InstructionError": [0, {"Custom": 1}]})),
			)))
		});

		let outcome = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), Some(200))
			.await
			.unwrap();

		assert!(matches!(outcome, ConfirmationOutcome::Failed { slot: 42, .. }));
	}

	#[tokio::test]
	async fn test_expires_past_block_height() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status()
			.times(2)
			.returning(|_| Ok(None));
		mock.expect_get_block_height().returning(|| Ok(201));

		let outcome = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), Some(200))
			.await
			.unwrap();

		assert_eq!(
			outcome,
			ConfirmationOutcome::Expired {
				last_valid_block_height: Some(200)
			}
		);
	}

	#[tokio::test]
	async fn test_landed_at_boundary_is_not_expired() {
		let mut mock = MockLedgerInterface::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		mock.expect_get_signature_status().returning(move |_| {
			Ok(match counter.fetch_add(1, Ordering::SeqCst) {
				0 => None,
				_ => Some(status(ConfirmationLevel::Confirmed, None)),
			})
		});
		mock.expect_get_block_height().returning(|| Ok(500));

		let outcome = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), Some(200))
			.await
			.unwrap();

		assert!(matches!(outcome, ConfirmationOutcome::Confirmed { .. }));
	}

	#[tokio::test]
	async fn test_unknown_height_uses_blockhash_validity() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status().returning(|_| Ok(None));
		mock.expect_get_block_height().never();
		mock.expect_is_blockhash_valid().returning(|_| Ok(false));

		let outcome = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), None)
			.await
			.unwrap();

		assert_eq!(
			outcome,
			ConfirmationOutcome::Expired {
				last_valid_block_height: None
			}
		);
	}

	#[tokio::test]
	async fn test_poll_error_propagates() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_signature_status()
			.returning(|_| Err(LedgerError::Network("connection refused".into())));

		let result = service(mock)
			.confirm_transaction(&Signature::default(), &Hash::default(), Some(1))
			.await;

		assert!(matches!(result, Err(LedgerError::Network(_))));
	}
}
