//! Transaction submitter.
//!
//! Decodes a payer-signed transaction in whichever wire format the wallet
//! produced, checks it against the payment it names, sends it with preflight
//! and waits for the confirmed commitment level or block reference expiry.
//! There is no retry inside the submitter.

use crate::binding::{check_binding, PaymentBindings};
use crate::decoder::DecoderChain;
use crate::state::{SubmissionState, SubmissionTracker};
use crate::SettlementError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use facilitator_ledger::{ConfirmationOutcome, LedgerError, LedgerService};
use facilitator_storage::StorageError;
use facilitator_types::wire::VersionedTransaction;
use facilitator_types::{
	truncate_id, Cluster, PaymentBinding, SignedSubmission, Signature, SubmissionResult,
};
use std::sync::Arc;
use tracing::instrument;

/// Settles signed payment transactions.
pub struct TransactionSubmitter {
	ledger: Arc<LedgerService>,
	bindings: Option<Arc<PaymentBindings>>,
	decoders: DecoderChain,
	cluster: Cluster,
}

impl TransactionSubmitter {
	/// Creates a submitter. With `bindings` set every submission must name a
	/// payment id issued by the builder.
	pub fn new(
		ledger: Arc<LedgerService>,
		bindings: Option<Arc<PaymentBindings>>,
		decoders: DecoderChain,
		cluster: Cluster,
	) -> Self {
		Self {
			ledger,
			bindings,
			decoders,
			cluster,
		}
	}

	#[instrument(skip_all, fields(payment_id = %submission.payment_id.as_deref().unwrap_or("-")))]
	pub async fn submit(
		&self,
		submission: &SignedSubmission,
	) -> Result<SubmissionResult, SettlementError> {
		let mut tracker = SubmissionTracker::new(submission.payment_id.as_deref());
		let result = self.settle(submission, &mut tracker).await;
		if result.is_err() && !tracker.state().is_terminal() {
			tracker.advance(SubmissionState::Rejected);
		}
		result
	}

	async fn settle(
		&self,
		submission: &SignedSubmission,
		tracker: &mut SubmissionTracker,
	) -> Result<SubmissionResult, SettlementError> {
		if submission.signed_tx.trim().is_empty() {
			return Err(SettlementError::InvalidRequest(
				"Missing required field: signedTransaction".to_string(),
			));
		}
		let payment_id = self.required_payment_id(submission.payment_id.as_deref())?;

		tracker.advance(SubmissionState::Deserializing);
		let raw = STANDARD.decode(submission.signed_tx.trim()).map_err(|e| {
			SettlementError::DeserializationFailed(format!("Invalid base64 payload: {}", e))
		})?;
		let (format, tx) = self
			.decoders
			.decode(&raw)
			.map_err(SettlementError::DeserializationFailed)?;
		tracing::debug!(format, "Decoded signed transaction");

		tx.verify_signatures().map_err(|e| {
			SettlementError::InvalidRequest(format!("Signature verification failed: {}", e))
		})?;
		let bytes = tx
			.serialize()
			.map_err(|e| SettlementError::DeserializationFailed(e.to_string()))?;
		let expected_signature = tx.id().copied();
		let binding = match (&self.bindings, payment_id) {
			(Some(bindings), Some(payment_id)) => {
				Some(self.claim_binding(bindings, payment_id, &tx, tracker).await?)
			},
			_ => None,
		};

		// From here the payment id is held by this submission. It goes back
		// only when the ledger refused the bytes outright.
		tracker.advance(SubmissionState::Submitting);
		let signature = match self.ledger.send_transaction(&bytes).await {
			Ok(signature) => signature,
			Err(LedgerError::TransactionRejected(error)) => {
				tracker.advance(SubmissionState::OnChainFailed);
				tracing::warn!(error = %error, "Transaction rejected in preflight");
				self.restore(binding.as_ref()).await;
				return Err(SettlementError::OnChainFailed {
					signature: expected_signature,
					slot: None,
					error,
				});
			},
			Err(LedgerError::BlockhashExpired) => {
				tracker.advance(SubmissionState::Expired);
				return Err(SettlementError::Expired {
					signature: expected_signature,
					last_valid_block_height: binding.map(|b| b.last_valid_block_height),
				});
			},
			Err(e) => {
				tracker.advance(SubmissionState::UpstreamError);
				self.restore(binding.as_ref()).await;
				return Err(SettlementError::UpstreamUnavailable(e.to_string()));
			},
		};
		tracing::info!(signature = %truncate_id(&signature.to_string()), "Transaction sent");

		tracker.advance(SubmissionState::AwaitingConfirmation);
		let last_valid_block_height = binding.as_ref().map(|b| b.last_valid_block_height);
		let outcome = match self
			.ledger
			.confirm_transaction(&signature, tx.message.recent_blockhash(), last_valid_block_height)
			.await
		{
			Ok(outcome) => outcome,
			Err(e) => {
				tracker.advance(SubmissionState::UpstreamError);
				return Err(SettlementError::UpstreamUnavailable(e.to_string()));
			},
		};

		match outcome {
			ConfirmationOutcome::Confirmed { slot, level } => {
				tracker.advance(SubmissionState::Confirmed);
				tracing::info!(
					signature = %truncate_id(&signature.to_string()),
					slot = slot,
					level = level.as_str(),
					"Payment settled"
				);
				Ok(self.result(signature, slot, submission.payment_id.clone()))
			},
			ConfirmationOutcome::Failed { slot, error } => {
				tracker.advance(SubmissionState::OnChainFailed);
				tracing::warn!(
					signature = %truncate_id(&signature.to_string()),
					slot = slot,
					error = %error,
					"Transaction failed on-chain"
				);
				Err(SettlementError::OnChainFailed {
					signature: Some(signature),
					slot: Some(slot),
					error,
				})
			},
			ConfirmationOutcome::Expired {
				last_valid_block_height,
			} => {
				tracker.advance(SubmissionState::Expired);
				tracing::warn!(
					signature = %truncate_id(&signature.to_string()),
					"Transaction expired before confirmation"
				);
				Err(SettlementError::Expired {
					signature: Some(signature),
					last_valid_block_height,
				})
			},
		}
	}

	/// The trimmed payment id when bindings are enforced, `None` otherwise.
	fn required_payment_id<'a>(
		&self,
		payment_id: Option<&'a str>,
	) -> Result<Option<&'a str>, SettlementError> {
		if self.bindings.is_none() {
			return Ok(None);
		}
		payment_id
			.map(str::trim)
			.filter(|id| !id.is_empty())
			.map(Some)
			.ok_or_else(|| {
				SettlementError::InvalidRequest("Missing required field: paymentId".to_string())
			})
	}

	/// Checks `tx` against the binding for `payment_id` and takes the binding
	/// out of storage. Of two submissions racing on one payment id only the
	/// first to claim proceeds.
	async fn claim_binding(
		&self,
		bindings: &PaymentBindings,
		payment_id: &str,
		tx: &VersionedTransaction,
		tracker: &mut SubmissionTracker,
	) -> Result<PaymentBinding, SettlementError> {
		let Some(binding) = bindings.load(payment_id).await.map_err(binding_unavailable)? else {
			return Err(self.unknown_payment(payment_id, tx, tracker).await);
		};
		check_binding(&binding, tx).map_err(SettlementError::PaymentMismatch)?;

		match bindings.claim(payment_id).await.map_err(binding_unavailable)? {
			Some(binding) => Ok(binding),
			None => Err(SettlementError::PaymentMismatch(format!(
				"Payment id '{}' was claimed by another submission",
				payment_id
			))),
		}
	}

	/// Error for a payment id with no live binding. When the transaction's
	/// block reference has lapsed as well the caller is told it expired, so
	/// it rebuilds rather than retrying the same id.
	async fn unknown_payment(
		&self,
		payment_id: &str,
		tx: &VersionedTransaction,
		tracker: &mut SubmissionTracker,
	) -> SettlementError {
		match self.ledger.is_blockhash_valid(tx.message.recent_blockhash()).await {
			Ok(false) => {
				tracker.advance(SubmissionState::Expired);
				tracing::warn!(payment_id = %payment_id, "Block reference lapsed with the payment id");
				SettlementError::Expired {
					signature: tx.id().copied(),
					last_valid_block_height: None,
				}
			},
			Ok(true) => SettlementError::PaymentMismatch(format!(
				"Unknown or expired payment id '{}'",
				payment_id
			)),
			Err(e) => {
				tracing::warn!(error = %e, "Could not check block reference of unknown payment");
				SettlementError::PaymentMismatch(format!(
					"Unknown or expired payment id '{}'",
					payment_id
				))
			},
		}
	}

	async fn restore(&self, binding: Option<&PaymentBinding>) {
		let (Some(bindings), Some(binding)) = (&self.bindings, binding) else {
			return;
		};
		if let Err(e) = bindings.restore(binding).await {
			tracing::warn!(
				payment_id = %binding.payment_id,
				error = %e,
				"Failed to restore payment binding"
			);
		}
	}

	fn result(&self, signature: Signature, slot: u64, payment_id: Option<String>) -> SubmissionResult {
		SubmissionResult {
			explorer_url: self.cluster.explorer_url(&signature),
			alt_explorer_url: self.cluster.alt_explorer_url(&signature),
			signature,
			slot,
			payment_id,
		}
	}
}

fn binding_unavailable(e: StorageError) -> SettlementError {
	SettlementError::UpstreamUnavailable(format!("Failed to load payment binding: {}", e))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::handlers::PaymentTransactionBuilder;
	use crate::testing::{
		bindings, ledger_service, pricing_service, sign, wallet, RECENT_BLOCKHASH,
	};
	use ed25519_dalek::SigningKey;
	use facilitator_config::{Config, ConfigBuilder};
	use facilitator_ledger::MockLedgerInterface;
	use facilitator_types::programs::{associated_token, system, token};
	use facilitator_types::wire::{LegacyMessage, V0Message, VersionedMessage};
	use facilitator_types::{
		Address, AssetKind, BlockReference, BuildRequest, ConfirmationLevel, Instruction,
		SignatureStatus,
	};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	struct Fixture {
		builder: PaymentTransactionBuilder,
		submitter: TransactionSubmitter,
		bindings: Arc<PaymentBindings>,
	}

	fn fixture(mock: MockLedgerInterface) -> Fixture {
		fixture_for(mock, ConfigBuilder::new().build())
	}

	fn fixture_for(mut mock: MockLedgerInterface, config: Config) -> Fixture {
		mock.expect_get_latest_blockhash().returning(|| {
			Ok(BlockReference {
				blockhash: RECENT_BLOCKHASH,
				last_valid_block_height: 500,
			})
		});
		let ledger = ledger_service(mock);
		let bindings = bindings();
		Fixture {
			builder: PaymentTransactionBuilder::new(
				pricing_service(),
				ledger.clone(),
				Some(bindings.clone()),
				&config.payment,
			),
			submitter: TransactionSubmitter::new(
				ledger,
				Some(bindings.clone()),
				DecoderChain::default(),
				config.facilitator.network,
			),
			bindings,
		}
	}

	fn echo_send(mock: &mut MockLedgerInterface) {
		mock.expect_send_raw_transaction().returning(|bytes| {
			Ok(*VersionedTransaction::deserialize(bytes).unwrap().id().unwrap())
		});
	}

	fn status(err: Option<serde_json::Value>) -> SignatureStatus {
		SignatureStatus {
			slot: 77,
			confirmations: Some(3),
			err,
			confirmation_status: Some(ConfirmationLevel::Confirmed),
		}
	}

	/// Builds a payment for `payer` and returns it signed with `key`.
	async fn signed_payment(
		builder: &PaymentTransactionBuilder,
		key: &SigningKey,
		payer: Address,
	) -> (String, VersionedTransaction) {
		let envelope = builder
			.build(&BuildRequest {
				service_id: "pdf-summarizer-v1".to_string(),
				payer: payer.to_string(),
			})
			.await
			.unwrap();
		let bytes = STANDARD.decode(&envelope.serialized_tx).unwrap();
		let mut tx = VersionedTransaction::deserialize(&bytes).unwrap();
		sign(&mut tx, key);
		(envelope.payment_id, tx)
	}

	fn submission(tx: &VersionedTransaction, payment_id: &str) -> SignedSubmission {
		SignedSubmission {
			signed_tx: STANDARD.encode(tx.serialize().unwrap()),
			payment_id: Some(payment_id.to_string()),
		}
	}

	#[tokio::test]
	async fn test_legacy_submission_confirms() {
		let mut mock = MockLedgerInterface::new();
		echo_send(&mut mock);
		mock.expect_get_signature_status().returning(|_| Ok(Some(status(None))));
		mock.expect_is_blockhash_valid().returning(|_| Ok(true));
		let f = fixture(mock);
		let (key, payer) = wallet(1);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		let result = f.submitter.submit(&submission(&tx, &payment_id)).await.unwrap();

		assert_eq!(&result.signature, tx.id().unwrap());
		assert_eq!(result.slot, 77);
		assert_eq!(result.payment_id.as_deref(), Some(payment_id.as_str()));
		assert!(result.explorer_url.contains(&result.signature.to_string()));
		assert!(result.alt_explorer_url.starts_with("https://solscan.io/tx/"));

		// Settled payment ids cannot be reused.
		assert!(f.bindings.load(&payment_id).await.unwrap().is_none());
		assert!(matches!(
			f.submitter.submit(&submission(&tx, &payment_id)).await,
			Err(SettlementError::PaymentMismatch(_))
		));
	}

	#[tokio::test]
	async fn test_versioned_submission_confirms() {
		let mut mock = MockLedgerInterface::new();
		echo_send(&mut mock);
		mock.expect_get_signature_status().returning(|_| Ok(Some(status(None))));
		let f = fixture(mock);
		let (key, payer) = wallet(2);

		let (payment_id, legacy) = signed_payment(&f.builder, &key, payer).await;
		let VersionedMessage::Legacy(m) = legacy.message else {
			unreachable!()
		};
		let mut tx = VersionedTransaction {
			signatures: legacy.signatures,
			message: VersionedMessage::V0(V0Message {
				header: m.header,
				account_keys: m.account_keys,
				recent_blockhash: m.recent_blockhash,
				instructions: m.instructions,
				address_table_lookups: vec![],
			}),
		};
		sign(&mut tx, &key);

		let result = f.submitter.submit(&submission(&tx, &payment_id)).await.unwrap();
		assert_eq!(&result.signature, tx.id().unwrap());
	}

	#[tokio::test]
	async fn test_expired_never_confirms() {
		let mut mock = MockLedgerInterface::new();
		echo_send(&mut mock);
		mock.expect_get_signature_status().returning(|_| Ok(None));
		mock.expect_get_block_height().returning(|| Ok(501));
		let f = fixture(mock);
		let (key, payer) = wallet(3);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		let result = f.submitter.submit(&submission(&tx, &payment_id)).await;

		assert!(matches!(
			result,
			Err(SettlementError::Expired {
				last_valid_block_height: Some(500),
				..
			})
		));
		assert!(f.bindings.load(&payment_id).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_landed_failure_carries_ledger_error() {
		let mut mock = MockLedgerInterface::new();
		echo_send(&mut mock);
		mock.expect_get_signature_status().returning(|_| {
			Ok(Some(status(Some(
				serde_json::json!({"InstructionError": [0, {"Custom": 0}]}),
			))))
		});
		let f = fixture(mock);
		let (key, payer) = wallet(4);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		match f.submitter.submit(&submission(&tx, &payment_id)).await {
			Err(SettlementError::OnChainFailed { slot, error, .. }) => {
				assert_eq!(slot, Some(77));
				assert_eq!(error["InstructionError"][1]["Custom"], 0);
			},
			other => panic!("unexpected outcome: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_preflight_rejection_keeps_binding() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction().returning(|_| {
			Err(LedgerError::TransactionRejected(serde_json::json!({
				"InstructionError": [0, {"Custom": 1}]
			})))
		});
		mock.expect_get_signature_status().never();
		let f = fixture(mock);
		let (key, payer) = wallet(5);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		let result = f.submitter.submit(&submission(&tx, &payment_id)).await;

		assert!(matches!(
			result,
			Err(SettlementError::OnChainFailed { slot: None, .. })
		));
		assert!(f.bindings.load(&payment_id).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_upstream_send_failure() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction()
			.returning(|_| Err(LedgerError::Network("timed out".into())));
		let f = fixture(mock);
		let (key, payer) = wallet(6);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		assert!(matches!(
			f.submitter.submit(&submission(&tx, &payment_id)).await,
			Err(SettlementError::UpstreamUnavailable(_))
		));
		// Nothing reached the ledger, so the payment id can be retried.
		assert!(f.bindings.load(&payment_id).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_concurrent_submissions_settle_once() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction().times(1).returning(|bytes| {
			Ok(*VersionedTransaction::deserialize(bytes).unwrap().id().unwrap())
		});
		// The first poll finds nothing, so the first submission is still in
		// flight when the second one arrives.
		let polls = Arc::new(AtomicUsize::new(0));
		let counter = polls.clone();
		mock.expect_get_signature_status().returning(move |_| {
			if counter.fetch_add(1, Ordering::SeqCst) == 0 {
				Ok(None)
			} else {
				Ok(Some(status(None)))
			}
		});
		mock.expect_get_block_height().returning(|| Ok(100));
		mock.expect_is_blockhash_valid().returning(|_| Ok(true));
		let f = fixture(mock);
		let (key, payer) = wallet(10);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		let bound = f.bindings.load(&payment_id).await.unwrap().unwrap();
		let memo = Instruction {
			program_id: Address::new_from_array([9; 32]),
			accounts: vec![],
			data: b"order 42".to_vec(),
		};
		let message = LegacyMessage::compile(
			&[memo, system::transfer(&payer, &bound.destination, bound.amount)],
			&payer,
			RECENT_BLOCKHASH,
		)
		.unwrap();
		let mut variant = VersionedTransaction {
			signatures: vec![Signature::default()],
			message: VersionedMessage::Legacy(message),
		};
		sign(&mut variant, &key);
		assert_ne!(variant.id(), tx.id());

		let first_submission = submission(&tx, &payment_id);
		let second_submission = submission(&variant, &payment_id);
		let (first, second) = tokio::join!(
			f.submitter.submit(&first_submission),
			f.submitter.submit(&second_submission)
		);

		assert_eq!([&first, &second].iter().filter(|r| r.is_ok()).count(), 1);
		assert!([first, second]
			.into_iter()
			.any(|r| matches!(r, Err(SettlementError::PaymentMismatch(_)))));
		assert!(f.bindings.load(&payment_id).await.unwrap().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_lapsed_binding_with_stale_blockhash_is_expired() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction().never();
		mock.expect_is_blockhash_valid()
			.withf(|blockhash| *blockhash == RECENT_BLOCKHASH)
			.returning(|_| Ok(false));
		let f = fixture(mock);
		let (key, payer) = wallet(11);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		tokio::time::advance(Duration::from_secs(901)).await;
		assert!(f.bindings.load(&payment_id).await.unwrap().is_none());

		match f.submitter.submit(&submission(&tx, &payment_id)).await {
			Err(SettlementError::Expired {
				signature,
				last_valid_block_height,
			}) => {
				assert_eq!(signature.as_ref(), tx.id());
				assert_eq!(last_valid_block_height, None);
			},
			other => panic!("unexpected outcome: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_token_payment_settles_against_binding() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_account_info().returning(|_| Ok(None));
		mock.expect_send_raw_transaction().times(1).returning(|bytes| {
			Ok(*VersionedTransaction::deserialize(bytes).unwrap().id().unwrap())
		});
		mock.expect_get_signature_status().returning(|_| Ok(Some(status(None))));
		let f = fixture_for(mock, ConfigBuilder::new().use_native(false).build());
		let (key, payer) = wallet(12);

		let (payment_id, tx) = signed_payment(&f.builder, &key, payer).await;
		let bound = f.bindings.load(&payment_id).await.unwrap().unwrap();
		assert_eq!(bound.asset_kind, AssetKind::Token);
		let programs: Vec<_> = tx
			.message
			.instructions()
			.iter()
			.map(|ix| *tx.message.static_key(ix.program_id_index).unwrap())
			.collect();
		assert_eq!(programs, vec![associated_token::ID, token::ID]);

		// Paying a different token account, or a smaller amount, is refused
		// without touching the binding.
		let stranger = Address::new_from_array([66; 32]);
		let mint = ConfigBuilder::new().use_native(false).build().payment.token.mint;
		let other_account = associated_token::derive_address(&stranger, &mint).unwrap();
		for transfer in [
			token::transfer(&bound.source, &other_account, &payer, bound.amount),
			token::transfer(&bound.source, &bound.destination, &payer, bound.amount - 1),
		] {
			let message = LegacyMessage::compile(&[transfer], &payer, RECENT_BLOCKHASH).unwrap();
			let mut divergent = VersionedTransaction {
				signatures: vec![Signature::default()],
				message: VersionedMessage::Legacy(message),
			};
			sign(&mut divergent, &key);
			assert!(matches!(
				f.submitter.submit(&submission(&divergent, &payment_id)).await,
				Err(SettlementError::PaymentMismatch(_))
			));
		}

		let result = f.submitter.submit(&submission(&tx, &payment_id)).await.unwrap();
		assert_eq!(&result.signature, tx.id().unwrap());
		assert_eq!(result.slot, 77);
	}

	#[tokio::test]
	async fn test_divergent_transaction_never_sent() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction().never();
		mock.expect_is_blockhash_valid().returning(|_| Ok(true));
		let f = fixture(mock);
		let (key, payer) = wallet(7);

		let (payment_id, _) = signed_payment(&f.builder, &key, payer).await;
		let attacker_recipient = Address::new_from_array([66; 32]);
		let message = LegacyMessage::compile(
			&[system::transfer(&payer, &attacker_recipient, 1)],
			&payer,
			RECENT_BLOCKHASH,
		)
		.unwrap();
		let mut tx = VersionedTransaction {
			signatures: vec![Signature::default()],
			message: VersionedMessage::Legacy(message),
		};
		sign(&mut tx, &key);

		assert!(matches!(
			f.submitter.submit(&submission(&tx, &payment_id)).await,
			Err(SettlementError::PaymentMismatch(_))
		));
		assert!(matches!(
			f.submitter.submit(&submission(&tx, "pay_0_deadbeef")).await,
			Err(SettlementError::PaymentMismatch(_))
		));
	}

	#[tokio::test]
	async fn test_malformed_payloads_rejected() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_send_raw_transaction().never();
		let f = fixture(mock);
		let (key, payer) = wallet(8);
		let (payment_id, mut tx) = signed_payment(&f.builder, &key, payer).await;

		let garbage = SignedSubmission {
			signed_tx: STANDARD.encode([1u8, 2, 3]),
			payment_id: Some(payment_id.clone()),
		};
		assert!(matches!(
			f.submitter.submit(&garbage).await,
			Err(SettlementError::DeserializationFailed(_))
		));

		let missing_id = SignedSubmission {
			payment_id: None,
			..submission(&tx, &payment_id)
		};
		assert!(matches!(
			f.submitter.submit(&missing_id).await,
			Err(SettlementError::InvalidRequest(_))
		));

		tx.signatures[0] = Signature::default();
		assert!(matches!(
			f.submitter.submit(&submission(&tx, &payment_id)).await,
			Err(SettlementError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn test_unbound_submission_when_binding_disabled() {
		let mut mock = MockLedgerInterface::new();
		echo_send(&mut mock);
		mock.expect_get_signature_status().returning(|_| Ok(Some(status(None))));
		mock.expect_is_blockhash_valid().never();
		let submitter = TransactionSubmitter::new(
			ledger_service(mock),
			None,
			DecoderChain::default(),
			Default::default(),
		);

		let (key, payer) = wallet(9);
		let message = LegacyMessage::compile(
			&[system::transfer(&payer, &Address::new_from_array([3; 32]), 10)],
			&payer,
			RECENT_BLOCKHASH,
		)
		.unwrap();
		let mut tx = VersionedTransaction {
			signatures: vec![Signature::default()],
			message: VersionedMessage::Legacy(message),
		};
		sign(&mut tx, &key);

		let result = submitter
			.submit(&SignedSubmission {
				signed_tx: STANDARD.encode(tx.serialize().unwrap()),
				payment_id: None,
			})
			.await
			.unwrap();
		assert!(result.payment_id.is_none());
	}
}
