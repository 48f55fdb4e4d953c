//! Settlement engine.
//!
//! Holds the services and handlers for one facilitator instance. Requests do
//! not share state with each other apart from the payment bindings, which
//! are keyed by payment id.

use crate::binding::PaymentBindings;
use crate::decoder::DecoderChain;
use crate::handlers::{IntentHandler, PaymentTransactionBuilder, StatusResolver, TransactionSubmitter};
use crate::SettlementError;
use facilitator_config::Config;
use facilitator_ledger::LedgerService;
use facilitator_pricing::PricingService;
use facilitator_storage::StorageService;
use facilitator_types::{
	BuildRequest, CreateInvoiceRequest, InvoiceResponse, SignedSubmission, StatusRecord,
	SubmissionResult, UnsignedTransactionEnvelope, VerifyPaymentResponse,
};
use std::sync::Arc;
use std::time::Duration;

/// Main settlement engine.
#[derive(Clone)]
pub struct FacilitatorEngine {
	/// Facilitator configuration.
	config: Config,
	/// Storage backing the payment bindings.
	storage: Arc<StorageService>,
	pricing: Arc<PricingService>,
	transaction_builder: Arc<PaymentTransactionBuilder>,
	submitter: Arc<TransactionSubmitter>,
	status_resolver: Arc<StatusResolver>,
	intent_handler: Arc<IntentHandler>,
}

impl FacilitatorEngine {
	/// Assembles an engine from already constructed services.
	pub fn new(
		config: Config,
		ledger: Arc<LedgerService>,
		pricing: Arc<PricingService>,
		storage: Arc<StorageService>,
	) -> Self {
		let bindings = config.binding.enabled.then(|| {
			Arc::new(PaymentBindings::new(
				storage.clone(),
				Duration::from_secs(config.binding.ttl_seconds),
			))
		});

		let transaction_builder = Arc::new(PaymentTransactionBuilder::new(
			pricing.clone(),
			ledger.clone(),
			bindings.clone(),
			&config.payment,
		));
		let submitter = Arc::new(TransactionSubmitter::new(
			ledger.clone(),
			bindings,
			DecoderChain::default(),
			config.facilitator.network,
		));
		let status_resolver = Arc::new(StatusResolver::new(ledger));
		let intent_handler = Arc::new(IntentHandler::new(
			pricing.clone(),
			config.intent.clone(),
			config.facilitator.network,
			&config.payment,
		));

		Self {
			config,
			storage,
			pricing,
			transaction_builder,
			submitter,
			status_resolver,
			intent_handler,
		}
	}

	/// Background maintenance: periodically drops expired bindings. Never
	/// returns; callers stop it by dropping the future.
	pub async fn run(&self) {
		let mut interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			interval.tick().await;
			match self.storage.cleanup_expired().await {
				Ok(0) => {},
				Ok(removed) => tracing::debug!(removed = removed, "Removed expired payment bindings"),
				Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
			}
		}
	}

	pub async fn build(
		&self,
		request: &BuildRequest,
	) -> Result<UnsignedTransactionEnvelope, SettlementError> {
		self.transaction_builder.build(request).await
	}

	pub async fn submit(
		&self,
		submission: &SignedSubmission,
	) -> Result<SubmissionResult, SettlementError> {
		self.submitter.submit(submission).await
	}

	pub async fn status(&self, signature: &str) -> Result<StatusRecord, SettlementError> {
		self.status_resolver.status(signature).await
	}

	pub fn create_invoice(
		&self,
		request: &CreateInvoiceRequest,
	) -> Result<InvoiceResponse, SettlementError> {
		self.intent_handler.create_invoice(request)
	}

	pub fn verify_payment(&self, encoded: &str) -> Result<VerifyPaymentResponse, SettlementError> {
		self.intent_handler.verify_payment(encoded)
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn pricing(&self) -> &Arc<PricingService> {
		&self.pricing
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{ledger_service, pricing_service, sign, storage_service, wallet};
	use base64::{engine::general_purpose::STANDARD, Engine as _};
	use facilitator_config::ConfigBuilder;
	use facilitator_ledger::MockLedgerInterface;
	use facilitator_types::wire::VersionedTransaction;
	use facilitator_types::{BlockReference, ConfirmationLevel, Hash, PaymentStatus, SignatureStatus};

	#[tokio::test]
	async fn test_build_submit_status_flow() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_latest_blockhash().returning(|| {
			Ok(BlockReference {
				blockhash: Hash::new_from_array([8; 32]),
				last_valid_block_height: 10,
			})
		});
		mock.expect_send_raw_transaction().returning(|bytes| {
			Ok(*VersionedTransaction::deserialize(bytes).unwrap().id().unwrap())
		});
		mock.expect_get_signature_status().returning(|_| {
			Ok(Some(SignatureStatus {
				slot: 3,
				confirmations: Some(1),
				err: None,
				confirmation_status: Some(ConfirmationLevel::Confirmed),
			}))
		});

		let engine = FacilitatorEngine::new(
			ConfigBuilder::new().build(),
			ledger_service(mock),
			pricing_service(),
			storage_service(),
		);
		let (key, payer) = wallet(50);

		let envelope = engine
			.build(&BuildRequest {
				service_id: "smart-led-array".to_string(),
				payer: payer.to_string(),
			})
			.await
			.unwrap();
		let mut tx =
			VersionedTransaction::deserialize(&STANDARD.decode(&envelope.serialized_tx).unwrap())
				.unwrap();
		sign(&mut tx, &key);

		let result = engine
			.submit(&SignedSubmission {
				signed_tx: STANDARD.encode(tx.serialize().unwrap()),
				payment_id: Some(envelope.payment_id),
			})
			.await
			.unwrap();

		let record = engine.status(&result.signature.to_string()).await.unwrap();
		assert_eq!(record.status, PaymentStatus::Confirmed);
		assert_eq!(record.slot, Some(result.slot));
	}

	#[tokio::test(start_paused = true)]
	async fn test_run_cleans_expired_bindings() {
		let storage = storage_service();
		storage
			.store_with_ttl("payments", "stale", &1u8, Some(Duration::from_secs(1)))
			.await
			.unwrap();

		let engine = FacilitatorEngine::new(
			ConfigBuilder::new().build(),
			ledger_service(MockLedgerInterface::new()),
			pricing_service(),
			storage.clone(),
		);
		let handle = tokio::spawn(async move { engine.run().await });

		tokio::time::sleep(Duration::from_secs(120)).await;
		// Already swept by the engine, so nothing is left to remove.
		assert_eq!(storage.cleanup_expired().await.unwrap(), 0);
		handle.abort();
	}
}
