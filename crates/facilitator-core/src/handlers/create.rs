//! Transaction builder.
//!
//! Turns a priced service and a payer into an unsigned transfer transaction.
//! The asset path is fixed when the builder is constructed; the payer is
//! always the fee payer and the only required signer.

use crate::binding::PaymentBindings;
use crate::handlers::upstream;
use crate::utils::generate_payment_id;
use crate::SettlementError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use facilitator_config::PaymentConfig;
use facilitator_ledger::LedgerService;
use facilitator_pricing::PricingService;
use facilitator_types::programs::associated_token::{self, CreateMode};
use facilitator_types::programs::{system, token};
use facilitator_types::wire::{LegacyMessage, Transaction};
use facilitator_types::{
	current_timestamp, format_amount, truncate_id, Address, AssetDescriptor, AssetKind,
	BuildRequest, Instruction, PaymentBinding, UnsignedTransactionEnvelope,
};
use std::sync::Arc;
use tracing::instrument;

/// How the transfer is expressed on the ledger.
#[derive(Debug, Clone, Copy)]
enum AssetPath {
	Native,
	Token {
		mint: Address,
		create_mode: CreateMode,
	},
}

/// Instructions for one payment along with the accounts the transfer moves
/// funds between.
struct TransferPlan {
	instructions: Vec<Instruction>,
	source: Address,
	destination: Address,
}

/// Builds unsigned payment transactions.
pub struct PaymentTransactionBuilder {
	pricing: Arc<PricingService>,
	ledger: Arc<LedgerService>,
	bindings: Option<Arc<PaymentBindings>>,
	asset: AssetDescriptor,
	path: AssetPath,
}

impl PaymentTransactionBuilder {
	/// Creates a builder for the asset selected in `payment`. Bindings are
	/// recorded for every build when `bindings` is set.
	pub fn new(
		pricing: Arc<PricingService>,
		ledger: Arc<LedgerService>,
		bindings: Option<Arc<PaymentBindings>>,
		payment: &PaymentConfig,
	) -> Self {
		let path = match payment.asset_kind() {
			AssetKind::Native => AssetPath::Native,
			AssetKind::Token => AssetPath::Token {
				mint: payment.token.mint,
				create_mode: if payment.token.idempotent_account_creation {
					CreateMode::Idempotent
				} else {
					CreateMode::Strict
				},
			},
		};
		Self {
			pricing,
			ledger,
			bindings,
			asset: payment.asset_descriptor(),
			path,
		}
	}

	/// The asset this builder charges in.
	pub fn asset(&self) -> &AssetDescriptor {
		&self.asset
	}

	/// Builds an unsigned transaction paying for `request.service_id`.
	#[instrument(skip_all, fields(service_id = %request.service_id))]
	pub async fn build(
		&self,
		request: &BuildRequest,
	) -> Result<UnsignedTransactionEnvelope, SettlementError> {
		let service_id = request.service_id.trim();
		let payer = request.payer.trim();
		if service_id.is_empty() || payer.is_empty() {
			return Err(SettlementError::InvalidRequest(
				"Missing required fields: agentId, payer".to_string(),
			));
		}
		let payer: Address = payer.parse().map_err(|e| {
			SettlementError::InvalidRequest(format!("Invalid payer address: {}", e))
		})?;

		// Pricing is local; an unknown service never reaches the ledger.
		let record = self
			.pricing
			.lookup(service_id)
			.map_err(|_| SettlementError::ServiceNotFound(service_id.to_string()))?;
		let amount = record.amount_for(self.asset.kind);

		let plan = match self.path {
			AssetPath::Native => TransferPlan {
				instructions: vec![system::transfer(&payer, &record.recipient, amount)],
				source: payer,
				destination: record.recipient,
			},
			AssetPath::Token { mint, create_mode } => {
				self.token_plan(&payer, &record.recipient, &mint, create_mode, amount)
					.await?
			},
		};

		let block = self.ledger.latest_block_reference().await.map_err(upstream)?;

		let message = LegacyMessage::compile(&plan.instructions, &payer, block.blockhash)
			.map_err(|e| {
				SettlementError::InvalidRequest(format!("Failed to compile transaction: {}", e))
			})?;
		let bytes = Transaction::new_unsigned(message).serialize().map_err(|e| {
			SettlementError::InvalidRequest(format!("Failed to serialize transaction: {}", e))
		})?;

		let payment_id = generate_payment_id();
		if let Some(bindings) = &self.bindings {
			let binding = PaymentBinding {
				payment_id: payment_id.clone(),
				service_id: record.id.clone(),
				payer,
				source: plan.source,
				destination: plan.destination,
				amount,
				asset_kind: self.asset.kind,
				recent_blockhash: block.blockhash,
				last_valid_block_height: block.last_valid_block_height,
				created_at: current_timestamp(),
			};
			bindings.record(&binding).await.map_err(|e| {
				SettlementError::UpstreamUnavailable(format!(
					"Failed to record payment binding: {}",
					e
				))
			})?;
		}

		tracing::info!(
			payment_id = %payment_id,
			payer = %truncate_id(&payer.to_string()),
			amount = amount,
			asset = self.asset.kind.as_str(),
			instructions = plan.instructions.len(),
			"Built payment transaction"
		);

		Ok(UnsignedTransactionEnvelope {
			serialized_tx: STANDARD.encode(bytes),
			payment_id,
			service_id: record.id,
			amount,
			amount_display: format_amount(amount, self.asset.decimals, self.asset.display_decimals),
			asset_kind: self.asset.kind,
			currency: self.asset.symbol.clone(),
			recipient: record.recipient,
			fee_payer: payer,
			recent_blockhash: block.blockhash,
			last_valid_block_height: block.last_valid_block_height,
		})
	}

	/// Token transfer between the derived token accounts, preceded by the
	/// recipient account's creation when it does not exist yet.
	async fn token_plan(
		&self,
		payer: &Address,
		recipient: &Address,
		mint: &Address,
		create_mode: CreateMode,
		amount: u64,
	) -> Result<TransferPlan, SettlementError> {
		let derive = |owner: &Address| {
			associated_token::derive_address(owner, mint).ok_or_else(|| {
				SettlementError::InvalidRequest(format!("Cannot derive token account for {}", owner))
			})
		};
		let source = derive(payer)?;
		let destination = derive(recipient)?;

		let mut instructions = Vec::with_capacity(2);
		if self
			.ledger
			.get_account_info(&destination)
			.await
			.map_err(upstream)?
			.is_none()
		{
			tracing::debug!(
				account = %destination,
				"Recipient token account missing, adding creation"
			);
			instructions.push(associated_token::create(
				payer,
				&destination,
				recipient,
				mint,
				create_mode,
			));
		}
		instructions.push(token::transfer(&source, &destination, payer, amount));

		Ok(TransferPlan {
			instructions,
			source,
			destination,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{bindings, ledger_service, pricing_service, PAYER, RECENT_BLOCKHASH};
	use facilitator_config::ConfigBuilder;
	use facilitator_ledger::{LedgerError, MockLedgerInterface};
	use facilitator_types::wire::VersionedTransaction;
	use facilitator_types::{AccountInfo, BlockReference};

	fn request(service_id: &str) -> BuildRequest {
		BuildRequest {
			service_id: service_id.to_string(),
			payer: PAYER.to_string(),
		}
	}

	fn builder(mock: MockLedgerInterface, use_native: bool) -> PaymentTransactionBuilder {
		let config = ConfigBuilder::new().use_native(use_native).build();
		PaymentTransactionBuilder::new(
			pricing_service(),
			ledger_service(mock),
			None,
			&config.payment,
		)
	}

	fn with_blockhash(mock: &mut MockLedgerInterface) {
		mock.expect_get_latest_blockhash().returning(|| {
			Ok(BlockReference {
				blockhash: RECENT_BLOCKHASH,
				last_valid_block_height: 1_000,
			})
		});
	}

	fn decode(envelope: &UnsignedTransactionEnvelope) -> VersionedTransaction {
		let bytes = STANDARD.decode(&envelope.serialized_tx).unwrap();
		Transaction::deserialize(&bytes).unwrap().into()
	}

	#[tokio::test]
	async fn test_native_single_transfer() {
		let mut mock = MockLedgerInterface::new();
		with_blockhash(&mut mock);
		mock.expect_get_account_info().never();

		let envelope = builder(mock, true)
			.build(&request("pdf-summarizer-v1"))
			.await
			.unwrap();

		assert_eq!(envelope.amount, 1_000_000);
		assert_eq!(envelope.amount_display, "0.0010");
		assert_eq!(envelope.currency, "SOL");
		assert_eq!(envelope.asset_kind, AssetKind::Native);
		assert_eq!(envelope.last_valid_block_height, 1_000);

		let tx = decode(&envelope);
		assert_eq!(tx.message.instructions().len(), 1);
		assert_eq!(tx.message.fee_payer(), Some(&PAYER));
		assert_eq!(tx.message.recent_blockhash(), &RECENT_BLOCKHASH);
		assert_eq!(tx.signatures.len(), 1);
		assert!(tx.signatures[0].is_zeroed());
		assert_eq!(
			system::decode_transfer(&tx.message.instructions()[0].data),
			Some(1_000_000)
		);
	}

	#[tokio::test]
	async fn test_token_display_matches_decimals() {
		for service in pricing_service().services() {
			let mut mock = MockLedgerInterface::new();
			with_blockhash(&mut mock);
			mock.expect_get_account_info().returning(|_| {
				Ok(Some(AccountInfo {
					lamports: 2_039_280,
					owner: token::ID,
					data: vec![0; 165],
					executable: false,
				}))
			});

			let envelope = builder(mock, false)
				.build(&request(&service.id))
				.await
				.unwrap();

			assert_eq!(envelope.amount, service.base_amount);
			assert_eq!(envelope.currency, "USDC");
			assert_eq!(
				envelope.amount_display,
				format_amount(service.base_amount, 6, 2)
			);
			assert_eq!(envelope.fee_payer, PAYER);
			assert_ne!(envelope.fee_payer, envelope.recipient);
			// Recipient account exists, so only the transfer is present.
			assert_eq!(decode(&envelope).message.instructions().len(), 1);
		}
	}

	#[tokio::test]
	async fn test_missing_recipient_account_created_first() {
		let mut mock = MockLedgerInterface::new();
		with_blockhash(&mut mock);
		mock.expect_get_account_info().returning(|_| Ok(None));

		let envelope = builder(mock, false)
			.build(&request("pdf-summarizer-v1"))
			.await
			.unwrap();
		assert_eq!(envelope.amount_display, "0.05");

		let tx = decode(&envelope);
		let programs: Vec<_> = tx
			.message
			.instructions()
			.iter()
			.map(|ix| *tx.message.static_key(ix.program_id_index).unwrap())
			.collect();
		assert_eq!(programs, vec![associated_token::ID, token::ID]);
		assert!(tx.message.instructions()[0].data.is_empty());
		assert_eq!(tx.message.fee_payer(), Some(&PAYER));
	}

	#[tokio::test]
	async fn test_idempotent_creation_mode() {
		let mut mock = MockLedgerInterface::new();
		with_blockhash(&mut mock);
		mock.expect_get_account_info().returning(|_| Ok(None));

		let config = ConfigBuilder::new()
			.use_native(false)
			.idempotent_account_creation(true)
			.build();
		let builder = PaymentTransactionBuilder::new(
			pricing_service(),
			ledger_service(mock),
			None,
			&config.payment,
		);

		let envelope = builder.build(&request("pdf-summarizer-v1")).await.unwrap();
		assert_eq!(decode(&envelope).message.instructions()[0].data, vec![1]);
	}

	#[tokio::test]
	async fn test_unknown_service_skips_ledger() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_latest_blockhash().never();
		mock.expect_get_account_info().never();

		let result = builder(mock, false)
			.build(&request("nonexistent-service"))
			.await;
		assert!(matches!(result, Err(SettlementError::ServiceNotFound(id)) if id == "nonexistent-service"));
	}

	#[tokio::test]
	async fn test_invalid_input_rejected() {
		let builder = builder(MockLedgerInterface::new(), true);

		let missing = BuildRequest {
			service_id: "pdf-summarizer-v1".to_string(),
			payer: " ".to_string(),
		};
		assert!(matches!(
			builder.build(&missing).await,
			Err(SettlementError::InvalidRequest(_))
		));

		let malformed = BuildRequest {
			service_id: "pdf-summarizer-v1".to_string(),
			payer: "not-an-address".to_string(),
		};
		assert!(matches!(
			builder.build(&malformed).await,
			Err(SettlementError::InvalidRequest(_))
		));
	}

	#[tokio::test]
	async fn test_blockhash_failure_is_upstream() {
		let mut mock = MockLedgerInterface::new();
		mock.expect_get_latest_blockhash()
			.returning(|| Err(LedgerError::Network("connection refused".into())));

		let result = builder(mock, true).build(&request("pdf-summarizer-v1")).await;
		assert!(matches!(result, Err(SettlementError::UpstreamUnavailable(_))));
	}

	#[tokio::test]
	async fn test_build_records_binding() {
		let mut mock = MockLedgerInterface::new();
		with_blockhash(&mut mock);
		let config = ConfigBuilder::new().build();
		let bindings = bindings();
		let builder = PaymentTransactionBuilder::new(
			pricing_service(),
			ledger_service(mock),
			Some(bindings.clone()),
			&config.payment,
		);

		let envelope = builder.build(&request("ugv-rover-01")).await.unwrap();
		let binding = bindings.load(&envelope.payment_id).await.unwrap().unwrap();

		assert_eq!(binding.payer, PAYER);
		assert_eq!(binding.destination, envelope.recipient);
		assert_eq!(binding.amount, envelope.amount);
		assert_eq!(binding.recent_blockhash, RECENT_BLOCKHASH);
		assert_eq!(binding.last_valid_block_height, 1_000);
	}
}
