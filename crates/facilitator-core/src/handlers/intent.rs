//! x402 payment intents.
//!
//! Invoices carry a base64 JSON intent meant for the `X-PAYMENT` header.
//! Verification decodes such a header and checks it field by field, and
//! checks the payer's Ed25519 signature over the canonical intent message
//! when one is attached.

use crate::utils::generate_payment_id;
use crate::SettlementError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};
use facilitator_config::{IntentConfig, PaymentConfig};
use facilitator_pricing::PricingService;
use facilitator_types::intent::{X402_PAYMENT_TYPE, X402_VERSION};
use facilitator_types::{
	current_timestamp, format_amount, truncate_id, Address, AssetDescriptor, Cluster,
	CreateInvoiceRequest, IntentPayload, InvoiceResponse, PaymentIntent, VerifyPaymentResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// Issues and verifies x402 payment intents.
pub struct IntentHandler {
	pricing: Arc<PricingService>,
	config: IntentConfig,
	network: Cluster,
	token: AssetDescriptor,
	token_mint: Address,
}

impl IntentHandler {
	pub fn new(
		pricing: Arc<PricingService>,
		config: IntentConfig,
		network: Cluster,
		payment: &PaymentConfig,
	) -> Self {
		Self {
			pricing,
			config,
			network,
			token: payment.token_descriptor(),
			token_mint: payment.token.mint,
		}
	}

	/// Issues an invoice priced in the token.
	///
	/// An explicit `amount` overrides the catalog price and allows services
	/// outside the catalog when a default recipient is configured.
	#[instrument(skip_all, fields(agent_id = ?request.agent_id))]
	pub fn create_invoice(
		&self,
		request: &CreateInvoiceRequest,
	) -> Result<InvoiceResponse, SettlementError> {
		let agent_id = required(request.agent_id.as_deref(), "agentId")?;
		let payer = required(request.payer.as_deref(), "payer")?;
		let payer: Address = payer.parse().map_err(|e| {
			SettlementError::InvalidRequest(format!("Invalid payer address: {}", e))
		})?;

		let amount_override = match request.amount.as_deref().map(str::trim) {
			None | Some("") => None,
			Some(raw) => match raw.parse::<u64>() {
				Ok(amount) if amount > 0 => Some(amount),
				_ => {
					return Err(SettlementError::InvalidRequest(format!(
						"Invalid amount: {}",
						raw
					)))
				},
			},
		};

		let (amount, recipient) = match (self.pricing.lookup(agent_id), amount_override) {
			(Ok(record), amount) => (amount.unwrap_or(record.base_amount), record.recipient),
			(Err(_), Some(amount)) => match self.config.default_recipient {
				Some(recipient) => (amount, recipient),
				None => return Err(SettlementError::ServiceNotFound(agent_id.to_string())),
			},
			(Err(_), None) => return Err(SettlementError::ServiceNotFound(agent_id.to_string())),
		};

		let payment_id = generate_payment_id();
		let now = current_timestamp();
		let intent = PaymentIntent {
			version: X402_VERSION.to_string(),
			payment_type: X402_PAYMENT_TYPE.to_string(),
			network: self.network.as_str().to_string(),
			payload: IntentPayload {
				payment_id: payment_id.clone(),
				payer: payer.to_string(),
				recipient: recipient.to_string(),
				amount: amount.to_string(),
				token_mint: self.token_mint.to_string(),
				agent_id: agent_id.to_string(),
				task_metadata: request.task_metadata.clone(),
				expires_at: now + self.config.expiry_seconds,
				nonce: now,
				payment_intent_signature: None,
			},
		};
		let header = intent.to_header().map_err(|e| {
			SettlementError::InvalidRequest(format!("Failed to encode payment intent: {}", e))
		})?;

		tracing::info!(
			payment_id = %payment_id,
			payer = %truncate_id(&intent.payload.payer),
			amount = amount,
			"Issued invoice"
		);

		Ok(InvoiceResponse {
			invoice_id: payment_id,
			agent_id: agent_id.to_string(),
			amount: amount.to_string(),
			amount_display: format_amount(amount, self.token.decimals, self.token.display_decimals),
			currency: self.token.symbol.clone(),
			payer: intent.payload.payer.clone(),
			recipient: intent.payload.recipient.clone(),
			network: intent.network.clone(),
			expires_at: intent.payload.expires_at,
			created_at: now,
			payment_payload: intent,
			x_payment_header: header,
		})
	}

	/// Verifies an encoded `X-PAYMENT` header.
	pub fn verify_payment(&self, encoded: &str) -> Result<VerifyPaymentResponse, SettlementError> {
		let reject = |reason: String| {
			tracing::debug!(reason = %reason, "Rejected payment intent");
			SettlementError::IntentRejected(reason)
		};

		let intent = PaymentIntent::from_header(encoded)
			.ok_or_else(|| reject("Invalid payload format".to_string()))?;
		if intent.version != X402_VERSION {
			return Err(reject(format!("Invalid version: {}", intent.version)));
		}
		if intent.payment_type != X402_PAYMENT_TYPE {
			return Err(reject(format!("Invalid payment type: {}", intent.payment_type)));
		}

		let payload = &intent.payload;
		if payload.expires_at < current_timestamp() {
			return Err(reject("Payment expired".to_string()));
		}
		match &payload.payment_intent_signature {
			Some(_) if !verify_intent_signature(payload) => {
				return Err(reject("Invalid signature".to_string()))
			},
			None if self.config.require_signature => {
				return Err(reject("Missing payment intent signature".to_string()))
			},
			_ => {},
		}

		if payload.payment_id.is_empty() {
			return Err(reject("Missing paymentId".to_string()));
		}
		if payload.payer.is_empty() {
			return Err(reject("Missing payer".to_string()));
		}
		if payload.recipient.is_empty() {
			return Err(reject("Missing recipient".to_string()));
		}
		if !payload.amount.parse::<u64>().is_ok_and(|amount| amount > 0) {
			return Err(reject("Invalid amount".to_string()));
		}

		Ok(VerifyPaymentResponse {
			valid: true,
			payment_id: Some(payload.payment_id.clone()),
			payer: Some(payload.payer.clone()),
			recipient: Some(payload.recipient.clone()),
			amount: Some(payload.amount.clone()),
			agent_id: Some(payload.agent_id.clone()),
			error: None,
		})
	}
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, SettlementError> {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.ok_or_else(|| SettlementError::InvalidRequest(format!("Missing required field: {}", field)))
}

/// Checks the attached signature against the payer key. Signatures are
/// accepted as base64 or, failing that, base58.
fn verify_intent_signature(payload: &IntentPayload) -> bool {
	let Some(attached) = &payload.payment_intent_signature else {
		return false;
	};
	if attached.nonce != payload.nonce {
		return false;
	}
	let Ok(payer) = payload.payer.parse::<Address>() else {
		return false;
	};
	let Ok(key) = VerifyingKey::from_bytes(&payer.to_bytes()) else {
		return false;
	};
	// A base58 string can also be valid base64, so the length decides.
	let signature = [
		STANDARD.decode(&attached.signature).ok(),
		bs58::decode(&attached.signature).into_vec().ok(),
	]
	.into_iter()
	.flatten()
	.find_map(|bytes| Ed25519Signature::from_slice(&bytes).ok());
	signature.is_some_and(|signature| {
		key.verify(payload.signing_message().as_bytes(), &signature)
			.is_ok()
	})
}
