//! x402 payment intent payloads.
//!
//! An intent is a JSON document describing a payment the payer agrees to make,
//! carried base64-encoded in the `X-PAYMENT` header. The payer may attach an
//! Ed25519 signature over a canonical text rendering of the intent.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Protocol version emitted and accepted.
pub const X402_VERSION: &str = "1.0";
/// Payment type emitted and accepted.
pub const X402_PAYMENT_TYPE: &str = "solana";
/// First line of the signed intent message.
pub const INTENT_MESSAGE_HEADER: &str = "SynapsePay Payment Intent";

/// Envelope of an x402 payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
	pub version: String,
	pub payment_type: String,
	pub network: String,
	pub payload: IntentPayload,
}

/// The payment terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentPayload {
	#[serde(default)]
	pub payment_id: String,
	#[serde(default)]
	pub payer: String,
	#[serde(default)]
	pub recipient: String,
	/// Amount in the token's smallest unit, as a decimal string.
	#[serde(default)]
	pub amount: String,
	#[serde(default)]
	pub token_mint: String,
	#[serde(default)]
	pub agent_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub task_metadata: Option<serde_json::Value>,
	pub expires_at: u64,
	pub nonce: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payment_intent_signature: Option<IntentSignature>,
}

/// Detached signature attached by the payer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSignature {
	/// Base64 (or base58) Ed25519 signature bytes.
	pub signature: String,
	pub nonce: u64,
}

impl IntentPayload {
	/// The text the payer signs, one field per line.
	pub fn signing_message(&self) -> String {
		[
			INTENT_MESSAGE_HEADER.to_string(),
			format!("PaymentID: {}", self.payment_id),
			format!("Payer: {}", self.payer),
			format!("Recipient: {}", self.recipient),
			format!("Amount: {}", self.amount),
			format!("Token: {}", self.token_mint),
			format!("Agent: {}", self.agent_id),
			format!("Expires: {}", self.expires_at),
			format!("Nonce: {}", self.nonce),
		]
		.join("\n")
	}
}

impl PaymentIntent {
	/// Encodes the intent as the `X-PAYMENT` header value.
	pub fn to_header(&self) -> Result<String, serde_json::Error> {
		Ok(STANDARD.encode(serde_json::to_vec(self)?))
	}

	/// Decodes an `X-PAYMENT` header value.
	pub fn from_header(encoded: &str) -> Option<Self> {
		let bytes = STANDARD.decode(encoded.trim()).ok()?;
		serde_json::from_slice(&bytes).ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn intent() -> PaymentIntent {
		PaymentIntent {
			version: X402_VERSION.to_string(),
			payment_type: X402_PAYMENT_TYPE.to_string(),
			network: "devnet".to_string(),
			payload: IntentPayload {
				payment_id: "pay_1_abc".to_string(),
				payer: "payer".to_string(),
				recipient: "recipient".to_string(),
				amount: "50000".to_string(),
				token_mint: "mint".to_string(),
				agent_id: "pdf-summarizer-v1".to_string(),
				task_metadata: None,
				expires_at: 1_700_000_300,
				nonce: 1_700_000_000,
				payment_intent_signature: None,
			},
		}
	}

	#[test]
	fn test_signing_message_layout() {
		let message = intent().payload.signing_message();
		let lines: Vec<&str> = message.lines().collect();
		assert_eq!(lines.len(), 9);
		assert_eq!(lines[0], INTENT_MESSAGE_HEADER);
		assert_eq!(lines[1], "PaymentID: pay_1_abc");
		assert_eq!(lines[8], "Nonce: 1700000000");
	}

	#[test]
	fn test_header_uses_camel_case_json() {
		let header = intent().to_header().unwrap();
		let json = String::from_utf8(STANDARD.decode(&header).unwrap()).unwrap();
		assert!(json.contains("\"paymentType\":\"solana\""));
		assert!(json.contains("\"expiresAt\":1700000300"));
		assert!(!json.contains("paymentIntentSignature"));
		assert_eq!(PaymentIntent::from_header(&header), Some(intent()));
		assert_eq!(PaymentIntent::from_header("%%%"), None);
	}
}
