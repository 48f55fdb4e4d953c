//! Payment settlement domain types.
//!
//! These types describe a payment as it moves through the facilitator: the
//! priced service, the unsigned transaction handed to the payer, the binding
//! kept between build and submit, and the outcome reported afterwards.

use crate::{Address, Hash, Signature};
use serde::{Deserialize, Serialize};

/// Which asset a deployment settles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
	/// The ledger's native coin.
	Native,
	/// A fungible token identified by its mint.
	Token,
}

impl AssetKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			AssetKind::Native => "native",
			AssetKind::Token => "token",
		}
	}
}

/// Price and recipient of a service, loaded once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePriceRecord {
	pub id: String,
	/// Price in the token's smallest unit.
	pub base_amount: u64,
	/// Price in the native coin's smallest unit.
	pub native_amount: u64,
	pub recipient: Address,
	pub display_name: String,
}

impl ServicePriceRecord {
	/// The amount charged for `asset`.
	pub fn amount_for(&self, asset: AssetKind) -> u64 {
		match asset {
			AssetKind::Native => self.native_amount,
			AssetKind::Token => self.base_amount,
		}
	}

	/// Checks that the record is usable for settlement.
	pub fn validate(&self) -> Result<(), String> {
		if self.id.trim().is_empty() {
			return Err("service id must not be empty".to_string());
		}
		if self.base_amount == 0 {
			return Err(format!("service '{}' has a zero token price", self.id));
		}
		if self.native_amount == 0 {
			return Err(format!("service '{}' has a zero native price", self.id));
		}
		Ok(())
	}
}

/// Display and scale information for the asset a payment settles in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
	pub kind: AssetKind,
	/// Currency code shown to callers, e.g. "SOL" or "USDC".
	pub symbol: String,
	/// Number of decimals in one whole unit.
	pub decimals: u8,
	/// Number of decimals shown in `amount_display`.
	pub display_decimals: u8,
	/// The token mint; `None` for the native coin.
	pub mint: Option<Address>,
}

impl AssetDescriptor {
	/// The native coin: 9 decimals, shown with 4.
	pub fn native() -> Self {
		Self {
			kind: AssetKind::Native,
			symbol: "SOL".to_string(),
			decimals: 9,
			display_decimals: 4,
			mint: None,
		}
	}
}

/// Latest block hash with the last block height at which it is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReference {
	pub blockhash: Hash,
	pub last_valid_block_height: u64,
}

/// Input to the transaction builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
	pub service_id: String,
	pub payer: String,
}

/// An unsigned transaction ready for the payer's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransactionEnvelope {
	/// Base64 of the transaction with zeroed signature slots.
	pub serialized_tx: String,
	pub payment_id: String,
	pub service_id: String,
	pub amount: u64,
	pub amount_display: String,
	pub asset_kind: AssetKind,
	pub currency: String,
	pub recipient: Address,
	pub fee_payer: Address,
	pub recent_blockhash: Hash,
	pub last_valid_block_height: u64,
}

/// A transaction signed by the payer and handed back for settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSubmission {
	/// Base64 of the signed transaction bytes.
	pub signed_tx: String,
	pub payment_id: Option<String>,
}

/// What a build promised, kept until the matching submit arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentBinding {
	pub payment_id: String,
	pub service_id: String,
	pub payer: Address,
	/// Account debited: the payer itself, or the payer's token account.
	pub source: Address,
	/// Account credited: the recipient itself, or the recipient's token account.
	pub destination: Address,
	pub amount: u64,
	pub asset_kind: AssetKind,
	pub recent_blockhash: Hash,
	pub last_valid_block_height: u64,
	pub created_at: u64,
}

/// A transaction that reached the confirmed commitment level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
	pub signature: Signature,
	pub slot: u64,
	pub payment_id: Option<String>,
	pub explorer_url: String,
	pub alt_explorer_url: String,
}

/// Network assurance tier of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
	Processed,
	Confirmed,
	Finalized,
}

impl ConfirmationLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			ConfirmationLevel::Processed => "processed",
			ConfirmationLevel::Confirmed => "confirmed",
			ConfirmationLevel::Finalized => "finalized",
		}
	}
}

/// Status of a signature as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureStatus {
	pub slot: u64,
	/// Number of blocks since the signature was processed; `None` once rooted.
	pub confirmations: Option<u64>,
	/// On-chain error in the ledger's native shape.
	pub err: Option<serde_json::Value>,
	pub confirmation_status: Option<ConfirmationLevel>,
}

impl SignatureStatus {
	/// Effective level, treating a status without level or confirmations as rooted.
	pub fn level(&self) -> ConfirmationLevel {
		match (self.confirmation_status, self.confirmations) {
			(Some(level), _) => level,
			(None, None) => ConfirmationLevel::Finalized,
			(None, Some(_)) => ConfirmationLevel::Processed,
		}
	}
}

/// Account state relevant to payment construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
	pub lamports: u64,
	pub owner: Address,
	pub data: Vec<u8>,
	pub executable: bool,
}

/// Caller-facing status of a settled or pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
	NotFound,
	Confirmed,
	Failed,
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
	pub signature: Signature,
	pub status: PaymentStatus,
	pub slot: Option<u64>,
	pub confirmations: Option<u64>,
	pub confirmation_level: Option<ConfirmationLevel>,
	pub error: Option<serde_json::Value>,
}

impl StatusRecord {
	pub fn not_found(signature: Signature) -> Self {
		Self {
			signature,
			status: PaymentStatus::NotFound,
			slot: None,
			confirmations: None,
			confirmation_level: None,
			error: None,
		}
	}
}
