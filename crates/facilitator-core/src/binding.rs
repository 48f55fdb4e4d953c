//! Payment bindings.
//!
//! A build records what the returned transaction promises: fee payer, block
//! hash and the transfer it carries. A submit naming that payment id must
//! carry the same promises or it is refused. Wallets may re-encode the
//! message or add instructions of their own, so the check compares decoded
//! content rather than bytes.

use facilitator_storage::{StorageError, StorageService};
use facilitator_types::programs::{system, token};
use facilitator_types::wire::VersionedTransaction;
use facilitator_types::{current_timestamp, Address, AssetKind, PaymentBinding, StorageKey};
use std::sync::Arc;
use std::time::Duration;

/// Storage-backed registry of outstanding bindings.
pub struct PaymentBindings {
	storage: Arc<StorageService>,
	ttl: Duration,
}

impl PaymentBindings {
	pub fn new(storage: Arc<StorageService>, ttl: Duration) -> Self {
		Self { storage, ttl }
	}

	pub async fn record(&self, binding: &PaymentBinding) -> Result<(), StorageError> {
		self.storage
			.store_with_ttl(
				StorageKey::Payments.as_str(),
				&binding.payment_id,
				binding,
				Some(self.ttl),
			)
			.await
	}

	/// The binding for `payment_id`, or `None` when unknown or expired.
	pub async fn load(&self, payment_id: &str) -> Result<Option<PaymentBinding>, StorageError> {
		match self
			.storage
			.retrieve(StorageKey::Payments.as_str(), payment_id)
			.await
		{
			Ok(binding) => Ok(Some(binding)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Takes the binding out of storage so no other submission can settle
	/// against it. `None` when unknown, expired or already claimed.
	pub async fn claim(&self, payment_id: &str) -> Result<Option<PaymentBinding>, StorageError> {
		match self
			.storage
			.take(StorageKey::Payments.as_str(), payment_id)
			.await
		{
			Ok(binding) => Ok(Some(binding)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Puts a claimed binding back for whatever is left of its lifetime.
	/// A binding whose lifetime has run out stays gone.
	pub async fn restore(&self, binding: &PaymentBinding) -> Result<(), StorageError> {
		let age = Duration::from_secs(current_timestamp().saturating_sub(binding.created_at));
		let remaining = self.ttl.saturating_sub(age);
		if remaining.is_zero() {
			return Ok(());
		}
		self.storage
			.store_with_ttl(
				StorageKey::Payments.as_str(),
				&binding.payment_id,
				binding,
				Some(remaining),
			)
			.await
	}
}

/// Checks that `tx` carries the payment described by `binding`.
///
/// Exactly one transfer through the asset's program may appear and it must
/// move the bound amount between the bound accounts.
pub fn check_binding(binding: &PaymentBinding, tx: &VersionedTransaction) -> Result<(), String> {
	let message = &tx.message;

	if message.fee_payer() != Some(&binding.payer) {
		return Err(format!(
			"fee payer differs from the payer {} bound to this payment",
			binding.payer
		));
	}
	if message.recent_blockhash() != &binding.recent_blockhash {
		return Err("block hash differs from the one issued for this payment".to_string());
	}

	let program = match binding.asset_kind {
		AssetKind::Native => system::ID,
		AssetKind::Token => token::ID,
	};

	let mut transfers = message.instructions().iter().filter_map(|ix| {
		if message.static_key(ix.program_id_index) != Some(&program) {
			return None;
		}
		let amount = match binding.asset_kind {
			AssetKind::Native => system::decode_transfer(&ix.data),
			AssetKind::Token => token::decode_transfer(&ix.data),
		}?;
		let account = |position: usize| -> Option<Address> {
			ix.accounts
				.get(position)
				.and_then(|&index| message.static_key(index))
				.copied()
		};
		Some((amount, account(0), account(1)))
	});

	let Some((amount, source, destination)) = transfers.next() else {
		return Err("transaction carries no transfer for this payment".to_string());
	};
	if transfers.next().is_some() {
		return Err("transaction carries more than one transfer".to_string());
	}

	if amount != binding.amount {
		return Err(format!(
			"transfer amount {} differs from bound amount {}",
			amount, binding.amount
		));
	}
	if source != Some(binding.source) {
		return Err("transfer source differs from the bound account".to_string());
	}
	if destination != Some(binding.destination) {
		return Err("transfer destination differs from the bound account".to_string());
	}
	Ok(())
}
