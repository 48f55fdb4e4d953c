//! Shared fixtures for engine tests.

use crate::binding::PaymentBindings;
use ed25519_dalek::{Signer, SigningKey};
use facilitator_ledger::{LedgerService, MockLedgerInterface};
use facilitator_pricing::implementations::r#static::StaticPricing;
use facilitator_pricing::PricingService;
use facilitator_storage::implementations::memory::MemoryStorage;
use facilitator_storage::StorageService;
use facilitator_types::wire::VersionedTransaction;
use facilitator_types::{Address, Hash, Signature};
use std::sync::Arc;
use std::time::Duration;

pub const PAYER: Address = Address::new_from_array([11; 32]);
pub const RECENT_BLOCKHASH: Hash = Hash::new_from_array([21; 32]);

pub fn pricing_service() -> Arc<PricingService> {
	let pricing = StaticPricing::new(StaticPricing::default_catalog()).unwrap();
	Arc::new(PricingService::new(Box::new(pricing)))
}

pub fn ledger_service(mock: MockLedgerInterface) -> Arc<LedgerService> {
	Arc::new(LedgerService::new(Box::new(mock), Duration::from_millis(1)))
}

pub fn storage_service() -> Arc<StorageService> {
	Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
}

pub fn bindings() -> Arc<PaymentBindings> {
	Arc::new(PaymentBindings::new(storage_service(), Duration::from_secs(900)))
}

/// A deterministic wallet key and its address.
pub fn wallet(seed: u8) -> (SigningKey, Address) {
	let key = SigningKey::from_bytes(&[seed; 32]);
	let address = Address::new_from_array(key.verifying_key().to_bytes());
	(key, address)
}

/// Fills the first signature slot with `key`'s signature over the message.
pub fn sign(tx: &mut VersionedTransaction, key: &SigningKey) {
	let message = tx.message.serialize().unwrap();
	tx.signatures[0] = Signature::new_from_array(key.sign(&message).to_bytes());
}
