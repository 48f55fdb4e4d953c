//! Signed transaction decoding.
//!
//! Wallets may re-encode a transaction while signing it, so the submitter
//! accepts any supported layout without the caller naming one. Decoders are
//! tried in order and the first success wins.

use facilitator_types::wire::{Transaction, VersionedTransaction};
use facilitator_types::CodecError;

/// A single wire layout the submitter understands.
pub trait TransactionDecoder: Send + Sync {
	/// Short name used in logs and error messages.
	fn name(&self) -> &'static str;

	fn decode(&self, bytes: &[u8]) -> Result<VersionedTransaction, CodecError>;
}

/// Legacy transactions. Rejects any message carrying a version prefix.
pub struct LegacyDecoder;

impl TransactionDecoder for LegacyDecoder {
	fn name(&self) -> &'static str {
		"legacy"
	}

	fn decode(&self, bytes: &[u8]) -> Result<VersionedTransaction, CodecError> {
		Transaction::deserialize(bytes).map(VersionedTransaction::from)
	}
}

/// Version-0 transactions, and legacy messages in a versioned envelope.
pub struct VersionedDecoder;

impl TransactionDecoder for VersionedDecoder {
	fn name(&self) -> &'static str {
		"versioned"
	}

	fn decode(&self, bytes: &[u8]) -> Result<VersionedTransaction, CodecError> {
		VersionedTransaction::deserialize(bytes)
	}
}

/// Ordered list of decoders.
pub struct DecoderChain {
	decoders: Vec<Box<dyn TransactionDecoder>>,
}

impl Default for DecoderChain {
	/// Legacy first, then versioned.
	fn default() -> Self {
		Self::new(vec![Box::new(LegacyDecoder), Box::new(VersionedDecoder)])
	}
}

impl DecoderChain {
	pub fn new(decoders: Vec<Box<dyn TransactionDecoder>>) -> Self {
		Self { decoders }
	}

	/// Adds a decoder tried after the existing ones.
	pub fn with(mut self, decoder: Box<dyn TransactionDecoder>) -> Self {
		self.decoders.push(decoder);
		self
	}

	/// Returns the first successful decoding with the decoder's name, or every
	/// decoder's failure joined into one message.
	pub fn decode(&self, bytes: &[u8]) -> Result<(&'static str, VersionedTransaction), String> {
		let mut failures = Vec::with_capacity(self.decoders.len());
		for decoder in &self.decoders {
			match decoder.decode(bytes) {
				Ok(tx) => return Ok((decoder.name(), tx)),
				Err(e) => {
					tracing::trace!(decoder = decoder.name(), error = %e, "Decoder rejected transaction");
					failures.push(format!("{}: {}", decoder.name(), e));
				},
			}
		}
		if failures.is_empty() {
			return Err("no decoders configured".to_string());
		}
		Err(failures.join("; "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use facilitator_types::programs::system;
	use facilitator_types::wire::{LegacyMessage, V0Message, VersionedMessage};
	use facilitator_types::{Address, Hash};

	fn legacy_message() -> LegacyMessage {
		let payer = Address::new_from_array([7; 32]);
		let recipient = Address::new_from_array([8; 32]);
		LegacyMessage::compile(
			&[system::transfer(&payer, &recipient, 1_000)],
			&payer,
			Hash::new_from_array([9; 32]),
		)
		.unwrap()
	}

	fn v0_bytes() -> Vec<u8> {
		let legacy = legacy_message();
		let tx = VersionedTransaction {
			signatures: vec![Default::default()],
			message: VersionedMessage::V0(V0Message {
				header: legacy.header,
				account_keys: legacy.account_keys,
				recent_blockhash: legacy.recent_blockhash,
				instructions: legacy.instructions,
				address_table_lookups: vec![],
			}),
		};
		tx.serialize().unwrap()
	}

	#[test]
	fn test_legacy_decoded_by_first_decoder() {
		let bytes = Transaction::new_unsigned(legacy_message()).serialize().unwrap();
		let (name, tx) = DecoderChain::default().decode(&bytes).unwrap();
		assert_eq!(name, "legacy");
		assert!(matches!(tx.message, VersionedMessage::Legacy(_)));
	}

	#[test]
	fn test_v0_falls_back_to_versioned() {
		let (name, tx) = DecoderChain::default().decode(&v0_bytes()).unwrap();
		assert_eq!(name, "versioned");
		assert!(matches!(tx.message, VersionedMessage::V0(_)));
	}

	#[test]
	fn test_garbage_reports_every_decoder() {
		let err = DecoderChain::default().decode(&[1, 2, 3]).unwrap_err();
		assert!(err.contains("legacy:"));
		assert!(err.contains("versioned:"));
	}

	#[test]
	fn test_legacy_only_chain_rejects_v0() {
		let chain = DecoderChain::new(vec![Box::new(LegacyDecoder)]);
		assert!(chain.decode(&v0_bytes()).is_err());
		let chain = chain.with(Box::new(VersionedDecoder));
		assert!(chain.decode(&v0_bytes()).is_ok());
	}
}
