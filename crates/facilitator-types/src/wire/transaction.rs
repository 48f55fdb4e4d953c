//! Signed transaction envelopes.

use super::{read_array, short_vec, CodecError, LegacyMessage, VersionedMessage};
use crate::{Address, Signature};
use bytes::BufMut;
use ed25519_dalek::{Signature as Ed25519Signature, Verifier, VerifyingKey};

/// Why a transaction's signatures are not acceptable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureCheckError {
	/// A required signature slot is still zeroed.
	#[error("missing signature for {0}")]
	Missing(Address),
	/// A signature does not verify against its signer key.
	#[error("invalid signature for {0}")]
	Invalid(Address),
}

fn decode_signatures(buf: &mut &[u8]) -> Result<Vec<Signature>, CodecError> {
	let count = short_vec::decode_len(buf)?;
	let mut signatures = Vec::with_capacity(count.min(16));
	for _ in 0..count {
		signatures.push(Signature::new_from_array(read_array(buf, "signature")?));
	}
	Ok(signatures)
}

fn encode_signatures(signatures: &[Signature], out: &mut Vec<u8>) -> Result<(), CodecError> {
	short_vec::encode_len(signatures.len(), out)?;
	for signature in signatures {
		out.put_slice(signature.as_ref());
	}
	Ok(())
}

fn check_signature_count(signatures: &[Signature], required: u8) -> Result<(), CodecError> {
	if signatures.len() != usize::from(required) {
		return Err(CodecError::Sanitize(format!(
			"{} signatures for {} required signers",
			signatures.len(),
			required
		)));
	}
	Ok(())
}

/// A transaction carrying a legacy message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
	pub signatures: Vec<Signature>,
	pub message: LegacyMessage,
}

impl Transaction {
	/// Wraps a message with one zeroed signature slot per required signer.
	pub fn new_unsigned(message: LegacyMessage) -> Self {
		let slots = usize::from(message.header.num_required_signatures);
		Self {
			signatures: vec![Signature::default(); slots],
			message,
		}
	}

	pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		encode_signatures(&self.signatures, &mut out)?;
		self.message.encode(&mut out)?;
		Ok(out)
	}

	/// Decodes a complete legacy transaction. Versioned messages are rejected.
	pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
		let mut buf = bytes;
		let signatures = decode_signatures(&mut buf)?;
		let message = LegacyMessage::decode(&mut buf)?;
		if !buf.is_empty() {
			return Err(CodecError::TrailingBytes(buf.len()));
		}
		check_signature_count(&signatures, message.header.num_required_signatures)?;
		message.sanitize()?;
		Ok(Self {
			signatures,
			message,
		})
	}
}

/// A transaction carrying either message layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTransaction {
	pub signatures: Vec<Signature>,
	pub message: VersionedMessage,
}

impl VersionedTransaction {
	pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		encode_signatures(&self.signatures, &mut out)?;
		self.message.encode(&mut out)?;
		Ok(out)
	}

	/// Decodes a complete transaction of either layout.
	pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
		let mut buf = bytes;
		let signatures = decode_signatures(&mut buf)?;
		let message = VersionedMessage::decode(&mut buf)?;
		if !buf.is_empty() {
			return Err(CodecError::TrailingBytes(buf.len()));
		}
		check_signature_count(&signatures, message.header().num_required_signatures)?;
		message.sanitize()?;
		Ok(Self {
			signatures,
			message,
		})
	}

	/// The first signature, which identifies the transaction on the ledger.
	pub fn id(&self) -> Option<&Signature> {
		self.signatures.first()
	}

	/// Verifies every required signature over the serialized message.
	pub fn verify_signatures(&self) -> Result<(), VerifyError> {
		let message = self.message.serialize()?;
		let signers = self.message.static_account_keys();
		for (signature, signer) in self.signatures.iter().zip(signers) {
			if signature.is_zeroed() {
				return Err(SignatureCheckError::Missing(*signer).into());
			}
			let key = VerifyingKey::from_bytes(&signer.to_bytes())
				.map_err(|_| SignatureCheckError::Invalid(*signer))?;
			let sig = Ed25519Signature::from_bytes(&signature.to_bytes());
			key.verify(&message, &sig)
				.map_err(|_| SignatureCheckError::Invalid(*signer))?;
		}
		Ok(())
	}
}

/// Failure from [`VersionedTransaction::verify_signatures`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
	#[error(transparent)]
	Codec(#[from] CodecError),
	#[error(transparent)]
	Signature(#[from] SignatureCheckError),
}

impl From<Transaction> for VersionedTransaction {
	fn from(tx: Transaction) -> Self {
		Self {
			signatures: tx.signatures,
			message: VersionedMessage::Legacy(tx.message),
		}
	}
}
