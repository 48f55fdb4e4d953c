//! Binary wire format for ledger transactions.
//!
//! Implements the compact transaction layout accepted by the ledger: a
//! compact-u16 prefixed signature list followed by either a legacy message or
//! a version-0 message carrying address table lookups.

pub mod message;
pub mod short_vec;
pub mod transaction;

pub use message::{
	CompiledInstruction, LegacyMessage, MessageAddressTableLookup, MessageHeader, V0Message,
	VersionedMessage, MESSAGE_VERSION_PREFIX,
};
pub use transaction::{SignatureCheckError, Transaction, VerifyError, VersionedTransaction};

use bytes::Buf;
use thiserror::Error;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
	/// Input ended before the named component was complete.
	#[error("unexpected end of input while reading {0}")]
	UnexpectedEof(&'static str),
	/// A compact-u16 prefix does not fit in 16 bits.
	#[error("length prefix overflows u16")]
	LengthOverflow,
	/// A compact-u16 prefix uses more bytes than necessary.
	#[error("non-canonical length prefix")]
	NonCanonicalLength,
	/// A legacy decoder encountered a versioned message prefix.
	#[error("message carries a version prefix")]
	VersionedPrefix,
	/// The message version is not supported.
	#[error("unsupported message version {0}")]
	UnsupportedVersion(u8),
	/// Bytes remained after the transaction was fully decoded.
	#[error("{0} trailing bytes after transaction")]
	TrailingBytes(usize),
	/// The decoded structure violates a consistency rule.
	#[error("malformed transaction: {0}")]
	Sanitize(String),
	/// A collection exceeds what the format can index.
	#[error("too many {0}")]
	TooMany(&'static str),
}

pub(crate) fn read_u8(buf: &mut &[u8], what: &'static str) -> Result<u8, CodecError> {
	if buf.remaining() < 1 {
		return Err(CodecError::UnexpectedEof(what));
	}
	Ok(buf.get_u8())
}

pub(crate) fn read_array<const N: usize>(
	buf: &mut &[u8],
	what: &'static str,
) -> Result<[u8; N], CodecError> {
	if buf.remaining() < N {
		return Err(CodecError::UnexpectedEof(what));
	}
	let mut out = [0u8; N];
	buf.copy_to_slice(&mut out);
	Ok(out)
}

pub(crate) fn read_bytes(
	buf: &mut &[u8],
	len: usize,
	what: &'static str,
) -> Result<Vec<u8>, CodecError> {
	if buf.remaining() < len {
		return Err(CodecError::UnexpectedEof(what));
	}
	let mut out = vec![0u8; len];
	buf.copy_to_slice(&mut out);
	Ok(out)
}
