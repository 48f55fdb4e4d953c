//! Base58-encoded ledger primitives.
//!
//! Account addresses, block hashes and transaction signatures all travel as
//! base58 strings on the wire and in the HTTP API, while the transaction codec
//! works on their raw fixed-size byte form. The newtypes here bridge the two.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an account address in bytes.
pub const ADDRESS_BYTES: usize = 32;
/// Length of a block hash in bytes.
pub const HASH_BYTES: usize = 32;
/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_BYTES: usize = 64;

/// Errors produced when parsing a base58 primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
	/// The input string was empty.
	#[error("empty value")]
	Empty,
	/// The input string is longer than any valid encoding of the type.
	#[error("value too long: {0} characters")]
	TooLong(usize),
	/// The input is not valid base58.
	#[error("invalid base58: {0}")]
	Base58(String),
	/// The decoded bytes have the wrong length.
	#[error("expected {expected} bytes, got {actual}")]
	Length { expected: usize, actual: usize },
}

fn decode_base58<const N: usize>(s: &str, max_chars: usize) -> Result<[u8; N], ParseError> {
	if s.is_empty() {
		return Err(ParseError::Empty);
	}
	if s.len() > max_chars {
		return Err(ParseError::TooLong(s.len()));
	}
	let bytes = bs58::decode(s)
		.into_vec()
		.map_err(|e| ParseError::Base58(e.to_string()))?;
	<[u8; N]>::try_from(bytes.as_slice()).map_err(|_| ParseError::Length {
		expected: N,
		actual: bytes.len(),
	})
}

macro_rules! base58_newtype {
	($(#[$meta:meta])* $name:ident, $len:expr, $max_chars:expr) => {
		$(#[$meta])*
		#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
		pub struct $name([u8; $len]);

		impl $name {
			/// Wraps raw bytes.
			pub const fn new_from_array(bytes: [u8; $len]) -> Self {
				Self(bytes)
			}

			/// Returns the raw bytes.
			pub const fn to_bytes(&self) -> [u8; $len] {
				self.0
			}

			/// Returns true when every byte is zero.
			pub fn is_zeroed(&self) -> bool {
				self.0.iter().all(|b| *b == 0)
			}
		}

		impl Default for $name {
			fn default() -> Self {
				Self([0u8; $len])
			}
		}

		impl AsRef<[u8]> for $name {
			fn as_ref(&self) -> &[u8] {
				&self.0
			}
		}

		impl From<[u8; $len]> for $name {
			fn from(bytes: [u8; $len]) -> Self {
				Self(bytes)
			}
		}

		impl TryFrom<&[u8]> for $name {
			type Error = ParseError;

			fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
				<[u8; $len]>::try_from(bytes)
					.map(Self)
					.map_err(|_| ParseError::Length {
						expected: $len,
						actual: bytes.len(),
					})
			}
		}

		impl FromStr for $name {
			type Err = ParseError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				decode_base58::<$len>(s, $max_chars).map(Self)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&bs58::encode(self.0).into_string())
			}
		}

		impl fmt::Debug for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}({})", stringify!($name), self)
			}
		}

		impl Serialize for $name {
			fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
				serializer.collect_str(self)
			}
		}

		impl<'de> Deserialize<'de> for $name {
			fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
				let s = String::deserialize(deserializer)?;
				s.parse().map_err(serde::de::Error::custom)
			}
		}
	};
}

base58_newtype!(
	/// A 32-byte account address (public key or program-derived address).
	Address,
	ADDRESS_BYTES,
	44
);

base58_newtype!(
	/// A 32-byte recent block hash referenced by a transaction message.
	Hash,
	HASH_BYTES,
	44
);

base58_newtype!(
	/// A 64-byte Ed25519 transaction signature. The first signature of a
	/// transaction doubles as its identifier.
	Signature,
	SIGNATURE_BYTES,
	88
);

impl Address {
	/// Decodes a base58 address at compile time.
	///
	/// Panics (a compile error in const context) on malformed input.
	pub const fn from_str_const(s: &str) -> Self {
		Self(bs58::decode(s.as_bytes()).into_array_const_unwrap::<ADDRESS_BYTES>())
	}
}
