//! Uncompiled instructions as produced by the program helpers.

use crate::Address;

/// An account referenced by an instruction together with its access flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
	pub address: Address,
	pub is_signer: bool,
	pub is_writable: bool,
}

impl AccountMeta {
	/// A writable account.
	pub fn new(address: Address, is_signer: bool) -> Self {
		Self {
			address,
			is_signer,
			is_writable: true,
		}
	}

	/// A read-only account.
	pub fn new_readonly(address: Address, is_signer: bool) -> Self {
		Self {
			address,
			is_signer,
			is_writable: false,
		}
	}
}

/// A program invocation before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub program_id: Address,
	pub accounts: Vec<AccountMeta>,
	pub data: Vec<u8>,
}
