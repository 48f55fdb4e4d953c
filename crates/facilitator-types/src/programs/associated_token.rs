//! Canonical token accounts derived from an owner wallet and a mint.

use super::{pda, system, token};
use crate::{AccountMeta, Address, Instruction};

pub const ID: Address = Address::from_str_const("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// How the account-creation instruction behaves when the account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
	/// Fails on-chain if the account already exists.
	#[default]
	Strict,
	/// Succeeds without changes if the account already exists.
	Idempotent,
}

/// Derives the token account holding `mint` for `owner`.
pub fn derive_address(owner: &Address, mint: &Address) -> Option<Address> {
	pda::find_program_address(&[owner.as_ref(), token::ID.as_ref(), mint.as_ref()], &ID)
		.map(|(address, _)| address)
}

/// Creates `associated`, the derived token account of `owner` for `mint`,
/// with `payer` funding the rent.
pub fn create(
	payer: &Address,
	associated: &Address,
	owner: &Address,
	mint: &Address,
	mode: CreateMode,
) -> Instruction {
	let data = match mode {
		CreateMode::Strict => vec![],
		CreateMode::Idempotent => vec![1],
	};
	Instruction {
		program_id: ID,
		accounts: vec![
			AccountMeta::new(*payer, true),
			AccountMeta::new(*associated, false),
			AccountMeta::new_readonly(*owner, false),
			AccountMeta::new_readonly(*mint, false),
			AccountMeta::new_readonly(system::ID, false),
			AccountMeta::new_readonly(token::ID, false),
		],
		data,
	}
}
