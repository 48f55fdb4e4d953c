//! Fungible token transfers between token accounts.

use crate::{AccountMeta, Address, Instruction};

pub const ID: Address = Address::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

const TRANSFER_TAG: u8 = 3;

/// Moves `amount` base units from `source` to `destination`, authorised by `owner`.
pub fn transfer(source: &Address, destination: &Address, owner: &Address, amount: u64) -> Instruction {
	let mut data = Vec::with_capacity(9);
	data.push(TRANSFER_TAG);
	data.extend_from_slice(&amount.to_le_bytes());
	Instruction {
		program_id: ID,
		accounts: vec![
			AccountMeta::new(*source, false),
			AccountMeta::new(*destination, false),
			AccountMeta::new_readonly(*owner, true),
		],
		data,
	}
}

/// Returns the amount if `data` encodes a plain transfer.
pub fn decode_transfer(data: &[u8]) -> Option<u64> {
	match data {
		[TRANSFER_TAG, rest @ ..] if rest.len() == 8 => rest.try_into().ok().map(u64::from_le_bytes),
		_ => None,
	}
}
