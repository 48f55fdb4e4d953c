//! Native coin transfers.

use crate::{AccountMeta, Address, Instruction};

pub const ID: Address = Address::from_str_const("11111111111111111111111111111111");

const TRANSFER_TAG: u32 = 2;

/// Moves `lamports` from `from` to `to`. `from` must sign.
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
	let mut data = Vec::with_capacity(12);
	data.extend_from_slice(&TRANSFER_TAG.to_le_bytes());
	data.extend_from_slice(&lamports.to_le_bytes());
	Instruction {
		program_id: ID,
		accounts: vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
		data,
	}
}

/// Returns the lamport amount if `data` encodes a transfer.
pub fn decode_transfer(data: &[u8]) -> Option<u64> {
	if data.len() != 12 {
		return None;
	}
	let tag = u32::from_le_bytes(data.get(..4)?.try_into().ok()?);
	if tag != TRANSFER_TAG {
		return None;
	}
	Some(u64::from_le_bytes(data.get(4..)?.try_into().ok()?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transfer_layout() {
		let from = Address::new_from_array([1; 32]);
		let to = Address::new_from_array([2; 32]);
		let ix = transfer(&from, &to, 1_000_000);

		assert!(ID.is_zeroed());
		assert_eq!(ix.data, vec![2, 0, 0, 0, 0x40, 0x42, 0x0f, 0, 0, 0, 0, 0]);
		assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
		assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
		assert_eq!(decode_transfer(&ix.data), Some(1_000_000));
		assert_eq!(decode_transfer(&[3, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0]), None);
		assert_eq!(decode_transfer(&[2, 0, 0, 0]), None);
	}
}
