//! Program-derived addresses.
//!
//! A derived address is a SHA-256 digest of the seeds, the owning program and
//! a fixed marker that is guaranteed not to be a valid Ed25519 public key, so
//! no private key can ever sign for it.

use crate::Address;
use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha256};

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";
pub const MAX_SEEDS: usize = 16;
pub const MAX_SEED_LEN: usize = 32;

/// True when `bytes` decompress to a point on the Ed25519 curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
	CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Hashes `seeds` into an address owned by `program_id`. Returns `None` when
/// the seeds are out of bounds or the digest lands on the curve.
pub fn create_program_address(seeds: &[&[u8]], program_id: &Address) -> Option<Address> {
	if seeds.len() > MAX_SEEDS || seeds.iter().any(|s| s.len() > MAX_SEED_LEN) {
		return None;
	}
	let mut hasher = Sha256::new();
	for seed in seeds {
		hasher.update(seed);
	}
	hasher.update(program_id.as_ref());
	hasher.update(PDA_MARKER);
	let digest: [u8; 32] = hasher.finalize().into();
	(!is_on_curve(&digest)).then(|| Address::new_from_array(digest))
}

/// Finds the first off-curve address searching the bump seed from 255 down.
pub fn find_program_address(seeds: &[&[u8]], program_id: &Address) -> Option<(Address, u8)> {
	if seeds.len() >= MAX_SEEDS {
		return None;
	}
	for bump in (0..=u8::MAX).rev() {
		let bump_seed = [bump];
		let mut with_bump: Vec<&[u8]> = seeds.to_vec();
		with_bump.push(&bump_seed);
		if let Some(address) = create_program_address(&with_bump, program_id) {
			return Some((address, bump));
		}
	}
	None
}

#[cfg(test)]
mod tests {
	use super::*;
	use ed25519_dalek::SigningKey;

	#[test]
	fn test_real_public_key_is_on_curve() {
		let key = SigningKey::from_bytes(&[42; 32]).verifying_key().to_bytes();
		assert!(is_on_curve(&key));
	}

	#[test]
	fn test_find_program_address_uses_highest_bump() {
		let program = Address::new_from_array([7; 32]);
		let seeds: [&[u8]; 2] = [b"payment", &[1, 2, 3]];
		let (address, bump) = find_program_address(&seeds, &program).unwrap();

		assert!(!is_on_curve(&address.to_bytes()));
		let bump_seed = [bump];
		assert_eq!(
			create_program_address(&[seeds[0], seeds[1], &bump_seed], &program),
			Some(address)
		);
		for higher in (u16::from(bump) + 1)..=255 {
			let seed = [higher as u8];
			assert!(create_program_address(&[seeds[0], seeds[1], &seed], &program).is_none());
		}
		assert_eq!(find_program_address(&seeds, &program), Some((address, bump)));
	}

	#[test]
	fn test_rejects_oversized_seeds() {
		let program = Address::new_from_array([7; 32]);
		let long = [0u8; 33];
		assert!(create_program_address(&[&long], &program).is_none());
	}
}
