//! Compact-u16 length prefixes.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last. At most three bytes, value at most 0xffff.

use super::{read_u8, CodecError};
use bytes::BufMut;

/// Appends the compact encoding of `len`.
pub fn encode_len(len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
	let mut rem = u16::try_from(len).map_err(|_| CodecError::LengthOverflow)?;
	loop {
		let mut byte = (rem & 0x7f) as u8;
		rem >>= 7;
		if rem == 0 {
			out.put_u8(byte);
			return Ok(());
		}
		byte |= 0x80;
		out.put_u8(byte);
	}
}

/// Reads a compact length prefix, advancing `buf`.
pub fn decode_len(buf: &mut &[u8]) -> Result<usize, CodecError> {
	let mut value: u32 = 0;
	for i in 0..3 {
		let byte = read_u8(buf, "length prefix")?;
		if i > 0 && byte == 0 {
			return Err(CodecError::NonCanonicalLength);
		}
		value |= u32::from(byte & 0x7f) << (7 * i);
		if byte & 0x80 == 0 {
			if value > u32::from(u16::MAX) {
				return Err(CodecError::LengthOverflow);
			}
			return Ok(value as usize);
		}
		if i == 2 {
			return Err(CodecError::LengthOverflow);
		}
	}
	Err(CodecError::LengthOverflow)
}
