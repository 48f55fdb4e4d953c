//! Legacy and version-0 transaction messages.

use super::{read_array, read_bytes, read_u8, short_vec, CodecError};
use crate::{AccountMeta, Address, Hash, Instruction};
use bytes::{Buf, BufMut};

/// High bit marking a versioned message; the low seven bits carry the version.
pub const MESSAGE_VERSION_PREFIX: u8 = 0x80;

/// Counts describing which static keys sign and which are read-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
	pub num_required_signatures: u8,
	pub num_readonly_signed_accounts: u8,
	pub num_readonly_unsigned_accounts: u8,
}

/// An instruction whose program and accounts are indexes into the message keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledInstruction {
	pub program_id_index: u8,
	pub accounts: Vec<u8>,
	pub data: Vec<u8>,
}

/// Reference to extra account keys stored in an on-ledger lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAddressTableLookup {
	pub account_key: Address,
	pub writable_indexes: Vec<u8>,
	pub readonly_indexes: Vec<u8>,
}

/// The original message layout without a version prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMessage {
	pub header: MessageHeader,
	pub account_keys: Vec<Address>,
	pub recent_blockhash: Hash,
	pub instructions: Vec<CompiledInstruction>,
}

/// Version-0 message: the legacy body plus address table lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct V0Message {
	pub header: MessageHeader,
	pub account_keys: Vec<Address>,
	pub recent_blockhash: Hash,
	pub instructions: Vec<CompiledInstruction>,
	pub address_table_lookups: Vec<MessageAddressTableLookup>,
}

/// Either message layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedMessage {
	Legacy(LegacyMessage),
	V0(V0Message),
}

fn encode_body(
	header: &MessageHeader,
	account_keys: &[Address],
	recent_blockhash: &Hash,
	instructions: &[CompiledInstruction],
	out: &mut Vec<u8>,
) -> Result<(), CodecError> {
	out.put_u8(header.num_required_signatures);
	out.put_u8(header.num_readonly_signed_accounts);
	out.put_u8(header.num_readonly_unsigned_accounts);

	short_vec::encode_len(account_keys.len(), out)?;
	for key in account_keys {
		out.put_slice(key.as_ref());
	}
	out.put_slice(recent_blockhash.as_ref());

	short_vec::encode_len(instructions.len(), out)?;
	for ix in instructions {
		out.put_u8(ix.program_id_index);
		short_vec::encode_len(ix.accounts.len(), out)?;
		out.put_slice(&ix.accounts);
		short_vec::encode_len(ix.data.len(), out)?;
		out.put_slice(&ix.data);
	}
	Ok(())
}

type Body = (MessageHeader, Vec<Address>, Hash, Vec<CompiledInstruction>);

fn decode_body(buf: &mut &[u8]) -> Result<Body, CodecError> {
	let header = MessageHeader {
		num_required_signatures: read_u8(buf, "message header")?,
		num_readonly_signed_accounts: read_u8(buf, "message header")?,
		num_readonly_unsigned_accounts: read_u8(buf, "message header")?,
	};

	let key_count = short_vec::decode_len(buf)?;
	let mut account_keys = Vec::with_capacity(key_count.min(256));
	for _ in 0..key_count {
		account_keys.push(Address::new_from_array(read_array(buf, "account key")?));
	}
	let recent_blockhash = Hash::new_from_array(read_array(buf, "recent blockhash")?);

	let ix_count = short_vec::decode_len(buf)?;
	let mut instructions = Vec::with_capacity(ix_count.min(64));
	for _ in 0..ix_count {
		let program_id_index = read_u8(buf, "program index")?;
		let account_len = short_vec::decode_len(buf)?;
		let accounts = read_bytes(buf, account_len, "instruction accounts")?;
		let data_len = short_vec::decode_len(buf)?;
		let data = read_bytes(buf, data_len, "instruction data")?;
		instructions.push(CompiledInstruction {
			program_id_index,
			accounts,
			data,
		});
	}
	Ok((header, account_keys, recent_blockhash, instructions))
}

fn sanitize_body(
	header: &MessageHeader,
	static_keys: usize,
	total_keys: usize,
	instructions: &[CompiledInstruction],
) -> Result<(), CodecError> {
	let required = usize::from(header.num_required_signatures);
	if required == 0 {
		return Err(CodecError::Sanitize("message has no fee payer".into()));
	}
	if header.num_readonly_signed_accounts >= header.num_required_signatures {
		return Err(CodecError::Sanitize("fee payer must be writable".into()));
	}
	if required + usize::from(header.num_readonly_unsigned_accounts) > static_keys {
		return Err(CodecError::Sanitize(
			"header counts exceed account key list".into(),
		));
	}
	if total_keys > 256 {
		return Err(CodecError::TooMany("account keys"));
	}
	for ix in instructions {
		let program = usize::from(ix.program_id_index);
		if program == 0 || program >= static_keys {
			return Err(CodecError::Sanitize(format!(
				"program index {} out of range",
				program
			)));
		}
		if let Some(bad) = ix.accounts.iter().find(|i| usize::from(**i) >= total_keys) {
			return Err(CodecError::Sanitize(format!(
				"account index {} out of range",
				bad
			)));
		}
	}
	Ok(())
}

fn header_is_signer(header: &MessageHeader, index: usize) -> bool {
	index < usize::from(header.num_required_signatures)
}

fn header_is_writable(header: &MessageHeader, static_keys: usize, index: usize) -> bool {
	let signers = usize::from(header.num_required_signatures);
	if index < signers {
		index < signers - usize::from(header.num_readonly_signed_accounts)
	} else if index < static_keys {
		index < static_keys - usize::from(header.num_readonly_unsigned_accounts)
	} else {
		false
	}
}

impl LegacyMessage {
	/// Compiles instructions into a message paid for by `payer`.
	///
	/// The fee payer takes index 0. The remaining keys are ordered writable
	/// signers, readonly signers, writable non-signers, then readonly
	/// non-signers, each group in first-seen order. Repeated keys are merged
	/// with the union of their flags.
	pub fn compile(
		instructions: &[Instruction],
		payer: &Address,
		recent_blockhash: Hash,
	) -> Result<Self, CodecError> {
		let mut metas = vec![AccountMeta::new(*payer, true)];
		for ix in instructions {
			let program = AccountMeta::new_readonly(ix.program_id, false);
			for meta in ix.accounts.iter().chain(std::iter::once(&program)) {
				match metas.iter_mut().find(|m| m.address == meta.address) {
					Some(existing) => {
						existing.is_signer |= meta.is_signer;
						existing.is_writable |= meta.is_writable;
					},
					None => metas.push(meta.clone()),
				}
			}
		}
		// The payer is always a writable signer regardless of later metas.
		metas[0].is_signer = true;
		metas[0].is_writable = true;

		let class = |m: &AccountMeta| match (m.is_signer, m.is_writable) {
			(true, true) => 0,
			(true, false) => 1,
			(false, true) => 2,
			(false, false) => 3,
		};
		metas[1..].sort_by_key(class);

		if metas.len() > 256 {
			return Err(CodecError::TooMany("account keys"));
		}

		let count = |signer: bool, writable: bool| {
			metas
				.iter()
				.filter(|m| m.is_signer == signer && m.is_writable == writable)
				.count() as u8
		};
		let header = MessageHeader {
			num_required_signatures: metas.iter().filter(|m| m.is_signer).count() as u8,
			num_readonly_signed_accounts: count(true, false),
			num_readonly_unsigned_accounts: count(false, false),
		};
		let account_keys: Vec<Address> = metas.iter().map(|m| m.address).collect();
		let index_of = |address: &Address| -> u8 {
			account_keys
				.iter()
				.position(|k| k == address)
				.map(|i| i as u8)
				.unwrap_or_default()
		};

		let compiled = instructions
			.iter()
			.map(|ix| CompiledInstruction {
				program_id_index: index_of(&ix.program_id),
				accounts: ix.accounts.iter().map(|m| index_of(&m.address)).collect(),
				data: ix.data.clone(),
			})
			.collect();

		Ok(Self {
			header,
			account_keys,
			recent_blockhash,
			instructions: compiled,
		})
	}

	/// Appends the wire encoding.
	pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
		encode_body(
			&self.header,
			&self.account_keys,
			&self.recent_blockhash,
			&self.instructions,
			out,
		)
	}

	/// Returns the bytes covered by transaction signatures.
	pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		self.encode(&mut out)?;
		Ok(out)
	}

	/// Decodes a legacy message, rejecting a version prefix.
	pub fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
		match buf.first() {
			Some(b) if b & MESSAGE_VERSION_PREFIX != 0 => return Err(CodecError::VersionedPrefix),
			None => return Err(CodecError::UnexpectedEof("message header")),
			_ => {},
		}
		let (header, account_keys, recent_blockhash, instructions) = decode_body(buf)?;
		Ok(Self {
			header,
			account_keys,
			recent_blockhash,
			instructions,
		})
	}

	pub fn sanitize(&self) -> Result<(), CodecError> {
		sanitize_body(
			&self.header,
			self.account_keys.len(),
			self.account_keys.len(),
			&self.instructions,
		)
	}
}

impl V0Message {
	/// Number of keys loaded from lookup tables.
	pub fn num_lookup_keys(&self) -> usize {
		self.address_table_lookups
			.iter()
			.map(|l| l.writable_indexes.len() + l.readonly_indexes.len())
			.sum()
	}
}

impl VersionedMessage {
	pub fn header(&self) -> &MessageHeader {
		match self {
			Self::Legacy(m) => &m.header,
			Self::V0(m) => &m.header,
		}
	}

	/// Keys stored directly in the message, excluding lookup table keys.
	pub fn static_account_keys(&self) -> &[Address] {
		match self {
			Self::Legacy(m) => &m.account_keys,
			Self::V0(m) => &m.account_keys,
		}
	}

	pub fn recent_blockhash(&self) -> &Hash {
		match self {
			Self::Legacy(m) => &m.recent_blockhash,
			Self::V0(m) => &m.recent_blockhash,
		}
	}

	pub fn instructions(&self) -> &[CompiledInstruction] {
		match self {
			Self::Legacy(m) => &m.instructions,
			Self::V0(m) => &m.instructions,
		}
	}

	pub fn address_table_lookups(&self) -> &[MessageAddressTableLookup] {
		match self {
			Self::Legacy(_) => &[],
			Self::V0(m) => &m.address_table_lookups,
		}
	}

	/// The account paying fees, always the first static key.
	pub fn fee_payer(&self) -> Option<&Address> {
		self.static_account_keys().first()
	}

	/// Resolves an instruction index to a static key. Keys loaded through a
	/// lookup table cannot be resolved offline and yield `None`.
	pub fn static_key(&self, index: u8) -> Option<&Address> {
		self.static_account_keys().get(usize::from(index))
	}

	pub fn is_signer(&self, index: usize) -> bool {
		header_is_signer(self.header(), index)
	}

	pub fn is_writable(&self, index: usize) -> bool {
		header_is_writable(self.header(), self.static_account_keys().len(), index)
	}

	pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
		match self {
			Self::Legacy(m) => m.encode(out),
			Self::V0(m) => {
				out.put_u8(MESSAGE_VERSION_PREFIX);
				encode_body(
					&m.header,
					&m.account_keys,
					&m.recent_blockhash,
					&m.instructions,
					out,
				)?;
				short_vec::encode_len(m.address_table_lookups.len(), out)?;
				for lookup in &m.address_table_lookups {
					out.put_slice(lookup.account_key.as_ref());
					short_vec::encode_len(lookup.writable_indexes.len(), out)?;
					out.put_slice(&lookup.writable_indexes);
					short_vec::encode_len(lookup.readonly_indexes.len(), out)?;
					out.put_slice(&lookup.readonly_indexes);
				}
				Ok(())
			},
		}
	}

	/// Returns the bytes covered by transaction signatures.
	pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
		let mut out = Vec::new();
		self.encode(&mut out)?;
		Ok(out)
	}

	/// Decodes either layout based on the first byte.
	pub fn decode(buf: &mut &[u8]) -> Result<Self, CodecError> {
		let first = *buf
			.first()
			.ok_or(CodecError::UnexpectedEof("message header"))?;
		if first & MESSAGE_VERSION_PREFIX == 0 {
			return LegacyMessage::decode(buf).map(Self::Legacy);
		}

		let version = first & !MESSAGE_VERSION_PREFIX;
		if version != 0 {
			return Err(CodecError::UnsupportedVersion(version));
		}
		buf.advance(1);

		let (header, account_keys, recent_blockhash, instructions) = decode_body(buf)?;
		let lookup_count = short_vec::decode_len(buf)?;
		let mut address_table_lookups = Vec::with_capacity(lookup_count.min(16));
		for _ in 0..lookup_count {
			let account_key = Address::new_from_array(read_array(buf, "lookup table key")?);
			let writable_len = short_vec::decode_len(buf)?;
			let writable_indexes = read_bytes(buf, writable_len, "lookup writable indexes")?;
			let readonly_len = short_vec::decode_len(buf)?;
			let readonly_indexes = read_bytes(buf, readonly_len, "lookup readonly indexes")?;
			address_table_lookups.push(MessageAddressTableLookup {
				account_key,
				writable_indexes,
				readonly_indexes,
			});
		}

		Ok(Self::V0(V0Message {
			header,
			account_keys,
			recent_blockhash,
			instructions,
			address_table_lookups,
		}))
	}

	pub fn sanitize(&self) -> Result<(), CodecError> {
		match self {
			Self::Legacy(m) => m.sanitize(),
			Self::V0(m) => sanitize_body(
				&m.header,
				m.account_keys.len(),
				m.account_keys.len() + m.num_lookup_keys(),
				&m.instructions,
			),
		}
	}
}

impl From<LegacyMessage> for VersionedMessage {
	fn from(message: LegacyMessage) -> Self {
		Self::Legacy(message)
	}
}

impl From<V0Message> for VersionedMessage {
	fn from(message: V0Message) -> Self {
		Self::V0(message)
	}
}
