//! Instruction builders and decoders for the on-ledger programs the
//! facilitator settles payments through.

pub mod associated_token;
pub mod pda;
pub mod system;
pub mod token;
