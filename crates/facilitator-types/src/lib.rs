//! Common types module for the payment facilitator.
//!
//! This crate defines the data types shared by every facilitator component:
//! ledger primitives and the transaction wire codec, program instruction
//! helpers, payment domain records, HTTP API bodies, configuration schemas
//! and the implementation registry trait.

/// Base58 addresses, hashes and signatures.
pub mod address;
/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Ledger cluster selection and explorer links.
pub mod cluster;
/// Uncompiled instructions and account metadata.
pub mod instruction;
/// x402 payment intent payloads.
pub mod intent;
/// Payment settlement domain records.
pub mod payment;
/// Instruction builders for the settlement programs.
pub mod programs;
/// Implementation registry trait.
pub mod registry;
/// Storage namespaces.
pub mod storage;
/// Utility functions for formatting and time.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;
/// Binary transaction wire format.
pub mod wire;

pub use address::{Address, Hash, ParseError, Signature};
pub use api::*;
pub use cluster::Cluster;
pub use instruction::{AccountMeta, Instruction};
pub use intent::{IntentPayload, IntentSignature, PaymentIntent};
pub use payment::*;
pub use registry::ImplementationRegistry;
pub use storage::StorageKey;
pub use utils::{current_timestamp, current_timestamp_millis, format_amount, truncate_id};
pub use validation::*;
pub use wire::CodecError;
