//! Ledger cluster selection and block explorer links.

use crate::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The ledger cluster the facilitator is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
	#[default]
	Devnet,
	Testnet,
	MainnetBeta,
	Localnet,
}

impl Cluster {
	pub fn as_str(&self) -> &'static str {
		match self {
			Cluster::Devnet => "devnet",
			Cluster::Testnet => "testnet",
			Cluster::MainnetBeta => "mainnet-beta",
			Cluster::Localnet => "localnet",
		}
	}

	fn query_suffix(&self) -> &'static str {
		match self {
			Cluster::MainnetBeta => "",
			Cluster::Devnet => "?cluster=devnet",
			Cluster::Testnet => "?cluster=testnet",
			Cluster::Localnet => "?cluster=custom",
		}
	}

	/// Link to the transaction on the primary explorer.
	pub fn explorer_url(&self, signature: &Signature) -> String {
		format!("https://explorer.solana.com/tx/{}{}", signature, self.query_suffix())
	}

	/// Link to the transaction on the alternate explorer.
	pub fn alt_explorer_url(&self, signature: &Signature) -> String {
		format!("https://solscan.io/tx/{}{}", signature, self.query_suffix())
	}
}

impl fmt::Display for Cluster {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
