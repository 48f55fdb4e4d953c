//! Configuration builder for tests and local development.

use crate::{
	ApiConfig, BindingConfig, Config, FacilitatorConfig, IntentConfig, LedgerConfig,
	PaymentConfig, PricingConfig, StorageConfig, TokenConfig,
};
use facilitator_types::{Address, Cluster};
use std::collections::HashMap;

/// Devnet USDC mint.
const DEVNET_USDC_MINT: Address =
	Address::from_str_const("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");

/// Builder for creating `Config` instances with a fluent API.
///
/// Every section gets a single configured implementation so the result passes
/// the same validation as a parsed file.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	facilitator_id: String,
	network: Cluster,
	use_native: bool,
	token_mint: Address,
	idempotent_account_creation: bool,
	ledger_primary: String,
	pricing_primary: String,
	storage_primary: String,
	binding: BindingConfig,
	intent: IntentConfig,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			facilitator_id: "test-facilitator".to_string(),
			network: Cluster::Devnet,
			use_native: true,
			token_mint: DEVNET_USDC_MINT,
			idempotent_account_creation: false,
			ledger_primary: "solana_rpc".to_string(),
			pricing_primary: "static".to_string(),
			storage_primary: "memory".to_string(),
			binding: BindingConfig::default(),
			intent: IntentConfig::default(),
			api: None,
		}
	}

	pub fn facilitator_id(mut self, id: impl Into<String>) -> Self {
		self.facilitator_id = id.into();
		self
	}

	pub fn network(mut self, network: Cluster) -> Self {
		self.network = network;
		self
	}

	/// Selects native coin (`true`) or token (`false`) settlement.
	pub fn use_native(mut self, use_native: bool) -> Self {
		self.use_native = use_native;
		self
	}

	pub fn token_mint(mut self, mint: Address) -> Self {
		self.token_mint = mint;
		self
	}

	pub fn idempotent_account_creation(mut self, idempotent: bool) -> Self {
		self.idempotent_account_creation = idempotent;
		self
	}

	pub fn ledger_primary(mut self, primary: impl Into<String>) -> Self {
		self.ledger_primary = primary.into();
		self
	}

	pub fn pricing_primary(mut self, primary: impl Into<String>) -> Self {
		self.pricing_primary = primary.into();
		self
	}

	pub fn storage_primary(mut self, primary: impl Into<String>) -> Self {
		self.storage_primary = primary.into();
		self
	}

	/// Enables or disables payment binding.
	pub fn binding(mut self, enabled: bool) -> Self {
		self.binding.enabled = enabled;
		self
	}

	pub fn require_intent_signature(mut self, required: bool) -> Self {
		self.intent.require_signature = required;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		Config {
			facilitator: FacilitatorConfig {
				id: self.facilitator_id,
				network: self.network,
			},
			payment: PaymentConfig {
				use_native: self.use_native,
				token: TokenConfig {
					mint: self.token_mint,
					symbol: "USDC".to_string(),
					decimals: 6,
					display_decimals: 2,
					idempotent_account_creation: self.idempotent_account_creation,
				},
			},
			ledger: LedgerConfig {
				implementations: single_implementation(&self.ledger_primary),
				primary: self.ledger_primary,
				confirmation_poll_interval_ms: 10,
			},
			pricing: PricingConfig {
				implementations: single_implementation(&self.pricing_primary),
				primary: self.pricing_primary,
			},
			storage: StorageConfig {
				implementations: single_implementation(&self.storage_primary),
				primary: self.storage_primary,
				cleanup_interval_seconds: 60,
			},
			binding: self.binding,
			intent: self.intent,
			api: self.api,
		}
	}
}

fn single_implementation(name: &str) -> HashMap<String, toml::Value> {
	HashMap::from([(
		name.to_string(),
		toml::Value::Table(toml::map::Map::new()),
	)])
}

#[cfg(test)]
mod tests {
	use super::*;
	use facilitator_types::AssetKind;

	#[test]
	fn test_built_config_is_valid() {
		let config = ConfigBuilder::new().use_native(false).binding(false).build();
		assert!(config.validate().is_ok());
		assert_eq!(config.payment.asset_kind(), AssetKind::Token);
		assert!(!config.binding.enabled);
		assert!(config.ledger.implementations.contains_key("solana_rpc"));
	}
}
