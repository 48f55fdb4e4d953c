//! Dynamic factory registry for facilitator implementations.
//!
//! This module provides a centralized registry for all factory functions,
//! allowing dynamic instantiation of implementations based on configuration.

use facilitator_config::Config;
use facilitator_core::{FacilitatorBuilder, FacilitatorEngine, FacilitatorFactories};
use facilitator_ledger::LedgerFactory;
use facilitator_pricing::PricingFactory;
use facilitator_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub ledger: HashMap<String, LedgerFactory>,
	pub pricing: HashMap<String, PricingFactory>,
	pub storage: HashMap<String, StorageFactory>,
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			ledger: HashMap::new(),
			pricing: HashMap::new(),
			storage: HashMap::new(),
		}
	}

	pub fn register_ledger(&mut self, name: impl Into<String>, factory: LedgerFactory) {
		self.ledger.insert(name.into(), factory);
	}

	pub fn register_pricing(&mut self, name: impl Into<String>, factory: PricingFactory) {
		self.pricing.insert(name.into(), factory);
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in facilitator_ledger::get_all_implementations() {
			tracing::debug!("Registering ledger implementation: {}", name);
			registry.register_ledger(name, factory);
		}

		for (name, factory) in facilitator_pricing::get_all_implementations() {
			tracing::debug!("Registering pricing implementation: {}", name);
			registry.register_pricing(name, factory);
		}

		for (name, factory) in facilitator_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				let available_str = available.join(", ");
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name, name, available_str
				)
				.into());
			}
		}
		factories
	}};
}

/// Build the engine using the registry and config
pub fn build_engine_from_config(
	config: Config,
) -> Result<FacilitatorEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let ledger_factories = build_factories!(registry, config.ledger.implementations, ledger, "ledger");
	let pricing_factories =
		build_factories!(registry, config.pricing.implementations, pricing, "pricing");
	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");

	let factories = FacilitatorFactories {
		ledger_factories,
		pricing_factories,
		storage_factories,
	};

	Ok(FacilitatorBuilder::new(config).build(factories)?)
}
