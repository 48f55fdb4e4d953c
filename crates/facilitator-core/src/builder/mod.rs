//! Builder pattern for constructing facilitator engines.
//!
//! Composes a FacilitatorEngine from pluggable ledger, pricing and storage
//! implementations using factory functions keyed by implementation name.

use crate::engine::FacilitatorEngine;
use facilitator_config::Config;
use facilitator_ledger::{LedgerError, LedgerInterface, LedgerService};
use facilitator_pricing::{PricingError, PricingInterface, PricingService};
use facilitator_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for all factory functions needed to build a FacilitatorEngine.
pub struct FacilitatorFactories<LF, PF, SF> {
	pub ledger_factories: HashMap<String, LF>,
	pub pricing_factories: HashMap<String, PF>,
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing a FacilitatorEngine with pluggable implementations.
pub struct FacilitatorBuilder {
	config: Config,
}

impl FacilitatorBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, constructing the primary implementation of each
	/// component from its configuration table.
	pub fn build<LF, PF, SF>(
		self,
		factories: FacilitatorFactories<LF, PF, SF>,
	) -> Result<FacilitatorEngine, BuilderError>
	where
		LF: Fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, LedgerError>,
		PF: Fn(&toml::Value) -> Result<Box<dyn PricingInterface>, PricingError>,
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let pricing_backend = load_primary(
			"pricing",
			&self.config.pricing.primary,
			&self.config.pricing.implementations,
			&factories.pricing_factories,
		)?;
		let pricing = Arc::new(PricingService::new(pricing_backend));

		let ledger_backend = load_primary(
			"ledger",
			&self.config.ledger.primary,
			&self.config.ledger.implementations,
			&factories.ledger_factories,
		)?;
		let ledger = Arc::new(LedgerService::new(
			ledger_backend,
			Duration::from_millis(self.config.ledger.confirmation_poll_interval_ms),
		));

		tracing::info!(
			asset = self.config.payment.asset_kind().as_str(),
			network = %self.config.facilitator.network,
			binding = self.config.binding.enabled,
			"Settlement engine configured"
		);

		Ok(FacilitatorEngine::new(self.config, ledger, pricing, storage))
	}
}

/// Constructs every configured implementation that has a factory and
/// returns the primary one.
fn load_primary<T: ?Sized, E: Display, F>(
	component: &'static str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut implementations = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				// Validation already happened in the factory
				implementations.insert(name.clone(), implementation);
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if implementations.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	implementations.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
