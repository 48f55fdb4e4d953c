//! Pricing directory for the payment facilitator.
//!
//! Maps a service identifier to its price, recipient and display name. The
//! directory is loaded once at start-up and is read-only afterwards, so
//! lookups are synchronous and never touch the network.

use facilitator_types::{ConfigSchema, ImplementationRegistry, ServicePriceRecord};
use thiserror::Error;

pub mod implementations {
	pub mod r#static;
}

/// Errors that can occur during pricing operations.
#[derive(Debug, Error)]
pub enum PricingError {
	/// The service identifier is not priced.
	#[error("Service not found: {0}")]
	NotFound(String),
	/// Error that occurs when configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for pricing directories.
pub trait PricingInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves a service identifier to its price record.
	fn lookup(&self, service_id: &str) -> Result<ServicePriceRecord, PricingError>;

	/// All priced services, ordered by identifier.
	fn services(&self) -> Vec<ServicePriceRecord>;
}

/// Type alias for pricing factory functions.
pub type PricingFactory = fn(&toml::Value) -> Result<Box<dyn PricingInterface>, PricingError>;

/// Registry trait for pricing implementations.
pub trait PricingRegistry: ImplementationRegistry<Factory = PricingFactory> {}

/// Get all registered pricing implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PricingFactory)> {
	use implementations::r#static;

	vec![(r#static::Registry::NAME, r#static::Registry::factory())]
}

/// Service wrapping the configured pricing directory.
pub struct PricingService {
	implementation: Box<dyn PricingInterface>,
}

impl PricingService {
	pub fn new(implementation: Box<dyn PricingInterface>) -> Self {
		Self { implementation }
	}

	/// Resolves a service identifier to its price record.
	pub fn lookup(&self, service_id: &str) -> Result<ServicePriceRecord, PricingError> {
		self.implementation.lookup(service_id)
	}

	pub fn services(&self) -> Vec<ServicePriceRecord> {
		self.implementation.services()
	}
}
