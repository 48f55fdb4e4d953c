//! Static pricing directory backed by configuration.
//!
//! Ships with the built-in service catalog. Entries listed under `services`
//! are added to it, replacing any built-in entry with the same id. Setting
//! `use_default_catalog = false` leaves only the configured entries.

use crate::{PricingError, PricingFactory, PricingInterface, PricingRegistry};
use facilitator_types::{
	Address, ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ServicePriceRecord,
	ValidationError,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Recipient of every built-in service.
const DEFAULT_RECIPIENT: Address =
	Address::from_str_const("HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH");

/// (id, token base units, lamports, display name)
const DEFAULT_CATALOG: &[(&str, u64, u64, &str)] = &[
	("pdf-summarizer-v1", 50_000, 1_000_000, "PDF Summarizer"),
	("image-editor-v1", 100_000, 2_000_000, "Image Editor"),
	("nft-minter-v1", 250_000, 5_000_000, "NFT Minter"),
	("code-debugger-v1", 80_000, 1_500_000, "Code Debugger"),
	("ugv-rover-01", 100_000, 2_000_000, "UGV Rover Control"),
	("smart-led-array", 50_000, 1_000_000, "Smart LED Array"),
];

#[derive(Debug, Deserialize)]
struct StaticPricingConfig {
	#[serde(default = "default_use_default_catalog")]
	use_default_catalog: bool,
	#[serde(default)]
	services: Vec<ServiceEntry>,
}

fn default_use_default_catalog() -> bool {
	true
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
	id: String,
	base_amount: u64,
	native_amount: u64,
	recipient: Address,
	display_name: Option<String>,
}

/// Pricing directory held entirely in memory.
pub struct StaticPricing {
	services: BTreeMap<String, ServicePriceRecord>,
}

impl StaticPricing {
	/// Builds the directory, rejecting records that cannot be settled.
	pub fn new(records: Vec<ServicePriceRecord>) -> Result<Self, PricingError> {
		let mut services = BTreeMap::new();
		for record in records {
			record.validate().map_err(PricingError::Configuration)?;
			services.insert(record.id.clone(), record);
		}
		if services.is_empty() {
			return Err(PricingError::Configuration(
				"pricing directory has no services".to_string(),
			));
		}
		Ok(Self { services })
	}

	/// The built-in catalog.
	pub fn default_catalog() -> Vec<ServicePriceRecord> {
		DEFAULT_CATALOG
			.iter()
			.map(|&(id, base_amount, native_amount, name)| ServicePriceRecord {
				id: id.to_string(),
				base_amount,
				native_amount,
				recipient: DEFAULT_RECIPIENT,
				display_name: name.to_string(),
			})
			.collect()
	}
}

impl PricingInterface for StaticPricing {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticPricingSchema)
	}

	fn lookup(&self, service_id: &str) -> Result<ServicePriceRecord, PricingError> {
		self.services
			.get(service_id)
			.cloned()
			.ok_or_else(|| PricingError::NotFound(service_id.to_string()))
	}

	fn services(&self) -> Vec<ServicePriceRecord> {
		self.services.values().cloned().collect()
	}
}

/// Configuration schema for StaticPricing.
pub struct StaticPricingSchema;

impl ConfigSchema for StaticPricingSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let positive = |value: &toml::Value| match value.as_integer() {
			Some(n) if n > 0 => Ok(()),
			_ => Err("must be greater than 0".to_string()),
		};

		let service = Schema::new(
			vec![
				Field::new("id", FieldType::String).with_validator(|value| {
					match value.as_str().map(str::trim) {
						Some("") | None => Err("must not be empty".to_string()),
						Some(_) => Ok(()),
					}
				}),
				Field::new(
					"base_amount",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				)
				.with_validator(positive),
				Field::new(
					"native_amount",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				)
				.with_validator(positive),
				Field::new("recipient", FieldType::Address),
			],
			vec![Field::new("display_name", FieldType::String)],
		);

		let schema = Schema::new(
			vec![],
			vec![
				Field::new("use_default_catalog", FieldType::Boolean),
				Field::new(
					"services",
					FieldType::Array(Box::new(FieldType::Table(service))),
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a static pricing directory from configuration.
///
/// Configuration parameters:
/// - `use_default_catalog`: keep the built-in services (default true)
/// - `services`: array of `{ id, base_amount, native_amount, recipient, display_name? }`
pub fn create_pricing(config: &toml::Value) -> Result<Box<dyn PricingInterface>, PricingError> {
	StaticPricingSchema
		.validate(config)
		.map_err(|e| PricingError::Configuration(format!("Invalid configuration: {}", e)))?;

	let parsed: StaticPricingConfig = config
		.clone()
		.try_into()
		.map_err(|e| PricingError::Configuration(format!("Invalid static config: {}", e)))?;

	let mut records = if parsed.use_default_catalog {
		StaticPricing::default_catalog()
	} else {
		Vec::new()
	};
	for entry in parsed.services {
		records.retain(|record| record.id != entry.id);
		records.push(ServicePriceRecord {
			display_name: entry.display_name.unwrap_or_else(|| entry.id.clone()),
			id: entry.id,
			base_amount: entry.base_amount,
			native_amount: entry.native_amount,
			recipient: entry.recipient,
		});
	}

	let pricing = StaticPricing::new(records)?;
	tracing::debug!(services = pricing.services.len(), "Static pricing loaded");
	Ok(Box::new(pricing))
}

/// Registry for the static pricing implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = PricingFactory;

	fn factory() -> Self::Factory {
		create_pricing
	}
}

impl PricingRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::PricingService;
	use facilitator_types::{format_amount, AssetKind};

	fn empty_table() -> toml::Value {
		toml::Value::Table(toml::map::Map::new())
	}

	#[test]
	fn test_default_catalog() {
		let pricing = create_pricing(&empty_table()).unwrap();
		assert_eq!(pricing.services().len(), 6);

		let pdf = pricing.lookup("pdf-summarizer-v1").unwrap();
		assert_eq!(pdf.base_amount, 50_000);
		assert_eq!(pdf.native_amount, 1_000_000);
		assert_eq!(pdf.recipient, DEFAULT_RECIPIENT);
		assert_eq!(pdf.display_name, "PDF Summarizer");
	}

	#[test]
	fn test_catalog_display_amounts() {
		let service = PricingService::new(create_pricing(&empty_table()).unwrap());
		for record in service.services() {
			assert!(record.validate().is_ok());
			let token = format_amount(record.amount_for(AssetKind::Token), 6, 2);
			assert!(token.starts_with("0."), "{} -> {}", record.id, token);
		}
		let nft = service.lookup("nft-minter-v1").unwrap();
		assert_eq!(format_amount(nft.base_amount, 6, 2), "0.25");
	}

	#[test]
	fn test_unknown_service() {
		let pricing = create_pricing(&empty_table()).unwrap();
		assert!(matches!(
			pricing.lookup("nonexistent-service"),
			Err(PricingError::NotFound(id)) if id == "nonexistent-service"
		));
	}

	#[test]
	fn test_configured_services_override_defaults() {
		let config: toml::Value = toml::from_str(
			r#"
[[services]]
id = "pdf-summarizer-v1"
base_amount = 75000
native_amount = 3000000
recipient = "11111111111111111111111111111111"

[[services]]
id = "weather-oracle"
base_amount = 10000
native_amount = 500000
recipient = "HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH"
display_name = "Weather Oracle"
"#,
		)
		.unwrap();

		let pricing = create_pricing(&config).unwrap();
		assert_eq!(pricing.services().len(), 7);
		assert_eq!(pricing.lookup("pdf-summarizer-v1").unwrap().base_amount, 75_000);
		assert_eq!(
			pricing.lookup("weather-oracle").unwrap().display_name,
			"Weather Oracle"
		);
	}

	#[test]
	fn test_without_default_catalog() {
		let config: toml::Value = toml::from_str(
			r#"
use_default_catalog = false
[[services]]
id = "only"
base_amount = 1
native_amount = 1
recipient = "HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH"
"#,
		)
		.unwrap();
		let pricing = create_pricing(&config).unwrap();
		assert_eq!(pricing.services().len(), 1);
		assert_eq!(pricing.lookup("only").unwrap().display_name, "only");
		assert!(pricing.lookup("pdf-summarizer-v1").is_err());
	}

	#[test]
	fn test_invalid_entries_rejected() {
		let zero_price: toml::Value = toml::from_str(
			r#"
[[services]]
id = "free"
base_amount = 0
native_amount = 1
recipient = "HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH"
"#,
		)
		.unwrap();
		assert!(matches!(
			create_pricing(&zero_price),
			Err(PricingError::Configuration(_))
		));

		let bad_recipient: toml::Value = toml::from_str(
			r#"
[[services]]
id = "x"
base_amount = 1
native_amount = 1
recipient = "0xdeadbeef"
"#,
		)
		.unwrap();
		assert!(create_pricing(&bad_recipient).is_err());

		let empty: toml::Value = toml::from_str("use_default_catalog = false").unwrap();
		assert!(create_pricing(&empty).is_err());
	}
}
