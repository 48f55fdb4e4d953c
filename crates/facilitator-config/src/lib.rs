//! Configuration module for the payment facilitator.
//!
//! This module provides structures and utilities for managing facilitator
//! configuration. It supports loading configuration from TOML files with
//! environment variable substitution and validates that every referenced
//! implementation is configured.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files for better organization:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

#[cfg(any(test, feature = "testing"))]
pub mod builders;
mod loader;

#[cfg(any(test, feature = "testing"))]
pub use builders::config::ConfigBuilder;

use facilitator_types::{Address, AssetDescriptor, AssetKind, Cluster};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, not the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the facilitator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and cluster of this facilitator instance.
	pub facilitator: FacilitatorConfig,
	/// Settlement asset selection.
	pub payment: PaymentConfig,
	/// Ledger client implementations.
	pub ledger: LedgerConfig,
	/// Pricing directory implementations.
	pub pricing: PricingConfig,
	/// Storage backend implementations.
	pub storage: StorageConfig,
	/// Binding of payment ids to built transactions.
	#[serde(default)]
	pub binding: BindingConfig,
	/// x402 payment intent handling.
	#[serde(default)]
	pub intent: IntentConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the facilitator instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FacilitatorConfig {
	/// Unique identifier for this facilitator instance.
	pub id: String,
	/// Cluster used for explorer links and intent payloads.
	#[serde(default)]
	pub network: Cluster,
}

/// Settlement asset configuration.
///
/// `use_native` is the process-wide switch between native coin transfers and
/// token transfers. It is read once and injected into the transaction builder.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
	/// Settle in the native coin instead of the token.
	#[serde(default = "default_true")]
	pub use_native: bool,
	/// Token used when `use_native` is false.
	pub token: TokenConfig,
}

/// The fungible token payments settle in.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// Mint address of the token.
	pub mint: Address,
	/// Currency code shown to callers.
	#[serde(default = "default_token_symbol")]
	pub symbol: String,
	/// Decimals of the token.
	#[serde(default = "default_token_decimals")]
	pub decimals: u8,
	/// Fractional digits shown in display amounts.
	#[serde(default = "default_token_display_decimals")]
	pub display_decimals: u8,
	/// Use the idempotent form of the account-creation instruction.
	#[serde(default)]
	pub idempotent_account_creation: bool,
}

impl PaymentConfig {
	/// The asset selected by `use_native`.
	pub fn asset_kind(&self) -> AssetKind {
		if self.use_native {
			AssetKind::Native
		} else {
			AssetKind::Token
		}
	}

	/// Display and scale information for the selected asset.
	pub fn asset_descriptor(&self) -> AssetDescriptor {
		match self.asset_kind() {
			AssetKind::Native => AssetDescriptor::native(),
			AssetKind::Token => self.token_descriptor(),
		}
	}

	/// Display and scale information for the token, regardless of `use_native`.
	pub fn token_descriptor(&self) -> AssetDescriptor {
		AssetDescriptor {
			kind: AssetKind::Token,
			symbol: self.token.symbol.clone(),
			decimals: self.token.decimals,
			display_decimals: self.token.display_decimals,
			mint: Some(self.token.mint),
		}
	}
}

/// Configuration for the ledger client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of ledger implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Delay between signature status polls while awaiting confirmation.
	#[serde(default = "default_poll_interval_ms")]
	pub confirmation_poll_interval_ms: u64,
}

/// Configuration for the pricing directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of pricing implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	pub cleanup_interval_seconds: u64,
}

/// Binding of payment ids to the transactions built for them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindingConfig {
	/// Reject submissions that do not match a recorded build.
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// How long a build stays redeemable.
	#[serde(default = "default_binding_ttl")]
	pub ttl_seconds: u64,
}

impl Default for BindingConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			ttl_seconds: default_binding_ttl(),
		}
	}
}

/// x402 payment intent settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentConfig {
	/// Reject intents without a payer signature.
	#[serde(default)]
	pub require_signature: bool,
	/// Lifetime of issued invoices.
	#[serde(default = "default_intent_expiry")]
	pub expiry_seconds: u64,
	/// Recipient for invoices that name an unpriced agent with an explicit amount.
	#[serde(default)]
	pub default_recipient: Option<Address>,
}

impl Default for IntentConfig {
	fn default() -> Self {
		Self {
			require_signature: false,
			expiry_seconds: default_intent_expiry(),
			default_recipient: None,
		}
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
	/// CORS configuration.
	pub cors: Option<CorsConfig>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	/// Allowed origins for CORS.
	pub allowed_origins: Vec<String>,
	/// Allowed headers for CORS.
	#[serde(default)]
	pub allowed_headers: Vec<String>,
	/// Allowed methods for CORS.
	#[serde(default)]
	pub allowed_methods: Vec<String>,
}

fn default_true() -> bool {
	true
}

fn default_token_symbol() -> String {
	"USDC".to_string()
}

fn default_token_decimals() -> u8 {
	6
}

fn default_token_display_decimals() -> u8 {
	2
}

fn default_poll_interval_ms() -> u64 {
	500
}

/// Builds stay redeemable for 15 minutes, longer than a block hash lives.
fn default_binding_ttl() -> u64 {
	900
}

fn default_intent_expiry() -> u64 {
	300
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8403
}

/// Submissions wait for confirmation, which can take until the block hash expires.
fn default_api_timeout() -> u64 {
	120
}

/// 1MB
fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(var_name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};
		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.facilitator.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Facilitator ID cannot be empty".into(),
			));
		}

		validate_primary("ledger", &self.ledger.primary, &self.ledger.implementations)?;
		validate_primary(
			"pricing",
			&self.pricing.primary,
			&self.pricing.implementations,
		)?;
		validate_primary(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;

		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		if self.ledger.confirmation_poll_interval_ms == 0
			|| self.ledger.confirmation_poll_interval_ms > 60_000
		{
			return Err(ConfigError::Validation(
				"Ledger confirmation_poll_interval_ms must be between 1 and 60000".into(),
			));
		}

		let token = &self.payment.token;
		if token.symbol.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Token symbol cannot be empty".into(),
			));
		}
		if token.decimals > 18 {
			return Err(ConfigError::Validation(format!(
				"Token decimals cannot exceed 18, got {}",
				token.decimals
			)));
		}
		if token.display_decimals > token.decimals {
			return Err(ConfigError::Validation(format!(
				"Token display_decimals ({}) cannot exceed decimals ({})",
				token.display_decimals, token.decimals
			)));
		}

		if self.binding.enabled && self.binding.ttl_seconds == 0 {
			return Err(ConfigError::Validation(
				"Binding ttl_seconds must be greater than 0 when binding is enabled".into(),
			));
		}
		if self.intent.expiry_seconds == 0 {
			return Err(ConfigError::Validation(
				"Intent expiry_seconds must be greater than 0".into(),
			));
		}

		if let Some(api) = &self.api {
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
