//! Checks on the TOML tables handed to implementation factories.
//!
//! Each `[ledger|pricing|storage.implementations.<name>]` table is validated
//! before its factory builds anything. `solana_rpc` requires an `rpc_url`,
//! the `static` pricing directory checks every `[[services]]` entry down to
//! the recipient address, and `memory` accepts an empty table only. Errors
//! carry the dotted path of the offending key, e.g. `services[2].recipient`.

use crate::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
	#[error("Failed to deserialize config: {0}")]
	DeserializationError(String),
}

/// Expected shape of one key.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Bounds are inclusive. Used for timeouts, TTLs and base-unit prices.
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Boolean,
	/// Base58 text that parses as an [`Address`], such as a service
	/// recipient or a token mint.
	Address,
	/// `http://` or `https://` endpoint, such as the ledger RPC URL.
	Url,
	Array(Box<FieldType>),
	/// Nested table, e.g. one `[[services]]` entry.
	Table(Schema),
}

/// Extra check run after the type check passes; the returned message ends
/// up in [`ValidationError::InvalidValue`].
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a value check, e.g. restricting `commitment` to the known
	/// levels or rejecting a blank service id.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		match &self.validator {
			Some(validator) => validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			}),
			None => Ok(()),
		}
	}
}

/// Keys an implementation table must and may contain. Keys not listed are
/// ignored.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Stops at the first failing key. Required keys are checked before
	/// optional ones.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	let invalid = |message: String| ValidationError::InvalidValue {
		field: field_name.to_string(),
		message,
	};

	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;
			if let Some(min_val) = min.filter(|min_val| int_val < *min_val) {
				return Err(invalid(format!(
					"Value {} is less than minimum {}",
					int_val, min_val
				)));
			}
			if let Some(max_val) = max.filter(|max_val| int_val > *max_val) {
				return Err(invalid(format!(
					"Value {} is greater than maximum {}",
					int_val, max_val
				)));
			}
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Address => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "address", value))?;
			s.parse::<Address>()
				.map_err(|e| invalid(format!("Invalid address '{}': {}", s, e)))?;
		},
		FieldType::Url => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "url", value))?;
			if !(s.starts_with("http://") || s.starts_with("https://")) {
				return Err(invalid(format!("URL must use http or https: {}", s)));
			}
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| mismatch(field_name, "array", value))?;
			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema
				.validate(value)
				.map_err(|e| prefix_path(field_name, e))?;
		},
	}

	Ok(())
}

/// Qualifies a nested table's error with the key that holds the table.
fn prefix_path(parent: &str, error: ValidationError) -> ValidationError {
	match error {
		ValidationError::MissingField(f) => ValidationError::MissingField(format!("{}.{}", parent, f)),
		ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
			field: format!("{}.{}", parent, field),
			message,
		},
		ValidationError::TypeMismatch {
			field,
			expected,
			actual,
		} => ValidationError::TypeMismatch {
			field: format!("{}.{}", parent, field),
			expected,
			actual,
		},
		other => other,
	}
}

/// Implemented by each implementation's schema type (`SolanaRpcSchema`,
/// `StaticPricingSchema`, `MemoryStorageSchema`) and returned boxed from
/// `config_schema()`, so the engine builder can check a table by name.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}
