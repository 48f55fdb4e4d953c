//! Storage module for the payment facilitator.
//!
//! Provides a key-value abstraction with per-entry time-to-live, used to keep
//! payment bindings between the build and submit steps. Values are namespaced
//! by [`StorageKey`](facilitator_types::StorageKey) and stored as JSON.

use async_trait::async_trait;
use facilitator_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod implementations {
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found or has expired.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Low-level interface for storage backends.
///
/// Backends store raw bytes under string keys. An entry written with a TTL
/// must read as absent once the TTL has elapsed, whether or not
/// `cleanup_expired` has run.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Removes the value under `key` and returns it, in one step. Of several
	/// concurrent takes of the same live key exactly one succeeds; the rest
	/// see `NotFound`.
	async fn take_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a live key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Removes expired entries and returns how many were dropped.
	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		Ok(0)
	}
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::memory;

	vec![(memory::Registry::NAME, memory::Registry::factory())]
}

/// Typed storage operations over a backend.
///
/// The namespace and id are combined into a `namespace:id` key and values are
/// serialized to JSON.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value with optional time-to-live.
	pub async fn store_with_ttl<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&key(namespace, id), bytes, ttl).await
	}

	/// Stores a serializable value without time-to-live.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		self.store_with_ttl(namespace, id, data, None).await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value and returns it. `NotFound` when another caller took it
	/// first or it has expired.
	pub async fn take<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.take_bytes(&key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Removes a value from storage. Removing an absent key is not an error.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&key(namespace, id)).await
	}

	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&key(namespace, id)).await
	}

	/// Removes expired entries from storage.
	pub async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.backend.cleanup_expired().await
	}
}

fn key(namespace: &str, id: &str) -> String {
	format!("{}:{}", namespace, id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use facilitator_types::StorageKey;
	use implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Record {
		amount: u64,
	}

	#[tokio::test]
	async fn test_typed_round_trip() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let ns = StorageKey::Payments.as_str();

		service.store(ns, "pay_1", &Record { amount: 5 }).await.unwrap();
		assert!(service.exists(ns, "pay_1").await.unwrap());
		let record: Record = service.retrieve(ns, "pay_1").await.unwrap();
		assert_eq!(record, Record { amount: 5 });

		service.remove(ns, "pay_1").await.unwrap();
		let missing: Result<Record, _> = service.retrieve(ns, "pay_1").await;
		assert!(matches!(missing, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_take_hands_value_to_one_caller() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let ns = StorageKey::Payments.as_str();
		service.store(ns, "pay_2", &Record { amount: 7 }).await.unwrap();

		let (first, second) = tokio::join!(
			service.take::<Record>(ns, "pay_2"),
			service.take::<Record>(ns, "pay_2")
		);
		let taken: Vec<_> = [first, second].into_iter().filter_map(Result::ok).collect();

		assert_eq!(taken, vec![Record { amount: 7 }]);
		assert!(!service.exists(ns, "pay_2").await.unwrap());
	}

	#[tokio::test]
	async fn test_wrong_shape_is_serialization_error() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		service.store("payments", "x", &"text").await.unwrap();
		let result: Result<Record, _> = service.retrieve("payments", "x").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}
}
