//! In-memory storage backend.
//!
//! Entries live in a `HashMap` behind a read-write lock and are lost on
//! restart. Expiry is checked on every read, so an expired entry is never
//! returned even before `cleanup_expired` sweeps it.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use facilitator_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// In-memory storage implementation.
pub struct MemoryStorage {
	store: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		match store.get(key) {
			Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value.clone()),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let expires_at = ttl.map(|ttl| Instant::now() + ttl);
		let mut store = self.store.write().await;
		store.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn take_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let mut store = self.store.write().await;
		match store.remove(key) {
			Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.value),
			_ => Err(StorageError::NotFound),
		}
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.get(key)
			.is_some_and(|entry| !entry.is_expired(Instant::now())))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let now = Instant::now();
		let mut store = self.store.write().await;
		let before = store.len();
		store.retain(|_, entry| !entry.is_expired(now));
		let removed = before - store.len();
		if removed > 0 {
			tracing::debug!(removed, "Dropped expired storage entries");
		}
		Ok(removed)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No options
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory storage backend from configuration.
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory storage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "test_key";
		let value = b"test_value".to_vec();
		storage.set_bytes(key, value.clone(), None).await.unwrap();
		assert_eq!(storage.get_bytes(key).await.unwrap(), value);
		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_ttl_expiry() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes("short", b"a".to_vec(), Some(Duration::from_secs(10)))
			.await
			.unwrap();
		storage.set_bytes("forever", b"b".to_vec(), None).await.unwrap();

		tokio::time::advance(Duration::from_secs(5)).await;
		assert!(storage.exists("short").await.unwrap());

		tokio::time::advance(Duration::from_secs(6)).await;
		assert!(!storage.exists("short").await.unwrap());
		assert!(matches!(
			storage.get_bytes("short").await,
			Err(StorageError::NotFound)
		));

		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert_eq!(storage.cleanup_expired().await.unwrap(), 0);
		assert!(storage.exists("forever").await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn test_take_removes_live_entry_once() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes("k", b"v".to_vec(), Some(Duration::from_secs(10)))
			.await
			.unwrap();

		assert_eq!(storage.take_bytes("k").await.unwrap(), b"v".to_vec());
		assert!(matches!(
			storage.take_bytes("k").await,
			Err(StorageError::NotFound)
		));

		storage
			.set_bytes("stale", b"v".to_vec(), Some(Duration::from_secs(1)))
			.await
			.unwrap();
		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(matches!(
			storage.take_bytes("stale").await,
			Err(StorageError::NotFound)
		));
		assert_eq!(storage.cleanup_expired().await.unwrap(), 0);
	}

	#[test]
	fn test_factory_rejects_non_table() {
		let result = create_storage(&toml::Value::Integer(1));
		assert!(matches!(result, Err(StorageError::Configuration(_))));
	}
}
