//! In-memory key-value medium.
//!
//! Nothing survives a restart. Used by tests and by the `serve` command when
//! a throwaway endpoint is enough.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// HashMap behind a read-write lock.
#[derive(Default)]
pub struct MemoryStorage {
	store: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.store.write().await.insert(key.to_string(), value);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage. It takes no options.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory medium.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

/// Registry for the memory medium.
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

		assert!(matches!(
			storage.get_bytes("orders").await,
			Err(StorageError::NotFound)
		));

		storage.set_bytes("orders", b"[]".to_vec()).await.unwrap();
		assert_eq!(storage.get_bytes("orders").await.unwrap(), b"[]");
	}

	#[tokio::test]
	async fn test_keys_are_independent() {
		let storage = MemoryStorage::new();

		storage.set_bytes("orders", b"[1]".to_vec()).await.unwrap();
		storage.set_bytes("archive", b"[2]".to_vec()).await.unwrap();
		storage.set_bytes("orders", b"[3]".to_vec()).await.unwrap();

		assert_eq!(storage.get_bytes("orders").await.unwrap(), b"[3]");
		assert_eq!(storage.get_bytes("archive").await.unwrap(), b"[2]");
	}
}
