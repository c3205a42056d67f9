//! Storage module for the orderdesk system.
//!
//! Two layers live here. The lower one is a plain key-value medium
//! ([`StorageInterface`]) with file and in-memory implementations. The upper
//! one is the order persistence contract ([`OrderBackend`]) with a `local`
//! implementation that keeps the whole order list under one key of a medium
//! and a `remote` implementation that talks to the HTTP order endpoint.
//! [`OrderStore`] wraps whichever backend configuration selects.

use async_trait::async_trait;
use orderdesk_types::{ConfigSchema, ImplementationRegistry, NewOrder, Order, OrderId, OrderStatus};
use serde::Serialize;
use thiserror::Error;

/// Key-value media.
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Order backends.
pub mod backends {
	pub mod local;
	pub mod remote;
}

mod store;

pub use store::OrderStore;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
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

/// Low-level key-value medium.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for key-value medium factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for key-value media.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered key-value media.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Errors that can occur in order backends.
#[derive(Debug, Error)]
pub enum BackendError {
	/// No order with this id.
	#[error("Order {0} not found")]
	NotFound(OrderId),
	/// The backend cannot perform the operation at all.
	#[error("Operation '{operation}' is not supported by the {backend} backend")]
	Unsupported {
		backend: &'static str,
		operation: &'static str,
	},
	/// Stored or received data could not be (de)serialized.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The HTTP request failed or returned an error status.
	#[error("HTTP error: {0}")]
	Http(String),
	/// The creation input failed validation.
	#[error("Validation error: {0}")]
	Validation(String),
	/// The backend could not be built from its configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Any other failure of the backing medium.
	#[error("Backend error: {0}")]
	Backend(String),
}

impl From<StorageError> for BackendError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::Serialization(message) => BackendError::Serialization(message),
			StorageError::Configuration(message) => BackendError::Configuration(message),
			StorageError::Backend(message) => BackendError::Backend(message),
			StorageError::NotFound => BackendError::Backend("key not found".into()),
		}
	}
}

/// Which optional operations a backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
	pub delete: bool,
	pub import: bool,
	pub export: bool,
}

/// Persistence contract for orders.
///
/// Implementations keep the full ordered collection. None of them checks
/// whether a status change is allowed by the workflow; that is the caller's
/// decision.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait OrderBackend: Send + Sync {
	/// Returns the full collection.
	async fn list(&self) -> Result<Vec<Order>, BackendError>;

	/// Persists a new `pending` order and returns its id.
	///
	/// The input is expected to be validated already.
	async fn create(&self, new_order: &NewOrder) -> Result<OrderId, BackendError>;

	/// Overwrites the status of an order and bumps its `updated_at`.
	///
	/// Returns `false` when no order has this id; that is not an error.
	async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, BackendError>;

	/// Removes one order. Returns `false` when no order has this id.
	async fn delete(&self, id: OrderId) -> Result<bool, BackendError>;

	/// Replaces the whole collection.
	async fn replace_all(&self, orders: Vec<Order>) -> Result<(), BackendError>;

	fn capabilities(&self) -> Capabilities;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for order backend factory functions.
pub type BackendFactory = fn(&toml::Value) -> Result<Box<dyn OrderBackend>, BackendError>;

/// Registry trait for order backends.
pub trait BackendRegistry: ImplementationRegistry<Factory = BackendFactory> {}

/// Get all registered order backends.
pub fn get_all_backends() -> Vec<(&'static str, BackendFactory)> {
	use backends::{local, remote};

	vec![
		(local::Registry::NAME, local::Registry::factory()),
		(remote::Registry::NAME, remote::Registry::factory()),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_registries_list_every_implementation() {
		let media: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(media, vec!["file", "memory"]);

		let backends: Vec<_> = get_all_backends()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(backends, vec!["local", "remote"]);
	}

	#[test]
	fn test_storage_errors_map_onto_backend_errors() {
		let err: BackendError = StorageError::Serialization("bad json".into()).into();
		assert!(matches!(err, BackendError::Serialization(_)));

		let err: BackendError = StorageError::Backend("disk full".into()).into();
		assert_eq!(err.to_string(), "Backend error: disk full");
	}
}
