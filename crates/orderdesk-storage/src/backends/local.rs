//! Local order backend.
//!
//! The whole collection is one JSON array stored under a single key of a
//! key-value medium. Every write reads the array, changes it and writes it
//! back; a mutex keeps those cycles from interleaving within the process.

use crate::{
	get_all_implementations, BackendError, BackendFactory, BackendRegistry, Capabilities,
	OrderBackend, StorageError, StorageInterface,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderdesk_types::{
	utils::constants::DEFAULT_ORDERS_KEY, ConfigSchema, Field, FieldType, ImplementationRegistry,
	NewOrder, Order, OrderId, OrderStatus, Schema, ValidationError,
};
use tokio::sync::Mutex;

const DEFAULT_MEDIUM: &str = "file";

/// Order list kept under one key of a key-value medium.
pub struct LocalBackend {
	medium: Box<dyn StorageInterface>,
	key: String,
	write_lock: Mutex<()>,
}

impl LocalBackend {
	pub fn new(medium: Box<dyn StorageInterface>, key: impl Into<String>) -> Self {
		Self {
			medium,
			key: key.into(),
			write_lock: Mutex::new(()),
		}
	}

	async fn load(&self) -> Result<Vec<Order>, BackendError> {
		let bytes = match self.medium.get_bytes(&self.key).await {
			Ok(bytes) => bytes,
			Err(StorageError::NotFound) => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};
		serde_json::from_slice(&bytes).map_err(|e| BackendError::Serialization(e.to_string()))
	}

	async fn save(&self, orders: &[Order]) -> Result<(), BackendError> {
		let bytes =
			serde_json::to_vec(orders).map_err(|e| BackendError::Serialization(e.to_string()))?;
		self.medium.set_bytes(&self.key, bytes).await?;
		Ok(())
	}
}

/// Picks the id for an order created at `now`.
///
/// The id is the creation time in milliseconds. If an existing order already
/// has that id, the largest existing id plus one is used instead.
fn next_id(orders: &[Order], now: DateTime<Utc>) -> OrderId {
	let candidate = u64::try_from(now.timestamp_millis()).unwrap_or_default();
	if orders.iter().any(|order| order.id == candidate) {
		orders
			.iter()
			.map(|order| order.id)
			.max()
			.unwrap_or(candidate)
			.saturating_add(1)
	} else {
		candidate
	}
}

#[async_trait]
impl OrderBackend for LocalBackend {
	async fn list(&self) -> Result<Vec<Order>, BackendError> {
		self.load().await
	}

	async fn create(&self, new_order: &NewOrder) -> Result<OrderId, BackendError> {
		let _guard = self.write_lock.lock().await;
		let mut orders = self.load().await?;

		let now = Utc::now();
		let id = next_id(&orders, now);
		orders.push(Order::from_new(id, new_order.clone(), now));
		self.save(&orders).await?;

		Ok(id)
	}

	async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, BackendError> {
		let _guard = self.write_lock.lock().await;
		let mut orders = self.load().await?;

		let Some(order) = orders.iter_mut().find(|order| order.id == id) else {
			return Ok(false);
		};
		order.set_status(status, Utc::now());
		self.save(&orders).await?;

		Ok(true)
	}

	async fn delete(&self, id: OrderId) -> Result<bool, BackendError> {
		let _guard = self.write_lock.lock().await;
		let mut orders = self.load().await?;

		let before = orders.len();
		orders.retain(|order| order.id != id);
		if orders.len() == before {
			return Ok(false);
		}
		self.save(&orders).await?;

		Ok(true)
	}

	async fn replace_all(&self, orders: Vec<Order>) -> Result<(), BackendError> {
		let _guard = self.write_lock.lock().await;
		self.save(&orders).await
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities {
			delete: true,
			import: true,
			export: true,
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalBackendSchema)
	}
}

/// Configuration schema for LocalBackend.
pub struct LocalBackendSchema;

impl ConfigSchema for LocalBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("medium", FieldType::String).with_validator(|value| {
					let medium = value.as_str().unwrap_or_default();
					if get_all_implementations()
						.iter()
						.any(|(name, _)| *name == medium)
					{
						Ok(())
					} else {
						Err(format!("unknown medium '{}'", medium))
					}
				}),
				Field::new("key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some("") => Err("key cannot be empty".to_string()),
						_ => Ok(()),
					}
				}),
				Field::new("storage_path", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a local backend from configuration.
///
/// Configuration parameters:
/// - `medium`: "file" or "memory" (default: "file")
/// - `key`: key holding the order array (default: "orders")
/// - any parameter of the chosen medium, such as `storage_path`
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn OrderBackend>, BackendError> {
	LocalBackendSchema
		.validate(config)
		.map_err(|e| BackendError::Configuration(e.to_string()))?;

	let medium_name = config
		.get("medium")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_MEDIUM);
	let key = config
		.get("key")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_ORDERS_KEY);

	let (_, medium_factory) = get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == medium_name)
		.ok_or_else(|| BackendError::Configuration(format!("Unknown medium: {}", medium_name)))?;
	let medium = medium_factory(config)?;

	tracing::debug!(medium = %medium_name, key = %key, "Created local order backend");
	Ok(Box::new(LocalBackend::new(medium, key)))
}

/// Registry for the local backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}
