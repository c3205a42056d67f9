//! Order store service.
//!
//! Wraps the configured [`OrderBackend`] with input validation, logging and
//! the JSON export/import format.

use crate::{BackendError, Capabilities, OrderBackend};
use orderdesk_types::{NewOrder, Order, OrderId, OrderStatus};

/// High-level order storage used by the console and the HTTP endpoint.
pub struct OrderStore {
	backend: Box<dyn OrderBackend>,
}

impl OrderStore {
	pub fn new(backend: Box<dyn OrderBackend>) -> Self {
		Self { backend }
	}

	/// Returns every order in the backend's order.
	pub async fn list(&self) -> Result<Vec<Order>, BackendError> {
		let orders = self.backend.list().await?;
		tracing::debug!(count = orders.len(), "Listed orders");
		Ok(orders)
	}

	/// Looks up one order by id.
	pub async fn get(&self, id: OrderId) -> Result<Order, BackendError> {
		self.backend
			.list()
			.await?
			.into_iter()
			.find(|order| order.id == id)
			.ok_or(BackendError::NotFound(id))
	}

	/// Validates and persists a new order.
	///
	/// Nothing reaches the backend if a required field is empty.
	pub async fn create(&self, new_order: NewOrder) -> Result<OrderId, BackendError> {
		let missing = new_order.missing_fields();
		if !missing.is_empty() {
			return Err(BackendError::Validation(format!(
				"Missing required fields: {}",
				missing.join(", ")
			)));
		}

		let id = self.backend.create(&new_order.normalized()).await?;
		tracing::info!(order_id = id, "Order created");
		Ok(id)
	}

	/// Writes a new status. Returns `false` if no order has this id.
	pub async fn update_status(
		&self,
		id: OrderId,
		status: OrderStatus,
	) -> Result<bool, BackendError> {
		let matched = self.backend.update_status(id, status).await?;
		if matched {
			tracing::info!(order_id = id, status = %status, "Order status updated");
		} else {
			tracing::debug!(order_id = id, status = %status, "Status update matched no order");
		}
		Ok(matched)
	}

	/// Removes one order. Returns `false` if no order has this id.
	pub async fn delete(&self, id: OrderId) -> Result<bool, BackendError> {
		let removed = self.backend.delete(id).await?;
		if removed {
			tracing::info!(order_id = id, "Order deleted");
		}
		Ok(removed)
	}

	/// Serializes the whole collection as a pretty-printed JSON array.
	pub async fn export(&self) -> Result<String, BackendError> {
		let orders = self.backend.list().await?;
		serde_json::to_string_pretty(&orders).map_err(|e| BackendError::Serialization(e.to_string()))
	}

	/// Replaces the whole collection with the orders in `json`.
	///
	/// Only the structure is checked: records that parse are stored as they
	/// are, without re-checking required fields or id uniqueness.
	pub async fn import(&self, json: &str) -> Result<usize, BackendError> {
		let orders: Vec<Order> =
			serde_json::from_str(json).map_err(|e| BackendError::Serialization(e.to_string()))?;
		let count = orders.len();

		self.backend.replace_all(orders).await?;
		tracing::info!(count, "Orders imported");
		Ok(count)
	}

	pub fn capabilities(&self) -> Capabilities {
		self.backend.capabilities()
	}
}
