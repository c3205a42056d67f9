//! Operator console session.
//!
//! The console sits between an operator front end and the [`OrderStore`]. It
//! gates every operation behind a password, keeps an in-memory view of the
//! order list, runs the timed creation sequence and reports progress and
//! failures as [`ConsoleEvent`]s. Failures are reported once and never retried.

pub mod event_bus;

use crate::state::{is_valid_transition, Action};
use chrono::{DateTime, Utc};
use event_bus::EventBus;
use orderdesk_config::ConsoleConfig;
use orderdesk_storage::{BackendError, Capabilities, OrderStore};
use orderdesk_types::{
	format_display_time, ConsoleEvent, IndicatorState, NewOrder, Notice, Order, OrderEvent,
	OrderId, OrderStatus,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

const PROCESSING_MESSAGE: &str = "Request is being processed...";
const CREATED_MESSAGE: &str = "Order created";

/// Errors returned by console operations.
///
/// Each one has already been announced to the operator as a notice by the
/// time the caller sees it.
#[derive(Debug, Error)]
pub enum ConsoleError {
	#[error("Incorrect password")]
	IncorrectPassword,
	#[error("Missing required fields: {}", .0.join(", "))]
	MissingRequiredFields(Vec<String>),
	#[error("Transition from {from} to {to} is not allowed")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Failed to load orders: {0}")]
	Load(#[source] BackendError),
	#[error("Failed to create order: {0}")]
	Create(#[source] BackendError),
	#[error("Failed to update status: {0}")]
	UpdateStatus(#[source] BackendError),
	#[error("Failed to delete order: {0}")]
	Delete(#[source] BackendError),
	#[error("Failed to parse imported orders: {0}")]
	ImportParse(String),
	#[error("Failed to import orders: {0}")]
	Import(#[source] BackendError),
	#[error("Failed to export orders: {0}")]
	Export(#[source] BackendError),
}

/// Proof of a successful login.
///
/// Only [`Console::login`] hands these out, and every other console
/// operation asks for one.
#[derive(Debug)]
pub struct Operator {
	_private: (),
}

/// An operator session over an order store.
pub struct Console {
	config: ConsoleConfig,
	store: Arc<OrderStore>,
	events: EventBus,
	view: RwLock<Vec<Order>>,
}

impl Console {
	pub fn new(config: ConsoleConfig, store: Arc<OrderStore>, events: EventBus) -> Self {
		Self {
			config,
			store,
			events,
			view: RwLock::new(Vec::new()),
		}
	}

	/// The bus notices and indicator changes are published on.
	pub fn events(&self) -> &EventBus {
		&self.events
	}

	pub fn capabilities(&self) -> Capabilities {
		self.store.capabilities()
	}

	fn notify(&self, notice: Notice) {
		self.events.publish(ConsoleEvent::Notice(notice));
	}

	fn indicator(&self, state: IndicatorState) {
		self.events.publish(ConsoleEvent::Indicator(state));
	}

	/// Unlocks the console.
	pub fn login(&self, password: &str) -> Result<Operator, ConsoleError> {
		if self.config.password.matches(password) {
			tracing::info!("Operator logged in");
			Ok(Operator { _private: () })
		} else {
			tracing::warn!("Rejected console login");
			self.notify(Notice::error("Incorrect password"));
			Err(ConsoleError::IncorrectPassword)
		}
	}

	/// Reloads the view from the store.
	///
	/// On failure the previous view is kept.
	pub async fn refresh(&self, _operator: &Operator) -> Result<usize, ConsoleError> {
		match self.store.list().await {
			Ok(orders) => {
				let count = orders.len();
				*self.view.write().await = orders;
				self.events.publish(ConsoleEvent::Refreshed { count });
				Ok(count)
			},
			Err(e) => {
				tracing::error!(error = %e, "Failed to load orders");
				self.notify(Notice::error("Failed to load orders"));
				Err(ConsoleError::Load(e))
			},
		}
	}

	/// Snapshot of the view as of the last successful refresh.
	pub async fn orders(&self, _operator: &Operator) -> Vec<Order> {
		self.view.read().await.clone()
	}

	/// Runs the creation sequence for a new order.
	///
	/// Empty required fields are reported without touching the store.
	/// Otherwise the indicator opens, the store is called after
	/// `create_delay`, the indicator shows the confirmation for
	/// `confirm_delay`, closes, and the view is refreshed.
	pub async fn create_order(
		&self,
		operator: &Operator,
		new_order: NewOrder,
	) -> Result<OrderId, ConsoleError> {
		let missing = new_order.missing_fields();
		if !missing.is_empty() {
			tracing::debug!(fields = ?missing, "Order form incomplete");
			self.notify(Notice::error("Fill in all required fields"));
			return Err(ConsoleError::MissingRequiredFields(missing));
		}

		self.indicator(IndicatorState::Open(PROCESSING_MESSAGE.to_string()));
		tokio::time::sleep(self.config.create_delay()).await;

		let id = match self.store.create(new_order).await {
			Ok(id) => id,
			Err(e) => {
				tracing::error!(error = %e, "Failed to create order");
				self.indicator(IndicatorState::Closed);
				self.notify(Notice::error("Failed to create order"));
				return Err(ConsoleError::Create(e));
			},
		};

		self.events
			.publish(ConsoleEvent::Order(OrderEvent::Created { order_id: id }));
		self.indicator(IndicatorState::Open(CREATED_MESSAGE.to_string()));
		tokio::time::sleep(self.config.confirm_delay()).await;
		self.indicator(IndicatorState::Closed);

		// A failed reload has already been announced; the order exists regardless.
		let _ = self.refresh(operator).await;
		Ok(id)
	}

	/// Writes `status` to an order and reloads the view.
	///
	/// Unless `enforce_transitions` is set, any status may replace any other.
	/// Returns `false` when no order has this id.
	pub async fn update_status(
		&self,
		operator: &Operator,
		id: OrderId,
		status: OrderStatus,
	) -> Result<bool, ConsoleError> {
		if self.config.enforce_transitions {
			self.check_transition(id, status).await?;
		}

		match self.store.update_status(id, status).await {
			Ok(matched) => {
				if matched {
					self.events.publish(ConsoleEvent::Order(OrderEvent::StatusChanged {
						order_id: id,
						status,
					}));
				}
				let _ = self.refresh(operator).await;
				Ok(matched)
			},
			Err(e) => {
				tracing::error!(order_id = id, error = %e, "Failed to update status");
				self.notify(Notice::error("Failed to update status"));
				Err(ConsoleError::UpdateStatus(e))
			},
		}
	}

	/// Applies an operator action; shorthand for updating to its target status.
	pub async fn apply_action(
		&self,
		operator: &Operator,
		id: OrderId,
		action: Action,
	) -> Result<bool, ConsoleError> {
		self.update_status(operator, id, action.target()).await
	}

	async fn check_transition(&self, id: OrderId, to: OrderStatus) -> Result<(), ConsoleError> {
		let current = match self.store.get(id).await {
			Ok(order) => order.status,
			Err(e) => {
				self.notify(Notice::error("Failed to update status"));
				return Err(ConsoleError::UpdateStatus(e));
			},
		};

		if is_valid_transition(current, to) {
			Ok(())
		} else {
			tracing::warn!(order_id = id, from = %current, to = %to, "Rejected status transition");
			self.notify(Notice::error("Failed to update status"));
			Err(ConsoleError::InvalidTransition { from: current, to })
		}
	}

	/// Removes one order and reloads the view.
	pub async fn delete_order(&self, operator: &Operator, id: OrderId) -> Result<bool, ConsoleError> {
		match self.store.delete(id).await {
			Ok(removed) => {
				if removed {
					self.events
						.publish(ConsoleEvent::Order(OrderEvent::Deleted { order_id: id }));
					self.notify(Notice::info("Order deleted"));
				}
				let _ = self.refresh(operator).await;
				Ok(removed)
			},
			Err(e) => {
				tracing::error!(order_id = id, error = %e, "Failed to delete order");
				self.notify(Notice::error("Failed to delete order"));
				Err(ConsoleError::Delete(e))
			},
		}
	}

	/// The whole collection as pretty-printed JSON.
	pub async fn export(&self, _operator: &Operator) -> Result<String, ConsoleError> {
		self.store.export().await.map_err(|e| {
			tracing::error!(error = %e, "Failed to export orders");
			self.notify(Notice::error("Failed to export orders"));
			ConsoleError::Export(e)
		})
	}

	/// Replaces the collection with the orders in `json` and reloads the view.
	pub async fn import(&self, operator: &Operator, json: &str) -> Result<usize, ConsoleError> {
		match self.store.import(json).await {
			Ok(count) => {
				self.events
					.publish(ConsoleEvent::Order(OrderEvent::Imported { count }));
				self.notify(Notice::info(format!("Imported {} orders", count)));
				let _ = self.refresh(operator).await;
				Ok(count)
			},
			Err(BackendError::Serialization(message)) => {
				tracing::error!(error = %message, "Imported data is not an order list");
				self.notify(Notice::error("Failed to import orders"));
				Err(ConsoleError::ImportParse(message))
			},
			Err(e) => {
				tracing::error!(error = %e, "Failed to import orders");
				self.notify(Notice::error("Failed to import orders"));
				Err(ConsoleError::Import(e))
			},
		}
	}

	/// Formats a timestamp for display at the configured UTC offset.
	pub fn format_time(&self, time: &DateTime<Utc>) -> String {
		format_display_time(time, self.config.display_utc_offset_minutes)
	}
}
