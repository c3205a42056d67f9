//! Event types published by the console.
//!
//! The console never renders anything itself. It publishes events on a bus and
//! the front end (the CLI here) decides how to show notices and the progress
//! indicator.

use crate::{OrderId, OrderStatus};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all console events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleEvent {
	/// A transient notification for the operator.
	Notice(Notice),
	/// The modal progress indicator changed.
	Indicator(IndicatorState),
	/// An order changed in the backing medium.
	Order(OrderEvent),
	/// The in-memory view was reloaded with this many orders.
	Refreshed { count: usize },
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
	Info,
	Error,
}

/// A transient notification with a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
	pub level: NoticeLevel,
	pub title: String,
	pub message: String,
}

impl Notice {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Info,
			title: "Done".to_string(),
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			level: NoticeLevel::Error,
			title: "Error".to_string(),
			message: message.into(),
		}
	}
}

/// State of the creation progress indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndicatorState {
	/// Indicator shown with a message.
	Open(String),
	/// Indicator dismissed.
	Closed,
}

/// Changes applied to orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
	Created { order_id: OrderId },
	StatusChanged {
		order_id: OrderId,
		status: OrderStatus,
	},
	Deleted { order_id: OrderId },
	Imported { count: usize },
}
