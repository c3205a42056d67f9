//! Order types for the orderdesk system.
//!
//! An order is a customer service request. It is created from a [`NewOrder`]
//! submitted by the operator, starts out `pending`, and afterwards changes
//! only through status updates or a wholesale import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Numeric order identifier.
pub type OrderId = u64;

/// Error returned when a status string is not one of the known statuses.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

/// Status of an order in the workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Submitted and waiting for an operator decision.
	Pending,
	/// Taken into work.
	Accepted,
	/// Work finished.
	Completed,
	/// Declined by the operator.
	Rejected,
	/// Work abandoned after acceptance.
	Cancelled,
}

impl OrderStatus {
	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Accepted => "accepted",
			OrderStatus::Completed => "completed",
			OrderStatus::Rejected => "rejected",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Accepted,
			Self::Completed,
			Self::Rejected,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// Input for creating an order.
///
/// `first_name`, `telegram` and `uid` are required and must be non-empty.
/// Missing required fields deserialize to empty strings so that they are
/// reported by validation instead of failing the parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewOrder {
	#[serde(default)]
	#[validate(length(min = 1))]
	pub first_name: String,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	#[serde(default)]
	#[validate(length(min = 1))]
	pub telegram: String,
	#[serde(default)]
	#[validate(length(min = 1))]
	pub uid: String,
	/// Free-text description of the requested service.
	#[serde(default)]
	pub service: Option<String>,
}

impl NewOrder {
	/// Creates an input with the three required fields set.
	pub fn new(
		first_name: impl Into<String>,
		telegram: impl Into<String>,
		uid: impl Into<String>,
	) -> Self {
		Self {
			first_name: first_name.into(),
			telegram: telegram.into(),
			uid: uid.into(),
			..Default::default()
		}
	}

	/// Names of the required fields that are empty, sorted.
	pub fn missing_fields(&self) -> Vec<String> {
		match self.validate() {
			Ok(()) => Vec::new(),
			Err(errors) => {
				let mut fields: Vec<String> = errors
					.field_errors()
					.keys()
					.map(|field| field.to_string())
					.collect();
				fields.sort();
				fields
			},
		}
	}

	/// Turns empty optional fields into `None`.
	///
	/// Form submissions send empty strings for untouched optional inputs.
	pub fn normalized(mut self) -> Self {
		for field in [&mut self.last_name, &mut self.phone, &mut self.service] {
			if field.as_deref().is_some_and(str::is_empty) {
				*field = None;
			}
		}
		self
	}
}

/// A persisted order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, assigned at creation.
	pub id: OrderId,
	pub first_name: String,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub phone: Option<String>,
	pub telegram: String,
	/// Customer account identifier, opaque to this system.
	pub uid: String,
	#[serde(default)]
	pub service: Option<String>,
	pub status: OrderStatus,
	/// Creation time, never modified afterwards.
	pub created_at: DateTime<Utc>,
	/// Time of the last status change.
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Builds a `pending` order from a creation input.
	pub fn from_new(id: OrderId, new_order: NewOrder, now: DateTime<Utc>) -> Self {
		let new_order = new_order.normalized();
		Self {
			id,
			first_name: new_order.first_name,
			last_name: new_order.last_name,
			phone: new_order.phone,
			telegram: new_order.telegram,
			uid: new_order.uid,
			service: new_order.service,
			status: OrderStatus::Pending,
			created_at: now,
			updated_at: now,
		}
	}

	/// Overwrites the status and bumps `updated_at`.
	///
	/// `updated_at` never moves backwards, even if the clock does.
	pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
		self.status = status;
		self.updated_at = now.max(self.updated_at);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;

	#[test]
	fn test_status_round_trips_through_str() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
		}
		assert_eq!(
			"done".parse::<OrderStatus>(),
			Err(UnknownStatus("done".to_string()))
		);
	}

	#[test]
	fn test_status_serializes_lowercase() {
		let json = serde_json::to_string(&OrderStatus::Cancelled).unwrap();
		assert_eq!(json, "\"cancelled\"");
	}

	#[test]
	fn test_missing_fields_reports_required_only() {
		let new_order = NewOrder {
			last_name: Some(String::new()),
			..NewOrder::new("", "@ivan", "")
		};
		assert_eq!(new_order.missing_fields(), vec!["first_name", "uid"]);
		assert!(NewOrder::new("Ivan", "@ivan", "U123").missing_fields().is_empty());
	}

	#[test]
	fn test_missing_body_fields_default_to_empty() {
		let new_order: NewOrder = serde_json::from_str(r#"{"first_name": "Ivan"}"#).unwrap();
		assert_eq!(new_order.missing_fields(), vec!["telegram", "uid"]);
	}

	#[test]
	fn test_from_new_starts_pending() {
		let now = Utc::now();
		let new_order = NewOrder {
			phone: Some(String::new()),
			..NewOrder::new("Ivan", "@ivan", "U123")
		};
		let order = Order::from_new(7, new_order, now);

		assert_eq!(order.status, OrderStatus::Pending);
		assert_eq!(order.created_at, order.updated_at);
		assert_eq!(order.phone, None);
	}

	#[test]
	fn test_set_status_never_moves_updated_at_back() {
		let now = Utc::now();
		let mut order = Order::from_new(1, NewOrder::new("Ivan", "@ivan", "U123"), now);

		order.set_status(OrderStatus::Accepted, now - Duration::seconds(30));
		assert_eq!(order.status, OrderStatus::Accepted);
		assert_eq!(order.updated_at, now);

		let later = now + Duration::seconds(5);
		order.set_status(OrderStatus::Completed, later);
		assert_eq!(order.updated_at, later);
	}
}
