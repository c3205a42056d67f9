//! API types for the orderdesk HTTP endpoint.
//!
//! The endpoint speaks the same JSON shapes that the remote storage backend
//! sends and expects, so both sides share these definitions.

use crate::{Order, OrderId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response body of `GET /api/orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrdersResponse {
	pub orders: Vec<Order>,
}

/// Response body of a successful `POST /api/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
	/// Identifier assigned to the new order.
	pub id: OrderId,
	pub message: String,
}

/// Request body of `PUT /api/orders`.
///
/// The status is kept as a raw string here; the endpoint parses it so that
/// unknown values can be reported as a bad request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
	pub id: OrderId,
	pub status: String,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
	pub message: String,
}

impl MessageResponse {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed or invalid request (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Operation not available on the configured storage (501)
	NotImplemented { error_type: String, message: String },
	/// Storage failure (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::NotImplemented { .. } => 501,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::NotImplemented {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::NotImplemented { message, .. } => write!(f, "Not Implemented: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bad_request_carries_details() {
		let error = APIError::BadRequest {
			error_type: "MISSING_REQUIRED_FIELDS".to_string(),
			message: "Fill in all required fields".to_string(),
			details: Some(serde_json::json!({ "fields": ["uid"] })),
		};

		assert_eq!(error.status_code(), 400);
		let body = serde_json::to_value(error.to_error_response()).unwrap();
		assert_eq!(body["error"], "MISSING_REQUIRED_FIELDS");
		assert_eq!(body["details"]["fields"][0], "uid");
	}

	#[test]
	fn test_internal_error_omits_details() {
		let error = APIError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message: "disk full".to_string(),
		};
		let body = serde_json::to_value(error.to_error_response()).unwrap();
		assert!(body.get("details").is_none());
		assert_eq!(error.to_string(), "Internal Server Error: disk full");
	}
}
