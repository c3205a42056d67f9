//! Order endpoint logic.
//!
//! The HTTP handlers in `server.rs` delegate here. Every function takes the
//! shared [`OrderStore`] and returns either a response body or an
//! [`APIError`] that renders as a JSON error with the matching status code.

use orderdesk_storage::{BackendError, OrderStore};
use orderdesk_types::{
	APIError, CreateOrderResponse, MessageResponse, NewOrder, OrderStatus, OrdersResponse,
	UpdateStatusRequest,
};

/// Maps a storage failure onto an HTTP error.
fn storage_error(err: BackendError) -> APIError {
	match err {
		BackendError::Unsupported { .. } => APIError::NotImplemented {
			error_type: "UNSUPPORTED_OPERATION".to_string(),
			message: err.to_string(),
		},
		other => APIError::InternalServerError {
			error_type: "STORAGE_ERROR".to_string(),
			message: other.to_string(),
		},
	}
}

/// All orders, newest first.
pub async fn list_orders(store: &OrderStore) -> Result<OrdersResponse, APIError> {
	let mut orders = store.list().await.map_err(storage_error)?;
	orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
	Ok(OrdersResponse { orders })
}

/// Creates an order from a submitted form.
pub async fn create_order(
	store: &OrderStore,
	new_order: NewOrder,
) -> Result<CreateOrderResponse, APIError> {
	let missing = new_order.missing_fields();
	if !missing.is_empty() {
		tracing::debug!(fields = ?missing, "Rejected incomplete order");
		return Err(APIError::BadRequest {
			error_type: "MISSING_REQUIRED_FIELDS".to_string(),
			message: "Fill in all required fields".to_string(),
			details: Some(serde_json::json!({ "fields": missing })),
		});
	}

	let id = store.create(new_order).await.map_err(storage_error)?;
	Ok(CreateOrderResponse {
		id,
		message: "Order created".to_string(),
	})
}

/// Overwrites the status of an order.
///
/// Succeeds whether or not an order with the id exists.
pub async fn update_status(
	store: &OrderStore,
	request: UpdateStatusRequest,
) -> Result<MessageResponse, APIError> {
	let status: OrderStatus = request.status.parse().map_err(|e| APIError::BadRequest {
		error_type: "INVALID_STATUS".to_string(),
		message: format!("{}", e),
		details: Some(serde_json::json!({
			"allowed": OrderStatus::all().map(|s| s.as_str()).collect::<Vec<_>>()
		})),
	})?;

	store
		.update_status(request.id, status)
		.await
		.map_err(storage_error)?;
	Ok(MessageResponse::new("Order updated"))
}
