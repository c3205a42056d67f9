//! Remote order backend.
//!
//! Talks to the HTTP order endpoint served by `orderdesk serve` (or anything
//! speaking the same JSON). The endpoint assigns ids and timestamps; it offers
//! no delete and no bulk replace.

use crate::{BackendError, BackendFactory, BackendRegistry, Capabilities, OrderBackend};
use async_trait::async_trait;
use orderdesk_types::{
	ConfigSchema, CreateOrderResponse, Field, FieldType, ImplementationRegistry, MessageResponse,
	NewOrder, Order, OrderId, OrderStatus, OrdersResponse, Schema, UpdateStatusRequest,
	ValidationError,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// HTTP client for the order endpoint.
pub struct RemoteBackend {
	client: Client,
	url: String,
}

impl RemoteBackend {
	/// Creates a backend for the endpoint at `url`, with a per-request timeout.
	pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| BackendError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			url: url.into(),
		})
	}

	/// Checks the status code and decodes the JSON body.
	async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, BackendError> {
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			tracing::warn!(url = %self.url, status = %status, body = %body, "Order endpoint returned an error");
			return Err(BackendError::Http(format!(
				"HTTP {} - {}",
				status,
				body.chars().take(200).collect::<String>()
			)));
		}

		response
			.json::<T>()
			.await
			.map_err(|e| BackendError::Serialization(e.to_string()))
	}
}

fn http_error(err: reqwest::Error) -> BackendError {
	BackendError::Http(err.to_string())
}

#[async_trait]
impl OrderBackend for RemoteBackend {
	async fn list(&self) -> Result<Vec<Order>, BackendError> {
		let response = self.client.get(&self.url).send().await.map_err(http_error)?;
		let body: OrdersResponse = self.read_json(response).await?;
		Ok(body.orders)
	}

	async fn create(&self, new_order: &NewOrder) -> Result<OrderId, BackendError> {
		let response = self
			.client
			.post(&self.url)
			.json(new_order)
			.send()
			.await
			.map_err(http_error)?;
		let body: CreateOrderResponse = self.read_json(response).await?;

		tracing::debug!(url = %self.url, order_id = body.id, "Order created remotely");
		Ok(body.id)
	}

	/// The endpoint does not say whether a row matched, so a successful
	/// request always reports `true`.
	async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, BackendError> {
		let request = UpdateStatusRequest {
			id,
			status: status.to_string(),
		};
		let response = self
			.client
			.put(&self.url)
			.json(&request)
			.send()
			.await
			.map_err(http_error)?;
		let _: MessageResponse = self.read_json(response).await?;
		Ok(true)
	}

	async fn delete(&self, _id: OrderId) -> Result<bool, BackendError> {
		Err(BackendError::Unsupported {
			backend: Registry::NAME,
			operation: "delete",
		})
	}

	async fn replace_all(&self, _orders: Vec<Order>) -> Result<(), BackendError> {
		Err(BackendError::Unsupported {
			backend: Registry::NAME,
			operation: "import",
		})
	}

	fn capabilities(&self) -> Capabilities {
		Capabilities {
			delete: false,
			import: false,
			export: true,
		}
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RemoteBackendSchema)
	}
}

/// Configuration schema for RemoteBackend.
pub struct RemoteBackendSchema;

impl ConfigSchema for RemoteBackendSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("url must start with http:// or https://".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a remote backend from configuration.
///
/// Configuration parameters:
/// - `url`: address of the order endpoint, e.g. "http://127.0.0.1:3000/api/orders"
/// - `timeout_seconds`: per-request timeout (default: 30)
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn OrderBackend>, BackendError> {
	RemoteBackendSchema
		.validate(config)
		.map_err(|e| BackendError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| BackendError::Configuration("url is required".into()))?;
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.and_then(|v| u64::try_from(v).ok())
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	tracing::debug!(url = %url, timeout_seconds, "Created remote order backend");
	Ok(Box::new(RemoteBackend::new(
		url,
		Duration::from_secs(timeout_seconds),
	)?))
}

/// Registry for the remote backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "remote";
	type Factory = BackendFactory;

	fn factory() -> Self::Factory {
		create_backend
	}
}

impl BackendRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
	use chrono::Utc;
	use std::sync::Arc;
	use tokio::sync::Mutex;

	type Shared = Arc<Mutex<Vec<Order>>>;

	/// Minimal stand-in for the order endpoint.
	async fn spawn_endpoint(orders: Shared) -> String {
		async fn list(State(orders): State<Shared>) -> Json<OrdersResponse> {
			Json(OrdersResponse {
				orders: orders.lock().await.clone(),
			})
		}

		async fn create(
			State(orders): State<Shared>,
			Json(new_order): Json<NewOrder>,
		) -> (StatusCode, Json<CreateOrderResponse>) {
			let mut orders = orders.lock().await;
			let id = orders.len() as OrderId + 1;
			orders.push(Order::from_new(id, new_order, Utc::now()));
			(
				StatusCode::CREATED,
				Json(CreateOrderResponse {
					id,
					message: "Order created".to_string(),
				}),
			)
		}

		async fn update(
			State(orders): State<Shared>,
			Json(request): Json<UpdateStatusRequest>,
		) -> Result<Json<MessageResponse>, StatusCode> {
			let status: OrderStatus = request
				.status
				.parse()
				.map_err(|_| StatusCode::BAD_REQUEST)?;
			for order in orders.lock().await.iter_mut() {
				if order.id == request.id {
					order.set_status(status, Utc::now());
				}
			}
			Ok(Json(MessageResponse::new("Order updated")))
		}

		let app = Router::new()
			.route("/api/orders", get(list).post(create).put(update))
			.with_state(orders);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		format!("http://{}/api/orders", addr)
	}

	fn backend(url: &str) -> RemoteBackend {
		RemoteBackend::new(url, Duration::from_secs(5)).unwrap()
	}

	#[tokio::test]
	async fn test_create_list_and_update_over_http() {
		let orders = Shared::default();
		let backend = backend(&spawn_endpoint(orders.clone()).await);

		let id = backend
			.create(&NewOrder::new("Ivan", "@ivan", "U123"))
			.await
			.unwrap();
		assert!(backend.update_status(id, OrderStatus::Accepted).await.unwrap());

		let listed = backend.list().await.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].id, id);
		assert_eq!(listed[0].status, OrderStatus::Accepted);
		assert_eq!(orders.lock().await[0].telegram, "@ivan");
	}

	#[tokio::test]
	async fn test_error_status_becomes_http_error() {
		let app = Router::new().route(
			"/api/orders",
			get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database is down") }),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});

		let err = backend(&format!("http://{}/api/orders", addr))
			.list()
			.await
			.unwrap_err();

		assert!(matches!(&err, BackendError::Http(message) if message.contains("500")));
		assert!(err.to_string().contains("database is down"));
	}

	#[tokio::test]
	async fn test_unreachable_endpoint_is_http_error() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let result = backend(&format!("http://{}/api/orders", addr)).list().await;
		assert!(matches!(result, Err(BackendError::Http(_))));
	}

	#[tokio::test]
	async fn test_delete_and_import_are_unsupported() {
		let backend = backend("http://127.0.0.1:9/api/orders");

		assert!(!backend.capabilities().delete);
		assert!(matches!(
			backend.delete(1).await,
			Err(BackendError::Unsupported {
				operation: "delete",
				..
			})
		));
		assert!(matches!(
			backend.replace_all(Vec::new()).await,
			Err(BackendError::Unsupported {
				operation: "import",
				..
			})
		));
	}

	#[test]
	fn test_factory_requires_http_url() {
		let config: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(create_backend(&config).is_err());

		let config: toml::Value = toml::from_str(r#"url = "ftp://example.com""#).unwrap();
		let err = create_backend(&config).err().unwrap();
		assert!(err.to_string().contains("http://"));

		let config: toml::Value =
			toml::from_str(r#"url = "http://127.0.0.1:3000/api/orders""#).unwrap();
		assert!(create_backend(&config).is_ok());
	}
}
