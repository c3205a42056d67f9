//! HTTP server for the order endpoint.
//!
//! Serves `GET`, `POST` and `PUT` on `/api/orders` over the configured order
//! store. This is the endpoint the `remote` backend talks to.

use crate::apis::orders;
use axum::{
	extract::State,
	http::{header, HeaderName, Method, StatusCode},
	response::{IntoResponse, Json},
	routing::get,
	Router,
};
use orderdesk_config::ApiConfig;
use orderdesk_storage::OrderStore;
use orderdesk_types::{
	APIError, MessageResponse, NewOrder, OrdersResponse, UpdateStatusRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub store: Arc<OrderStore>,
}

/// Builds the router with `/api` base path and the orders route.
///
/// Requests running longer than `request_timeout` are answered with 408.
pub fn router(store: Arc<OrderStore>, request_timeout: Duration) -> Router {
	let cors = CorsLayer::new()
		.allow_origin(Any)
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
		.allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-user-id")])
		.max_age(Duration::from_secs(86400));

	Router::new()
		.nest(
			"/api",
			Router::new().route(
				"/orders",
				get(handle_list_orders)
					.post(handle_create_order)
					.put(handle_update_status),
			),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors)
				.layer(TimeoutLayer::new(request_timeout)),
		)
		.with_state(AppState { store })
}

/// Serves the router on an already bound listener until the task is dropped.
pub async fn serve(
	listener: TcpListener,
	store: Arc<OrderStore>,
	request_timeout: Duration,
) -> std::io::Result<()> {
	axum::serve(listener, router(store, request_timeout)).await
}

/// Binds to the configured address and serves the order endpoint.
pub async fn start_server(api_config: ApiConfig, store: Arc<OrderStore>) -> anyhow::Result<()> {
	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order endpoint listening on http://{}/api/orders", bind_address);

	serve(
		listener,
		store,
		Duration::from_secs(api_config.timeout_seconds),
	)
	.await?;
	Ok(())
}

/// Handles GET /api/orders requests.
async fn handle_list_orders(
	State(state): State<AppState>,
) -> Result<Json<OrdersResponse>, APIError> {
	match orders::list_orders(&state.store).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order listing failed: {}", e);
			Err(e)
		},
	}
}

/// Handles POST /api/orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	Json(new_order): Json<NewOrder>,
) -> Result<impl IntoResponse, APIError> {
	match orders::create_order(&state.store, new_order).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Order creation failed: {}", e);
			Err(e)
		},
	}
}

/// Handles PUT /api/orders requests.
async fn handle_update_status(
	State(state): State<AppState>,
	Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<MessageResponse>, APIError> {
	match orders::update_status(&state.store, request).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Status update failed: {}", e);
			Err(e)
		},
	}
}
