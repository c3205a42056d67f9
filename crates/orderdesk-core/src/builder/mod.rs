//! Builder wiring configuration to a running console or order store.
//!
//! Backends are created through factory functions keyed by the name used in
//! `[storage.implementations.<name>]`, so the binary decides which
//! implementations exist and configuration decides which one is used.

use crate::console::{event_bus::EventBus, Console};
use orderdesk_config::Config;
use orderdesk_storage::{BackendError, OrderBackend, OrderStore};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while assembling components.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions available to the builder.
pub struct ConsoleFactories<BF> {
	pub backend_factories: HashMap<String, BF>,
}

/// Builds the order store and console from configuration.
pub struct ConsoleBuilder {
	config: Config,
}

impl ConsoleBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Creates every configured backend that has a factory and wraps the
	/// primary one in an [`OrderStore`].
	pub fn build_store<BF>(
		&self,
		factories: &ConsoleFactories<BF>,
	) -> Result<Arc<OrderStore>, BuilderError>
	where
		BF: Fn(&toml::Value) -> Result<Box<dyn OrderBackend>, BackendError>,
	{
		let mut backends = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.backend_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "No factory registered, skipping");
				continue;
			};

			match factory(config) {
				Ok(backend) => {
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					backends.insert(name.clone(), backend);
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary = &self.config.storage.primary;
		let backend = backends.remove(primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary
			))
		})?;

		Ok(Arc::new(OrderStore::new(backend)))
	}

	/// Builds a console over the primary store with a fresh event bus.
	pub fn build<BF>(self, factories: &ConsoleFactories<BF>) -> Result<Console, BuilderError>
	where
		BF: Fn(&toml::Value) -> Result<Box<dyn OrderBackend>, BackendError>,
	{
		let store = self.build_store(factories)?;
		Ok(Console::new(
			self.config.console,
			store,
			EventBus::default(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use orderdesk_storage::{get_all_backends, BackendFactory};
	use orderdesk_types::NewOrder;

	fn factories() -> ConsoleFactories<BackendFactory> {
		ConsoleFactories {
			backend_factories: get_all_backends()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	fn config(storage: &str) -> Config {
		format!(
			"[console]\npassword = \"eashop25\"\ncreate_delay_ms = 0\nconfirm_delay_ms = 0\n{}",
			storage
		)
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_builds_console_over_primary() {
		let config = config(
			r#"
[storage]
primary = "local"
[storage.implementations.local]
medium = "memory"
[storage.implementations.remote]
url = "http://127.0.0.1:3000/api/orders"
"#,
		);

		let console = ConsoleBuilder::new(config).build(&factories()).unwrap();
		let operator = console.login("eashop25").unwrap();
		console
			.create_order(&operator, NewOrder::new("Ivan", "@ivan", "U123"))
			.await
			.unwrap();

		assert!(console.capabilities().delete);
		assert_eq!(console.orders(&operator).await.len(), 1);
	}

	#[test]
	fn test_broken_implementation_fails_the_build() {
		let config = config(
			r#"
[storage]
primary = "local"
[storage.implementations.local]
medium = "memory"
[storage.implementations.remote]
url = "not a url"
"#,
		);

		let err = ConsoleBuilder::new(config)
			.build_store(&factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("'remote'"));
	}

	#[test]
	fn test_primary_without_factory_fails() {
		let config = config(
			r#"
[storage]
primary = "postgres"
[storage.implementations.postgres]
dsn = "postgres://localhost/orders"
"#,
		);

		let err = ConsoleBuilder::new(config)
			.build_store(&factories())
			.err()
			.unwrap();
		assert!(err.to_string().contains("Primary storage 'postgres'"));
	}
}
