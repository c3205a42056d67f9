//! Common types for the orderdesk system.
//!
//! This crate holds the order model and every type shared between the
//! storage backends, the console core and the HTTP service, so that all
//! components agree on one wire format.

/// Request and response bodies of the HTTP order endpoint.
pub mod api;
/// Console events: notices, indicator changes and order changes.
pub mod events;
/// The order record, its status and the creation input.
pub mod order;
/// Self-registration of pluggable implementations.
pub mod registry;
/// Redacting wrapper for the console password.
pub mod secret_string;
/// Constants and display helpers.
pub mod utils;
/// Configuration schema validation for implementation blocks.
pub mod validation;

pub use api::*;
pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{display_name, format_display_time};
pub use validation::*;
