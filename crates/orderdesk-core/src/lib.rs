//! Core of the orderdesk system.
//!
//! Holds the order status workflow, the operator console session with its
//! event bus, and the builder that assembles both from configuration.

pub mod builder;
pub mod console;
pub mod state;

pub use builder::{BuilderError, ConsoleBuilder, ConsoleFactories};
pub use console::{event_bus::EventBus, Console, ConsoleError, Operator};
pub use state::Action;
