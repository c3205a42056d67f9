//! Order status workflow: legal transitions and the operator actions that
//! trigger them.

pub mod workflow;

pub use workflow::{available_actions, is_terminal, is_valid_transition, status_label, Action};
