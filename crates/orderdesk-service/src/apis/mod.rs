//! Request handling behind the HTTP routes.

pub mod orders;
