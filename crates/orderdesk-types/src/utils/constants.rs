//! Default values shared by configuration and implementations.

/// Key under which the local backend keeps the serialized order array.
pub const DEFAULT_ORDERS_KEY: &str = "orders";

/// Pause before a creation request is sent, in milliseconds.
pub const DEFAULT_CREATE_DELAY_MS: u64 = 2000;

/// Pause before the creation indicator closes, in milliseconds.
pub const DEFAULT_CONFIRM_DELAY_MS: u64 = 1500;

/// UTC offset used when showing timestamps to the operator (Moscow time).
pub const DEFAULT_DISPLAY_UTC_OFFSET_MINUTES: i32 = 180;
