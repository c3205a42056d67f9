//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation (the storage media and the order backends)
//! declares the name it is referenced by in configuration together with the
//! factory that builds it.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example "local" for `storage.implementations.local`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
