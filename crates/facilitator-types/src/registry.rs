//! Registry trait for self-registering implementations.
//!
//! Ledger clients, pricing directories and storage backends each expose a
//! `Registry` type naming the configuration key they answer to and the factory
//! that builds them.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The key used under `<component>.implementations` in the TOML
	/// configuration, e.g. "solana_rpc", "static" or "memory".
	const NAME: &'static str;

	/// The factory function type of the component, e.g. `LedgerFactory`.
	type Factory;

	/// Returns the factory that builds this implementation from its table.
	fn factory() -> Self::Factory;
}
