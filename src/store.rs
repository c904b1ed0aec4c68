//! Storage contracts and built-in store implementations for credential records.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, TokenRecord},
};

/// Persistence contract future alias used by [`CredentialStore`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
///
/// Implementations must apply `upsert` atomically per identity so concurrent readers never
/// observe a partially written record.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the record stored for its identity. Idempotent under retry.
	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record stored for the identity, if present.
	fn get<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Removes and returns the record stored for the identity; absence is not an error.
	fn delete<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<TokenRecord>>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_custodian_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Custodian error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn store_error_can_be_serialized() {
		let payload = serde_json::to_string(&StoreError::Serialization { message: "bad".into() })
			.expect("StoreError should serialize to JSON.");
		let round_trip: StoreError = serde_json::from_str(&payload)
			.expect("Serialized store error should deserialize from JSON.");

		assert_eq!(round_trip, StoreError::Serialization { message: "bad".into() });
	}
}
