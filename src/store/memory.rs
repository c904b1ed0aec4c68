//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, TokenRecord},
	store::{CredentialStore, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<IdentityId, TokenRecord>>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl CredentialStore for MemoryStore {
	fn upsert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(record.identity.clone(), record);

			Ok(())
		})
	}

	fn get<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(identity).cloned()) })
	}

	fn delete<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(identity)) })
	}
}
