//! Persisted credential records and their response-merge constructors.

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, TokenSecret},
	expiry::ExpiryPolicy,
	provider::TokenGrant,
};

/// Durable credential issued for one identity.
///
/// Exactly zero or one record exists per identity at any time. Instants are persisted as Unix
/// timestamps so snapshots stay readable across serde-layout changes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Identity the credential belongs to; the storage key.
	pub identity: IdentityId,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Scope string granted with the most recent token response.
	pub scope: String,
	/// Instant the most recent token response was accepted.
	#[serde(with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Absolute expiry derived from `issued_at` plus the provider-supplied lifetime.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Builds the first record for an identity from an authorization-code exchange response.
	pub fn issued(
		identity: IdentityId,
		grant: &TokenGrant,
		issued_at: OffsetDateTime,
		policy: &ExpiryPolicy,
	) -> Self {
		Self {
			identity,
			access_token: TokenSecret::new(grant.access_token.clone()),
			refresh_token: grant.issued_refresh_token().map(TokenSecret::new),
			scope: grant.scope.clone().unwrap_or_default(),
			issued_at,
			expires_at: policy.expires_at(issued_at, grant.lifetime()),
		}
	}

	/// Merges a refresh response into a replacement record.
	///
	/// A response that omits `refresh_token` (or sends an empty one) keeps the stored secret, so
	/// a provider that only rotates refresh tokens occasionally never strands the credential.
	/// The same retention applies to `scope`.
	pub fn refreshed(
		&self,
		grant: &TokenGrant,
		issued_at: OffsetDateTime,
		policy: &ExpiryPolicy,
	) -> Self {
		Self {
			identity: self.identity.clone(),
			access_token: TokenSecret::new(grant.access_token.clone()),
			refresh_token: grant
				.issued_refresh_token()
				.map(TokenSecret::new)
				.or_else(|| self.refresh_token.clone()),
			scope: grant
				.scope
				.clone()
				.filter(|scope| !scope.is_empty())
				.unwrap_or_else(|| self.scope.clone()),
			issued_at,
			expires_at: policy.expires_at(issued_at, grant.lifetime()),
		}
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("identity", &self.identity)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
