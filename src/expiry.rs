//! Expiry computation and freshness policy for stored credentials.

// self
use crate::{_prelude::*, auth::TokenRecord};

/// Computes absolute expiry instants and classifies records as fresh or stale.
///
/// A record inside the skew window counts as stale even though it has not technically expired,
/// so a token is never handed out if it could lapse mid-call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryPolicy {
	/// Lifetime assumed when the provider omits `expires_in`.
	pub default_ttl: Duration,
	/// Safety margin subtracted from the nominal expiry.
	pub skew: Duration,
}
impl ExpiryPolicy {
	/// Lifetime assumed when a token response carries no `expires_in`.
	pub const DEFAULT_TTL: Duration = Duration::seconds(3_600);
	/// Default safety margin before the nominal expiry.
	pub const DEFAULT_SKEW: Duration = Duration::seconds(60);

	/// Computes the absolute expiry for a token issued at `issued_at`.
	pub fn expires_at(&self, issued_at: OffsetDateTime, lifetime: Option<Duration>) -> OffsetDateTime {
		issued_at + lifetime.unwrap_or(self.default_ttl)
	}

	/// Returns `true` when the record can still serve calls at `now` with the skew applied.
	pub fn is_fresh(&self, record: &TokenRecord, now: OffsetDateTime) -> bool {
		record.expires_at - now > self.skew
	}
}
impl Default for ExpiryPolicy {
	fn default() -> Self {
		Self { default_ttl: Self::DEFAULT_TTL, skew: Self::DEFAULT_SKEW }
	}
}
