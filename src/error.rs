//! Custodian-level error types shared across the orchestration core, provider, and stores.

// self
use crate::{_prelude::*, auth::IdentityId, provider::ProviderError};

/// Custodian-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical custodian error exposed by public APIs.
///
/// Every variant is cloneable so a single-flight refresh can publish one outcome to all
/// concurrent callers.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Redirect state failed validation.
	#[error(transparent)]
	State(#[from] crate::auth::StateError),

	/// No credential is stored for the identity; the caller must initiate authorization.
	#[error("No credential is connected for identity `{identity}`.")]
	NotConnected {
		/// Identity the lookup was performed for.
		identity: IdentityId,
	},
	/// Authorization-code exchange failed; the caller must restart the login flow.
	#[error("Authorization code exchange failed: {0}")]
	Exchange(#[source] ProviderError),
	/// Refresh was rejected by the provider; terminal for the current refresh token, the caller
	/// must re-authorize.
	#[error("Token refresh was rejected: {0}")]
	Refresh(#[source] ProviderError),
	/// Refresh did not complete due to a timeout or network failure; the caller may retry.
	#[error("Token refresh did not complete: {0}")]
	RefreshTimeout(#[source] ProviderError),
	/// Stored credential carries no refresh token, so a stale record cannot be renewed.
	#[error("Stored credential has no refresh token; re-authorization is required.")]
	MissingRefreshToken,
}
impl Error {
	/// Returns `true` when the failure is transient and the caller may retry the same operation
	/// without re-authorizing.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::RefreshTimeout(_))
	}
}

/// Configuration and validation failures raised by the custodian.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed: {message}.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		message: String,
	},
}
