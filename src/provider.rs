//! Provider contract for token exchanges plus the built-in reqwest transport.

#[cfg(feature = "reqwest")] pub mod http;
#[cfg(feature = "reqwest")] pub use http::HttpProviderClient;

// self
use crate::_prelude::*;

/// Provider contract future alias used by [`ProviderClient`] implementations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// Contract for the network calls that exchange and refresh credentials.
///
/// The orchestration core depends only on this trait; the reqwest-backed implementation in
/// [`http`] is one collaborator among any the calling layer may inject.
pub trait ProviderClient
where
	Self: Send + Sync,
{
	/// Exchanges an authorization code for a token grant.
	fn exchange<'a>(&'a self, code: &'a str, redirect_uri: &'a Url) -> ProviderFuture<'a, TokenGrant>;

	/// Obtains a new token grant from a refresh token.
	fn refresh<'a>(&'a self, refresh_token: &'a str) -> ProviderFuture<'a, TokenGrant>;
}

/// Token-endpoint response payload shared by exchange and refresh calls.
///
/// Unknown provider fields (e.g. `token_type`) are ignored during deserialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
	/// Newly issued access token.
	pub access_token: String,
	/// Rotated refresh token, when the provider issues one.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Scope string granted with this response.
	#[serde(default)]
	pub scope: Option<String>,
	/// Token lifetime in seconds.
	#[serde(default)]
	pub expires_in: Option<i64>,
}
impl TokenGrant {
	/// Returns the issued refresh token, treating an empty string as absent.
	pub fn issued_refresh_token(&self) -> Option<&str> {
		self.refresh_token.as_deref().filter(|secret| !secret.is_empty())
	}

	/// Returns the granted lifetime as a duration, when supplied.
	pub fn lifetime(&self) -> Option<Duration> {
		self.expires_in.map(Duration::seconds)
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("scope", &self.scope)
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Error type produced by [`ProviderClient`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderError {
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the request with status {status}: {body}")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Response body carrying the provider's diagnostic.
		body: String,
	},
	/// Token endpoint did not answer within the configured timeout.
	#[error("Token endpoint did not respond within the configured timeout.")]
	Timeout,
	/// Underlying transport reported a network failure.
	#[error("Network error occurred while calling the token endpoint: {message}.")]
	Network {
		/// Transport-specific failure rendered for diagnostics.
		message: String,
	},
	/// Token endpoint answered success with an undecodable payload.
	#[error("Token endpoint returned malformed JSON: {message}.")]
	Malformed {
		/// Structured parsing failure rendered for diagnostics.
		message: String,
	},
}

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Token-endpoint configuration consumed by [`HttpProviderClient`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Token endpoint used for exchanges and refreshes.
	pub token_endpoint: Url,
	/// OAuth 2.0 client identifier used in every grant.
	pub client_id: String,
	/// Optional client secret for confidential authentication methods.
	pub client_secret: Option<String>,
	/// Preferred client authentication mechanism.
	pub client_auth_method: ClientAuthMethod,
}
impl ProviderConfig {
	/// Creates a configuration for a public client (no secret, Basic auth preference unused).
	pub fn new(token_endpoint: Url, client_id: impl Into<String>) -> Self {
		Self {
			token_endpoint,
			client_id: client_id.into(),
			client_secret: None,
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Sets or replaces the client secret used for confidential client auth modes.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Overrides the client authentication mechanism.
	pub fn with_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}
}
