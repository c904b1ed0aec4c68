//! Reqwest-backed [`ProviderClient`] for form-encoded token endpoint calls.
//!
//! Token requests do not follow redirects, matching OAuth 2.0 guidance that token endpoints
//! return results directly instead of delegating to another URI. The request timeout lives on
//! the reqwest client itself, so every exchange and refresh call shares the same ceiling.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{StatusCode, header::AUTHORIZATION, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	provider::{ClientAuthMethod, ProviderClient, ProviderConfig, ProviderError, ProviderFuture, TokenGrant},
};

/// Form-encoded token endpoint client implementing [`ProviderClient`].
#[derive(Clone, Debug)]
pub struct HttpProviderClient {
	client: ReqwestClient,
	config: ProviderConfig,
}
impl HttpProviderClient {
	/// Default ceiling applied to every token endpoint call.
	pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

	/// Builds a client with the default timeout and redirect following disabled.
	pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(Self::DEFAULT_TIMEOUT)
			.redirect(Policy::none())
			.build()
			.map_err(|e| ConfigError::HttpClientBuild { message: e.to_string() })?;

		Ok(Self { client, config })
	}

	/// Wraps an existing reqwest client. The caller is responsible for configuring the request
	/// timeout and disabling redirect following.
	pub fn with_client(client: ReqwestClient, config: ProviderConfig) -> Self {
		Self { client, config }
	}

	async fn post_form(&self, mut params: Vec<(&str, &str)>) -> Result<TokenGrant, ProviderError> {
		let mut request = self.client.post(self.config.token_endpoint.clone());

		match (self.config.client_auth_method, self.config.client_secret.as_deref()) {
			(ClientAuthMethod::ClientSecretBasic, Some(secret)) => {
				let credentials =
					STANDARD.encode(format!("{}:{secret}", self.config.client_id));

				request = request.header(AUTHORIZATION, format!("Basic {credentials}"));
			},
			(ClientAuthMethod::ClientSecretPost, Some(secret)) => {
				params.push(("client_id", self.config.client_id.as_str()));
				params.push(("client_secret", secret));
			},
			// Public client; prove identity with the bare client_id.
			(_, None) => params.push(("client_id", self.config.client_id.as_str())),
		}

		let response =
			request.form(&params).send().await.map_err(map_reqwest_error)?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(map_reqwest_error)?;

		if !status.is_success() {
			return Err(rejected(status, &bytes));
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| ProviderError::Malformed { message: e.to_string() })
	}
}
impl ProviderClient for HttpProviderClient {
	fn exchange<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.post_form(vec![
				("grant_type", "authorization_code"),
				("code", code),
				("redirect_uri", redirect_uri.as_str()),
			])
			.await
		})
	}

	fn refresh<'a>(&'a self, refresh_token: &'a str) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.post_form(vec![
				("grant_type", "refresh_token"),
				("refresh_token", refresh_token),
			])
			.await
		})
	}
}

fn map_reqwest_error(e: ReqwestError) -> ProviderError {
	if e.is_timeout() {
		ProviderError::Timeout
	} else {
		ProviderError::Network { message: e.to_string() }
	}
}

fn rejected(status: StatusCode, body: &[u8]) -> ProviderError {
	ProviderError::Rejected {
		status: status.as_u16(),
		body: String::from_utf8_lossy(body).into_owned(),
	}
}
