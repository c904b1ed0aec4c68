//! Typed state value carried through the authorization redirect round-trip.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::IdentityId};

const NONCE_LEN: usize = 32;

/// Error raised when a returned state parameter fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StateError {
	/// The state parameter was not valid URL-safe base64.
	#[error("State parameter is not valid URL-safe base64.")]
	Encoding,
	/// The decoded payload was malformed or missing required fields.
	#[error("State parameter payload is malformed: {message}.")]
	Malformed {
		/// Structured parsing failure rendered for diagnostics.
		message: String,
	},
	/// The returned nonce does not match the issued one.
	#[error("State nonce does not match the issued value.")]
	NonceMismatch,
}

/// State-transfer value round-tripped through the provider's authorization redirect.
///
/// The calling layer issues one per login attempt, threads the encoded form through the
/// `state` query parameter, and validates the value the provider hands back before exchanging
/// the authorization code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectState {
	/// Identity the login attempt belongs to.
	pub identity: IdentityId,
	/// Random nonce binding the redirect to this attempt.
	pub nonce: String,
}
impl ConnectState {
	/// Issues a new state value with a random nonce for the identity.
	pub fn issue(identity: IdentityId) -> Self {
		Self { identity, nonce: random_nonce() }
	}

	/// Encodes the state as URL-safe base64 JSON for the `state` query parameter.
	pub fn encode(&self) -> String {
		// Serializing a two-string struct cannot fail.
		let payload = serde_json::to_vec(self).unwrap_or_default();

		URL_SAFE_NO_PAD.encode(payload)
	}

	/// Decodes and validates a returned `state` parameter.
	pub fn decode(encoded: &str) -> Result<Self, StateError> {
		let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| StateError::Encoding)?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| StateError::Malformed { message: e.to_string() })
	}

	/// Verifies that the returned state matches the nonce issued for this attempt.
	pub fn verify_nonce(&self, returned: &Self) -> Result<(), StateError> {
		if self.nonce == returned.nonce {
			Ok(())
		} else {
			Err(StateError::NonceMismatch)
		}
	}
}

fn random_nonce() -> String {
	rand::rng().sample_iter(Alphanumeric).take(NONCE_LEN).map(char::from).collect()
}
