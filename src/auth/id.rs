//! Strongly typed identity key tying stored credentials to external users.

// std
use std::{borrow::Borrow, ops::Deref, str::FromStr};
// self
use crate::_prelude::*;

const IDENTITY_MAX_LEN: usize = 128;

/// Error returned when identity validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentityError {
	/// The identity was empty.
	#[error("Identity cannot be empty.")]
	Empty,
	/// The identity contains whitespace characters.
	#[error("Identity contains whitespace.")]
	ContainsWhitespace,
	/// The identity exceeded the allowed character count.
	#[error("Identity exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Unique identifier for the external user a credential belongs to.
///
/// The value is opaque to the custodian; validation only rejects inputs that cannot serve as a
/// storage key (empty, whitespace-bearing, or oversized strings).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityId(String);
impl IdentityId {
	/// Creates a new identity after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentityError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for IdentityId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for IdentityId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<IdentityId> for String {
	fn from(value: IdentityId) -> Self {
		value.0
	}
}
impl TryFrom<String> for IdentityId {
	type Error = IdentityError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for IdentityId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for IdentityId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Identity({})", self.0)
	}
}
impl Display for IdentityId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for IdentityId {
	type Err = IdentityError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentityError> {
	if view.is_empty() {
		return Err(IdentityError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentityError::ContainsWhitespace);
	}
	if view.len() > IDENTITY_MAX_LEN {
		return Err(IdentityError::TooLong { max: IDENTITY_MAX_LEN });
	}

	Ok(())
}
