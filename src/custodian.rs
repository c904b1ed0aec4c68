//! Credential lifecycle orchestration built on the store and provider contracts.

pub mod exchange;
pub mod refresh;

pub use refresh::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::IdentityId,
	custodian::refresh::RefreshSlot,
	expiry::ExpiryPolicy,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderClient,
	store::CredentialStore,
};

/// Coordinates the credential lifecycle for every connected identity.
///
/// The custodian owns the provider client, credential store, and expiry policy so individual
/// operations can focus on their own semantics (code exchange, guarded refresh, revocation).
/// The store and provider are injected once at construction; the custodian holds no other
/// process-wide state.
#[derive(Clone)]
pub struct Custodian {
	/// Provider client performing the exchange/refresh network calls.
	pub provider: Arc<dyn ProviderClient>,
	/// Credential store that persists issued records.
	pub store: Arc<dyn CredentialStore>,
	/// Redirect URI registered with the provider, echoed in every code exchange.
	pub redirect_uri: Url,
	/// Policy computing absolute expiry and freshness.
	pub expiry: ExpiryPolicy,
	/// Shared counters for refresh flow outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	pub(crate) inflight: Arc<Mutex<HashMap<IdentityId, RefreshSlot>>>,
}
impl Custodian {
	/// Creates a custodian over the provided store, provider client, and redirect URI.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		provider: Arc<dyn ProviderClient>,
		redirect_uri: Url,
	) -> Self {
		Self {
			provider,
			store,
			redirect_uri,
			expiry: ExpiryPolicy::default(),
			refresh_metrics: Default::default(),
			inflight: Default::default(),
		}
	}

	/// Overrides the expiry policy (defaults to a 3600 s TTL with a 60 s skew).
	pub fn with_expiry(mut self, policy: ExpiryPolicy) -> Self {
		self.expiry = policy;

		self
	}

	/// Reports whether a credential is connected for the identity and when it expires.
	///
	/// Consults the store only; never triggers a refresh.
	pub async fn status(&self, identity: &IdentityId) -> Result<ConnectionStatus> {
		let record = self.store.get(identity).await?;

		Ok(ConnectionStatus {
			connected: record.is_some(),
			expires_at: record.map(|record| record.expires_at),
		})
	}

	/// Deletes the stored credential for the identity. Idempotent; deleting an absent record is
	/// not an error.
	pub async fn revoke(&self, identity: &IdentityId) -> Result<()> {
		const KIND: FlowKind = FlowKind::Revoke;

		let span = FlowSpan::new(KIND, "revoke");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.store.delete(identity).await?;

				Ok(())
			})
			.await;

		match &result {
			Ok(()) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl Debug for Custodian {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Custodian")
			.field("redirect_uri", &self.redirect_uri)
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Connection summary returned by [`Custodian::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
	/// Whether a credential is stored for the identity.
	pub connected: bool,
	/// Absolute expiry of the stored credential, when one exists.
	#[serde(with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
