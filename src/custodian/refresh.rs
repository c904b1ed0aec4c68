//! On-demand refresh with per-identity single-flight coalescing.
//!
//! The custodian exposes [`Custodian::ensure_fresh`] so callers can request a guaranteed-fresh
//! access token without worrying about concurrent rotations. A caller that finds the stored
//! record stale either leads a refresh or joins the one already in flight for that identity:
//! the leader performs the single provider call, publishes the outcome into a shared slot, and
//! clears the in-flight marker before releasing the slot, so every waiter observes the same
//! result. Providers that rotate refresh tokens on use therefore never see the same secret
//! submitted twice.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::{
	_prelude::*,
	auth::{IdentityId, TokenRecord},
	custodian::Custodian,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::ProviderError,
};

/// Shared outcome slot registered while a refresh is in flight for an identity.
pub(crate) type RefreshSlot = Arc<AsyncMutex<Option<Result<TokenRecord>>>>;

type InflightRegistry = Arc<Mutex<HashMap<IdentityId, RefreshSlot>>>;

impl Custodian {
	/// Returns a record guaranteed fresh per the expiry policy, refreshing it if necessary.
	///
	/// A fresh stored record is returned without any provider call. A stale one is renewed
	/// through the provider exactly once regardless of how many callers arrive concurrently;
	/// the stored record is left untouched when the refresh fails. Terminal failures
	/// ([`Error::Refresh`], [`Error::MissingRefreshToken`]) require a new authorization flow,
	/// while [`Error::RefreshTimeout`] may simply be retried.
	pub async fn ensure_fresh(&self, identity: &IdentityId) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "ensure_fresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.ensure_fresh_inner(identity)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn ensure_fresh_inner(&self, identity: &IdentityId) -> Result<TokenRecord> {
		loop {
			let current = self
				.store
				.get(identity)
				.await?
				.ok_or_else(|| Error::NotConnected { identity: identity.clone() })?;

			if self.expiry.is_fresh(&current, OffsetDateTime::now_utc()) {
				return Ok(current);
			}

			match self.join_or_lead(identity) {
				RefreshRole::Lead(mut inflight) => {
					let outcome = self.refresh_once(identity).await;

					inflight.publish(outcome.clone());

					return outcome;
				},
				RefreshRole::Join(slot) => {
					self.refresh_metrics.record_coalesced();

					if let Some(outcome) = slot.lock().await.clone() {
						return outcome;
					}
					// The leader abandoned the slot without publishing; re-evaluate from the
					// store.
				},
			}
		}
	}

	/// Decides whether this caller leads a new refresh or joins the one in flight.
	fn join_or_lead(&self, identity: &IdentityId) -> RefreshRole {
		let mut inflight = self.inflight.lock();

		if let Some(slot) = inflight.get(identity) {
			return RefreshRole::Join(slot.clone());
		}

		let slot: RefreshSlot = Arc::new(AsyncMutex::new(None));

		match slot.try_lock_arc() {
			Some(guard) => {
				inflight.insert(identity.clone(), slot);

				RefreshRole::Lead(InflightGuard {
					registry: self.inflight.clone(),
					identity: identity.clone(),
					slot: guard,
				})
			},
			// A freshly created mutex is always lockable; joining is the safe fallback.
			None => RefreshRole::Join(slot),
		}
	}

	async fn refresh_once(&self, identity: &IdentityId) -> Result<TokenRecord> {
		self.refresh_metrics.record_attempt();

		let outcome = self.refresh_against_provider(identity).await;

		match &outcome {
			Ok(_) => self.refresh_metrics.record_success(),
			Err(_) => self.refresh_metrics.record_failure(),
		}

		outcome
	}

	async fn refresh_against_provider(&self, identity: &IdentityId) -> Result<TokenRecord> {
		let current = self
			.store
			.get(identity)
			.await?
			.ok_or_else(|| Error::NotConnected { identity: identity.clone() })?;

		// Another caller may have completed a refresh while this one raced for leadership.
		if self.expiry.is_fresh(&current, OffsetDateTime::now_utc()) {
			return Ok(current);
		}

		let refresh_token = current.refresh_token.clone().ok_or(Error::MissingRefreshToken)?;
		let granted = self
			.provider
			.refresh(refresh_token.expose())
			.await
			.map_err(classify_refresh_failure)?;
		let updated = current.refreshed(&granted, OffsetDateTime::now_utc(), &self.expiry);

		self.store.upsert(updated.clone()).await?;

		Ok(updated)
	}
}

enum RefreshRole {
	/// This caller performs the provider call and publishes the outcome.
	Lead(InflightGuard),
	/// Another caller is already refreshing; await its published outcome.
	Join(RefreshSlot),
}

/// Leader-held guard pairing the locked outcome slot with registry cleanup.
///
/// Dropping the guard removes the in-flight marker before the slot lock is released, so a
/// joiner can never observe a marker for a refresh that has already concluded. This also holds
/// when the leading caller is cancelled mid-refresh: joiners wake to an unpublished slot and
/// re-evaluate instead of waiting forever.
struct InflightGuard {
	registry: InflightRegistry,
	identity: IdentityId,
	slot: MutexGuardArc<Option<Result<TokenRecord>>>,
}
impl InflightGuard {
	fn publish(&mut self, outcome: Result<TokenRecord>) {
		*self.slot = Some(outcome);
	}
}
impl Drop for InflightGuard {
	fn drop(&mut self) {
		self.registry.lock().remove(&self.identity);
	}
}

fn classify_refresh_failure(e: ProviderError) -> Error {
	match e {
		ProviderError::Timeout | ProviderError::Network { .. } => Error::RefreshTimeout(e),
		ProviderError::Rejected { .. } | ProviderError::Malformed { .. } => Error::Refresh(e),
	}
}
