//! Authorization-code exchange: the first issuance of a credential for an identity.

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, TokenRecord},
	custodian::Custodian,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl Custodian {
	/// Exchanges an authorization code for tokens and persists the resulting record.
	///
	/// Any provider failure surfaces as [`Error::Exchange`] and leaves the store untouched; the
	/// caller's remedy is to restart the login flow. A successful re-exchange for an already
	/// connected identity replaces the stored record.
	pub async fn exchange_code(&self, identity: &IdentityId, code: &str) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::Exchange;

		let span = FlowSpan::new(KIND, "exchange_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let granted = self
					.provider
					.exchange(code, &self.redirect_uri)
					.await
					.map_err(Error::Exchange)?;
				let record = TokenRecord::issued(
					identity.clone(),
					&granted,
					OffsetDateTime::now_utc(),
					&self.expiry,
				);

				self.store.upsert(record.clone()).await?;

				Ok(record)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
