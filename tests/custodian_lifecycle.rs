// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use token_custodian::{
	auth::{IdentityId, TokenRecord, TokenSecret},
	custodian::Custodian,
	error::Error,
	provider::{ProviderClient, ProviderError, ProviderFuture, TokenGrant},
	store::{CredentialStore, MemoryStore},
};

/// Provider double that plays back scripted responses and counts every network call.
#[derive(Default)]
struct ScriptedProvider {
	exchanges: Mutex<VecDeque<Result<TokenGrant, ProviderError>>>,
	refreshes: Mutex<VecDeque<Result<TokenGrant, ProviderError>>>,
	exchange_calls: AtomicU64,
	refresh_calls: AtomicU64,
	refresh_delay: Option<std::time::Duration>,
}
impl ScriptedProvider {
	fn with_exchange(self, response: Result<TokenGrant, ProviderError>) -> Self {
		self.exchanges.lock().push_back(response);

		self
	}

	fn with_refresh(self, response: Result<TokenGrant, ProviderError>) -> Self {
		self.refreshes.lock().push_back(response);

		self
	}

	fn with_refresh_delay(mut self, delay: std::time::Duration) -> Self {
		self.refresh_delay = Some(delay);

		self
	}
}
impl ProviderClient for ScriptedProvider {
	fn exchange<'a>(&'a self, _: &'a str, _: &'a Url) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.exchange_calls.fetch_add(1, Ordering::SeqCst);

			self.exchanges
				.lock()
				.pop_front()
				.expect("ProviderClient received an unexpected exchange call.")
		})
	}

	fn refresh<'a>(&'a self, _: &'a str) -> ProviderFuture<'a, TokenGrant> {
		Box::pin(async move {
			self.refresh_calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.refresh_delay {
				tokio::time::sleep(delay).await;
			}

			self.refreshes
				.lock()
				.pop_front()
				.expect("ProviderClient received an unexpected refresh call.")
		})
	}
}

fn grant(access: &str, refresh: Option<&str>, expires_in: i64) -> TokenGrant {
	TokenGrant {
		access_token: access.into(),
		refresh_token: refresh.map(Into::into),
		scope: Some("write:notes".into()),
		expires_in: Some(expires_in),
	}
}

fn make_identity(value: &str) -> IdentityId {
	IdentityId::new(value).expect("Failed to build identity for lifecycle tests.")
}

fn redirect_uri() -> Url {
	Url::parse("https://bot.example/oauth/callback")
		.expect("Redirect URI fixture should parse successfully.")
}

fn build_custodian(provider: ScriptedProvider) -> (Custodian, Arc<MemoryStore>, Arc<ScriptedProvider>) {
	let store_backend = Arc::new(MemoryStore::default());
	let provider = Arc::new(provider);
	let custodian =
		Custodian::new(store_backend.clone(), provider.clone(), redirect_uri());

	(custodian, store_backend, provider)
}

async fn seed_record(
	store: &MemoryStore,
	identity: &IdentityId,
	access: &str,
	refresh: Option<&str>,
	expires_in: Duration,
) -> TokenRecord {
	let now = OffsetDateTime::now_utc();
	let record = TokenRecord {
		identity: identity.clone(),
		access_token: TokenSecret::new(access),
		refresh_token: refresh.map(TokenSecret::new),
		scope: "write:notes".into(),
		issued_at: now - Duration::minutes(5),
		expires_at: now + expires_in,
	};

	store.upsert(record.clone()).await.expect("Failed to seed record into the store.");

	record
}

#[tokio::test]
async fn ensure_fresh_without_record_fails_not_connected() {
	let (custodian, _, provider) = build_custodian(ScriptedProvider::default());
	let identity = make_identity("u1");
	let err = custodian
		.ensure_fresh(&identity)
		.await
		.expect_err("An unknown identity should not produce a record.");

	assert!(matches!(err, Error::NotConnected { identity: ref who } if who == &identity));
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exchange_stores_record_and_status_reports_expiry() {
	let (custodian, _, provider) = build_custodian(
		ScriptedProvider::default().with_exchange(Ok(grant("A1", Some("R1"), 3_600))),
	);
	let identity = make_identity("u1");
	let before = OffsetDateTime::now_utc();
	let record = custodian
		.exchange_code(&identity, "code123")
		.await
		.expect("Code exchange should succeed.");

	assert_eq!(record.access_token.expose(), "A1");
	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));
	assert!((record.expires_at - (before + Duration::seconds(3_600))).abs() < Duration::seconds(5));
	assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 1);

	let status =
		custodian.status(&identity).await.expect("Status lookup should succeed.");

	assert!(status.connected);
	assert_eq!(status.expires_at, Some(record.expires_at));
}

#[tokio::test]
async fn exchange_rejection_writes_nothing() {
	let (custodian, _, _) = build_custodian(ScriptedProvider::default().with_exchange(Err(
		ProviderError::Rejected { status: 400, body: "{\"error\":\"invalid_grant\"}".into() },
	)));
	let identity = make_identity("u1");
	let err = custodian
		.exchange_code(&identity, "expired-code")
		.await
		.expect_err("A rejected exchange should surface to the caller.");

	assert!(matches!(err, Error::Exchange(ProviderError::Rejected { status: 400, .. })));

	let status =
		custodian.status(&identity).await.expect("Status lookup should succeed.");

	assert!(!status.connected);
	assert!(status.expires_at.is_none());
}

#[tokio::test]
async fn fresh_record_returns_without_provider_call() {
	let (custodian, store, provider) = build_custodian(ScriptedProvider::default());
	let identity = make_identity("u1");
	let seeded =
		seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(120)).await;
	let record = custodian
		.ensure_fresh(&identity)
		.await
		.expect("A fresh record should be served from the store.");

	assert_eq!(record, seeded);
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stale_record_refreshes_and_preserves_refresh_token() {
	let (custodian, store, provider) = build_custodian(
		ScriptedProvider::default().with_refresh(Ok(grant("A2", None, 3_600))),
	);
	let identity = make_identity("u1");

	seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(30)).await;

	let before = OffsetDateTime::now_utc();
	let record = custodian
		.ensure_fresh(&identity)
		.await
		.expect("A stale record should be refreshed.");

	assert_eq!(record.access_token.expose(), "A2");
	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R1"));
	assert!((record.expires_at - (before + Duration::seconds(3_600))).abs() < Duration::seconds(5));
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);

	let stored = store
		.get(&identity)
		.await
		.expect("Fetching the refreshed record should succeed.")
		.expect("Refreshed record should remain present.");

	assert_eq!(stored, record);
}

#[tokio::test]
async fn rejected_refresh_is_terminal_and_leaves_record_untouched() {
	let (custodian, store, provider) =
		build_custodian(ScriptedProvider::default().with_refresh(Err(ProviderError::Rejected {
			status: 400,
			body: "{\"error\":\"invalid_grant\"}".into(),
		})));
	let identity = make_identity("u1");
	let seeded = seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(30)).await;
	let err = custodian
		.ensure_fresh(&identity)
		.await
		.expect_err("A rejected refresh should surface to the caller.");

	assert!(matches!(err, Error::Refresh(ProviderError::Rejected { status: 400, .. })));
	assert!(!err.is_retryable());
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);

	let stored = store
		.get(&identity)
		.await
		.expect("Fetching after a failed refresh should succeed.")
		.expect("Stored record must survive a rejected refresh.");

	assert_eq!(stored, seeded);

	let status =
		custodian.status(&identity).await.expect("Status lookup should succeed.");

	assert_eq!(status.expires_at, Some(seeded.expires_at));
}

#[tokio::test]
async fn timed_out_refresh_is_retryable() {
	let (custodian, store, provider) = build_custodian(
		ScriptedProvider::default()
			.with_refresh(Err(ProviderError::Timeout))
			.with_refresh(Ok(grant("A2", Some("R2"), 3_600))),
	);
	let identity = make_identity("u1");
	let seeded = seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(30)).await;
	let err = custodian
		.ensure_fresh(&identity)
		.await
		.expect_err("A timed out refresh should surface to the caller.");

	assert!(matches!(err, Error::RefreshTimeout(ProviderError::Timeout)));
	assert!(err.is_retryable());

	let stored = store
		.get(&identity)
		.await
		.expect("Fetching after a timeout should succeed.")
		.expect("Stored record must survive a timed out refresh.");

	assert_eq!(stored, seeded);

	let record = custodian
		.ensure_fresh(&identity)
		.await
		.expect("Retrying after a timeout should succeed.");

	assert_eq!(record.access_token.expose(), "A2");
	assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("R2"));
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn stale_record_without_refresh_token_requires_reauthorization() {
	let (custodian, store, provider) = build_custodian(ScriptedProvider::default());
	let identity = make_identity("u1");

	seed_record(&store, &identity, "A1", None, Duration::seconds(30)).await;

	let err = custodian
		.ensure_fresh(&identity)
		.await
		.expect_err("A stale record without a refresh token cannot be renewed.");

	assert!(matches!(err, Error::MissingRefreshToken));
	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn revoke_disconnects_and_is_idempotent() {
	let (custodian, _, _) = build_custodian(
		ScriptedProvider::default().with_exchange(Ok(grant("A1", Some("R1"), 3_600))),
	);
	let identity = make_identity("u1");

	custodian
		.exchange_code(&identity, "code123")
		.await
		.expect("Code exchange should succeed.");
	custodian.revoke(&identity).await.expect("Revoking a connected identity should succeed.");

	let status =
		custodian.status(&identity).await.expect("Status lookup should succeed.");

	assert!(!status.connected);

	custodian
		.revoke(&identity)
		.await
		.expect("Revoking an already absent identity should stay silent.");

	let err = custodian
		.ensure_fresh(&identity)
		.await
		.expect_err("A revoked identity should read as disconnected.");

	assert!(matches!(err, Error::NotConnected { .. }));
}

async fn run_singleflight(concurrency: usize) {
	let (custodian, store, provider) = build_custodian(
		ScriptedProvider::default()
			.with_refresh(Ok(grant("A2", Some("R2"), 3_600)))
			.with_refresh_delay(std::time::Duration::from_millis(50)),
	);
	let identity = make_identity("u1");

	seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(30)).await;

	let handles: Vec<_> = (0..concurrency)
		.map(|_| {
			let custodian = custodian.clone();
			let identity = identity.clone();

			tokio::spawn(async move { custodian.ensure_fresh(&identity).await })
		})
		.collect();

	for handle in handles {
		let record = handle
			.await
			.expect("Concurrent ensure_fresh task should not panic.")
			.expect("Every concurrent caller should observe the refreshed record.");

		assert_eq!(record.access_token.expose(), "A2");
	}

	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
	assert_eq!(custodian.refresh_metrics.attempts(), 1);
	assert_eq!(custodian.refresh_metrics.successes(), 1);
	assert_eq!(custodian.refresh_metrics.coalesced(), concurrency as u64 - 1);
}

#[tokio::test]
async fn singleflight_coalesces_two_callers() {
	run_singleflight(2).await;
}

#[tokio::test]
async fn singleflight_coalesces_ten_callers() {
	run_singleflight(10).await;
}

#[tokio::test]
async fn singleflight_coalesces_one_hundred_callers() {
	run_singleflight(100).await;
}

#[tokio::test]
async fn singleflight_shares_a_failed_outcome() {
	let (custodian, store, provider) = build_custodian(
		ScriptedProvider::default()
			.with_refresh(Err(ProviderError::Rejected {
				status: 400,
				body: "{\"error\":\"invalid_grant\"}".into(),
			}))
			.with_refresh_delay(std::time::Duration::from_millis(50)),
	);
	let identity = make_identity("u1");

	seed_record(&store, &identity, "A1", Some("R1"), Duration::seconds(30)).await;

	let handles: Vec<_> = (0..10)
		.map(|_| {
			let custodian = custodian.clone();
			let identity = identity.clone();

			tokio::spawn(async move { custodian.ensure_fresh(&identity).await })
		})
		.collect();

	for handle in handles {
		let err = handle
			.await
			.expect("Concurrent ensure_fresh task should not panic.")
			.expect_err("Every concurrent caller should observe the shared failure.");

		assert!(matches!(err, Error::Refresh(ProviderError::Rejected { status: 400, .. })));
	}

	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn identities_refresh_independently() {
	let (custodian, store, provider) = build_custodian(
		ScriptedProvider::default()
			.with_refresh(Ok(grant("A2", Some("R2"), 3_600)))
			.with_refresh(Ok(grant("B2", Some("S2"), 3_600))),
	);
	let first = make_identity("u1");
	let second = make_identity("u2");

	seed_record(&store, &first, "A1", Some("R1"), Duration::seconds(30)).await;
	seed_record(&store, &second, "B1", Some("S1"), Duration::seconds(30)).await;

	let (record_a, record_b) = tokio::join!(
		custodian.ensure_fresh(&first),
		custodian.ensure_fresh(&second),
	);
	let record_a = record_a.expect("First identity should refresh successfully.");
	let record_b = record_b.expect("Second identity should refresh successfully.");

	assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 2);
	assert_ne!(record_a.access_token.expose(), record_b.access_token.expose());
}
