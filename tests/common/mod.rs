#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use tokio::sync::Barrier;
// self
use diary_session::{
	auth::Credential,
	config::SessionConfig,
	error::Result,
	refresh::{RefreshFuture, RefreshOutcome, RefreshService},
	store::{CookieJar, CookieScope, CredentialStore},
	url::Url,
};

pub fn config_for(base: &str) -> SessionConfig {
	SessionConfig::builder(Url::parse(base).expect("Base URL fixture should parse."))
		.build()
		.expect("Configuration fixture should validate.")
}

pub fn jar_with(entries: &[(&str, &str)]) -> Arc<CookieJar> {
	let jar = CookieJar::default();

	for (name, value) in entries {
		jar.set(name, value, &CookieScope::default());
	}

	Arc::new(jar)
}

pub fn stored(store: &dyn CredentialStore, name: &str) -> Option<String> {
	store.get(name).map(|credential| credential.expose().to_owned())
}

pub fn new_credential(token: &str) -> RefreshOutcome {
	RefreshOutcome::NewCredential { credential: Credential::new(token), csrf: None }
}

/// Refresh service that replays canned outcomes and counts invocations.
#[derive(Default)]
pub struct ScriptedRefresher {
	outcomes: Mutex<VecDeque<RefreshOutcome>>,
	calls: AtomicUsize,
	gate: Option<Arc<Barrier>>,
}
impl ScriptedRefresher {
	pub fn answering(outcomes: impl IntoIterator<Item = RefreshOutcome>) -> Self {
		Self { outcomes: Mutex::new(outcomes.into_iter().collect()), ..Default::default() }
	}

	/// Holds every refresh until `gate` releases, so concurrent callers overlap.
	pub fn gated(mut self, gate: Arc<Barrier>) -> Self {
		self.gate = Some(gate);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl RefreshService for ScriptedRefresher {
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(gate) = &self.gate {
				gate.wait().await;
			}

			let outcome: Result<RefreshOutcome> =
				Ok(self.outcomes.lock().pop_front().unwrap_or(RefreshOutcome::SessionExpired));

			outcome
		})
	}
}
