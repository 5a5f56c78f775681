//! Authorized requests with one transparent credential refresh.
//!
//! [`AuthorizedClient::execute`] runs one logical call through a small per-invocation state
//! machine:
//!
//! ```text
//! Initial -> Attempted -> Succeeded
//!                      -> NeedsRefresh -> Refreshed -> Retried -> Succeeded | Failed
//!                                      -> Failed
//! ```
//!
//! Each call owns a [`RetryBudget`] of one refresh-retry, so a descriptor reaches the wire
//! at most twice and the refresh service is invoked at most once per call. Only a 401
//! enters the refresh path; transport failures and other statuses surface on the first
//! attempt. Nothing is shared between concurrent calls: two calls that both observe a 401
//! before either refresh completes will both refresh, and the later credential write wins.
//!
//! Session credentials (bearer, anti-forgery header, cookie jar) only travel to the base
//! URL's origin. A descriptor targeting any other origin is sent bare, its `Set-Cookie`
//! headers are ignored, and a 401 from it is an ordinary [`ApplicationError::Status`].

// crates.io
use http::{
	HeaderMap, HeaderName, StatusCode,
	header::{AUTHORIZATION, COOKIE},
};
// self
use crate::{
	_prelude::*,
	auth::{AuthRejection, Credential},
	config::SessionConfig,
	error::{ApplicationError, ConfigError},
	obs::{self, FlowKind, FlowOutcome},
	refresh::{RefreshEvent, RefreshMetrics, RefreshOutcome, RefreshService},
	store::{self, CredentialStore},
	transport::{self, HttpTransport, RequestDescriptor},
};
#[cfg(feature = "reqwest")]
use crate::{refresh::HttpRefreshService, transport::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport and refresh adapter.
pub type ReqwestAuthorizedClient =
	AuthorizedClient<ReqwestTransport, HttpRefreshService<ReqwestTransport>>;

/// Classified result of a request under the refresh protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome<P> {
	/// The server accepted the request; carries the decoded body.
	Success(P),
	/// A single attempt was rejected with 401 and may be recovered by a refresh.
	///
	/// Only [`AuthorizedClient::attempt`] returns this; `execute` absorbs it.
	TransientAuthFailure(AuthRejection),
	/// Silent recovery is exhausted; the caller must drive an interactive login.
	TerminalAuthFailure(TerminalReason),
}
impl<P> AuthOutcome<P> {
	/// Converts the outcome into a plain result for typed call sites.
	///
	/// Auth failures become [`Error::ReauthenticationRequired`]; a transient failure maps to
	/// [`TerminalReason::RejectedAfterRefresh`] because no refresh will follow it here.
	pub fn into_result(self) -> Result<P> {
		match self {
			Self::Success(payload) => Ok(payload),
			Self::TransientAuthFailure(rejection) => Err(Error::ReauthenticationRequired {
				reason: TerminalReason::RejectedAfterRefresh(rejection),
			}),
			Self::TerminalAuthFailure(reason) => Err(Error::ReauthenticationRequired { reason }),
		}
	}

	/// Returns the payload when the request succeeded.
	pub fn success(self) -> Option<P> {
		match self {
			Self::Success(payload) => Some(payload),
			_ => None,
		}
	}

	/// Whether the outcome requires an interactive login.
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::TerminalAuthFailure(_))
	}
}

/// Why a call ended in [`AuthOutcome::TerminalAuthFailure`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalReason {
	/// The refresh service reported that the session cannot be renewed.
	SessionExpired,
	/// The replayed request was rejected again after a successful refresh.
	RejectedAfterRefresh(AuthRejection),
}
impl Display for TerminalReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::SessionExpired => f.write_str("refresh session expired"),
			Self::RejectedAfterRefresh(rejection) =>
				write!(f, "request still rejected after refresh ({rejection})"),
		}
	}
}

/// Refresh-retries left for one logical call.
///
/// Created fresh by every `execute`, never persisted and never shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBudget {
	remaining: u8,
}
impl RetryBudget {
	/// Budget allowing exactly one refresh-retry.
	pub const fn single() -> Self {
		Self { remaining: 1 }
	}

	/// Whether a refresh-retry is still allowed.
	pub fn is_available(&self) -> bool {
		self.remaining > 0
	}

	/// Spends one retry; returns `false` when the budget was already exhausted.
	pub fn spend(&mut self) -> bool {
		match self.remaining.checked_sub(1) {
			Some(left) => {
				self.remaining = left;

				true
			},
			None => false,
		}
	}
}
impl Default for RetryBudget {
	fn default() -> Self {
		Self::single()
	}
}

/// Wraps a transport with credential injection and the one-shot refresh protocol.
///
/// The client owns handles to the transport, the refresh service, and the shared
/// credential store. It never triggers re-authentication itself; terminal failures are
/// reported to the caller (see [`crate::session::Session::reauthenticate`]).
pub struct AuthorizedClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Refresh service invoked on a 401.
	pub refresher: Arc<R>,
	/// Process-wide cookie jar.
	pub store: Arc<dyn CredentialStore>,
	/// Endpoint, cookie, and header configuration.
	pub config: Arc<SessionConfig>,
	/// Counters for refresh round trips issued by this client.
	pub refresh_metrics: Arc<RefreshMetrics>,
}
impl<T, R> AuthorizedClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	/// Creates a client from caller-provided collaborators.
	pub fn new(
		transport: impl Into<Arc<T>>,
		refresher: impl Into<Arc<R>>,
		store: Arc<dyn CredentialStore>,
		config: impl Into<Arc<SessionConfig>>,
	) -> Self {
		Self {
			transport: transport.into(),
			refresher: refresher.into(),
			store,
			config: config.into(),
			refresh_metrics: Default::default(),
		}
	}

	/// Runs `descriptor` under the refresh protocol.
	///
	/// Returns [`AuthOutcome::Success`] or [`AuthOutcome::TerminalAuthFailure`]. Transport
	/// failures, non-401 error statuses, and malformed payloads are returned as `Err` on
	/// the first attempt without refreshing.
	pub async fn execute<P>(&self, descriptor: &RequestDescriptor) -> Result<AuthOutcome<P>>
	where
		P: DeserializeOwned,
	{
		obs::observe(FlowKind::Request, "execute", self.run_protocol(descriptor), flow_outcome).await
	}

	/// Performs one wire attempt with the current credential and no refresh.
	///
	/// Returns [`AuthOutcome::Success`] or [`AuthOutcome::TransientAuthFailure`].
	pub async fn attempt<P>(&self, descriptor: &RequestDescriptor) -> Result<AuthOutcome<P>>
	where
		P: DeserializeOwned,
	{
		let url = self.config.resolve(descriptor.target())?;
		let first_party = self.config.is_first_party(&url);
		let csrf_cookie = &self.config.cookies.csrf_access;
		let mut headers = session_headers(self.store.as_ref(), &self.config, &url, csrf_cookie)?;

		if first_party && let Some(credential) = self.store.get(&self.config.cookies.access) {
			headers.insert(AUTHORIZATION, transport::header_value(&AUTHORIZATION, &credential.bearer())?);
		}

		let request = descriptor.to_request(&url, headers)?;
		let response = self.transport.send(request).await?;
		let status = response.status();

		if first_party {
			store::apply_response_cookies(self.store.as_ref(), response.headers());
		} else {
			#[cfg(feature = "tracing")]
			tracing::debug!(
				origin = %url.origin().ascii_serialization(),
				"Target is outside the session origin; sent without credentials."
			);
		}
		if first_party && status == StatusCode::UNAUTHORIZED {
			return Ok(AuthOutcome::TransientAuthFailure(AuthRejection::from_body(
				response.body(),
			)));
		}
		if !status.is_success() {
			return Err(ApplicationError::status(status.as_u16(), response.body()).into());
		}

		Ok(AuthOutcome::Success(transport::decode_json(status.as_u16(), response.body())?))
	}

	async fn run_protocol<P>(&self, descriptor: &RequestDescriptor) -> Result<AuthOutcome<P>>
	where
		P: DeserializeOwned,
	{
		let mut budget = RetryBudget::single();

		loop {
			let rejection = match self.attempt(descriptor).await? {
				AuthOutcome::TransientAuthFailure(rejection) => rejection,
				outcome => return Ok(outcome),
			};

			if !budget.spend() {
				#[cfg(feature = "tracing")]
				tracing::warn!(%rejection, "Request rejected after refresh; giving up.");

				return Ok(AuthOutcome::TerminalAuthFailure(TerminalReason::RejectedAfterRefresh(
					rejection,
				)));
			}

			#[cfg(feature = "tracing")]
			tracing::debug!(%rejection, "Request rejected; refreshing credential.");

			match self.refresh().await? {
				RefreshOutcome::NewCredential { credential, csrf } => {
					self.store_renewed(&self.config.cookies.access, &credential);

					if let Some(csrf) = csrf {
						self.store_renewed(&self.config.cookies.csrf_access, &csrf);
					}
				},
				RefreshOutcome::SessionExpired => {
					#[cfg(feature = "tracing")]
					tracing::warn!("Refresh reported an expired session.");

					return Ok(AuthOutcome::TerminalAuthFailure(TerminalReason::SessionExpired));
				},
			}
		}
	}

	// A value the refresh response already set through `Set-Cookie` keeps its wire form.
	fn store_renewed(&self, name: &str, value: &Credential) {
		if self.store.get(name).as_ref() != Some(value) {
			self.store.set(name, value.expose(), &self.config.cookie_scope);
		}
	}

	async fn refresh(&self) -> Result<RefreshOutcome> {
		self.refresh_metrics.record(RefreshEvent::Issued);

		obs::observe(FlowKind::Refresh, "refresh", self.refresher.refresh(), |result| {
			let (event, outcome) = match result {
				Ok(RefreshOutcome::NewCredential { .. }) =>
					(RefreshEvent::Renewed, FlowOutcome::Success),
				Ok(RefreshOutcome::SessionExpired) =>
					(RefreshEvent::SessionExpired, FlowOutcome::Reauthenticate),
				Err(_e) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(error = %_e, "Credential refresh failed.");

					(RefreshEvent::Failed, FlowOutcome::Failure)
				},
			};

			self.refresh_metrics.record(event);

			outcome
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl AuthorizedClient<ReqwestTransport, HttpRefreshService<ReqwestTransport>> {
	/// Builds a client whose transport and refresh adapter share one reqwest client.
	pub fn with_reqwest(
		transport: ReqwestTransport,
		store: Arc<dyn CredentialStore>,
		config: SessionConfig,
	) -> Self {
		let transport = Arc::new(transport);
		let config = Arc::new(config);
		let refresher = HttpRefreshService::<ReqwestTransport>::new(
			transport.clone(),
			store.clone(),
			config.clone(),
		);

		Self::new(transport, Arc::new(refresher), store, config)
	}
}
impl<T, R> Clone for AuthorizedClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			refresher: self.refresher.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T, R> Debug for AuthorizedClient<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_attempts", &self.refresh_metrics.attempts())
			.finish()
	}
}

/// Flow label for a call that ran under the refresh protocol.
pub(crate) fn flow_outcome<P>(result: &Result<AuthOutcome<P>>) -> FlowOutcome {
	match result {
		Ok(AuthOutcome::TerminalAuthFailure(_)) => FlowOutcome::Reauthenticate,
		Ok(_) => FlowOutcome::Success,
		Err(_) => FlowOutcome::Failure,
	}
}

/// Headers a browser would attach for the session when calling `url`: the cookie jar and
/// the anti-forgery token stored under `csrf_cookie`. Empty for other origins.
pub(crate) fn session_headers(
	store: &dyn CredentialStore,
	config: &SessionConfig,
	url: &Url,
	csrf_cookie: &str,
) -> Result<HeaderMap, ConfigError> {
	let mut headers = HeaderMap::new();

	if !config.is_first_party(url) {
		return Ok(headers);
	}
	if config.send_cookies
		&& let Some(cookies) = store.cookie_header()
	{
		headers.insert(COOKIE, transport::header_value(&COOKIE, &cookies)?);
	}
	if let Some(csrf) = store.get(csrf_cookie) {
		let name =
			HeaderName::from_bytes(config.csrf_header.as_bytes()).map_err(http::Error::from)?;
		let value = transport::header_value(&name, csrf.expose())?;

		headers.insert(name, value);
	}

	Ok(headers)
}
