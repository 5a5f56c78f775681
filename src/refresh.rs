//! Refresh contract and the adapter for the first-party refresh endpoint.
//!
//! A [`RefreshService`] performs exactly one round trip and answers with a
//! [`RefreshOutcome`]. [`HttpRefreshService`] talks to the diary server: it forwards the
//! refresh cookie together with its anti-forgery token and parses the answer at a single
//! typed boundary, so callers never inspect raw server strings.

mod metrics;

pub use metrics::RefreshMetrics;
pub(crate) use metrics::RefreshEvent;

// crates.io
use http::header::SET_COOKIE;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	client,
	config::SessionConfig,
	error::ApplicationError,
	store::{self, CredentialStore, SetCookie},
	transport::{self, HttpResponse, HttpTransport, RequestDescriptor},
};

/// Future returned by [`RefreshService::refresh`].
pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = Result<RefreshOutcome>> + 'a + Send>>;

/// Exchanges the current session state for a new access credential.
///
/// `Err` is reserved for transport and protocol failures; an unrecoverable session is a
/// normal [`RefreshOutcome::SessionExpired`] answer and must never be retried internally.
pub trait RefreshService
where
	Self: Send + Sync,
{
	/// Performs a single refresh round trip.
	fn refresh(&self) -> RefreshFuture<'_>;
}

/// Result of one refresh round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The server issued a new access credential.
	NewCredential {
		/// Replacement bearer credential.
		credential: Credential,
		/// Rotated anti-forgery token, when the response carried one.
		csrf: Option<Credential>,
	},
	/// The session cannot be refreshed; interactive login is required.
	SessionExpired,
}

#[derive(Debug, Deserialize)]
struct RefreshBody {
	result: bool,
	#[serde(default)]
	access_token: Option<String>,
}

/// [`RefreshService`] backed by the diary server's refresh endpoint.
pub struct HttpRefreshService<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	config: Arc<SessionConfig>,
}
impl<T> HttpRefreshService<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an adapter that shares the transport, store, and configuration with the client.
	pub fn new(
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		config: impl Into<Arc<SessionConfig>>,
	) -> Self {
		Self { transport: transport.into(), store, config: config.into() }
	}

	async fn refresh_once(&self) -> Result<RefreshOutcome> {
		let url = self.config.resolve(&self.config.endpoints.refresh)?;
		let headers = client::session_headers(
			self.store.as_ref(),
			&self.config,
			&url,
			&self.config.cookies.csrf_refresh,
		)?;
		let request =
			RequestDescriptor::post(self.config.endpoints.refresh.as_str()).to_request(&url, headers)?;
		let response = self.transport.send(request).await?;

		self.classify(response)
	}

	fn classify(&self, response: HttpResponse) -> Result<RefreshOutcome> {
		let status = response.status();

		// Rotated refresh cookies or expiries arrive with any status.
		store::apply_response_cookies(self.store.as_ref(), response.headers());

		match status.as_u16() {
			_ if status.is_success() => {},
			401 | 403 | 422 => return Ok(RefreshOutcome::SessionExpired),
			code => return Err(ApplicationError::status(code, response.body()).into()),
		}

		let body: RefreshBody = transport::decode_json(status.as_u16(), response.body())?;

		if !body.result {
			return Ok(RefreshOutcome::SessionExpired);
		}

		let cookies = response
			.headers()
			.get_all(SET_COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.filter_map(SetCookie::parse)
			.filter(|cookie| !cookie.scope.removes())
			.collect::<Vec<_>>();
		let from_cookie = |name: &str| {
			cookies
				.iter()
				.find(|cookie| cookie.name == name && !cookie.value.is_empty())
				.map(|cookie| Credential::new(cookie.value.as_str()))
		};
		let credential = body
			.access_token
			.filter(|token| !token.is_empty())
			.map(Credential::new)
			.or_else(|| from_cookie(&self.config.cookies.access))
			.ok_or(ApplicationError::MissingAccessToken)?;
		let csrf = from_cookie(&self.config.cookies.csrf_access);

		Ok(RefreshOutcome::NewCredential { credential, csrf })
	}
}
impl<T> RefreshService for HttpRefreshService<T>
where
	T: ?Sized + HttpTransport,
{
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin(self.refresh_once())
	}
}
impl<T> Debug for HttpRefreshService<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpRefreshService")
			.field("endpoint", &self.config.endpoints.refresh)
			.finish()
	}
}
