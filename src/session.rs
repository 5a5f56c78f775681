//! Session lifecycle on top of [`AuthorizedClient`]: login detection, profile lookup,
//! teardown, and the interactive-recovery path taken after a terminal auth failure.

// self
use crate::{
	_prelude::*,
	client::{self, AuthOutcome, AuthorizedClient, TerminalReason, session_headers},
	error::ApplicationError,
	obs::{self, FlowKind, FlowOutcome},
	refresh::RefreshService,
	store::{self, CredentialStore},
	transport::{self, HttpTransport, RequestDescriptor},
};

/// Profile returned by the user-info endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Server-side user identifier.
	pub id: i64,
	/// Display name.
	#[serde(alias = "username", default)]
	pub nickname: String,
	/// Profile image URL.
	#[serde(default)]
	pub profile: String,
	/// Thumbnail image URL.
	#[serde(default)]
	pub thumbnail: String,
}

/// Where the host should send the user after silent recovery failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
	/// Login entry point.
	pub location: Url,
	/// Terminal failure that caused the redirect.
	pub reason: TerminalReason,
}

/// Result of [`Session::auto_login`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutoLogin {
	/// No credential is stored; nothing was sent.
	Anonymous,
	/// The stored credential (possibly after a refresh) identifies this user.
	Authenticated(UserProfile),
	/// Local session state was cleared; the host must follow the redirect.
	Reauthenticate(Redirect),
}

#[derive(Debug, Deserialize)]
struct LoginUrlBody {
	kakao_oauth_url: Url,
}

#[derive(Debug, Deserialize)]
struct TeardownBody {
	result: bool,
}

/// Session operations for one diary server.
pub struct Session<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	client: AuthorizedClient<T, R>,
}
impl<T, R> Session<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	/// Wraps an authorized client.
	pub fn new(client: AuthorizedClient<T, R>) -> Self {
		Self { client }
	}

	/// Underlying authorized client.
	pub fn client(&self) -> &AuthorizedClient<T, R> {
		&self.client
	}

	/// Whether the external login flow has marked the session as established.
	pub fn is_logged_in(&self) -> bool {
		self.client
			.store
			.get(&self.client.config.cookies.logged_in)
			.is_some_and(|marker| marker.expose() == "true")
	}

	/// Looks up the third-party login URL. The endpoint is anonymous.
	pub async fn login_url(&self) -> Result<Url> {
		let descriptor = RequestDescriptor::get(self.client.config.endpoints.login_url.as_str());
		let body: LoginUrlBody = self.anonymous(&descriptor).await?;

		Ok(body.kakao_oauth_url)
	}

	/// Fetches the logged-in user's profile under the refresh protocol.
	pub async fn user_info(&self) -> Result<AuthOutcome<UserProfile>> {
		let descriptor = RequestDescriptor::get(self.client.config.endpoints.user_info.as_str());

		obs::observe(
			FlowKind::UserInfo,
			"user_info",
			self.client.execute(&descriptor),
			client::flow_outcome,
		)
		.await
	}

	/// Restores a session from stored credentials.
	///
	/// Without a stored access credential no request is sent. A terminal auth failure runs
	/// [`Session::reauthenticate`] before returning.
	pub async fn auto_login(&self) -> Result<AutoLogin> {
		if self.client.store.get(&self.client.config.cookies.access).is_none() {
			return Ok(AutoLogin::Anonymous);
		}

		match self.user_info().await? {
			AuthOutcome::Success(profile) => Ok(AutoLogin::Authenticated(profile)),
			AuthOutcome::TransientAuthFailure(rejection) => Ok(AutoLogin::Reauthenticate(
				self.reauthenticate(TerminalReason::RejectedAfterRefresh(rejection)).await,
			)),
			AuthOutcome::TerminalAuthFailure(reason) =>
				Ok(AutoLogin::Reauthenticate(self.reauthenticate(reason).await)),
		}
	}

	/// Asks the server to tear the session down.
	///
	/// Returns the server's `result`. Session cookies are cleared locally only when it is
	/// `true`; cookies the server expires through `Set-Cookie` are applied either way.
	pub async fn logout(&self) -> Result<bool> {
		let descriptor = RequestDescriptor::get(self.client.config.endpoints.logout.as_str());
		let accepted = obs::observe(
			FlowKind::Logout,
			"logout",
			self.anonymous::<TeardownBody>(&descriptor),
			|reply| match reply {
				Ok(TeardownBody { result: true }) => FlowOutcome::Success,
				_ => FlowOutcome::Failure,
			},
		)
		.await?
		.result;

		if accepted {
			self.clear_local();
		}

		Ok(accepted)
	}

	/// Ends the session after a terminal auth failure.
	///
	/// Server teardown is best effort; local session cookies are always cleared and the
	/// returned redirect always points at the login entry.
	pub async fn reauthenticate(&self, reason: TerminalReason) -> Redirect {
		match self.logout().await {
			Ok(true) => {},
			Ok(false) => {
				#[cfg(feature = "tracing")]
				tracing::warn!("Server declined session teardown.");
			},
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_e, "Session teardown failed.");
			},
		}

		self.clear_local();

		#[cfg(feature = "tracing")]
		tracing::info!(%reason, "Redirecting to login.");

		let config = &self.client.config;
		let location =
			config.resolve(&config.endpoints.login_entry).unwrap_or_else(|_| config.base_url.clone());

		Redirect { location, reason }
	}

	fn clear_local(&self) {
		for name in self.client.config.cookies.session_markers() {
			self.client.store.remove(name);
		}
	}

	async fn anonymous<P>(&self, descriptor: &RequestDescriptor) -> Result<P>
	where
		P: DeserializeOwned,
	{
		let config = &self.client.config;
		let store: &dyn CredentialStore = self.client.store.as_ref();
		let url = config.resolve(descriptor.target())?;
		let headers = session_headers(store, config, &url, &config.cookies.csrf_access)?;
		let response = self.client.transport.send(descriptor.to_request(&url, headers)?).await?;

		if config.is_first_party(&url) {
			store::apply_response_cookies(store, response.headers());
		}

		let status = response.status();

		if !status.is_success() {
			return Err(ApplicationError::status(status.as_u16(), response.body()).into());
		}

		Ok(transport::decode_json(status.as_u16(), response.body())?)
	}
}
impl<T, R> Debug for Session<T, R>
where
	T: ?Sized + HttpTransport,
	R: ?Sized + RefreshService,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("client", &self.client).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn profile_accepts_username_alias_and_missing_images() {
		let profile: UserProfile = serde_json::from_str(r#"{"id":7,"username":"mina"}"#)
			.expect("Profile with alias should decode.");

		assert_eq!(profile, UserProfile {
			id: 7,
			nickname: "mina".into(),
			profile: String::new(),
			thumbnail: String::new(),
		});
	}
}
