//! Session configuration: server location, endpoint paths, cookie names, and header names.
//!
//! Defaults mirror the first-party diary server, so most hosts only supply the base URL:
//!
//! ```
//! use diary_session::config::SessionConfig;
//!
//! let config = SessionConfig::builder("https://diary.example.com".parse().unwrap())
//! 	.build()
//! 	.expect("Default configuration should validate.");
//!
//! assert_eq!(config.cookies.access, "access_token_cookie");
//! ```

// crates.io
use http::HeaderName;
// self
use crate::{_prelude::*, error::ConfigError, store::CookieScope};

/// Relative paths of the endpoints the session layer talks to.
///
/// Every path except [`SessionEndpoints::login_entry`] must stay on the base URL's origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEndpoints {
	/// Access-token refresh.
	pub refresh: String,
	/// Session teardown (logout).
	pub logout: String,
	/// Profile of the logged-in user.
	pub user_info: String,
	/// Lookup of the third-party login URL.
	pub login_url: String,
	/// Where the user lands after a terminal auth failure.
	pub login_entry: String,
	/// Calendar feed of every entry.
	pub diary_events: String,
	/// Entries of one day; the date is sent as the `date` query parameter.
	pub diary_entries: String,
	/// Creation of a new entry.
	pub diary_save: String,
	/// Prefix for replacing an entry; the entry id is appended as the last segment.
	pub diary_update: String,
}
impl Default for SessionEndpoints {
	fn default() -> Self {
		Self {
			refresh: "/token/refresh".into(),
			logout: "/token/remove".into(),
			user_info: "/userinfo".into(),
			login_url: "/oauth/url".into(),
			login_entry: "/".into(),
			diary_events: "/diary/events".into(),
			diary_entries: "/diary/event".into(),
			diary_save: "/diary/save".into(),
			diary_update: "/diary/update".into(),
		}
	}
}

/// Names of the cookies that make up a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieNames {
	/// Bearer access credential.
	pub access: String,
	/// Refresh credential; only ever forwarded, never read.
	pub refresh: String,
	/// Anti-forgery token echoed on ordinary requests.
	pub csrf_access: String,
	/// Anti-forgery token echoed on refresh requests.
	pub csrf_refresh: String,
	/// `"true"` once the external login flow has established a session.
	pub logged_in: String,
}
impl CookieNames {
	/// Every cookie that logout clears locally.
	pub fn session_markers(&self) -> [&str; 5] {
		[&self.access, &self.refresh, &self.csrf_access, &self.csrf_refresh, &self.logged_in]
	}
}
impl Default for CookieNames {
	fn default() -> Self {
		Self {
			access: "access_token_cookie".into(),
			refresh: "refresh_token_cookie".into(),
			csrf_access: "csrf_access_token".into(),
			csrf_refresh: "csrf_refresh_token".into(),
			logged_in: "logined".into(),
		}
	}
}

/// Errors raised while validating a [`SessionConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum SessionConfigError {
	/// Base URL must be reachable over HTTP(S).
	#[error("The base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Rejected URL.
		url: String,
	},
	/// A cookie name was blank or contained separators.
	#[error("Cookie name for {cookie} is invalid: `{name}`.")]
	InvalidCookieName {
		/// Which cookie slot failed validation.
		cookie: &'static str,
		/// Supplied name.
		name: String,
	},
	/// The anti-forgery header name is not a valid HTTP header.
	#[error("CSRF header name is invalid: `{name}`.")]
	InvalidHeaderName {
		/// Supplied name.
		name: String,
	},
	/// An endpoint path cannot be joined onto the base URL or leaves its origin.
	#[error("The {endpoint} endpoint path is invalid: `{path}`.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Supplied path.
		path: String,
	},
}

/// Validated configuration shared by the client, refresh adapter, and session helpers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Origin every relative path is resolved against.
	pub base_url: Url,
	/// Endpoint paths.
	pub endpoints: SessionEndpoints,
	/// Cookie names.
	pub cookies: CookieNames,
	/// Header carrying the anti-forgery token.
	pub csrf_header: String,
	/// Scope used when the client writes credentials into the store.
	pub cookie_scope: CookieScope,
	/// Forward the jar as a `Cookie` header, like a browser with `credentials: 'include'`.
	pub send_cookies: bool,
}
impl SessionConfig {
	/// Creates a builder seeded with defaults for the provided base URL.
	pub fn builder(base_url: Url) -> SessionConfigBuilder {
		SessionConfigBuilder::new(base_url)
	}

	/// Resolves a path (or absolute URL) against [`SessionConfig::base_url`].
	pub fn resolve(&self, target: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(target)
			.map_err(|source| ConfigError::InvalidUrl { target: target.to_owned(), source })
	}

	/// Whether `url` shares the base URL's origin, i.e. may carry session credentials.
	pub fn is_first_party(&self, url: &Url) -> bool {
		url.origin() == self.base_url.origin()
	}

	fn validate(&self) -> Result<(), SessionConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(SessionConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}

		let cookies = [
			("access", &self.cookies.access),
			("refresh", &self.cookies.refresh),
			("csrf_access", &self.cookies.csrf_access),
			("csrf_refresh", &self.cookies.csrf_refresh),
			("logged_in", &self.cookies.logged_in),
		];

		for (cookie, name) in cookies {
			validate_cookie_name(cookie, name)?;
		}

		if HeaderName::from_bytes(self.csrf_header.as_bytes()).is_err() {
			return Err(SessionConfigError::InvalidHeaderName { name: self.csrf_header.clone() });
		}

		let endpoints = [
			("refresh", &self.endpoints.refresh),
			("logout", &self.endpoints.logout),
			("user_info", &self.endpoints.user_info),
			("login_url", &self.endpoints.login_url),
			("diary_events", &self.endpoints.diary_events),
			("diary_entries", &self.endpoints.diary_entries),
			("diary_save", &self.endpoints.diary_save),
			("diary_update", &self.endpoints.diary_update),
		];

		for (endpoint, path) in endpoints {
			let first_party = self.resolve(path).is_ok_and(|url| self.is_first_party(&url));

			if path.trim().is_empty() || !first_party {
				return Err(SessionConfigError::InvalidEndpoint { endpoint, path: path.clone() });
			}
		}

		// The login entry may live on another origin (a hosted login page).
		let login_entry = &self.endpoints.login_entry;

		if login_entry.trim().is_empty() || self.resolve(login_entry).is_err() {
			return Err(SessionConfigError::InvalidEndpoint {
				endpoint: "login_entry",
				path: login_entry.clone(),
			});
		}

		Ok(())
	}
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug)]
pub struct SessionConfigBuilder {
	config: SessionConfig,
}
impl SessionConfigBuilder {
	/// Creates a new builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: SessionConfig {
				base_url,
				endpoints: SessionEndpoints::default(),
				cookies: CookieNames::default(),
				csrf_header: "X-CSRF-TOKEN".into(),
				cookie_scope: CookieScope::default(),
				send_cookies: true,
			},
		}
	}

	/// Overrides the endpoint paths.
	pub fn endpoints(mut self, endpoints: SessionEndpoints) -> Self {
		self.config.endpoints = endpoints;

		self
	}

	/// Overrides the cookie names.
	pub fn cookies(mut self, cookies: CookieNames) -> Self {
		self.config.cookies = cookies;

		self
	}

	/// Overrides the anti-forgery header name.
	pub fn csrf_header(mut self, name: impl Into<String>) -> Self {
		self.config.csrf_header = name.into();

		self
	}

	/// Overrides the scope used for credential writes.
	pub fn cookie_scope(mut self, scope: CookieScope) -> Self {
		self.config.cookie_scope = scope;

		self
	}

	/// Toggles forwarding of the `Cookie` header.
	pub fn send_cookies(mut self, enabled: bool) -> Self {
		self.config.send_cookies = enabled;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn validate_cookie_name(cookie: &'static str, name: &str) -> Result<(), SessionConfigError> {
	let invalid = name.is_empty()
		|| name.chars().any(|c| c.is_control() || c.is_whitespace() || matches!(c, ';' | '=' | ','));

	if invalid {
		Err(SessionConfigError::InvalidCookieName { cookie, name: name.to_owned() })
	} else {
		Ok(())
	}
}
