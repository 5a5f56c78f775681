//! Credential storage contract and the cookie-jar backends that implement it.
//!
//! A [`CredentialStore`] behaves like a browser cookie jar scoped to the diary origin:
//! values the client writes are percent-encoded on write and decoded on read, values the
//! server issues are kept byte for byte, each entry carries a [`CookieScope`], and expired
//! entries read as absent. Absence is a normal state
//! (first visit, logged-out user), so the contract has no error channel.

pub mod file;
pub mod memory;

pub use file::FileCookieJar;
pub use memory::CookieJar;

// std
use std::borrow::Cow;
// crates.io
use http::{HeaderMap, header::SET_COOKIE};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::Credential};

/// Cookie-jar contract shared by every in-flight request.
///
/// Writes replace a single entry at a time, so readers observe either the previous
/// value or the new one, never a partial write.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads a named value, decoding it the same way [`CredentialStore::set`] encodes it.
	fn get(&self, name: &str) -> Option<Credential>;

	/// Persists `value` under `name`; a non-positive `max_age` removes the entry instead.
	fn set(&self, name: &str, value: &str, scope: &CookieScope);

	/// Persists a value already in wire form, as a server sent it in `Set-Cookie`.
	///
	/// The value is echoed back unchanged in [`CredentialStore::cookie_header`]; removal
	/// follows the same rule as [`CredentialStore::set`].
	fn set_wire(&self, name: &str, wire_value: &str, scope: &CookieScope);

	/// Deletes the named entry if present.
	fn remove(&self, name: &str);

	/// Renders every live entry as a `Cookie` request header value.
	fn cookie_header(&self) -> Option<String>;
}

/// `SameSite` policy attached to a stored cookie.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
	/// Only sent on same-site requests.
	Strict,
	#[default]
	/// Sent on same-site requests and top-level navigations.
	Lax,
	/// Sent on every request.
	None,
}
impl SameSite {
	fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_lowercase().as_str() {
			"strict" => Some(Self::Strict),
			"lax" => Some(Self::Lax),
			"none" => Some(Self::None),
			_ => None,
		}
	}
}

/// Path and lifetime attached to a stored value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieScope {
	/// Path the cookie applies to.
	pub path: String,
	/// Lifetime relative to the write; `None` keeps the value for the session.
	pub max_age: Option<Duration>,
	/// Cross-site policy.
	pub same_site: SameSite,
	/// Restrict to secure transports.
	pub secure: bool,
	/// Hidden from scripts in a browser.
	pub http_only: bool,
}
impl CookieScope {
	/// Session-lifetime scope at the provided path.
	pub fn at_path(path: impl Into<String>) -> Self {
		Self { path: path.into(), ..Self::default() }
	}

	/// Overrides the lifetime.
	pub fn with_max_age(mut self, max_age: Duration) -> Self {
		self.max_age = Some(max_age);

		self
	}

	/// Overrides the `SameSite` policy.
	pub fn with_same_site(mut self, same_site: SameSite) -> Self {
		self.same_site = same_site;

		self
	}

	pub(crate) fn expires_at(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
		self.max_age.map(|age| now.saturating_add(age))
	}

	pub(crate) fn removes(&self) -> bool {
		self.max_age.is_some_and(|age| !age.is_positive())
	}
}
impl Default for CookieScope {
	fn default() -> Self {
		Self {
			path: "/".into(),
			max_age: None,
			same_site: SameSite::default(),
			secure: false,
			http_only: false,
		}
	}
}

/// Parsed `Set-Cookie` response header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCookie {
	/// Decoded cookie name.
	pub name: String,
	/// Decoded cookie value.
	pub value: String,
	/// Value exactly as it appeared on the wire.
	pub raw_value: String,
	/// Attributes that came with the cookie.
	pub scope: CookieScope,
}
impl SetCookie {
	/// Parses a header value; returns `None` when the leading `name=value` pair is missing.
	pub fn parse(header: &str) -> Option<Self> {
		Self::parse_at(header, OffsetDateTime::now_utc())
	}

	fn parse_at(header: &str, now: OffsetDateTime) -> Option<Self> {
		let mut parts = header.split(';');
		let (raw_name, raw_value) = parts.next()?.split_once('=')?;
		let raw_name = raw_name.trim();

		if raw_name.is_empty() {
			return None;
		}

		let raw_value = raw_value.trim().trim_matches('"');
		let mut scope = CookieScope::default();
		let mut max_age = None;
		let mut expires = None;

		for attribute in parts {
			let (key, value) = match attribute.split_once('=') {
				Some((key, value)) => (key.trim(), value.trim()),
				None => (attribute.trim(), ""),
			};

			match key.to_ascii_lowercase().as_str() {
				"path" if !value.is_empty() => scope.path = value.to_owned(),
				"max-age" => max_age = value.parse::<i64>().ok().map(Duration::seconds),
				"expires" => expires = parse_http_date(value),
				"samesite" =>
					if let Some(policy) = SameSite::parse(value) {
						scope.same_site = policy;
					},
				"secure" => scope.secure = true,
				"httponly" => scope.http_only = true,
				_ => {},
			}
		}

		scope.max_age = max_age.or_else(|| expires.map(|moment| moment - now));

		Some(Self {
			name: decode(raw_name).into_owned(),
			value: decode(raw_value).into_owned(),
			raw_value: raw_value.to_owned(),
			scope,
		})
	}
}

/// Applies a `Set-Cookie` header to `store`, returning the affected cookie name.
///
/// The value is stored in its wire form, so the next `Cookie` header carries exactly what
/// the server issued.
pub fn apply_set_cookie(store: &dyn CredentialStore, header: &str) -> Option<String> {
	let cookie = SetCookie::parse(header)?;

	store.set_wire(&cookie.name, &cookie.raw_value, &cookie.scope);

	Some(cookie.name)
}

/// Applies every `Set-Cookie` header of a first-party response.
pub(crate) fn apply_response_cookies(store: &dyn CredentialStore, headers: &HeaderMap) {
	for header in headers.get_all(SET_COOKIE) {
		match header.to_str() {
			Ok(header) => {
				apply_set_cookie(store, header);
			},
			Err(_) => {
				#[cfg(feature = "tracing")]
				tracing::debug!("Skipping a Set-Cookie header that is not visible ASCII.");
			},
		}
	}
}

/// Error type produced by persistent store backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

fn parse_http_date(value: &str) -> Option<OffsetDateTime> {
	OffsetDateTime::parse(value, &Rfc2822).ok().or_else(|| {
		let numeric = value.strip_suffix("GMT")?;

		OffsetDateTime::parse(&format!("{numeric}+0000"), &Rfc2822).ok()
	})
}

pub(crate) fn encode(raw: &str) -> Cow<'_, str> {
	urlencoding::encode(raw)
}

pub(crate) fn decode(wire: &str) -> Cow<'_, str> {
	urlencoding::decode(wire).unwrap_or(Cow::Borrowed(wire))
}
