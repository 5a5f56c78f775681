//! Thread-safe in-memory [`CredentialStore`] with browser cookie-jar semantics.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{self, CookieScope, CredentialStore},
};

/// One jar entry; the value is kept in its percent-encoded wire form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredCookie {
	pub(crate) value: String,
	pub(crate) scope: CookieScope,
	pub(crate) expires_at: Option<OffsetDateTime>,
}
impl StoredCookie {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|deadline| deadline > now)
	}
}

type CookieMap = Arc<RwLock<HashMap<String, StoredCookie>>>;

/// Process-wide cookie jar keyed by the encoded cookie name.
#[derive(Clone, Debug, Default)]
pub struct CookieJar(CookieMap);
impl CookieJar {
	/// Seeds a jar from a `document.cookie`-style string (`a=1; b=2`).
	///
	/// Values are taken as already encoded; segments without `=` are skipped.
	pub fn from_cookie_header(header: &str) -> Self {
		let entries = header
			.split(';')
			.filter_map(|segment| segment.trim().split_once('='))
			.filter(|(name, _)| !name.is_empty())
			.map(|(name, value)| {
				(name.to_owned(), StoredCookie {
					value: value.to_owned(),
					scope: CookieScope::default(),
					expires_at: None,
				})
			})
			.collect();

		Self(Arc::new(RwLock::new(entries)))
	}

	pub(crate) fn from_entries(entries: HashMap<String, StoredCookie>) -> Self {
		Self(Arc::new(RwLock::new(entries)))
	}

	/// Returns the live entries, dropping expired ones from the snapshot.
	pub(crate) fn snapshot(&self) -> HashMap<String, StoredCookie> {
		let now = OffsetDateTime::now_utc();

		self.0
			.read()
			.iter()
			.filter(|(_, cookie)| cookie.is_live_at(now))
			.map(|(name, cookie)| (name.clone(), cookie.clone()))
			.collect()
	}

	fn get_at(&self, name: &str, now: OffsetDateTime) -> Option<Credential> {
		let key = store::encode(name);
		let guard = self.0.read();
		let cookie = guard.get(key.as_ref()).filter(|cookie| cookie.is_live_at(now))?;

		Some(Credential::new(store::decode(&cookie.value)))
	}

	fn set_at(&self, name: &str, value: &str, scope: &CookieScope, now: OffsetDateTime) {
		self.insert_at(name, store::encode(value).into_owned(), scope, now);
	}

	fn insert_at(&self, name: &str, wire_value: String, scope: &CookieScope, now: OffsetDateTime) {
		let key = store::encode(name).into_owned();

		if scope.removes() {
			self.0.write().remove(&key);

			return;
		}

		let cookie =
			StoredCookie { value: wire_value, scope: scope.clone(), expires_at: scope.expires_at(now) };

		self.0.write().insert(key, cookie);
	}
}
impl CredentialStore for CookieJar {
	fn get(&self, name: &str) -> Option<Credential> {
		self.get_at(name, OffsetDateTime::now_utc())
	}

	fn set(&self, name: &str, value: &str, scope: &CookieScope) {
		self.set_at(name, value, scope, OffsetDateTime::now_utc());
	}

	fn set_wire(&self, name: &str, wire_value: &str, scope: &CookieScope) {
		self.insert_at(name, wire_value.to_owned(), scope, OffsetDateTime::now_utc());
	}

	fn remove(&self, name: &str) {
		self.0.write().remove(store::encode(name).as_ref());
	}

	fn cookie_header(&self) -> Option<String> {
		let mut pairs = self
			.snapshot()
			.into_iter()
			.map(|(name, cookie)| format!("{name}={}", cookie.value))
			.collect::<Vec<_>>();

		if pairs.is_empty() {
			return None;
		}

		pairs.sort();

		Some(pairs.join("; "))
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn value_of(jar: &CookieJar, name: &str) -> Option<String> {
		jar.get(name).map(|credential| credential.expose().to_owned())
	}

	#[test]
	fn reserved_characters_survive_round_trip() {
		let jar = CookieJar::default();
		let scope = CookieScope::default();

		for value in ["a;b", "k=v=w", "100%", "%3B already encoded", "space and ü", ""] {
			jar.set("access_token_cookie", value, &scope);

			assert_eq!(value_of(&jar, "access_token_cookie").as_deref(), Some(value));
		}
	}

	#[test]
	fn names_with_reserved_characters_are_isolated() {
		let jar = CookieJar::default();
		let scope = CookieScope::default();

		jar.set("a=b", "first", &scope);
		jar.set("a", "second", &scope);

		assert_eq!(value_of(&jar, "a=b").as_deref(), Some("first"));
		assert_eq!(value_of(&jar, "a").as_deref(), Some("second"));
	}

	#[test]
	fn absent_and_removed_entries_read_as_none() {
		let jar = CookieJar::default();

		assert!(jar.get("logined").is_none());

		jar.set("logined", "true", &CookieScope::default());
		jar.remove("logined");

		assert!(jar.get("logined").is_none());
		assert!(jar.cookie_header().is_none());
	}

	#[test]
	fn expired_entries_are_hidden() {
		let jar = CookieJar::default();
		let written = macros::datetime!(2024-05-01 12:00 UTC);
		let scope = CookieScope::default().with_max_age(Duration::seconds(30));

		jar.set_at("access_token_cookie", "T1", &scope, written);

		assert!(jar.get_at("access_token_cookie", written + Duration::seconds(29)).is_some());
		assert!(jar.get_at("access_token_cookie", written + Duration::seconds(30)).is_none());
	}

	#[test]
	fn overwrite_replaces_value() {
		let jar = CookieJar::default();
		let scope = CookieScope::default();

		jar.set("access_token_cookie", "T1", &scope);
		jar.set("access_token_cookie", "T2", &scope);

		assert_eq!(value_of(&jar, "access_token_cookie").as_deref(), Some("T2"));
	}

	#[test]
	fn cookie_header_renders_wire_form_sorted() {
		let jar = CookieJar::default();
		let scope = CookieScope::default();

		jar.set("logined", "true", &scope);
		jar.set("csrf_access_token", "a;b", &scope);

		assert_eq!(jar.cookie_header().as_deref(), Some("csrf_access_token=a%3Bb; logined=true"));
	}

	#[test]
	fn wire_writes_skip_encoding_but_reads_still_decode() {
		let jar = CookieJar::default();
		let scope = CookieScope::default();

		jar.set_wire("session", "abc/def+g==", &scope);
		jar.set_wire("csrf_access_token", "a%3Bb", &scope);

		assert_eq!(
			jar.cookie_header().as_deref(),
			Some("csrf_access_token=a%3Bb; session=abc/def+g==")
		);
		assert_eq!(value_of(&jar, "session").as_deref(), Some("abc/def+g=="));
		assert_eq!(value_of(&jar, "csrf_access_token").as_deref(), Some("a;b"));

		jar.set_wire("session", "", &scope.with_max_age(Duration::ZERO));

		assert!(jar.get("session").is_none());
	}

	#[test]
	fn seeded_jar_decodes_values() {
		let jar = CookieJar::from_cookie_header("logined=true; csrf_access_token=a%3Db; junk");

		assert_eq!(value_of(&jar, "logined").as_deref(), Some("true"));
		assert_eq!(value_of(&jar, "csrf_access_token").as_deref(), Some("a=b"));
		assert!(jar.get("junk").is_none());
	}
}
