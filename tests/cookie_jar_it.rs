mod common;

// std
use std::{sync::Arc, thread};
// crates.io
use time::Duration;
// self
use common::stored;
use diary_session::store::{self, CookieJar, CookieScope, CredentialStore, SameSite};

#[test]
fn encoded_values_round_trip_unchanged() {
	let jar = CookieJar::default();

	for value in ["a;b", "k=v", "100%", "%41%42", "two words", "한글"] {
		jar.set("access_token_cookie", value, &CookieScope::default());

		assert_eq!(stored(&jar, "access_token_cookie").as_deref(), Some(value));
	}
}

#[test]
fn seeding_from_document_cookie_decodes_values() {
	let jar = CookieJar::from_cookie_header("logined=true; csrf_access_token=a%3Bb; broken");

	assert_eq!(stored(&jar, "logined").as_deref(), Some("true"));
	assert_eq!(stored(&jar, "csrf_access_token").as_deref(), Some("a;b"));
	assert!(stored(&jar, "broken").is_none());
}

#[test]
fn non_positive_max_age_removes_entry() {
	let jar = CookieJar::default();

	jar.set("logined", "true", &CookieScope::default());
	jar.set(
		"logined",
		"true",
		&CookieScope::at_path("/").with_max_age(Duration::ZERO).with_same_site(SameSite::Strict),
	);

	assert!(stored(&jar, "logined").is_none());
	assert!(jar.cookie_header().is_none());
}

#[test]
fn concurrent_writers_never_expose_partial_values() {
	let jar = Arc::new(CookieJar::default());
	let writers = (0..8)
		.map(|i| {
			let jar = jar.clone();

			thread::spawn(move || {
				for n in 0..200 {
					jar.set("access_token_cookie", &format!("token-{i}-{n}"), &CookieScope::default());

					let seen = stored(jar.as_ref(), "access_token_cookie")
						.expect("Credential should stay present while writers run.");

					assert!(seen.starts_with("token-"), "Unexpected value {seen}.");
				}
			})
		})
		.collect::<Vec<_>>();

	for writer in writers {
		writer.join().expect("Writer thread should not panic.");
	}

	assert!(stored(jar.as_ref(), "access_token_cookie").is_some());
}

#[test]
fn server_issued_cookies_are_returned_as_sent() {
	let jar = CookieJar::default();

	store::apply_set_cookie(&jar, "session=abc/def+g==; Path=/");
	store::apply_set_cookie(&jar, "logined=true; Path=/; SameSite=Lax");

	assert_eq!(jar.cookie_header().as_deref(), Some("logined=true; session=abc/def+g=="));
	assert_eq!(stored(&jar, "session").as_deref(), Some("abc/def+g=="));
}
