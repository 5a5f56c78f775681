//! File-backed [`CredentialStore`] for hosts that keep the session across restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{
		CookieScope, CredentialStore, StoreError,
		memory::{CookieJar, StoredCookie},
	},
};

/// Persists the cookie jar to a JSON file after each mutation.
///
/// Reads are served from memory. A failed write is logged and the in-memory value
/// still wins, because the contract has no error channel.
#[derive(Clone, Debug)]
pub struct FileCookieJar {
	path: PathBuf,
	jar: CookieJar,
	write_lock: Arc<Mutex<()>>,
}
impl FileCookieJar {
	/// Opens (or creates) a jar at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self {
			path,
			jar: CookieJar::from_entries(snapshot),
			write_lock: Default::default(),
		})
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<String, StoredCookie>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let entries: Vec<(String, StoredCookie)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self) -> Result<(), StoreError> {
		let _serialized_writes = self.write_lock.lock();
		let mut snapshot = self.jar.snapshot().into_iter().collect::<Vec<_>>();

		snapshot.sort_by(|a, b| a.0.cmp(&b.0));

		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize cookie jar: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn persist_or_log(&self) {
		if let Err(e) = self.persist() {
			#[cfg(feature = "tracing")]
			tracing::warn!(path = %self.path.display(), error = %e, "Cookie jar persistence failed.");
			#[cfg(not(feature = "tracing"))]
			let _ = e;
		}
	}
}
impl CredentialStore for FileCookieJar {
	fn get(&self, name: &str) -> Option<Credential> {
		self.jar.get(name)
	}

	fn set(&self, name: &str, value: &str, scope: &CookieScope) {
		self.jar.set(name, value, scope);
		self.persist_or_log();
	}

	fn set_wire(&self, name: &str, wire_value: &str, scope: &CookieScope) {
		self.jar.set_wire(name, wire_value, scope);
		self.persist_or_log();
	}

	fn remove(&self, name: &str) {
		self.jar.remove(name);
		self.persist_or_log();
	}

	fn cookie_header(&self) -> Option<String> {
		self.jar.cookie_header()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"diary_session_file_jar_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path("reload");
		let jar = FileCookieJar::open(&path).expect("Failed to open file cookie jar.");

		jar.set("access_token_cookie", "T1;=%", &CookieScope::default());
		jar.set("logined", "true", &CookieScope::default());
		jar.remove("logined");
		drop(jar);

		let reopened = FileCookieJar::open(&path).expect("Failed to reopen file cookie jar.");

		assert_eq!(
			reopened.get("access_token_cookie").map(|value| value.expose().to_owned()).as_deref(),
			Some("T1;=%")
		);
		assert!(reopened.get("logined").is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cookie jar {}: {e}", path.display())
		});
	}

	#[test]
	fn server_issued_cookie_survives_reload_in_wire_form() {
		let path = temp_path("wire");
		let jar = FileCookieJar::open(&path).expect("Failed to open file cookie jar.");

		crate::store::apply_set_cookie(&jar, "session=abc/def+g==; Path=/; HttpOnly");
		drop(jar);

		let reopened = FileCookieJar::open(&path).expect("Failed to reopen file cookie jar.");

		assert_eq!(reopened.cookie_header().as_deref(), Some("session=abc/def+g=="));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cookie jar {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path("corrupt");

		fs::write(&path, b"not json").expect("Failed to write corrupt snapshot fixture.");

		let err = FileCookieJar::open(&path).expect_err("Corrupt snapshot should be rejected.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary cookie jar {}: {e}", path.display())
		});
	}
}
