//! Single parsing boundary for authentication-failure bodies.
//!
//! The server reports rejected credentials as `{"msg": "..."}`. The message is inspected
//! here once and turned into an [`AuthRejection`]; nothing else in the crate looks at raw
//! server strings.

// self
use crate::_prelude::*;

/// Why the server refused the credential on a 401 response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthRejection {
	/// No credential reached the server (cookie or header absent).
	MissingCredential,
	/// The credential was recognized but is past its expiry.
	CredentialExpired,
	/// Any other rejection; carries the server message when one was supplied.
	Other(Option<String>),
}
impl AuthRejection {
	/// Classifies a 401 response body.
	pub fn from_body(body: &[u8]) -> Self {
		#[derive(Deserialize)]
		struct Marker {
			#[serde(default)]
			msg: Option<String>,
		}

		let message = serde_json::from_slice::<Marker>(body).ok().and_then(|marker| marker.msg);

		match message {
			Some(msg) => Self::from_message(msg),
			None => Self::Other(None),
		}
	}

	fn from_message(msg: String) -> Self {
		let lowered = msg.to_ascii_lowercase();

		if lowered.contains("expired") {
			Self::CredentialExpired
		} else if lowered.starts_with("missing") {
			Self::MissingCredential
		} else {
			Self::Other(Some(msg))
		}
	}
}
impl Display for AuthRejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::MissingCredential => f.write_str("credential missing"),
			Self::CredentialExpired => f.write_str("credential expired"),
			Self::Other(Some(msg)) => write!(f, "credential rejected ({msg})"),
			Self::Other(None) => f.write_str("credential rejected"),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn classifies_known_markers() {
		assert_eq!(
			AuthRejection::from_body(br#"{"msg":"Token has expired"}"#),
			AuthRejection::CredentialExpired
		);
		assert_eq!(
			AuthRejection::from_body(br#"{"msg":"Missing cookie \"access_token_cookie\""}"#),
			AuthRejection::MissingCredential
		);
		assert_eq!(
			AuthRejection::from_body(br#"{"msg":"Missing Authorization Header"}"#),
			AuthRejection::MissingCredential
		);
	}

	#[test]
	fn unknown_or_malformed_bodies_fall_back_to_other() {
		assert_eq!(
			AuthRejection::from_body(br#"{"msg":"Signature verification failed"}"#),
			AuthRejection::Other(Some("Signature verification failed".into()))
		);
		assert_eq!(AuthRejection::from_body(b"<html>401</html>"), AuthRejection::Other(None));
		assert_eq!(AuthRejection::from_body(b""), AuthRejection::Other(None));
	}
}
