//! Session-level error types shared across the client, refresh adapter, and stores.

// self
use crate::{_prelude::*, client::TerminalReason};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); never used as a refresh trigger.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server answered with something other than an auth failure that the caller must handle.
	#[error(transparent)]
	Application(#[from] ApplicationError),

	/// Silent recovery is exhausted; the user must log in again.
	#[error("Session cannot be recovered without logging in again: {reason}.")]
	ReauthenticationRequired {
		/// Why the refresh protocol gave up.
		reason: TerminalReason,
	},
	/// Diary input was rejected before reaching the network.
	#[error("Diary {field} must not be empty.")]
	IncompleteDraft {
		/// Name of the empty field.
		field: &'static str,
	},
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// A header value cannot be represented on the wire.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: String,
		/// Underlying validation failure.
		#[source]
		source: http::header::InvalidHeaderValue,
	},
	/// Request path cannot be resolved against the base URL.
	#[error("Request target `{target}` is not a valid URL.")]
	InvalidUrl {
		/// Path or URL as supplied.
		target: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be encoded as JSON.")]
	Encode(#[source] serde_json::Error),
	/// A date could not be rendered for a request.
	#[error("Date could not be formatted.")]
	DateFormat(#[from] time::error::Format),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Non-auth failures reported by the server or found in its payloads.
#[derive(Debug, ThisError)]
pub enum ApplicationError {
	/// Non-2xx status that is not handled by the refresh protocol.
	#[error("Server responded with HTTP {status}: {body_preview}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Leading part of the response body.
		body_preview: String,
	},
	/// Response body did not match the expected shape.
	#[error("Server returned malformed JSON (HTTP {status}).")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Refresh endpoint reported success without handing out a credential.
	#[error("Refresh endpoint reported success without an access token.")]
	MissingAccessToken,
	/// Endpoint answered `{"result": false}`.
	#[error("Server rejected the operation: {message}.")]
	Rejected {
		/// Context for the rejection.
		message: String,
	},
}
impl ApplicationError {
	/// Builds a [`ApplicationError::Status`] with a bounded, lossy preview of `body`.
	pub fn status(status: u16, body: &[u8]) -> Self {
		let text = String::from_utf8_lossy(body);
		let body_preview = match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
			Some((idx, _)) => format!("{}...", &text[..idx]),
			None => text.into_owned(),
		};

		Self::Status { status, body_preview }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
