//! Transport seam and request descriptions.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack and the only place a
//! session call suspends. Callers describe an operation with a [`RequestDescriptor`]; the
//! client resolves it against the configured origin, injects credentials, and hands the
//! resulting [`HttpRequest`] to the transport.

// std
use std::ops::Deref;
// crates.io
use http::{HeaderMap, HeaderName, HeaderValue, Method, header::CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	error::{ApplicationError, ConfigError, TransportError},
};

/// Fully resolved request handed to a transport.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Buffered response returned by a transport.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Executes resolved HTTP requests.
///
/// Implementations return `Ok` for every HTTP response regardless of status; only failures
/// that prevent a response (DNS, TCP, TLS, IO) become [`TransportError`]. Timeouts are left
/// to the implementation's defaults.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends one request and buffers the response body.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Caller-supplied description of one HTTP operation.
///
/// Built once through the consuming builder methods, then passed by reference to the
/// client, which never alters it: credentials are layered onto a copy per attempt.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	method: Method,
	target: String,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
}
impl RequestDescriptor {
	/// Describes a request with an empty body.
	pub fn new(method: Method, target: impl Into<String>) -> Self {
		Self { method, target: target.into(), headers: HeaderMap::new(), body: None }
	}

	/// `GET` shorthand.
	pub fn get(target: impl Into<String>) -> Self {
		Self::new(Method::GET, target)
	}

	/// `POST` shorthand.
	pub fn post(target: impl Into<String>) -> Self {
		Self::new(Method::POST, target)
	}

	/// `PUT` shorthand.
	pub fn put(target: impl Into<String>) -> Self {
		Self::new(Method::PUT, target)
	}

	/// `DELETE` shorthand.
	pub fn delete(target: impl Into<String>) -> Self {
		Self::new(Method::DELETE, target)
	}

	/// Adds (or replaces) a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `body` as JSON and sets `Content-Type: application/json`.
	pub fn json<B>(self, body: &B) -> Result<Self, ConfigError>
	where
		B: ?Sized + Serialize,
	{
		let bytes = serde_json::to_vec(body).map_err(ConfigError::Encode)?;

		Ok(self.header(CONTENT_TYPE, HeaderValue::from_static("application/json")).body(bytes))
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path or absolute URL as supplied.
	///
	/// Absolute URLs on another origin than the session's base URL are sent without
	/// session credentials.
	pub fn target(&self) -> &str {
		&self.target
	}

	/// Caller headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Request body, if any.
	pub fn body_bytes(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Builds the wire request, layering `injected` over the caller headers.
	pub(crate) fn to_request(
		&self,
		url: &Url,
		injected: HeaderMap,
	) -> Result<HttpRequest, ConfigError> {
		let mut request = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.extend(self.headers.clone());

		for (name, value) in injected.iter() {
			headers.insert(name.clone(), value.clone());
		}

		Ok(request)
	}
}

/// Decodes a JSON body, treating an empty body as `null`.
pub(crate) fn decode_json<P>(status: u16, body: &[u8]) -> Result<P, ApplicationError>
where
	P: DeserializeOwned,
{
	let body = if body.iter().all(u8::is_ascii_whitespace) { b"null".as_slice() } else { body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ApplicationError::Decode { source, status })
}

/// Builds a header value, naming the header on failure.
pub(crate) fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value)
		.map_err(|source| ConfigError::InvalidHeader { name: name.to_string(), source })
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The wrapped client carries no cookie store; the session layer forwards its own jar
/// explicitly so every cookie read and write goes through one [`crate::store::CredentialStore`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with default settings, surfacing builder failures.
	pub fn try_default() -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let response = client.execute(request.try_into()?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut buffered = HttpResponse::new(response.bytes().await?.to_vec());

			*buffered.status_mut() = status;
			*buffered.headers_mut() = headers;

			Ok(buffered)
		})
	}
}
