//! Transport primitives shared by every uploader backend.
//!
//! The module exposes [`HttpTransport`] alongside [`RequestSpec`] and
//! [`TransportResponse`] so downstream crates can integrate custom HTTP clients
//! without constraining the uploaders to one stack. A request is dispatched as
//! a single unit; cancelling the enclosing operation drops the in-flight
//! future, and transports that observe an explicit abort report
//! [`TransportError::Cancelled`](crate::error::TransportError::Cancelled) so
//! callers can tell cancellation apart from failure.

// std
use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError};

/// HTTP methods the uploader wire contracts use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP DELETE.
	Delete,
}
impl Method {
	/// Returns the canonical uppercase method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// A fully described outbound request: method, URL, headers, and optional body.
#[derive(Clone, Debug)]
pub struct RequestSpec {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Custom headers in insertion order.
	pub headers: Vec<(String, String)>,
	/// Content type of the body, when one is attached.
	pub content_type: Option<String>,
	/// Request body bytes; `None` dispatches a zero-length request.
	pub body: Option<Vec<u8>>,
}
impl RequestSpec {
	/// Creates a request for the given method and URL.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: Vec::new(), content_type: None, body: None }
	}

	/// Appends a header.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Sets the body content type.
	pub fn content_type(mut self, value: impl Into<String>) -> Self {
		self.content_type = Some(value.into());

		self
	}

	/// Attaches a body.
	pub fn body(mut self, bytes: Vec<u8>) -> Self {
		self.body = Some(bytes);

		self
	}
}

/// Response surface the uploaders need: status, headers, and the full body.
#[derive(Clone, Debug, Default)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names.
	pub headers: Vec<(String, String)>,
	/// Response body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Returns `true` for any 2xx status.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for HTTP 409, the tolerated already-exists conflict.
	pub fn is_conflict(&self) -> bool {
		self.status == 409
	}

	/// Looks up a header value by case-insensitive name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Boxed `Send` future returned by transport dispatches.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP clients capable of executing uploader requests.
///
/// The trait is the crate's only dependency on an HTTP stack. Implementations
/// must be `Send + Sync + 'static` so they can be shared across uploader
/// instances behind `Arc<T>`, and the returned futures must be `Send` so
/// boxed uploader futures inherit the same guarantee. A non-2xx status is a
/// normal [`TransportResponse`], not an error; [`TransportError`] is reserved
/// for connection-level faults.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches a request and resolves once the full response is buffered.
	fn dispatch(&self, request: RequestSpec) -> TransportFuture<'_, TransportResponse>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one
/// place. Token requests should not follow redirects, matching OAuth 2.0
/// guidance that token endpoints return results directly; configure any custom
/// [`ReqwestClient`] accordingly before wrapping it.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
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
	fn dispatch(&self, request: RequestSpec) -> TransportFuture<'_, TransportResponse> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url.clone());

			if let Some(value) = &request.content_type {
				builder = builder.header(reqwest::header::CONTENT_TYPE, value);
			}
			for (name, value) in &request.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

/// Parses a compile-time constant URL.
///
/// Only call this with literals covered by tests; runtime-variable URLs go
/// through the fallible paths in [`crate::error::ConfigError`].
pub(crate) fn static_url(raw: &str) -> Url {
	Url::parse(raw).expect("Hard-coded endpoint URL must parse.")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn response_status_helpers_classify() {
		let created = TransportResponse { status: 201, ..TransportResponse::default() };
		let conflict = TransportResponse { status: 409, ..TransportResponse::default() };
		let failed = TransportResponse { status: 500, ..TransportResponse::default() };

		assert!(created.is_success());
		assert!(!created.is_conflict());
		assert!(conflict.is_conflict());
		assert!(!conflict.is_success());
		assert!(!failed.is_success());
		assert!(!failed.is_conflict());
	}

	#[test]
	fn response_header_lookup_ignores_case() {
		let response = TransportResponse {
			status: 200,
			headers: vec![("x-ms-request-id".into(), "abc".into())],
			body: Vec::new(),
		};

		assert_eq!(response.header("X-Ms-Request-Id"), Some("abc"));
		assert_eq!(response.header("etag"), None);
	}

	#[test]
	fn request_builder_collects_parts() {
		let url = static_url("https://example.com/container/blob");
		let request = RequestSpec::new(Method::Put, url)
			.header("x-ms-date", "Wed, 01 Jan 2025 00:00:00 GMT")
			.content_type("application/octet-stream")
			.body(vec![1, 2, 3]);

		assert_eq!(request.method, Method::Put);
		assert_eq!(request.headers.len(), 1);
		assert_eq!(request.content_type.as_deref(), Some("application/octet-stream"));
		assert_eq!(request.body.as_deref(), Some(&[1, 2, 3][..]));
	}
}
