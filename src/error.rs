//! Crate-level error types shared across backends, sessions, and transports.
//!
//! Expected failure modes stay inside [`UploadOutcome`](crate::outcome::UploadOutcome)
//! and [`ErrorSink`](crate::outcome::ErrorSink); values of [`Error`] cross the
//! uploader boundary only for faults a caller cannot anticipate (malformed
//! endpoint URLs, IO failures while draining a download, and the like).

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical uploader error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Input rejected before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Authentication or signing failure; never retried automatically.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body present but not decodable into the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

/// Configuration failures detected before any I/O.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required credential field is empty.
	#[error("'{field}' must not be empty.")]
	MissingField {
		/// Human-readable field label shown in accumulated errors.
		field: &'static str,
	},
	/// The shared-key account key is not valid base64.
	#[error("'Access key' must be valid base64.")]
	InvalidAccessKey {
		/// Underlying decoding failure.
		#[source]
		source: base64::DecodeError,
	},
	/// A service endpoint could not be assembled into a valid URL.
	#[error("Service endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP request construction failed inside the OAuth layer.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}

/// Input rejections raised before a request is built.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Payload exceeds the content-endpoint upload ceiling.
	#[error("There's a 150MB limit to uploads through the API.")]
	PayloadTooLarge {
		/// Size of the rejected payload in bytes.
		size: u64,
	},
	/// The upload path cannot produce a public URL.
	#[error("Upload path is private. Use \"Public\" folder to get public URL.")]
	PrivateUploadPath,
}

/// Authentication and signing failures.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The session does not hold a usable access token.
	#[error("Session does not hold a valid access token.")]
	MissingAccessToken,
	/// The token endpoint returned an empty access token.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// No refresh token is available for rotation.
	#[error("Session does not hold a refresh token.")]
	MissingRefreshToken,
	/// The token endpoint rejected the grant.
	#[error("Token endpoint rejected the grant: {reason}.")]
	TokenEndpoint {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Token endpoint returned an `expires_in` outside the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// An OAuth endpoint URL failed validation.
	#[error("OAuth endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// The request-signing date stamp could not be formatted.
	#[error("HTTP date for request signing could not be formatted.")]
	DateFormat {
		/// Underlying formatting failure.
		#[source]
		source: time::error::Format,
	},
}

/// Transport-level failures (network, IO, cancellation).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while dispatching the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while dispatching the request.")]
	Io(#[from] std::io::Error),
	/// The enclosing operation was cancelled while the request was in flight.
	#[error("Request was cancelled before completion.")]
	Cancelled,
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

/// Failures decoding or encoding JSON envelopes.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body could not be decoded into the expected record.
	#[error("Response body could not be decoded.")]
	Json {
		/// Structured parsing failure locating the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A request argument could not be serialized to JSON.
	#[error("Request argument could not be encoded as JSON.")]
	Encode {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}
