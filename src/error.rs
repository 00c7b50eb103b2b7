//! Executor-level error types shared across quota, auth, and transport layers.

// self
use crate::_prelude::*;

/// Executor-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical executor error exposed by public APIs.
///
/// HTTP 429 never appears here; throttled attempts are absorbed by the executor's retry loop.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS); the attempt produced no response.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Credential was invalid or could not be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Service-level failure decoded from a 4xx body.
	#[error(transparent)]
	Application(#[from] ApiFault),

	/// Upstream returned a 5xx status.
	#[error("Server error {status}: {message}.")]
	Server {
		/// HTTP status code.
		status: u16,
		/// Preview of the response body.
		message: String,
	},
	/// Upstream returned a 3xx status, which the API never uses for data.
	#[error("Unexpected redirect with status {status}.")]
	Redirect {
		/// HTTP status code.
		status: u16,
		/// `Location` header, when present.
		location: Option<String>,
	},
	/// A 4xx body could not be decoded into an [`ApiFault`].
	#[error("Error response with status {status} could not be decoded.")]
	MalformedFault {
		/// HTTP status code.
		status: u16,
		/// Structured decoding failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The caller-imposed deadline elapsed before the request completed.
	#[error("Deadline elapsed before the request completed.")]
	DeadlineExceeded,
}

/// Configuration and request-construction failures.
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
	HttpRequest(#[from] oauth2::http::Error),
	/// Base URL or request path cannot be parsed.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
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

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
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

/// Credential failures raised by token providers.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Provider holds no credential at all.
	#[error("No credential is available.")]
	MissingCredential,
	/// Credential carries an empty access token.
	#[error("Access token is empty.")]
	EmptyAccessToken,
	/// Credential expired and cannot be refreshed.
	#[error("Credential expired and carries no refresh token.")]
	MissingRefreshToken,
	/// Token endpoint rejected the refresh token.
	#[error("Token endpoint rejected the grant: {reason}.")]
	InvalidGrant {
		/// Endpoint-supplied reason string.
		reason: String,
	},
	/// Token endpoint rejected the client credentials.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Endpoint-supplied reason string.
		reason: String,
	},
	/// Refresh response omitted `expires_in` or carried an unrepresentable value.
	#[error("Token endpoint response carries no usable expires_in.")]
	InvalidExpiry,
	/// Access token contains characters that are not valid in a header.
	#[error("Access token is not a valid header value.")]
	InvalidHeader,
	/// Token endpoint failed in a way that is neither a grant nor a client rejection.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Refresh request never produced a response.
	#[error("Token endpoint could not be reached.")]
	Transport(#[source] TransportError),
}

/// Structured fault returned by the API for 4xx responses other than 429.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("API returned {status}: {message}.")]
pub struct ApiFault {
	/// HTTP status code; filled in from the response rather than the body.
	#[serde(skip)]
	pub status: u16,
	/// Top-level message.
	#[serde(default)]
	pub message: String,
	/// Per-field details.
	#[serde(default)]
	pub errors: Vec<FaultDetail>,
}
impl ApiFault {
	/// Decodes a fault body, tagging it with the response status.
	pub fn decode(
		status: u16,
		body: &[u8],
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let mut fault: Self = serde_path_to_error::deserialize(&mut de)?;

		fault.status = status;

		Ok(fault)
	}

	/// Returns the `resource` of the first detail entry, if any.
	pub fn first_resource(&self) -> Option<&str> {
		self.errors.first().map(|detail| detail.resource.as_str())
	}
}

/// One entry of [`ApiFault::errors`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultDetail {
	/// Resource the failure refers to.
	#[serde(default)]
	pub resource: String,
	/// Field the failure refers to.
	#[serde(default)]
	pub field: String,
	/// Machine-readable failure code.
	#[serde(default)]
	pub code: String,
}
