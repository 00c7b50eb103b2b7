//! Bearer credential model and usability checks.

// crates.io
use oauth2::http::HeaderValue;
// self
use crate::{_prelude::*, auth::TokenSecret, error::AuthError};

/// Safety window subtracted from the expiry when deciding whether a credential is usable.
pub const DEFAULT_EXPIRY_LEEWAY: Duration = Duration::seconds(10);

/// Access token, optional refresh token, and absolute expiry.
///
/// Deserializes from token endpoint payloads that carry `expires_at` as a Unix timestamp.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if one was issued.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant; `None` means the token does not expire.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl Credential {
	/// Creates a non-expiring credential for the provided access token.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, expires_at: None }
	}

	/// Attaches a refresh token.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Returns `true` when the access token is present and stays valid past `now + leeway`.
	pub fn is_usable_at(&self, now: OffsetDateTime, leeway: Duration) -> bool {
		!self.access_token.is_empty()
			&& self.expires_at.is_none_or(|expires_at| expires_at > now + leeway)
	}

	/// Returns `true` when the credential has expired at `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at <= now)
	}

	/// Renders the `Authorization: Bearer` header value.
	pub fn bearer_header(&self) -> Result<HeaderValue, AuthError> {
		let mut value = HeaderValue::try_from(format!("Bearer {}", self.access_token.expose()))
			.map_err(|_| AuthError::InvalidHeader)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
