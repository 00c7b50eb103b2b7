//! Refresh-token backed provider with single-flight rotation.
//!
//! [`RefreshingTokenProvider`] hands out the cached credential while it stays usable and
//! otherwise performs a `grant_type=refresh_token` exchange through the same [`Transport`]
//! the executor uses. Concurrent callers queue on one async mutex so only a single refresh is
//! in flight; later callers observe the rotated credential instead of refreshing again.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialFuture, DEFAULT_EXPIRY_LEEWAY, TokenProvider, TokenSecret},
	error::{ApiFault, AuthError, ConfigError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, Transport, TransportClient},
	obs::{self, Operation, Outcome, RequestSpan},
	quota::{Clock, SystemClock},
};

/// Token endpoint used for refresh exchanges.
#[derive(Clone)]
pub struct TokenEndpoint {
	/// Absolute token endpoint URL.
	pub token_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret, sent in the request body.
	pub client_secret: Option<String>,
}
impl TokenEndpoint {
	/// Strava's token endpoint.
	pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/api/v3/oauth/token";

	/// Creates an endpoint for a public client.
	pub fn new(token_url: Url, client_id: impl Into<String>) -> Self {
		Self { token_url, client_id: client_id.into(), client_secret: None }
	}

	/// Sets or replaces the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Strava's token endpoint for a confidential client.
	pub fn strava(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let token_url = Url::parse(Self::STRAVA_TOKEN_URL).map_err(|source| {
			ConfigError::InvalidUrl { url: Self::STRAVA_TOKEN_URL.into(), source }
		})?;

		Ok(Self::new(token_url, client_id).with_client_secret(client_secret))
	}
}
impl Debug for TokenEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpoint")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.finish()
	}
}

/// [`TokenProvider`] that refreshes expired credentials against a [`TokenEndpoint`].
///
/// A credential is refreshed when it expires within the leeway (10 seconds by default) or when
/// its access token is empty but a refresh token is present. Rotated credentials live in memory
/// only; read them back with [`RefreshingTokenProvider::credential`] to persist them.
pub struct RefreshingTokenProvider<T>
where
	T: ?Sized + Transport,
{
	endpoint: TokenEndpoint,
	transport: Arc<T>,
	current: AsyncMutex<Option<Credential>>,
	clock: Arc<dyn Clock>,
	leeway: Duration,
	refreshes: AtomicU64,
}
impl<T> RefreshingTokenProvider<T>
where
	T: ?Sized + Transport,
{
	/// Creates a provider seeded with `credential`.
	pub fn new(endpoint: TokenEndpoint, transport: Arc<T>, credential: Option<Credential>) -> Self {
		Self {
			endpoint,
			transport,
			current: AsyncMutex::new(credential),
			clock: Arc::new(SystemClock),
			leeway: DEFAULT_EXPIRY_LEEWAY,
			refreshes: AtomicU64::new(0),
		}
	}

	/// Overrides the clock used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Overrides the expiry leeway (defaults to 10 seconds).
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Returns the credential currently held, if any.
	pub async fn credential(&self) -> Option<Credential> {
		self.current.lock().await.clone()
	}

	/// Replaces the held credential, e.g. after an out-of-band authorization.
	pub async fn replace(&self, credential: Credential) {
		*self.current.lock().await = Some(credential);
	}

	/// Number of refresh exchanges performed so far.
	pub fn refreshes(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}

	async fn refresh(&self, refresh_token: &TokenSecret) -> Result<Credential, AuthError> {
		let mut client = BasicClient::new(ClientId::new(self.endpoint.client_id.clone()))
			.set_token_uri(TokenUrl::from_url(self.endpoint.token_url.clone()))
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = &self.endpoint.client_secret {
			client = client.set_client_secret(ClientSecret::new(secret.clone()));
		}

		let slot = ResponseMetadataSlot::default();
		let http_client = TransportClient::new(self.transport.clone(), slot.clone());
		let secret = RefreshToken::new(refresh_token.expose().to_owned());

		self.refreshes.fetch_add(1, Ordering::Relaxed);

		let response = client
			.exchange_refresh_token(&secret)
			.request_async(&http_client)
			.await
			.map_err(|err| map_refresh_error(err, slot.take()))?;
		let access_token = TokenSecret::new(response.access_token().secret().to_owned());

		if access_token.is_empty() {
			return Err(AuthError::EmptyAccessToken);
		}

		let expires_in = response.expires_in().ok_or(AuthError::InvalidExpiry)?;
		let expires_in = i64::try_from(expires_in.as_secs()).map_err(|_| AuthError::InvalidExpiry)?;
		let expires_at = self
			.clock
			.now()
			.checked_add(Duration::seconds(expires_in))
			.ok_or(AuthError::InvalidExpiry)?;
		let refresh_token = response
			.refresh_token()
			.map(|token| TokenSecret::new(token.secret().to_owned()))
			.unwrap_or_else(|| refresh_token.clone());

		Ok(Credential { access_token, refresh_token: Some(refresh_token), expires_at: Some(expires_at) })
	}
}
impl<T> TokenProvider for RefreshingTokenProvider<T>
where
	T: ?Sized + Transport,
{
	fn current_credential(&self) -> CredentialFuture<'_> {
		Box::pin(async move {
			let mut current = self.current.lock().await;
			let credential = current.as_ref().ok_or(AuthError::MissingCredential)?;

			if credential.is_usable_at(self.clock.now(), self.leeway) {
				return Ok(credential.clone());
			}

			let Some(refresh_token) = credential.refresh_token.clone() else {
				return Err(if credential.access_token.is_empty() {
					AuthError::EmptyAccessToken
				} else {
					AuthError::MissingRefreshToken
				});
			};
			let span = RequestSpan::new(Operation::Refresh, "current_credential");

			obs::record_outcome(Operation::Refresh, Outcome::Attempt);

			let result = span.instrument(self.refresh(&refresh_token)).await;

			match result {
				Ok(refreshed) => {
					obs::record_outcome(Operation::Refresh, Outcome::Success);
					obs::credential_refreshed(refreshed.expires_at);

					*current = Some(refreshed.clone());

					Ok(refreshed)
				},
				Err(err) => {
					obs::record_outcome(Operation::Refresh, Outcome::Failure);

					Err(err)
				},
			}
		})
	}
}
impl<T> Debug for RefreshingTokenProvider<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshingTokenProvider")
			.field("endpoint", &self.endpoint)
			.field("leeway", &self.leeway)
			.field("refreshes", &self.refreshes())
			.finish()
	}
}

fn map_refresh_error(
	err: RequestTokenError<TransportError, BasicErrorResponse>,
	meta: Option<ResponseMetadata>,
) -> AuthError {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_oauth_error(&response, status),
		RequestTokenError::Request(error) => AuthError::Transport(error),
		RequestTokenError::Parse(source, body) => map_unparsed_error(source, &body, status),
		RequestTokenError::Other(message) => AuthError::Endpoint { message, status },
	}
}

fn map_oauth_error(response: &BasicErrorResponse, status: Option<u16>) -> AuthError {
	let reason = response
		.error_description()
		.cloned()
		.unwrap_or_else(|| response.error().as_ref().to_owned());

	match response.error() {
		BasicErrorResponseType::InvalidGrant => AuthError::InvalidGrant { reason },
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			AuthError::InvalidClient { reason },
		_ => AuthError::Endpoint { message: reason, status },
	}
}

// Non-OAuth fault bodies name the rejected resource instead of an `error` code.
fn map_unparsed_error(
	source: serde_path_to_error::Error<serde_json::Error>,
	body: &[u8],
	status: Option<u16>,
) -> AuthError {
	match status {
		Some(code) if code >= 500 =>
			return AuthError::Endpoint { message: "token endpoint server error".into(), status },
		Some(code) if code >= 400 =>
			if let Ok(fault) = ApiFault::decode(code, body) {
				return match fault.first_resource() {
					Some("Application") => AuthError::InvalidClient { reason: fault.message },
					Some("RefreshToken" | "RequestToken") =>
						AuthError::InvalidGrant { reason: fault.message },
					_ => AuthError::Endpoint { message: fault.message, status },
				};
			},
		_ => {},
	}

	AuthError::Parse { source, status }
}
