//! Token provider contract consumed by the executor.

// self
use crate::{
	_prelude::*,
	auth::{Credential, DEFAULT_EXPIRY_LEEWAY},
	error::AuthError,
	quota::{Clock, SystemClock},
};

/// Boxed future returned by [`TokenProvider::current_credential`].
pub type CredentialFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Credential, AuthError>> + 'a + Send>>;

/// Supplies a bearer credential that is usable right now.
///
/// Implementations may refresh over the network; the executor treats the call as opaque and
/// aborts the request on any [`AuthError`].
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Returns a currently valid credential, refreshing it first when needed.
	fn current_credential(&self) -> CredentialFuture<'_>;
}
impl<T> TokenProvider for Arc<T>
where
	T: ?Sized + TokenProvider,
{
	fn current_credential(&self) -> CredentialFuture<'_> {
		T::current_credential(self)
	}
}

/// Provider that always hands out the same credential and never refreshes.
pub struct StaticTokenProvider {
	credential: Credential,
	clock: Arc<dyn Clock>,
}
impl StaticTokenProvider {
	/// Wraps a fixed credential.
	pub fn new(credential: Credential) -> Self {
		Self { credential, clock: Arc::new(SystemClock) }
	}

	/// Convenience constructor for a non-expiring access token.
	pub fn bearer(access_token: impl Into<String>) -> Self {
		Self::new(Credential::new(access_token))
	}

	/// Overrides the clock used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}
}
impl TokenProvider for StaticTokenProvider {
	fn current_credential(&self) -> CredentialFuture<'_> {
		Box::pin(async move {
			if self.credential.access_token.is_empty() {
				return Err(AuthError::EmptyAccessToken);
			}
			if !self.credential.is_usable_at(self.clock.now(), DEFAULT_EXPIRY_LEEWAY) {
				return Err(AuthError::MissingRefreshToken);
			}

			Ok(self.credential.clone())
		})
	}
}
impl Debug for StaticTokenProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StaticTokenProvider").field("credential", &self.credential).finish()
	}
}
