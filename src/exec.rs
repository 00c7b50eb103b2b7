//! Quota-gated request execution.
//!
//! [`Executor`] runs each logical request as a loop of physical attempts. Every attempt holds
//! its own [`QuotaClaim`] from before the credential lookup until its response headers have been
//! reconciled, so a throttled attempt returns its unit before the next one claims again and no
//! exit path (success, error, or cancellation) can leak a reservation.

mod config;
mod metrics;
mod request;
mod response;

pub use config::*;
pub use metrics::*;
pub use request::*;

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::TokenProvider,
	exec::response::AttemptOutcome,
	http::Transport,
	obs::{self, Operation, Outcome, RequestSpan},
	quota::{Clock, QuotaClaim, QuotaTracker, SystemClock},
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Executor specialized for the crate's default reqwest transport.
pub type ReqwestExecutor<P> = Executor<ReqwestTransport, P>;

/// Executes API requests against one shared [`QuotaTracker`].
///
/// Clones share the transport, token provider, tracker, and metrics, so any number of caller
/// tasks can issue requests concurrently without ever exceeding the server-reported quota.
pub struct Executor<T, P>
where
	T: ?Sized + Transport,
	P: ?Sized + TokenProvider,
{
	/// Transport used for every physical attempt.
	pub transport: Arc<T>,
	/// Source of the bearer credential.
	pub tokens: Arc<P>,
	/// Quota state shared by every request issued through this executor.
	pub quota: Arc<QuotaTracker>,
	/// Static request settings.
	pub config: ExecutorConfig,
	/// Clock used to key quota windows.
	pub clock: Arc<dyn Clock>,
	/// Shared counters for executor activity.
	pub metrics: Arc<ExecutorMetrics>,
}
impl<T, P> Executor<T, P>
where
	T: ?Sized + Transport,
	P: ?Sized + TokenProvider,
{
	/// Creates an executor with a fresh, fail-open tracker.
	pub fn new(
		config: ExecutorConfig,
		transport: impl Into<Arc<T>>,
		tokens: impl Into<Arc<P>>,
	) -> Self {
		let quota = Arc::new(QuotaTracker::new().with_safety_margin(config.safety_margin));

		Self {
			transport: transport.into(),
			tokens: tokens.into(),
			quota,
			config,
			clock: Arc::new(SystemClock),
			metrics: Default::default(),
		}
	}

	/// Shares an existing tracker, e.g. between executors for the same client connection.
	pub fn with_quota(mut self, quota: Arc<QuotaTracker>) -> Self {
		self.quota = quota;

		self
	}

	/// Overrides the clock used for window keys.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Sends `method path` with `params` and returns the response body.
	pub async fn execute<I, K, V>(&self, method: Method, path: &str, params: I) -> Result<Vec<u8>>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Display,
	{
		self.execute_request(ApiRequest::new(method, path).params(params)).await
	}

	/// Executes a prepared [`ApiRequest`], retrying throttled attempts until it completes.
	pub async fn execute_request(&self, request: ApiRequest) -> Result<Vec<u8>> {
		const KIND: Operation = Operation::Execute;

		let span = RequestSpan::new(KIND, "execute_request");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span.instrument(self.run(&request)).await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_outcome(KIND, Outcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(KIND, Outcome::Failure);
			},
		}

		result
	}

	/// [`execute_request`](Self::execute_request) bounded by `timeout`.
	///
	/// Expiry drops the in-flight attempt, releasing its claim, and returns
	/// [`Error::DeadlineExceeded`].
	pub async fn execute_within(&self, request: ApiRequest, timeout: Duration) -> Result<Vec<u8>> {
		let timeout = if timeout.is_negative() { Duration::ZERO } else { timeout };

		match tokio::time::timeout(timeout.unsigned_abs(), self.execute_request(request)).await {
			Ok(result) => result,
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(Operation::Execute, Outcome::Failure);

				Err(Error::DeadlineExceeded)
			},
		}
	}

	/// Greater of the short and long usage fractions right now.
	pub fn fraction_used(&self) -> f64 {
		self.quota.fraction_used_at(self.clock.now())
	}

	async fn run(&self, request: &ApiRequest) -> Result<Vec<u8>> {
		let mut attempt = 0_u32;

		loop {
			attempt = attempt.saturating_add(1);

			let outcome = {
				let _claim = self.claim().await;

				self.attempt(request).await?
			};
			let (retry_after, quota_known) = match outcome {
				AttemptOutcome::Done(body) => return Ok(body),
				AttemptOutcome::Throttled { retry_after, quota_known } => (retry_after, quota_known),
			};

			self.metrics.record_throttled();
			obs::record_outcome(Operation::Execute, Outcome::Throttled);
			obs::throttled(attempt, retry_after);

			if let Some(pause) = self.throttle_pause(retry_after, quota_known) {
				tokio::time::sleep(pause.unsigned_abs()).await;
			}
		}
	}

	// A 429 without a quota reading leaves the tracker fail-open; pause for the safety margin.
	fn throttle_pause(&self, retry_after: Option<Duration>, quota_known: bool) -> Option<Duration> {
		match retry_after.filter(|_| self.config.honor_retry_after) {
			Some(wait) => Some(wait),
			None if !quota_known => Some(self.config.safety_margin),
			None => None,
		}
	}

	// Denied claims hold nothing, so a caller cancelled here leaves the tracker untouched.
	async fn claim(&self) -> QuotaClaim<'_> {
		loop {
			match self.quota.claim_at(self.clock.now()) {
				Ok(claim) => return claim,
				Err(denied) => {
					self.metrics.record_quota_wait();
					obs::record_outcome(Operation::Execute, Outcome::QuotaWait);
					obs::quota_wait(denied.window, denied.wait);

					tokio::time::sleep(denied.wait.unsigned_abs()).await;
				},
			}
		}
	}

	async fn attempt(&self, request: &ApiRequest) -> Result<AttemptOutcome> {
		self.metrics.record_attempt();

		let credential = self.tokens.current_credential().await?;
		let http_request = request.to_http(&self.config, &credential)?;
		let response = self.transport.send(http_request).await?;

		let reading =
			self.quota.reconcile_at(self.clock.now(), response.headers(), &self.config.quota_headers);

		response::classify(response, reading.is_some())
	}
}
#[cfg(feature = "reqwest")]
impl<P> Executor<ReqwestTransport, P>
where
	P: ?Sized + TokenProvider,
{
	/// Creates an executor over a redirect-free reqwest client.
	pub fn with_reqwest(config: ExecutorConfig, tokens: impl Into<Arc<P>>) -> Result<Self, ConfigError> {
		Ok(Self::new(config, ReqwestTransport::new()?, tokens))
	}
}
impl<T, P> Clone for Executor<T, P>
where
	T: ?Sized + Transport,
	P: ?Sized + TokenProvider,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			tokens: self.tokens.clone(),
			quota: self.quota.clone(),
			config: self.config.clone(),
			clock: self.clock.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<T, P> Debug for Executor<T, P>
where
	T: ?Sized + Transport,
	P: ?Sized + TokenProvider,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Executor")
			.field("config", &self.config)
			.field("quota", &self.quota.snapshot())
			.field("metrics", &self.metrics)
			.finish()
	}
}
