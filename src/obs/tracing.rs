// self
use crate::{_prelude::*, obs::Operation, quota::WindowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by executor operations.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"quota_executor.request",
				operation = operation.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits an event when a caller suspends for quota.
pub fn quota_wait(window: WindowKind, wait: Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(window = window.as_str(), wait_secs = wait.whole_seconds(), "quota exhausted");
	#[cfg(not(feature = "tracing"))]
	let _ = (window, wait);
}

/// Emits an event when the server throttles a physical attempt.
pub fn throttled(attempt: u32, retry_after: Option<Duration>) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		attempt,
		retry_after_secs = retry_after.map(|d| d.whole_seconds()),
		"request throttled"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, retry_after);
}

/// Emits an event when quota headers were missing or malformed.
pub fn quota_cleared() {
	#[cfg(feature = "tracing")]
	tracing::debug!("quota headers unusable; tracker reset to fail-open");
}

/// Emits an event when a release had no matching claim.
pub fn unmatched_release() {
	#[cfg(feature = "tracing")]
	tracing::error!("quota released without an outstanding claim");
}

/// Emits an event after a credential refresh.
pub fn credential_refreshed(expires_at: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	tracing::info!(expires_at = ?expires_at, "credential refreshed");
	#[cfg(not(feature = "tracing"))]
	let _ = expires_at;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_noop_without_tracing() {
		quota_wait(WindowKind::Short, Duration::seconds(5));
		throttled(1, None);
		quota_cleared();
		unmatched_release();
	}

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = RequestSpan::new(Operation::Execute, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
