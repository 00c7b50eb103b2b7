// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for executor activity.
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
	attempts: AtomicU64,
	throttled: AtomicU64,
	quota_waits: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl ExecutorMetrics {
	/// Returns the number of physical attempts (one per granted claim).
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of attempts answered with HTTP 429.
	pub fn throttled(&self) -> u64 {
		self.throttled.load(Ordering::Relaxed)
	}

	/// Returns the number of times a caller suspended waiting for quota.
	pub fn quota_waits(&self) -> u64 {
		self.quota_waits.load(Ordering::Relaxed)
	}

	/// Returns the number of logical requests that completed successfully.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of logical requests that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_throttled(&self) {
		self.throttled.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_quota_wait(&self) {
		self.quota_waits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
