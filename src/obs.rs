//! Optional observability helpers for request execution.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `quota_executor.request` with the `operation`
//!   and `stage` fields, plus events for quota waits, throttled attempts, and refreshes.
//! - Enable `metrics` to increment the `quota_executor_request_total` counter for every
//!   attempt/success/failure/throttle/wait, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Quota-gated API request.
	Execute,
	/// Credential refresh against the token endpoint.
	Refresh,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Execute => "execute",
			Operation::Refresh => "refresh",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an executor helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Physical attempt answered with HTTP 429.
	Throttled,
	/// Caller suspended waiting for quota.
	QuotaWait,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Throttled => "throttled",
			Outcome::QuotaWait => "quota_wait",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
