//! Executor configuration.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	quota::{DEFAULT_SAFETY_MARGIN, QuotaHeaderNames},
};

/// Static settings shared by every request an [`Executor`](crate::exec::Executor) issues.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
	/// Base URL every request path is joined onto.
	pub base_url: Url,
	/// `User-Agent` header value.
	pub user_agent: String,
	/// Header pairs the quota reading is taken from; the tightest pair wins per window.
	pub quota_headers: Vec<QuotaHeaderNames>,
	/// Margin added to quota waits by the tracker the executor creates.
	pub safety_margin: Duration,
	/// Whether a `Retry-After` on HTTP 429 delays the next attempt.
	pub honor_retry_after: bool,
}
impl ExecutorConfig {
	/// Strava API v3 base URL.
	pub const STRAVA_BASE_URL: &str = "https://www.strava.com/api/v3";

	/// Creates a configuration with default headers, margin, and user agent.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			user_agent: concat!("quota-executor/", env!("CARGO_PKG_VERSION")).into(),
			quota_headers: vec![QuotaHeaderNames::default()],
			safety_margin: DEFAULT_SAFETY_MARGIN,
			honor_retry_after: true,
		}
	}

	/// Preset for the Strava API.
	///
	/// Strava throttles reads against their own `X-ReadRateLimit-*` pair on top of the overall
	/// `X-RateLimit-*` pair, so both are reconciled.
	pub fn strava() -> Result<Self, ConfigError> {
		let base_url = Url::parse(Self::STRAVA_BASE_URL).map_err(|source| ConfigError::InvalidUrl {
			url: Self::STRAVA_BASE_URL.into(),
			source,
		})?;

		Ok(Self::new(base_url)
			.with_quota_headers([QuotaHeaderNames::overall(), QuotaHeaderNames::read()]))
	}

	/// Overrides the `User-Agent` header.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Selects which response header pairs feed the quota tracker.
	pub fn with_quota_headers(mut self, names: impl IntoIterator<Item = QuotaHeaderNames>) -> Self {
		self.quota_headers = names.into_iter().collect();

		self
	}

	/// Overrides the quota wait margin; negative values clamp to zero.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Enables or disables waiting for `Retry-After` after HTTP 429.
	pub fn with_retry_after(mut self, honor: bool) -> Self {
		self.honor_retry_after = honor;

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn strava_preset_reads_overall_and_read_limits() {
		let config = ExecutorConfig::strava().expect("Strava preset should parse.");

		assert_eq!(config.base_url.as_str(), "https://www.strava.com/api/v3");
		assert!(config.user_agent.starts_with("quota-executor/"));
		assert_eq!(
			config.quota_headers,
			vec![QuotaHeaderNames::overall(), QuotaHeaderNames::read()]
		);
		assert_eq!(config.safety_margin, Duration::seconds(5));
		assert!(config.honor_retry_after);
		assert_eq!(
			ExecutorConfig::new(config.base_url.clone()).quota_headers,
			vec![QuotaHeaderNames::overall()]
		);
		assert_eq!(
			config.with_safety_margin(Duration::seconds(-3)).safety_margin,
			Duration::ZERO
		);
	}
}
