//! Quota header wire contract: `"<short>,<long>"` pairs for limit and usage.

// crates.io
use oauth2::http::{HeaderMap, HeaderName};
// self
use crate::_prelude::*;

/// Names of the two headers carrying limit and usage pairs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotaHeaderNames {
	/// Header carrying `"<shortLimit>,<longLimit>"`.
	pub limit: HeaderName,
	/// Header carrying `"<shortUsage>,<longUsage>"`.
	pub usage: HeaderName,
}
impl QuotaHeaderNames {
	/// Overall request quota headers (`X-RateLimit-Limit`, `X-RateLimit-Usage`).
	pub fn overall() -> Self {
		Self {
			limit: HeaderName::from_static("x-ratelimit-limit"),
			usage: HeaderName::from_static("x-ratelimit-usage"),
		}
	}

	/// Read-only quota headers (`X-ReadRateLimit-Limit`, `X-ReadRateLimit-Usage`).
	pub fn read() -> Self {
		Self {
			limit: HeaderName::from_static("x-readratelimit-limit"),
			usage: HeaderName::from_static("x-readratelimit-usage"),
		}
	}
}
impl Default for QuotaHeaderNames {
	fn default() -> Self {
		Self::overall()
	}
}

/// Authoritative limit and usage values extracted from one response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaReading {
	/// Short-window ceiling.
	pub short_limit: u32,
	/// Long-window ceiling.
	pub long_limit: u32,
	/// Short-window consumption.
	pub short_usage: u32,
	/// Long-window consumption.
	pub long_usage: u32,
}
impl QuotaReading {
	/// Extracts a reading from response headers.
	///
	/// Returns `None` when either header is absent, not valid UTF-8, or not an integer pair.
	pub fn from_headers(headers: &HeaderMap, names: &QuotaHeaderNames) -> Option<Self> {
		let limit = headers.get(&names.limit)?.to_str().ok()?;
		let usage = headers.get(&names.usage)?.to_str().ok()?;

		Self::parse(limit, usage)
	}

	/// Extracts the most constraining reading across several header pairs.
	///
	/// Absent or malformed pairs are skipped; `None` means no pair produced a reading. Each window
	/// keeps the limit and usage of the pair with the least room left, so a claim is denied as
	/// soon as any pair is exhausted.
	pub fn from_any(headers: &HeaderMap, names: &[QuotaHeaderNames]) -> Option<Self> {
		names.iter().filter_map(|names| Self::from_headers(headers, names)).reduce(Self::tightest)
	}

	/// Combines two readings window by window, keeping whichever side has less room left.
	pub fn tightest(self, other: Self) -> Self {
		let (short_limit, short_usage) =
			tighter((self.short_limit, self.short_usage), (other.short_limit, other.short_usage));
		let (long_limit, long_usage) =
			tighter((self.long_limit, self.long_usage), (other.long_limit, other.long_usage));

		Self { short_limit, long_limit, short_usage, long_usage }
	}

	/// Parses the raw header values.
	pub fn parse(limit: &str, usage: &str) -> Option<Self> {
		let (short_limit, long_limit) = parse_pair(limit)?;
		let (short_usage, long_usage) = parse_pair(usage)?;

		Some(Self { short_limit, long_limit, short_usage, long_usage })
	}
}

fn tighter(current: (u32, u32), candidate: (u32, u32)) -> (u32, u32) {
	if candidate.0.saturating_sub(candidate.1) < current.0.saturating_sub(current.1) {
		candidate
	} else {
		current
	}
}

fn parse_pair(raw: &str) -> Option<(u32, u32)> {
	let mut parts = raw.split(',');
	let short = parts.next()?.trim().parse().ok()?;
	let long = parts.next()?.trim().parse().ok()?;

	if parts.next().is_some() {
		return None;
	}

	Some((short, long))
}
