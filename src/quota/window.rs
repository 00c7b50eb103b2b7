//! Fixed-width accounting windows and their wall-clock keys.

// crates.io
use time::{Time, UtcOffset};
// self
use crate::_prelude::*;

/// Width of the short accounting window.
pub const SHORT_WINDOW: Duration = Duration::minutes(15);
/// Width of the long accounting window (one UTC calendar day).
pub const LONG_WINDOW: Duration = Duration::days(1);

/// Which of the two server-enforced windows a value refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
	/// 15-minute window aligned to the quarter hour in UTC.
	Short,
	/// Calendar-day window aligned to UTC midnight.
	Long,
}
impl WindowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			WindowKind::Short => "short",
			WindowKind::Long => "long",
		}
	}

	/// Returns the window width.
	pub const fn width(self) -> Duration {
		match self {
			WindowKind::Short => SHORT_WINDOW,
			WindowKind::Long => LONG_WINDOW,
		}
	}

	/// Returns the key of the window containing `instant`.
	pub fn key_at(self, instant: OffsetDateTime) -> WindowKey {
		let utc = instant.to_offset(UtcOffset::UTC);
		let midnight = utc.replace_time(Time::MIDNIGHT);
		let start = match self {
			WindowKind::Short => {
				let minutes = i64::from(utc.hour()) * 60 + i64::from(utc.minute());

				midnight + Duration::minutes(minutes - minutes % 15)
			},
			WindowKind::Long => midnight,
		};

		WindowKey { kind: self, start }
	}
}
impl Display for WindowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Identifies one concrete window instance by its UTC start instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowKey {
	kind: WindowKind,
	start: OffsetDateTime,
}
impl WindowKey {
	/// Window kind this key belongs to.
	pub fn kind(&self) -> WindowKind {
		self.kind
	}

	/// First instant inside the window.
	pub fn start(&self) -> OffsetDateTime {
		self.start
	}

	/// First instant of the following window.
	pub fn end(&self) -> OffsetDateTime {
		self.start + self.kind.width()
	}
}
impl Display for WindowKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let date = self.start.date();

		write!(f, "{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())?;

		match self.kind {
			WindowKind::Short => write!(f, "T{:02}:{:02}Z", self.start.hour(), self.start.minute()),
			WindowKind::Long => Ok(()),
		}
	}
}

/// Server-reported limit and usage for one window.
///
/// `limit == 0` means the limit is unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuotaWindow {
	/// Window instance the usage was recorded in.
	pub key: Option<WindowKey>,
	/// Server-reported ceiling.
	pub limit: u32,
	/// Server-reported consumption as of the last successful response.
	pub usage: u32,
}
impl QuotaWindow {
	/// Moves the window to `key`, zeroing usage when the key changed.
	///
	/// Returns `true` when a rollover happened. The limit survives rollovers.
	pub fn roll_to(&mut self, key: WindowKey) -> bool {
		if self.key == Some(key) {
			return false;
		}

		self.key = Some(key);
		self.usage = 0;

		true
	}

	/// Usage as seen from the window identified by `key`, without mutating.
	pub fn usage_in(&self, key: WindowKey) -> u32 {
		if self.key == Some(key) { self.usage } else { 0 }
	}

	/// Returns `true` when `usage + claimed` has reached the limit.
	pub fn is_exhausted(&self, claimed: u32) -> bool {
		u64::from(self.usage) + u64::from(claimed) >= u64::from(self.limit)
	}

	/// Fraction of the limit consumed by `usage`; an unknown limit yields `0.0`.
	pub fn fraction(limit: u32, usage: u32) -> f64 {
		if limit == 0 { 0.0 } else { f64::from(usage) / f64::from(limit) }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn short_keys_align_to_quarter_hours() {
		let key = WindowKind::Short.key_at(macros::datetime!(2025-03-04 10:29:59.5 UTC));

		assert_eq!(key.start(), macros::datetime!(2025-03-04 10:15 UTC));
		assert_eq!(key.end(), macros::datetime!(2025-03-04 10:30 UTC));
		assert_eq!(key.to_string(), "2025-03-04T10:15Z");
		assert_ne!(key, WindowKind::Short.key_at(macros::datetime!(2025-03-04 10:30 UTC)));
		assert_ne!(key, WindowKind::Short.key_at(macros::datetime!(2025-03-05 10:20 UTC)));
	}

	#[test]
	fn long_keys_follow_the_utc_calendar_day() {
		let key = WindowKind::Long.key_at(macros::datetime!(2025-03-04 23:30 -2));

		assert_eq!(key.start(), macros::datetime!(2025-03-05 00:00 UTC));
		assert_eq!(key.end(), macros::datetime!(2025-03-06 00:00 UTC));
		assert_eq!(key.to_string(), "2025-03-05");
	}

	#[test]
	fn rollover_zeroes_usage_but_keeps_limit() {
		let first = WindowKind::Short.key_at(macros::datetime!(2025-03-04 10:00 UTC));
		let second = WindowKind::Short.key_at(macros::datetime!(2025-03-04 10:15 UTC));
		let mut window = QuotaWindow { key: Some(first), limit: 600, usage: 42 };

		assert!(!window.roll_to(first));
		assert_eq!(window.usage, 42);
		assert!(window.roll_to(second));
		assert_eq!(window.usage, 0);
		assert_eq!(window.limit, 600);
	}

	#[test]
	fn unknown_limit_fraction_is_zero() {
		assert_eq!(QuotaWindow::fraction(0, 10), 0.0);
		assert_eq!(QuotaWindow::fraction(600, 300), 0.5);
	}
}
