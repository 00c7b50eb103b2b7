//! Client-side quota tracking over a short and a long rolling window.
//!
//! [`QuotaTracker`] answers "may I proceed now, and if not, how long until I may retry" and
//! absorbs the server-reported truth after every real response. Capacity is reserved before a
//! network attempt (a *claim*) so concurrent callers can never both observe "room available"
//! and race past the limit. Until the first well-formed quota headers arrive the tracker is
//! fail-open: every claim is granted.
//!
//! All mutations (claim, release, reconcile) take the same write lock; reads take the read lock.

pub mod clock;
pub mod reading;
pub mod window;

pub use clock::*;
pub use reading::*;
pub use window::*;

// crates.io
use oauth2::http::HeaderMap;
// self
use crate::{_prelude::*, obs};

/// Default margin added to every computed wait.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::seconds(5);

/// Outcome of [`QuotaTracker::try_claim_at`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimDecision {
	/// One unit of quota is now held; pair it with exactly one [`QuotaTracker::release`].
	Granted,
	/// No unit was taken; retry after the indicated wait.
	Denied(ClaimDenied),
}
impl ClaimDecision {
	/// Returns `true` when the claim was granted.
	pub fn is_granted(&self) -> bool {
		matches!(self, Self::Granted)
	}

	/// Wait before retrying; zero when granted.
	pub fn wait(&self) -> Duration {
		match self {
			Self::Granted => Duration::ZERO,
			Self::Denied(denied) => denied.wait,
		}
	}
}

/// Details of a denied claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimDenied {
	/// Window that is exhausted; the short window is reported first.
	pub window: WindowKind,
	/// Time to wait before claiming again, including the safety margin.
	pub wait: Duration,
	/// Start of the window in which the claim can succeed.
	pub resets_at: OffsetDateTime,
}

/// Point-in-time copy of the tracker state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QuotaSnapshot {
	/// Short window state.
	pub short: QuotaWindow,
	/// Long window state.
	pub long: QuotaWindow,
	/// Reservations made but not yet reflected in server-reported usage.
	pub claimed: u32,
	/// Whether authoritative quota data has been observed.
	pub has_server_data: bool,
}

/// Shared quota state for one client connection.
///
/// Construct one per client and share it behind an [`Arc`]; there is no process-wide instance.
#[derive(Debug)]
pub struct QuotaTracker {
	state: RwLock<QuotaSnapshot>,
	safety_margin: Duration,
}
impl QuotaTracker {
	/// Creates an empty, fail-open tracker.
	pub fn new() -> Self {
		Self { state: RwLock::new(QuotaSnapshot::default()), safety_margin: DEFAULT_SAFETY_MARGIN }
	}

	/// Overrides the margin added to computed waits (defaults to 5 seconds).
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Attempts to reserve one unit of quota at `now`.
	///
	/// Rolled-over windows have their usage zeroed before any comparison. A granted decision
	/// increments the claim counter and must be paired with [`release`](Self::release); prefer
	/// [`claim_at`](Self::claim_at), which pairs them by construction.
	pub fn try_claim_at(&self, now: OffsetDateTime) -> ClaimDecision {
		let mut state = self.state.write();
		let short_key = WindowKind::Short.key_at(now);
		let long_key = WindowKind::Long.key_at(now);

		state.short.roll_to(short_key);
		state.long.roll_to(long_key);

		if state.has_server_data {
			let claimed = state.claimed;
			let exhausted = if state.short.is_exhausted(claimed) {
				Some(short_key)
			} else if state.long.is_exhausted(claimed) {
				Some(long_key)
			} else {
				None
			};

			if let Some(key) = exhausted {
				let resets_at = key.end();

				return ClaimDecision::Denied(ClaimDenied {
					window: key.kind(),
					wait: self.safety_margin + (resets_at - now),
					resets_at,
				});
			}
		}

		state.claimed = state.claimed.saturating_add(1);

		ClaimDecision::Granted
	}

	/// [`try_claim_at`](Self::try_claim_at) using the current UTC clock.
	pub fn try_claim(&self) -> ClaimDecision {
		self.try_claim_at(OffsetDateTime::now_utc())
	}

	/// Reserves one unit of quota, returning a guard that releases it on drop.
	pub fn claim_at(&self, now: OffsetDateTime) -> Result<QuotaClaim<'_>, ClaimDenied> {
		match self.try_claim_at(now) {
			ClaimDecision::Granted => Ok(QuotaClaim { tracker: self }),
			ClaimDecision::Denied(denied) => Err(denied),
		}
	}

	/// Returns one previously claimed unit.
	///
	/// Releasing with no outstanding claim is a caller bug; the counter stays at zero and the
	/// method returns `false`.
	pub fn release(&self) -> bool {
		let mut state = self.state.write();

		if state.claimed == 0 {
			drop(state);
			obs::unmatched_release();

			return false;
		}

		state.claimed -= 1;

		true
	}

	/// Overwrites limits and usage from response headers observed at `now`.
	///
	/// Every pair in `names` is consulted and the tightest one wins per window (see
	/// [`QuotaReading::from_any`]). When no pair is present and well formed, the tracker clears to
	/// its unknown, fail-open state. Returns the applied reading, if any.
	pub fn reconcile_at(
		&self,
		now: OffsetDateTime,
		headers: &HeaderMap,
		names: &[QuotaHeaderNames],
	) -> Option<QuotaReading> {
		let reading = QuotaReading::from_any(headers, names);

		self.observe_at(now, reading);

		reading
	}

	/// [`reconcile_at`](Self::reconcile_at) using the current UTC clock.
	pub fn reconcile(
		&self,
		headers: &HeaderMap,
		names: &[QuotaHeaderNames],
	) -> Option<QuotaReading> {
		self.reconcile_at(OffsetDateTime::now_utc(), headers, names)
	}

	/// Applies an already-parsed reading; `None` clears the tracker.
	pub fn observe_at(&self, now: OffsetDateTime, reading: Option<QuotaReading>) {
		let mut state = self.state.write();
		let Some(reading) = reading else {
			let claimed = state.claimed;

			*state = QuotaSnapshot { claimed, ..Default::default() };
			drop(state);
			obs::quota_cleared();

			return;
		};

		state.short = QuotaWindow {
			key: Some(WindowKind::Short.key_at(now)),
			limit: reading.short_limit,
			usage: reading.short_usage,
		};
		state.long = QuotaWindow {
			key: Some(WindowKind::Long.key_at(now)),
			limit: reading.long_limit,
			usage: reading.long_usage,
		};
		state.has_server_data = true;
	}

	/// Resets limits, usage, and window keys to the unknown state, keeping outstanding claims.
	pub fn clear(&self) {
		self.observe_at(OffsetDateTime::now_utc(), None);
	}

	/// Greater of the short and long usage fractions at `now`.
	///
	/// A window that has rolled over counts as zero usage; an unknown limit counts as `0.0`.
	pub fn fraction_used_at(&self, now: OffsetDateTime) -> f64 {
		let state = self.state.read();
		let short = QuotaWindow::fraction(
			state.short.limit,
			state.short.usage_in(WindowKind::Short.key_at(now)),
		);
		let long = QuotaWindow::fraction(
			state.long.limit,
			state.long.usage_in(WindowKind::Long.key_at(now)),
		);

		short.max(long)
	}

	/// [`fraction_used_at`](Self::fraction_used_at) using the current UTC clock.
	pub fn fraction_used(&self) -> f64 {
		self.fraction_used_at(OffsetDateTime::now_utc())
	}

	/// Returns a copy of the current state.
	pub fn snapshot(&self) -> QuotaSnapshot {
		*self.state.read()
	}

	/// Number of outstanding claims.
	pub fn claimed(&self) -> u32 {
		self.state.read().claimed
	}
}
impl Default for QuotaTracker {
	fn default() -> Self {
		Self::new()
	}
}

/// One unit of quota held for a single physical attempt; released exactly once on drop.
#[must_use = "dropping the claim releases the reserved quota immediately"]
pub struct QuotaClaim<'a> {
	tracker: &'a QuotaTracker,
}
impl Drop for QuotaClaim<'_> {
	fn drop(&mut self) {
		self.tracker.release();
	}
}
impl Debug for QuotaClaim<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("QuotaClaim(..)")
	}
}
