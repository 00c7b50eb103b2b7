// std
use std::{
	sync::atomic::{AtomicUsize, Ordering},
	thread,
};
// crates.io
use time::{Duration, OffsetDateTime, macros};
// self
use quota_executor::{
	oauth2::http::{HeaderMap, HeaderValue},
	quota::{ClaimDecision, DEFAULT_SAFETY_MARGIN, QuotaHeaderNames, QuotaTracker, WindowKind},
};

const NOW: OffsetDateTime = macros::datetime!(2025-06-01 12:05 UTC);

fn headers(limit: &'static str, usage: &'static str) -> HeaderMap {
	let mut map = HeaderMap::new();

	map.insert("x-ratelimit-limit", HeaderValue::from_static(limit));
	map.insert("x-ratelimit-usage", HeaderValue::from_static(usage));

	map
}

fn primed(limit: &'static str, usage: &'static str) -> QuotaTracker {
	let tracker = QuotaTracker::new();

	tracker
		.reconcile_at(NOW, &headers(limit, usage), &[QuotaHeaderNames::default()])
		.expect("Fixture headers should parse.");

	tracker
}

#[test]
fn fraction_reports_the_busier_window() {
	assert_eq!(primed("600,30000", "300,10000").fraction_used_at(NOW), 0.5);
	assert_eq!(primed("600,30000", "300,27000").fraction_used_at(NOW), 0.9);
	assert_eq!(QuotaTracker::new().fraction_used_at(NOW), 0.0);
}

#[test]
fn malformed_headers_restore_fail_open() {
	let tracker = primed("1,1000", "1,10");

	assert!(!tracker.try_claim_at(NOW).is_granted());
	assert!(tracker.reconcile_at(NOW, &headers("xxx", "zzz"), &[QuotaHeaderNames::default()]).is_none());
	assert!(!tracker.snapshot().has_server_data);
	assert_eq!(tracker.fraction_used_at(NOW), 0.0);
	assert!(tracker.try_claim_at(NOW).is_granted());
}

#[test]
fn headers_missing_entirely_clear_state() {
	let tracker = primed("600,30000", "10,10");

	assert!(tracker.reconcile_at(NOW, &HeaderMap::new(), &[QuotaHeaderNames::default()]).is_none());
	assert_eq!(tracker.snapshot().short.limit, 0);
}

#[test]
fn exhausted_read_pair_denies_even_when_overall_has_room() {
	let mut map = headers("200,2000", "120,900");

	map.insert("x-readratelimit-limit", HeaderValue::from_static("100,1000"));
	map.insert("x-readratelimit-usage", HeaderValue::from_static("100,900"));

	let tracker = QuotaTracker::new();

	tracker.reconcile_at(NOW, &map, &[QuotaHeaderNames::overall(), QuotaHeaderNames::read()]);

	let ClaimDecision::Denied(denied) = tracker.try_claim_at(NOW) else {
		panic!("Exhausted read pair should deny.");
	};

	assert_eq!(denied.window, WindowKind::Short);
	assert_eq!(tracker.fraction_used_at(NOW), 1.0);
}

#[test]
fn usage_from_a_previous_window_is_forgotten() {
	let tracker = primed("10,1000", "10,20");

	assert!(!tracker.try_claim_at(NOW).is_granted());
	assert!(tracker.try_claim_at(macros::datetime!(2025-06-01 12:15 UTC)).is_granted());

	let snapshot = tracker.snapshot();

	assert_eq!(snapshot.short.usage, 0);
	assert_eq!(snapshot.short.limit, 10);
	assert_eq!(snapshot.long.usage, 20);
}

#[test]
fn same_quarter_hour_on_the_next_day_is_a_new_window() {
	let tracker = primed("10,1000", "10,20");

	assert!(tracker.try_claim_at(NOW + Duration::days(1)).is_granted());
	assert_eq!(tracker.snapshot().long.usage, 0);
}

#[test]
fn long_window_wait_runs_to_utc_midnight() {
	let late = macros::datetime!(2025-06-01 23:59 UTC);
	let tracker = QuotaTracker::new();

	tracker.reconcile_at(late, &headers("600,1000", "0,1000"), &[QuotaHeaderNames::default()]);

	let ClaimDecision::Denied(denied) = tracker.try_claim_at(late) else {
		panic!("Exhausted long window should deny.");
	};

	assert_eq!(denied.window, WindowKind::Long);
	assert_eq!(denied.wait, Duration::minutes(1) + DEFAULT_SAFETY_MARGIN);
	assert_eq!(denied.resets_at, macros::datetime!(2025-06-02 00:00 UTC));
	assert!(tracker.try_claim_at(denied.resets_at).is_granted());
}

#[test]
fn short_exhaustion_is_reported_before_long() {
	let tracker = primed("5,5", "5,5");
	let decision = tracker.try_claim_at(NOW);

	assert!(matches!(decision, ClaimDecision::Denied(denied) if denied.window == WindowKind::Short));
	assert_eq!(decision.wait(), Duration::minutes(10) + DEFAULT_SAFETY_MARGIN);
}

#[test]
fn concurrent_claims_never_exceed_the_limit() {
	let tracker = primed("50,30000", "0,0");
	let granted = AtomicUsize::new(0);

	thread::scope(|scope| {
		for _ in 0..8 {
			scope.spawn(|| {
				for _ in 0..100 {
					if tracker.try_claim_at(NOW).is_granted() {
						granted.fetch_add(1, Ordering::SeqCst);
					}
				}
			});
		}
	});

	assert_eq!(granted.load(Ordering::SeqCst), 50);
	assert_eq!(tracker.claimed(), 50);
}

#[test]
fn releases_return_capacity_one_unit_at_a_time() {
	let tracker = primed("2,30000", "0,0");
	let first = tracker.claim_at(NOW).expect("First unit should be free.");
	let _second = tracker.claim_at(NOW).expect("Second unit should be free.");

	assert!(tracker.claim_at(NOW).is_err());

	drop(first);

	assert_eq!(tracker.claimed(), 1);
	assert!(tracker.claim_at(NOW).is_ok());
	assert_eq!(tracker.claimed(), 1);
}
