//! Classification of a received response into a body, a throttle, or a typed error.

// crates.io
use oauth2::http::{StatusCode, header::LOCATION};
// self
use crate::{
	_prelude::*,
	error::ApiFault,
	http::{HttpResponse, parse_retry_after},
};

const BODY_PREVIEW_LIMIT: usize = 256;

/// Result of one physical attempt that produced a response.
#[derive(Debug)]
pub(crate) enum AttemptOutcome {
	/// 2xx (or other non-error) response; the body is returned to the caller.
	Done(Vec<u8>),
	/// HTTP 429; the attempt should be repeated.
	Throttled {
		retry_after: Option<Duration>,
		// Whether the response carried a usable quota reading.
		quota_known: bool,
	},
}

pub(crate) fn classify(response: HttpResponse, quota_known: bool) -> Result<AttemptOutcome> {
	let status = response.status();
	let code = status.as_u16();

	if status == StatusCode::TOO_MANY_REQUESTS {
		return Ok(AttemptOutcome::Throttled {
			retry_after: parse_retry_after(response.headers()),
			quota_known,
		});
	}
	if status.is_redirection() {
		let location = response
			.headers()
			.get(LOCATION)
			.and_then(|value| value.to_str().ok())
			.map(ToOwned::to_owned);

		return Err(Error::Redirect { status: code, location });
	}
	if status.is_client_error() {
		return Err(match ApiFault::decode(code, response.body()) {
			Ok(fault) => fault.into(),
			Err(source) => Error::MalformedFault { status: code, source },
		});
	}
	if code >= 500 {
		return Err(Error::Server { status: code, message: body_preview(response.body()) });
	}

	Ok(AttemptOutcome::Done(response.into_body()))
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	if trimmed.chars().count() <= BODY_PREVIEW_LIMIT {
		return trimmed.to_owned();
	}

	let mut preview = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	preview.push('…');

	preview
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderValue, header::RETRY_AFTER};
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");

		response
	}

	#[test]
	fn success_returns_body() {
		let outcome = classify(response(200, "{\"id\":1}"), true).expect("200 should succeed.");

		assert!(matches!(outcome, AttemptOutcome::Done(body) if body == b"{\"id\":1}"));
	}

	#[test]
	fn throttle_carries_retry_after() {
		let mut throttled = response(429, "");

		throttled.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("3"));

		let outcome = classify(throttled, false).expect("429 should be retried, not failed.");

		assert!(matches!(
			outcome,
			AttemptOutcome::Throttled { retry_after: Some(wait), quota_known: false }
				if wait == Duration::seconds(3)
		));
	}

	#[test]
	fn redirect_reports_location() {
		let mut redirect = response(302, "");

		redirect
			.headers_mut()
			.insert(LOCATION, HeaderValue::from_static("https://elsewhere.example/"));

		let err = classify(redirect, true).expect_err("302 should fail.");

		assert!(matches!(
			err,
			Error::Redirect { status: 302, location: Some(ref location) }
				if location == "https://elsewhere.example/"
		));
	}

	#[test]
	fn client_errors_decode_faults() {
		let err = classify(
			response(
				404,
				r#"{"message":"Record Not Found","errors":[{"resource":"Activity","field":"id","code":"not found"}]}"#,
			),
			true,
		)
		.expect_err("404 should fail.");
		let Error::Application(fault) = err else {
			panic!("Decodable 4xx should surface as an application fault.");
		};

		assert_eq!(fault.status, 404);
		assert_eq!(fault.first_resource(), Some("Activity"));

		let err = classify(response(400, "<html>"), true).expect_err("400 should fail.");

		assert!(matches!(err, Error::MalformedFault { status: 400, .. }));
	}

	#[test]
	fn server_errors_keep_a_bounded_preview() {
		let body = "x".repeat(1_000);
		let err = classify(response(503, &body), true).expect_err("503 should fail.");
		let Error::Server { status, message } = err else {
			panic!("5xx should surface as a server error.");
		};

		assert_eq!(status, 503);
		assert_eq!(message.chars().count(), BODY_PREVIEW_LIMIT + 1);
	}
}
