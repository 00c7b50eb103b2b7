//! Scripted fakes shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use quota_executor::{
	error::TransportError,
	http::{HttpRequest, HttpResponse, Transport, TransportFuture},
	oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
	quota::Clock,
};
use time::OffsetDateTime;

/// No query or form parameters.
pub const NO_PARAMS: [(&str, &str); 0] = [];

/// Fault body in the API's `{message, errors[]}` shape.
pub const NOT_FOUND_FAULT: &str = r#"{"message":"Record Not Found","errors":[{"resource":"Activity","field":"id","code":"not found"}]}"#;

/// Clock that follows tokio's (possibly paused) timer from a fixed UTC origin.
pub struct PausedClock {
	origin: OffsetDateTime,
	started: tokio::time::Instant,
}
impl PausedClock {
	pub fn starting_at(origin: OffsetDateTime) -> Arc<Self> {
		Arc::new(Self { origin, started: tokio::time::Instant::now() })
	}
}
impl Clock for PausedClock {
	fn now(&self) -> OffsetDateTime {
		self.origin + self.started.elapsed()
	}
}

/// What the transport saw for one call.
#[derive(Clone, Debug)]
pub struct Sent {
	pub method: Method,
	pub uri: String,
	pub headers: HeaderMap,
	pub body: Vec<u8>,
}
impl Sent {
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

type Responder = Box<dyn Fn(usize, &Sent) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Transport answering from a closure keyed by the zero-based call index.
pub struct ScriptedTransport {
	responder: Responder,
	latency: Option<StdDuration>,
	sent: Mutex<Vec<Sent>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}
impl ScriptedTransport {
	pub fn new(
		responder: impl Fn(usize, &Sent) -> Result<HttpResponse, TransportError>
			+ 'static
			+ Send
			+ Sync,
	) -> Self {
		Self {
			responder: Box::new(responder),
			latency: None,
			sent: Mutex::new(Vec::new()),
			in_flight: AtomicUsize::new(0),
			max_in_flight: AtomicUsize::new(0),
		}
	}

	/// Holds every call open for `latency` before answering.
	pub fn with_latency(mut self, latency: StdDuration) -> Self {
		self.latency = Some(latency);

		self
	}

	pub fn calls(&self) -> usize {
		self.sent.lock().len()
	}

	pub fn sent(&self) -> Vec<Sent> {
		self.sent.lock().clone()
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}
impl Transport for ScriptedTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let sent = Sent {
				method: request.method().clone(),
				uri: request.uri().to_string(),
				headers: request.headers().clone(),
				body: request.body().clone(),
			};
			let call = {
				let mut log = self.sent.lock();

				log.push(sent.clone());

				log.len() - 1
			};
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_in_flight.fetch_max(now, Ordering::SeqCst);

			if let Some(latency) = self.latency {
				tokio::time::sleep(latency).await;
			}

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			(self.responder)(call, &sent)
		})
	}
}

/// Builds a response with a body and extra headers.
pub fn respond(status: u16, body: &str, headers: &[(&'static str, &str)]) -> HttpResponse {
	let mut response = HttpResponse::new(body.as_bytes().to_vec());

	*response.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");

	for &(name, value) in headers {
		response.headers_mut().insert(
			HeaderName::from_static(name),
			HeaderValue::from_str(value).expect("Fixture header should be valid."),
		);
	}

	response
}

/// Builds a JSON response.
pub fn respond_json(status: u16, body: &str) -> HttpResponse {
	respond(status, body, &[("content-type", "application/json")])
}

/// Builds a response carrying quota headers.
pub fn respond_with_quota(status: u16, body: &str, limit: &str, usage: &str) -> HttpResponse {
	respond(status, body, &[("x-ratelimit-limit", limit), ("x-ratelimit-usage", usage)])
}
