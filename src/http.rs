//! Transport primitives for API calls and token refreshes.
//!
//! The module exposes [`Transport`] as the executor's only dependency on an HTTP stack, along
//! with [`ResponseMetadata`] and [`ResponseMetadataSlot`] so refresh exchanges routed through
//! the `oauth2` crate can still classify failures by HTTP status. [`TransportClient`] adapts any
//! [`Transport`] to `oauth2`'s [`AsyncHttpClient`] contract.

// crates.io
use oauth2::{
	AsyncHttpClient,
	http::{HeaderMap, header::RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Request type accepted by [`Transport::send`].
pub type HttpRequest = oauth2::HttpRequest;
/// Response type produced by [`Transport::send`].
pub type HttpResponse = oauth2::HttpResponse;

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Performs a single HTTP round trip.
///
/// Implementations must return `Ok` for every response that arrived, whatever its status, and
/// `Err` only when no response was obtained. They must not follow redirects or retry.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the full response.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		T::send(self, request)
	}
}

/// Status of the most recent token endpoint response, kept for refresh error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code, if a response arrived.
	pub status: Option<u16>,
}
impl ResponseMetadata {
	/// Extracts metadata from a received response.
	pub fn from_response(response: &HttpResponse) -> Self {
		Self { status: Some(response.status().as_u16()) }
	}
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Adapts a [`Transport`] to `oauth2`'s [`AsyncHttpClient`], recording metadata per call.
pub struct TransportClient<T>
where
	T: ?Sized + Transport,
{
	transport: Arc<T>,
	slot: ResponseMetadataSlot,
}
impl<T> TransportClient<T>
where
	T: ?Sized + Transport,
{
	/// Wraps `transport`, publishing each response's metadata into `slot`.
	pub fn new(transport: Arc<T>, slot: ResponseMetadataSlot) -> Self {
		Self { transport, slot }
	}
}
impl<'c, T> AsyncHttpClient<'c> for TransportClient<T>
where
	T: ?Sized + Transport,
{
	type Error = TransportError;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self.transport.send(request).await?;

			self.slot.store(ResponseMetadata::from_response(&response));

			Ok(response)
		})
	}
}

/// [`Transport`] backed by a reqwest [`ReqwestClient`].
///
/// Redirect following must stay disabled so 3xx responses reach the executor's classification;
/// [`ReqwestTransport::new`] configures that, and clients passed to
/// [`ReqwestTransport::with_client`] should do the same.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client with redirect following disabled.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Parses a `Retry-After` header given either as delta-seconds or an RFC 2822 date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
