//! Logical API request and its per-attempt HTTP rendering.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ConfigError,
	exec::ExecutorConfig,
	http::HttpRequest,
};

/// Method, path, and parameters of one logical API call.
///
/// Parameters travel as a form body for `POST`, `PUT`, and `PATCH`, and as a query string for
/// every other method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL, e.g. `/athlete`.
	pub path: String,
	/// Parameters in insertion order.
	pub params: Vec<(String, String)>,
}
impl ApiRequest {
	/// Creates a request without parameters.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), params: Vec::new() }
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends one parameter, rendered with [`Display`].
	pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
		self.params.push((key.into(), value.to_string()));

		self
	}

	/// Appends several parameters.
	pub fn params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Display,
	{
		self.params.extend(params.into_iter().map(|(key, value)| (key.into(), value.to_string())));

		self
	}

	/// Returns `true` when parameters travel in a form body.
	pub fn carries_body(&self) -> bool {
		matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
	}

	/// Resolves the absolute URL, including the query string for body-less methods.
	pub fn url(&self, base: &Url) -> Result<Url, ConfigError> {
		let raw = format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			self.path.trim_start_matches('/')
		);
		let mut url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })?;

		if !self.carries_body() && !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.params);
		}

		Ok(url)
	}

	/// Renders one physical attempt authenticated with `credential`.
	pub fn to_http(&self, config: &ExecutorConfig, credential: &Credential) -> Result<HttpRequest> {
		let url = self.url(&config.base_url)?;
		let mut builder = Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, credential.bearer_header()?)
			.header(USER_AGENT, config.user_agent.as_str())
			.header(ACCEPT, "application/json");
		let body = if self.carries_body() {
			builder = builder.header(CONTENT_TYPE, "application/x-www-form-urlencoded");

			form_urlencoded::Serializer::new(String::new())
				.extend_pairs(&self.params)
				.finish()
				.into_bytes()
		} else {
			Vec::new()
		};

		builder.body(body).map_err(|e| ConfigError::from(e).into())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> ExecutorConfig {
		ExecutorConfig::new(
			Url::parse("https://api.example.com/v3/").expect("Base URL fixture should parse."),
		)
		.with_user_agent("quota-tests/1.0")
	}

	#[test]
	fn get_parameters_become_query_string() {
		let request = ApiRequest::get("/athlete/activities").param("page", 2).param("per_page", 30);
		let http = request
			.to_http(&config(), &Credential::new("tok"))
			.expect("GET request should render.");

		assert_eq!(http.method(), Method::GET);
		assert_eq!(
			http.uri().to_string(),
			"https://api.example.com/v3/athlete/activities?page=2&per_page=30"
		);
		assert_eq!(
			http.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer tok")
		);
		assert_eq!(
			http.headers().get(USER_AGENT).and_then(|v| v.to_str().ok()),
			Some("quota-tests/1.0")
		);
		assert!(http.body().is_empty());
	}

	#[test]
	fn post_parameters_become_form_body() {
		let request =
			ApiRequest::post("activities").params([("name", "Morning Ride"), ("type", "Ride")]);
		let http = request
			.to_http(&config(), &Credential::new("tok"))
			.expect("POST request should render.");

		assert_eq!(http.uri().to_string(), "https://api.example.com/v3/activities");
		assert_eq!(
			http.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/x-www-form-urlencoded")
		);
		assert_eq!(http.body().as_slice(), b"name=Morning+Ride&type=Ride");
	}

	#[test]
	fn invalid_user_agent_is_a_config_error() {
		let config = config().with_user_agent("bad\nagent");
		let err = ApiRequest::get("/athlete")
			.to_http(&config, &Credential::new("tok"))
			.expect_err("Newlines are not valid in headers.");

		assert!(matches!(err, Error::Config(ConfigError::HttpRequest(_))));
	}
}
