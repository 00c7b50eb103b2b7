//! Bearer and refresh token material that never reaches logs.

// self
use crate::_prelude::*;

/// Access or refresh token string.
///
/// Serializes as the bare string so stored credentials round-trip through token endpoint JSON,
/// while `Debug` and `Display` print `<redacted>`. Only [`TokenSecret::expose`] yields the value,
/// and the executor calls it solely to build the `Authorization` header and the refresh form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps token material.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value for the wire.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Whether the provider handed out an empty token.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatting_hides_the_token_but_serde_keeps_it() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(
			serde_json::to_string(&secret).expect("Secret should serialize."),
			"\"super-secret\""
		);
		assert!(TokenSecret::new("").is_empty());
	}
}
