//! Credentials and the token providers that supply them.

pub mod credential;
pub mod provider;
pub mod refresh;
pub mod secret;

pub use credential::*;
pub use provider::*;
pub use refresh::*;
pub use secret::*;
