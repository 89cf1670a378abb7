//! Opsboard API Client
//!
//! Session lifecycle for the Opsboard REST API: the access token lives in
//! memory, the refresh token lives in the HTTP cookie store, and expired
//! sessions renew silently behind a single transparent retry.

mod error;
mod session;

pub use error::ClientError;
pub use session::Session;
