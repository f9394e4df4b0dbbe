//! Error types for the lookup client.

use thiserror::Error;

/// Errors surfaced by [`crate::PeopleSearchClient`].
///
/// Non-success HTTP statuses are not errors here; the client reports those
/// as `Ok(None)` so callers can treat "no data" separately from "broken".
#[derive(Debug, Error)]
pub enum LookupError {
    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never completed (connect failure, timeout, DNS).
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered but the body was not the JSON we expect.
    #[error("malformed response body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Result alias for lookup operations.
pub type LookupResult<T> = std::result::Result<T, LookupError>;
