//! Thin async client for the USPeopleSearch lookup API.
//!
//! Two endpoints matter to us:
//!
//! - `/tcpa/v1?x={digits}` reports Do-Not-Call registry listings for a number
//! - `/v1/?x={digits}` returns people associated with a number
//!
//! The client decodes JSON and nothing more. A non-success HTTP status is
//! reported as `Ok(None)` so callers can treat "the API had nothing for us"
//! differently from "the request broke".

pub mod error;
pub mod models;

pub use error::{LookupError, LookupResult};
pub use models::{PersonAddress, PersonRecord, PersonResponse, TcpaResponse};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://api.uspeoplesearch.site";

/// Known-good number used for availability probes.
const PROBE_NUMBER: &str = "4045093823";

/// The upstream can be slow under load.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The API rejects clients that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Handle to the USPeopleSearch API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct PeopleSearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl PeopleSearchClient {
    /// Client against the production host.
    pub fn new() -> LookupResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against an alternate host. Used by tests and relays.
    pub fn with_base_url(base_url: impl Into<String>) -> LookupResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(LookupError::Client)?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// DNC registry listing for a 10-digit number.
    pub async fn registry_check(&self, digits: &str) -> LookupResult<Option<TcpaResponse>> {
        let url = format!("{}/tcpa/v1", self.base_url);
        self.get_json(&url, digits).await
    }

    /// People associated with a 10-digit number.
    pub async fn person_details(&self, digits: &str) -> LookupResult<Option<PersonResponse>> {
        let url = format!("{}/v1/", self.base_url);
        self.get_json(&url, digits).await
    }

    /// Whether the API currently answers at all.
    ///
    /// Issues a registry check for a fixed known number and reports whether
    /// the response status was success. Never errors.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/tcpa/v1", self.base_url);
        match self
            .client
            .get(&url)
            .query(&[("x", PROBE_NUMBER)])
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("availability probe failed: {}", e);
                false
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        digits: &str,
    ) -> LookupResult<Option<T>> {
        let response = self
            .client
            .get(url)
            .query(&[("x", digits)])
            .send()
            .await
            .map_err(LookupError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            debug!(url, %status, "lookup answered with non-success status");
            return Ok(None);
        }

        let body = response.json::<T>().await.map_err(LookupError::Body)?;
        Ok(Some(body))
    }
}
