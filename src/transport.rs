//! Blocking HTTP transport for the transmissions API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::headers::RequestHeaders;

/// Raw response handed back by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Performs one POST of a JSON body.
///
/// Any HTTP status is returned as a response; only failures to complete the
/// exchange are errors.
pub trait Transport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`Error::Transport`](crate::Error::Transport) when no response
    /// was received.
    fn send(&self, url: &str, headers: &RequestHeaders, body: &Value) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a request timeout.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub const fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send(&self, url: &str, headers: &RequestHeaders, body: &Value) -> Result<HttpResponse> {
        let mut request = self.client.post(url).body(serde_json::to_vec(body)?);
        for (name, value) in headers.pairs() {
            request = request.header(name, value);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let body = response.text()?;

        debug!("POST {url} returned {status} ({} bytes)", body.len());

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
