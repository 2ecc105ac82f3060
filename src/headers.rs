//! Header block parsing and transport request headers.

use serde::Serialize;

use crate::message::{Address, MailMessage};
use crate::settings::ProviderSettings;

/// Headers forwarded from the message header block to the provider.
pub const FORWARDED_HEADERS: [&str; 2] = ["Message-ID", "Date"];

/// User agent sent with every API request.
pub const USER_AGENT: &str = concat!("sparkpost-relay/", env!("CARGO_PKG_VERSION"));

/// Headers placed under `content.headers` in the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderMap {
    #[serde(rename = "Message-ID", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "Date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "CC", skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
}

impl HeaderMap {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.message_id.is_none() && self.date.is_none() && self.cc.is_none()
    }
}

/// Parse a raw header block, keeping only [`FORWARDED_HEADERS`], and add a
/// `CC` entry built from `cc` when it is non-empty.
///
/// Leading indentation is ignored. A line that does not start with a header
/// name continues the value of the previous header. A header name is a run
/// of printable ASCII without `:` that does not start with a digit, so a
/// folded line such as ` 23:45:32 +0000` continues the previous value. A
/// folded line that does look like `Name: value` is still read as a new
/// header, since indentation is not significant here.
#[must_use]
pub fn parse(raw: &str, cc: &[Address]) -> HeaderMap {
    let mut fields: Vec<(&str, String)> = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match split_field(line) {
            Some((name, value)) => fields.push((name, value.to_string())),
            None => {
                if let Some((_, value)) = fields.last_mut() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line);
                }
            }
        }
    }

    let mut headers = HeaderMap::default();
    for (name, value) in fields
        .into_iter()
        .filter(|(name, _)| FORWARDED_HEADERS.contains(name))
    {
        match name {
            "Message-ID" => headers.message_id = Some(value),
            "Date" => headers.date = Some(value),
            _ => {}
        }
    }

    if !cc.is_empty() {
        headers.cc = Some(MailMessage::render_addresses(cc, ","));
    }

    headers
}

fn split_field(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    let valid = name.bytes().next().is_some_and(|b| !b.is_ascii_digit())
        && name.bytes().all(|b| b.is_ascii_graphic() && b != b':');
    valid.then_some((name, value.trim()))
}

/// HTTP headers for one API request.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub content_type: String,
    pub authorization: String,
}

impl RequestHeaders {
    /// Name/value pairs in the order they are sent.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("User-Agent", self.user_agent.as_str()),
            ("Content-Type", self.content_type.as_str()),
            ("Authorization", self.authorization.as_str()),
        ]
    }
}

impl std::fmt::Debug for RequestHeaders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHeaders")
            .field("user_agent", &self.user_agent)
            .field("content_type", &self.content_type)
            .field("authorization", &obfuscate_key(&self.authorization))
            .finish()
    }
}

/// Headers carrying the real API key. Only these go on the wire.
#[must_use]
pub fn request_headers(settings: &ProviderSettings) -> RequestHeaders {
    RequestHeaders {
        user_agent: USER_AGENT.to_string(),
        content_type: "application/json".to_string(),
        authorization: settings.api_key.clone(),
    }
}

/// Headers with the API key masked, for diagnostic logging.
#[must_use]
pub fn obfuscated_request_headers(settings: &ProviderSettings) -> RequestHeaders {
    RequestHeaders {
        authorization: obfuscate_key(&settings.api_key),
        ..request_headers(settings)
    }
}

/// Keep the first four characters of `key` and star out the rest.
#[must_use]
pub fn obfuscate_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    let hidden = key.chars().count().saturating_sub(4);
    format!("{visible}{}", "*".repeat(hidden))
}
